//! The fetch contract: a second-resolution trade+quote source, and an
//! independent minute-bar source the validator cross-checks against.

use crate::core::types::SecondRecord;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("could not parse response: {reason}")]
    Parse { reason: String },
    #[error("symbol not supported by this provider: {symbol}")]
    UnsupportedSymbol { symbol: String },
}

/// Price normalization requested of the upstream feed. `Raw` asks for
/// unadjusted prices, matching the orchestrator's reconciliation
/// assumption that stored ticks need no further adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceMode {
    Raw,
}

/// Continuous-contract roll convention, passed through to providers that
/// serve futures chains. A provider with no chain to roll treats this as
/// inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollMapping {
    OpenInterestAnnual,
}

/// One second-resolution source of trade + quote data for a symbol.
#[async_trait]
pub trait SecondDataSource: Send + Sync {
    /// Fetches every second in `date` for `symbol`. Seconds with zero
    /// volume or a missing trade/bid/ask leg should be omitted rather than
    /// synthesized — the aggregator treats absence and a zero-volume
    /// record identically.
    async fn fetch_day(
        &self,
        symbol: &str,
        date: NaiveDate,
        mode: PriceMode,
        roll: RollMapping,
    ) -> Result<Vec<SecondRecord>, ProviderError>;
}

/// A single reference minute bar, used only to validate the first V-bar's
/// open against an independently-sourced price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinuteBar {
    pub time: NaiveDateTime,
    pub open: f64,
    pub volume: f64,
}

#[async_trait]
pub trait MinuteBarSource: Send + Sync {
    async fn fetch_minute_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<MinuteBar>, ProviderError>;
}
