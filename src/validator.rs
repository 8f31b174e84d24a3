//! Independent cross-check: for each trade date, compares the first
//! stored V-bar's open against the open of the first reference minute bar
//! with nonzero volume. A difference beyond `2 * tick_size` flags a
//! mismatch; a day with reference data but no stored bars flags missing
//! footprint data; a store read failure for the range flags every date in
//! it as `Error` rather than failing the whole call.
//!
//! Unlike an append-only-on-problem report, every requested date gets an
//! explicit result record, `Ok` included — a clearer contract for a Rust
//! API's caller than silently producing nothing for a healthy day.

use crate::core::types::VBar;
use crate::providers::{MinuteBarSource, ProviderError};
use crate::store;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationStatus {
    Ok,
    Mismatch,
    MissingFootprintData,
    /// The cross-check itself could not be completed for this date (e.g.
    /// the store read failed), as distinct from a completed check that
    /// found footprint data missing.
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub trade_date: i32,
    pub status: ValidationStatus,
    pub daily_open: Option<f64>,
    pub footprint_open: Option<f64>,
    pub difference: Option<f64>,
}

fn yyyymmdd(d: NaiveDate) -> i32 {
    d.year() * 10_000 + d.month() as i32 * 100 + d.day() as i32
}

fn first_footprint_open_by_date(bars: &[VBar], tick_size: f64) -> BTreeMap<i32, f64> {
    let mut out = BTreeMap::new();
    for bar in bars {
        out.entry(bar.trade_date).or_insert_with(|| bar.open(tick_size));
    }
    out
}

/// Cross-checks `[start_date, end_date]` inclusive for `symbol`.
pub async fn validate_daily_open<M: MinuteBarSource>(
    source: &M,
    data_root: &Path,
    symbol: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    tick_size: f64,
) -> Result<Vec<ValidationResult>, ValidatorError> {
    let minute_bars = source
        .fetch_minute_bars(symbol, start_date, end_date)
        .await?;

    let mut first_volume_open_by_date: BTreeMap<i32, f64> = BTreeMap::new();
    for bar in &minute_bars {
        if bar.volume <= 0.0 {
            continue;
        }
        first_volume_open_by_date
            .entry(yyyymmdd(bar.time.date()))
            .or_insert(bar.open);
    }

    let footprint_open_by_date = match store::read_range(data_root, symbol, start_date, end_date) {
        Ok(bars) => first_footprint_open_by_date(&bars, tick_size),
        Err(e) => {
            // The store read covers the whole range in one call; a
            // failure there means every requested date's cross-check is
            // unresolved, not that footprint data is known absent.
            return Ok(first_volume_open_by_date
                .into_iter()
                .map(|(trade_date, daily_open)| ValidationResult {
                    trade_date,
                    status: ValidationStatus::Error(e.to_string()),
                    daily_open: Some(daily_open),
                    footprint_open: None,
                    difference: None,
                })
                .collect());
        }
    };

    let tolerance = 2.0 * tick_size + 1e-9;

    let mut results = Vec::with_capacity(first_volume_open_by_date.len());
    for (trade_date, daily_open) in first_volume_open_by_date {
        match footprint_open_by_date.get(&trade_date) {
            None => results.push(ValidationResult {
                trade_date,
                status: ValidationStatus::MissingFootprintData,
                daily_open: Some(daily_open),
                footprint_open: None,
                difference: None,
            }),
            Some(&footprint_open) => {
                let difference = (daily_open - footprint_open).abs();
                let status = if difference > tolerance {
                    ValidationStatus::Mismatch
                } else {
                    ValidationStatus::Ok
                };
                results.push(ValidationResult {
                    trade_date,
                    status,
                    daily_open: Some(daily_open),
                    footprint_open: Some(footprint_open),
                    difference: Some(difference),
                });
            }
        }
    }

    Ok(results)
}
