//! Footprint Aggregation Engine
//!
//! Converts second-resolution trade OHLCV + bid/ask quote data into
//! volume-partitioned footprint bars ("V-bars") and persists them in a
//! columnar store partitioned by `(symbol, year)`.
//!
//! The write path is [`core::micro_allocator`] (intra-second price path and
//! buy/sell split) feeding [`core::aggregator`] (volume-threshold bar
//! segmentation), committed through [`store::writer`]. The read path is
//! [`store::reader`] (bar reconstruction), optionally composed with
//! [`core::reaggregate`] for coarser volume buckets. [`orchestrator`] drives
//! the write path end to end against a [`providers::SecondDataSource`];
//! [`validator`] independently cross-checks the result.

pub mod config;
pub mod core;
pub mod orchestrator;
pub mod providers;
pub mod store;
pub mod validator;

pub use config::Settings;
pub use core::aggregator::{AggregatorError, VBarAggregator};
pub use core::types::{Ohlc, SecondRecord, VBar};
pub use store::{StoreError, YearMetadata};

/// Crate version, re-exported for diagnostics and the CLI `--version` flag.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Installs a `tracing` subscriber driven by `RUST_LOG`, defaulting to
/// `info`. Safe to call more than once; subsequent calls are no-ops.
pub fn init() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
