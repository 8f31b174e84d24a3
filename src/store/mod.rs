//! Columnar store: one Parquet file plus one JSON metadata sidecar per
//! `(symbol, year)`, with one Parquet row group per trade date so a
//! single-day read can prune the rest of the year via row-group
//! statistics.

pub mod metadata;
pub mod paths;
pub mod reader;
pub mod schema;
pub mod writer;

pub use metadata::{detect_missing_dates, read_metadata, write_metadata, YearMetadata};
pub use paths::{metadata_path, sanitize_symbol, symbol_dir, year_file_path};
pub use reader::{read_day, read_range};
pub use writer::{append_days, append_no_data_dates};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("metadata error at {path}: {source}")]
    Metadata {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("parquet/dataframe error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
    #[error("no data found for {symbol} on trade_date {trade_date}")]
    DateNotFound { symbol: String, trade_date: i32 },
}
