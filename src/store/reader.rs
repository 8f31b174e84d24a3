//! Day and range reads. Reconstruction is a row-to-`VBar` mapping ([`crate::store::schema`]);
//! filtering by `trade_date` lets Polars prune Parquet row groups that
//! can't match, since each row group holds exactly one trade date.

use super::schema::dataframe_to_bars;
use super::{paths, StoreError};
use crate::core::types::VBar;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::path::Path;

fn yyyymmdd(d: NaiveDate) -> i32 {
    d.year() * 10_000 + d.month() as i32 * 100 + d.day() as i32
}

/// All bars for one trade date, ascending by `start_time`.
pub fn read_day(
    data_root: &Path,
    symbol: &str,
    year: i32,
    trade_date: i32,
) -> Result<Vec<VBar>, StoreError> {
    let path = paths::year_file_path(data_root, symbol, year);
    if !path.exists() {
        return Err(StoreError::DateNotFound {
            symbol: symbol.to_string(),
            trade_date,
        });
    }

    let lf = LazyFrame::scan_parquet(&path, ScanArgsParquet::default())?;
    let filtered = lf.filter(col("trade_date").eq(lit(trade_date))).collect()?;
    let bars = dataframe_to_bars(&filtered)?;
    if bars.is_empty() {
        return Err(StoreError::DateNotFound {
            symbol: symbol.to_string(),
            trade_date,
        });
    }
    Ok(bars)
}

/// All bars in `[start_date, end_date]` inclusive, across however many
/// year files that spans, ascending by `start_time`.
pub fn read_range(
    data_root: &Path,
    symbol: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<VBar>, StoreError> {
    let mut all = Vec::new();
    let start_i = yyyymmdd(start_date);
    let end_i = yyyymmdd(end_date);

    for year in start_date.year()..=end_date.year() {
        let path = paths::year_file_path(data_root, symbol, year);
        if !path.exists() {
            continue;
        }
        let lf = LazyFrame::scan_parquet(&path, ScanArgsParquet::default())?;
        let filtered = lf
            .filter(
                col("trade_date")
                    .gt_eq(lit(start_i))
                    .and(col("trade_date").lt_eq(lit(end_i))),
            )
            .collect()?;
        all.extend(dataframe_to_bars(&filtered)?);
    }

    all.sort_by_key(|b| b.start_time);
    Ok(all)
}
