//! Atomic per-year append: read the existing year file (if any), splice in
//! the new or recomputed dates, and replace the whole file via
//! temp-file-then-rename so a crash mid-write never leaves a partial
//! Parquet file at the real path.

use super::schema::{bars_to_dataframe, dataframe_to_bars};
use super::{metadata, paths, StoreError};
use crate::core::types::VBar;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

fn read_year_bars(path: &Path) -> Result<Vec<VBar>, StoreError> {
    let file = File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let df = ParquetReader::new(file).finish()?;
    Ok(dataframe_to_bars(&df)?)
}

fn write_year_file(path: &Path, bars: &[VBar]) -> Result<(), StoreError> {
    let parent = path.parent().expect("year file path always has a parent");
    std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
        path: parent.to_path_buf(),
        source,
    })?;

    let mut df = bars_to_dataframe(bars)?;
    df = df.sort(["trade_date", "start_time"], SortMultipleOptions::default())?;

    let tmp = tempfile::NamedTempFile::new_in(parent).map_err(|source| StoreError::Io {
        path: parent.to_path_buf(),
        source,
    })?;

    {
        let file = tmp.reopen().map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = ParquetWriter::new(file).batched(&df.schema())?;

        if df.height() > 0 {
            let dates = df.column("trade_date")?.i32()?.clone();
            let mut unique_dates: Vec<i32> = dates.into_no_null_iter().collect();
            unique_dates.dedup();
            for d in unique_dates {
                let mask = df.column("trade_date")?.i32()?.equal(d);
                let day_df = df.filter(&mask)?;
                writer.write_batch(&day_df)?;
            }
        }
        writer.finish()?;
    }

    tmp.persist(path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Replaces the `(symbol, year)` file with the union of its existing
/// content and `new_days`, dropping any existing rows whose trade date is
/// in `new_days` or `force_recompute_dates` (both are full recomputations
/// of that date, so the old rows would otherwise duplicate or shadow the
/// new ones). Also rewrites the metadata sidecar.
pub fn append_days(
    data_root: &Path,
    symbol: &str,
    year: i32,
    new_days: &[(i32, Vec<VBar>)],
    force_recompute_dates: &[i32],
) -> Result<(), StoreError> {
    let path = paths::year_file_path(data_root, symbol, year);

    let existing = if path.exists() {
        read_year_bars(&path)?
    } else {
        Vec::new()
    };

    let new_dates: BTreeSet<i32> = new_days.iter().map(|(d, _)| *d).collect();
    let force_set: BTreeSet<i32> = force_recompute_dates.iter().copied().collect();

    let mut combined: Vec<VBar> = existing
        .into_iter()
        .filter(|b| !new_dates.contains(&b.trade_date) && !force_set.contains(&b.trade_date))
        .collect();
    for (_, bars) in new_days {
        combined.extend(bars.iter().cloned());
    }

    write_year_file(&path, &combined)?;

    let meta_path = paths::metadata_path(data_root, symbol, year);
    let existing_meta = metadata::read_metadata(&meta_path)?.unwrap_or_default();

    let mut present = existing_meta.present_set();
    present.extend(new_dates.iter().copied());
    let mut no_data = existing_meta.no_data_set();
    for d in &new_dates {
        no_data.remove(d);
    }

    let mut bar_count_by_date: BTreeMap<i32, u64> = BTreeMap::new();
    for bar in &combined {
        *bar_count_by_date.entry(bar.trade_date).or_insert(0) += 1;
    }

    let meta = metadata::YearMetadata {
        schema_version: 1,
        dates_present: present.into_iter().collect(),
        no_data_dates: no_data.into_iter().collect(),
        bar_count_by_date,
    };
    metadata::write_metadata(&meta_path, &meta)
}

/// Records that `dates` were fetched and produced no rows, without
/// touching the Parquet file.
pub fn append_no_data_dates(
    data_root: &Path,
    symbol: &str,
    year: i32,
    dates: &[i32],
) -> Result<(), StoreError> {
    let meta_path = paths::metadata_path(data_root, symbol, year);
    let mut meta = metadata::read_metadata(&meta_path)?.unwrap_or_default();
    let present = meta.present_set();
    let mut no_data = meta.no_data_set();
    for d in dates {
        if !present.contains(d) {
            no_data.insert(*d);
        }
    }
    meta.no_data_dates = no_data.into_iter().collect();
    metadata::write_metadata(&meta_path, &meta)
}
