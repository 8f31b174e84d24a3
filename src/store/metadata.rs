//! Sidecar JSON metadata: which trade dates are present, which were
//! fetched but produced no data, and a bar count per date — enough for the
//! orchestrator to detect gaps without scanning the Parquet file.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use super::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YearMetadata {
    pub schema_version: u32,
    pub dates_present: Vec<i32>,
    pub no_data_dates: Vec<i32>,
    pub bar_count_by_date: BTreeMap<i32, u64>,
}

impl Default for YearMetadata {
    fn default() -> Self {
        Self {
            schema_version: 1,
            dates_present: Vec::new(),
            no_data_dates: Vec::new(),
            bar_count_by_date: BTreeMap::new(),
        }
    }
}

impl YearMetadata {
    pub fn present_set(&self) -> BTreeSet<i32> {
        self.dates_present.iter().copied().collect()
    }

    pub fn no_data_set(&self) -> BTreeSet<i32> {
        self.no_data_dates.iter().copied().collect()
    }
}

pub fn read_metadata(path: &Path) -> Result<Option<YearMetadata>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let meta: YearMetadata =
        serde_json::from_str(&raw).map_err(|source| StoreError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Some(meta))
}

pub fn write_metadata(path: &Path, meta: &YearMetadata) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let raw = serde_json::to_string_pretty(meta).map_err(|source| StoreError::Metadata {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, raw).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// `target_set` if `force`, otherwise the targets minus whatever is
/// already present or already known to have no data.
pub fn detect_missing_dates(
    present: &BTreeSet<i32>,
    no_data: &BTreeSet<i32>,
    targets: &[i32],
    force: bool,
) -> Vec<i32> {
    if force {
        return targets.to_vec();
    }
    targets
        .iter()
        .copied()
        .filter(|d| !present.contains(d) && !no_data.contains(d))
        .collect()
}
