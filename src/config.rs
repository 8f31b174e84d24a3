//! Layered configuration: defaults, optional `footprint.toml`, then
//! environment variables prefixed `FOOTPRINT_` (e.g. `FOOTPRINT_DATA_ROOT`).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
}

/// Process-wide settings, built once at startup and threaded explicitly
/// through the orchestrator and CLI rather than read from a global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory for the columnar store. Defaults to
    /// `./footprint_data`, matching the original system's
    /// `/LeanCLI/footprint_data` layout convention minus the host-specific
    /// prefix.
    pub data_root: PathBuf,
    /// Number of consecutive per-date fetch errors the orchestrator
    /// tolerates before aborting a backfill run.
    pub max_consecutive_errors: u32,
    /// Default `v_unit` (threshold volume per V-bar) when a caller doesn't
    /// specify one explicitly.
    pub default_v_unit: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("footprint_data"),
            max_consecutive_errors: 5,
            default_v_unit: 1_000_000,
        }
    }
}

impl Settings {
    /// Loads settings from (in increasing priority) built-in defaults, an
    /// optional `footprint.toml` in the current directory, and
    /// `FOOTPRINT_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let built = config::Config::builder()
            .set_default("data_root", defaults.data_root.to_string_lossy().as_ref())?
            .set_default("max_consecutive_errors", defaults.max_consecutive_errors)?
            .set_default("default_v_unit", defaults.default_v_unit)?
            .add_source(config::File::with_name("footprint").required(false))
            .add_source(config::Environment::with_prefix("FOOTPRINT"))
            .build()?;

        Ok(Settings {
            data_root: PathBuf::from(built.get_string("data_root")?),
            max_consecutive_errors: built.get_int("max_consecutive_errors")? as u32,
            default_v_unit: built.get_int("default_v_unit")?,
        })
    }
}
