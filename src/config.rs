//! TOML configuration for the evibus CLI.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BusResult, EngineError};

/// Configuration file contents, merged with command-line flags by the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusConfig {
    /// Directory of rule files loaded at startup.
    pub rules_dir: Option<PathBuf>,
    /// Where to save/load the logic-state snapshot.
    pub state_file: Option<PathBuf>,
    /// Dispatch tool wrappers on the worker pool instead of inline.
    #[serde(default)]
    pub async_wrappers: bool,
    /// tracing env-filter directive, e.g. "evibus=debug".
    pub log_filter: Option<String>,
}

impl BusConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> BusResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::StateFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = toml::from_str(&text).map_err(|e| EngineError::InvalidConfig {
            message: format!("{}: {e}", path.display()),
        })?;
        Ok(config)
    }
}
