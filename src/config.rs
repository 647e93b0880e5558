//! Monitor configuration

use crate::errors::InitError;
use crate::report::DEFAULT_ROTATE_BYTES;
use serde::Deserialize;
use std::path::PathBuf;

/// Monitor configuration parameters
///
/// ```rust
/// use revm_soda::MonitorConfig;
///
/// let config = MonitorConfig::from_json(r#"{ "log_root": "./plugin_log" }"#).unwrap();
/// assert_eq!(config.rotate_bytes, 300_722_733);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Root of the per-analyzer report directories; reports only go to the
    /// `log` facade when unset
    pub log_root: Option<PathBuf>,
    /// Size in bytes above which a report file is rotated
    pub rotate_bytes: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_root: None,
            rotate_bytes: DEFAULT_ROTATE_BYTES,
        }
    }
}

impl MonitorConfig {
    pub fn with_log_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.log_root = Some(root.into());
        self
    }

    pub fn with_rotate_bytes(mut self, bytes: u64) -> Self {
        self.rotate_bytes = bytes;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, InitError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| InitError::Config(e.to_string()))?;
        if config.rotate_bytes == 0 {
            return Err(InitError::Config("rotate_bytes must be positive".to_string()));
        }
        Ok(config)
    }
}
