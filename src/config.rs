use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "amfile.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings for the command-line front end.  Missing keys take their
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter:   String,
    /// Destination for `--log-file`.
    pub log_file:     PathBuf,
    /// Raw 16-byte ICF key, used when no `--key` is given.
    pub icf_key_file: PathBuf,
    /// Raw 16-byte ICF IV, used when no `--iv` is given.
    pub icf_iv_file:  PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter:   "info".into(),
            log_file:     "amfile.log".into(),
            icf_key_file: "icf_key.bin".into(),
            icf_iv_file:  "icf_iv.bin".into(),
        }
    }
}

impl Config {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_bytes(&std::fs::read(path)?)
    }

    /// Load `path`, or defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_bytes(&bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}
