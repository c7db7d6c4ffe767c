//! Errors from reading, checking and saving `xbasic.toml`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly named config file does not exist.
    #[error("xbasic config file '{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("Could not read xbasic config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid xbasic config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not encode xbasic config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not write xbasic config '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An `XBASIC_<SECTION>_<KEY>` override that does not parse.
    #[error("{var}='{value}' is not valid: expected {expected}")]
    Override {
        var: String,
        value: String,
        expected: &'static str,
    },

    /// A file value outside what the toolchain can work with.
    #[error("[{section}] {key} = {value} is not valid: {reason}")]
    OutOfRange {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Nowhere to save a config that was built from defaults.
    #[error("No config directory: set XBASIC_CONFIG, XDG_CONFIG_HOME or HOME")]
    NoConfigDir,
}

impl ConfigError {
    pub fn bad_override(
        var: impl Into<String>,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::Override {
            var: var.into(),
            value: value.into(),
            expected,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
