//! Configuration schema definitions.
//!
//! Every section carries `#[serde(default)]`, so a file only needs the keys
//! it changes.

use crate::build::{BuildSettings, PathSeparator};
use crate::port::BaudRate;
use crate::session::SessionSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Board file name looked up in the include directory.
pub const BOARD_CONFIG_FILE: &str = "xbasic.cfg";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub toolchain: ToolchainConfig,
    pub serial: SerialConfig,
    pub build: BuildConfig,
    /// Last selections, reused as command defaults
    pub recent: RecentConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Compiler settings for the orchestrator.
    pub fn build_settings(&self) -> BuildSettings {
        BuildSettings {
            compiler: self.toolchain.compiler.clone(),
            separator: self.toolchain.separator(),
            start_timeout: self.build.start_timeout(),
            finish_timeout: self.build.finish_timeout(),
            kill_on_timeout: self.build.kill_on_timeout,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            read_poll: self.serial.read_poll(),
            assert_dtr_on_open: self.serial.assert_dtr_on_open,
        }
    }
}

/// External compiler and its support files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Compiler executable
    pub compiler: String,
    /// Include directory, with trailing separator
    pub include_path: String,
    /// Board file; defaults to `xbasic.cfg` in the include directory
    pub board_config: Option<PathBuf>,
    /// Separator override; detected from the install directory when unset
    pub path_separator: Option<PathSeparator>,
}

impl ToolchainConfig {
    pub fn separator(&self) -> PathSeparator {
        self.path_separator.unwrap_or_else(PathSeparator::detect)
    }

    /// Include path with a trailing separator added when missing.
    pub fn include_dir(&self) -> String {
        let mut dir = self.include_path.clone();
        if !dir.is_empty() && !dir.ends_with(['/', '\\']) {
            dir.push(self.separator().as_char());
        }
        dir
    }

    /// Where the board catalog is read from.
    pub fn board_config_path(&self) -> PathBuf {
        match &self.board_config {
            Some(path) => path.clone(),
            None => PathBuf::from(format!("{}{}", self.include_dir(), BOARD_CONFIG_FILE)),
        }
    }
}

/// Serial terminal section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub default_baud: BaudRate,
    /// Reader wait per cycle, in milliseconds
    pub read_poll_ms: u64,
    pub assert_dtr_on_open: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            default_baud: BaudRate::B115200,
            read_poll_ms: 20,
            assert_dtr_on_open: false,
        }
    }
}

impl SerialConfig {
    pub fn read_poll(&self) -> Duration {
        Duration::from_millis(self.read_poll_ms.max(1))
    }
}

/// Compiler run limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub start_timeout_ms: u64,
    pub finish_timeout_ms: u64,
    /// Kill a compiler that outlives the finish timeout
    pub kill_on_timeout: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            start_timeout_ms: 30_000,
            finish_timeout_ms: 30_000,
            kill_on_timeout: false,
        }
    }
}

impl BuildConfig {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn finish_timeout(&self) -> Duration {
        Duration::from_millis(self.finish_timeout_ms)
    }
}

/// Last used board, port and project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentConfig {
    pub board: Option<String>,
    pub port: Option<String>,
    pub project: Option<String>,
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// "trace", "debug", "info", "warn" or "error"; `RUST_LOG` wins
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    #[default]
    Compact,
}
