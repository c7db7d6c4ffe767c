//! Application configuration.
//!
//! TOML file with environment overrides. Settings that were scattered
//! through the IDE (compiler location, include path, last board and port)
//! live here and are handed to the core as plain structs.
//!
//! # Configuration Resolution
//!
//! 1. `XBASIC_CONFIG` environment variable (explicit path)
//! 2. `./xbasic.toml`
//! 3. `~/.config/xbasic/xbasic.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\xbasic\xbasic.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! A zero build timeout is rejected with [`ConfigError::OutOfRange`].
//!
//! # Environment Overrides
//!
//! The pattern is `XBASIC_<SECTION>_<KEY>`:
//! - `XBASIC_TOOLCHAIN_COMPILER=/opt/xbasic/bin/xbcom`
//! - `XBASIC_TOOLCHAIN_INCLUDE_PATH=/opt/xbasic/include/`
//! - `XBASIC_SERIAL_DEFAULT_BAUD=57600`
//! - `XBASIC_BUILD_START_TIMEOUT_MS=10000`
//! - `XBASIC_BUILD_FINISH_TIMEOUT_MS=60000`
//! - `XBASIC_BUILD_KILL_ON_TIMEOUT=true`
//! - `XBASIC_LOGGING_LEVEL=debug`
//!
//! # Example
//!
//! ```rust,ignore
//! use xbasic_core::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//! println!("Boards from {}", config.toolchain.board_config_path().display());
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{
    BuildConfig, Config, LogFormat, LoggingConfig, RecentConfig, SerialConfig, ToolchainConfig,
    BOARD_CONFIG_FILE,
};
