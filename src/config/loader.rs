//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use crate::port::BaudRate;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "XBASIC";

/// Config file name
const CONFIG_FILE_NAME: &str = "xbasic.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "XBASIC_CONFIG";

/// Application directory under the platform config directory
const APP_DIR: &str = "xbasic";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// 1. `XBASIC_CONFIG` environment variable (explicit path)
    /// 2. `./xbasic.toml`
    /// 3. `~/.config/xbasic/xbasic.toml` (`%APPDATA%\xbasic` on Windows)
    /// 4. Built-in defaults
    ///
    /// Environment variables override file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };
        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        let overridden = apply_env_overrides(&mut config).and_then(|()| validate(&config));
        if let Err(e) = overridden {
            tracing::warn!("ignoring environment overrides: {e}");
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save to the resolved path, or to the default location when the
    /// configuration came from defaults only.
    pub fn save(&mut self) -> ConfigResult<PathBuf> {
        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => get_default_config_path().ok_or(ConfigError::NoConfigDir)?,
        };
        save_to_file(&self.config, &path)?;
        self.config_path = Some(path.clone());
        Ok(path)
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!(path = %path.display(), "{CONFIG_PATH_ENV} points to a missing file");
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|path| path.exists())
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

fn env_var(key: &str) -> Option<(String, String)> {
    let name = format!("{ENV_PREFIX}_{key}");
    std::env::var(&name).ok().map(|value| (name, value))
}

/// Apply `XBASIC_<SECTION>_<KEY>` overrides.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some((_, val)) = env_var("TOOLCHAIN_COMPILER") {
        config.toolchain.compiler = val;
    }
    if let Some((_, val)) = env_var("TOOLCHAIN_INCLUDE_PATH") {
        config.toolchain.include_path = val;
    }
    if let Some((_, val)) = env_var("TOOLCHAIN_BOARD_CONFIG") {
        config.toolchain.board_config = Some(PathBuf::from(val));
    }

    if let Some((name, val)) = env_var("SERIAL_DEFAULT_BAUD") {
        config.serial.default_baud = val
            .parse::<BaudRate>()
            .map_err(|_| ConfigError::bad_override(name, &val, "a supported baud rate"))?;
    }

    if let Some((name, val)) = env_var("BUILD_START_TIMEOUT_MS") {
        config.build.start_timeout_ms = parse_millis(name, &val)?;
    }
    if let Some((name, val)) = env_var("BUILD_FINISH_TIMEOUT_MS") {
        config.build.finish_timeout_ms = parse_millis(name, &val)?;
    }
    if let Some((name, val)) = env_var("BUILD_KILL_ON_TIMEOUT") {
        config.build.kill_on_timeout = match val.to_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => return Err(ConfigError::bad_override(name, &val, "true or false")),
        };
    }

    if let Some((_, val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }

    Ok(())
}

fn parse_millis(name: String, val: &str) -> ConfigResult<u64> {
    val.parse()
        .map_err(|_| ConfigError::bad_override(name, val, "a timeout in milliseconds"))
}

/// Reject values that would make every build or read fail.
fn validate(config: &Config) -> ConfigResult<()> {
    let timeouts = [
        ("start_timeout_ms", config.build.start_timeout_ms),
        ("finish_timeout_ms", config.build.finish_timeout_ms),
    ];
    for (key, value) in timeouts {
        if value == 0 {
            return Err(ConfigError::OutOfRange {
                section: "build",
                key,
                value: value.to_string(),
                reason: "a compiler cannot start or finish in 0 ms",
            });
        }
    }
    Ok(())
}

/// Get the default config directory for creating new config files.
pub fn get_default_config_dir() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join(APP_DIR))
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}
