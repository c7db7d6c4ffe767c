//! Unified application error type for the command-line front end.
//!
//! Library components return their own errors; the binary folds them into
//! [`AppError`] with `?`.

use crate::build::BuildError;
use crate::config::ConfigError;
use crate::port::PortError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Unknown board type '{0}'")]
    UnknownBoard(String),

    #[error("Missing {0}: pass it on the command line or set it in the config file")]
    MissingArgument(&'static str),

    #[error("An I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("A serialization error occurred: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A specialized `Result` type for the command-line front end.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::MissingArgument(_) | Self::UnknownBoard(_) => 2,
            Self::Build(e) if e.is_configuration() => 2,
            _ => 1,
        }
    }
}
