//! Build errors.
//!
//! These cover what stops a build before the compiler runs. What happens
//! once it runs is a [`BuildResult`](super::BuildResult), not an error.

use super::result::BuildResult;
use crate::port::PortError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("No project: select the main project file before building")]
    NoProject,

    #[error("No board type selected")]
    NoBoard,

    #[error("Compiler not configured: specify the compiler application in the toolchain settings")]
    CompilerNotConfigured,

    #[error("Include path not configured: specify the include path in the toolchain settings")]
    IncludePathNotConfigured,

    #[error("Could not save '{path}': {source}")]
    SaveBuffer {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The build succeeded but the terminal could not take the port back.
    #[error("Could not reattach the terminal: {source}")]
    Reattach {
        result: Box<BuildResult>,
        #[source]
        source: PortError,
    },
}

impl BuildError {
    /// The compiler run this error followed, if there was one.
    pub fn build_result(&self) -> Option<&BuildResult> {
        match self {
            Self::Reattach { result, .. } => Some(result),
            _ => None,
        }
    }

    /// True for errors fixed by changing settings rather than source.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoProject
                | Self::NoBoard
                | Self::CompilerNotConfigured
                | Self::IncludePathNotConfigured
        )
    }
}
