//! What to build and how.

use serde::{Deserialize, Serialize};
use std::fmt;

/// IDE command that starts the compiler, and the option it passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildAction {
    /// Compile and verify.
    Build,
    /// Compile and write to EEPROM.
    BurnEeprom,
    /// Compile, load to RAM and start.
    Run,
    /// Same as `Run`, then attach the terminal.
    Debug,
}

impl BuildAction {
    pub const ALL: [BuildAction; 4] = [Self::Build, Self::BurnEeprom, Self::Run, Self::Debug];

    pub fn options(self) -> &'static str {
        match self {
            Self::Build => "-v",
            Self::BurnEeprom => "-e",
            Self::Run | Self::Debug => "-r",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::BurnEeprom => "burn",
            Self::Run => "run",
            Self::Debug => "debug",
        }
    }

    /// Whether the terminal should reattach after a successful run.
    pub fn attaches_terminal(self) -> bool {
        matches!(self, Self::Debug)
    }
}

impl fmt::Display for BuildAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One compiler invocation.
///
/// Paths are kept as text: the source directory is cut out of the project
/// path by separator character, and the include path is passed through
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub board: String,
    pub port: String,
    pub include_path: String,
    pub project: String,
    /// Passed to the compiler as a single argument.
    pub options: String,
}

impl BuildRequest {
    pub fn new(
        project: impl Into<String>,
        board: impl Into<String>,
        port: impl Into<String>,
        include_path: impl Into<String>,
    ) -> Self {
        Self {
            board: board.into(),
            port: port.into(),
            include_path: include_path.into(),
            project: project.into(),
            options: String::new(),
        }
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }

    /// Set the options an IDE command would pass.
    pub fn for_action(self, action: BuildAction) -> Self {
        self.with_options(action.options())
    }
}
