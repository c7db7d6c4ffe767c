//! Classified compiler outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Appended to the output of a failing build that mentions the loader helper.
pub const HELPER_HINT: &str =
    "\nDid you set the right board type?\nHUB and C3 set 80MHz clock.\nHUB96 and SSF set 96MHz clock.";

/// What a build attempt amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildKind {
    Success,
    FailedToStart,
    FailedToTerminate,
    ToolCrashed,
    ToolReportedError,
    AmbiguousErrorInOutput,
}

impl BuildKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::Success => "xBasic Compiler Finished",
            Self::FailedToStart => "Could not start compiler.",
            Self::FailedToTerminate => "Error waiting for compiler to finish.",
            Self::ToolCrashed => "xBasic Compiler Crashed",
            Self::ToolReportedError | Self::AmbiguousErrorInOutput => "xBasic Compiler Error",
        }
    }
}

impl fmt::Display for BuildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::FailedToStart => "failed to start",
            Self::FailedToTerminate => "failed to terminate",
            Self::ToolCrashed => "tool crashed",
            Self::ToolReportedError => "tool reported error",
            Self::AmbiguousErrorInOutput => "error in output",
        };
        f.write_str(name)
    }
}

/// Outcome of one `build` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub kind: BuildKind,
    /// Combined compiler output, plus any hint.
    pub output: String,
    /// Only set for `Success` and `ToolReportedError`.
    pub exit_code: Option<i32>,
}

impl BuildResult {
    pub fn new(kind: BuildKind, output: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            kind,
            output: output.into(),
            exit_code,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == BuildKind::Success
    }

    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    pub fn has_hint(&self) -> bool {
        self.output.ends_with(HELPER_HINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles() {
        assert_eq!(BuildKind::ToolCrashed.title(), "xBasic Compiler Crashed");
        assert_eq!(
            BuildKind::AmbiguousErrorInOutput.title(),
            BuildKind::ToolReportedError.title()
        );
    }

    #[test]
    fn test_result_serializes_kind_name() {
        let result = BuildResult::new(BuildKind::ToolReportedError, "oops", Some(2));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "ToolReportedError");
        assert_eq!(json["exit_code"], 2);
        assert!(!result.is_success());
    }
}
