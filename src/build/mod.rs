//! Compiler orchestration.
//!
//! ```text
//! BuildRequest --preflight--> args --release port--> save buffers
//!              --launch--> ProcessOutcome --classify--> BuildResult
//! ```

mod error;
mod launcher;
mod orchestrator;
mod request;
mod result;
mod workspace;

pub use error::BuildError;
pub use launcher::{CapturedOutput, LaunchSpec, ProcessLauncher, ProcessOutcome, SystemLauncher};
pub use orchestrator::{classify, BuildOrchestrator, BuildSettings, PathSeparator};
pub use request::{BuildAction, BuildRequest};
pub use result::{BuildKind, BuildResult, HELPER_HINT};
pub use workspace::{Buffer, BufferSet, Workspace, DIRTY_MARKER};
