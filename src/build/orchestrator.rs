//! Turns a [`BuildRequest`] into one compiler run and a [`BuildResult`].

use super::error::BuildError;
use super::launcher::{LaunchSpec, ProcessLauncher, ProcessOutcome, SystemLauncher};
use super::request::BuildRequest;
use super::result::{BuildKind, BuildResult, HELPER_HINT};
use super::workspace::Workspace;
use crate::session::PortHolder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Directory separator used to cut the source directory out of the
/// project path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PathSeparator {
    #[default]
    #[serde(rename = "/")]
    Slash,
    #[serde(rename = "\\")]
    Backslash,
}

impl PathSeparator {
    pub fn as_char(self) -> char {
        match self {
            Self::Slash => '/',
            Self::Backslash => '\\',
        }
    }

    /// Backslash if `path` contains one, else slash.
    pub fn detect_from(path: &str) -> Self {
        if path.contains('\\') {
            Self::Backslash
        } else {
            Self::Slash
        }
    }

    /// Detect from the directory this executable is installed in.
    pub fn detect() -> Self {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.to_string_lossy().into_owned()))
            .map(|dir| Self::detect_from(&dir))
            .unwrap_or_default()
    }
}

/// Compiler location and run limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Compiler executable. Empty means not configured.
    pub compiler: String,
    pub separator: PathSeparator,
    pub start_timeout: Duration,
    pub finish_timeout: Duration,
    pub kill_on_timeout: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            compiler: String::new(),
            separator: PathSeparator::default(),
            start_timeout: Duration::from_secs(30),
            finish_timeout: Duration::from_secs(30),
            kill_on_timeout: false,
        }
    }
}

/// Runs the external compiler for IDE commands.
#[derive(Debug)]
pub struct BuildOrchestrator<L = SystemLauncher> {
    settings: BuildSettings,
    launcher: L,
}

impl BuildOrchestrator<SystemLauncher> {
    pub fn new(settings: BuildSettings) -> Self {
        Self::with_launcher(settings, SystemLauncher::new())
    }
}

impl<L: ProcessLauncher> BuildOrchestrator<L> {
    pub fn with_launcher(settings: BuildSettings, launcher: L) -> Self {
        Self { settings, launcher }
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Reject requests that cannot be built, before anything is touched.
    pub fn preflight(&self, request: &BuildRequest) -> Result<(), BuildError> {
        let rejection = if request.project.is_empty() {
            Some(BuildError::NoProject)
        } else if self.settings.compiler.is_empty() {
            Some(BuildError::CompilerNotConfigured)
        } else if request.include_path.is_empty() {
            Some(BuildError::IncludePathNotConfigured)
        } else if request.board.is_empty() {
            Some(BuildError::NoBoard)
        } else {
            None
        };
        match rejection {
            Some(e) => {
                warn!("build rejected: {e}");
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Project path with the file name cut off, keeping the trailing
    /// separator. Empty when the path has no separator.
    pub fn source_directory(&self, project: &str) -> String {
        match project.rfind(self.settings.separator.as_char()) {
            Some(i) => project[..=i].to_string(),
            None => String::new(),
        }
    }

    /// Compiler argument vector, in the order the compiler expects:
    /// `-b board -p port -I include -I source_dir project [options]`.
    ///
    /// The options string is passed as one argument. The IDE always
    /// appended it, even when empty; here an empty string is left out
    /// instead of being passed as `""`. That is the one place this vector
    /// differs from the IDE's command line.
    pub fn assemble_args(&self, request: &BuildRequest) -> Vec<String> {
        let mut args = vec![
            "-b".to_string(),
            request.board.clone(),
            "-p".to_string(),
            request.port.clone(),
            "-I".to_string(),
            request.include_path.clone(),
            "-I".to_string(),
            self.source_directory(&request.project),
            request.project.clone(),
        ];
        if !request.options.is_empty() {
            args.push(request.options.clone());
        }
        args
    }

    /// The compiler's own installation directory.
    pub fn working_dir(&self) -> Option<PathBuf> {
        let compiler = &self.settings.compiler;
        let cut = if compiler.contains('\\') {
            compiler.rfind('\\')
        } else {
            compiler.rfind('/')
        };
        cut.map(|i| PathBuf::from(&compiler[..=i]))
    }

    /// Run the compiler once for `request`.
    ///
    /// The port is released and dirty buffers saved before the compiler
    /// starts. The port is left released afterwards.
    pub fn build(
        &self,
        request: &BuildRequest,
        port: &mut dyn PortHolder,
        workspace: &mut dyn Workspace,
    ) -> Result<BuildResult, BuildError> {
        self.preflight(request)?;
        let args = self.assemble_args(request);

        port.release_port();
        let saved = workspace.save_dirty()?;
        if saved > 0 {
            debug!(saved, "saved dirty buffers");
        }

        let spec = LaunchSpec {
            program: self.settings.compiler.clone(),
            args,
            working_dir: self.working_dir(),
            start_timeout: self.settings.start_timeout,
            finish_timeout: self.settings.finish_timeout,
            kill_on_timeout: self.settings.kill_on_timeout,
        };
        info!(compiler = %spec.program, args = ?spec.args, "starting compiler");

        let result = classify(self.launcher.launch(&spec));
        match result.kind {
            BuildKind::Success => info!(kind = %result.kind, "compiler finished"),
            _ => error!(kind = %result.kind, exit_code = ?result.exit_code, "compiler failed"),
        }
        Ok(result)
    }

    /// Build, and on success take the port back so the terminal sees the
    /// program start.
    ///
    /// If the port cannot be taken back, the finished build comes back
    /// inside [`BuildError::Reattach`].
    pub fn debug(
        &self,
        request: &BuildRequest,
        port: &mut dyn PortHolder,
        workspace: &mut dyn Workspace,
    ) -> Result<BuildResult, BuildError> {
        let result = self.build(request, port, workspace)?;
        if result.is_success() {
            if let Err(source) = port.reacquire_port() {
                error!("could not reattach terminal: {source}");
                return Err(BuildError::Reattach {
                    result: Box::new(result),
                    source,
                });
            }
            info!("terminal attached after run");
        }
        Ok(result)
    }
}

/// Map a raw process outcome to a build result. Checks run in order:
/// start, termination, crash, exit code, then the output text.
pub fn classify(outcome: ProcessOutcome) -> BuildResult {
    match outcome {
        ProcessOutcome::FailedToStart { reason } => {
            BuildResult::new(BuildKind::FailedToStart, reason, None)
        }
        ProcessOutcome::TimedOut { output, .. } => {
            BuildResult::new(BuildKind::FailedToTerminate, output.combined(), None)
        }
        ProcessOutcome::Crashed { output } => {
            BuildResult::new(BuildKind::ToolCrashed, output.combined(), None)
        }
        ProcessOutcome::Exited { code, output } => {
            let mut text = output.combined();
            if code != 0 {
                if text.to_lowercase().contains("helper") {
                    text.push_str(HELPER_HINT);
                }
                BuildResult::new(BuildKind::ToolReportedError, text, Some(code))
            } else if text.contains("error") {
                BuildResult::new(BuildKind::AmbiguousErrorInOutput, text, None)
            } else {
                BuildResult::new(BuildKind::Success, text, Some(0))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::launcher::CapturedOutput;
    use pretty_assertions::assert_eq;

    struct NeverLauncher;

    impl ProcessLauncher for NeverLauncher {
        fn launch(&self, _spec: &LaunchSpec) -> ProcessOutcome {
            panic!("compiler should not run");
        }
    }

    fn orchestrator(compiler: &str, separator: PathSeparator) -> BuildOrchestrator<NeverLauncher> {
        let settings = BuildSettings {
            compiler: compiler.to_string(),
            separator,
            ..BuildSettings::default()
        };
        BuildOrchestrator::with_launcher(settings, NeverLauncher)
    }

    fn exited(code: i32, stdout: &str) -> ProcessOutcome {
        ProcessOutcome::Exited {
            code,
            output: CapturedOutput {
                stdout: stdout.to_string(),
                ..CapturedOutput::default()
            },
        }
    }

    #[test]
    fn test_argument_vector() {
        let o = orchestrator("/opt/xbasic/bin/xbcom", PathSeparator::Slash);
        let request =
            BuildRequest::new("/proj/main.bas", "C3", "/dev/ttyUSB0", "/inc/").with_options("-v");
        assert_eq!(
            o.assemble_args(&request),
            vec!["-b", "C3", "-p", "/dev/ttyUSB0", "-I", "/inc/", "-I", "/proj/", "/proj/main.bas", "-v"]
        );
    }

    #[test]
    fn test_empty_options_left_out() {
        let o = orchestrator("/opt/xbasic/bin/xbcom", PathSeparator::Slash);
        let request = BuildRequest::new("/proj/main.bas", "C3", "/dev/ttyUSB0", "/inc/");
        let args = o.assemble_args(&request);
        assert_eq!(args.len(), 9);
        assert_eq!(args.last().map(String::as_str), Some("/proj/main.bas"));

        // multi-word options stay one argument
        let request = request.with_options("-e -v");
        assert_eq!(o.assemble_args(&request).last().map(String::as_str), Some("-e -v"));
    }

    #[test]
    fn test_source_directory_uses_separator() {
        let o = orchestrator("C:\\xbasic\\xbcom.exe", PathSeparator::Backslash);
        assert_eq!(o.source_directory("C:\\work\\blink\\blink.bas"), "C:\\work\\blink\\");
        assert_eq!(o.source_directory("blink.bas"), "");
    }

    #[test]
    fn test_working_dir_prefers_backslash() {
        let o = orchestrator("C:\\xbasic/bin\\xbcom.exe", PathSeparator::Backslash);
        assert_eq!(o.working_dir(), Some(PathBuf::from("C:\\xbasic/bin\\")));
        let o = orchestrator("/usr/local/bin/xbcom", PathSeparator::Slash);
        assert_eq!(o.working_dir(), Some(PathBuf::from("/usr/local/bin/")));
        let o = orchestrator("xbcom", PathSeparator::Slash);
        assert_eq!(o.working_dir(), None);
    }

    #[test]
    fn test_preflight_order() {
        let o = orchestrator("", PathSeparator::Slash);
        let empty = BuildRequest::default();
        assert!(matches!(o.preflight(&empty), Err(BuildError::NoProject)));

        let request = BuildRequest::new("/p/main.bas", "", "COM1", "");
        assert!(matches!(o.preflight(&request), Err(BuildError::CompilerNotConfigured)));

        let o = orchestrator("/bin/xbcom", PathSeparator::Slash);
        assert!(matches!(o.preflight(&request), Err(BuildError::IncludePathNotConfigured)));

        let request = BuildRequest::new("/p/main.bas", "", "COM1", "/inc/");
        assert!(matches!(o.preflight(&request), Err(BuildError::NoBoard)));
    }

    #[test]
    fn test_helper_hint_on_error_exit() {
        let result = classify(exited(1, "Helper not found"));
        assert_eq!(result.kind, BuildKind::ToolReportedError);
        assert_eq!(result.exit_code, Some(1));
        assert!(result.output.starts_with("Helper not found"));
        assert!(result.has_hint());
    }

    #[test]
    fn test_hint_match_is_case_insensitive() {
        let result = classify(exited(2, "loader HELPER missing"));
        assert!(result.has_hint());
        assert!(!classify(exited(2, "syntax error")).has_hint());
    }

    #[test]
    fn test_zero_errors_is_ambiguous() {
        let result = classify(exited(0, "0 errors"));
        assert_eq!(result.kind, BuildKind::AmbiguousErrorInOutput);
        assert!(!result.has_hint());
    }

    #[test]
    fn test_clean_exit_succeeds() {
        let result = classify(exited(0, "Done."));
        assert_eq!(result.kind, BuildKind::Success);
        assert_eq!(result.exit_code, Some(0));
    }

    #[test]
    fn test_error_match_is_case_sensitive() {
        assert!(classify(exited(0, "No ERRORS")).is_success());
    }

    #[test]
    fn test_crash_beats_output() {
        let result = classify(ProcessOutcome::Crashed {
            output: CapturedOutput {
                stderr: "error".into(),
                ..CapturedOutput::default()
            },
        });
        assert_eq!(result.kind, BuildKind::ToolCrashed);
        assert_eq!(result.exit_code, None);
    }

    #[test]
    fn test_timeout_and_start_failure() {
        let timed_out = classify(ProcessOutcome::TimedOut {
            output: CapturedOutput::default(),
            killed: false,
        });
        assert_eq!(timed_out.kind, BuildKind::FailedToTerminate);
        let not_started = classify(ProcessOutcome::FailedToStart {
            reason: "No such file or directory".into(),
        });
        assert_eq!(not_started.kind, BuildKind::FailedToStart);
        assert_eq!(not_started.output, "No such file or directory");
    }

    #[test]
    fn test_separator_detection() {
        assert_eq!(PathSeparator::detect_from("C:\\Program Files\\xBasic"), PathSeparator::Backslash);
        assert_eq!(PathSeparator::detect_from("/usr/local/bin"), PathSeparator::Slash);
    }
}
