//! Subprocess boundary.
//!
//! [`ProcessLauncher`] runs one program to completion and reports what
//! happened without interpreting it. [`SystemLauncher`] does this with
//! `std::process`; tests substitute a recording fake.

use parking_lot::Mutex;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const WAIT_POLL: Duration = Duration::from_millis(10);
/// Minimum wait for output already in the pipe once the deadline is near.
const OUTPUT_GRACE: Duration = Duration::from_millis(100);

/// Everything needed to run the compiler once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    /// `None` runs in the current directory.
    pub working_dir: Option<PathBuf>,
    pub start_timeout: Duration,
    pub finish_timeout: Duration,
    /// Kill the process when it outlives `finish_timeout`.
    pub kill_on_timeout: bool,
}

/// Output captured from the three read paths, kept apart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Whatever the launcher read without regard to stream.
    pub generic: String,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    /// Generic, then stdout, then stderr, without removing repeats.
    pub fn combined(&self) -> String {
        let mut text =
            String::with_capacity(self.generic.len() + self.stdout.len() + self.stderr.len());
        text.push_str(&self.generic);
        text.push_str(&self.stdout);
        text.push_str(&self.stderr);
        text
    }
}

/// Raw result of running a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The program could not be started.
    FailedToStart { reason: String },
    /// The program was still running when the finish timeout passed.
    TimedOut { output: CapturedOutput, killed: bool },
    /// The program ended without an exit code (signal or crash).
    Crashed { output: CapturedOutput },
    Exited { code: i32, output: CapturedOutput },
}

pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, spec: &LaunchSpec) -> ProcessOutcome;
}

/// Runs programs with `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }

    fn start(spec: &LaunchSpec) -> Result<Child, String> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("compiler-spawn".into())
            .spawn(move || {
                let started = command.spawn();
                if let Err(mpsc::SendError(Ok(mut late))) = tx.send(started) {
                    // caller gave up waiting
                    let _ = late.kill();
                    let _ = late.wait();
                }
            })
            .map_err(|e| e.to_string())?;

        match rx.recv_timeout(spec.start_timeout) {
            Ok(Ok(child)) => Ok(child),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "did not start within {} ms",
                spec.start_timeout.as_millis()
            )),
        }
    }
}

/// Reads one output stream on its own thread.
///
/// Helpers the compiler leaves behind can hold the pipe open after the
/// compiler exits, so collection is bounded by the run's deadline and
/// keeps whatever arrived by then.
struct OutputDrain {
    bytes: Arc<Mutex<Vec<u8>>>,
    done: mpsc::Receiver<()>,
}

impl OutputDrain {
    fn spawn<R: Read + Send + 'static>(stream: Option<R>) -> Option<Self> {
        let mut stream = stream?;
        let bytes = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();
        let sink = Arc::clone(&bytes);
        thread::Builder::new()
            .name("compiler-output".into())
            .spawn(move || {
                let mut chunk = [0u8; 4096];
                loop {
                    match stream.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => {
                            debug!("compiler output read ended early: {e}");
                            break;
                        }
                    }
                }
                let _ = tx.send(());
            })
            .ok()?;
        Some(Self { bytes, done })
    }

    fn collect(self, deadline: Instant) -> String {
        let wait = deadline
            .saturating_duration_since(Instant::now())
            .max(OUTPUT_GRACE);
        if let Err(mpsc::RecvTimeoutError::Timeout) = self.done.recv_timeout(wait) {
            warn!("compiler output still open at deadline, keeping what arrived");
        }
        let bytes = self.bytes.lock();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn collect(drain: Option<OutputDrain>, deadline: Instant) -> String {
    drain.map(|d| d.collect(deadline)).unwrap_or_default()
}

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, spec: &LaunchSpec) -> ProcessOutcome {
        let mut child = match Self::start(spec) {
            Ok(child) => child,
            Err(reason) => return ProcessOutcome::FailedToStart { reason },
        };
        debug!(pid = child.id(), program = %spec.program, "compiler started");

        let stdout = OutputDrain::spawn(child.stdout.take());
        let stderr = OutputDrain::spawn(child.stderr.take());

        let deadline = Instant::now() + spec.finish_timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) if Instant::now() >= deadline => break None,
                Ok(None) => thread::sleep(WAIT_POLL),
                Err(e) => {
                    warn!("waiting for compiler failed: {e}");
                    break None;
                }
            }
        };

        let Some(status) = status else {
            let killed = spec.kill_on_timeout;
            if killed {
                warn!(pid = child.id(), "compiler still running, killing it");
                let _ = child.kill();
                let _ = child.wait();
            } else {
                warn!(pid = child.id(), "compiler still running, leaving it");
            }
            let output = CapturedOutput {
                generic: String::new(),
                stdout: collect(stdout, deadline),
                stderr: collect(stderr, deadline),
            };
            return ProcessOutcome::TimedOut { output, killed };
        };

        let output = CapturedOutput {
            generic: String::new(),
            stdout: collect(stdout, deadline),
            stderr: collect(stderr, deadline),
        };
        match status.code() {
            Some(code) => ProcessOutcome::Exited { code, output },
            None => ProcessOutcome::Crashed { output },
        }
    }
}
