//! Shared test utilities.
//!
//! - A fake compiler launcher that records what it was asked to run
//! - A port holder and workspace that log into the same journal, so tests
//!   can check the order of pre-build side effects

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use xbasic_core::build::{
    BuildError, BuildOrchestrator, BuildSettings, CapturedOutput, LaunchSpec, PathSeparator,
    ProcessLauncher, ProcessOutcome, Workspace,
};
use xbasic_core::port::PortError;
use xbasic_core::session::PortHolder;

/// Ordered record of side effects across collaborators.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<&'static str>>>);

impl Journal {
    pub fn push(&self, entry: &'static str) {
        self.0.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.0.lock().clone()
    }
}

/// Launcher that returns a canned outcome and records every spec.
#[derive(Debug, Clone)]
pub struct FakeLauncher {
    outcome: ProcessOutcome,
    calls: Arc<Mutex<Vec<LaunchSpec>>>,
    journal: Journal,
}

impl FakeLauncher {
    pub fn returning(outcome: ProcessOutcome, journal: &Journal) -> Self {
        Self {
            outcome,
            calls: Arc::default(),
            journal: journal.clone(),
        }
    }

    /// Launcher for a compiler that exits with `code` after printing `stdout`.
    pub fn exiting(code: i32, stdout: &str, journal: &Journal) -> Self {
        Self::returning(
            ProcessOutcome::Exited {
                code,
                output: CapturedOutput {
                    stdout: stdout.to_string(),
                    ..CapturedOutput::default()
                },
            },
            journal,
        )
    }

    pub fn calls(&self) -> Vec<LaunchSpec> {
        self.calls.lock().clone()
    }

    pub fn was_invoked(&self) -> bool {
        !self.calls.lock().is_empty()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, spec: &LaunchSpec) -> ProcessOutcome {
        self.journal.push("launch");
        self.calls.lock().push(spec.clone());
        self.outcome.clone()
    }
}

/// Port holder that only records release and reacquire.
#[derive(Debug, Clone, Default)]
pub struct RecordingHolder {
    pub journal: Journal,
    pub fail_reacquire: bool,
}

impl PortHolder for RecordingHolder {
    fn release_port(&mut self) {
        self.journal.push("release");
    }

    fn reacquire_port(&mut self) -> Result<(), PortError> {
        self.journal.push("reacquire");
        if self.fail_reacquire {
            Err(PortError::not_found("/dev/ttyUSB0"))
        } else {
            Ok(())
        }
    }
}

/// Workspace that reports `dirty` saved buffers.
#[derive(Debug, Clone, Default)]
pub struct RecordingWorkspace {
    pub journal: Journal,
    pub dirty: usize,
}

impl Workspace for RecordingWorkspace {
    fn save_dirty(&mut self) -> Result<usize, BuildError> {
        self.journal.push("save");
        Ok(std::mem::take(&mut self.dirty))
    }
}

/// Settings for a configured Unix toolchain.
pub fn unix_settings() -> BuildSettings {
    BuildSettings {
        compiler: "/opt/xbasic/bin/xbcom".to_string(),
        separator: PathSeparator::Slash,
        ..BuildSettings::default()
    }
}

pub fn orchestrator(launcher: FakeLauncher) -> BuildOrchestrator<FakeLauncher> {
    BuildOrchestrator::with_launcher(unix_settings(), launcher)
}

/// Board file with the two stock boards.
pub const STOCK_BOARDS: &str = "\
# board types shipped with the compiler
[HUB]
    clkfreq: 80000000
    clkmode: XTAL1+PLL16X
    baudrate: 115200
    rxpin: 31
    txpin: 30
    tvpin: 12
    text: hub
    data: hub

[C3]
    clkfreq: 80000000
    clkmode: XTAL1+PLL16X
    baudrate: 115200
    rxpin: 31
    txpin: 30
    text: flash
    data: ram
    flash-size: 1048576
    cache-driver: c3_cache.dat
    cache-size: 8192
";
