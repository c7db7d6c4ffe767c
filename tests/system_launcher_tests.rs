//! `SystemLauncher` against real processes.

#![cfg(unix)]

mod common;

use common::{Journal, RecordingHolder};
use serial_test::serial;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use xbasic_core::build::{
    BuildKind, BuildOrchestrator, BuildRequest, BuildSettings, BufferSet, LaunchSpec,
    PathSeparator, ProcessLauncher, ProcessOutcome, SystemLauncher,
};

fn sh(script: &str, finish: Duration, kill: bool) -> LaunchSpec {
    LaunchSpec {
        program: "/bin/sh".into(),
        args: vec!["-c".into(), script.into()],
        working_dir: None,
        start_timeout: Duration::from_secs(5),
        finish_timeout: finish,
        kill_on_timeout: kill,
    }
}

fn fake_compiler(dir: &Path, body: &str) -> String {
    let path = dir.join("xbcom");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
#[serial]
fn test_exit_code_and_streams() {
    let outcome = SystemLauncher::new().launch(&sh(
        "echo compiled; echo 'Helper not found' >&2; exit 3",
        Duration::from_secs(10),
        false,
    ));
    match outcome {
        ProcessOutcome::Exited { code, output } => {
            assert_eq!(code, 3);
            assert_eq!(output.stdout, "compiled\n");
            assert_eq!(output.stderr, "Helper not found\n");
            assert_eq!(output.combined(), "compiled\nHelper not found\n");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
#[serial]
fn test_signal_is_a_crash() {
    let outcome = SystemLauncher::new().launch(&sh("kill -SEGV $$", Duration::from_secs(10), false));
    assert!(matches!(outcome, ProcessOutcome::Crashed { .. }));
}

#[test]
#[serial]
fn test_hang_killed_when_configured() {
    let started = Instant::now();
    let outcome =
        SystemLauncher::new().launch(&sh("echo waiting; exec sleep 30", Duration::from_millis(300), true));
    assert!(started.elapsed() < Duration::from_secs(10));
    match outcome {
        ProcessOutcome::TimedOut { killed, .. } => assert!(killed),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
#[serial]
fn test_hang_left_running_by_default() {
    let started = Instant::now();
    let outcome = SystemLauncher::new().launch(&sh("sleep 2", Duration::from_millis(200), false));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(matches!(
        outcome,
        ProcessOutcome::TimedOut { killed: false, .. }
    ));
}

#[test]
#[serial]
fn test_background_helper_does_not_hold_the_run() {
    let started = Instant::now();
    let outcome = SystemLauncher::new().launch(&sh(
        "sleep 5 & echo done; exit 0",
        Duration::from_secs(1),
        false,
    ));
    assert!(started.elapsed() < Duration::from_secs(3));
    match outcome {
        ProcessOutcome::Exited { code, output } => {
            assert_eq!(code, 0);
            assert_eq!(output.stdout, "done\n");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
#[serial]
fn test_kill_does_not_wait_for_orphaned_helper() {
    let started = Instant::now();
    let outcome = SystemLauncher::new().launch(&sh(
        "sleep 5 & echo waiting; sleep 5",
        Duration::from_millis(500),
        true,
    ));
    assert!(started.elapsed() < Duration::from_secs(3));
    match outcome {
        ProcessOutcome::TimedOut { output, killed } => {
            assert!(killed);
            assert_eq!(output.stdout, "waiting\n");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
#[serial]
fn test_compiler_runs_in_its_own_directory() {
    let tools = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    let compiler = fake_compiler(tools.path(), "pwd; echo \"$@\"");
    let main = project.path().join("main.bas");
    std::fs::write(&main, "print \"hi\"\n").unwrap();

    let settings = BuildSettings {
        compiler,
        separator: PathSeparator::Slash,
        ..BuildSettings::default()
    };
    let orchestrator = BuildOrchestrator::new(settings);
    let request = BuildRequest::new(main.to_string_lossy(), "HUB", "/dev/ttyUSB0", "/inc/")
        .with_options("-v");

    let result = orchestrator
        .build(&request, &mut RecordingHolder::default(), &mut BufferSet::new())
        .unwrap();

    assert_eq!(result.kind, BuildKind::Success);
    let mut lines = result.output.lines();
    let cwd = Path::new(lines.next().unwrap()).canonicalize().unwrap();
    assert_eq!(cwd, tools.path().canonicalize().unwrap());
    let source_dir = format!("{}/", project.path().display());
    assert_eq!(
        lines.next().unwrap(),
        format!(
            "-b HUB -p /dev/ttyUSB0 -I /inc/ -I {source_dir} {} -v",
            main.display()
        )
    );
}

#[test]
#[serial]
fn test_dirty_buffer_saved_before_compile() {
    let tools = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    let main = project.path().join("main.bas");
    // the compiler prints the file it was given
    let compiler = fake_compiler(tools.path(), "shift 8; cat \"$1\"");

    let mut buffers = BufferSet::new();
    buffers.edit(&main, "print \"fresh\"\n");

    let orchestrator = BuildOrchestrator::new(BuildSettings {
        compiler,
        separator: PathSeparator::Slash,
        ..BuildSettings::default()
    });
    let request = BuildRequest::new(main.to_string_lossy(), "HUB", "/dev/ttyUSB0", "/inc/");
    let journal = Journal::default();
    let mut holder = RecordingHolder {
        journal: journal.clone(),
        ..RecordingHolder::default()
    };

    let result = orchestrator.build(&request, &mut holder, &mut buffers).unwrap();

    assert_eq!(result.output, "print \"fresh\"\n");
    assert_eq!(buffers.dirty_count(), 0);
    assert_eq!(journal.entries(), vec!["release"]);
}

#[test]
#[serial]
fn test_missing_compiler_fails_to_start() {
    let tools = TempDir::new().unwrap();
    let orchestrator = BuildOrchestrator::new(BuildSettings {
        compiler: tools.path().join("xbcom").to_string_lossy().into_owned(),
        separator: PathSeparator::Slash,
        ..BuildSettings::default()
    });
    let request = BuildRequest::new("/proj/main.bas", "HUB", "/dev/ttyUSB0", "/inc/");
    let result = orchestrator
        .build(&request, &mut RecordingHolder::default(), &mut BufferSet::new())
        .unwrap();
    assert_eq!(result.kind, BuildKind::FailedToStart);
    assert_eq!(result.title(), "Could not start compiler.");
}
