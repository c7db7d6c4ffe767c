//! Tests against a real serial device.
//!
//! Run with `--features hardware-tests` and `XBASIC_TEST_PORT` naming a
//! port with a board attached (or a loopback plug).

#![cfg(feature = "hardware-tests")]

use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use xbasic_core::port::{available_ports, BaudRate, SystemPortOpener};
use xbasic_core::session::{SerialSession, SessionState};

fn test_port() -> Option<String> {
    match std::env::var("XBASIC_TEST_PORT") {
        Ok(port) if !port.is_empty() => Some(port),
        _ => {
            eprintln!("XBASIC_TEST_PORT not set, skipping");
            None
        }
    }
}

#[test]
#[serial]
fn test_configured_port_is_listed() {
    let Some(port) = test_port() else { return };
    let ports = available_ports().unwrap();
    assert!(ports.iter().any(|p| p.name == port), "{port} not in {ports:?}");
}

#[test]
#[serial]
fn test_open_close_reopen() {
    let Some(port) = test_port() else { return };
    let mut session = SerialSession::new(Arc::new(SystemPortOpener));
    session.init(port, BaudRate::B115200);

    session.open().unwrap();
    assert_eq!(session.state(), SessionState::Open);
    session.send(b"\n").unwrap();
    session.next_event(Duration::from_millis(200));

    session.close();
    assert_eq!(session.state(), SessionState::Bound);
    session.open().unwrap();
    session.close();
}
