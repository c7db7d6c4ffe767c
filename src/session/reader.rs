//! Reader worker owned by an open session.
//!
//! The worker reads from its own clone of the device handle and forwards
//! bursts and handshake transitions over a channel. It never touches the
//! sink; the session owner drains the channel on its own loop.
//!
//! The channel holds at most [`EVENT_QUEUE_DEPTH`] events. When the owner
//! falls behind, the worker stops reading and the device's own buffering
//! takes over until there is room again.

use super::events::SessionEvent;
use crate::port::{PortError, SerialPortAdapter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

const READ_BUFFER_SIZE: usize = 1024;

/// Bursts and handshake changes waiting for the owner.
pub(crate) const EVENT_QUEUE_DEPTH: usize = 256;

/// Queue `event`, waiting while the queue is full. False once the owner
/// is gone or has asked the worker to stop.
fn forward(
    events: &SyncSender<SessionEvent>,
    stop: &AtomicBool,
    poll: Duration,
    mut event: SessionEvent,
) -> bool {
    loop {
        match events.try_send(event) {
            Ok(()) => return true,
            Err(TrySendError::Disconnected(_)) => return false,
            Err(TrySendError::Full(pending)) => {
                if stop.load(Ordering::Acquire) {
                    debug!("event queue full at stop, dropping one event");
                    return false;
                }
                event = pending;
                thread::sleep(poll);
            }
        }
    }
}

/// Handle to a running reader; stopping joins the thread.
pub(crate) struct ReaderHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Start reading from `port`.
    ///
    /// `initial_handshake` is the DSR level observed at open; only changes
    /// from it are reported.
    pub(crate) fn spawn(
        mut port: Box<dyn SerialPortAdapter>,
        poll: Duration,
        initial_handshake: bool,
        events: SyncSender<SessionEvent>,
    ) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let name = format!("serial-reader:{}", port.name());

        if let Err(e) = port.set_timeout(poll) {
            warn!(port = port.name(), "could not set reader timeout: {e}");
        }

        let thread = thread::Builder::new().name(name).spawn(move || {
            let mut buffer = [0u8; READ_BUFFER_SIZE];
            let mut handshake = initial_handshake;

            while !stop_flag.load(Ordering::Acquire) {
                match port.read_bytes(&mut buffer) {
                    Ok(0) => {}
                    Ok(n) => {
                        let burst = SessionEvent::Data(buffer[..n].to_vec());
                        if !forward(&events, &stop_flag, poll, burst) {
                            break;
                        }
                    }
                    Err(PortError::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(poll);
                    }
                    Err(e) if e.is_idle() => {}
                    Err(e) => {
                        warn!(port = port.name(), "serial read failed: {e}");
                        forward(&events, &stop_flag, poll, SessionEvent::ReadFailed(e.to_string()));
                        break;
                    }
                }

                if let Ok(level) = port.data_set_ready() {
                    if level != handshake {
                        handshake = level;
                        if !forward(&events, &stop_flag, poll, SessionEvent::Handshake(level)) {
                            break;
                        }
                    }
                }
            }

            debug!(port = port.name(), "serial reader stopped");
        })?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Stop the worker and wait for it to release its handle.
    pub(crate) fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("serial reader panicked");
            }
        }
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
