//! Serial session lifecycle.
//!
//! A [`SerialSession`] owns at most one open device handle. It moves between
//! three states:
//!
//! ```text
//! Unbound --init--> Bound --open--> Open
//!                     ^               |
//!                     +----close------+
//! ```
//!
//! `init` may be called in any state and always closes an open handle before
//! rebinding. Inbound bytes are read by a worker the session owns and queued;
//! the owner's loop calls [`SerialSession::dispatch_pending`] to deliver
//! them, in arrival order, to the terminal sink and registered callbacks.
//! `send`, `open` and `close` never wait on inbound data.

mod events;
mod reader;
mod sink;

pub use events::SessionEvent;
pub use sink::{BufferSink, TerminalSink, WriterSink};

use crate::port::{BaudRate, PortConfiguration, PortError, PortOpener, SerialPortAdapter};
use reader::{ReaderHandle, EVENT_QUEUE_DEPTH};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

type DataHandler = Box<dyn FnMut(&[u8]) + Send>;
type HandshakeHandler = Box<dyn FnMut(bool) + Send>;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Unbound,
    Bound,
    Open,
}

/// Port and rate the session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub port_name: String,
    pub baud_rate: BaudRate,
}

/// Tunables for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// How long one reader cycle waits for data before checking the
    /// handshake line and the stop flag.
    pub read_poll: Duration,
    /// Raise DTR after opening.
    pub assert_dtr_on_open: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            read_poll: Duration::from_millis(20),
            assert_dtr_on_open: false,
        }
    }
}

struct OpenLink {
    port: Box<dyn SerialPortAdapter>,
    reader: ReaderHandle,
    events: Receiver<SessionEvent>,
}

/// One serial connection to a target board.
pub struct SerialSession {
    opener: Arc<dyn PortOpener>,
    settings: SessionSettings,
    binding: Option<PortBinding>,
    link: Option<OpenLink>,
    sink: Option<Box<dyn TerminalSink>>,
    data_handlers: Vec<DataHandler>,
    handshake_handlers: Vec<HandshakeHandler>,
    handshake: bool,
    reader_error: Option<String>,
    decoder: Utf8Decoder,
}

impl SerialSession {
    /// Create an unbound session that opens devices through `opener`.
    pub fn new(opener: Arc<dyn PortOpener>) -> Self {
        Self::with_settings(opener, SessionSettings::default())
    }

    pub fn with_settings(opener: Arc<dyn PortOpener>, settings: SessionSettings) -> Self {
        Self {
            opener,
            settings,
            binding: None,
            link: None,
            sink: None,
            data_handlers: Vec::new(),
            handshake_handlers: Vec::new(),
            handshake: false,
            reader_error: None,
            decoder: Utf8Decoder::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.binding, &self.link) {
            (_, Some(_)) => SessionState::Open,
            (Some(_), None) => SessionState::Bound,
            (None, None) => SessionState::Unbound,
        }
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    pub fn binding(&self) -> Option<&PortBinding> {
        self.binding.as_ref()
    }

    /// Last observed level of the handshake line.
    pub fn handshake(&self) -> bool {
        self.handshake
    }

    /// Why the reader stopped, if it failed since the last open.
    pub fn reader_error(&self) -> Option<&str> {
        self.reader_error.as_deref()
    }

    /// Bind to a port, closing any open handle first. Does not open.
    pub fn init(&mut self, port_name: impl Into<String>, baud_rate: BaudRate) {
        self.close();
        let binding = PortBinding {
            port_name: port_name.into(),
            baud_rate,
        };
        info!(port = %binding.port_name, baud = %binding.baud_rate, "serial session bound");
        self.binding = Some(binding);
    }

    /// Open the bound port. Opening an open session does nothing.
    ///
    /// The device is opened once. The reader thread works on a duplicate of
    /// that handle (`try_clone` on the same open device), which is released
    /// with it on `close`.
    pub fn open(&mut self) -> Result<(), PortError> {
        if self.link.is_some() {
            debug!("serial session already open");
            return Ok(());
        }
        let binding = self.binding.as_ref().ok_or(PortError::Unbound)?;

        let config = PortConfiguration {
            baud_rate: binding.baud_rate,
            timeout: self.settings.read_poll,
        };
        let mut port = self.opener.open(&binding.port_name, &config)?;

        if self.settings.assert_dtr_on_open {
            port.set_data_terminal_ready(true)?;
        }
        let handshake = port.data_set_ready().unwrap_or(false);

        let reader_port = port.try_clone_adapter()?;
        let (tx, rx) = mpsc::sync_channel(EVENT_QUEUE_DEPTH);
        let reader = ReaderHandle::spawn(reader_port, self.settings.read_poll, handshake, tx)?;

        self.handshake = handshake;
        self.reader_error = None;
        self.decoder = Utf8Decoder::default();
        self.link = Some(OpenLink {
            port,
            reader,
            events: rx,
        });

        info!(port = %binding.port_name, baud = %binding.baud_rate, handshake, "serial session opened");
        Ok(())
    }

    /// Release the device handle. Closing a closed session does nothing.
    ///
    /// Bytes already read from the device are delivered before the handle
    /// is dropped; the binding is kept for a later `open`.
    pub fn close(&mut self) {
        let Some(mut link) = self.link.take() else {
            return;
        };

        link.reader.stop();
        let pending: Vec<SessionEvent> = link.events.try_iter().collect();
        for event in pending {
            self.deliver(&event);
        }
        drop(link);

        if let Some(binding) = &self.binding {
            info!(port = %binding.port_name, "serial session closed");
        }
    }

    /// Write bytes to the device. Returns 0 without writing when closed.
    pub fn send(&mut self, data: &[u8]) -> Result<usize, PortError> {
        match &mut self.link {
            Some(link) => link.port.write_bytes(data),
            None => {
                debug!(bytes = data.len(), "send on closed serial session ignored");
                Ok(0)
            }
        }
    }

    /// Drive the DTR line. Does nothing when closed.
    pub fn set_dtr(&mut self, level: bool) -> Result<(), PortError> {
        match &mut self.link {
            Some(link) => link.port.set_data_terminal_ready(level),
            None => Ok(()),
        }
    }

    /// Route decoded inbound text to `sink`.
    ///
    /// Events already received are flushed to the previous sink first, so
    /// the new sink only sees bytes received from now on.
    pub fn set_terminal_sink(&mut self, sink: Box<dyn TerminalSink>) {
        self.dispatch_pending();
        self.sink = Some(sink);
    }

    /// Call `handler` with every inbound burst.
    pub fn on_data_received(&mut self, handler: impl FnMut(&[u8]) + Send + 'static) {
        self.data_handlers.push(Box::new(handler));
    }

    /// Call `handler` on every handshake-line transition.
    pub fn on_handshake_changed(&mut self, handler: impl FnMut(bool) + Send + 'static) {
        self.handshake_handlers.push(Box::new(handler));
    }

    /// Deliver every queued event without blocking. Returns how many were
    /// delivered.
    pub fn dispatch_pending(&mut self) -> usize {
        let pending: Vec<SessionEvent> = match &self.link {
            Some(link) => link.events.try_iter().collect(),
            None => return 0,
        };
        for event in &pending {
            self.deliver(event);
        }
        pending.len()
    }

    /// Wait up to `timeout` for one event, deliver it and return it.
    pub fn next_event(&mut self, timeout: Duration) -> Option<SessionEvent> {
        let received = match &self.link {
            Some(link) => link.events.recv_timeout(timeout),
            None => return None,
        };
        match received {
            Ok(event) => {
                self.deliver(&event);
                Some(event)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn deliver(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Data(bytes) => {
                let text = self.decoder.decode(bytes);
                if let Some(sink) = self.sink.as_mut() {
                    if !text.is_empty() {
                        sink.append(&text);
                    }
                }
                for handler in &mut self.data_handlers {
                    handler(bytes);
                }
            }
            SessionEvent::Handshake(level) => {
                self.handshake = *level;
                info!(level, "serial handshake line changed");
                for handler in &mut self.handshake_handlers {
                    handler(*level);
                }
            }
            SessionEvent::ReadFailed(reason) => {
                warn!("serial reader stopped: {reason}");
                self.reader_error = Some(reason.clone());
            }
        }
    }
}

impl Drop for SerialSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SerialSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialSession")
            .field("state", &self.state())
            .field("binding", &self.binding)
            .field("handshake", &self.handshake)
            .finish()
    }
}

/// Something that may hold the serial port exclusively.
pub trait PortHolder {
    /// Let go of the port so another process can use it.
    fn release_port(&mut self);

    /// Take the port back after the other process is done.
    fn reacquire_port(&mut self) -> Result<(), PortError>;
}

impl PortHolder for SerialSession {
    fn release_port(&mut self) {
        self.close();
    }

    fn reacquire_port(&mut self) -> Result<(), PortError> {
        self.open()
    }
}

/// Turns byte bursts into text, carrying a split multi-byte sequence over
/// to the next burst.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        let mut input: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    input = &[];
                    break;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            input = rest;
                            break;
                        }
                    }
                }
            }
        }

        let carry = input.to_vec();
        self.pending = carry;
        out
    }
}
