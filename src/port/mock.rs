//! In-memory serial port for tests and demos.
//!
//! A `MockSerialPort` and every handle cloned from it share one state, so a
//! test can keep a handle, feed bytes or toggle the DSR line, and watch what
//! the session writes.

use super::error::PortError;
use super::traits::{PortConfiguration, PortOpener, SerialPortAdapter};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes to be returned by reads.
    read_queue: VecDeque<u8>,
    /// Every write, in order.
    write_log: Vec<Vec<u8>>,
    /// DSR line level.
    dsr: bool,
    /// Last DTR level driven.
    dtr: bool,
    /// Configured timeout.
    timeout: Duration,
    /// Live handles to this device, duplicates included.
    handles: usize,
    /// Live handles that came from opening the device by name.
    opened: usize,
    /// Fail the next read with a non-idle error.
    fail_next_read: bool,
}

/// Mock serial port implementation for testing.
///
/// # Example
/// ```
/// use xbasic_core::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_read(b"Hello");
///
/// let mut buffer = [0u8; 8];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"Hello");
///
/// port.write_bytes(b"Response").unwrap();
/// assert_eq!(port.get_write_log(), vec![b"Response".to_vec()]);
/// ```
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
    /// Handed out by an opener rather than duplicated.
    from_open: bool,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState {
                timeout: Duration::from_millis(50),
                handles: 1,
                ..Default::default()
            })),
            from_open: false,
        }
    }

    fn state(&self) -> MutexGuard<'_, MockPortState> {
        // a test that panicked while holding the lock already failed
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue bytes for subsequent reads.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state().read_queue.extend(data);
    }

    /// Copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state().write_log.clone()
    }

    /// Set the DSR line level seen by readers.
    pub fn set_data_set_ready(&self, level: bool) {
        self.state().dsr = level;
    }

    /// Last DTR level driven by the session.
    pub fn data_terminal_ready(&self) -> bool {
        self.state().dtr
    }

    /// Make the next read fail as if the device was unplugged.
    pub fn fail_next_read(&self) {
        self.state().fail_next_read = true;
    }

    /// Number of handles to this device that are still alive.
    pub fn open_handles(&self) -> usize {
        self.state().handles
    }

    /// Timeout most recently set on any handle.
    pub fn timeout(&self) -> Duration {
        self.state().timeout
    }

    /// Number of bytes still queued for reading.
    pub fn available_bytes(&self) -> usize {
        self.state().read_queue.len()
    }

    /// Live handles that were opened by name. Duplicates made with
    /// `try_clone_adapter` share their original's open and are not counted.
    pub fn open_devices(&self) -> usize {
        self.state().opened
    }

    /// A new handle to the same device.
    pub fn handle(&self) -> Self {
        self.state().handles += 1;
        Self {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            from_open: false,
        }
    }

    fn opened_handle(&self) -> Self {
        let mut handle = self.handle();
        handle.from_open = true;
        handle.state().opened += 1;
        handle
    }
}

impl Drop for MockSerialPort {
    fn drop(&mut self) {
        let from_open = self.from_open;
        let mut state = self.state();
        state.handles = state.handles.saturating_sub(1);
        if from_open {
            state.opened = state.opened.saturating_sub(1);
        }
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.state().write_log.push(data.to_vec());
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state();

        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device removed",
            )));
        }

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 {
            // non-blocking: nothing queued
            Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "No data available",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.state().timeout = timeout;
        Ok(())
    }

    fn data_set_ready(&mut self) -> Result<bool, PortError> {
        Ok(self.state().dsr)
    }

    fn set_data_terminal_ready(&mut self, level: bool) -> Result<(), PortError> {
        self.state().dtr = level;
        Ok(())
    }

    fn try_clone_adapter(&self) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        Ok(Box::new(self.handle()))
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

#[derive(Debug, Default)]
struct OpenerState {
    devices: HashMap<String, MockSerialPort>,
    opens: Vec<(String, PortConfiguration)>,
}

/// Hands out [`MockSerialPort`] handles for registered device names.
#[derive(Debug, Clone, Default)]
pub struct MockPortOpener {
    state: Arc<Mutex<OpenerState>>,
}

impl MockPortOpener {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, OpenerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a device and return a handle the test can drive.
    pub fn add_device(&self, name: &str) -> MockSerialPort {
        let device = MockSerialPort::new(name);
        let driver = device.handle();
        self.state().devices.insert(name.to_string(), device);
        driver
    }

    /// Number of successful opens so far.
    pub fn open_count(&self) -> usize {
        self.state().opens.len()
    }

    /// Name and configuration of every successful open, in order.
    pub fn opens(&self) -> Vec<(String, PortConfiguration)> {
        self.state().opens.clone()
    }
}

impl PortOpener for MockPortOpener {
    fn open(
        &self,
        port_name: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let mut state = self.state();
        let handle = state
            .devices
            .get(port_name)
            .map(MockSerialPort::opened_handle)
            .ok_or_else(|| PortError::not_found(port_name))?;
        state.opens.push((port_name.to_string(), *config));
        Ok(Box::new(handle))
    }
}
