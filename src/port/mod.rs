//! Port abstraction layer for serial communication.
//!
//! Provides the adapter traits, the `serialport`-backed implementation and
//! an in-memory mock so the session can be exercised without hardware.

pub mod discovery;
pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use discovery::{available_ports, PortInfo};
pub use error::PortError;
pub use mock::{MockPortOpener, MockSerialPort};
pub use sync_port::{SyncSerialPort, SystemPortOpener};
pub use traits::*;
