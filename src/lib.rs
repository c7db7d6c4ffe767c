//! xBasic IDE core.
//!
//! The parts of the IDE that are not presentation: a serial session that
//! talks to the target board, an orchestrator that runs the external
//! compiler and classifies what it did, and the board catalog that says
//! which targets exist.
//!
//! # Modules
//!
//! - `board`: board configuration blocks and the catalog file
//! - `port`: serial port abstraction, real and in-memory
//! - `session`: serial session state machine and terminal sinks
//! - `build`: compiler invocation and outcome classification
//! - `config`: TOML application configuration
//! - `logging`: tracing subscriber setup
//! - `error`: error type for the command-line front end

pub mod board;
pub mod build;
pub mod config;
pub mod error;
pub mod logging;
pub mod port;
pub mod session;

pub use board::{BoardCatalog, BoardConfig, ParseReport, SharedCatalog};
pub use build::{
    BuildAction, BuildError, BuildKind, BuildOrchestrator, BuildRequest, BuildResult,
    BuildSettings, BufferSet, PathSeparator, ProcessLauncher, SystemLauncher, Workspace,
};
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use error::{AppError, AppResult};
pub use port::{
    available_ports, BaudRate, MockPortOpener, MockSerialPort, PortConfiguration, PortError,
    PortInfo, PortOpener, SerialPortAdapter, SyncSerialPort, SystemPortOpener,
};
pub use session::{
    BufferSink, PortHolder, SerialSession, SessionEvent, SessionSettings, SessionState,
    TerminalSink, WriterSink,
};
