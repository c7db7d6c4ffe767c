//! Events produced by the reader worker.

/// Something the device did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A burst of inbound bytes.
    Data(Vec<u8>),
    /// The DSR handshake line changed level.
    Handshake(bool),
    /// The reader stopped because the device failed.
    ReadFailed(String),
}
