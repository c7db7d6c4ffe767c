//! Destinations for decoded terminal text.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// Receives decoded inbound text in arrival order.
pub trait TerminalSink: Send {
    fn append(&mut self, text: &str);
}

/// Writes terminal text to any `Write`, flushing after each burst.
pub struct WriterSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> TerminalSink for WriterSink<W> {
    fn append(&mut self, text: &str) {
        if let Err(e) = self
            .writer
            .write_all(text.as_bytes())
            .and_then(|()| self.writer.flush())
        {
            tracing::warn!("terminal sink write failed: {e}");
        }
    }
}

/// Accumulates terminal text in a shared buffer another owner can read.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    text: Arc<Mutex<String>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything appended so far.
    pub fn contents(&self) -> String {
        self.text.lock().clone()
    }

    pub fn clear(&self) {
        self.text.lock().clear();
    }
}

impl TerminalSink for BufferSink {
    fn append(&mut self, text: &str) {
        self.text.lock().push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_sink_appends() {
        let mut sink = WriterSink::new(Vec::new());
        sink.append("Hello, ");
        sink.append("Propeller");
        assert_eq!(sink.into_inner(), b"Hello, Propeller");
    }

    #[test]
    fn test_buffer_sink_shared_between_clones() {
        let reader = BufferSink::new();
        let mut writer = reader.clone();
        writer.append("abc");
        assert_eq!(reader.contents(), "abc");
        reader.clear();
        assert_eq!(writer.contents(), "");
    }
}
