//! Open source buffers that must reach disk before a build.

use super::error::BuildError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Trailing title marker of a buffer with unsaved edits.
pub const DIRTY_MARKER: &str = " *";

/// The editor side of a build.
pub trait Workspace {
    /// Write every dirty buffer to disk and clear its marker. Returns how
    /// many were written.
    fn save_dirty(&mut self) -> Result<usize, BuildError>;
}

/// One open file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    pub path: PathBuf,
    pub title: String,
    pub text: String,
}

impl Buffer {
    pub fn is_dirty(&self) -> bool {
        self.title.ends_with(DIRTY_MARKER)
    }
}

/// Plain list of open buffers, titled by file name.
#[derive(Debug, Clone, Default)]
pub struct BufferSet {
    buffers: Vec<Buffer>,
}

impl BufferSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a file from disk as a clean buffer.
    pub fn open(&mut self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let title = file_title(path);
        match self.position(path) {
            Some(i) => self.buffers[i] = Buffer { path: path.to_path_buf(), title, text },
            None => self.buffers.push(Buffer {
                path: path.to_path_buf(),
                title,
                text,
            }),
        }
        Ok(())
    }

    /// Replace a buffer's text and mark it dirty, opening it if needed.
    pub fn edit(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        let path = path.as_ref();
        let i = match self.position(path) {
            Some(i) => i,
            None => {
                self.buffers.push(Buffer {
                    path: path.to_path_buf(),
                    title: file_title(path),
                    text: String::new(),
                });
                self.buffers.len() - 1
            }
        };
        let buffer = &mut self.buffers[i];
        buffer.text = text.into();
        if !buffer.is_dirty() {
            buffer.title.push_str(DIRTY_MARKER);
        }
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&Buffer> {
        self.position(path.as_ref()).map(|i| &self.buffers[i])
    }

    pub fn dirty_count(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_dirty()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.iter()
    }

    fn position(&self, path: &Path) -> Option<usize> {
        self.buffers.iter().position(|b| b.path == path)
    }
}

impl Workspace for BufferSet {
    fn save_dirty(&mut self) -> Result<usize, BuildError> {
        let mut saved = 0;
        for buffer in self.buffers.iter_mut().filter(|b| b.is_dirty()) {
            std::fs::write(&buffer.path, &buffer.text).map_err(|source| {
                BuildError::SaveBuffer {
                    path: buffer.path.clone(),
                    source,
                }
            })?;
            let clean_len = buffer.title.len() - DIRTY_MARKER.len();
            buffer.title.truncate(clean_len);
            debug!(path = %buffer.path.display(), "saved buffer before build");
            saved += 1;
        }
        Ok(saved)
    }
}

fn file_title(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
