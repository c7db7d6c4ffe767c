//! Board catalog loaded from a single board file.
//!
//! The file holds zero or more `[name]` sections. Each section body is parsed
//! into a [`BoardConfig`]. A missing or unreadable file yields an empty
//! catalog: "no boards" is a valid state the caller displays, not an error.

use super::config::BoardConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Named board configurations in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardCatalog {
    order: Vec<String>,
    boards: HashMap<String, BoardConfig>,
}

impl BoardCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from board-file text.
    ///
    /// Text before the first header is ignored. When two sections share a
    /// name the later body wins; the name keeps its first position.
    pub fn load(source: &str) -> Self {
        let mut catalog = Self::new();

        for (name, body) in split_sections(source) {
            let mut config = BoardConfig::named(name);
            let report = config.parse(body);
            debug!(board = name, fields = report.count(), "parsed board section");
            catalog.insert(config);
        }

        catalog
    }

    /// Build a catalog from a board file on disk.
    pub fn load_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let catalog = Self::load(&text);
                info!(path = %path.display(), boards = catalog.len(), "loaded board catalog");
                catalog
            }
            Err(e) => {
                warn!(path = %path.display(), "board file unavailable, catalog is empty: {e}");
                Self::new()
            }
        }
    }

    /// Board names in file order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Look up a board.
    pub fn get(&self, name: &str) -> Option<&BoardConfig> {
        self.boards.get(name)
    }

    /// Whether a board with this exact name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.boards.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Add or replace a board, keeping an existing name's position.
    pub fn insert(&mut self, config: BoardConfig) {
        let name = config.board_name().to_string();
        if !self.boards.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.boards.insert(name, config);
    }

    /// Remove a board.
    pub fn remove(&mut self, name: &str) -> Option<BoardConfig> {
        let removed = self.boards.remove(name)?;
        self.order.retain(|n| n != name);
        Some(removed)
    }

    /// Set one field of a board through its validator.
    ///
    /// Returns `false` when the board does not exist or the value was
    /// rejected.
    pub fn set_field(&mut self, board: &str, field: &str, value: &str) -> bool {
        match self.boards.get_mut(board) {
            Some(config) => config.set(field, value),
            None => false,
        }
    }

    /// Iterate boards in file order.
    pub fn iter(&self) -> impl Iterator<Item = &BoardConfig> {
        self.order.iter().filter_map(|name| self.boards.get(name))
    }

    /// Render every board back to board-file syntax.
    pub fn to_config_text(&self) -> String {
        self.iter().map(BoardConfig::formatted).collect()
    }

    /// Write the catalog to a board file.
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, self.to_config_text())
    }
}

/// Split board-file text into `(name, body)` pairs.
fn split_sections(source: &str) -> Vec<(&str, String)> {
    let mut sections: Vec<(&str, String)> = Vec::new();

    for line in source.split('\n') {
        if let Some(name) = section_header(line) {
            sections.push((name, String::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push_str(line);
            body.push('\n');
        }
    }

    sections
}

fn section_header(line: &str) -> Option<&str> {
    let line = line.trim();
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    Some(rest[..end].trim())
}

/// A catalog shared between a reloader and many readers.
///
/// Readers take an [`Arc`] snapshot; a reload builds the new catalog fully
/// before swapping it in, so a reader never sees a mix of old and new boards.
#[derive(Debug, Clone, Default)]
pub struct SharedCatalog {
    inner: Arc<RwLock<Arc<BoardCatalog>>>,
}

impl SharedCatalog {
    pub fn new(catalog: BoardCatalog) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    /// Current catalog.
    pub fn snapshot(&self) -> Arc<BoardCatalog> {
        self.inner.read().clone()
    }

    /// Replace the catalog.
    pub fn replace(&self, catalog: BoardCatalog) {
        *self.inner.write() = Arc::new(catalog);
    }

    /// Reload from a board file and return the number of boards.
    pub fn reload_from(&self, path: impl AsRef<Path>) -> usize {
        let catalog = BoardCatalog::load_file(path);
        let count = catalog.len();
        self.replace(catalog);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::config::{BAUDRATE, CLKFREQ, RXPIN};
    use pretty_assertions::assert_eq;

    const BOARDS: &str = "\
# xbasic.cfg
[C3]
    clkfreq: 80000000
    rxpin: 31

[HUB96]
    clkfreq: 96000000
    baudrate: 115200
";

    #[test]
    fn test_load_empty_source() {
        let catalog = BoardCatalog::load("");
        assert!(catalog.is_empty());
        assert!(catalog.names().is_empty());
    }

    #[test]
    fn test_load_preserves_file_order() {
        let catalog = BoardCatalog::load(BOARDS);
        assert_eq!(catalog.names(), ["C3".to_string(), "HUB96".to_string()]);
        assert_eq!(catalog.get("C3").unwrap().get(RXPIN), "31");
        assert_eq!(catalog.get("HUB96").unwrap().get(CLKFREQ), "96000000");
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let catalog = BoardCatalog::load(BOARDS);
        assert!(catalog.get("c3").is_none());
    }

    #[test]
    fn test_duplicate_section_last_wins() {
        let text = "[C3]\nbaudrate: 9600\n[SSF]\nrxpin: 1\n[C3]\nrxpin: 30\n";
        let catalog = BoardCatalog::load(text);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.names(), ["C3".to_string(), "SSF".to_string()]);
        let c3 = catalog.get("C3").unwrap();
        assert_eq!(c3.get(RXPIN), "30");
        assert_eq!(c3.get(BAUDRATE), "");
    }

    #[test]
    fn test_text_before_first_header_ignored() {
        let catalog = BoardCatalog::load("clkfreq: 5\n[HUB]\nrxpin: 31\n");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("HUB").unwrap().get(CLKFREQ), "");
    }

    #[test]
    fn test_set_field_validates() {
        let mut catalog = BoardCatalog::load(BOARDS);
        assert!(catalog.set_field("C3", RXPIN, "12"));
        assert!(!catalog.set_field("C3", RXPIN, "29"));
        assert!(!catalog.set_field("MISSING", RXPIN, "12"));
        assert_eq!(catalog.get("C3").unwrap().get(RXPIN), "12");
    }

    #[test]
    fn test_config_text_round_trip() {
        let catalog = BoardCatalog::load(BOARDS);
        let reloaded = BoardCatalog::load(&catalog.to_config_text());
        assert_eq!(reloaded, catalog);
    }

    #[test]
    fn test_remove_board() {
        let mut catalog = BoardCatalog::load(BOARDS);
        assert!(catalog.remove("C3").is_some());
        assert_eq!(catalog.names(), ["HUB96".to_string()]);
        assert!(catalog.remove("C3").is_none());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = BoardCatalog::load_file(dir.path().join("xbasic.cfg"));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_shared_catalog_reload_swaps_whole_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xbasic.cfg");
        std::fs::write(&path, BOARDS).unwrap();

        let shared = SharedCatalog::default();
        let before = shared.snapshot();
        assert_eq!(shared.reload_from(&path), 2);

        // a snapshot taken before the reload is untouched
        assert!(before.is_empty());
        assert_eq!(shared.snapshot().len(), 2);
    }
}
