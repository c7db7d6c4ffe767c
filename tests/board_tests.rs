//! Board file loading, editing and saving.

mod common;

use common::STOCK_BOARDS;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use xbasic_core::board::config::{CACHEDRIVER, CLKFREQ, RXPIN, TEXTSEG, TVPIN};
use xbasic_core::board::{BoardCatalog, SharedCatalog};

#[test]
fn test_stock_boards_load_in_file_order() {
    let catalog = BoardCatalog::load(STOCK_BOARDS);
    assert_eq!(catalog.names(), &["HUB".to_string(), "C3".to_string()]);

    let c3 = catalog.get("C3").unwrap();
    assert_eq!(c3.get(TEXTSEG), "FLASH");
    assert_eq!(c3.get(CACHEDRIVER), "C3_CACHE.DAT");
    assert_eq!(c3.get(TVPIN), "");
    assert!(catalog.get("c3").is_none());
}

#[test]
fn test_edit_save_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("xbasic.cfg");
    std::fs::write(&path, STOCK_BOARDS).unwrap();

    let mut catalog = BoardCatalog::load_file(&path);
    assert!(catalog.set_field("HUB", CLKFREQ, "96000000"));
    assert!(!catalog.set_field("HUB", RXPIN, "28"));
    catalog.save(&path).unwrap();

    let reloaded = BoardCatalog::load_file(&path);
    assert_eq!(reloaded, catalog);
    assert_eq!(reloaded.get("HUB").unwrap().get(CLKFREQ), "96000000");
    assert_eq!(reloaded.get("HUB").unwrap().get(RXPIN), "31");
}

#[test]
fn test_missing_board_file_is_empty_catalog() {
    let dir = TempDir::new().unwrap();
    let catalog = BoardCatalog::load_file(dir.path().join("xbasic.cfg"));
    assert!(catalog.is_empty());
    assert!(catalog.names().is_empty());
}

#[test]
fn test_shared_snapshot_survives_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("xbasic.cfg");
    std::fs::write(&path, STOCK_BOARDS).unwrap();

    let shared = SharedCatalog::new(BoardCatalog::new());
    assert_eq!(shared.reload_from(&path), 2);
    let before = shared.snapshot();

    std::fs::write(&path, "[SSF]\n    clkfreq: 96000000\n").unwrap();
    assert_eq!(shared.reload_from(&path), 1);

    assert_eq!(before.len(), 2);
    assert_eq!(shared.snapshot().names(), &["SSF".to_string()]);
}
