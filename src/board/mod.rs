//! Board configuration blocks and the catalog that indexes them.

pub mod catalog;
pub mod config;

#[cfg(feature = "hot-reload")]
pub mod watcher;

pub use catalog::{BoardCatalog, SharedCatalog};
pub use config::{BoardConfig, ParseReport};

#[cfg(feature = "hot-reload")]
pub use watcher::CatalogWatcher;
