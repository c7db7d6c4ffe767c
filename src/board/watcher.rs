//! Reload a [`SharedCatalog`] when its board file changes.

use super::catalog::SharedCatalog;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Keeps a board file watch alive; dropping it stops reloading.
pub struct CatalogWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl CatalogWatcher {
    /// Watch `path` and reload `catalog` on every modification.
    ///
    /// The parent directory is watched so editors that replace the file by
    /// rename are still noticed.
    pub fn spawn(path: impl AsRef<Path>, catalog: SharedCatalog) -> notify::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let target = path.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let relevant = matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) && event.paths.iter().any(|p| p.file_name() == target.file_name());
                if relevant {
                    let boards = catalog.reload_from(&target);
                    info!(path = %target.display(), boards, "board file changed, catalog reloaded");
                }
            }
            Err(e) => warn!("board file watch error: {e}"),
        })?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!(path = %path.display(), "watching board file");

        Ok(Self {
            _watcher: watcher,
            path,
        })
    }

    /// The watched board file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
