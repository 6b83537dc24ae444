//! Mock document watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::document::MockDocument;
use crate::config::loader::load_document;

/// A watcher that monitors a mock document for changes.
pub struct DocumentWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<MockDocument>,
}

impl DocumentWatcher {
    /// Create a new DocumentWatcher.
    ///
    /// Returns the watcher and a receiver for parsed documents.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<MockDocument>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned handle must be kept alive for as long as updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "Mock document change detected, reloading");
                        match load_document(&path) {
                            Ok(doc) => {
                                let _ = tx.send(doc);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload mock document. Keeping current routes.");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Mock document watcher started");
        Ok(watcher)
    }
}
