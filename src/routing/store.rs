//! Active route table holder.
//!
//! # Responsibilities
//! - Hand out the current table to request handlers
//! - Replace it atomically when a new document is imported
//!
//! # Design Decisions
//! - Single `ArcSwap` pointer: readers never lock, writers never block readers
//! - Requests keep the `Arc` they loaded until they finish, so a publish
//!   mid-request is invisible to them
//! - Compilation happens before the swap; a failed compile publishes nothing

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::document::MockDocument;
use crate::routing::compiler::{compile, CompileError};
use crate::routing::table::RouteTable;

/// Holds the route table currently serving traffic.
#[derive(Debug)]
pub struct SnapshotStore {
    active: ArcSwap<RouteTable>,
}

impl SnapshotStore {
    pub fn new(initial: RouteTable) -> Self {
        Self {
            active: ArcSwap::from_pointee(initial),
        }
    }

    /// The table to use for the whole of one request.
    pub fn current(&self) -> Arc<RouteTable> {
        self.active.load_full()
    }

    /// Make `table` the active table. Returns the shared handle now published.
    pub fn publish(&self, table: RouteTable) -> Arc<RouteTable> {
        let table = Arc::new(table);
        self.active.store(Arc::clone(&table));
        tracing::info!(
            project = %table.project,
            routes = table.routes.len(),
            scenarios = table.scenario_count(),
            "Route table published"
        );
        table
    }

    /// Compile a document and publish it if, and only if, compilation succeeds.
    pub fn import(&self, doc: &MockDocument) -> Result<Arc<RouteTable>, CompileError> {
        match compile(doc) {
            Ok(table) => Ok(self.publish(table)),
            Err(e) => {
                tracing::warn!(error = %e, "Document rejected, keeping current route table");
                Err(e)
            }
        }
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(RouteTable::empty())
    }
}
