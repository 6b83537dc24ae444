//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (import / startup / file reload):
//!     MockDocument
//!     → compiler.rs (defaults, path.rs templates, schemas, rules)
//!     → RouteTable (immutable)
//!     → store.rs (atomic publish)
//!
//! Incoming Request (method, path):
//!     → store.rs (load current table once)
//!     → table.rs (route lookup in document order)
//!     → path.rs (extract parameters)
//!     → Return: matched route + params, or NoMatch
//! ```
//!
//! # Design Decisions
//! - Tables compiled off the hot path, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (document order)

pub mod compiler;
pub mod path;
pub mod store;
pub mod table;

pub use compiler::{compile, CompileError};
pub use store::SnapshotStore;
pub use table::{CompiledRoute, CompiledScenario, RouteTable};
