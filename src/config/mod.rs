//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! server config file (TOML)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!
//! mock document (JSON/YAML, from disk or admin import)
//!     → loader.rs (format detection & deserialize)
//!     → MockDocument
//!     → routing::compiler (compile into a RouteTable)
//!
//! On document change:
//!     watcher.rs detects change
//!     → loader.rs loads new document
//!     → compile, then atomic swap of the route table
//! ```
//!
//! # Design Decisions
//! - Server config is immutable once loaded; changes require a restart
//! - Mock documents are replaced wholesale, never patched
//! - All fields have defaults to allow minimal configs

pub mod document;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use document::MockDocument;
pub use schema::ServerConfig;
