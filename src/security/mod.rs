//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming mock request:
//!     → API key check against the active snapshot (http::runtime)
//!     → rate_limit.rs (per-key token bucket)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Fail closed: an unknown key never reaches the limiter or routing
//! - Limits come from the snapshot, so an import can change them live

pub mod rate_limit;

pub use rate_limit::{Decision, RateLimiter};
