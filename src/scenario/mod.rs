//! Scenario resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Matched route + MatchContext (query, headers, parsed body)
//!     → selector.rs (priority groups, weighted pick)
//!         → rules.rs (evaluate each scenario's conditions)
//!     → CompiledScenario
//!     → template.rs (render header values and body)
//! ```
//!
//! # Design Decisions
//! - Rule evaluation never errors; unresolvable fields simply fail
//! - Selection is a pure function of route, context and random draw
//! - Templates substitute flat tokens only

pub mod rules;
pub mod selector;
pub mod template;

pub use rules::{MatchContext, QueryValues};
pub use selector::{select, RandomSource, SeededRandom, ThreadRandom};
pub use template::{render, TemplateContext};
