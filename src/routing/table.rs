//! Compiled route table.
//!
//! # Responsibilities
//! - Hold everything request handling needs, precomputed
//! - Look up the route owning a method + path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Published behind an `Arc`; a reload builds a new table
//! - O(n) scan in document order, first match wins
//! - Explicit `None` rather than a silent catch-all route

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::Duration;

use axum::http::{HeaderName, Method, StatusCode};
use serde_json::Value;

use crate::routing::path::PathMatcher;
use crate::scenario::rules::MatchRules;

/// Immutable snapshot of a compiled mock document.
#[derive(Debug, Default)]
pub struct RouteTable {
    pub project: String,
    pub env: BTreeMap<String, String>,
    pub api_keys: HashSet<String>,
    /// Zero disables rate limiting.
    pub requests_per_minute: u32,
    pub routes: Vec<CompiledRoute>,
}

impl RouteTable {
    /// A table that serves nothing and accepts no keys.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn accepts_key(&self, key: &str) -> bool {
        self.api_keys.contains(key)
    }

    /// Find the first route whose method and path template match.
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                route
                    .matcher
                    .match_params(path)
                    .map(|params| RouteMatch { route, params })
            })
    }

    /// Total explicit scenarios across all routes.
    pub fn scenario_count(&self) -> usize {
        self.routes.iter().map(|r| r.scenarios.len()).sum()
    }
}

/// A route plus the parameters extracted from the request path.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a CompiledRoute,
    pub params: Vec<(String, String)>,
}

/// One route of the table.
#[derive(Debug)]
pub struct CompiledRoute {
    pub method: Method,
    /// Template as written in the document.
    pub path_template: String,
    pub matcher: PathMatcher,
    pub strict: bool,
    pub request_schema: Option<RequestSchema>,
    /// Explicit scenarios in document order.
    pub scenarios: Vec<CompiledScenario>,
    /// Indices into `scenarios`, stably sorted by ascending priority.
    pub priority_order: Vec<usize>,
    pub default: Option<CompiledScenario>,
}

impl CompiledRoute {
    pub fn param_names(&self) -> &[String] {
        self.matcher.param_names()
    }
}

/// A response scenario, ready to serve.
#[derive(Debug, Clone)]
pub struct CompiledScenario {
    pub name: String,
    pub priority: i64,
    pub rules: Option<MatchRules>,
    pub status: StatusCode,
    /// Header values are templates, rendered per request.
    pub headers: Vec<(HeaderName, String)>,
    /// Body serialized at compile time, rendered per request.
    pub body: String,
    pub latency_ms: u64,
    /// 0-100.
    pub error_rate_pct: u8,
    /// Always at least 1.
    pub weight: u64,
}

impl CompiledScenario {
    pub fn latency(&self) -> Option<Duration> {
        (self.latency_ms > 0).then(|| Duration::from_millis(self.latency_ms))
    }
}

/// A compiled request JSON-Schema.
pub struct RequestSchema {
    source: Value,
    validator: jsonschema::Validator,
}

impl RequestSchema {
    /// Compile schema source text. The error explains what is wrong with it.
    pub fn compile(source: &str) -> Result<Self, String> {
        let schema: Value =
            serde_json::from_str(source).map_err(|e| format!("schema is not valid JSON: {e}"))?;
        let validator = jsonschema::validator_for(&schema).map_err(|e| e.to_string())?;
        Ok(Self {
            source: schema,
            validator,
        })
    }

    /// The schema document as written.
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Validate a parsed body. A missing or unparseable body is a violation.
    pub fn validate(&self, body: Option<&Value>) -> Result<(), Vec<String>> {
        let Some(instance) = body else {
            return Err(vec!["request body is not valid JSON".to_string()]);
        };

        let violations: Vec<String> = self
            .validator
            .iter_errors(instance)
            .map(|e| {
                let location = e.instance_path.to_string();
                if location.is_empty() {
                    e.to_string()
                } else {
                    format!("{location}: {e}")
                }
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

impl fmt::Debug for RequestSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSchema").finish_non_exhaustive()
    }
}
