//! Mock configuration document.
//!
//! The document is what operators submit through the admin import endpoint
//! (or point the server at on disk). It is parsed as JSON or YAML into these
//! types and then handed to the route compiler; nothing here is consulted at
//! request time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root of a mock configuration document.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MockDocument {
    /// Project identifier (defaults to `demo` at compile time).
    pub project: String,

    /// Informational base URL of the mocked API.
    pub base_url: String,

    /// API key callers must present in `x-mock-key`.
    pub api_key: String,

    /// Per-key rate limit. Absent means disabled.
    pub rate_limit: Option<RateLimitSpec>,

    /// Values exposed to response templates as `{{env.<name>}}`.
    pub env: BTreeMap<String, String>,

    /// Route definitions, matched in order.
    pub routes: Vec<RouteSpec>,
}

/// Rate limit section of a document.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RateLimitSpec {
    /// Requests allowed per minute per API key. Zero disables limiting.
    pub requests_per_minute: u32,
}

/// A single mocked route.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouteSpec {
    /// HTTP method (case-insensitive).
    pub method: String,

    /// Path template, e.g. `/users/:id/orders`.
    pub path_template: String,

    /// Enforce the request schema when set.
    pub strict: bool,

    pub schemas: Option<SchemaSpec>,

    /// Explicit scenarios, grouped by priority at request time.
    pub scenarios: Vec<ScenarioSpec>,

    /// Last-resort scenario when no explicit scenario matches.
    pub default: Option<ScenarioSpec>,
}

/// Schema attachments for a route.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SchemaSpec {
    /// JSON-Schema document, as a string.
    pub request_jsonschema: Option<String>,
}

/// A response scenario.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ScenarioSpec {
    pub name: String,

    /// Lower is evaluated first. Zero means "use the default" (100).
    pub priority: i64,

    #[serde(rename = "match")]
    pub rules: Option<MatchSpec>,

    /// Response status. Zero means 200.
    pub status: u16,

    pub headers: BTreeMap<String, String>,

    /// Arbitrary JSON payload, serialized once at compile time.
    pub body: Value,

    pub latency_ms: u64,

    /// Percentage (0-100) of requests answered with an injected 500.
    pub error_rate_pct: u32,

    /// Share within its priority group. Non-positive means 1.
    pub weight: i64,
}

/// Match conditions, keyed by field name within each namespace.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MatchSpec {
    pub query: BTreeMap<String, ConditionSpec>,
    pub headers: BTreeMap<String, ConditionSpec>,
    /// Keys are dotted paths with optional `name[index]` segments.
    pub body: BTreeMap<String, ConditionSpec>,
}

/// `{ "$eq": value }` and/or `{ "$in": [values] }`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ConditionSpec {
    #[serde(rename = "$eq", skip_serializing_if = "Option::is_none")]
    pub eq: Option<Value>,

    #[serde(rename = "$in", skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Value>,
}
