//! Response templating.
//!
//! Flat token substitution for scenario header values and bodies.
//!
//! # Supported Tokens
//!
//! - `{{now.iso}}` - Current UTC time, RFC 3339 (`2024-01-31T09:30:00Z`)
//! - `{{params.<name>}}` - Path parameter from the route template
//! - `{{query.<name>}}` - First value of a query parameter
//! - `{{header.<name>}}` - First value of a request header (case-insensitive)
//! - `{{env.<name>}}` - Value from the document's `env` map
//! - `{{body}}` - The parsed request body, re-serialized as compact JSON
//!
//! Anything else between braces, and any token whose value is unavailable,
//! is left untouched.
//!
//! # Example
//!
//! ```yaml
//! body:
//!   id: "{{params.id}}"
//!   market: "{{env.market}}"
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use axum::http::HeaderMap;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::{Captures, Regex};
use serde_json::Value;

use crate::scenario::rules::QueryValues;

static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

fn token_regex() -> &'static Regex {
    TOKEN_REGEX.get_or_init(|| {
        Regex::new(r"\{\{([A-Za-z0-9_.\-]+)\}\}").expect("token regex is valid")
    })
}

/// Request data available to templates.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub params: &'a [(String, String)],
    pub query: &'a QueryValues,
    pub headers: &'a HeaderMap,
    pub env: &'a BTreeMap<String, String>,
    pub body: Option<&'a Value>,
    /// Captured once per request so every render agrees.
    pub now: DateTime<Utc>,
}

/// Substitute every known token in `text`.
pub fn render<'t>(text: &'t str, ctx: &TemplateContext<'_>) -> Cow<'t, str> {
    if !text.contains("{{") {
        return Cow::Borrowed(text);
    }
    token_regex().replace_all(text, |caps: &Captures<'_>| {
        resolve(&caps[1], ctx).unwrap_or_else(|| caps[0].to_string())
    })
}

fn resolve(token: &str, ctx: &TemplateContext<'_>) -> Option<String> {
    if token == "now.iso" {
        return Some(ctx.now.to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    if token == "body" {
        return ctx.body.map(Value::to_string);
    }

    let (class, name) = token.split_once('.')?;
    match class {
        "params" => ctx
            .params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone()),
        "query" => ctx.query.first(name).map(str::to_string),
        "header" => ctx
            .headers
            .get(name.to_ascii_lowercase().as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        "env" => ctx.env.get(name).cloned(),
        _ => None,
    }
}
