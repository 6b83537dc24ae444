//! Scenario match rules.
//!
//! # Responsibilities
//! - Compile `match.{query,headers,body}` conditions from a document
//! - Resolve field values from the request (query, headers, JSON body)
//! - Evaluate `$eq` / `$in` conditions with AND semantics
//!
//! # Design Decisions
//! - Comparison is loose: every value is reduced to a string first, so
//!   `1` and `"1"` are equal. Documents written against that behaviour
//!   keep working; do not tighten it to typed comparison.
//! - Evaluation never fails. A field that cannot be resolved has no
//!   values, which fails `$eq` and finds nothing for `$in`.
//! - Query names are case-sensitive, header names are not.

use std::borrow::Cow;
use std::collections::HashSet;

use axum::http::{HeaderMap, HeaderName};
use serde_json::Value;
use thiserror::Error;

use crate::config::document::{ConditionSpec, MatchSpec};

/// Errors produced while compiling match rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("invalid header name '{0}' in match rules")]
    InvalidHeaderName(String),
}

/// Decoded query string, keeping repeated names in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues(Vec<(String, String)>);

impl QueryValues {
    /// Decode a raw (`a=1&b=2`) query string.
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();
        Self(pairs)
    }

    /// All values for `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First value for `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Request data consulted by match rules. Built once per request.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub query: &'a QueryValues,
    pub headers: &'a HeaderMap,
    /// Parsed JSON body; `None` when absent or not JSON.
    pub body: Option<&'a Value>,
}

/// One step of a dotted body path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    /// `name[index]`: look up `name`, then index into the array.
    Index(String, usize),
}

/// Pre-parsed dotted path such as `order.items[0].sku`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPath {
    raw: String,
    segments: Vec<Segment>,
}

impl BodyPath {
    pub fn parse(raw: &str) -> Self {
        let segments = raw.split('.').map(parse_segment).collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Walk `value`, returning `None` as soon as a step cannot be taken.
    pub fn lookup<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match (segment, current) {
                (Segment::Key(key), Value::Object(map)) => map.get(key),
                (Segment::Index(key, index), Value::Object(map)) => match map.get(key)? {
                    Value::Array(items) => items.get(*index),
                    _ => None,
                },
                _ => None,
            })
    }
}

fn parse_segment(segment: &str) -> Segment {
    if let Some(open) = segment.strip_suffix(']').and_then(|s| s.rfind('[')) {
        let (key, digits) = (&segment[..open], &segment[open + 1..segment.len() - 1]);
        if !key.is_empty() && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            // Overflowing indices can never be in bounds.
            let index = digits.parse().unwrap_or(usize::MAX);
            return Segment::Index(key.to_string(), index);
        }
    }
    Segment::Key(segment.to_string())
}

/// Where a condition reads its values from.
#[derive(Debug, Clone)]
pub enum Field {
    Query(String),
    Header(HeaderName),
    Body(BodyPath),
}

impl Field {
    fn values<'a>(&self, ctx: &MatchContext<'a>) -> Vec<Cow<'a, str>> {
        match self {
            Field::Query(name) => ctx
                .query
                .get_all(name)
                .map(|v| Cow::Owned(v.to_string()))
                .collect(),
            Field::Header(name) => ctx
                .headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(Cow::Borrowed)
                .collect(),
            Field::Body(path) => ctx
                .body
                .and_then(|body| path.lookup(body))
                .map(|v| vec![scalar_string(v)])
                .unwrap_or_default(),
        }
    }
}

/// A compiled `$eq` / `$in` pair. Both must hold when both are present.
#[derive(Debug, Clone, Default)]
pub struct Condition {
    equals: Option<String>,
    one_of: Option<HashSet<String>>,
}

impl Condition {
    pub fn compile(spec: &ConditionSpec) -> Self {
        let one_of = if spec.one_of.is_empty() {
            None
        } else {
            Some(spec.one_of.iter().map(|v| scalar_string(v).into_owned()).collect())
        };
        Self {
            equals: spec.eq.as_ref().map(|v| scalar_string(v).into_owned()),
            one_of,
        }
    }

    /// `$eq` tests the first value; `$in` accepts any value in the set.
    pub fn holds<S: AsRef<str>>(&self, values: &[S]) -> bool {
        if let Some(expected) = &self.equals {
            match values.first() {
                Some(first) if first.as_ref() == expected => {}
                _ => return false,
            }
        }
        if let Some(allowed) = &self.one_of {
            if !values.iter().any(|v| allowed.contains(v.as_ref())) {
                return false;
            }
        }
        true
    }
}

/// All conditions of one scenario.
#[derive(Debug, Clone, Default)]
pub struct MatchRules {
    conditions: Vec<(Field, Condition)>,
}

impl MatchRules {
    pub fn compile(spec: &MatchSpec) -> Result<Self, RuleError> {
        let mut conditions = Vec::new();

        for (name, cond) in &spec.query {
            conditions.push((Field::Query(name.clone()), Condition::compile(cond)));
        }
        for (name, cond) in &spec.headers {
            let header = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
                .map_err(|_| RuleError::InvalidHeaderName(name.clone()))?;
            conditions.push((Field::Header(header), Condition::compile(cond)));
        }
        for (path, cond) in &spec.body {
            conditions.push((Field::Body(BodyPath::parse(path)), Condition::compile(cond)));
        }

        Ok(Self { conditions })
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        self.conditions
            .iter()
            .all(|(field, cond)| cond.holds(&field.values(ctx)))
    }
}

/// Evaluate an optional rule set. No rules always matches.
pub fn matches(rules: Option<&MatchRules>, ctx: &MatchContext<'_>) -> bool {
    rules.map_or(true, |r| r.matches(ctx))
}

/// Canonical string form used for all comparisons.
pub fn scalar_string(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Number(n) => Cow::Owned(number_string(n)),
        Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        Value::Null => Cow::Borrowed("null"),
        other => Cow::Owned(other.to_string()),
    }
}

/// Integral floats render like integers, so `2.0` compares equal to `2`.
fn number_string(n: &serde_json::Number) -> String {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    match n.as_f64() {
        Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}
