//! Document → route table compilation.
//!
//! # Responsibilities
//! - Apply document defaults (project name, rate limit, weights, priorities)
//! - Compile path templates, match rules and request schemas
//! - Serialize scenario bodies once so requests only render them
//!
//! # Design Decisions
//! - Pure function: MockDocument → Result<RouteTable, CompileError>
//! - Stops at the first broken route; every error names method + path
//! - Never touches the published table (compile-then-swap)

use axum::http::{HeaderName, Method, StatusCode};
use thiserror::Error;

use crate::config::document::{MockDocument, RouteSpec, ScenarioSpec};
use crate::routing::path::{PathError, PathMatcher};
use crate::routing::table::{CompiledRoute, CompiledScenario, RequestSchema, RouteTable};
use crate::scenario::rules::MatchRules;

/// Project name used when the document leaves it blank.
pub const DEFAULT_PROJECT: &str = "demo";
/// Priority assigned to scenarios that omit one (or give zero).
pub const DEFAULT_PRIORITY: i64 = 100;
/// Name given to an unnamed default scenario.
pub const DEFAULT_SCENARIO_NAME: &str = "default";

/// Largest selection weight; bigger weights are clamped to it.
pub const MAX_WEIGHT: u64 = u32::MAX as u64;

/// Errors that reject a whole document.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("route {method} {path}: invalid method")]
    InvalidMethod { method: String, path: String },

    #[error("route {method} {path}: {source}")]
    InvalidPath {
        method: String,
        path: String,
        source: PathError,
    },

    #[error("compile jsonschema for {method} {path}: {reason}")]
    InvalidSchema {
        method: String,
        path: String,
        reason: String,
    },

    #[error("route {method} {path}, scenario '{scenario}': {reason}")]
    InvalidScenario {
        method: String,
        path: String,
        scenario: String,
        reason: String,
    },
}

/// Compile a document into a fresh, unpublished route table.
pub fn compile(doc: &MockDocument) -> Result<RouteTable, CompileError> {
    let project = if doc.project.trim().is_empty() {
        DEFAULT_PROJECT.to_string()
    } else {
        doc.project.clone()
    };

    let api_keys = Some(doc.api_key.trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .into_iter()
        .collect();

    let routes = doc
        .routes
        .iter()
        .map(compile_route)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RouteTable {
        project,
        env: doc.env.clone(),
        api_keys,
        requests_per_minute: doc.rate_limit.as_ref().map_or(0, |r| r.requests_per_minute),
        routes,
    })
}

fn compile_route(spec: &RouteSpec) -> Result<CompiledRoute, CompileError> {
    let method_name = spec.method.trim().to_ascii_uppercase();
    let path = spec.path_template.clone();

    let method = Method::from_bytes(method_name.as_bytes())
        .ok()
        .filter(|_| !method_name.is_empty())
        .ok_or_else(|| CompileError::InvalidMethod {
            method: spec.method.clone(),
            path: path.clone(),
        })?;

    let matcher = PathMatcher::compile(&path).map_err(|source| CompileError::InvalidPath {
        method: method_name.clone(),
        path: path.clone(),
        source,
    })?;

    let request_schema = match spec
        .schemas
        .as_ref()
        .and_then(|s| s.request_jsonschema.as_deref())
        .filter(|s| !s.trim().is_empty())
    {
        Some(source) => Some(RequestSchema::compile(source).map_err(|reason| {
            CompileError::InvalidSchema {
                method: method_name.clone(),
                path: path.clone(),
                reason,
            }
        })?),
        None => None,
    };

    let scenario_error = |scenario: &ScenarioSpec, reason: String| CompileError::InvalidScenario {
        method: method_name.clone(),
        path: path.clone(),
        scenario: scenario.name.clone(),
        reason,
    };

    let scenarios = spec
        .scenarios
        .iter()
        .map(|s| compile_scenario(s).map_err(|reason| scenario_error(s, reason)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut priority_order: Vec<usize> = (0..scenarios.len()).collect();
    priority_order.sort_by_key(|&i| scenarios[i].priority);

    let default = spec
        .default
        .as_ref()
        .map(|s| compile_default(s).map_err(|reason| scenario_error(s, reason)))
        .transpose()?;

    tracing::debug!(
        method = %method,
        path = %path,
        scenarios = scenarios.len(),
        has_default = default.is_some(),
        "Route compiled"
    );

    Ok(CompiledRoute {
        method,
        path_template: path,
        matcher,
        strict: spec.strict,
        request_schema,
        scenarios,
        priority_order,
        default,
    })
}

fn compile_scenario(spec: &ScenarioSpec) -> Result<CompiledScenario, String> {
    if spec.error_rate_pct > 100 {
        return Err(format!("error_rate_pct {} exceeds 100", spec.error_rate_pct));
    }

    let rules = spec
        .rules
        .as_ref()
        .map(MatchRules::compile)
        .transpose()
        .map_err(|e| e.to_string())?;

    Ok(CompiledScenario {
        name: spec.name.clone(),
        priority: if spec.priority == 0 { DEFAULT_PRIORITY } else { spec.priority },
        rules,
        status: status_or_ok(spec.status)?,
        headers: header_templates(spec)?,
        body: serialize_body(spec)?,
        latency_ms: spec.latency_ms,
        error_rate_pct: spec.error_rate_pct as u8,
        weight: u64::try_from(spec.weight)
            .ok()
            .filter(|w| *w > 0)
            .map_or(1, |w| w.min(MAX_WEIGHT)),
    })
}

/// The default only carries a response; matching, weight and faults do not apply.
fn compile_default(spec: &ScenarioSpec) -> Result<CompiledScenario, String> {
    let name = if spec.name.trim().is_empty() {
        DEFAULT_SCENARIO_NAME.to_string()
    } else {
        spec.name.clone()
    };

    Ok(CompiledScenario {
        name,
        priority: i64::MAX,
        rules: None,
        status: status_or_ok(spec.status)?,
        headers: header_templates(spec)?,
        body: serialize_body(spec)?,
        latency_ms: spec.latency_ms,
        error_rate_pct: 0,
        weight: 1,
    })
}

fn status_or_ok(status: u16) -> Result<StatusCode, String> {
    if status == 0 {
        return Ok(StatusCode::OK);
    }
    StatusCode::from_u16(status).map_err(|_| format!("invalid status {status}"))
}

fn header_templates(spec: &ScenarioSpec) -> Result<Vec<(HeaderName, String)>, String> {
    spec.headers
        .iter()
        .map(|(name, value)| {
            HeaderName::from_bytes(name.as_bytes())
                .map(|header| (header, value.clone()))
                .map_err(|_| format!("invalid header name '{name}'"))
        })
        .collect()
}

fn serialize_body(spec: &ScenarioSpec) -> Result<String, String> {
    serde_json::to_string(&spec.body).map_err(|e| format!("serialize body: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> MockDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_document_defaults() {
        let table = compile(&doc(json!({ "api_key": " k1 " }))).unwrap();
        assert_eq!(table.project, DEFAULT_PROJECT);
        assert_eq!(table.requests_per_minute, 0);
        assert!(table.accepts_key("k1"));
        assert!(table.routes.is_empty());

        let keyless = compile(&doc(json!({ "project": "p", "api_key": "" }))).unwrap();
        assert!(keyless.api_keys.is_empty());
        assert!(!keyless.accepts_key(""));
    }

    #[test]
    fn test_route_round_trip() {
        let table = compile(&doc(json!({
            "routes": [{ "method": "get", "path_template": "/widgets/:id" }]
        })))
        .unwrap();

        let found = table.find(&Method::GET, "/widgets/7").unwrap();
        assert_eq!(found.route.param_names(), ["id"]);
        assert_eq!(found.params, vec![("id".to_string(), "7".to_string())]);
        assert!(table.find(&Method::POST, "/widgets/7").is_none());
    }

    #[test]
    fn test_first_matching_route_wins() {
        let table = compile(&doc(json!({
            "routes": [
                { "method": "GET", "path_template": "/items/special", "default": { "name": "special" } },
                { "method": "GET", "path_template": "/items/:id", "default": { "name": "generic" } }
            ]
        })))
        .unwrap();

        let special = table.find(&Method::GET, "/items/special").unwrap();
        assert_eq!(special.route.default.as_ref().unwrap().name, "special");
        let generic = table.find(&Method::GET, "/items/9").unwrap();
        assert_eq!(generic.route.default.as_ref().unwrap().name, "generic");
    }

    #[test]
    fn test_scenario_defaults() {
        let table = compile(&doc(json!({
            "routes": [{
                "method": "GET",
                "path_template": "/s",
                "scenarios": [
                    { "name": "plain" },
                    { "name": "tuned", "priority": 3, "weight": -4, "status": 201,
                      "headers": { "X-Kind": "tuned" }, "body": { "ok": true },
                      "latency_ms": 15, "error_rate_pct": 10 }
                ],
                "default": { "body": [1, 2] }
            }]
        })))
        .unwrap();

        let route = &table.routes[0];
        let plain = &route.scenarios[0];
        assert_eq!(plain.priority, DEFAULT_PRIORITY);
        assert_eq!(plain.weight, 1);
        assert_eq!(plain.status, StatusCode::OK);
        assert_eq!(plain.body, "null");
        assert!(plain.rules.is_none());

        let tuned = &route.scenarios[1];
        assert_eq!(tuned.priority, 3);
        assert_eq!(tuned.weight, 1);
        assert_eq!(tuned.status, StatusCode::CREATED);
        assert_eq!(tuned.headers[0].0, "x-kind");
        assert_eq!(tuned.body, r#"{"ok":true}"#);
        assert_eq!(tuned.error_rate_pct, 10);

        assert_eq!(route.priority_order, vec![1, 0]);

        let huge = compile(&doc(json!({
            "routes": [{
                "method": "GET",
                "path_template": "/h",
                "scenarios": [{ "name": "huge", "weight": i64::MAX }]
            }]
        })))
        .unwrap();
        assert_eq!(huge.routes[0].scenarios[0].weight, MAX_WEIGHT);

        let default = route.default.as_ref().unwrap();
        assert_eq!(default.name, DEFAULT_SCENARIO_NAME);
        assert_eq!(default.status, StatusCode::OK);
        assert_eq!(default.body, "[1,2]");
    }

    #[test]
    fn test_priority_order_is_stable() {
        let table = compile(&doc(json!({
            "routes": [{
                "method": "GET",
                "path_template": "/s",
                "scenarios": [
                    { "name": "a", "priority": 5 },
                    { "name": "b", "priority": 1 },
                    { "name": "c", "priority": 5 },
                    { "name": "d" }
                ]
            }]
        })))
        .unwrap();
        assert_eq!(table.routes[0].priority_order, vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_invalid_schema_names_route() {
        let err = compile(&doc(json!({
            "routes": [{
                "method": "post",
                "path_template": "/orders",
                "strict": true,
                "schemas": { "request_jsonschema": "{\"type\": " }
            }]
        })))
        .unwrap_err();

        assert!(matches!(err, CompileError::InvalidSchema { .. }));
        let message = err.to_string();
        assert!(message.contains("POST /orders"), "{message}");
    }

    #[test]
    fn test_blank_schema_is_ignored() {
        let table = compile(&doc(json!({
            "routes": [{
                "method": "POST",
                "path_template": "/orders",
                "schemas": { "request_jsonschema": "   " }
            }]
        })))
        .unwrap();
        assert!(table.routes[0].request_schema.is_none());
    }

    #[test]
    fn test_rejects_bad_scenarios() {
        let cases = [
            json!({ "name": "s", "status": 42 }),
            json!({ "name": "s", "error_rate_pct": 101 }),
            json!({ "name": "s", "headers": { "bad header": "x" } }),
            json!({ "name": "s", "match": { "headers": { "bad header": { "$eq": "1" } } } }),
        ];

        for scenario in cases {
            let err = compile(&doc(json!({
                "routes": [{ "method": "GET", "path_template": "/x", "scenarios": [scenario] }]
            })))
            .unwrap_err();
            assert!(matches!(err, CompileError::InvalidScenario { .. }), "{err}");
            assert!(err.to_string().contains("GET /x"));
        }
    }

    #[test]
    fn test_rejects_bad_routes() {
        let empty_method = compile(&doc(json!({ "routes": [{ "path_template": "/x" }] })));
        assert!(matches!(empty_method, Err(CompileError::InvalidMethod { .. })));

        let bad_path = compile(&doc(json!({
            "routes": [{ "method": "GET", "path_template": "/x/:" }]
        })));
        assert!(matches!(bad_path, Err(CompileError::InvalidPath { .. })));
    }
}
