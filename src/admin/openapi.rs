//! OpenAPI outline of the active route table.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::routing::path::normalize_path;
use crate::routing::table::{CompiledRoute, RouteTable};

pub const OPENAPI_VERSION: &str = "3.0.3";

/// Describe every route: one operation per route, one response per distinct
/// scenario status.
pub fn outline(table: &RouteTable) -> Value {
    let mut paths: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
    for route in &table.routes {
        paths
            .entry(openapi_path(&route.path_template))
            .or_default()
            .insert(route.method.as_str().to_ascii_lowercase(), operation(route));
    }

    json!({
        "openapi": OPENAPI_VERSION,
        "info": {
            "title": table.project,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": paths,
    })
}

/// `/users/:id` becomes `/users/{id}`.
pub fn openapi_path(template: &str) -> String {
    let segments: Vec<String> = normalize_path(template)
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect();
    segments.join("/")
}

fn operation(route: &CompiledRoute) -> Value {
    let mut by_status: BTreeMap<u16, Vec<&str>> = BTreeMap::new();
    for scenario in route.scenarios.iter().chain(route.default.as_ref()) {
        by_status
            .entry(scenario.status.as_u16())
            .or_default()
            .push(&scenario.name);
    }
    if by_status.is_empty() {
        by_status.insert(200, vec!["fallback"]);
    }

    let responses: Map<String, Value> = by_status
        .into_iter()
        .map(|(status, names)| {
            (
                status.to_string(),
                json!({ "description": names.join(", ") }),
            )
        })
        .collect();

    let parameters: Vec<Value> = route
        .param_names()
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "in": "path",
                "required": true,
                "schema": { "type": "string" },
            })
        })
        .collect();

    let mut op = json!({
        "summary": format!("{} {}", route.method, route.path_template),
        "parameters": parameters,
        "responses": responses,
    });
    if let Some(schema) = &route.request_schema {
        op["requestBody"] = json!({
            "required": route.strict,
            "content": { "application/json": { "schema": schema.source() } },
        });
    }
    op
}
