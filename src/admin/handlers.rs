use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::admin::openapi;
use crate::config::loader::parse_document;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub project: String,
    pub routes: usize,
    pub scenarios: usize,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub project: String,
    pub routes: usize,
    pub scenarios: usize,
}

#[derive(Debug, Serialize)]
pub struct RouteSummary {
    pub method: String,
    pub path: String,
    pub strict: bool,
    pub scenarios: Vec<String>,
    pub default: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RouteListing {
    pub project: String,
    pub routes: Vec<RouteSummary>,
}

/// Parse, compile and publish a document. Nothing is published on failure.
pub async fn import_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ImportSummary>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let document = parse_document(&body, content_type).map_err(|e| {
        metrics::record_import(false);
        ApiError::ParseDocument(e.to_string())
    })?;

    let table = state.store.import(&document).map_err(|e| {
        metrics::record_import(false);
        ApiError::Compile(e.to_string())
    })?;
    metrics::record_import(true);

    Ok(Json(ImportSummary {
        project: table.project.clone(),
        routes: table.routes.len(),
        scenarios: table.scenario_count(),
    }))
}

pub async fn list_routes(State(state): State<AppState>) -> Json<RouteListing> {
    let table = state.store.current();
    let routes = table
        .routes
        .iter()
        .map(|route| RouteSummary {
            method: route.method.to_string(),
            path: route.path_template.clone(),
            strict: route.strict,
            scenarios: route.scenarios.iter().map(|s| s.name.clone()).collect(),
            default: route.default.as_ref().map(|s| s.name.clone()),
        })
        .collect();

    Json(RouteListing {
        project: table.project.clone(),
        routes,
    })
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let table = state.store.current();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        project: table.project.clone(),
        routes: table.routes.len(),
        scenarios: table.scenario_count(),
    })
}

pub async fn get_openapi(State(state): State<AppState>) -> Json<Value> {
    Json(openapi::outline(&state.store.current()))
}
