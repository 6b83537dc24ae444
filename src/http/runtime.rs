//! Mock runtime: the request path from key check to rendered response.
//!
//! # Data Flow
//! ```text
//! runtime_gate: snapshot → API key → rate limit → attach snapshot
//! mock_handler: find route → read body → strict schema gate
//!     → select scenario → latency → fault injection → render
//! ```
//!
//! # Design Decisions
//! - The snapshot loaded by the gate is the only one the request ever sees
//! - Latency is a plain `tokio::time::sleep`; a cancelled request drops it
//! - Bodies that are not JSON match as "no body" instead of failing

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use chrono::Utc;
use serde_json::Value;

use crate::http::request::{request_id, X_REQUEST_ID};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::path::normalize_path;
use crate::routing::table::{CompiledScenario, RouteTable};
use crate::scenario::{render, select, MatchContext, QueryValues, RandomSource, TemplateContext};
use crate::security::Decision;

/// Header carrying the caller's API key.
pub const X_MOCK_KEY: &str = "x-mock-key";

/// Check the API key and rate limit, then hand the snapshot to the handler.
pub async fn runtime_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let table = state.store.current();

    let key = request
        .headers()
        .get(X_MOCK_KEY)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !table.accepts_key(&key) {
        tracing::warn!(
            request_id = %request_id(&request),
            project = %table.project,
            "Rejected request with invalid API key"
        );
        return Err(ApiError::InvalidApiKey);
    }

    if let Decision::Limited { retry_after_secs } =
        state.limiter.check(&key, table.requests_per_minute)
    {
        return Err(ApiError::RateLimited { retry_after_secs });
    }

    request.extensions_mut().insert(table);
    Ok(next.run(request).await)
}

/// Resolve a mock request against the snapshot attached by [`runtime_gate`].
pub async fn mock_handler(
    State(state): State<AppState>,
    Extension(table): Extension<Arc<RouteTable>>,
    Path(segments): Path<HashMap<String, String>>,
    request: Request,
) -> Result<Response, ApiError> {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let rid = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let path = normalize_path(segments.get("path").map(String::as_str).unwrap_or(""));
    let method = parts.method.clone();

    let Some(found) = table.find(&method, &path) else {
        tracing::debug!(request_id = %rid, method = %method, path = %path, "No route matched");
        metrics::record_request(method.as_str(), 404, "none", start);
        return Err(ApiError::RouteNotFound { path });
    };
    let route = found.route;

    let bytes = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| ApiError::ReadBody(e.to_string()))?;
    let json_body: Option<Value> = if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(&bytes).ok()
    };

    if route.strict {
        if let Some(schema) = &route.request_schema {
            if let Err(details) = schema.validate(json_body.as_ref()) {
                tracing::info!(
                    request_id = %rid,
                    route = %route.path_template,
                    violations = details.len(),
                    "Request failed schema validation"
                );
                metrics::record_request(method.as_str(), 400, "none", start);
                return Err(ApiError::ValidationFailed(details));
            }
        }
    }

    let query = QueryValues::parse(parts.uri.query());
    let ctx = MatchContext {
        query: &query,
        headers: &parts.headers,
        body: json_body.as_ref(),
    };
    let scenario = select(route, &ctx, state.random.as_ref());

    if let Some(delay) = scenario.latency() {
        tokio::time::sleep(delay).await;
    }

    if should_inject_fault(scenario, state.random.as_ref()) {
        tracing::info!(request_id = %rid, scenario = %scenario.name, "Injected fault");
        metrics::record_injected_fault(&scenario.name);
        metrics::record_request(method.as_str(), 500, &scenario.name, start);
        return Err(ApiError::InjectedFault);
    }

    let template_ctx = TemplateContext {
        params: &found.params,
        query: &query,
        headers: &parts.headers,
        env: &table.env,
        body: json_body.as_ref(),
        now: Utc::now(),
    };
    let response = render_response(scenario, &template_ctx);

    tracing::info!(
        request_id = %rid,
        project = segments.get("project").map(String::as_str).unwrap_or_default(),
        env = segments.get("env").map(String::as_str).unwrap_or_default(),
        method = %method,
        path = %path,
        scenario = %scenario.name,
        status = scenario.status.as_u16(),
        "Served mock response"
    );
    metrics::record_request(method.as_str(), scenario.status.as_u16(), &scenario.name, start);
    Ok(response)
}

fn should_inject_fault(scenario: &CompiledScenario, random: &dyn RandomSource) -> bool {
    match scenario.error_rate_pct {
        0 => false,
        pct if pct >= 100 => true,
        pct => random.next_below(100) < u64::from(pct),
    }
}

fn render_response(scenario: &CompiledScenario, ctx: &TemplateContext<'_>) -> Response {
    let mut headers = HeaderMap::new();
    for (name, raw) in &scenario.headers {
        let rendered = render(raw, ctx);
        match HeaderValue::from_str(&rendered) {
            Ok(value) => {
                headers.append(name.clone(), value);
            }
            Err(_) => tracing::warn!(
                header = %name,
                scenario = %scenario.name,
                "Dropping header with invalid rendered value"
            ),
        }
    }
    if !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }

    let body = render(&scenario.body, ctx).into_owned();
    let mut response = (scenario.status, Body::from(body)).into_response();
    response.headers_mut().extend(headers);
    response
}
