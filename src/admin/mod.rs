//! Administrative API.
//!
//! # Endpoints
//! - `POST /admin/import`: compile and publish a document (JSON or YAML)
//! - `GET /admin/routes`: compiled routes and their scenario names
//! - `GET /admin/status`: version and active project
//! - `GET /admin/openapi`: OpenAPI outline of the active table
//!
//! Every endpoint requires the admin key.

pub mod auth;
pub mod handlers;
pub mod openapi;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/import", post(import_document))
        .route("/admin/routes", get(list_routes))
        .route("/admin/status", get(get_status))
        .route("/admin/openapi", get(get_openapi))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
