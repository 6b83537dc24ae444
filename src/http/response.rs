//! Error responses.
//!
//! Every failure a client can see is an [`ApiError`]; its `IntoResponse`
//! impl fixes the status code and JSON body shape in one place.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or invalid admin key")]
    Unauthorized,

    #[error("invalid api key")]
    InvalidApiKey,

    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("route not found")]
    RouteNotFound { path: String },

    #[error("validation failed")]
    ValidationFailed(Vec<String>),

    #[error("injected error")]
    InjectedFault,

    #[error("read body: {0}")]
    ReadBody(String),

    #[error("parse document: {0}")]
    ParseDocument(String),

    #[error("compile: {0}")]
    Compile(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidApiKey => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ValidationFailed(_)
            | Self::ReadBody(_)
            | Self::ParseDocument(_)
            | Self::Compile(_) => StatusCode::BAD_REQUEST,
            Self::InjectedFault => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Unauthorized => json!({ "error": "unauthorized" }),
            Self::InvalidApiKey => json!({ "error": "invalid api key" }),
            Self::RateLimited { retry_after_secs } => json!({
                "error": "rate limit exceeded",
                "retry_after_secs": retry_after_secs,
            }),
            Self::RouteNotFound { path } => json!({ "error": "route not found", "path": path }),
            Self::ValidationFailed(details) => json!({
                "error": "validation failed",
                "details": details,
            }),
            Self::InjectedFault => json!({ "error": "injected error" }),
            Self::ReadBody(detail) => json!({ "error": "read body", "detail": detail }),
            Self::ParseDocument(detail) => json!({ "error": "parse document", "detail": detail }),
            Self::Compile(detail) => json!({ "error": "compile", "detail": detail }),
        };

        let mut response = (status, Json(body)).into_response();
        if let Self::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
