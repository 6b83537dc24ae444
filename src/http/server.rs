//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with runtime and admin handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit, CORS)
//! - Bind server to listener
//! - Apply document reloads as they arrive

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, http::StatusCode, middleware, routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::config::{MockDocument, ServerConfig};
use crate::http::request::{RequestUuid, X_REQUEST_ID};
use crate::http::runtime::{mock_handler, runtime_gate};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::routing::SnapshotStore;
use crate::scenario::{RandomSource, ThreadRandom};
use crate::security::RateLimiter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    pub limiter: Arc<RateLimiter>,
    pub random: Arc<dyn RandomSource>,
    pub admin_key: Arc<str>,
    pub max_body_bytes: usize,
}

/// HTTP server for the mock runtime and admin API.
pub struct HttpServer {
    state: AppState,
    request_timeout: Duration,
}

impl HttpServer {
    /// Create a new HTTP server serving the tables published to `store`.
    pub fn new(config: &ServerConfig, store: Arc<SnapshotStore>) -> Self {
        let state = AppState {
            store,
            limiter: Arc::new(RateLimiter::new()),
            random: Arc::new(ThreadRandom),
            admin_key: Arc::from(config.admin.api_key.as_str()),
            max_body_bytes: config.listener.max_body_bytes,
        };
        Self {
            state,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        }
    }

    /// Replace the randomness used for scenario selection and fault injection.
    pub fn with_random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.state.random = random;
        self
    }

    pub fn store(&self) -> Arc<SnapshotStore> {
        self.state.store.clone()
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        let runtime = Router::new()
            .route("/mock/{project}/{env}", any(mock_handler))
            .route("/mock/{project}/{env}/{*path}", any(mock_handler))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                runtime_gate,
            ));

        Router::new()
            .merge(runtime)
            .merge(admin::router(self.state.clone()))
            .with_state(self.state.clone())
            .layer(DefaultBodyLimit::max(self.state.max_body_bytes))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, RequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(CorsLayer::very_permissive().expose_headers([X_REQUEST_ID]))
                    .layer(TimeoutLayer::with_status_code(
                        StatusCode::REQUEST_TIMEOUT,
                        self.request_timeout,
                    )),
            )
    }

    /// Run the server until `shutdown` fires, importing every document
    /// received on `documents` along the way.
    pub async fn run(
        self,
        listener: TcpListener,
        mut documents: mpsc::UnboundedReceiver<MockDocument>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let store = self.store();
        tokio::spawn(async move {
            while let Some(document) = documents.recv().await {
                // The store logs the outcome; a rejected reload keeps serving.
                metrics::record_import(store.import(&document).is_ok());
            }
        });

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
