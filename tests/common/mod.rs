//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower::ServiceExt;

use mock_api_server::config::MockDocument;
use mock_api_server::routing::compile;
use mock_api_server::scenario::SeededRandom;
use mock_api_server::{HttpServer, ServerConfig, Shutdown, SnapshotStore};

pub const API_KEY: &str = "test-key";
pub const ADMIN_KEY: &str = "admin-test";
pub const BASE: &str = "/mock/demo/dev";

/// The document most tests start from.
pub fn sample_document() -> Value {
    json!({
        "project": "demo",
        "api_key": API_KEY,
        "env": { "region": "eu-west-1" },
        "routes": [
            {
                "method": "GET",
                "path_template": "/items/:id",
                "scenarios": [
                    {
                        "name": "debug",
                        "priority": 1,
                        "match": { "headers": { "x-debug": { "$eq": "1" } } },
                        "status": 500,
                        "body": { "error": "debug" }
                    },
                    {
                        "name": "ok",
                        "body": { "id": "{{params.id}}" }
                    }
                ]
            },
            {
                "method": "POST",
                "path_template": "/users",
                "strict": true,
                "schemas": {
                    "request_jsonschema": r#"{"type":"object","required":["name"],"properties":{"name":{"type":"string"}}}"#
                },
                "scenarios": [
                    {
                        "name": "created",
                        "status": 201,
                        "headers": { "x-region": "{{env.region}}" },
                        "body": { "created": true, "at": "{{now.iso}}" }
                    }
                ]
            },
            {
                "method": "GET",
                "path_template": "/search",
                "scenarios": [
                    {
                        "name": "india",
                        "match": { "query": { "market": { "$in": ["IN", "LK"] } } },
                        "body": { "market": "{{query.market}}" }
                    }
                ],
                "default": { "status": 204 }
            }
        ]
    })
}

pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.admin.api_key = ADMIN_KEY.to_string();
    config
}

/// Server over a compiled document with reproducible randomness.
pub fn build_server(document: Value) -> HttpServer {
    build_server_with(&test_config(), document)
}

pub fn build_server_with(config: &ServerConfig, document: Value) -> HttpServer {
    let document: MockDocument = serde_json::from_value(document).unwrap();
    let store = Arc::new(SnapshotStore::new(compile(&document).unwrap()));
    HttpServer::new(config, store).with_random_source(Arc::new(SeededRandom::new(42)))
}

pub fn mock_get(path: &str) -> axum::http::request::Builder {
    Request::builder()
        .method("GET")
        .uri(format!("{BASE}{path}"))
        .header("x-mock-key", API_KEY)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }
}

/// Drive one request through the router without a socket.
pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

/// Start a server on an ephemeral port. Trigger the returned handle to stop it.
pub async fn spawn_server(server: HttpServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let (_tx, documents) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        server.run(listener, documents, rx).await.unwrap();
    });
    (addr, shutdown)
}
