//! Admin import and introspection endpoints.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;

mod common;
use common::{build_server, mock_get, sample_document, send, ADMIN_KEY, API_KEY};

fn admin(method: &str, path: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(path)
        .header("x-admin-key", ADMIN_KEY)
}

#[tokio::test]
async fn test_admin_requires_key() {
    let router = build_server(sample_document()).router();

    let req = Request::builder()
        .uri("/admin/status")
        .body(Body::empty())
        .unwrap();
    let res = send(&router, req).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json(), json!({ "error": "unauthorized" }));

    let req = Request::builder()
        .uri("/admin/status")
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_KEY}"))
        .body(Body::empty())
        .unwrap();
    let res = send(&router, req).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["project"], "demo");
    assert_eq!(res.json()["routes"], 3);
}

#[tokio::test]
async fn test_import_json_replaces_routes() {
    let router = build_server(sample_document()).router();

    let doc = json!({
        "project": "shop",
        "api_key": "shop-key",
        "routes": [{
            "method": "GET",
            "path_template": "/cart",
            "scenarios": [{ "name": "empty", "body": { "items": [] } }]
        }]
    });
    let req = admin("POST", "/admin/import")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(doc.to_string()))
        .unwrap();
    let res = send(&router, req).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({ "project": "shop", "routes": 1, "scenarios": 1 }));

    // Old key and routes are gone.
    let res = send(&router, mock_get("/items/1").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/mock/shop/dev/cart")
        .header("x-mock-key", "shop-key")
        .body(Body::empty())
        .unwrap();
    let res = send(&router, req).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({ "items": [] }));
}

#[tokio::test]
async fn test_import_yaml_with_fallback_detection() {
    let router = build_server(sample_document()).router();
    let yaml = r#"
project: yaml-shop
api_key: yk
routes:
  - method: get
    path_template: /ping
    scenarios:
      - name: pong
        body: { pong: true }
"#;

    for content_type in ["application/x-yaml", "text/plain"] {
        let req = admin("POST", "/admin/import")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(yaml))
            .unwrap();
        let res = send(&router, req).await;
        assert_eq!(res.status, StatusCode::OK, "content type {content_type}");
        assert_eq!(res.json()["project"], "yaml-shop");
    }
}

#[tokio::test]
async fn test_failed_import_keeps_active_table() {
    let router = build_server(sample_document()).router();

    let bad_schema = json!({
        "api_key": "other",
        "routes": [{
            "method": "POST",
            "path_template": "/broken",
            "schemas": { "request_jsonschema": "{not json" }
        }]
    });
    let req = admin("POST", "/admin/import")
        .body(Body::from(bad_schema.to_string()))
        .unwrap();
    let res = send(&router, req).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let body = res.json();
    assert_eq!(body["error"], "compile");
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("POST") && detail.contains("/broken"), "{detail}");

    let req = admin("POST", "/admin/import")
        .body(Body::from("routes: [unclosed"))
        .unwrap();
    let res = send(&router, req).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["error"], "parse document");

    let req = admin("POST", "/admin/import")
        .header(header::CONTENT_TYPE, "application/yaml")
        .body(Body::empty())
        .unwrap();
    let res = send(&router, req).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["error"], "parse document");

    // Still serving the original document under the original key.
    let res = send(&router, mock_get("/items/7").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({ "id": "7" }));
}

#[tokio::test]
async fn test_routes_listing() {
    let router = build_server(sample_document()).router();

    let res = send(&router, admin("GET", "/admin/routes").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["project"], "demo");
    assert_eq!(
        body["routes"][0],
        json!({
            "method": "GET",
            "path": "/items/:id",
            "strict": false,
            "scenarios": ["debug", "ok"],
            "default": null
        })
    );
    assert_eq!(body["routes"][1]["strict"], true);
    assert_eq!(body["routes"][2]["default"], "default");
}

#[tokio::test]
async fn test_openapi_outline() {
    let router = build_server(sample_document()).router();

    let res = send(&router, admin("GET", "/admin/openapi").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status, StatusCode::OK);
    let spec = res.json();
    assert_eq!(spec["openapi"], "3.0.3");
    let item = &spec["paths"]["/items/{id}"]["get"];
    assert_eq!(item["responses"]["200"]["description"], "ok");
    assert_eq!(item["responses"]["500"]["description"], "debug");
    assert_eq!(
        spec["paths"]["/users"]["post"]["requestBody"]["required"],
        true
    );
}

#[tokio::test]
async fn test_routes_with_runtime_key_header() {
    let router = build_server(sample_document()).router();
    let req = admin("GET", "/admin/routes")
        .header("x-mock-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&router, req).await.status, StatusCode::OK);
}
