// SPDX-License-Identifier: MIT OR Apache-2.0
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use faultline_boundary::Boundary;
use faultline_config::FaultlineConfig;
use faultline_daemon::{AppState, ClassifyResponse, build_app};
use faultline_taxonomy::ErrorCode;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn test_state() -> Arc<AppState> {
    let boundary = Boundary::from_config(&FaultlineConfig::default()).unwrap();
    Arc::new(AppState::new(boundary))
}

async fn call(req: Request<Body>) -> (StatusCode, Value) {
    let resp = build_app(test_state()).oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// -----------------------------------------------------------------------
// Health / catalog / metrics
// -----------------------------------------------------------------------

#[tokio::test]
async fn health_returns_ok() {
    let (status, body) = call(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["translators"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn catalog_lists_every_code() {
    let (status, body) = call(get("/catalog")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), ErrorCode::ALL.len());
}

#[tokio::test]
async fn catalog_lookup_by_code() {
    let (status, body) = call(get("/catalog?code=auth.token_expired")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn catalog_unknown_code_is_not_found() {
    let (status, body) = call(get("/catalog?code=nope.nothing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
    assert_eq!(body["error"]["details"]["code"], "nope.nothing");
}

#[tokio::test]
async fn metrics_start_empty() {
    let (status, body) = call(get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn metrics_are_exported_as_json() {
    let resp = build_app(test_state()).oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains('\n'), "pretty-printed export expected");
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["render_fallbacks"], 0);
    assert!(body["by_kind"].as_object().unwrap().is_empty());
}

// -----------------------------------------------------------------------
// Classify
// -----------------------------------------------------------------------

#[tokio::test]
async fn classify_unique_violation() {
    let failure = json!({
        "layer": "persistence",
        "condition": "database",
        "sqlstate": "23505",
        "message": "duplicate key value violates unique constraint \"users_email_key\"",
        "detail": "Key (email)=(a@b.c) already exists."
    });
    let (status, body) = call(post("/classify", failure)).await;
    assert_eq!(status, StatusCode::OK);
    let resp: ClassifyResponse = serde_json::from_value(body).unwrap();
    assert_eq!(resp.status, 409);
    assert_eq!(resp.translator.as_deref(), Some("persistence.integrity"));
    assert_eq!(resp.envelope["error"]["code"], "conflict.unique_violation");
}

#[tokio::test]
async fn classify_expired_token_for_graph() {
    let failure = json!({ "layer": "auth", "condition": "expired" });
    let (status, body) = call(post("/classify?protocol=graph", failure)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["protocol"], "graph");
    assert_eq!(body["status"], 200);
    assert_eq!(
        body["envelope"]["errors"][0]["extensions"]["code"],
        "auth.token_expired"
    );
}

#[tokio::test]
async fn classify_rejects_unknown_protocol() {
    let failure = json!({ "layer": "auth", "condition": "missing" });
    let (status, body) = call(post("/classify?protocol=soap", failure)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request.invalid_argument");
    assert_eq!(body["error"]["field_path"], json!(["protocol"]));
}

#[tokio::test]
async fn classify_rejects_unknown_shape() {
    let (status, body) = call(post("/classify", json!({ "layer": "quantum" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "validation");
    assert_eq!(body["error"]["details"]["constraint"], "enum");
}

#[tokio::test]
async fn classify_rejects_broken_json() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/classify")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"layer\":"))
        .unwrap();
    let (status, body) = call(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request.malformed_body");
}

// -----------------------------------------------------------------------
// Graph
// -----------------------------------------------------------------------

#[tokio::test]
async fn graph_returns_partial_data() {
    let (status, body) = call(post("/graph", json!({ "query": "{ greeting account }" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["greeting"], "hello");
    assert!(body["data"]["account"].is_null());
    assert_eq!(body["errors"][0]["path"], json!(["account"]));
    assert_eq!(body["errors"][0]["extensions"]["code"], "not_found");
}

#[tokio::test]
async fn graph_viewer_requires_token() {
    let (_, body) = call(post("/graph", json!({ "query": "{ viewer }" }))).await;
    assert_eq!(body["errors"][0]["extensions"]["code"], "auth.required");
    assert_eq!(body["errors"][0]["extensions"]["status"], 401);
}

#[tokio::test]
async fn graph_syntax_error_has_no_data() {
    let (status, body) = call(post("/graph", json!({ "query": "greeting" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("data").is_none());
    assert_eq!(
        body["errors"][0]["extensions"]["code"],
        "bad_request.query_syntax"
    );
}

// -----------------------------------------------------------------------
// Framework failures
// -----------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_is_enveloped() {
    let (status, body) = call(get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found.route");
    assert_eq!(body["error"]["message"], "No route for /nope");
}

#[tokio::test]
async fn wrong_method_is_enveloped() {
    let req = Request::builder()
        .method(Method::DELETE)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request.method_not_allowed");
}
