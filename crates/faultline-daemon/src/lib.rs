// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(missing_docs)]

use axum::{
    Json, Router,
    extract::{Query, Request, State, rejection::JsonRejection},
    http::{HeaderMap, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use faultline_boundary::Boundary;
use faultline_boundary::graph::GraphExecution;
use faultline_boundary::http::{ApiFailure, boundary_middleware, request_id_middleware};
use faultline_classify::{
    Failure, HttpFailure, PersistenceFailure, ResolverFailure, UpstreamCondition,
    UpstreamFailure, bearer_token,
};
use faultline_render::Protocol;
use faultline_taxonomy::{ErrorCatalog, ErrorCode, ErrorRecord};
use faultline_telemetry::{JsonExporter, TelemetryExporter};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8089";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared daemon state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The boundary every route sits behind.
    pub boundary: Boundary,
    /// When the daemon started.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// State around `boundary`, started now.
    pub fn new(boundary: Boundary) -> Self {
        Self {
            boundary,
            started_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query string of `POST /classify`.
#[derive(Debug, Default, Deserialize)]
pub struct ClassifyParams {
    /// `http` (default) or `graph`.
    pub protocol: Option<String>,
}

/// Result of `POST /classify`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    /// Translator that claimed the failure, `null` when unmatched.
    pub translator: Option<String>,
    /// Protocol rendered for.
    pub protocol: String,
    /// Status the envelope would be served with.
    pub status: u16,
    /// The rendered envelope.
    pub envelope: Value,
}

/// Query string of `GET /catalog`.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    /// Return only this code.
    pub code: Option<String>,
}

/// Body of `POST /graph`.
#[derive(Debug, Deserialize)]
pub struct GraphRequest {
    /// Selection set, e.g. `{ greeting account }`.
    pub query: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// The daemon router with the boundary, request-id and logging middleware.
pub fn build_app(state: Arc<AppState>) -> Router {
    let boundary = state.boundary.clone();
    Router::new()
        .route("/health", get(cmd_health))
        .route("/catalog", get(cmd_catalog))
        .route("/metrics", get(cmd_metrics))
        .route("/classify", post(cmd_classify))
        .route("/graph", post(cmd_graph))
        .fallback(route_not_found)
        .with_state(state)
        .layer(middleware::from_fn_with_state(boundary, boundary_middleware))
        .layer(middleware::from_fn(log_requests))
        .layer(middleware::from_fn(request_id_middleware))
}

/// Log method, path, status and duration of every request.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let start = Instant::now();
    let resp = next.run(req).await;
    info!(
        target: "faultline.daemon",
        {
            http.method = %method,
            http.path = %path,
            http.status = resp.status().as_u16(),
            http.duration_ms = start.elapsed().as_millis() as u64,
        },
        "request completed"
    );
    resp
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn route_not_found(uri: Uri) -> ApiFailure {
    HttpFailure::new(404, format!("No route for {}", uri.path())).into()
}

async fn cmd_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at.to_rfc3339(),
        "translators": state.boundary.classifier().registry().len(),
    }))
}

async fn cmd_catalog(Query(params): Query<CatalogParams>) -> Result<Json<Value>, ApiFailure> {
    match params.code {
        Some(code) => {
            let entry = ErrorCatalog::lookup(&code).ok_or_else(|| {
                ErrorRecord::new(ErrorCode::NotFound, format!("Unknown error code '{code}'"))
                    .with_detail("code", code.as_str())
            })?;
            Ok(Json(json!(entry)))
        }
        None => Ok(Json(json!(ErrorCatalog::all()))),
    }
}

async fn cmd_metrics(State(state): State<Arc<AppState>>) -> Result<Response, ApiFailure> {
    let body = JsonExporter
        .export(&state.boundary.metrics_snapshot())
        .map_err(|e| Failure::unexpected(&e))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

async fn cmd_classify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClassifyParams>,
    payload: Result<Json<Failure>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, ApiFailure> {
    let protocol = match params.protocol.as_deref() {
        None => Protocol::Http,
        Some(raw) => raw.parse::<Protocol>().map_err(|_| {
            ErrorRecord::new(
                ErrorCode::BadRequestInvalidArgument,
                format!("Unknown protocol '{raw}', expected 'http' or 'graph'"),
            )
            .with_field_path(["protocol"])
            .with_detail("argument", "protocol")
        })?,
    };
    let Json(failure) = payload?;

    let classification = state.boundary.classifier().classify_detailed(&failure);
    let envelope = state
        .boundary
        .render_classification(&classification, protocol)
        .map_err(|e| Failure::unexpected(&e))?;
    Ok(Json(ClassifyResponse {
        translator: classification.translator,
        protocol: protocol.to_string(),
        status: envelope.status(),
        envelope: envelope.to_value(),
    }))
}

async fn cmd_graph(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<GraphRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiFailure> {
    let Json(request) = payload?;
    let fields = match selection(&request.query) {
        Ok(fields) => fields,
        Err(failure) => {
            let env = state
                .boundary
                .handle_failure(&Failure::from(failure), Protocol::Graph);
            return Ok(Json(env.to_value()));
        }
    };
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let mut exec = GraphExecution::new(&state.boundary);
    for field in fields {
        match field {
            "greeting" => exec.resolve(field, async { Ok::<_, Failure>("hello") }).await,
            "account" => {
                exec.resolve(field, async {
                    Err::<Value, _>(PersistenceFailure::no_result("account"))
                })
                .await
            }
            "viewer" => {
                exec.resolve(field, async {
                    bearer_token(authorization).map(|_| json!({ "authenticated": true }))
                })
                .await
            }
            "inventory" => {
                exec.resolve(field, async {
                    Err::<Value, _>(UpstreamFailure::new(
                        "inventory",
                        UpstreamCondition::Timeout,
                        "inventory service did not answer within 2s",
                    ))
                })
                .await
            }
            other => {
                let message = format!("Cannot query field \"{other}\" on type \"Query\"");
                exec.resolve(field, async move {
                    Err::<Value, _>(ResolverFailure::syntax(message))
                })
                .await
            }
        };
    }
    Ok(Json(exec.finish().to_value()))
}

/// Field names of a flat `{ a b c }` selection set.
fn selection(query: &str) -> Result<Vec<&str>, ResolverFailure> {
    let inner = query
        .trim()
        .strip_prefix('{')
        .and_then(|q| q.strip_suffix('}'))
        .ok_or_else(|| ResolverFailure::syntax("Syntax Error: expected a selection set"))?;
    let fields: Vec<&str> = inner
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|f| !f.is_empty())
        .collect();
    if fields.is_empty() {
        return Err(ResolverFailure::syntax("Syntax Error: empty selection set"));
    }
    if let Some(bad) = fields
        .iter()
        .find(|f| !f.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
    {
        return Err(ResolverFailure::syntax(format!(
            "Syntax Error: unexpected \"{bad}\""
        )));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_parses_flat_sets() {
        assert_eq!(selection("{ a b,c }").unwrap(), vec!["a", "b", "c"]);
        assert!(selection("a b").is_err());
        assert!(selection("{ }").is_err());
        assert!(selection("{ a { b } }").is_err());
    }
}
