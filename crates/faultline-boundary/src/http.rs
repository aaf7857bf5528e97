// SPDX-License-Identifier: MIT OR Apache-2.0
//! axum integration.
//!
//! Handlers return `Result<T, ApiFailure>`. [`boundary_middleware`] turns
//! the pending failure, a handler panic, or any other 4xx/5xx response the
//! boundary did not render itself (unknown route, wrong method, body
//! rejection, a handler's own error body) into a rendered envelope.
//!
//! ```no_run
//! use axum::{Router, middleware, routing::get};
//! use faultline_boundary::Boundary;
//! use faultline_boundary::http::{ApiFailure, boundary_middleware};
//! use faultline_classify::AuthFailure;
//!
//! async fn me() -> Result<&'static str, ApiFailure> {
//!     Err(AuthFailure::Missing.into())
//! }
//!
//! # fn app(boundary: Boundary) -> Router {
//! Router::new()
//!     .route("/me", get(me))
//!     .layer(middleware::from_fn_with_state(boundary, boundary_middleware))
//! # }
//! ```

use crate::Boundary;
use axum::{
    Json,
    body::to_bytes,
    extract::{Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use faultline_classify::{
    AuthFailure, Failure, HttpFailure, PersistenceFailure, ResolverFailure, UnexpectedFailure,
    UpstreamFailure, ValidationFailure,
};
use faultline_render::{Protocol, ResponseEnvelope, fallback_envelope};
use faultline_taxonomy::ErrorRecord;
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};
use uuid::Uuid;

/// Largest framework error body read back for classification.
const MAX_REWRITE_BODY: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// ApiFailure
// ---------------------------------------------------------------------------

/// Handler error type. Converts from every failure shape.
#[derive(Debug, Clone)]
pub struct ApiFailure(pub Failure);

/// Response extension carrying a failure for [`boundary_middleware`].
#[derive(Debug, Clone)]
pub struct PendingFailure(pub Failure);

impl IntoResponse for ApiFailure {
    /// Produces the fallback envelope tagged with [`PendingFailure`]; the
    /// middleware replaces it with the classified one.
    fn into_response(self) -> Response {
        let mut resp = EnvelopeResponse(fallback_envelope(Protocol::Http)).into_response();
        resp.extensions_mut().insert(PendingFailure(self.0));
        resp
    }
}

macro_rules! impl_api_failure_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ApiFailure {
                fn from(f: $ty) -> Self {
                    Self(Failure::from(f))
                }
            }
        )*
    };
}

impl_api_failure_from!(
    Failure,
    ValidationFailure,
    PersistenceFailure,
    ResolverFailure,
    AuthFailure,
    HttpFailure,
    UpstreamFailure,
    UnexpectedFailure,
    ErrorRecord,
    anyhow::Error,
);

/// Prefix axum puts in front of the deserializer's message.
const JSON_DATA_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

impl From<JsonRejection> for ApiFailure {
    fn from(rejection: JsonRejection) -> Self {
        let kind = match &rejection {
            JsonRejection::JsonDataError(_) => {
                return Self(Failure::from(json_data_failure(&rejection.body_text())));
            }
            JsonRejection::JsonSyntaxError(_) => "json_syntax",
            JsonRejection::MissingJsonContentType(_) => "missing_json_content_type",
            JsonRejection::BytesRejection(_) => "bytes",
            _ => "json",
        };
        Self(Failure::from(
            HttpFailure::new(rejection.status().as_u16(), rejection.body_text())
                .with_rejection(kind),
        ))
    }
}

/// A body that parsed as JSON but did not fit the handler's type.
fn json_data_failure(text: &str) -> ValidationFailure {
    let text = text.trim();
    ValidationFailure::from_deserialize_message(text.strip_prefix(JSON_DATA_PREFIX).unwrap_or(text))
}

// ---------------------------------------------------------------------------
// EnvelopeResponse
// ---------------------------------------------------------------------------

/// A rendered envelope as an axum response.
#[derive(Debug, Clone)]
pub struct EnvelopeResponse(pub ResponseEnvelope);

/// Response extension marking a body the boundary rendered itself.
#[derive(Debug, Clone, Copy)]
pub struct Rendered;

impl IntoResponse for EnvelopeResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut resp = (status, Json(self.0.to_value())).into_response();
        resp.extensions_mut().insert(Rendered);
        resp
    }
}

// ---------------------------------------------------------------------------
// Boundary middleware
// ---------------------------------------------------------------------------

/// Classify and render every failure leaving the wrapped routes.
///
/// Install with [`axum::middleware::from_fn_with_state`].
pub async fn boundary_middleware(
    State(boundary): State<Boundary>,
    req: Request,
    next: Next,
) -> Response {
    let resp = match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(resp) => resp,
        Err(payload) => {
            warn!(target: "faultline.boundary", "handler panicked");
            let failure = Failure::from_panic(&*payload);
            return envelope(&boundary, &failure);
        }
    };

    if let Some(PendingFailure(failure)) = resp.extensions().get::<PendingFailure>().cloned() {
        return envelope(&boundary, &failure);
    }

    let status = resp.status();
    let is_error = status.is_client_error() || status.is_server_error();
    if !is_error || resp.extensions().get::<Rendered>().is_some() {
        return resp;
    }

    debug!(
        target: "faultline.boundary",
        status = status.as_u16(),
        "rewriting error response the boundary did not render"
    );
    let text = match to_bytes(resp.into_body(), MAX_REWRITE_BODY).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
        Err(_) => String::new(),
    };
    envelope(&boundary, &unrendered_failure(status, &text))
}

fn envelope(boundary: &Boundary, failure: &Failure) -> Response {
    EnvelopeResponse(boundary.handle_failure(failure, Protocol::Http)).into_response()
}

/// Failure for an error response produced outside the boundary.
///
/// axum's typed-body rejection becomes a validation failure with its field
/// path. A JSON body contributes its `message` (or string `error`) field;
/// other JSON is dropped.
fn unrendered_failure(status: StatusCode, text: &str) -> Failure {
    if text.starts_with(JSON_DATA_PREFIX) {
        return Failure::from(json_data_failure(text));
    }
    let message = match serde_json::from_str::<Value>(text) {
        Ok(body) => ["message", "error"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string(),
        Err(_) => text.to_string(),
    };
    Failure::from(HttpFailure::new(status.as_u16(), message))
}

// ---------------------------------------------------------------------------
// RequestId middleware
// ---------------------------------------------------------------------------

/// A unique request identifier, available as an axum extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

/// Generate a [`RequestId`] per request and echo it in `x-request-id`.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = RequestId(Uuid::new_v4());
    req.extensions_mut().insert(id);
    let mut resp = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id.0.to_string()) {
        resp.headers_mut().insert("x-request-id", value);
    }
    resp
}
