// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render canonical error records for the calling convention.
//!
//! HTTP callers receive `(status, {"error": {...}})`. Graph-query callers
//! receive an error object with `message`, optional `path`, and
//! `extensions` carrying the code. Both carry the code's fix-it hint so a
//! caller knows what to change. Output is deterministic: object keys are
//! emitted in sorted order, so rendering the same record twice yields
//! byte-identical bytes.
//!
//! Detail keys prefixed with [`DEBUG_DETAIL_PREFIX`], and every detail of an
//! internal record, are dropped unless [`RenderOptions::debug`] is set.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod envelope;

pub use envelope::{GraphErrorObject, GraphResponse, HttpEnvelope, ResponseEnvelope};

use faultline_taxonomy::{
    DEBUG_DETAIL_PREFIX, ErrorCode, ErrorRecord, GENERIC_INTERNAL_MESSAGE, MAX_CAUSE_DEPTH, PathSegment,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

/// Rendered cause depth when nothing else is configured.
pub const DEFAULT_CAUSE_DEPTH: usize = 1;

/// Errors raised while producing response bytes.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The envelope could not be serialised.
    #[error("failed to serialise envelope: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The record's status is outside the error range.
    #[error("status {0} is not an error status")]
    InvalidStatus(u16),
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// Calling convention of the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Plain HTTP + JSON.
    #[default]
    Http,
    /// Graph query (error objects with extensions).
    Graph,
}

impl Protocol {
    /// Stable string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Graph => "graph",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is neither `http` nor `graph`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown protocol {0:?} (expected \"http\" or \"graph\")")]
pub struct UnknownProtocol(pub String);

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "graph" | "graphql" => Ok(Self::Graph),
            _ => Err(UnknownProtocol(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Rendering knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// How many nested causes to include. Clamped to [`MAX_CAUSE_DEPTH`].
    pub cause_depth: usize,
    /// Keep debug-prefixed and internal details.
    pub debug: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            cause_depth: DEFAULT_CAUSE_DEPTH,
            debug: false,
        }
    }
}

impl RenderOptions {
    /// Set the cause depth.
    #[must_use]
    pub fn with_cause_depth(mut self, depth: usize) -> Self {
        self.cause_depth = depth.min(MAX_CAUSE_DEPTH);
        self
    }

    /// Enable or disable debug output.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn effective_depth(&self) -> usize {
        self.cause_depth.min(MAX_CAUSE_DEPTH)
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Stateless renderer; one per process is enough.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    /// Renderer with `options`.
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Active options.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `record` for `protocol`.
    pub fn render(
        &self,
        record: &ErrorRecord,
        protocol: Protocol,
    ) -> Result<ResponseEnvelope, RenderError> {
        Ok(match protocol {
            Protocol::Http => ResponseEnvelope::Http(self.render_http(record)?),
            Protocol::Graph => ResponseEnvelope::Graph(self.render_graph(record, None)?),
        })
    }

    /// HTTP status and body.
    pub fn render_http(&self, record: &ErrorRecord) -> Result<HttpEnvelope, RenderError> {
        let status = checked_status(record)?;
        let body = json!({ "error": self.record_object(record, self.options.effective_depth()) });
        Ok(HttpEnvelope { status, body })
    }

    /// Graph error object, with the response path of the failing field.
    pub fn render_graph(
        &self,
        record: &ErrorRecord,
        path: Option<&[PathSegment]>,
    ) -> Result<GraphErrorObject, RenderError> {
        let status = checked_status(record)?;
        let mut extensions = Map::new();
        extensions.insert("code".into(), json!(record.code()));
        extensions.insert("fixit".into(), json!(record.code().fixit()));
        extensions.insert("kind".into(), json!(record.kind()));
        extensions.insert("status".into(), json!(status));
        extensions.insert("retryable".into(), json!(record.is_retryable()));
        self.insert_context(&mut extensions, record, self.options.effective_depth());
        Ok(GraphErrorObject {
            message: self.visible_message(record),
            path: path.filter(|p| !p.is_empty()).map(<[PathSegment]>::to_vec),
            extensions,
        })
    }

    fn record_object(&self, record: &ErrorRecord, depth: usize) -> Value {
        let mut obj = Map::new();
        obj.insert("code".into(), json!(record.code()));
        obj.insert("fixit".into(), json!(record.code().fixit()));
        obj.insert("kind".into(), json!(record.kind()));
        obj.insert("message".into(), json!(self.visible_message(record)));
        obj.insert("retryable".into(), json!(record.is_retryable()));
        self.insert_context(&mut obj, record, depth);
        Value::Object(obj)
    }

    fn insert_context(&self, obj: &mut Map<String, Value>, record: &ErrorRecord, depth: usize) {
        if !record.field_path().is_empty() {
            obj.insert("field_path".into(), json!(record.field_path()));
        }
        let details = self.visible_details(record);
        if !details.is_empty() {
            obj.insert("details".into(), Value::Object(details));
        }
        if depth > 0 {
            if let Some(cause) = record.cause() {
                obj.insert("cause".into(), self.record_object(cause, depth - 1));
            }
        }
    }

    fn visible_message(&self, record: &ErrorRecord) -> String {
        if record.kind().is_internal() && !self.options.debug {
            GENERIC_INTERNAL_MESSAGE.to_string()
        } else {
            record.message().to_string()
        }
    }

    fn visible_details(&self, record: &ErrorRecord) -> Map<String, Value> {
        if self.options.debug {
            return record
                .details()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }
        if record.kind().is_internal() {
            return Map::new();
        }
        record
            .details()
            .iter()
            .filter(|(k, _)| !k.starts_with(DEBUG_DETAIL_PREFIX))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

fn checked_status(record: &ErrorRecord) -> Result<u16, RenderError> {
    match record.status() {
        s @ 400..=599 => Ok(s),
        s => Err(RenderError::InvalidStatus(s)),
    }
}

/// Render with default options.
pub fn render(record: &ErrorRecord, protocol: Protocol) -> Result<ResponseEnvelope, RenderError> {
    Renderer::default().render(record, protocol)
}

/// The envelope served when classification or rendering itself failed.
///
/// Built from constants only, so producing it cannot fail.
pub fn fallback_envelope(protocol: Protocol) -> ResponseEnvelope {
    match protocol {
        Protocol::Http => ResponseEnvelope::Http(HttpEnvelope {
            status: 500,
            body: json!({
                "error": {
                    "code": "internal",
                    "fixit": ErrorCode::Internal.fixit(),
                    "kind": "internal",
                    "message": GENERIC_INTERNAL_MESSAGE,
                    "retryable": false,
                }
            }),
        }),
        Protocol::Graph => ResponseEnvelope::Graph(GraphErrorObject {
            message: GENERIC_INTERNAL_MESSAGE.to_string(),
            path: None,
            extensions: match json!({
                "code": "internal",
                "fixit": ErrorCode::Internal.fixit(),
                "kind": "internal",
                "status": 500,
                "retryable": false,
            }) {
                Value::Object(m) => m,
                _ => Map::new(),
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique() -> ErrorRecord {
        ErrorRecord::new(ErrorCode::ConflictUniqueViolation, "A record with this email already exists")
            .with_detail("columns", ["email"])
            .with_detail("debug_sqlstate", "23505")
    }

    #[test]
    fn http_body_shape() {
        let env = Renderer::default().render_http(&unique()).unwrap();
        assert_eq!(env.status, 409);
        let err = &env.body["error"];
        assert_eq!(err["code"], "conflict.unique_violation");
        assert_eq!(err["kind"], "conflict");
        assert_eq!(err["retryable"], false);
        assert_eq!(err["fixit"], "Choose a different value for the listed columns");
        assert_eq!(err["details"]["columns"][0], "email");
        assert!(err["details"].get("debug_sqlstate").is_none());
        assert!(err.get("field_path").is_none());
        assert!(err.get("cause").is_none());
    }

    #[test]
    fn debug_keeps_debug_details() {
        let r = Renderer::new(RenderOptions::default().with_debug(true));
        let env = r.render_http(&unique()).unwrap();
        assert_eq!(env.body["error"]["details"]["debug_sqlstate"], "23505");
    }

    #[test]
    fn internal_details_and_message_hidden() {
        let rec = ErrorRecord::new(ErrorCode::Internal, "db password wrong for user admin")
            .with_detail("host", "10.0.0.3");
        let env = Renderer::default().render_http(&rec).unwrap();
        assert_eq!(env.status, 500);
        assert_eq!(env.body["error"]["message"], GENERIC_INTERNAL_MESSAGE);
        assert!(env.body["error"].get("details").is_none());
        let debug = Renderer::new(RenderOptions::default().with_debug(true))
            .render_http(&rec)
            .unwrap();
        assert_eq!(debug.body["error"]["message"], "db password wrong for user admin");
    }

    #[test]
    fn cause_depth_respected() {
        let rec = ErrorRecord::from_code(ErrorCode::Upstream).with_cause(
            ErrorRecord::from_code(ErrorCode::UpstreamTimeout)
                .with_cause(ErrorRecord::from_code(ErrorCode::Conflict)),
        );
        let zero = Renderer::new(RenderOptions::default().with_cause_depth(0))
            .render_http(&rec)
            .unwrap();
        assert!(zero.body["error"].get("cause").is_none());
        let one = Renderer::default().render_http(&rec).unwrap();
        assert_eq!(one.body["error"]["cause"]["code"], "upstream.timeout");
        assert!(one.body["error"]["cause"].get("cause").is_none());
        let two = Renderer::new(RenderOptions::default().with_cause_depth(2))
            .render_http(&rec)
            .unwrap();
        assert_eq!(two.body["error"]["cause"]["cause"]["code"], "conflict");
    }

    #[test]
    fn cause_depth_clamped() {
        assert_eq!(
            RenderOptions::default().with_cause_depth(99).cause_depth,
            MAX_CAUSE_DEPTH
        );
    }

    #[test]
    fn graph_object_shape() {
        let rec = ErrorRecord::new(ErrorCode::AuthTokenExpired, "The token has expired");
        let path = [PathSegment::from("viewer"), PathSegment::Index(0)];
        let obj = Renderer::default().render_graph(&rec, Some(&path)).unwrap();
        assert_eq!(obj.message, "The token has expired");
        assert_eq!(obj.path.as_deref(), Some(&path[..]));
        assert_eq!(obj.extensions["code"], "auth.token_expired");
        assert_eq!(obj.extensions["status"], 401);
        assert_eq!(obj.extensions["fixit"], "Refresh the token or sign in again");
    }

    #[test]
    fn empty_graph_path_omitted() {
        let rec = ErrorRecord::from_code(ErrorCode::NotFound);
        let obj = Renderer::default().render_graph(&rec, Some(&[])).unwrap();
        assert!(obj.path.is_none());
    }

    #[test]
    fn render_is_byte_identical() {
        let rec = unique().with_field_path(["email"]);
        for protocol in [Protocol::Http, Protocol::Graph] {
            let a = render(&rec, protocol).unwrap().to_json_bytes().unwrap();
            let b = render(&rec, protocol).unwrap().to_json_bytes().unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn protocol_parse() {
        assert_eq!("HTTP".parse::<Protocol>().unwrap(), Protocol::Http);
        assert_eq!("graphql".parse::<Protocol>().unwrap(), Protocol::Graph);
        assert!("grpc".parse::<Protocol>().is_err());
    }

    #[test]
    fn fallback_envelopes() {
        let http = fallback_envelope(Protocol::Http);
        assert_eq!(http.status(), 500);
        let graph = fallback_envelope(Protocol::Graph);
        match graph {
            ResponseEnvelope::Graph(obj) => assert_eq!(obj.extensions["code"], "internal"),
            other => panic!("expected graph envelope, got {other:?}"),
        }
    }
}
