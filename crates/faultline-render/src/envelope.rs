// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rendered response shapes.

use crate::RenderError;
use faultline_taxonomy::PathSegment;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HTTP status plus JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpEnvelope {
    /// Response status.
    pub status: u16,
    /// `{"error": {...}}` body.
    pub body: Value,
}

/// One entry of a graph response's `errors` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphErrorObject {
    /// Consumer-facing message.
    pub message: String,
    /// Response path of the failing field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    /// `code`, `fixit`, `kind`, `status`, `retryable` and optional context.
    pub extensions: Map<String, Value>,
}

/// A rendered failure for either calling convention.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    /// Plain HTTP.
    Http(HttpEnvelope),
    /// Graph query.
    Graph(GraphErrorObject),
}

impl ResponseEnvelope {
    /// Transport status. Graph errors travel in a 200 response.
    pub fn status(&self) -> u16 {
        match self {
            Self::Http(e) => e.status,
            Self::Graph(_) => 200,
        }
    }

    /// The response body as JSON.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Http(e) => e.body.clone(),
            Self::Graph(obj) => GraphResponse::errors_only(vec![obj.clone()]).to_value(),
        }
    }

    /// The response body as bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, RenderError> {
        Ok(serde_json::to_vec(&self.to_value())?)
    }
}

/// A graph response: partial data alongside any errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphResponse {
    /// Resolved data, `None` when execution never started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Field and request errors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphErrorObject>,
}

impl GraphResponse {
    /// Response carrying data and no errors yet.
    pub fn with_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// Request-level failure: no data at all.
    pub fn errors_only(errors: Vec<GraphErrorObject>) -> Self {
        Self { data: None, errors }
    }

    /// Append an error.
    pub fn push_error(&mut self, error: GraphErrorObject) {
        self.errors.push(error);
    }

    /// Whether data and errors coexist.
    pub fn is_partial(&self) -> bool {
        self.data.is_some() && !self.errors.is_empty()
    }

    /// JSON form.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if let Some(data) = &self.data {
            obj.insert("data".into(), data.clone());
        }
        if !self.errors.is_empty() {
            obj.insert(
                "errors".into(),
                Value::Array(self.errors.iter().map(error_value).collect()),
            );
        }
        Value::Object(obj)
    }

    /// JSON bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, RenderError> {
        Ok(serde_json::to_vec(&self.to_value())?)
    }
}

fn error_value(obj: &GraphErrorObject) -> Value {
    let mut m = Map::new();
    m.insert("message".into(), Value::String(obj.message.clone()));
    if let Some(path) = &obj.path {
        m.insert(
            "path".into(),
            Value::Array(
                path.iter()
                    .map(|seg| match seg {
                        PathSegment::Key(k) => Value::String(k.clone()),
                        PathSegment::Index(i) => Value::from(*i),
                    })
                    .collect(),
            ),
        );
    }
    m.insert("extensions".into(), Value::Object(obj.extensions.clone()));
    Value::Object(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn err(message: &str) -> GraphErrorObject {
        GraphErrorObject {
            message: message.into(),
            path: Some(vec![PathSegment::from("orders"), PathSegment::Index(1)]),
            extensions: Map::new(),
        }
    }

    #[test]
    fn partial_response() {
        let mut resp = GraphResponse::with_data(json!({"orders": [{"id": 1}, null]}));
        assert!(!resp.is_partial());
        resp.push_error(err("Not found"));
        assert!(resp.is_partial());
        let v = resp.to_value();
        assert_eq!(v["data"]["orders"][1], Value::Null);
        assert_eq!(v["errors"][0]["path"], json!(["orders", 1]));
    }

    #[test]
    fn errors_only_has_no_data_key() {
        let v = GraphResponse::errors_only(vec![err("x")]).to_value();
        assert!(v.get("data").is_none());
        assert_eq!(v["errors"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn graph_envelope_travels_as_200() {
        let env = ResponseEnvelope::Graph(err("x"));
        assert_eq!(env.status(), 200);
        assert_eq!(env.to_value()["errors"][0]["message"], "x");
    }

    #[test]
    fn serde_roundtrip_of_response() {
        let mut resp = GraphResponse::with_data(json!({"a": 1}));
        resp.push_error(err("boom"));
        let back: GraphResponse = serde_json::from_value(resp.to_value()).unwrap();
        assert_eq!(back, resp);
    }
}
