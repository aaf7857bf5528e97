// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph query execution with partial results.
//!
//! Each top-level field resolves independently behind the boundary. A field
//! that fails contributes `null` to `data` and one entry to `errors`; the
//! others still return their values.

use crate::{Boundary, BoundaryOutcome};
use faultline_classify::Failure;
use faultline_render::{GraphErrorObject, GraphResponse, Protocol, ResponseEnvelope};
use faultline_taxonomy::PathSegment;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;

/// Collects field results and errors for one graph response.
#[derive(Debug)]
pub struct GraphExecution<'a> {
    boundary: &'a Boundary,
    data: Map<String, Value>,
    errors: Vec<GraphErrorObject>,
}

impl<'a> GraphExecution<'a> {
    /// Empty execution.
    pub fn new(boundary: &'a Boundary) -> Self {
        Self {
            boundary,
            data: Map::new(),
            errors: Vec::new(),
        }
    }

    /// Resolve `field` with `resolver`.
    ///
    /// Errors without a path of their own are attributed to `field`.
    pub async fn resolve<T, E, F>(&mut self, field: &str, resolver: F) -> &mut Self
    where
        T: Serialize,
        E: Into<Failure>,
        F: Future<Output = Result<T, E>>,
    {
        let value = match self.boundary.run(Protocol::Graph, resolver).await {
            BoundaryOutcome::Succeeded(v) => match serde_json::to_value(v) {
                Ok(value) => value,
                Err(err) => {
                    let env = self
                        .boundary
                        .handle_failure(&Failure::unexpected(&err), Protocol::Graph);
                    self.push(field, env);
                    Value::Null
                }
            },
            BoundaryOutcome::Responded(env) => {
                self.push(field, env);
                Value::Null
            }
        };
        self.data.insert(field.to_string(), value);
        self
    }

    /// Number of errors so far.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// The response: `data` with every resolved field, plus `errors` if any.
    pub fn finish(self) -> GraphResponse {
        let mut response = GraphResponse::with_data(Value::Object(self.data));
        for error in self.errors {
            response.push_error(error);
        }
        response
    }

    fn push(&mut self, field: &str, env: ResponseEnvelope) {
        let mut obj = match env {
            ResponseEnvelope::Graph(obj) => obj,
            ResponseEnvelope::Http(http) => GraphErrorObject {
                message: http.body["error"]["message"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
                path: None,
                extensions: Map::new(),
            },
        };
        if obj.path.is_none() {
            obj.path = Some(vec![PathSegment::from(field)]);
        }
        self.errors.push(obj);
    }
}
