// SPDX-License-Identifier: MIT OR Apache-2.0
//! The faultline boundary: every failure is classified and rendered before it
//! leaves the process.
//!
//! [`Boundary::run`] wraps one request-handling unit. A successful result
//! passes through untouched. An error, or a panic, is reduced to a canonical
//! record by the [`Classifier`] and rendered by the [`Renderer`]. If
//! classification or rendering itself fails, a hard-coded internal envelope
//! is served instead, so every exit path yields an envelope.
//!
//! [`http`] adapts this to axum, [`graph`] to graph queries with partial
//! results.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod graph;
pub mod http;
mod state;

pub use state::{BoundaryState, Pipeline, StateTransition, TransitionError};

use faultline_classify::{
    Capabilities, Classification, Classifier, Failure, RegistryBuilder, RegistryError,
    TranslatorRegistry,
};
use faultline_config::{CapabilityConfig, FaultlineConfig};
use faultline_render::{
    Protocol, RenderError, RenderOptions, Renderer, ResponseEnvelope, fallback_envelope,
};
use faultline_telemetry::{ClassificationMetrics, EventSink, MetricsSnapshot};
use futures::FutureExt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{error, warn};

/// Errors raised while assembling a [`Boundary`].
#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    /// Translator registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Outcome of a wrapped handler.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryOutcome<T> {
    /// The handler's own value.
    Succeeded(T),
    /// The rendered failure envelope.
    Responded(ResponseEnvelope),
}

impl<T> BoundaryOutcome<T> {
    /// `Ok` on success, `Err(envelope)` otherwise.
    pub fn into_result(self) -> Result<T, ResponseEnvelope> {
        match self {
            Self::Succeeded(v) => Ok(v),
            Self::Responded(env) => Err(env),
        }
    }

    /// Whether the handler succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// Map configured capability toggles onto translator groups.
pub fn capabilities_from_config(config: &CapabilityConfig) -> Capabilities {
    Capabilities {
        validation: config.validation,
        persistence: config.persistence,
        graph: config.graph,
        auth: config.auth,
        http: config.http,
        upstream: config.upstream,
        application: config.application,
    }
}

/// Render options from configuration.
pub fn render_options_from_config(config: &FaultlineConfig) -> RenderOptions {
    RenderOptions::default()
        .with_cause_depth(config.cause_depth)
        .with_debug(config.debug)
}

/// Classifier plus renderer, shared by every request.
///
/// Cloning is cheap; all state behind it is read-only or atomic.
#[derive(Debug, Clone)]
pub struct Boundary {
    classifier: Classifier,
    renderer: Renderer,
}

impl Boundary {
    /// Boundary over an existing classifier and renderer.
    pub fn new(classifier: Classifier, renderer: Renderer) -> Self {
        Self {
            classifier,
            renderer,
        }
    }

    /// Boundary over a frozen `registry`, rendering as `config` asks.
    pub fn from_registry(registry: TranslatorRegistry, config: &FaultlineConfig) -> Self {
        Self::new(
            Classifier::new(registry),
            Renderer::new(render_options_from_config(config)),
        )
    }

    /// Boundary with the built-in translators `config` enables.
    pub fn from_config(config: &FaultlineConfig) -> Result<Self, BoundaryError> {
        let caps = capabilities_from_config(&config.capabilities);
        let registry = RegistryBuilder::with_builtins(&caps)?.freeze();
        Ok(Self::from_registry(registry, config))
    }

    /// Send classification events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.classifier = self.classifier.with_sink(sink);
        self
    }

    /// The classifier in use.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// The renderer in use.
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Shared classification counters.
    pub fn metrics(&self) -> &Arc<ClassificationMetrics> {
        self.classifier.metrics()
    }

    /// Counters plus the sink's drop count.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics().snapshot(self.classifier.sink().dropped())
    }

    /// Run `handler` behind the boundary.
    pub async fn run<T, E, F>(&self, protocol: Protocol, handler: F) -> BoundaryOutcome<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<Failure>,
    {
        let mut pipeline = Pipeline::new();
        self.run_traced(protocol, handler, &mut pipeline).await
    }

    /// [`Boundary::run`], recording each state into `pipeline`.
    pub async fn run_traced<T, E, F>(
        &self,
        protocol: Protocol,
        handler: F,
        pipeline: &mut Pipeline,
    ) -> BoundaryOutcome<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<Failure>,
    {
        step(pipeline, BoundaryState::Handling);
        let failure = match AssertUnwindSafe(handler).catch_unwind().await {
            Ok(Ok(value)) => {
                step(pipeline, BoundaryState::Succeeded);
                return BoundaryOutcome::Succeeded(value);
            }
            Ok(Err(err)) => err.into(),
            Err(payload) => {
                warn!(target: "faultline.boundary", "handler panicked");
                Failure::from_panic(&*payload)
            }
        };
        BoundaryOutcome::Responded(self.respond(&failure, protocol, pipeline))
    }

    /// Classify and render a failure that was raised outside [`Boundary::run`].
    pub fn handle_failure(&self, failure: &Failure, protocol: Protocol) -> ResponseEnvelope {
        let mut pipeline = Pipeline::new();
        step(&mut pipeline, BoundaryState::Handling);
        self.respond(failure, protocol, &mut pipeline)
    }

    /// Classify and render from [`BoundaryState::Handling`] to
    /// [`BoundaryState::Responded`].
    pub fn respond(
        &self,
        failure: &Failure,
        protocol: Protocol,
        pipeline: &mut Pipeline,
    ) -> ResponseEnvelope {
        step(pipeline, BoundaryState::Classifying);
        let classified = catch_unwind(AssertUnwindSafe(|| {
            self.classifier.classify_detailed(failure)
        }));
        step(pipeline, BoundaryState::Rendering);
        let envelope = match classified {
            Ok(c) => match catch_unwind(AssertUnwindSafe(|| {
                self.render_classification(&c, protocol)
            })) {
                Ok(Ok(envelope)) => envelope,
                Ok(Err(err)) => {
                    error!(
                        target: "faultline.boundary",
                        error = %err,
                        "render failed, serving fallback envelope"
                    );
                    self.fallback(protocol)
                }
                Err(_) => {
                    error!(target: "faultline.boundary", "renderer panicked, serving fallback envelope");
                    self.fallback(protocol)
                }
            },
            Err(_) => {
                error!(target: "faultline.boundary", "classifier panicked, serving fallback envelope");
                self.fallback(protocol)
            }
        };
        step(pipeline, BoundaryState::Responded);
        envelope
    }

    /// Render an already classified failure. Graph errors carry the
    /// resolver's response path.
    pub fn render_classification(
        &self,
        classification: &Classification,
        protocol: Protocol,
    ) -> Result<ResponseEnvelope, RenderError> {
        match protocol {
            Protocol::Http => self.renderer.render(&classification.record, protocol),
            Protocol::Graph => Ok(ResponseEnvelope::Graph(self.renderer.render_graph(
                &classification.record,
                classification.response_path.as_deref(),
            )?)),
        }
    }

    fn fallback(&self, protocol: Protocol) -> ResponseEnvelope {
        self.metrics().record_render_fallback();
        fallback_envelope(protocol)
    }
}

fn step(pipeline: &mut Pipeline, to: BoundaryState) {
    if let Err(err) = pipeline.transition(to) {
        error!(target: "faultline.boundary", error = %err, "boundary state machine violated");
    }
}
