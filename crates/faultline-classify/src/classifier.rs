// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reduce any raised failure to exactly one canonical record.

use crate::builtin::internal_record;
use crate::failure::Failure;
use crate::registry::{self, TranslatorRegistry};
use faultline_taxonomy::{ErrorRecord, MAX_CAUSE_DEPTH, PathSegment};
use faultline_telemetry::{ClassificationEvent, ClassificationMetrics, EventSink, NullSink};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one classification, with provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// The canonical record.
    pub record: ErrorRecord,
    /// Name of the translator that claimed the failure; `None` when unmatched.
    pub translator: Option<String>,
    /// Response path of the resolver that raised the failure, if any.
    pub response_path: Option<Vec<PathSegment>>,
}

impl Classification {
    /// Whether a translator claimed the failure.
    pub fn matched(&self) -> bool {
        self.translator.is_some()
    }
}

/// Looks failures up in a frozen registry and reports every decision.
///
/// Cloning is cheap: the registry, sink and counters are shared.
#[derive(Clone)]
pub struct Classifier {
    registry: TranslatorRegistry,
    sink: Arc<dyn EventSink>,
    metrics: Arc<ClassificationMetrics>,
}

impl Classifier {
    /// Classifier over `registry` that discards events.
    pub fn new(registry: TranslatorRegistry) -> Self {
        Self {
            registry,
            sink: Arc::new(NullSink),
            metrics: Arc::new(ClassificationMetrics::new()),
        }
    }

    /// Classifier over the process-wide registry, once installed.
    pub fn from_global() -> Option<Self> {
        registry::global().cloned().map(Self::new)
    }

    /// Send events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Count into shared `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<ClassificationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The registry consulted.
    pub fn registry(&self) -> &TranslatorRegistry {
        &self.registry
    }

    /// Event sink.
    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    /// Shared counters.
    pub fn metrics(&self) -> &Arc<ClassificationMetrics> {
        &self.metrics
    }

    /// Classify `failure`.
    pub fn classify(&self, failure: &Failure) -> ErrorRecord {
        self.classify_detailed(failure).record
    }

    /// Classify `failure` and report which translator claimed it.
    ///
    /// Resolver wrappers are peeled off first, so a resolver that raised a
    /// persistence failure is classified as that persistence failure.
    pub fn classify_detailed(&self, failure: &Failure) -> Classification {
        let (inner, path) = failure.innermost();
        let (mut record, translator) = match self.registry.find(inner) {
            Some(t) => {
                debug!(
                    target: "faultline.classify",
                    translator = t.name(),
                    shape = inner.shape(),
                    "failure matched"
                );
                (t.translate(inner), Some(t.name().to_string()))
            }
            None => {
                warn!(
                    target: "faultline.classify",
                    shape = inner.shape(),
                    failure = %inner,
                    "unclassified failure"
                );
                (internal_record(inner), None)
            }
        };
        record.truncate_causes(MAX_CAUSE_DEPTH);

        let event = ClassificationEvent::new(translator.as_deref(), &record);
        self.metrics.record(&event);
        self.sink.emit(event);

        Classification {
            record,
            translator,
            response_path: path.map(<[PathSegment]>::to_vec),
        }
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
