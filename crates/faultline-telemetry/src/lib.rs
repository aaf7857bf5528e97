// SPDX-License-Identifier: MIT OR Apache-2.0
//! faultline-telemetry
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Observability for the classification pipeline.
//!
//! Every classification produces one [`ClassificationEvent`]. Events go to an
//! [`EventSink`], whose `emit` must never block: [`BufferedSink`] hands events
//! to a bounded channel and drops them when the channel is full, so a slow
//! exporter can never delay a response. Counters live in
//! [`ClassificationMetrics`] and are updated with relaxed atomics.

mod metrics;

pub use metrics::{ClassificationMetrics, JsonExporter, MetricsSnapshot, TelemetryExporter};

use chrono::{DateTime, Utc};
use faultline_taxonomy::{ErrorCode, ErrorKind, ErrorRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Translator tag used when no translator claimed a failure.
pub const UNMATCHED: &str = "unmatched";

/// Errors surfaced by telemetry exporters.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The snapshot could not be serialised.
    #[error("failed to serialise metrics: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// ClassificationEvent
// ---------------------------------------------------------------------------

/// One classification outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEvent {
    /// Name of the translator that produced the record, or [`UNMATCHED`].
    pub translator: String,
    /// Resulting code.
    pub code: ErrorCode,
    /// Kind of `code`.
    pub kind: ErrorKind,
    /// HTTP status of `kind`.
    pub status: u16,
    /// Retry hint on the record.
    pub retryable: bool,
    /// Whether a translator matched.
    pub matched: bool,
    /// When the classification happened.
    pub timestamp: DateTime<Utc>,
}

impl ClassificationEvent {
    /// Build an event for `record` produced by `translator` (`None` when unmatched).
    pub fn new(translator: Option<&str>, record: &ErrorRecord) -> Self {
        Self {
            translator: translator.unwrap_or(UNMATCHED).to_string(),
            code: record.code(),
            kind: record.kind(),
            status: record.status(),
            retryable: record.is_retryable(),
            matched: translator.is_some(),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Destination for classification events. `emit` must return promptly.
pub trait EventSink: Send + Sync {
    /// Hand over one event. Implementations may drop it.
    fn emit(&self, event: ClassificationEvent);

    /// Number of events dropped so far.
    fn dropped(&self) -> u64 {
        0
    }
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: ClassificationEvent) {
        (**self).emit(event)
    }

    fn dropped(&self) -> u64 {
        (**self).dropped()
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ClassificationEvent) {}
}

/// Writes every event as a `tracing` record on the `faultline.classify` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ClassificationEvent) {
        if event.matched {
            info!(
                target: "faultline.classify",
                translator = %event.translator,
                code = %event.code,
                status = event.status,
                retryable = event.retryable,
                "classified"
            );
        } else {
            warn!(
                target: "faultline.classify",
                translator = %event.translator,
                code = %event.code,
                status = event.status,
                "classified without a matching translator"
            );
        }
    }
}

/// Bounded, non-blocking sink backed by a tokio channel.
///
/// `emit` uses `try_send`; a full or closed channel drops the event and bumps
/// the drop counter.
#[derive(Debug, Clone)]
pub struct BufferedSink {
    tx: mpsc::Sender<ClassificationEvent>,
    dropped: Arc<AtomicU64>,
}

/// Receiving half of a [`BufferedSink`].
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<ClassificationEvent>,
}

impl BufferedSink {
    /// Create a sink with room for `capacity` pending events (at least one).
    pub fn new(capacity: usize) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            EventReceiver { rx },
        )
    }
}

impl EventSink for BufferedSink {
    fn emit(&self, event: ClassificationEvent) {
        if self.tx.try_send(event).is_err() {
            self.dropped.fetch_add(1, Relaxed);
        }
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Relaxed)
    }
}

impl EventReceiver {
    /// Wait for the next event. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<ClassificationEvent> {
        self.rx.recv().await
    }

    /// Take an event if one is ready.
    pub fn try_recv(&mut self) -> Option<ClassificationEvent> {
        self.rx.try_recv().ok()
    }
}

/// Forward buffered events into `sink` until all senders are dropped.
///
/// Typically spawned once at startup with a [`TracingSink`] as the target.
pub async fn drain(mut rx: EventReceiver, sink: impl EventSink) -> u64 {
    let mut forwarded = 0;
    while let Some(event) = rx.recv().await {
        sink.emit(event);
        forwarded += 1;
    }
    forwarded
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<ClassificationEvent>>);

    impl EventSink for Collect {
        fn emit(&self, event: ClassificationEvent) {
            self.0.lock().expect("collect lock poisoned").push(event);
        }
    }

    fn record() -> ErrorRecord {
        ErrorRecord::from_code(ErrorCode::ConflictUniqueViolation)
    }

    #[test]
    fn event_from_matched_record() {
        let ev = ClassificationEvent::new(Some("persistence.integrity"), &record());
        assert!(ev.matched);
        assert_eq!(ev.translator, "persistence.integrity");
        assert_eq!(ev.kind, ErrorKind::Conflict);
        assert_eq!(ev.status, 409);
    }

    #[test]
    fn event_unmatched_tag() {
        let ev = ClassificationEvent::new(None, &ErrorRecord::from_code(ErrorCode::Internal));
        assert!(!ev.matched);
        assert_eq!(ev.translator, UNMATCHED);
    }

    #[test]
    fn buffered_sink_drops_when_full() {
        let (sink, mut rx) = BufferedSink::new(2);
        for _ in 0..5 {
            sink.emit(ClassificationEvent::new(None, &record()));
        }
        assert_eq!(sink.dropped(), 3);
        assert!(rx.try_recv().is_some());
        assert!(rx.try_recv().is_some());
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn buffered_sink_drops_when_closed() {
        let (sink, rx) = BufferedSink::new(4);
        drop(rx);
        sink.emit(ClassificationEvent::new(None, &record()));
        assert_eq!(sink.dropped(), 1);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let (sink, mut rx) = BufferedSink::new(0);
        sink.emit(ClassificationEvent::new(None, &record()));
        assert_eq!(sink.dropped(), 0);
        assert!(rx.try_recv().is_some());
    }

    #[tokio::test]
    async fn drain_forwards_until_closed() {
        let (sink, rx) = BufferedSink::new(8);
        for _ in 0..3 {
            sink.emit(ClassificationEvent::new(Some("t"), &record()));
        }
        drop(sink);
        let target = Arc::new(Collect::default());
        let n = drain(rx, target.clone()).await;
        assert_eq!(n, 3);
        assert_eq!(target.0.lock().unwrap().len(), 3);
    }

    #[test]
    fn arc_sink_delegates() {
        let inner = Arc::new(Collect::default());
        let sink: Arc<dyn EventSink> = inner.clone();
        sink.emit(ClassificationEvent::new(Some("x"), &record()));
        assert_eq!(inner.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn event_serialises_code_string() {
        let ev = ClassificationEvent::new(Some("auth.token"), &ErrorRecord::from_code(ErrorCode::AuthTokenExpired));
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["code"], "auth.token_expired");
        assert_eq!(v["kind"], "auth");
    }
}
