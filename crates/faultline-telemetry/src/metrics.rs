// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lock-free classification counters.

use crate::{ClassificationEvent, TelemetryError};
use faultline_taxonomy::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

const KINDS: usize = ErrorKind::ALL.len();

/// Atomic counters shared by every request.
#[derive(Debug)]
pub struct ClassificationMetrics {
    total: AtomicU64,
    unmatched: AtomicU64,
    retryable: AtomicU64,
    render_fallbacks: AtomicU64,
    by_kind: [AtomicU64; KINDS],
}

impl ClassificationMetrics {
    /// Zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            unmatched: AtomicU64::new(0),
            retryable: AtomicU64::new(0),
            render_fallbacks: AtomicU64::new(0),
            by_kind: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Count one classification.
    pub fn record(&self, event: &ClassificationEvent) {
        self.total.fetch_add(1, Relaxed);
        if !event.matched {
            self.unmatched.fetch_add(1, Relaxed);
        }
        if event.retryable {
            self.retryable.fetch_add(1, Relaxed);
        }
        self.by_kind[event.kind.index()].fetch_add(1, Relaxed);
    }

    /// Count one response that had to use the hard-coded fallback envelope.
    pub fn record_render_fallback(&self) {
        self.render_fallbacks.fetch_add(1, Relaxed);
    }

    /// Point-in-time copy. `dropped` comes from the event sink.
    #[must_use]
    pub fn snapshot(&self, dropped: u64) -> MetricsSnapshot {
        let by_kind = ErrorKind::ALL
            .iter()
            .map(|k| (k.as_str().to_string(), self.by_kind[k.index()].load(Relaxed)))
            .filter(|(_, n)| *n > 0)
            .collect();
        MetricsSnapshot {
            total: self.total.load(Relaxed),
            unmatched: self.unmatched.load(Relaxed),
            retryable: self.retryable.load(Relaxed),
            render_fallbacks: self.render_fallbacks.load(Relaxed),
            dropped_events: dropped,
            by_kind,
        }
    }
}

impl Default for ClassificationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialisable copy of [`ClassificationMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Classifications performed.
    pub total: u64,
    /// Classifications no translator claimed.
    pub unmatched: u64,
    /// Classifications marked retryable.
    pub retryable: u64,
    /// Responses served from the fallback envelope.
    pub render_fallbacks: u64,
    /// Events the sink dropped under backpressure.
    pub dropped_events: u64,
    /// Non-zero counts per kind.
    pub by_kind: BTreeMap<String, u64>,
}

/// Turns a snapshot into an exportable string.
pub trait TelemetryExporter: Send + Sync {
    /// Export the snapshot.
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<String, TelemetryError>;
}

/// Pretty-printed JSON.
#[derive(Debug, Default)]
pub struct JsonExporter;

impl TelemetryExporter for JsonExporter {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<String, TelemetryError> {
        Ok(serde_json::to_string_pretty(snapshot)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_taxonomy::{ErrorCode, ErrorRecord};
    use std::sync::Arc;
    use std::thread;

    fn event(code: ErrorCode, matched: bool) -> ClassificationEvent {
        let rec = ErrorRecord::from_code(code);
        ClassificationEvent::new(matched.then_some("t"), &rec)
    }

    #[test]
    fn empty_snapshot() {
        let m = ClassificationMetrics::new();
        assert_eq!(m.snapshot(0), MetricsSnapshot::default());
    }

    #[test]
    fn counts_by_kind() {
        let m = ClassificationMetrics::new();
        m.record(&event(ErrorCode::ConflictUniqueViolation, true));
        m.record(&event(ErrorCode::Conflict, true));
        m.record(&event(ErrorCode::Internal, false));
        m.record(&event(ErrorCode::UpstreamTimeout, true));
        let s = m.snapshot(7);
        assert_eq!(s.total, 4);
        assert_eq!(s.unmatched, 1);
        assert_eq!(s.retryable, 1);
        assert_eq!(s.dropped_events, 7);
        assert_eq!(s.by_kind["conflict"], 2);
        assert_eq!(s.by_kind["internal"], 1);
        assert!(!s.by_kind.contains_key("validation"));
    }

    #[test]
    fn concurrent_records() {
        let m = Arc::new(ClassificationMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&m);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record(&event(ErrorCode::NotFound, true));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(m.snapshot(0).total, 800);
        assert_eq!(m.snapshot(0).by_kind["not_found"], 800);
    }

    #[test]
    fn render_fallbacks_counted() {
        let m = ClassificationMetrics::new();
        m.record_render_fallback();
        assert_eq!(m.snapshot(0).render_fallbacks, 1);
    }

    #[test]
    fn json_exporter_output() {
        let m = ClassificationMetrics::new();
        m.record(&event(ErrorCode::Validation, true));
        let out = JsonExporter.export(&m.snapshot(0)).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["total"], 1);
        assert_eq!(v["by_kind"]["validation"], 1);
    }
}
