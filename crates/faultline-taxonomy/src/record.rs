// SPDX-License-Identifier: MIT OR Apache-2.0
//! The canonical error record.

use crate::{ErrorCode, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Hard cap on the number of nested causes a record may carry.
pub const MAX_CAUSE_DEPTH: usize = 10;

/// Detail keys with this prefix carry diagnostics that are only rendered in
/// debug mode.
pub const DEBUG_DETAIL_PREFIX: &str = "debug_";

/// Message shown to consumers for every internal failure.
pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

// ---------------------------------------------------------------------------
// PathSegment
// ---------------------------------------------------------------------------

/// One step into a nested input structure: an object key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object member name.
    Key(String),
    /// List position.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        Self::Key(s.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(s: String) -> Self {
        Self::Key(s)
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Human form of a path: `user.addresses[2].zip`.
pub fn display_path(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for seg in path {
        match seg {
            PathSegment::Key(k) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(k);
            }
            PathSegment::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// ErrorRecord
// ---------------------------------------------------------------------------

/// Canonical representation of one classified failure.
///
/// The kind is derived from the code, so the two can never disagree. The
/// cause chain is capped at [`MAX_CAUSE_DEPTH`] on every construction path.
///
/// ```
/// use faultline_taxonomy::{ErrorCode, ErrorKind, ErrorRecord};
///
/// let rec = ErrorRecord::new(ErrorCode::ConflictUniqueViolation, "email already taken")
///     .with_detail("columns", ["email"]);
/// assert_eq!(rec.kind(), ErrorKind::Conflict);
/// assert_eq!(rec.status(), 409);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ErrorRecordDto", from = "ErrorRecordDto")]
pub struct ErrorRecord {
    code: ErrorCode,
    message: String,
    field_path: Vec<PathSegment>,
    details: BTreeMap<String, Value>,
    cause: Option<Box<ErrorRecord>>,
    retryable: bool,
}

impl ErrorRecord {
    /// New record with the kind's default retry hint and no context.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field_path: Vec::new(),
            details: BTreeMap::new(),
            cause: None,
            retryable: code.kind().retryable_by_default(),
        }
    }

    /// New record whose message is the code's catalog title.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.title())
    }

    /// Set the path into the input this failure points at.
    #[must_use]
    pub fn with_field_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        self.field_path = path.into_iter().map(Into::into).collect();
        self
    }

    /// Add a structured detail. Values that fail to serialise are skipped.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.insert(key.into(), v);
        }
        self
    }

    /// Attach a cause, truncating its own chain so the total stays within
    /// [`MAX_CAUSE_DEPTH`].
    #[must_use]
    pub fn with_cause(mut self, mut cause: ErrorRecord) -> Self {
        cause.truncate_causes(MAX_CAUSE_DEPTH - 1);
        self.cause = Some(Box::new(cause));
        self
    }

    /// Override the retry hint.
    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Replace the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Stable code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Kind derived from the code.
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    /// HTTP status of the kind.
    pub fn status(&self) -> u16 {
        self.code.status()
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Path into the input, empty when not applicable.
    pub fn field_path(&self) -> &[PathSegment] {
        &self.field_path
    }

    /// Structured details, ordered by key.
    pub fn details(&self) -> &BTreeMap<String, Value> {
        &self.details
    }

    /// Look up one detail.
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    /// Directly wrapped cause.
    pub fn cause(&self) -> Option<&ErrorRecord> {
        self.cause.as_deref()
    }

    /// Iterate over the cause chain, nearest first.
    pub fn causes(&self) -> impl Iterator<Item = &ErrorRecord> {
        std::iter::successors(self.cause(), |r| r.cause())
    }

    /// Number of nested causes.
    pub fn cause_depth(&self) -> usize {
        self.causes().count()
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Drop causes nested deeper than `max_depth`.
    pub fn truncate_causes(&mut self, max_depth: usize) {
        match (&mut self.cause, max_depth) {
            (cause, 0) => *cause = None,
            (Some(cause), n) => cause.truncate_causes(n - 1),
            (None, _) => {}
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.field_path.is_empty() {
            write!(f, " at {}", display_path(&self.field_path))?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorRecord {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Serialization support
// ---------------------------------------------------------------------------

/// Wire form of an [`ErrorRecord`].
///
/// `kind` is written for readers and ignored on input; it is always derived
/// from `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecordDto {
    /// Error code.
    pub code: ErrorCode,
    /// Kind of `code`.
    #[serde(default, skip_deserializing)]
    pub kind: Option<ErrorKind>,
    /// Human-readable message.
    pub message: String,
    /// Path into the input.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_path: Vec<PathSegment>,
    /// Structured details.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
    /// Wrapped cause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ErrorRecordDto>>,
    /// Retry hint; defaults to the kind's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl From<ErrorRecord> for ErrorRecordDto {
    fn from(rec: ErrorRecord) -> Self {
        Self {
            code: rec.code,
            kind: Some(rec.code.kind()),
            message: rec.message,
            field_path: rec.field_path,
            details: rec.details,
            cause: rec.cause.map(|c| Box::new(ErrorRecordDto::from(*c))),
            retryable: Some(rec.retryable),
        }
    }
}

impl From<ErrorRecordDto> for ErrorRecord {
    fn from(dto: ErrorRecordDto) -> Self {
        let mut rec = ErrorRecord {
            code: dto.code,
            message: dto.message,
            field_path: dto.field_path,
            details: dto.details,
            cause: dto.cause.map(|c| Box::new(ErrorRecord::from(*c))),
            retryable: dto
                .retryable
                .unwrap_or(dto.code.kind().retryable_by_default()),
        };
        rec.truncate_causes(MAX_CAUSE_DEPTH);
        rec
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chain(depth: usize) -> ErrorRecord {
        let mut rec = ErrorRecord::new(ErrorCode::Internal, "leaf");
        for i in 0..depth {
            rec = ErrorRecord::new(ErrorCode::Upstream, format!("level {i}")).with_cause(rec);
        }
        rec
    }

    #[test]
    fn kind_follows_code() {
        let rec = ErrorRecord::new(ErrorCode::AuthTokenExpired, "expired");
        assert_eq!(rec.kind(), ErrorKind::Authentication);
        assert_eq!(rec.status(), 401);
    }

    #[test]
    fn retryable_defaults_by_kind() {
        assert!(ErrorRecord::from_code(ErrorCode::UpstreamTimeout).is_retryable());
        assert!(!ErrorRecord::from_code(ErrorCode::Internal).is_retryable());
        assert!(
            ErrorRecord::from_code(ErrorCode::ConflictSerializationFailure)
                .with_retryable(true)
                .is_retryable()
        );
    }

    #[test]
    fn cause_chain_capped() {
        let rec = chain(25);
        assert_eq!(rec.cause_depth(), MAX_CAUSE_DEPTH);
    }

    #[test]
    fn short_chain_untouched() {
        let rec = chain(3);
        assert_eq!(rec.cause_depth(), 3);
        assert_eq!(rec.causes().last().unwrap().message(), "leaf");
    }

    #[test]
    fn truncate_to_zero_drops_cause() {
        let mut rec = chain(4);
        rec.truncate_causes(0);
        assert!(rec.cause().is_none());
    }

    #[test]
    fn display_includes_path() {
        let rec = ErrorRecord::new(ErrorCode::Validation, "not an integer")
            .with_field_path([PathSegment::from("items"), PathSegment::Index(2), "qty".into()]);
        assert_eq!(rec.to_string(), "[validation] not an integer at items[2].qty");
    }

    #[test]
    fn error_source_is_cause() {
        use std::error::Error;
        let rec = chain(1);
        assert_eq!(rec.source().unwrap().to_string(), "[internal] leaf");
    }

    #[test]
    fn dto_omits_empty_fields() {
        let rec = ErrorRecord::new(ErrorCode::NotFound, "gone");
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(
            v,
            json!({"code": "not_found", "kind": "not_found", "message": "gone", "retryable": false})
        );
    }

    #[test]
    fn dto_ignores_kind_on_input() {
        let rec: ErrorRecord = serde_json::from_value(json!({
            "code": "conflict.unique_violation",
            "kind": "internal",
            "message": "dup"
        }))
        .unwrap();
        assert_eq!(rec.kind(), ErrorKind::Conflict);
        assert!(!rec.is_retryable());
    }

    #[test]
    fn path_segment_untagged() {
        let path: Vec<PathSegment> = serde_json::from_value(json!(["a", 0, "b"])).unwrap();
        assert_eq!(
            path,
            vec![PathSegment::from("a"), PathSegment::Index(0), PathSegment::from("b")]
        );
    }

    #[test]
    fn display_path_leading_index() {
        assert_eq!(display_path(&[PathSegment::Index(0), "x".into()]), "[0].x");
        assert_eq!(display_path(&[]), "");
    }
}
