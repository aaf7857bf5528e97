// SPDX-License-Identifier: MIT OR Apache-2.0
//! Relational store failures.
//!
//! Missing rows become `not_found`, integrity violations become `conflict`
//! (not-null becomes `validation`), and transient driver conditions become
//! retryable conflict or upstream records.

use super::{debug_key, internal_record};
use crate::failure::{Failure, PersistenceCondition, PersistenceFailure};
use crate::pattern::FailurePattern;
use crate::translator::Translator;
use faultline_taxonomy::{ErrorCode, ErrorRecord};

pub(super) fn translators() -> Vec<Translator> {
    vec![
        Translator::new(
            "persistence.missing_row",
            FailurePattern::AnyOf(vec![
                FailurePattern::shape("persistence.no_result"),
                FailurePattern::shape("persistence.multiple_results"),
            ]),
            with_persistence(missing_row),
        ),
        Translator::new(
            "persistence.integrity",
            FailurePattern::AnyOf(vec![
                FailurePattern::shape("persistence.*_violation"),
                FailurePattern::shape("persistence.integrity"),
            ]),
            with_persistence(integrity),
        ),
        Translator::new(
            "persistence.transient",
            FailurePattern::AnyOf(vec![
                FailurePattern::shape("persistence.serialization_failure"),
                FailurePattern::shape("persistence.connection"),
                FailurePattern::shape("persistence.query_canceled"),
            ]),
            with_persistence(transient),
        ),
    ]
}

fn with_persistence(
    map: fn(&PersistenceFailure) -> ErrorRecord,
) -> impl Fn(&Failure) -> ErrorRecord + Send + Sync {
    move |f: &Failure| match f {
        Failure::Persistence(p) => map(p),
        other => internal_record(other),
    }
}

fn missing_row(p: &PersistenceFailure) -> ErrorRecord {
    let entity = p.entity.as_deref().unwrap_or("record");
    let record = match p.condition {
        PersistenceCondition::MultipleResults => ErrorRecord::new(
            ErrorCode::NotFoundMultipleResults,
            format!("More than one {entity} matched"),
        ),
        _ => ErrorRecord::new(ErrorCode::NotFound, format!("{} not found", capitalise(entity))),
    };
    match &p.entity {
        Some(e) => record.with_detail("entity", e),
        None => record,
    }
}

fn integrity(p: &PersistenceFailure) -> ErrorRecord {
    let columns = p.resolved_columns();
    let shape = p.shape();

    if shape == "persistence.not_null_violation" {
        let message = match columns.first() {
            Some(col) => format!("{col} is required"),
            None => ErrorCode::ValidationNotNullViolation.title().to_string(),
        };
        let mut record = ErrorRecord::new(ErrorCode::ValidationNotNullViolation, message)
            .with_field_path(columns.iter().take(1).map(String::as_str));
        if let Some(table) = &p.table {
            record = record.with_detail("table", table);
        }
        return record;
    }

    let (code, message) = match shape {
        "persistence.unique_violation" => (
            ErrorCode::ConflictUniqueViolation,
            match columns.as_slice() {
                [] => "A record with the same unique value already exists".to_string(),
                cols => format!("A record with this {} already exists", cols.join(", ")),
            },
        ),
        "persistence.foreign_key_violation" => (
            ErrorCode::ConflictForeignKeyViolation,
            "The referenced record does not exist or is still referenced".to_string(),
        ),
        "persistence.check_violation" => (
            ErrorCode::ConflictCheckViolation,
            "The values violate a data constraint".to_string(),
        ),
        "persistence.exclusion_violation" => (
            ErrorCode::ConflictExclusionViolation,
            "The record overlaps an existing one".to_string(),
        ),
        _ => (ErrorCode::Conflict, ErrorCode::Conflict.title().to_string()),
    };

    let mut record = ErrorRecord::new(code, message);
    if !columns.is_empty() {
        record = record.with_detail("columns", &columns);
    }
    if let Some(constraint) = &p.constraint {
        record = record.with_detail("constraint", constraint);
    }
    if let Some(table) = &p.table {
        record = record.with_detail("table", table);
    }
    if let Some(values) = p.conflicting_values() {
        record = record.with_detail("values", values);
    }
    record
}

fn transient(p: &PersistenceFailure) -> ErrorRecord {
    let code = match p.shape() {
        "persistence.serialization_failure" => ErrorCode::ConflictSerializationFailure,
        "persistence.query_canceled" => ErrorCode::UpstreamTimeout,
        _ => ErrorCode::UpstreamUnavailable,
    };
    let mut record = ErrorRecord::from_code(code)
        .with_retryable(true)
        .with_detail(debug_key("database_message"), &p.message);
    if let Some(state) = &p.sqlstate {
        record = record.with_detail(debug_key("sqlstate"), state);
    }
    if code.kind() == faultline_taxonomy::ErrorKind::Upstream {
        record = record.with_detail("service", "database");
    }
    record
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
