// SPDX-License-Identifier: MIT OR Apache-2.0
//! Schema validation failures.

use super::internal_record;
use crate::failure::{Failure, FailureLayer, ValidationFailure};
use crate::pattern::FailurePattern;
use crate::translator::Translator;
use faultline_taxonomy::{ErrorCode, ErrorRecord, display_path};
use serde_json::{Map, Value, json};

pub(super) fn translators() -> Vec<Translator> {
    vec![Translator::new(
        "validation.schema",
        FailurePattern::Layer(FailureLayer::Validation),
        |f: &Failure| match f {
            Failure::Validation(v) => map_validation(v),
            other => internal_record(other),
        },
    )]
}

fn map_validation(failure: &ValidationFailure) -> ErrorRecord {
    let message = match failure.violations.as_slice() {
        [] => ErrorCode::Validation.title().to_string(),
        [only] => only.message.clone(),
        many => format!("{} fields failed validation", many.len()),
    };
    let errors: Vec<Value> = failure
        .violations
        .iter()
        .map(|v| {
            let mut entry = Map::new();
            entry.insert("field_path".into(), json!(v.path));
            entry.insert("path".into(), json!(display_path(&v.path)));
            entry.insert("constraint".into(), json!(v.constraint));
            entry.insert("message".into(), json!(v.message));
            if let Some(value) = &v.invalid_value {
                entry.insert("invalid_value".into(), value.clone());
            }
            Value::Object(entry)
        })
        .collect();

    let mut record = ErrorRecord::new(ErrorCode::Validation, message);
    if let Some(first) = failure.violations.first() {
        record = record
            .with_field_path(first.path.clone())
            .with_detail("constraint", &first.constraint);
    }
    if !errors.is_empty() {
        record = record.with_detail("errors", errors);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::Violation;
    use faultline_taxonomy::{ErrorKind, PathSegment};

    #[test]
    fn single_violation_points_at_field() {
        let f = ValidationFailure::new(vec![
            Violation::new(["age"], "type", "\"ten\" is not of type \"integer\"")
                .with_invalid_value(json!("ten")),
        ]);
        let rec = map_validation(&f);
        assert_eq!(rec.kind(), ErrorKind::Validation);
        assert_eq!(rec.status(), 422);
        assert_eq!(rec.field_path(), &[PathSegment::from("age")]);
        assert_eq!(rec.message(), "\"ten\" is not of type \"integer\"");
        assert_eq!(rec.detail("constraint").unwrap(), "type");
        assert_eq!(rec.detail("errors").unwrap()[0]["invalid_value"], "ten");
    }

    #[test]
    fn many_violations_summarised() {
        let f = ValidationFailure::new(vec![
            Violation::new(["items", "0"], "minimum", "too small"),
            Violation::new(["name"], "required", "missing"),
        ]);
        let rec = map_validation(&f);
        assert_eq!(rec.message(), "2 fields failed validation");
        let errors = rec.detail("errors").unwrap().as_array().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1]["path"], "name");
    }

    #[test]
    fn empty_failure_still_validation() {
        let rec = map_validation(&ValidationFailure::new(Vec::new()));
        assert_eq!(rec.code(), ErrorCode::Validation);
        assert!(rec.field_path().is_empty());
        assert!(rec.details().is_empty());
    }
}
