// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph engine failures that are not wrappers around another layer.
//!
//! Wrapped resolver failures never reach these translators: the classifier
//! unwraps them to the innermost failure first.

use super::{debug_key, internal_record};
use crate::failure::{Failure, ResolverFailure, ResolverFailureKind};
use crate::pattern::FailurePattern;
use crate::translator::Translator;
use faultline_taxonomy::{ErrorCode, ErrorRecord, GENERIC_INTERNAL_MESSAGE};

pub(super) fn translators() -> Vec<Translator> {
    vec![
        Translator::new(
            "graph.query_syntax",
            FailurePattern::shape("resolver.syntax"),
            with_resolver(query_syntax),
        ),
        Translator::new(
            "graph.variable_invalid",
            FailurePattern::shape("resolver.variable_invalid"),
            with_resolver(variable_invalid),
        ),
        Translator::new(
            "graph.invalid_argument",
            FailurePattern::shape("resolver.invalid_argument"),
            with_resolver(invalid_argument),
        ),
        Translator::new(
            "graph.execution",
            FailurePattern::shape("resolver.execution"),
            with_resolver(execution),
        ),
    ]
}

fn with_resolver(
    map: fn(&ResolverFailure) -> ErrorRecord,
) -> impl Fn(&Failure) -> ErrorRecord + Send + Sync {
    move |f: &Failure| match f {
        Failure::Resolver(r) => map(r),
        other => internal_record(other),
    }
}

fn query_syntax(r: &ResolverFailure) -> ErrorRecord {
    let ResolverFailureKind::Syntax { message, locations } = &r.kind else {
        return internal_record(&r.clone().into());
    };
    let record = ErrorRecord::new(ErrorCode::BadRequestQuerySyntax, message.as_str());
    if locations.is_empty() {
        record
    } else {
        record.with_detail("locations", locations)
    }
}

fn variable_invalid(r: &ResolverFailure) -> ErrorRecord {
    let ResolverFailureKind::VariableInvalid {
        variable,
        path,
        message,
    } = &r.kind
    else {
        return internal_record(&r.clone().into());
    };
    ErrorRecord::new(ErrorCode::ValidationVariableInvalid, message.as_str())
        .with_field_path(path.clone())
        .with_detail("variable", variable)
}

fn invalid_argument(r: &ResolverFailure) -> ErrorRecord {
    let ResolverFailureKind::InvalidArgument { argument, message } = &r.kind else {
        return internal_record(&r.clone().into());
    };
    ErrorRecord::new(ErrorCode::BadRequestInvalidArgument, message.as_str())
        .with_field_path([argument.as_str()])
        .with_detail("argument", argument)
}

fn execution(r: &ResolverFailure) -> ErrorRecord {
    ErrorRecord::new(ErrorCode::Internal, GENERIC_INTERNAL_MESSAGE)
        .with_retryable(false)
        .with_detail(debug_key("engine_message"), r.to_string())
}
