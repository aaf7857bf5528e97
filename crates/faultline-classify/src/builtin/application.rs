// SPDX-License-Identifier: MIT OR Apache-2.0
//! Records raised directly by business logic pass through unchanged.

use super::internal_record;
use crate::failure::{Failure, FailureLayer};
use crate::pattern::FailurePattern;
use crate::translator::Translator;
use faultline_taxonomy::ErrorRecord;

pub(super) fn translators() -> Vec<Translator> {
    vec![Translator::new(
        "application.record",
        FailurePattern::Layer(FailureLayer::Application),
        passthrough,
    )]
}

fn passthrough(failure: &Failure) -> ErrorRecord {
    match failure {
        Failure::Application(record) => record.clone(),
        other => internal_record(other),
    }
}
