// SPDX-License-Identifier: MIT OR Apache-2.0
//! Downstream service failures.

use super::{debug_key, internal_record};
use crate::failure::{Failure, FailureLayer, UpstreamCondition, UpstreamFailure};
use crate::pattern::FailurePattern;
use crate::translator::Translator;
use faultline_taxonomy::{ErrorCode, ErrorRecord};

pub(super) fn translators() -> Vec<Translator> {
    vec![Translator::new(
        "upstream.service",
        FailurePattern::Layer(FailureLayer::Upstream),
        |f: &Failure| match f {
            Failure::Upstream(u) => map_upstream(u),
            other => internal_record(other),
        },
    )]
}

fn map_upstream(u: &UpstreamFailure) -> ErrorRecord {
    let (code, retryable) = match u.condition {
        UpstreamCondition::Timeout => (ErrorCode::UpstreamTimeout, true),
        UpstreamCondition::Unavailable => (ErrorCode::UpstreamUnavailable, true),
        UpstreamCondition::BadResponse => (ErrorCode::UpstreamBadResponse, false),
    };
    let mut record = ErrorRecord::new(code, format!("{}: {}", code.title(), u.service))
        .with_retryable(retryable)
        .with_detail("service", &u.service)
        .with_detail(debug_key("upstream_message"), &u.message);
    if let Some(status) = u.status {
        record = record.with_detail("upstream_status", status);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_retryable() {
        let rec = map_upstream(&UpstreamFailure::new(
            "billing",
            UpstreamCondition::Timeout,
            "deadline exceeded after 5s",
        ));
        assert_eq!(rec.code(), ErrorCode::UpstreamTimeout);
        assert_eq!(rec.status(), 502);
        assert!(rec.is_retryable());
        assert_eq!(rec.message(), "Upstream timeout: billing");
        assert_eq!(rec.detail("service").unwrap(), "billing");
    }

    #[test]
    fn bad_response_not_retryable() {
        let rec = map_upstream(
            &UpstreamFailure::new("search", UpstreamCondition::BadResponse, "invalid json").with_status(200),
        );
        assert!(!rec.is_retryable());
        assert_eq!(rec.detail("upstream_status").unwrap(), 200);
        assert_eq!(rec.detail("debug_upstream_message").unwrap(), "invalid json");
    }
}
