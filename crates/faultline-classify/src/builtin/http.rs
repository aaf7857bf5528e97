// SPDX-License-Identifier: MIT OR Apache-2.0
//! Failures the web framework produced on its own (unknown route, wrong
//! method, unreadable body).

use super::{debug_key, internal_record};
use crate::failure::{Failure, FailureLayer, HttpFailure};
use crate::pattern::FailurePattern;
use crate::translator::Translator;
use faultline_taxonomy::{ErrorCode, ErrorRecord, GENERIC_INTERNAL_MESSAGE};

pub(super) fn translators() -> Vec<Translator> {
    vec![Translator::new(
        "http.status",
        FailurePattern::Layer(FailureLayer::Http),
        |f: &Failure| match f {
            Failure::Http(h) => map_http(h),
            other => internal_record(other),
        },
    )]
}

fn map_http(h: &HttpFailure) -> ErrorRecord {
    if let Some(rejection) = &h.rejection {
        let code = if h.status == 415 {
            ErrorCode::BadRequestUnsupportedMediaType
        } else {
            ErrorCode::BadRequestMalformedBody
        };
        return ErrorRecord::new(code, h.message.as_str()).with_detail("rejection", rejection);
    }
    let code = match h.status {
        400 => ErrorCode::BadRequest,
        401 => ErrorCode::AuthRequired,
        403 => ErrorCode::PermissionDenied,
        404 => ErrorCode::NotFoundRoute,
        405 => ErrorCode::BadRequestMethodNotAllowed,
        406 | 415 => ErrorCode::BadRequestUnsupportedMediaType,
        409 => ErrorCode::Conflict,
        422 => ErrorCode::Validation,
        429 => {
            return ErrorRecord::new(ErrorCode::BadRequest, "Too many requests")
                .with_retryable(true)
                .with_detail("status", h.status);
        }
        501 => ErrorCode::NotImplemented,
        502 => ErrorCode::UpstreamBadResponse,
        503 => ErrorCode::UpstreamUnavailable,
        504 => ErrorCode::UpstreamTimeout,
        400..=499 => ErrorCode::BadRequest,
        _ => {
            return ErrorRecord::new(ErrorCode::Internal, GENERIC_INTERNAL_MESSAGE)
                .with_retryable(false)
                .with_detail(debug_key("status"), h.status)
                .with_detail(debug_key("framework_message"), &h.message);
        }
    };
    let message = if h.message.trim().is_empty() {
        code.title().to_string()
    } else {
        h.message.clone()
    };
    let record = ErrorRecord::new(code, message);
    if h.status == code.status() {
        record
    } else {
        record.with_detail("status", h.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_statuses() {
        let cases = [
            (400, ErrorCode::BadRequest),
            (401, ErrorCode::AuthRequired),
            (403, ErrorCode::PermissionDenied),
            (404, ErrorCode::NotFoundRoute),
            (405, ErrorCode::BadRequestMethodNotAllowed),
            (415, ErrorCode::BadRequestUnsupportedMediaType),
            (418, ErrorCode::BadRequest),
            (501, ErrorCode::NotImplemented),
            (503, ErrorCode::UpstreamUnavailable),
            (500, ErrorCode::Internal),
        ];
        for (status, code) in cases {
            assert_eq!(map_http(&HttpFailure::new(status, "x")).code(), code, "{status}");
        }
    }

    #[test]
    fn body_rejection_is_malformed_body() {
        let h = HttpFailure::new(400, "expected value at line 1 column 1").with_rejection("JsonSyntaxError");
        let rec = map_http(&h);
        assert_eq!(rec.code(), ErrorCode::BadRequestMalformedBody);
        assert_eq!(rec.detail("rejection").unwrap(), "JsonSyntaxError");
        let h = HttpFailure::new(415, "missing content type").with_rejection("MissingJsonContentType");
        assert_eq!(map_http(&h).code(), ErrorCode::BadRequestUnsupportedMediaType);
    }

    #[test]
    fn server_errors_redacted() {
        let rec = map_http(&HttpFailure::new(500, "handler exploded: secret=abc"));
        assert_eq!(rec.message(), GENERIC_INTERNAL_MESSAGE);
        assert_eq!(
            rec.detail("debug_framework_message").unwrap(),
            "handler exploded: secret=abc"
        );
    }

    #[test]
    fn too_many_requests_is_retryable() {
        let rec = map_http(&HttpFailure::new(429, "slow down"));
        assert!(rec.is_retryable());
        assert_eq!(rec.status(), 400);
    }

    #[test]
    fn remapped_status_kept_in_details() {
        let rec = map_http(&HttpFailure::new(405, "Method Not Allowed"));
        assert_eq!(rec.status(), 400);
        assert_eq!(rec.detail("status").unwrap(), 405);
        assert!(map_http(&HttpFailure::new(404, "gone")).detail("status").is_none());
    }

    #[test]
    fn empty_message_uses_title() {
        let rec = map_http(&HttpFailure::new(404, ""));
        assert_eq!(rec.message(), "Unknown route");
    }
}
