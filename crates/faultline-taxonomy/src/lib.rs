// SPDX-License-Identifier: MIT OR Apache-2.0
//! Closed error taxonomy for the faultline API boundary.
//!
//! Every failure that crosses the boundary is reduced to an [`ErrorRecord`]
//! whose [`ErrorCode`] belongs to exactly one [`ErrorKind`]. Both the
//! kind → HTTP status mapping ([`status_for`]) and the kind + sub-discriminator
//! → code mapping ([`code_for`]) are exhaustive matches, so adding a kind or a
//! code without its mappings fails to compile.
//!
//! Codes are globally flat and namespaced by a dot-separated prefix
//! (`conflict.unique_violation`, `auth.token_expired`). A code string never
//! changes meaning once published; new codes are added, never repurposed.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod record;

pub use catalog::{CatalogEntry, ErrorCatalog};
pub use record::{
    DEBUG_DETAIL_PREFIX, ErrorRecord, ErrorRecordDto, GENERIC_INTERNAL_MESSAGE, MAX_CAUSE_DEPTH,
    PathSegment, display_path,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Canonical error category exposed at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input failed a schema or field constraint.
    Validation,
    /// Request is malformed in a way that is not tied to a single field.
    BadRequest,
    /// Caller is not authenticated or presented an unusable credential.
    #[serde(rename = "auth")]
    Authentication,
    /// Caller is authenticated but not allowed to perform the operation.
    PermissionDenied,
    /// Addressed entity does not exist.
    NotFound,
    /// Operation conflicts with the current state of the data.
    Conflict,
    /// A downstream collaborator failed.
    Upstream,
    /// Catch-all for failures nothing else claimed.
    Internal,
    /// Operation is intentionally not implemented.
    NotImplemented,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::Validation,
        ErrorKind::BadRequest,
        ErrorKind::Authentication,
        ErrorKind::PermissionDenied,
        ErrorKind::NotFound,
        ErrorKind::Conflict,
        ErrorKind::Upstream,
        ErrorKind::Internal,
        ErrorKind::NotImplemented,
    ];

    /// Stable string form, identical to the prefix of every code of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::BadRequest => "bad_request",
            Self::Authentication => "auth",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Upstream => "upstream",
            Self::Internal => "internal",
            Self::NotImplemented => "not_implemented",
        }
    }

    /// The code used when no sub-discriminator applies.
    pub const fn base_code(self) -> ErrorCode {
        match self {
            Self::Validation => ErrorCode::Validation,
            Self::BadRequest => ErrorCode::BadRequest,
            Self::Authentication => ErrorCode::Auth,
            Self::PermissionDenied => ErrorCode::PermissionDenied,
            Self::NotFound => ErrorCode::NotFound,
            Self::Conflict => ErrorCode::Conflict,
            Self::Upstream => ErrorCode::Upstream,
            Self::Internal => ErrorCode::Internal,
            Self::NotImplemented => ErrorCode::NotImplemented,
        }
    }

    /// HTTP status for this kind. Shorthand for [`status_for`].
    pub const fn status(self) -> u16 {
        status_for(self)
    }

    /// Whether a failure of this kind is worth retrying unless a translator
    /// says otherwise.
    pub const fn retryable_by_default(self) -> bool {
        matches!(self, Self::Upstream)
    }

    /// Internal failures must never expose their raw text to consumers.
    pub const fn is_internal(self) -> bool {
        matches!(self, Self::Internal)
    }

    /// Position of this kind in [`ErrorKind::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP status code for `kind`. Total over [`ErrorKind`].
pub const fn status_for(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::Validation => 422,
        ErrorKind::BadRequest => 400,
        ErrorKind::Authentication => 401,
        ErrorKind::PermissionDenied => 403,
        ErrorKind::NotFound => 404,
        ErrorKind::Conflict => 409,
        ErrorKind::Upstream => 502,
        ErrorKind::Internal => 500,
        ErrorKind::NotImplemented => 501,
    }
}

/// Code for `kind` refined by an optional sub-discriminator.
///
/// An unknown sub-discriminator, or one that belongs to a different kind,
/// yields the kind's base code.
///
/// ```
/// use faultline_taxonomy::{code_for, ErrorCode, ErrorKind};
///
/// assert_eq!(
///     code_for(ErrorKind::Authentication, Some("token_expired")),
///     ErrorCode::AuthTokenExpired
/// );
/// assert_eq!(code_for(ErrorKind::Conflict, Some("nope")), ErrorCode::Conflict);
/// ```
pub fn code_for(kind: ErrorKind, sub_discriminator: Option<&str>) -> ErrorCode {
    sub_discriminator
        .and_then(|sub| {
            ErrorCode::ALL
                .iter()
                .find(|c| c.kind() == kind && c.sub_discriminator() == Some(sub))
                .copied()
        })
        .unwrap_or(kind.base_code())
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Stable machine-readable error code.
///
/// Serialises to its dotted string form (see [`ErrorCode::as_str`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorCode {
    // ── Validation ─────────────────────────────────────────────────────
    /// Generic field validation failure.
    Validation,
    /// A required column or field was null.
    ValidationNotNullViolation,
    /// A graph-query variable failed input coercion.
    ValidationVariableInvalid,

    // ── Bad request ────────────────────────────────────────────────────
    /// Generic malformed request.
    BadRequest,
    /// An argument value is not acceptable.
    BadRequestInvalidArgument,
    /// A graph query failed to parse.
    BadRequestQuerySyntax,
    /// The request body could not be decoded.
    BadRequestMalformedBody,
    /// The HTTP method is not supported on this route.
    BadRequestMethodNotAllowed,
    /// The request media type is not supported.
    BadRequestUnsupportedMediaType,

    // ── Authentication ─────────────────────────────────────────────────
    /// Generic authentication failure.
    Auth,
    /// No credential was presented.
    AuthRequired,
    /// The token has expired; the client should re-authenticate.
    AuthTokenExpired,
    /// The token is structurally invalid; usually a client bug.
    AuthTokenMalformed,
    /// The token signature did not verify.
    AuthTokenSignatureInvalid,
    /// The token claims (audience, issuer, not-before) were rejected.
    AuthTokenClaimsInvalid,
    /// Username/password or API key did not match.
    AuthCredentialsInvalid,

    // ── Permission ─────────────────────────────────────────────────────
    /// Generic permission denial.
    PermissionDenied,
    /// The caller lacks a required role.
    PermissionDeniedRoleRequired,
    /// The caller lacks a required permission.
    PermissionDeniedPermissionRequired,

    // ── Not found ──────────────────────────────────────────────────────
    /// The addressed entity does not exist.
    NotFound,
    /// A single entity was expected but several matched.
    NotFoundMultipleResults,
    /// No route matches the request path.
    NotFoundRoute,

    // ── Conflict ───────────────────────────────────────────────────────
    /// Generic conflict with current state.
    Conflict,
    /// A unique constraint was violated.
    ConflictUniqueViolation,
    /// A foreign-key constraint was violated.
    ConflictForeignKeyViolation,
    /// A check constraint was violated.
    ConflictCheckViolation,
    /// An exclusion constraint was violated.
    ConflictExclusionViolation,
    /// A concurrent transaction won; retrying may succeed.
    ConflictSerializationFailure,

    // ── Upstream ───────────────────────────────────────────────────────
    /// Generic downstream failure.
    Upstream,
    /// A downstream call timed out.
    UpstreamTimeout,
    /// A downstream service could not be reached.
    UpstreamUnavailable,
    /// A downstream service answered with an unusable response.
    UpstreamBadResponse,

    // ── Internal / not implemented ─────────────────────────────────────
    /// Catch-all internal failure.
    Internal,
    /// The operation is not implemented.
    NotImplemented,
}

impl ErrorCode {
    /// Every code, grouped by kind.
    pub const ALL: [ErrorCode; 34] = [
        ErrorCode::Validation,
        ErrorCode::ValidationNotNullViolation,
        ErrorCode::ValidationVariableInvalid,
        ErrorCode::BadRequest,
        ErrorCode::BadRequestInvalidArgument,
        ErrorCode::BadRequestQuerySyntax,
        ErrorCode::BadRequestMalformedBody,
        ErrorCode::BadRequestMethodNotAllowed,
        ErrorCode::BadRequestUnsupportedMediaType,
        ErrorCode::Auth,
        ErrorCode::AuthRequired,
        ErrorCode::AuthTokenExpired,
        ErrorCode::AuthTokenMalformed,
        ErrorCode::AuthTokenSignatureInvalid,
        ErrorCode::AuthTokenClaimsInvalid,
        ErrorCode::AuthCredentialsInvalid,
        ErrorCode::PermissionDenied,
        ErrorCode::PermissionDeniedRoleRequired,
        ErrorCode::PermissionDeniedPermissionRequired,
        ErrorCode::NotFound,
        ErrorCode::NotFoundMultipleResults,
        ErrorCode::NotFoundRoute,
        ErrorCode::Conflict,
        ErrorCode::ConflictUniqueViolation,
        ErrorCode::ConflictForeignKeyViolation,
        ErrorCode::ConflictCheckViolation,
        ErrorCode::ConflictExclusionViolation,
        ErrorCode::ConflictSerializationFailure,
        ErrorCode::Upstream,
        ErrorCode::UpstreamTimeout,
        ErrorCode::UpstreamUnavailable,
        ErrorCode::UpstreamBadResponse,
        ErrorCode::Internal,
        ErrorCode::NotImplemented,
    ];

    /// The [`ErrorKind`] this code belongs to.
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::Validation | Self::ValidationNotNullViolation | Self::ValidationVariableInvalid => {
                ErrorKind::Validation
            }

            Self::BadRequest
            | Self::BadRequestInvalidArgument
            | Self::BadRequestQuerySyntax
            | Self::BadRequestMalformedBody
            | Self::BadRequestMethodNotAllowed
            | Self::BadRequestUnsupportedMediaType => ErrorKind::BadRequest,

            Self::Auth
            | Self::AuthRequired
            | Self::AuthTokenExpired
            | Self::AuthTokenMalformed
            | Self::AuthTokenSignatureInvalid
            | Self::AuthTokenClaimsInvalid
            | Self::AuthCredentialsInvalid => ErrorKind::Authentication,

            Self::PermissionDenied
            | Self::PermissionDeniedRoleRequired
            | Self::PermissionDeniedPermissionRequired => ErrorKind::PermissionDenied,

            Self::NotFound | Self::NotFoundMultipleResults | Self::NotFoundRoute => {
                ErrorKind::NotFound
            }

            Self::Conflict
            | Self::ConflictUniqueViolation
            | Self::ConflictForeignKeyViolation
            | Self::ConflictCheckViolation
            | Self::ConflictExclusionViolation
            | Self::ConflictSerializationFailure => ErrorKind::Conflict,

            Self::Upstream
            | Self::UpstreamTimeout
            | Self::UpstreamUnavailable
            | Self::UpstreamBadResponse => ErrorKind::Upstream,

            Self::Internal => ErrorKind::Internal,
            Self::NotImplemented => ErrorKind::NotImplemented,
        }
    }

    /// The part after the kind prefix, or `None` for a base code.
    pub const fn sub_discriminator(self) -> Option<&'static str> {
        match self {
            Self::ValidationNotNullViolation => Some("not_null_violation"),
            Self::ValidationVariableInvalid => Some("variable_invalid"),
            Self::BadRequestInvalidArgument => Some("invalid_argument"),
            Self::BadRequestQuerySyntax => Some("query_syntax"),
            Self::BadRequestMalformedBody => Some("malformed_body"),
            Self::BadRequestMethodNotAllowed => Some("method_not_allowed"),
            Self::BadRequestUnsupportedMediaType => Some("unsupported_media_type"),
            Self::AuthRequired => Some("required"),
            Self::AuthTokenExpired => Some("token_expired"),
            Self::AuthTokenMalformed => Some("token_malformed"),
            Self::AuthTokenSignatureInvalid => Some("token_signature_invalid"),
            Self::AuthTokenClaimsInvalid => Some("token_claims_invalid"),
            Self::AuthCredentialsInvalid => Some("credentials_invalid"),
            Self::PermissionDeniedRoleRequired => Some("role_required"),
            Self::PermissionDeniedPermissionRequired => Some("permission_required"),
            Self::NotFoundMultipleResults => Some("multiple_results"),
            Self::NotFoundRoute => Some("route"),
            Self::ConflictUniqueViolation => Some("unique_violation"),
            Self::ConflictForeignKeyViolation => Some("foreign_key_violation"),
            Self::ConflictCheckViolation => Some("check_violation"),
            Self::ConflictExclusionViolation => Some("exclusion_violation"),
            Self::ConflictSerializationFailure => Some("serialization_failure"),
            Self::UpstreamTimeout => Some("timeout"),
            Self::UpstreamUnavailable => Some("unavailable"),
            Self::UpstreamBadResponse => Some("bad_response"),
            Self::Validation
            | Self::BadRequest
            | Self::Auth
            | Self::PermissionDenied
            | Self::NotFound
            | Self::Conflict
            | Self::Upstream
            | Self::Internal
            | Self::NotImplemented => None,
        }
    }

    /// Stable dotted string form (e.g. `"conflict.unique_violation"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::ValidationNotNullViolation => "validation.not_null_violation",
            Self::ValidationVariableInvalid => "validation.variable_invalid",
            Self::BadRequest => "bad_request",
            Self::BadRequestInvalidArgument => "bad_request.invalid_argument",
            Self::BadRequestQuerySyntax => "bad_request.query_syntax",
            Self::BadRequestMalformedBody => "bad_request.malformed_body",
            Self::BadRequestMethodNotAllowed => "bad_request.method_not_allowed",
            Self::BadRequestUnsupportedMediaType => "bad_request.unsupported_media_type",
            Self::Auth => "auth",
            Self::AuthRequired => "auth.required",
            Self::AuthTokenExpired => "auth.token_expired",
            Self::AuthTokenMalformed => "auth.token_malformed",
            Self::AuthTokenSignatureInvalid => "auth.token_signature_invalid",
            Self::AuthTokenClaimsInvalid => "auth.token_claims_invalid",
            Self::AuthCredentialsInvalid => "auth.credentials_invalid",
            Self::PermissionDenied => "permission_denied",
            Self::PermissionDeniedRoleRequired => "permission_denied.role_required",
            Self::PermissionDeniedPermissionRequired => "permission_denied.permission_required",
            Self::NotFound => "not_found",
            Self::NotFoundMultipleResults => "not_found.multiple_results",
            Self::NotFoundRoute => "not_found.route",
            Self::Conflict => "conflict",
            Self::ConflictUniqueViolation => "conflict.unique_violation",
            Self::ConflictForeignKeyViolation => "conflict.foreign_key_violation",
            Self::ConflictCheckViolation => "conflict.check_violation",
            Self::ConflictExclusionViolation => "conflict.exclusion_violation",
            Self::ConflictSerializationFailure => "conflict.serialization_failure",
            Self::Upstream => "upstream",
            Self::UpstreamTimeout => "upstream.timeout",
            Self::UpstreamUnavailable => "upstream.unavailable",
            Self::UpstreamBadResponse => "upstream.bad_response",
            Self::Internal => "internal",
            Self::NotImplemented => "not_implemented",
        }
    }

    /// HTTP status of this code's kind.
    pub const fn status(self) -> u16 {
        status_for(self.kind())
    }

    /// Short human title used in the catalog and as a default message.
    pub const fn title(self) -> &'static str {
        match self {
            Self::Validation => "Invalid input",
            Self::ValidationNotNullViolation => "Required value missing",
            Self::ValidationVariableInvalid => "Invalid query variable",
            Self::BadRequest => "Bad request",
            Self::BadRequestInvalidArgument => "Invalid argument",
            Self::BadRequestQuerySyntax => "Query syntax error",
            Self::BadRequestMalformedBody => "Malformed request body",
            Self::BadRequestMethodNotAllowed => "Method not allowed",
            Self::BadRequestUnsupportedMediaType => "Unsupported media type",
            Self::Auth => "Authentication failed",
            Self::AuthRequired => "Authentication required",
            Self::AuthTokenExpired => "Token expired",
            Self::AuthTokenMalformed => "Malformed token",
            Self::AuthTokenSignatureInvalid => "Invalid token signature",
            Self::AuthTokenClaimsInvalid => "Invalid token claims",
            Self::AuthCredentialsInvalid => "Invalid credentials",
            Self::PermissionDenied => "Access denied",
            Self::PermissionDeniedRoleRequired => "Role required",
            Self::PermissionDeniedPermissionRequired => "Permission required",
            Self::NotFound => "Not found",
            Self::NotFoundMultipleResults => "Ambiguous lookup",
            Self::NotFoundRoute => "Unknown route",
            Self::Conflict => "Conflict",
            Self::ConflictUniqueViolation => "Duplicate entry",
            Self::ConflictForeignKeyViolation => "Referenced entity conflict",
            Self::ConflictCheckViolation => "Constraint check failed",
            Self::ConflictExclusionViolation => "Overlapping entry",
            Self::ConflictSerializationFailure => "Concurrent modification",
            Self::Upstream => "Upstream failure",
            Self::UpstreamTimeout => "Upstream timeout",
            Self::UpstreamUnavailable => "Upstream unavailable",
            Self::UpstreamBadResponse => "Bad upstream response",
            Self::Internal => "Internal server error",
            Self::NotImplemented => "Not implemented",
        }
    }

    /// What the caller can do about it.
    pub const fn fixit(self) -> &'static str {
        match self {
            Self::Validation | Self::ValidationNotNullViolation => {
                "Correct the fields listed in field_path and resend"
            }
            Self::ValidationVariableInvalid => "Fix the variable value to match its declared type",
            Self::BadRequest | Self::BadRequestMalformedBody => {
                "Check the request format against the API documentation"
            }
            Self::BadRequestInvalidArgument => "Check the argument values",
            Self::BadRequestQuerySyntax => "Fix the query syntax",
            Self::BadRequestMethodNotAllowed => "Use a method this route supports",
            Self::BadRequestUnsupportedMediaType => "Send the body as application/json",
            Self::Auth | Self::AuthRequired => "Sign in and resend with a valid credential",
            Self::AuthTokenExpired => "Refresh the token or sign in again",
            Self::AuthTokenMalformed => "Send a well-formed bearer token; this is a client bug",
            Self::AuthTokenSignatureInvalid | Self::AuthTokenClaimsInvalid => {
                "Obtain a new token from the issuer"
            }
            Self::AuthCredentialsInvalid => "Check the username and password",
            Self::PermissionDenied => "Ask an administrator for access",
            Self::PermissionDeniedRoleRequired => "Ask an administrator to grant the role",
            Self::PermissionDeniedPermissionRequired => {
                "Ask an administrator to grant the permission"
            }
            Self::NotFound => "Check the identifier; the entity may have been deleted",
            Self::NotFoundMultipleResults => "Narrow the lookup to a unique key",
            Self::NotFoundRoute => "Check the request path",
            Self::Conflict => "Reload the entity and retry the change",
            Self::ConflictUniqueViolation => "Choose a different value for the listed columns",
            Self::ConflictForeignKeyViolation => "Create or keep the referenced entity first",
            Self::ConflictCheckViolation => "Change the values to satisfy the constraint",
            Self::ConflictExclusionViolation => "Choose a value that does not overlap",
            Self::ConflictSerializationFailure => "Retry the request",
            Self::Upstream | Self::UpstreamBadResponse => "Retry later",
            Self::UpstreamTimeout | Self::UpstreamUnavailable => "Retry with backoff",
            Self::Internal => "Retry later and report the problem if it persists",
            Self::NotImplemented => "This operation is not available yet",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a known [`ErrorCode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error code: {0}")]
pub struct UnknownCode(pub String);

impl FromStr for ErrorCode {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownCode(s.to_string()))
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_codes_unique() {
        let set: HashSet<&str> = ErrorCode::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(set.len(), ErrorCode::ALL.len());
    }

    #[test]
    fn every_kind_has_base_code_in_all() {
        for kind in ErrorKind::ALL {
            let base = kind.base_code();
            assert!(ErrorCode::ALL.contains(&base));
            assert_eq!(base.kind(), kind);
            assert_eq!(base.sub_discriminator(), None);
            assert_eq!(base.as_str(), kind.as_str());
        }
    }

    #[test]
    fn code_strings_are_kind_prefixed() {
        for code in ErrorCode::ALL {
            let s = code.as_str();
            match code.sub_discriminator() {
                Some(sub) => assert_eq!(s, format!("{}.{sub}", code.kind().as_str())),
                None => assert_eq!(s, code.kind().as_str()),
            }
        }
    }

    #[test]
    fn kind_index_matches_all_order() {
        for (i, kind) in ErrorKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn statuses_fixed() {
        assert_eq!(status_for(ErrorKind::Validation), 422);
        assert_eq!(status_for(ErrorKind::BadRequest), 400);
        assert_eq!(status_for(ErrorKind::Authentication), 401);
        assert_eq!(status_for(ErrorKind::PermissionDenied), 403);
        assert_eq!(status_for(ErrorKind::NotFound), 404);
        assert_eq!(status_for(ErrorKind::Conflict), 409);
        assert_eq!(status_for(ErrorKind::Upstream), 502);
        assert_eq!(status_for(ErrorKind::Internal), 500);
        assert_eq!(status_for(ErrorKind::NotImplemented), 501);
    }

    #[test]
    fn code_for_known_sub() {
        assert_eq!(
            code_for(ErrorKind::Conflict, Some("unique_violation")),
            ErrorCode::ConflictUniqueViolation
        );
        assert_eq!(
            code_for(ErrorKind::Authentication, Some("token_malformed")),
            ErrorCode::AuthTokenMalformed
        );
    }

    #[test]
    fn code_for_sub_of_other_kind_falls_back() {
        assert_eq!(
            code_for(ErrorKind::NotFound, Some("unique_violation")),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn code_for_none_is_base() {
        for kind in ErrorKind::ALL {
            assert_eq!(code_for(kind, None), kind.base_code());
        }
    }

    #[test]
    fn from_str_roundtrips_every_code() {
        for code in ErrorCode::ALL {
            assert_eq!(code.as_str().parse::<ErrorCode>().unwrap(), code);
        }
        assert!("conflict.nope".parse::<ErrorCode>().is_err());
    }

    #[test]
    fn serde_uses_dotted_string() {
        let json = serde_json::to_string(&ErrorCode::AuthTokenExpired).unwrap();
        assert_eq!(json, r#""auth.token_expired""#);
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::AuthTokenExpired);
    }

    #[test]
    fn kind_serde_matches_as_str() {
        for kind in ErrorKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn only_upstream_retryable_by_default() {
        for kind in ErrorKind::ALL {
            assert_eq!(kind.retryable_by_default(), kind == ErrorKind::Upstream);
        }
    }

    #[test]
    fn titles_and_fixits_non_empty() {
        for code in ErrorCode::ALL {
            assert!(!code.title().is_empty(), "{code}");
            assert!(!code.fixit().is_empty(), "{code}");
        }
    }
}
