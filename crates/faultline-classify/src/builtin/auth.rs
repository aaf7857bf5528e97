// SPDX-License-Identifier: MIT OR Apache-2.0
//! Authentication and access-control failures.

use super::internal_record;
use crate::failure::{AuthFailure, Failure};
use crate::pattern::FailurePattern;
use crate::translator::Translator;
use faultline_taxonomy::{ErrorCode, ErrorRecord};

pub(super) fn translators() -> Vec<Translator> {
    vec![
        Translator::new(
            "auth.token",
            FailurePattern::shape("auth.token_*"),
            with_auth(token),
        ),
        Translator::new(
            "auth.credentials",
            FailurePattern::AnyOf(vec![
                FailurePattern::shape("auth.missing"),
                FailurePattern::shape("auth.credentials_invalid"),
            ]),
            with_auth(credentials),
        ),
        Translator::new(
            "auth.access",
            FailurePattern::AnyOf(vec![
                FailurePattern::shape("auth.role_required"),
                FailurePattern::shape("auth.permission_required"),
                FailurePattern::shape("auth.forbidden"),
            ]),
            with_auth(access),
        ),
    ]
}

fn with_auth(map: fn(&AuthFailure) -> ErrorRecord) -> impl Fn(&Failure) -> ErrorRecord + Send + Sync {
    move |f: &Failure| match f {
        Failure::Auth(a) => map(a),
        other => internal_record(other),
    }
}

fn token(a: &AuthFailure) -> ErrorRecord {
    match a {
        AuthFailure::Expired { expired_at } => {
            let record = ErrorRecord::new(ErrorCode::AuthTokenExpired, "The token has expired");
            match expired_at {
                Some(at) => record.with_detail("expired_at", at),
                None => record,
            }
        }
        AuthFailure::Malformed { .. } => {
            ErrorRecord::new(ErrorCode::AuthTokenMalformed, "The token is malformed")
        }
        AuthFailure::SignatureInvalid => ErrorRecord::new(
            ErrorCode::AuthTokenSignatureInvalid,
            "The token signature is invalid",
        ),
        AuthFailure::ClaimsInvalid { claim } => {
            ErrorRecord::new(ErrorCode::AuthTokenClaimsInvalid, "The token claims were rejected")
                .with_detail("claim", claim)
        }
        other => ErrorRecord::new(ErrorCode::Auth, other.to_string()),
    }
}

fn credentials(a: &AuthFailure) -> ErrorRecord {
    match a {
        AuthFailure::Missing => ErrorRecord::from_code(ErrorCode::AuthRequired),
        AuthFailure::CredentialsInvalid => ErrorRecord::from_code(ErrorCode::AuthCredentialsInvalid),
        other => ErrorRecord::new(ErrorCode::Auth, other.to_string()),
    }
}

fn access(a: &AuthFailure) -> ErrorRecord {
    match a {
        AuthFailure::RoleRequired { roles } => ErrorRecord::new(
            ErrorCode::PermissionDeniedRoleRequired,
            "A required role is missing",
        )
        .with_detail("roles", roles),
        AuthFailure::PermissionRequired { permissions } => ErrorRecord::new(
            ErrorCode::PermissionDeniedPermissionRequired,
            "A required permission is missing",
        )
        .with_detail("permissions", permissions),
        AuthFailure::Forbidden { reason } => ErrorRecord::new(
            ErrorCode::PermissionDenied,
            reason.as_deref().unwrap_or("Access denied"),
        ),
        other => ErrorRecord::new(ErrorCode::PermissionDenied, other.to_string()),
    }
}
