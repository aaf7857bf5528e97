// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end checks of the built-in translator set.

use faultline_classify::builtin::DEBUG_FAILURE;
use faultline_classify::{
    AuthFailure, Capabilities, Classifier, Failure, FailurePattern, PersistenceFailure,
    RegistryBuilder, RegistryError, ResolverFailure, Translator, ValidationFailure,
    bearer_token,
};
use faultline_taxonomy::{ErrorCode, ErrorKind, ErrorRecord, PathSegment};
use serde_json::json;

fn classifier(caps: Capabilities) -> Classifier {
    Classifier::new(RegistryBuilder::with_builtins(&caps).unwrap().freeze())
}

#[test]
fn unique_violation_on_insert() {
    let f: Failure = PersistenceFailure::database(
        Some("23505"),
        "duplicate key value violates unique constraint \"users_email_key\"",
    )
    .with_constraint("users_email_key")
    .with_detail("Key (email)=(ada@example.com) already exists.")
    .into();
    let rec = classifier(Capabilities::all()).classify(&f);
    assert_eq!(rec.kind(), ErrorKind::Conflict);
    assert_eq!(rec.status(), 409);
    assert_eq!(rec.code().as_str(), "conflict.unique_violation");
}

#[test]
fn string_for_integer_field() {
    let schema = json!({
        "type": "object",
        "properties": {"age": {"type": "integer"}}
    });
    let validator = jsonschema::validator_for(&schema).unwrap();
    let failure = ValidationFailure::check(&validator, &json!({"age": "forty"})).unwrap_err();
    let rec = classifier(Capabilities::all()).classify(&failure.into());
    assert_eq!(rec.kind(), ErrorKind::Validation);
    assert_eq!(rec.status(), 422);
    assert_eq!(rec.field_path(), &[PathSegment::from("age")]);
}

#[test]
fn expired_token() {
    let rec = classifier(Capabilities::all())
        .classify(&AuthFailure::Expired { expired_at: None }.into());
    assert_eq!(rec.kind(), ErrorKind::Authentication);
    assert_eq!(rec.code().sub_discriminator(), Some("token_expired"));
    assert_eq!(rec.status(), 401);
    assert_eq!(rec.code().as_str(), "auth.token_expired");
}

#[test]
fn missing_bearer_header_requires_auth() {
    let failure = bearer_token(None).unwrap_err();
    let rec = classifier(Capabilities::all()).classify(&failure.into());
    assert_eq!(rec.code(), ErrorCode::AuthRequired);
    let failure = bearer_token(Some("Bearer not-a-jwt")).unwrap_err();
    let rec = classifier(Capabilities::all()).classify(&failure.into());
    assert_eq!(rec.code(), ErrorCode::AuthTokenMalformed);
}

#[test]
fn graph_variable_error_maps_to_validation() {
    let f = ResolverFailure::from_engine_message(
        "Variable '$input' got invalid value \"x\"; at 'input.tags[2]'; Expected type 'String'. Too long",
    );
    let rec = classifier(Capabilities::all()).classify(&f.into());
    assert_eq!(rec.code(), ErrorCode::ValidationVariableInvalid);
    assert_eq!(
        rec.field_path(),
        &[
            PathSegment::from("input"),
            PathSegment::from("tags"),
            PathSegment::Index(2)
        ]
    );
}

#[test]
fn disabled_capability_falls_back_to_internal() {
    let caps = Capabilities {
        persistence: false,
        ..Capabilities::all()
    };
    let rec = classifier(caps).classify(&PersistenceFailure::no_result("user").into());
    assert_eq!(rec.code(), ErrorCode::Internal);
    assert_eq!(rec.detail(DEBUG_FAILURE).unwrap(), "no user found");
}

#[test]
fn anyhow_context_chain_is_classified_by_shape() {
    let err = anyhow::Error::new(AuthFailure::SignatureInvalid).context("verifying session");
    let rec = classifier(Capabilities::all()).classify(&Failure::from(err));
    assert_eq!(rec.code(), ErrorCode::AuthTokenSignatureInvalid);
}

#[test]
fn custom_translator_registered_first_overrides_builtin() {
    let mut b = RegistryBuilder::new();
    b.register(Translator::new(
        "billing.card_declined",
        FailurePattern::AllOf(vec![
            FailurePattern::shape("persistence.check_violation"),
            FailurePattern::Constraint("payments_card_*".into()),
        ]),
        |_: &Failure| {
            ErrorRecord::new(ErrorCode::BadRequestInvalidArgument, "The card was declined")
                .with_field_path(["card"])
        },
    ))
    .unwrap()
    .register_builtins(&Capabilities::all())
    .unwrap();
    let c = Classifier::new(b.freeze());
    let declined: Failure = PersistenceFailure::database(Some("23514"), "check")
        .with_constraint("payments_card_valid")
        .into();
    assert_eq!(c.classify(&declined).code(), ErrorCode::BadRequestInvalidArgument);
    let other: Failure = PersistenceFailure::database(Some("23514"), "check")
        .with_constraint("orders_qty_positive")
        .into();
    assert_eq!(c.classify(&other).code(), ErrorCode::ConflictCheckViolation);
}

#[test]
fn registering_builtins_twice_is_fatal() {
    let mut b = RegistryBuilder::with_builtins(&Capabilities::all()).unwrap();
    let err = b.register_builtins(&Capabilities::all()).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateName(_)));
}
