// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property tests for classification totality and translator precedence.

use faultline_classify::{
    AuthFailure, Capabilities, Classifier, Failure, FailurePattern, HttpFailure,
    PersistenceFailure, RegistryBuilder, ResolverFailure, Translator, UpstreamCondition,
    UpstreamFailure,
};
use faultline_taxonomy::{ErrorCode, ErrorRecord, MAX_CAUSE_DEPTH, code_for, status_for};
use proptest::prelude::*;

fn builtin_classifier() -> Classifier {
    Classifier::new(
        RegistryBuilder::with_builtins(&Capabilities::all())
            .unwrap()
            .freeze(),
    )
}

fn arb_sqlstate() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("23505".to_string()),
        Just("23503".to_string()),
        Just("23514".to_string()),
        Just("23502".to_string()),
        Just("23P01".to_string()),
        Just("40001".to_string()),
        Just("08006".to_string()),
        Just("57014".to_string()),
        "[0-9A-Z]{5}",
    ]
}

fn arb_failure() -> impl Strategy<Value = Failure> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(|e| Failure::from(PersistenceFailure::no_result(e))),
        (arb_sqlstate(), ".{0,40}").prop_map(|(s, m)| {
            Failure::from(PersistenceFailure::database(Some(s.as_str()), m))
        }),
        ".{0,40}".prop_map(|m| Failure::from(ResolverFailure::from_engine_message(&m))),
        Just(Failure::from(AuthFailure::Expired { expired_at: None })),
        Just(Failure::from(AuthFailure::SignatureInvalid)),
        ".{0,20}".prop_map(|r| Failure::from(AuthFailure::Malformed { reason: r })),
        (100u16..600, ".{0,20}").prop_map(|(s, m)| Failure::from(HttpFailure::new(s, m))),
        ("[a-z]{1,8}", ".{0,20}").prop_map(|(s, m)| {
            Failure::from(UpstreamFailure::new(s, UpstreamCondition::Timeout, m))
        }),
        ".{0,40}".prop_map(|m| Failure::unexpected(&std::io::Error::other(m))),
    ]
}

fn depth_chain(depth: usize) -> ErrorRecord {
    (0..depth).fold(ErrorRecord::from_code(ErrorCode::Internal), |acc, _| {
        ErrorRecord::from_code(ErrorCode::Upstream).with_cause(acc)
    })
}

// ── 1. Totality ──────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_failure_gets_a_consistent_record(failure in arb_failure()) {
        let rec = builtin_classifier().classify(&failure);
        prop_assert_eq!(rec.status(), status_for(rec.kind()));
        prop_assert_eq!(
            code_for(rec.kind(), rec.code().sub_discriminator()),
            rec.code()
        );
        prop_assert!(rec.cause_depth() <= MAX_CAUSE_DEPTH);
    }

    #[test]
    fn wrapping_in_a_resolver_does_not_change_the_code(failure in arb_failure()) {
        let c = builtin_classifier();
        let direct = c.classify(&failure);
        let wrapped = c.classify(&Failure::from(ResolverFailure::wrap(["field"], failure)));
        prop_assert_eq!(direct.code(), wrapped.code());
    }
}

// ── 2. Cause depth ───────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn application_records_never_exceed_cap(depth in 0usize..40) {
        let rec = builtin_classifier().classify(&Failure::from(depth_chain(depth)));
        prop_assert!(rec.cause_depth() <= MAX_CAUSE_DEPTH);
    }
}

// ── 3. Precedence ────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn first_registered_wins_and_order_matters(swap in any::<bool>(), msg in ".{0,20}") {
        let narrow = Translator::new(
            "narrow",
            FailurePattern::shape("persistence.unique_violation"),
            |_: &Failure| ErrorRecord::from_code(ErrorCode::ConflictUniqueViolation),
        );
        let broad = Translator::new(
            "broad",
            FailurePattern::shape("persistence.*"),
            |_: &Failure| ErrorRecord::from_code(ErrorCode::Conflict),
        );
        let mut b = RegistryBuilder::new();
        if swap {
            b.register(broad).unwrap().register(narrow).unwrap();
        } else {
            b.register(narrow).unwrap().register(broad).unwrap();
        }
        let c = Classifier::new(b.freeze());
        let rec = c.classify(&Failure::from(PersistenceFailure::database(Some("23505"), msg)));
        let expected = if swap { ErrorCode::Conflict } else { ErrorCode::ConflictUniqueViolation };
        prop_assert_eq!(rec.code(), expected);
    }
}
