// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz graph engine message parsing.
//!
//! `ResolverFailure::from_engine_message` runs regexes over text the engine
//! produced; any input must yield a failure without panicking, and the
//! result must classify.
#![no_main]
use faultline_classify::{Capabilities, Classifier, Failure, RegistryBuilder, ResolverFailure};
use libfuzzer_sys::fuzz_target;
use std::sync::LazyLock;

static CLASSIFIER: LazyLock<Classifier> = LazyLock::new(|| {
    let registry = RegistryBuilder::with_builtins(&Capabilities::all())
        .expect("builtins register")
        .freeze();
    Classifier::new(registry)
});

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let failure = ResolverFailure::from_engine_message(s);
    let record = CLASSIFIER.classify(&Failure::from(failure));
    assert!((400..=599).contains(&record.status()));
});
