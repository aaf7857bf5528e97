// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fuzz failure deserialization, classification and rendering.
//!
//! Verifies:
//! 1. Any JSON that deserializes as a `Failure` classifies without panicking.
//! 2. The rendered HTTP body always carries `code` and `message`.
//! 3. Rendering is deterministic.
//! 4. Internal records never leak their debug details.
#![no_main]
use faultline_classify::{Capabilities, Classifier, Failure, RegistryBuilder};
use faultline_render::{Protocol, Renderer};
use libfuzzer_sys::fuzz_target;
use std::sync::LazyLock;

static CLASSIFIER: LazyLock<Classifier> = LazyLock::new(|| {
    let registry = RegistryBuilder::with_builtins(&Capabilities::all())
        .expect("builtins register")
        .freeze();
    Classifier::new(registry)
});

fuzz_target!(|data: &[u8]| {
    let Ok(failure) = serde_json::from_slice::<Failure>(data) else {
        return;
    };

    // --- Property 1: classification is total ---
    let record = CLASSIFIER.classify(&failure);

    // --- Property 2 & 3: rendering ---
    let renderer = Renderer::default();
    for protocol in [Protocol::Http, Protocol::Graph] {
        let Ok(a) = renderer.render(&record, protocol) else {
            continue;
        };
        let b = renderer.render(&record, protocol).expect("second render");
        assert_eq!(a.to_json_bytes().ok(), b.to_json_bytes().ok());
    }
    let http = renderer.render_http(&record).expect("taxonomy statuses render");
    assert!(http.body["error"]["code"].is_string());
    assert!(http.body["error"]["message"].is_string());

    // --- Property 4: no debug details in the default rendering ---
    if record.kind().is_internal() {
        assert!(http.body["error"].get("details").is_none());
    }
});
