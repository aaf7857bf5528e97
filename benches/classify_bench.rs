// SPDX-License-Identifier: MIT OR Apache-2.0
//! Benchmarks for failure classification against the built-in registry,
//! including a worst-case miss that walks every translator.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use faultline_classify::{
    AuthFailure, Capabilities, Classifier, Failure, HttpFailure, PersistenceFailure,
    RegistryBuilder, UpstreamCondition, UpstreamFailure,
};

// ── Helpers ─────────────────────────────────────────────────────────────

fn classifier() -> Classifier {
    let registry = RegistryBuilder::with_builtins(&Capabilities::all())
        .expect("builtins register")
        .freeze();
    Classifier::new(registry)
}

fn samples() -> Vec<(&'static str, Failure)> {
    vec![
        (
            "unique_violation",
            PersistenceFailure::database(Some("23505"), "duplicate key")
                .with_constraint("users_email_key")
                .with_detail("Key (email)=(a@b.c) already exists.")
                .into(),
        ),
        ("token_expired", AuthFailure::Expired { expired_at: None }.into()),
        ("http_404", HttpFailure::new(404, "No route").into()),
        (
            "upstream_timeout",
            UpstreamFailure::new("billing", UpstreamCondition::Timeout, "deadline").into(),
        ),
        ("unmatched", anyhow::anyhow!("socket closed").into()),
    ]
}

// ── Benchmarks ──────────────────────────────────────────────────────────

fn bench_classify(c: &mut Criterion) {
    let classifier = classifier();
    let mut group = c.benchmark_group("classify");
    for (name, failure) in samples() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &failure, |b, f| {
            b.iter(|| classifier.classify(black_box(f)))
        });
    }
    group.finish();
}

fn bench_registry_build(c: &mut Criterion) {
    c.bench_function("registry_with_builtins", |b| {
        b.iter(|| {
            RegistryBuilder::with_builtins(black_box(&Capabilities::all()))
                .expect("builtins register")
                .freeze()
        })
    });
}

criterion_group!(benches, bench_classify, bench_registry_build);
criterion_main!(benches);
