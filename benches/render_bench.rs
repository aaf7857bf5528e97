// SPDX-License-Identifier: MIT OR Apache-2.0
//! Benchmarks for rendering canonical records into HTTP and graph envelopes.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use faultline_render::{Protocol, RenderOptions, Renderer};
use faultline_taxonomy::{ErrorCode, ErrorRecord};

fn record(depth: usize) -> ErrorRecord {
    let mut rec = ErrorRecord::new(ErrorCode::UpstreamTimeout, "billing timed out")
        .with_field_path(["invoice", "total"])
        .with_detail("service", "billing");
    for i in 0..depth {
        rec = ErrorRecord::new(ErrorCode::Upstream, format!("outer {i}")).with_cause(rec);
    }
    rec
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    for depth in [0usize, 2, 8] {
        let rec = record(depth);
        for protocol in [Protocol::Http, Protocol::Graph] {
            let renderer = Renderer::new(RenderOptions::default().with_cause_depth(depth));
            group.bench_with_input(
                BenchmarkId::new(protocol.to_string(), depth),
                &rec,
                |b, r| b.iter(|| renderer.render(black_box(r), protocol)),
            );
        }
    }
    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let envelope = faultline_render::render(&record(2), Protocol::Http).expect("renders");
    c.bench_function("envelope_to_json_bytes", |b| {
        b.iter(|| black_box(&envelope).to_json_bytes())
    });
}

criterion_group!(benches, bench_render, bench_serialize);
criterion_main!(benches);
