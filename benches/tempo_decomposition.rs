// SPDX-License-Identifier: MPL-2.0
//! Benchmarks for the audio tempo path.
//!
//! Measures the performance of:
//! - Rate decomposition into atempo stages
//! - Filter-chain description rendering
//! - A full pipeline build (graph allocation + validation)

use criterion::{criterion_group, criterion_main, Criterion};
use marquee::player::tempo::{decompose_rate, filter_chain_spec, TempoParams, TempoPipeline};
use std::hint::black_box;

/// Benchmark the pure rate decomposition across representative rates.
fn bench_decompose(c: &mut Criterion) {
    let mut group = c.benchmark_group("tempo");

    group.bench_function("decompose_rate", |b| {
        b.iter(|| {
            for rate in [0.25, 0.3, 0.5, 1.0, 1.5, 2.0, 3.0, 4.0, 7.3] {
                black_box(decompose_rate(black_box(rate)));
            }
        });
    });

    group.finish();
}

/// Benchmark rendering the filter-chain description string.
fn bench_chain_spec(c: &mut Criterion) {
    let mut group = c.benchmark_group("tempo");

    group.bench_function("filter_chain_spec", |b| {
        b.iter(|| {
            black_box(filter_chain_spec(black_box(3.0), black_box(48_000)));
        });
    });

    group.finish();
}

/// Benchmark a full pipeline build, the cost paid on every rate change.
fn bench_pipeline_build(c: &mut Criterion) {
    marquee::media::init_ffmpeg().unwrap();

    let params = TempoParams {
        sample_rate: 48_000,
        sample_format: "fltp".to_string(),
        channel_layout_bits: ffmpeg_next::ChannelLayout::STEREO.bits(),
        time_base: (1, 48_000),
    };

    let mut group = c.benchmark_group("tempo");
    group.bench_function("pipeline_build", |b| {
        b.iter(|| {
            let pipeline = TempoPipeline::new(black_box(&params), black_box(2.0)).unwrap();
            black_box(pipeline);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_decompose,
    bench_chain_spec,
    bench_pipeline_build
);
criterion_main!(benches);
