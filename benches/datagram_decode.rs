//! Benchmarks for datagram decode and routing throughput.
//!
//! Run with: cargo bench --features benchmark

use criterion::{Criterion, criterion_group, criterion_main};
use simwatch::config::ChannelMap;
use simwatch::test_utils::{noisy_datagram, steering_speed_datagram};
use simwatch::wire::{decode_datagram, route};
use std::hint::black_box;

fn bench_decode_minimal_pair(c: &mut Criterion) {
    let datagram = steering_speed_datagram(10.5, 30.2);

    c.bench_function("decode_minimal_pair", |b| {
        b.iter(|| decode_datagram(black_box(&datagram)).unwrap())
    });
}

fn bench_decode_noisy_datagram(c: &mut Criterion) {
    let datagram = noisy_datagram(10.5, 30.2);

    c.bench_function("decode_noisy_datagram", |b| {
        b.iter(|| decode_datagram(black_box(&datagram)).unwrap())
    });
}

fn bench_decode_and_route_full_export(c: &mut Criterion) {
    // A wide export: 64 channels, two of them tracked
    let mut pairs: Vec<(f64, f64)> = (0..62).map(|i| (1000.0 + f64::from(i), 0.5)).collect();
    pairs.push((167.0, 10.5));
    pairs.push((120.0, 30.2));
    let datagram = simwatch::wire::encode_pairs(&pairs);
    let channels = ChannelMap::default();

    c.bench_function("decode_and_route_full_export", |b| {
        b.iter(|| {
            let readings = decode_datagram(black_box(&datagram)).unwrap();
            route(black_box(&readings), &channels)
        })
    });
}

criterion_group!(
    benches,
    bench_decode_minimal_pair,
    bench_decode_noisy_datagram,
    bench_decode_and_route_full_export
);
criterion_main!(benches);
