//! # Merge Benchmark
//!
//! Measures the per-cycle cost of the field-level double buffer:
//! 1. Quiet cycle (nobody changed anything)
//! 2. Editor edited every field
//! 3. Worker changed every field
//! 4. Content-hashed payloads of growing size
//!
//! Target: a quiet 64-field merge stays well under a microsecond.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use twinbuf_core::{DoubleBufferStore, FieldKey};

const FIELDS: usize = 64;

#[derive(Clone)]
struct Panel {
    values: [f32; FIELDS],
    samples: Vec<u64>,
}

impl Panel {
    fn new(samples: usize) -> Self {
        Self {
            values: [0.0; FIELDS],
            samples: (0..samples as u64).collect(),
        }
    }
}

fn lens<const I: usize>(panel: &Panel) -> &f32 {
    &panel.values[I]
}

fn lens_mut<const I: usize>(panel: &mut Panel) -> &mut f32 {
    &mut panel.values[I]
}

macro_rules! declare_values {
    ($store:expr; $($i:literal)*) => {
        vec![$( $store.declare("value", lens::<$i>, lens_mut::<$i>) ),*]
    };
}

fn setup(samples: usize) -> (Panel, DoubleBufferStore<Panel>, Vec<FieldKey<Panel, f32>>) {
    let live = Panel::new(samples);
    let mut store = DoubleBufferStore::new(&live);
    let keys = declare_values!(store;
        0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15
        16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31
        32 33 34 35 36 37 38 39 40 41 42 43 44 45 46 47
        48 49 50 51 52 53 54 55 56 57 58 59 60 61 62 63
    );
    for &key in &keys {
        store.register(key);
    }
    store.snapshot_live_values(&live);
    (live, store, keys)
}

fn bench_quiet_cycle(c: &mut Criterion) {
    let (mut live, mut store, _keys) = setup(0);

    c.bench_function("merge_quiet_64_fields", |b| {
        b.iter(|| {
            store.snapshot_live_values(&live);
            black_box(store.merge(black_box(&mut live)));
        });
    });
}

fn bench_all_edited(c: &mut Criterion) {
    let (mut live, mut store, keys) = setup(0);
    let mut step = 0.0f32;

    c.bench_function("merge_all_edited_64_fields", |b| {
        b.iter(|| {
            step += 1.0;
            for &key in &keys {
                *store.pull(key) = step;
                store.commit(key);
            }
            store.snapshot_live_values(&live);
            black_box(store.merge(black_box(&mut live)));
        });
    });
}

fn bench_worker_changed(c: &mut Criterion) {
    let (mut live, mut store, _keys) = setup(0);
    let mut step = 0.0f32;

    c.bench_function("merge_worker_changed_64_fields", |b| {
        b.iter(|| {
            step += 1.0;
            store.run_cycle(&mut live, |panel| panel.values.fill(step));
            black_box(store.last_merge());
        });
    });
}

fn bench_hashed_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_hashed_payload");

    for samples in [1_024usize, 16_384, 262_144] {
        let (mut live, mut store, _keys) = setup(samples);
        let payload = store.declare("samples", |p: &Panel| &p.samples, |p| &mut p.samples);
        store.register(payload);

        group.throughput(Throughput::Bytes((samples * 8) as u64));
        group.bench_with_input(BenchmarkId::new("quiet", samples), &samples, |b, _| {
            b.iter(|| {
                store.snapshot_live_values(&live);
                black_box(store.merge(black_box(&mut live)));
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_quiet_cycle,
    bench_all_edited,
    bench_worker_changed,
    bench_hashed_payload,
);
criterion_main!(benches);
