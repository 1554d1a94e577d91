// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_spatial::{Aabb3D, Index};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f32(&mut self) -> f32 {
        let v = self.next_u64() >> 40;
        (v as f32) / ((1u64 << 24) as f32)
    }
}

/// Small boxes scattered through a room-sized volume centered on the origin.
fn gen_room_boxes(count: usize, extent: f32, size: f32) -> Vec<Aabb3D<f32>> {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    (0..count)
        .map(|_| {
            let x = (rng.next_f32() - 0.5) * extent;
            let y = rng.next_f32() * 2.0;
            let z = (rng.next_f32() - 0.5) * extent;
            Aabb3D::new(x, y, z, x + size, y + size, z + size)
        })
        .collect()
}

fn probes(count: usize, extent: f32) -> Vec<(f32, f32, f32)> {
    let mut rng = Rng::new(0xBADC_F00D_1234_5678);
    (0..count)
        .map(|_| {
            (
                (rng.next_f32() - 0.5) * extent,
                rng.next_f32() * 2.0,
                (rng.next_f32() - 0.5) * extent,
            )
        })
        .collect()
}

fn bench_insert_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_commit");
    for &n in &[64usize, 512, 4096] {
        let boxes = gen_room_boxes(n, 8.0, 0.1);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("flat_n{n}"), |b| {
            b.iter_batched(
                Index::<f32, u32>::new,
                |mut idx| {
                    for (i, r) in boxes.iter().copied().enumerate() {
                        let _ = idx.insert(r, i as u32);
                    }
                    black_box(idx.commit());
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_function(format!("grid_n{n}"), |b| {
            b.iter_batched(
                || Index::<f32, u32>::with_uniform_grid(0.5, (0.0, 0.0, 0.0)),
                |mut idx| {
                    for (i, r) in boxes.iter().copied().enumerate() {
                        let _ = idx.insert(r, i as u32);
                    }
                    black_box(idx.commit());
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_controller_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller_queries");
    let points = probes(64, 8.0);
    for &n in &[64usize, 512, 4096] {
        let boxes = gen_room_boxes(n, 8.0, 0.1);
        let mut flat = Index::<f32, u32>::new();
        let mut grid = Index::<f32, u32>::with_uniform_grid(0.5, (0.0, 0.0, 0.0));
        for (i, r) in boxes.iter().copied().enumerate() {
            let _ = flat.insert(r, i as u32);
            let _ = grid.insert(r, i as u32);
        }
        let _ = flat.commit();
        let _ = grid.commit();
        group.throughput(Throughput::Elements(points.len() as u64));
        group.bench_function(format!("flat_n{n}"), |b| {
            b.iter(|| {
                let mut hits = 0;
                for &(x, y, z) in &points {
                    hits += flat.query_box(Aabb3D::around_point(x, y, z, 0.3)).count();
                }
                black_box(hits)
            })
        });
        group.bench_function(format!("grid_n{n}"), |b| {
            b.iter(|| {
                let mut hits = 0;
                for &(x, y, z) in &points {
                    hits += grid.query_box(Aabb3D::around_point(x, y, z, 0.3)).count();
                }
                black_box(hits)
            })
        });
    }
    group.finish();
}

fn bench_move_heavy(c: &mut Criterion) {
    let mut group = c.benchmark_group("move_heavy");
    let boxes = gen_room_boxes(1024, 8.0, 0.1);
    group.bench_function("grid_update_all_then_commit", |b| {
        b.iter_batched(
            || {
                let mut idx = Index::<f32, u32>::with_uniform_grid(0.5, (0.0, 0.0, 0.0));
                let keys: Vec<_> = boxes
                    .iter()
                    .copied()
                    .enumerate()
                    .map(|(i, r)| idx.insert(r, i as u32))
                    .collect();
                let _ = idx.commit();
                (idx, keys)
            },
            |(mut idx, keys)| {
                for (k, r) in keys.iter().zip(&boxes) {
                    let shifted = Aabb3D::new(
                        r.min_x + 0.05,
                        r.min_y,
                        r.min_z,
                        r.max_x + 0.05,
                        r.max_y,
                        r.max_z,
                    );
                    idx.update(*k, shifted);
                }
                black_box(idx.commit());
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_insert_commit,
    bench_controller_queries,
    bench_move_heavy,
);
criterion_main!(benches);
