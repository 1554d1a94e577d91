// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::Vec3;
use understory_interaction::{
    Broadphase, Chirality, Collider, ControllerFrame, ControllerId, HeuristicEngine,
    InteractionConfig, InteractionManager, ObjectDesc, Pose, TrackingFrame,
};

/// A table of `n` small objects on a 0.1 m pitch grid at waist height.
fn table(n: usize, broadphase: Broadphase) -> InteractionManager {
    let mut m = InteractionManager::with_config(InteractionConfig {
        broadphase,
        ..InteractionConfig::default()
    })
    .expect("default radii are valid");
    let side = (n as f32).sqrt().ceil() as usize;
    for i in 0..n {
        let x = (i % side) as f32 * 0.1;
        let z = (i / side) as f32 * 0.1;
        let _ = m.register(
            ObjectDesc::at(Pose::from_position(Vec3::new(x, 1.0, z)))
                .with_collider(Collider::ball(0.03)),
        );
    }
    m
}

/// Two hands sweeping across the table, gripping on alternate passes.
fn frames(steps: usize, span: f32) -> Vec<TrackingFrame> {
    (0..steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            let grip = if (i / 30) % 2 == 0 { 0.0 } else { 1.0 };
            let left = ControllerFrame::new(
                ControllerId(1),
                Chirality::Left,
                Pose::from_position(Vec3::new(t * span, 1.02, 0.2)),
            )
            .with_grip(grip);
            let right = ControllerFrame::new(
                ControllerId(2),
                Chirality::Right,
                Pose::from_position(Vec3::new(span - t * span, 1.02, 0.4)),
            )
            .with_grip(1.0 - grip);
            TrackingFrame::new(f64::from(i as u32) / 90.0)
                .with_controller(left)
                .with_controller(right)
        })
        .collect()
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");
    let script = frames(240, 2.0);
    for &n in &[16usize, 256, 1024] {
        group.throughput(Throughput::Elements(script.len() as u64));
        for (name, broadphase) in [
            ("flat", Broadphase::Flat),
            ("grid", Broadphase::Grid { cell: 0.3 }),
        ] {
            group.bench_function(format!("{name}_n{n}"), |b| {
                b.iter_batched(
                    || (table(n, broadphase), HeuristicEngine::default()),
                    |(mut m, mut engine)| {
                        let mut events = 0;
                        for f in &script {
                            events += m.step(f, &mut engine).len();
                        }
                        black_box(events)
                    },
                    BatchSize::LargeInput,
                )
            });
        }
    }
    group.finish();
}

fn bench_idle(c: &mut Criterion) {
    // Hands far from everything: the cost floor of activation with nothing to arbitrate.
    let mut group = c.benchmark_group("idle");
    let far = TrackingFrame::new(0.0).with_controller(ControllerFrame::new(
        ControllerId(1),
        Chirality::Left,
        Pose::from_position(Vec3::new(-50.0, 1.0, -50.0)),
    ));
    for &n in &[256usize, 4096] {
        let mut m = table(n, Broadphase::Grid { cell: 0.3 });
        let mut engine = HeuristicEngine::default();
        group.bench_function(format!("grid_n{n}"), |b| {
            b.iter(|| black_box(m.step(&far, &mut engine)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_step, bench_idle);
criterion_main!(benches);
