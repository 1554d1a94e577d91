// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hover, primary hover and activation along a shelf of objects.
//!
//! A pointing hand sweeps along three buttons. Every button within reach is hovered; the one
//! nearest the fingertip is the primary hover. Locking the primary keeps it on the first
//! button while the hand drifts, and a button flagged to ignore hover is skipped entirely.
//! A crate linked to the last button wakes up with it.
//!
//! Run:
//! - `cargo run -p understory_interaction_demos --example hover_basics`

use glam::Vec3;
use understory_interaction::{
    Chirality, Collider, ControllerFrame, ControllerId, EventKind, HeuristicEngine,
    InteractionManager, ObjectDesc, ObjectFlags, ObjectId, Pose, TrackingFrame,
};

const HAND: ControllerId = ControllerId(1);

fn button(x: f32) -> ObjectDesc {
    ObjectDesc::at(Pose::from_position(Vec3::new(x, 1.2, 0.0))).with_collider(Collider::ball(0.02))
}

fn pointing(x: f32) -> ControllerFrame {
    // The palm sits 10 cm behind the fingertip.
    let tip = Vec3::new(x, 1.2, 0.03);
    ControllerFrame::new(
        HAND,
        Chirality::Right,
        Pose::from_position(tip + Vec3::new(0.0, 0.0, 0.1)),
    )
    .with_primary_hover_points(vec![tip])
}

fn print_state(manager: &InteractionManager, names: &[(&str, ObjectId)]) {
    for &(name, id) in names {
        let hovering: Vec<_> = manager.hovering_controllers(id).collect();
        let primary = manager.primary_hovering_controllers(id).count() > 0;
        println!(
            "  {name:>6}: active={} hovered_by={hovering:?}{}",
            manager.is_active(id),
            if primary { " (primary)" } else { "" }
        );
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let mut manager = InteractionManager::new();
    let mut engine = HeuristicEngine::default();
    let a = manager.register(button(0.0));
    let b = manager.register(button(0.06));
    let muted = manager.register(button(0.12).with_flags(ObjectFlags::IGNORE_HOVER));
    let c = manager.register(button(0.18));
    let crate_box = manager.register(
        ObjectDesc::at(Pose::from_position(Vec3::new(1.5, 0.5, 0.0)))
            .with_collider(Collider::cuboid(Vec3::splat(0.2))),
    );
    engine.link(c, crate_box);
    let names = [
        ("a", a),
        ("b", b),
        ("muted", muted),
        ("c", c),
        ("crate", crate_box),
    ];

    let mut time = 0.0;
    let mut step = |manager: &mut InteractionManager, x: f32, label: &str| {
        let events = manager.step(
            &TrackingFrame::new(time).with_controller(pointing(x)),
            &mut engine,
        );
        time += 1.0 / 90.0;
        println!("== {label} (fingertip x = {x:.2}) ==");
        for e in events.iter().filter(|e| {
            !matches!(e.kind, EventKind::HoverStay | EventKind::PrimaryHoverStay)
        }) {
            println!("  {:?} on {:?}", e.kind, e.object);
        }
        print_state(manager, &names);
    };

    step(&mut manager, 0.0, "over a");
    manager
        .lock_primary_hover(HAND, true)
        .expect("hand is registered");
    step(&mut manager, 0.05, "drift toward b with primary locked");
    manager
        .lock_primary_hover(HAND, false)
        .expect("hand is registered");
    step(&mut manager, 0.05, "unlocked");
    step(&mut manager, 0.12, "over the muted button");
    step(&mut manager, 0.18, "over c");

    assert_eq!(manager.primary_hover(HAND), Some(c));
    assert!(manager.is_active(crate_box));
}
