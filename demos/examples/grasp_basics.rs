// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grasp, hand-to-hand swap, tracking loss and reconnection.
//!
//! A left hand picks up a cube, the right hand takes it over, the right hand then drops out of
//! tracking and comes back under a new controller id, and finally lets go with a flick.
//!
//! Run:
//! - `cargo run -p understory_interaction_demos --example grasp_basics`

use glam::Vec3;
use understory_interaction::{
    Chirality, Collider, CommandQueue, ControllerFrame, ControllerId, EventCategories, EventKind,
    HeuristicEngine, HostError, InteractionEvent, InteractionManager, ObjectDesc, Pose,
    TrackingFrame,
};

const LEFT: ControllerId = ControllerId(1);
const RIGHT: ControllerId = ControllerId(2);
const RIGHT_AGAIN: ControllerId = ControllerId(3);

fn hand(id: ControllerId, chirality: Chirality, x: f32, grip: f32) -> ControllerFrame {
    ControllerFrame::new(id, chirality, Pose::from_position(Vec3::new(x, 1.0, 0.0))).with_grip(grip)
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let mut manager = InteractionManager::new();
    let mut engine = HeuristicEngine::default();
    let cube = manager.register(
        ObjectDesc::at(Pose::from_position(Vec3::new(0.0, 1.0, 0.0)))
            .with_collider(Collider::cuboid(Vec3::splat(0.04))),
    );

    let _ = manager.add_observer(
        EventCategories::GRASP | EventCategories::SUSPENSION,
        |e: &InteractionEvent, _: &mut CommandQueue| -> Result<(), HostError> {
            println!("    observer: {:?}", e.kind);
            Ok(())
        },
    );

    let script: Vec<(&str, TrackingFrame)> = vec![
        (
            "left hand approaches",
            TrackingFrame::new(0.0).with_controller(hand(LEFT, Chirality::Left, -0.05, 0.0)),
        ),
        (
            "left hand closes",
            TrackingFrame::new(0.1).with_controller(hand(LEFT, Chirality::Left, -0.05, 1.0)),
        ),
        (
            "right hand reaches in and closes",
            TrackingFrame::new(0.2)
                .with_controller(hand(LEFT, Chirality::Left, -0.05, 1.0))
                .with_controller(hand(RIGHT, Chirality::Right, 0.05, 1.0)),
        ),
        (
            "left hand leaves; right hand loses tracking",
            TrackingFrame::new(0.3).with_controller(hand(LEFT, Chirality::Left, -0.6, 0.0)),
        ),
        (
            "right hand is re-detected under a new id",
            TrackingFrame::new(0.8)
                .with_controller(hand(LEFT, Chirality::Left, -0.6, 0.0))
                .with_controller(hand(RIGHT_AGAIN, Chirality::Right, 0.05, 1.0)),
        ),
        (
            "right hand flicks and opens",
            TrackingFrame::new(0.9)
                .with_controller(hand(LEFT, Chirality::Left, -0.6, 0.0))
                .with_controller(
                    hand(RIGHT_AGAIN, Chirality::Right, 0.1, 0.0)
                        .with_velocity(Vec3::new(2.0, 1.0, 0.0)),
                ),
        ),
    ];

    for (label, frame) in &script {
        println!("== t = {:.1}: {label} ==", frame.time);
        let events = manager.step(frame, &mut engine);
        let changes: Vec<EventKind> = events
            .iter()
            .map(|e| e.kind)
            .filter(|k| {
                !matches!(
                    k,
                    EventKind::HoverStay
                        | EventKind::PrimaryHoverStay
                        | EventKind::ContactStay
                        | EventKind::GraspStay
                )
            })
            .collect();
        println!("  events: {changes:?}");
        println!(
            "  held by: {:?}, suspended: {}",
            manager.grasping_controllers(cube).collect::<Vec<_>>(),
            manager.is_suspended(cube)
        );
    }

    assert!(!manager.is_grasped(cube));
    let body = manager.body(cube).expect("cube is registered");
    println!("== released with velocity {} ==", body.linear_velocity);
}
