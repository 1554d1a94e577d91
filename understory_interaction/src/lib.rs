// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_interaction --heading-base-level=0

//! Understory Interaction: deterministic hover, contact, and grasp arbitration for tracked
//! hands and controllers.
//!
//! ## Overview
//!
//! An [`InteractionManager`] owns a set of interaction objects (rigid bodies with collider
//! proxies) and a set of tracked controllers. Once per frame the host passes it a
//! [`TrackingFrame`] and a [`NativeEngine`], and the manager:
//!
//! - activates objects near any controller (plus what touches them, a few hops deep);
//! - decides which controllers hover which objects, and each controller's single primary hover;
//! - records which controllers touch which objects, as reported by the engine;
//! - arbitrates grasps: who holds what, swaps between controllers, suspension while a holder is
//!   untracked, reconnection when a lost hand comes back under a new id, and release with throw;
//! - moves held objects toward their holders;
//! - returns the resulting [`InteractionEvent`]s in a fixed order and delivers them to observers.
//!
//! It does not simulate physics or detect gestures. The [`NativeEngine`] supplies grasp
//! classification and contact; [`HeuristicEngine`] is a small grip-strength based stand-in.
//!
//! ## Ordering
//!
//! Everything is deterministic: controllers are visited in ascending id order, objects in
//! ascending id order, and events are ordered by pipeline stage with a fixed rank inside each
//! stage (see [`event`]). Two managers fed the same inputs emit the same events.
//!
//! ## Observers
//!
//! Observers subscribe to [`EventCategories`]. They cannot touch the manager while they run;
//! they queue [`Command`]s instead, which apply right after delivery. An observer that fails
//! marks the event's object misbehaving, and that object is unregistered at the next step.
//!
//! ## Example
//!
//! ```rust
//! use understory_interaction::{
//!     Chirality, Collider, ControllerFrame, ControllerId, EventKind, HeuristicEngine,
//!     InteractionManager, ObjectDesc, Pose, TrackingFrame,
//! };
//! use glam::Vec3;
//!
//! let mut manager = InteractionManager::new();
//! let mut engine = HeuristicEngine::default();
//!
//! let cup = manager.register(
//!     ObjectDesc::at(Pose::from_position(Vec3::new(0.0, 1.0, 0.0)))
//!         .with_collider(Collider::ball(0.05)),
//! );
//!
//! let hand = |grip: f32| {
//!     ControllerFrame::new(
//!         ControllerId(1),
//!         Chirality::Right,
//!         Pose::from_position(Vec3::new(0.0, 1.04, 0.0)),
//!     )
//!     .with_grip(grip)
//! };
//!
//! // An open hand next to the cup hovers it.
//! let events = manager.step(&TrackingFrame::new(0.0).with_controller(hand(0.0)), &mut engine);
//! assert!(events.iter().any(|e| e.object == cup && e.kind == EventKind::HoverBegin));
//!
//! // Closing it grasps the cup.
//! let events = manager.step(&TrackingFrame::new(0.016).with_controller(hand(1.0)), &mut engine);
//! assert!(events.iter().any(|e| e.kind == EventKind::GraspBegin));
//! assert_eq!(manager.grasped_object(ControllerId(1)), Some(cup));
//! ```
//!
//! ## Logging
//!
//! State transitions are logged with `tracing` at `debug`, per-step summaries at `trace`, and
//! host failures at `warn`. Install any `tracing` subscriber to see them.
//!
//! This crate is `no_std` and uses `alloc`. Enable `std` (default) or `libm` for Glam's math.

#![no_std]

extern crate alloc;

mod activity;
pub mod config;
mod contact;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod geometry;
mod grasp;
pub mod hover;
pub mod manager;
pub mod movement;
pub mod native;
mod registry;
pub mod throw;
pub mod tracking;
pub mod types;

pub use config::{Broadphase, InteractionConfig, ReconnectPolicy};
pub use dispatch::{Command, CommandQueue, InteractionObserver, ObserverId};
pub use error::{ConfigError, HostError, InteractionError};
pub use event::{EventCategories, EventKind, InteractionEvent};
pub use geometry::Collider;
pub use hover::HoverState;
pub use manager::InteractionManager;
pub use movement::GraspMovement;
pub use native::{HeuristicEngine, NativeEngine};
pub use throw::{ThrowHandler, VelocityHistory};
pub use tracking::LogicalHand;
pub use types::{
    BodyState, Candidate, Chirality, Classification, ControllerFrame, ControllerId, GraspPolicy,
    HandId, ObjectDesc, ObjectFlags, ObjectId, Pose, TrackingFrame,
};
