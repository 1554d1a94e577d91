// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types: identifiers, poses, per-object flags and policy, and per-step tracking input.
//!
//! ## Overview
//!
//! Objects are addressed by generational [`ObjectId`]s handed out by the
//! [`InteractionManager`](crate::manager::InteractionManager). Controllers are addressed by the
//! raw [`ControllerId`] the tracking source reports; those ids may change when a hand is lost and
//! re-detected, which is why logical hand identity lives separately (see [`HandId`]).

use alloc::vec::Vec;
use core::ops::Mul;

use glam::{Quat, Vec3};

use crate::geometry::Collider;
use crate::movement::GraspMovement;
use crate::throw::ThrowHandler;

/// Identifier for a registered interaction object.
///
/// A slot index plus a generation counter. Unregistering frees the slot; a later
/// registration that reuses it bumps the generation, so stale ids never alias a live object.
///
/// The derived ordering (slot, then generation) is the iteration order used by every
/// arbiter, which keeps per-step results deterministic.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ObjectId(pub(crate) u32, pub(crate) u32);

impl ObjectId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Raw controller id as reported by the tracking source.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ControllerId(pub u32);

/// Identifier for a [`LogicalHand`](crate::tracking::LogicalHand): a hand identity that
/// survives raw controller id churn.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct HandId(pub(crate) u32, pub(crate) u32);

impl HandId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Handedness of a controller.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Chirality {
    /// A left hand or left-hand controller.
    Left,
    /// A right hand or right-hand controller.
    Right,
    /// No handedness (a generic tracked device).
    #[default]
    None,
}

/// A rigid transform: rotation followed by translation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pose {
    /// World-space position.
    pub position: Vec3,
    /// World-space orientation.
    pub rotation: Quat,
}

impl Pose {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create a pose from a position and rotation.
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// A pose at `position` with identity rotation.
    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            position: -(rotation * self.position),
            rotation,
        }
    }

    /// Map a point from this pose's local space into its parent space.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.position + self.rotation * p
    }

    /// Map a point from parent space into this pose's local space.
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.inverse() * (p - self.position)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Pose {
    type Output = Self;

    /// Compose two transforms: `(a * b)` applies `b` first, then `a`.
    fn mul(self, rhs: Self) -> Self {
        Self {
            position: self.transform_point(rhs.position),
            rotation: (self.rotation * rhs.rotation).normalize(),
        }
    }
}

bitflags::bitflags! {
    /// Per-object interaction flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ObjectFlags: u8 {
        /// Never report hover for this object (implies no primary hover).
        const IGNORE_HOVER         = 0b0000_0001;
        /// Still hoverable, but never chosen as any controller's primary hover.
        const IGNORE_PRIMARY_HOVER = 0b0000_0010;
        /// Never report contact for this object.
        const IGNORE_CONTACT       = 0b0000_0100;
        /// Never grasp this object; a held object is released when this is set.
        const IGNORE_GRASP         = 0b0000_1000;
        /// Allow more than one controller to grasp the object at once.
        const ALLOW_MULTI_GRASP    = 0b0001_0000;
    }
}

/// Physical properties of an object as seen by the interaction core.
///
/// The manager keeps one per registered object. Hosts push their simulation state in with
/// [`InteractionManager::set_body`](crate::manager::InteractionManager::set_body) and read the
/// result of grasp movement and throws back after each step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BodyState {
    /// World pose.
    pub pose: Pose,
    /// Linear velocity in m/s.
    pub linear_velocity: Vec3,
    /// Angular velocity in rad/s (axis scaled by speed).
    pub angular_velocity: Vec3,
    /// Whether the body ignores forces and is only moved by its pose.
    pub kinematic: bool,
    /// Linear damping coefficient.
    pub linear_damping: f32,
    /// Angular damping coefficient.
    pub angular_damping: f32,
}

impl BodyState {
    /// A resting, non-kinematic body at `pose`.
    pub fn at(pose: Pose) -> Self {
        Self {
            pose,
            ..Self::default()
        }
    }
}

impl Default for BodyState {
    fn default() -> Self {
        Self {
            pose: Pose::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            kinematic: false,
            linear_damping: 0.0,
            angular_damping: 0.05,
        }
    }
}

/// Per-object grasp policy. `None` fields fall back to the manager configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraspPolicy {
    /// How long a grasp survives loss of tracking before it is released, in seconds.
    pub max_suspension_time: Option<f32>,
    /// How the held object follows its grasping controllers.
    pub movement: Option<GraspMovement>,
    /// How release velocity is computed when the last controller lets go.
    pub throw: Option<ThrowHandler>,
}

/// Registration payload for an interaction object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectDesc {
    /// Collision proxies in object-local space. An empty list treats the object as a point.
    pub colliders: Vec<Collider>,
    /// Interaction flags.
    pub flags: ObjectFlags,
    /// Grasp policy overrides.
    pub policy: GraspPolicy,
    /// Initial physical state.
    pub body: BodyState,
}

impl ObjectDesc {
    /// A description of an object at `pose` with no colliders and default flags.
    pub fn at(pose: Pose) -> Self {
        Self {
            body: BodyState::at(pose),
            ..Self::default()
        }
    }

    /// Add a collider.
    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.colliders.push(collider);
        self
    }

    /// Replace the flags.
    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Replace the grasp policy.
    pub fn with_policy(mut self, policy: GraspPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// One controller's tracking sample for the current step.
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerFrame {
    /// Raw controller id.
    pub id: ControllerId,
    /// Handedness.
    pub chirality: Chirality,
    /// World pose (palm or grip point).
    pub pose: Pose,
    /// Linear velocity in m/s.
    pub velocity: Vec3,
    /// Fine-grained sample points (fingertips, pointer tip) for primary hover.
    /// Empty means "use the pose position".
    pub primary_hover_points: Vec<Vec3>,
    /// Grip strength hint in `0..=1`. Only the reference engine reads it.
    pub grip: f32,
}

impl ControllerFrame {
    /// A stationary, open-handed sample.
    pub fn new(id: ControllerId, chirality: Chirality, pose: Pose) -> Self {
        Self {
            id,
            chirality,
            pose,
            velocity: Vec3::ZERO,
            primary_hover_points: Vec::new(),
            grip: 0.0,
        }
    }

    /// Set the velocity.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the primary hover sample points.
    pub fn with_primary_hover_points(mut self, points: Vec<Vec3>) -> Self {
        self.primary_hover_points = points;
        self
    }

    /// Set the grip strength hint.
    pub fn with_grip(mut self, grip: f32) -> Self {
        self.grip = grip;
        self
    }

    /// The points used for primary hover, falling back to the pose position.
    pub fn hover_points(&self) -> impl Iterator<Item = Vec3> + '_ {
        let fallback = self
            .primary_hover_points
            .is_empty()
            .then_some(self.pose.position);
        self.primary_hover_points.iter().copied().chain(fallback)
    }
}

/// The tracking input for one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackingFrame {
    /// Step timestamp in seconds. Must not decrease between steps.
    pub time: f64,
    /// Controllers visible this step. Absent controllers were not updated.
    pub controllers: Vec<ControllerFrame>,
}

impl TrackingFrame {
    /// An empty frame at `time`.
    pub fn new(time: f64) -> Self {
        Self {
            time,
            controllers: Vec::new(),
        }
    }

    /// Add a controller sample.
    pub fn with_controller(mut self, controller: ControllerFrame) -> Self {
        self.controllers.push(controller);
        self
    }
}

/// A controller's grasp classification for one step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    /// The controller is holding the named object.
    Grasp(ObjectId),
    /// The controller is only touching or pushing things physically.
    Physics,
}

/// An object a controller could interact with this step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Candidate {
    /// The candidate object.
    pub object: ObjectId,
    /// Distance from the controller pose to the object's colliders.
    pub distance: f32,
}
