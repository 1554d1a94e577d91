// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grasped-object movement: how a held object follows its controllers.
//!
//! The set of strategies is closed. Each one only has to answer two questions: how to prepare
//! a body when the first controller grasps it, and how to drive it toward a target pose for
//! one step. Driving returns the *scheduled* pose, the pose the body will reach once the host
//! integrates the velocities written here. A grasp swap carries that pose forward so the new
//! controller picks the object up where it is about to be rather than where it was.

use glam::{Quat, Vec3};

use crate::types::{BodyState, Pose};

/// Strategy for moving a grasped object.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum GraspMovement {
    /// Snap the object to the target every step and mark it kinematic while held.
    Kinematic,
    /// Drive the object with velocities toward the target, clamped to `max_speed` (m/s).
    /// The object stays dynamic and keeps colliding while held.
    NonKinematic {
        /// Upper bound on the linear speed used to chase the target.
        max_speed: f32,
    },
}

impl Default for GraspMovement {
    fn default() -> Self {
        Self::NonKinematic { max_speed: 6.0 }
    }
}

impl GraspMovement {
    /// Adjust physical properties when an object becomes held.
    pub fn prepare(&self, body: &mut BodyState) {
        match self {
            Self::Kinematic => body.kinematic = true,
            Self::NonKinematic { .. } => {
                body.kinematic = false;
                body.linear_damping = 0.0;
                body.angular_damping = 0.0;
            }
        }
    }

    /// Drive `body` toward `target` over `dt` seconds and return the scheduled pose.
    ///
    /// A non-positive `dt` leaves the body untouched.
    pub fn drive(&self, body: &mut BodyState, target: Pose, dt: f32) -> Pose {
        if dt <= 0.0 {
            return body.pose;
        }
        let delta_rotation = shortest_arc(body.pose.rotation, target.rotation);
        match *self {
            Self::Kinematic => {
                body.linear_velocity = (target.position - body.pose.position) / dt;
                body.angular_velocity = delta_rotation.to_scaled_axis() / dt;
                body.pose = target;
                target
            }
            Self::NonKinematic { max_speed } => {
                let velocity =
                    ((target.position - body.pose.position) / dt).clamp_length_max(max_speed);
                let angular = delta_rotation.to_scaled_axis() / dt;
                body.linear_velocity = velocity;
                body.angular_velocity = angular;
                Pose::new(
                    body.pose.position + velocity * dt,
                    (Quat::from_scaled_axis(angular * dt) * body.pose.rotation).normalize(),
                )
            }
        }
    }
}

/// The rotation taking `from` to `to`, on the short way around.
fn shortest_arc(from: Quat, to: Quat) -> Quat {
    let q = to * from.inverse();
    if q.w < 0.0 { -q } else { q }
}

/// Combine per-controller target poses into one.
///
/// Positions are averaged. Rotations are averaged in the hemisphere of the first and then
/// renormalized, which is a good blend for the small spreads two hands produce.
pub(crate) fn blend_targets(targets: &[Pose]) -> Option<Pose> {
    let (first, rest) = targets.split_first()?;
    if rest.is_empty() {
        return Some(*first);
    }
    let mut position = first.position;
    let mut rotation = first.rotation;
    for t in rest {
        position += t.position;
        let q = if t.rotation.dot(first.rotation) < 0.0 {
            -t.rotation
        } else {
            t.rotation
        };
        rotation = rotation + q;
    }
    #[allow(
        clippy::cast_precision_loss,
        reason = "Grasp counts are tiny; the conversion is exact."
    )]
    let n = targets.len() as f32;
    Some(Pose::new(position / n, rotation.normalize()))
}

/// Offset of `object` relative to `controller`, so that `controller * offset == object`.
pub(crate) fn grasp_offset(controller: &Pose, object: &Pose) -> Pose {
    controller.inverse() * *object
}

/// Zero both velocities, freezing a body in place.
pub(crate) fn freeze(body: &mut BodyState) {
    body.linear_velocity = Vec3::ZERO;
    body.angular_velocity = Vec3::ZERO;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinematic_snaps_and_reports_velocity() {
        let mut body = BodyState::at(Pose::IDENTITY);
        let target = Pose::from_position(Vec3::new(0.1, 0.0, 0.0));
        let scheduled = GraspMovement::Kinematic.drive(&mut body, target, 0.1);
        assert_eq!(scheduled, target);
        assert_eq!(body.pose, target);
        assert!((body.linear_velocity - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn non_kinematic_clamps_speed() {
        let mut body = BodyState::at(Pose::IDENTITY);
        let target = Pose::from_position(Vec3::new(10.0, 0.0, 0.0));
        let scheduled =
            GraspMovement::NonKinematic { max_speed: 2.0 }.drive(&mut body, target, 0.5);
        assert!((body.linear_velocity.length() - 2.0).abs() < 1e-5);
        // The body itself is left for the host to integrate.
        assert_eq!(body.pose, Pose::IDENTITY);
        assert!((scheduled.position - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn zero_dt_is_a_no_op() {
        let mut body = BodyState::at(Pose::from_position(Vec3::Y));
        let scheduled = GraspMovement::Kinematic.drive(&mut body, Pose::IDENTITY, 0.0);
        assert_eq!(scheduled.position, Vec3::Y);
        assert_eq!(body.linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn prepare_non_kinematic_removes_damping() {
        let mut body = BodyState {
            linear_damping: 1.0,
            angular_damping: 1.0,
            ..BodyState::default()
        };
        GraspMovement::default().prepare(&mut body);
        assert_eq!(body.linear_damping, 0.0);
        assert_eq!(body.angular_damping, 0.0);
        assert!(!body.kinematic);
    }

    #[test]
    fn blend_averages_positions() {
        let a = Pose::from_position(Vec3::new(-1.0, 0.0, 0.0));
        let b = Pose::from_position(Vec3::new(1.0, 2.0, 0.0));
        let blended = blend_targets(&[a, b]).unwrap();
        assert!((blended.position - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
        assert!(blend_targets(&[]).is_none());
    }

    #[test]
    fn offset_reconstructs_object_pose() {
        let controller = Pose::new(Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_y(1.0));
        let object = Pose::new(Vec3::new(1.2, 0.1, -0.3), Quat::from_rotation_x(0.4));
        let offset = grasp_offset(&controller, &object);
        let back = controller * offset;
        assert!((back.position - object.position).length() < 1e-5);
        assert!(back.rotation.angle_between(object.rotation) < 1e-3);
    }
}
