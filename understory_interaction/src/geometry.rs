// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collider shapes and the cheap closest-point queries hover and activation rely on.
//!
//! Spheres, boxes and capsules are exact. Meshes are approximated by their local bounding box:
//! hover only needs a distance good enough to rank nearby objects, and an exact surface query
//! would cost far more than it buys.

use glam::{Quat, Vec3};
use understory_spatial::Aabb3D;

use crate::types::Pose;

/// A collision proxy in object-local space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Collider {
    /// A sphere.
    Sphere {
        /// Local center.
        center: Vec3,
        /// Radius.
        radius: f32,
    },
    /// An oriented box.
    Box {
        /// Local center.
        center: Vec3,
        /// Half the box size along each local axis.
        half_extents: Vec3,
        /// Local rotation of the box.
        rotation: Quat,
    },
    /// A capsule: all points within `radius` of the segment `a`–`b`.
    Capsule {
        /// First segment endpoint.
        a: Vec3,
        /// Second segment endpoint.
        b: Vec3,
        /// Radius.
        radius: f32,
    },
    /// A triangle mesh, represented by its local bounds.
    Mesh {
        /// Minimum corner of the local bounds.
        min: Vec3,
        /// Maximum corner of the local bounds.
        max: Vec3,
    },
}

impl Collider {
    /// An axis-aligned box centered at the object origin.
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::Box {
            center: Vec3::ZERO,
            half_extents,
            rotation: Quat::IDENTITY,
        }
    }

    /// A sphere centered at the object origin.
    pub fn ball(radius: f32) -> Self {
        Self::Sphere {
            center: Vec3::ZERO,
            radius,
        }
    }

    /// Closest point on (or in) this collider to the world-space point `p`.
    ///
    /// Points inside the shape are their own closest point.
    pub fn closest_point(&self, world: &Pose, p: Vec3) -> Vec3 {
        let local = world.inverse_transform_point(p);
        let closest = match *self {
            Self::Sphere { center, radius } => {
                let d = local - center;
                if d.length_squared() <= radius * radius {
                    local
                } else {
                    center + d.normalize() * radius
                }
            }
            Self::Box {
                center,
                half_extents,
                rotation,
            } => {
                let q = rotation.inverse() * (local - center);
                center + rotation * q.clamp(-half_extents, half_extents)
            }
            Self::Capsule { a, b, radius } => {
                let on_axis = closest_on_segment(a, b, local);
                let d = local - on_axis;
                if d.length_squared() <= radius * radius {
                    local
                } else {
                    on_axis + d.normalize() * radius
                }
            }
            Self::Mesh { min, max } => local.clamp(min, max),
        };
        world.transform_point(closest)
    }

    /// Conservative world-space AABB of the collider.
    pub fn world_aabb(&self, world: &Pose) -> Aabb3D<f32> {
        match *self {
            Self::Sphere { center, radius } => {
                let c = world.transform_point(center);
                Aabb3D::around_point(c.x, c.y, c.z, radius)
            }
            Self::Capsule { a, b, radius } => {
                let a = world.transform_point(a);
                let b = world.transform_point(b);
                to_aabb(a.min(b), a.max(b)).inflate(radius)
            }
            Self::Box {
                center,
                half_extents,
                rotation,
            } => corners_aabb(world, center, half_extents, rotation),
            Self::Mesh { min, max } => {
                corners_aabb(world, (min + max) * 0.5, (max - min) * 0.5, Quat::IDENTITY)
            }
        }
    }
}

/// Closest point over a set of colliders and its distance to `p`.
///
/// With no colliders the object is treated as a point at its pose.
pub fn closest_point(colliders: &[Collider], world: &Pose, p: Vec3) -> (Vec3, f32) {
    let mut best: Option<(Vec3, f32)> = None;
    for collider in colliders {
        let c = collider.closest_point(world, p);
        let d = c.distance(p);
        if best.is_none_or(|(_, b)| d < b) {
            best = Some((c, d));
        }
    }
    best.unwrap_or((world.position, world.position.distance(p)))
}

/// Distance from `p` to a set of colliders.
pub fn distance(colliders: &[Collider], world: &Pose, p: Vec3) -> f32 {
    closest_point(colliders, world, p).1
}

/// World AABB enclosing every collider, or the pose position when there are none.
pub fn world_aabb(colliders: &[Collider], world: &Pose) -> Aabb3D<f32> {
    let mut it = colliders.iter().map(|c| c.world_aabb(world));
    match it.next() {
        Some(first) => it.fold(first, |acc, b| acc.union(&b)),
        None => {
            let p = world.position;
            Aabb3D::around_point(p.x, p.y, p.z, 0.0)
        }
    }
}

fn closest_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

fn corners_aabb(world: &Pose, center: Vec3, half: Vec3, rotation: Quat) -> Aabb3D<f32> {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for i in 0..8 {
        let sign = Vec3::new(
            if i & 1 == 0 { -1.0 } else { 1.0 },
            if i & 2 == 0 { -1.0 } else { 1.0 },
            if i & 4 == 0 { -1.0 } else { 1.0 },
        );
        let corner = world.transform_point(center + rotation * (half * sign));
        min = min.min(corner);
        max = max.max(corner);
    }
    to_aabb(min, max)
}

fn to_aabb(min: Vec3, max: Vec3) -> Aabb3D<f32> {
    Aabb3D::new(min.x, min.y, min.z, max.x, max.y, max.z)
}
