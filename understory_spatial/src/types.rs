// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.

use core::cmp::Ordering;
use core::ops::{Add, Sub};

/// Axis-aligned bounding box in 3D.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Aabb3D<T> {
    /// Minimum x
    pub min_x: T,
    /// Minimum y
    pub min_y: T,
    /// Minimum z
    pub min_z: T,
    /// Maximum x
    pub max_x: T,
    /// Maximum y
    pub max_y: T,
    /// Maximum z
    pub max_z: T,
}

impl<T> Aabb3D<T> {
    /// Create a new AABB from min/max corners.
    pub const fn new(min_x: T, min_y: T, min_z: T, max_x: T, max_y: T, max_z: T) -> Self {
        Self {
            min_x,
            min_y,
            min_z,
            max_x,
            max_y,
            max_z,
        }
    }
}

impl<T: Copy + PartialOrd> Aabb3D<T> {
    /// Whether this AABB contains the point (boundary inclusive).
    pub fn contains_point(&self, x: T, y: T, z: T) -> bool {
        le(self.min_x, x)
            && le(self.min_y, y)
            && le(self.min_z, z)
            && le(x, self.max_x)
            && le(y, self.max_y)
            && le(z, self.max_z)
    }

    /// The intersection of two AABBs. May be empty; check with [`Aabb3D::is_empty`].
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            min_x: max_t(self.min_x, other.min_x),
            min_y: max_t(self.min_y, other.min_y),
            min_z: max_t(self.min_z, other.min_z),
            max_x: min_t(self.max_x, other.max_x),
            max_y: min_t(self.max_y, other.max_y),
            max_z: min_t(self.max_z, other.max_z),
        }
    }

    /// Whether the two AABBs overlap (touching counts as overlap).
    pub fn overlaps(&self, other: &Self) -> bool {
        !self.intersect(other).is_empty()
    }

    /// The smallest AABB containing both inputs.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: min_t(self.min_x, other.min_x),
            min_y: min_t(self.min_y, other.min_y),
            min_z: min_t(self.min_z, other.min_z),
            max_x: max_t(self.max_x, other.max_x),
            max_y: max_t(self.max_y, other.max_y),
            max_z: max_t(self.max_z, other.max_z),
        }
    }

    /// Return true if the AABB is inverted along any axis. Assumes no NaN.
    pub fn is_empty(&self) -> bool {
        lt(self.max_x, self.min_x) || lt(self.max_y, self.min_y) || lt(self.max_z, self.min_z)
    }
}

impl<T: Copy + Add<Output = T> + Sub<Output = T>> Aabb3D<T> {
    /// A cube of half-size `r` around `(x, y, z)`.
    pub fn around_point(x: T, y: T, z: T, r: T) -> Self {
        Self {
            min_x: x - r,
            min_y: y - r,
            min_z: z - r,
            max_x: x + r,
            max_y: y + r,
            max_z: z + r,
        }
    }
}

impl Aabb3D<f32> {
    /// Grow the box by `margin` on every side.
    pub const fn inflate(&self, margin: f32) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            min_z: self.min_z - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
            max_z: self.max_z + margin,
        }
    }
}

/// Float scalars a uniform grid can bucket into integer cells.
pub trait GridScalar: Copy + PartialOrd + core::fmt::Debug {
    /// Floor-divide `(v - origin) / cell` to an integer cell coordinate.
    fn cell_of(v: Self, origin: Self, cell: Self) -> i64;

    /// Whether the value is strictly positive (used to validate cell sizes).
    fn is_positive(v: Self) -> bool;
}

impl GridScalar for f32 {
    #[inline]
    fn cell_of(v: Self, origin: Self, cell: Self) -> i64 {
        let q = (v - origin) / cell;
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Cell coordinates are bounded by world extents over cell size."
        )]
        let i = q as i64;
        // `as` truncates toward zero; step down for negative fractions.
        if (i as f32) > q { i - 1 } else { i }
    }

    #[inline]
    fn is_positive(v: Self) -> bool {
        v > 0.0
    }
}

impl GridScalar for f64 {
    #[inline]
    fn cell_of(v: Self, origin: Self, cell: Self) -> i64 {
        let q = (v - origin) / cell;
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Cell coordinates are bounded by world extents over cell size."
        )]
        let i = q as i64;
        // `as` truncates toward zero; step down for negative fractions.
        if (i as f64) > q { i - 1 } else { i }
    }

    #[inline]
    fn is_positive(v: Self) -> bool {
        v > 0.0
    }
}

pub(crate) fn min_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Greater) => b,
        _ => a,
    }
}

pub(crate) fn max_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Less) => b,
        _ => a,
    }
}

pub(crate) fn le<T: PartialOrd>(a: T, b: T) -> bool {
    a.partial_cmp(&b)
        .map(|o| o != Ordering::Greater)
        .unwrap_or(false)
}

pub(crate) fn lt<T: PartialOrd>(a: T, b: T) -> bool {
    a.partial_cmp(&b)
        .map(|o| o == Ordering::Less)
        .unwrap_or(false)
}
