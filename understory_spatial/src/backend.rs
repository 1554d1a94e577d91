// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The seam between [`IndexGeneric`](crate::IndexGeneric) and a spatial acceleration structure.
//!
//! Backends only see slot numbers and boxes. Payloads, generations and staging stay in the index.

use alloc::boxed::Box;

use crate::types::Aabb3D;
use core::fmt::Debug;

/// Spatial structure over slot-numbered boxes.
///
/// Query results must be in ascending slot order.
pub trait Backend<T: Copy + PartialOrd + Debug> {
    /// Start tracking `slot` with the given box.
    fn insert(&mut self, slot: usize, aabb: Aabb3D<T>);

    /// Replace the box of a tracked slot. Unknown slots are ignored.
    fn update(&mut self, slot: usize, aabb: Aabb3D<T>);

    /// Stop tracking `slot`.
    fn remove(&mut self, slot: usize);

    /// Forget every slot.
    fn clear(&mut self);

    /// Slots whose box contains the point.
    fn query_point<'a>(&'a self, x: T, y: T, z: T) -> Box<dyn Iterator<Item = usize> + 'a>;

    /// Slots whose box overlaps `aabb`.
    fn query_box<'a>(&'a self, aabb: Aabb3D<T>) -> Box<dyn Iterator<Item = usize> + 'a>;
}
