// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linear-scan backend.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::types::Aabb3D;

/// Boxes stored densely by slot and scanned in full on every query.
///
/// Interaction scenes usually register tens of objects, where a scan beats any tree.
pub struct FlatVec<T> {
    boxes: Vec<Option<Aabb3D<T>>>,
}

impl<T> Default for FlatVec<T> {
    fn default() -> Self {
        Self { boxes: Vec::new() }
    }
}

impl<T> Debug for FlatVec<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlatVec")
            .field("slots", &self.boxes.len())
            .field("occupied", &self.boxes.iter().flatten().count())
            .finish_non_exhaustive()
    }
}

impl<T: Copy + PartialOrd + Debug> FlatVec<T> {
    fn matching<'a>(
        &'a self,
        hit: impl Fn(&Aabb3D<T>) -> bool + 'a,
    ) -> Box<dyn Iterator<Item = usize> + 'a> {
        Box::new(
            self.boxes
                .iter()
                .enumerate()
                .filter(move |(_, b)| b.as_ref().is_some_and(&hit))
                .map(|(slot, _)| slot),
        )
    }
}

impl<T: Copy + PartialOrd + Debug> Backend<T> for FlatVec<T> {
    fn insert(&mut self, slot: usize, aabb: Aabb3D<T>) {
        if slot >= self.boxes.len() {
            self.boxes.resize(slot + 1, None);
        }
        self.boxes[slot] = Some(aabb);
    }

    fn update(&mut self, slot: usize, aabb: Aabb3D<T>) {
        if let Some(b @ Some(_)) = self.boxes.get_mut(slot) {
            *b = Some(aabb);
        }
    }

    fn remove(&mut self, slot: usize) {
        if let Some(b) = self.boxes.get_mut(slot) {
            b.take();
        }
        while matches!(self.boxes.last(), Some(None)) {
            self.boxes.pop();
        }
    }

    fn clear(&mut self) {
        self.boxes.clear();
    }

    fn query_point<'a>(&'a self, x: T, y: T, z: T) -> Box<dyn Iterator<Item = usize> + 'a> {
        self.matching(move |b| b.contains_point(x, y, z))
    }

    fn query_box<'a>(&'a self, aabb: Aabb3D<T>) -> Box<dyn Iterator<Item = usize> + 'a> {
        self.matching(move |b| b.overlaps(&aabb))
    }
}
