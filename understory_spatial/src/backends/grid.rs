// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform grid backend. Buckets boxes into cubic cells for local queries.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::types::{Aabb3D, GridScalar};

type CellKey = (i64, i64, i64);

/// Uniform grid backend.
///
/// Maps each AABB to the cells it covers. Queries visit only the covered cells
/// and de-duplicate candidates, so results are returned in ascending slot order.
///
/// Cell size should be on the order of the typical query box. Very large boxes
/// (a floor plane, say) cover many cells; keep those in a separate index or use
/// [`FlatVec`](crate::FlatVec).
pub struct Grid<T: GridScalar> {
    cell: T,
    origin: (T, T, T),
    entries: Vec<Option<Aabb3D<T>>>,
    cells: BTreeMap<CellKey, Vec<usize>>,
}

/// Uniform grid over `f32` coordinates.
pub type GridF32 = Grid<f32>;

/// Uniform grid over `f64` coordinates.
pub type GridF64 = Grid<f64>;

impl<T: GridScalar> Grid<T> {
    /// Create a grid with cubic cells of side `cell`, anchored at `origin`.
    ///
    /// Panics if `cell` is not strictly positive.
    pub fn new(cell: T, origin: (T, T, T)) -> Self {
        assert!(T::is_positive(cell), "cell size must be positive");
        Self {
            cell,
            origin,
            entries: Vec::new(),
            cells: BTreeMap::new(),
        }
    }

    fn key_for(&self, x: T, y: T, z: T) -> CellKey {
        (
            T::cell_of(x, self.origin.0, self.cell),
            T::cell_of(y, self.origin.1, self.cell),
            T::cell_of(z, self.origin.2, self.cell),
        )
    }

    fn cells_for_aabb(&self, a: &Aabb3D<T>) -> impl Iterator<Item = CellKey> + use<T> {
        let (x0, y0, z0) = self.key_for(a.min_x, a.min_y, a.min_z);
        let (x1, y1, z1) = self.key_for(a.max_x, a.max_y, a.max_z);
        (z0..=z1).flat_map(move |z| (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| (x, y, z))))
    }

    fn link(&mut self, slot: usize, aabb: &Aabb3D<T>) {
        let keys: Vec<CellKey> = self.cells_for_aabb(aabb).collect();
        for key in keys {
            self.cells.entry(key).or_default().push(slot);
        }
    }

    fn unlink(&mut self, slot: usize) {
        let Some(Some(aabb)) = self.entries.get(slot).copied() else {
            return;
        };
        let keys: Vec<CellKey> = self.cells_for_aabb(&aabb).collect();
        for key in keys {
            if let Some(slots) = self.cells.get_mut(&key) {
                if let Some(pos) = slots.iter().position(|&s| s == slot) {
                    slots.swap_remove(pos);
                }
                if slots.is_empty() {
                    self.cells.remove(&key);
                }
            }
        }
    }
}

impl<T: GridScalar> Backend<T> for Grid<T> {
    fn insert(&mut self, slot: usize, aabb: Aabb3D<T>) {
        if self.entries.len() <= slot {
            self.entries.resize_with(slot + 1, || None);
        }
        self.unlink(slot);
        self.entries[slot] = Some(aabb);
        self.link(slot, &aabb);
    }

    fn update(&mut self, slot: usize, aabb: Aabb3D<T>) {
        if slot >= self.entries.len() {
            return;
        }
        self.unlink(slot);
        self.entries[slot] = Some(aabb);
        self.link(slot, &aabb);
    }

    fn remove(&mut self, slot: usize) {
        self.unlink(slot);
        if let Some(e) = self.entries.get_mut(slot) {
            *e = None;
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.cells.clear();
    }

    fn query_point<'a>(&'a self, x: T, y: T, z: T) -> Box<dyn Iterator<Item = usize> + 'a> {
        let key = self.key_for(x, y, z);
        let mut set = BTreeSet::new();
        if let Some(slots) = self.cells.get(&key) {
            for &s in slots {
                if let Some(Some(a)) = self.entries.get(s)
                    && a.contains_point(x, y, z)
                {
                    set.insert(s);
                }
            }
        }
        Box::new(set.into_iter())
    }

    fn query_box<'a>(&'a self, aabb: Aabb3D<T>) -> Box<dyn Iterator<Item = usize> + 'a> {
        let mut set = BTreeSet::new();
        for key in self.cells_for_aabb(&aabb) {
            if let Some(slots) = self.cells.get(&key) {
                for &s in slots {
                    if let Some(Some(a)) = self.entries.get(s)
                        && a.overlaps(&aabb)
                    {
                        set.insert(s);
                    }
                }
            }
        }
        Box::new(set.into_iter())
    }
}

impl<T: GridScalar> Debug for Grid<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.entries.len();
        let alive = self.entries.iter().filter(|e| e.is_some()).count();
        f.debug_struct("Grid")
            .field("cell", &self.cell)
            .field("origin", &self.origin)
            .field("total_slots", &total)
            .field("alive", &alive)
            .field("cells", &self.cells.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn query_box_spans_negative_cells() {
        let mut g: GridF32 = Grid::new(1.0, (0.0, 0.0, 0.0));
        g.insert(0, Aabb3D::new(-1.5, -0.5, -0.5, -1.0, 0.5, 0.5));
        g.insert(1, Aabb3D::new(3.0, 3.0, 3.0, 4.0, 4.0, 4.0));
        let hits: Vec<usize> = g
            .query_box(Aabb3D::around_point(-1.2, 0.0, 0.0, 0.25))
            .collect();
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn update_moves_slot_between_cells() {
        let mut g: GridF32 = Grid::new(1.0, (0.0, 0.0, 0.0));
        g.insert(0, Aabb3D::new(0.1, 0.1, 0.1, 0.2, 0.2, 0.2));
        g.update(0, Aabb3D::new(5.1, 5.1, 5.1, 5.2, 5.2, 5.2));
        assert_eq!(g.query_point(0.15, 0.15, 0.15).count(), 0);
        assert_eq!(g.query_point(5.15, 5.15, 5.15).collect::<Vec<_>>(), vec![0]);
        assert_eq!(g.cells.len(), 1, "old cell should be dropped once empty");
    }

    #[test]
    fn straddling_box_is_reported_once() {
        let mut g: GridF64 = Grid::new(1.0, (0.0, 0.0, 0.0));
        g.insert(3, Aabb3D::new(0.5, 0.5, 0.5, 2.5, 2.5, 2.5));
        let hits: Vec<usize> = g.query_box(Aabb3D::new(0.0, 0.0, 0.0, 3.0, 3.0, 3.0)).collect();
        assert_eq!(hits, vec![3]);
    }
}
