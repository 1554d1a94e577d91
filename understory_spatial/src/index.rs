// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public `Index` API and generic implementation over a pluggable backend.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::backends::flatvec::FlatVec;
use crate::backends::grid::Grid;
use crate::types::{Aabb3D, GridScalar};

/// Generational handle for entries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Key(u32, u32);

impl Key {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Index keys are intentionally 32-bit; higher bits are truncated by design."
    )]
    const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mark {
    Added,
    Updated,
    Removed,
}

#[derive(Clone, Debug)]
struct Entry<T, P> {
    generation: u32,
    aabb: Aabb3D<T>,
    payload: P,
    mark: Option<Mark>,
}

/// A generic AABB index parameterized by a spatial backend.
///
/// Mutations are staged and only become visible to queries after [`IndexGeneric::commit`].
#[derive(Debug)]
pub struct IndexGeneric<T: Copy + PartialOrd + Debug, P: Copy + Debug, B: Backend<T>> {
    entries: Vec<Option<Entry<T, P>>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    backend: B,
}

impl<T, P, B> IndexGeneric<T, P, B>
where
    T: Copy + PartialOrd + Debug,
    P: Copy + Debug,
    B: Backend<T> + Default,
{
    /// Create an empty index using the backend's default constructor.
    pub fn new() -> Self {
        Self::with_backend(B::default())
    }
}

impl<T, P, B> IndexGeneric<T, P, B>
where
    T: Copy + PartialOrd + Debug,
    P: Copy + Debug,
    B: Backend<T>,
{
    /// Create an empty index over an explicitly constructed backend.
    pub fn with_backend(backend: B) -> Self {
        Self {
            entries: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            backend,
        }
    }

    /// Number of live entries, including ones staged but not yet committed.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .flatten()
            .filter(|e| e.mark != Some(Mark::Removed))
            .count()
    }

    /// Whether the index holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a new AABB with payload. Returns a stable handle `Key`.
    pub fn insert(&mut self, aabb: Aabb3D<T>, payload: P) -> Key {
        let entry = |generation| Entry {
            generation,
            aabb,
            payload,
            mark: Some(Mark::Added),
        };
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.entries[idx] = Some(entry(generation));
            Key::new(idx, generation)
        } else {
            self.entries.push(Some(entry(1)));
            self.generations.push(1);
            Key::new(self.entries.len() - 1, 1)
        }
    }

    /// Update an existing AABB. Stale keys are ignored.
    pub fn update(&mut self, key: Key, aabb: Aabb3D<T>) {
        if let Some(e) = self.entry_mut(key) {
            e.aabb = aabb;
            e.mark = Some(match e.mark {
                Some(Mark::Added) => Mark::Added,
                _ => Mark::Updated,
            });
        }
    }

    /// Remove an existing AABB. Stale keys are ignored.
    pub fn remove(&mut self, key: Key) {
        if let Some(e) = self.entry_mut(key) {
            if matches!(e.mark, Some(Mark::Added)) {
                // Never reached the backend.
                self.entries[key.idx()] = None;
                self.free_list.push(key.idx());
            } else {
                e.mark = Some(Mark::Removed);
            }
        }
    }

    /// Payload stored under `key`, if the key is live.
    pub fn get(&self, key: Key) -> Option<P> {
        let e = self.entries.get(key.idx())?.as_ref()?;
        (e.generation == key.1 && e.mark != Some(Mark::Removed)).then_some(e.payload)
    }

    /// Clear the index.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.generations.clear();
        self.free_list.clear();
        self.backend.clear();
    }

    /// Apply pending changes to the backend. Returns the number of staged changes applied.
    pub fn commit(&mut self) -> usize {
        let mut applied = 0;
        for i in 0..self.entries.len() {
            let Some(entry) = self.entries[i].as_mut() else {
                continue;
            };
            match entry.mark.take() {
                Some(Mark::Added) => self.backend.insert(i, entry.aabb),
                Some(Mark::Updated) => self.backend.update(i, entry.aabb),
                Some(Mark::Removed) => {
                    self.backend.remove(i);
                    self.entries[i] = None;
                    self.free_list.push(i);
                }
                None => continue,
            }
            applied += 1;
        }
        applied
    }

    /// Query for committed entries whose AABB contains the point.
    pub fn query_point(&self, x: T, y: T, z: T) -> impl Iterator<Item = (Key, P)> + '_ {
        self.resolve(self.backend.query_point(x, y, z))
    }

    /// Query for committed entries whose AABB overlaps the given box.
    pub fn query_box(&self, aabb: Aabb3D<T>) -> impl Iterator<Item = (Key, P)> + '_ {
        self.resolve(self.backend.query_box(aabb))
    }

    fn resolve<'a>(
        &'a self,
        slots: impl Iterator<Item = usize> + 'a,
    ) -> impl Iterator<Item = (Key, P)> + 'a {
        slots.filter_map(move |i| {
            let e = self.entries.get(i)?.as_ref()?;
            Some((Key::new(i, e.generation), e.payload))
        })
    }

    fn entry_mut(&mut self, key: Key) -> Option<&mut Entry<T, P>> {
        let e = self.entries.get_mut(key.idx())?.as_mut()?;
        (e.generation == key.1 && e.mark != Some(Mark::Removed)).then_some(e)
    }
}

/// Default index using a flat vector backend.
pub type Index<T, P> = IndexGeneric<T, P, FlatVec<T>>;

impl<T: Copy + PartialOrd + Debug, P: Copy + Debug> Default for Index<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: GridScalar, P: Copy + Debug> Index<T, P> {
    /// Create a grid-backed index with cubic cells of side `cell` and an explicit origin.
    pub fn with_uniform_grid(cell: T, origin: (T, T, T)) -> IndexGeneric<T, P, Grid<T>> {
        IndexGeneric::with_backend(Grid::new(cell, origin))
    }
}
