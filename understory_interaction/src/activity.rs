// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Proximity activation: which objects are near enough to a controller to be worth simulating.
//!
//! Every registered object keeps its world AABB in a 3D index. Each step the activator queries
//! the index around every tracked controller, confirms candidates with an exact collider
//! distance, and then spreads activation through the engine's `touching` links up to a fixed
//! number of hops. Objects currently held are always active.

use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::vec::Vec;

use glam::Vec3;
use understory_spatial::{Aabb3D, GridF32, Index, IndexGeneric, Key};

use crate::config::Broadphase;
use crate::error::HostError;
use crate::geometry;
use crate::native::NativeEngine;
use crate::registry::Registry;
use crate::types::ObjectId;

#[derive(Debug)]
enum Spatial {
    Flat(Index<f32, ObjectId>),
    Grid(IndexGeneric<f32, ObjectId, GridF32>),
}

impl Spatial {
    fn insert(&mut self, aabb: Aabb3D<f32>, id: ObjectId) -> Key {
        match self {
            Self::Flat(i) => i.insert(aabb, id),
            Self::Grid(i) => i.insert(aabb, id),
        }
    }

    fn update(&mut self, key: Key, aabb: Aabb3D<f32>) {
        match self {
            Self::Flat(i) => i.update(key, aabb),
            Self::Grid(i) => i.update(key, aabb),
        }
    }

    fn remove(&mut self, key: Key) {
        match self {
            Self::Flat(i) => i.remove(key),
            Self::Grid(i) => i.remove(key),
        }
    }

    fn commit(&mut self) -> usize {
        match self {
            Self::Flat(i) => i.commit(),
            Self::Grid(i) => i.commit(),
        }
    }

    fn query(&self, aabb: Aabb3D<f32>, out: &mut Vec<ObjectId>) {
        match self {
            Self::Flat(i) => out.extend(i.query_box(aabb).map(|(_, id)| id)),
            Self::Grid(i) => out.extend(i.query_box(aabb).map(|(_, id)| id)),
        }
    }
}

/// Outcome of one activation pass.
#[derive(Debug, Default)]
pub(crate) struct ActivationReport {
    pub(crate) activated: Vec<ObjectId>,
    pub(crate) deactivated: Vec<ObjectId>,
    pub(crate) failed: Vec<(ObjectId, HostError)>,
}

#[derive(Debug)]
pub(crate) struct ProximityActivator {
    spatial: Spatial,
    keys: BTreeMap<ObjectId, Key>,
    active: BTreeSet<ObjectId>,
}

impl ProximityActivator {
    pub(crate) fn new(broadphase: Broadphase) -> Self {
        let spatial = match broadphase {
            Broadphase::Flat => Spatial::Flat(Index::new()),
            Broadphase::Grid { cell } => {
                Spatial::Grid(Index::<f32, ObjectId>::with_uniform_grid(cell, (0.0, 0.0, 0.0)))
            }
        };
        Self {
            spatial,
            keys: BTreeMap::new(),
            active: BTreeSet::new(),
        }
    }

    /// Insert or move an object's bounds. Takes effect at the next [`Self::update`].
    pub(crate) fn sync(&mut self, id: ObjectId, aabb: Aabb3D<f32>) {
        match self.keys.get(&id) {
            Some(&key) => self.spatial.update(key, aabb),
            None => {
                let key = self.spatial.insert(aabb, id);
                self.keys.insert(id, key);
            }
        }
    }

    /// Forget an object. Returns whether it was active, in which case the caller owes the engine
    /// a `deactivate`.
    pub(crate) fn remove(&mut self, id: ObjectId) -> bool {
        if let Some(key) = self.keys.remove(&id) {
            self.spatial.remove(key);
        }
        self.active.remove(&id)
    }

    pub(crate) fn is_active(&self, id: ObjectId) -> bool {
        self.active.contains(&id)
    }

    pub(crate) fn active(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.active.iter().copied()
    }

    /// Recompute the active set and run the engine's activation hooks for the difference.
    ///
    /// Misbehaving objects never become active; failing hooks are reported, not retried.
    pub(crate) fn update<E: NativeEngine + ?Sized>(
        &mut self,
        registry: &Registry,
        controllers: &[Vec3],
        held: impl IntoIterator<Item = ObjectId>,
        radius: f32,
        max_depth: u32,
        engine: &mut E,
    ) -> ActivationReport {
        let _ = self.spatial.commit();
        let eligible = |id: ObjectId| registry.get(id).is_some_and(|r| !r.misbehaving);

        let mut next = BTreeSet::new();
        let mut frontier = VecDeque::new();
        let mut hits = Vec::new();
        for &p in controllers {
            hits.clear();
            self.spatial.query(Aabb3D::around_point(p.x, p.y, p.z, radius), &mut hits);
            for &id in &hits {
                let Some(record) = registry.get(id).filter(|r| !r.misbehaving) else {
                    continue;
                };
                if geometry::distance(&record.colliders, &record.body.pose, p) <= radius
                    && next.insert(id)
                {
                    frontier.push_back((id, 0));
                }
            }
        }
        for id in held {
            if eligible(id) && next.insert(id) {
                frontier.push_back((id, 0));
            }
        }
        while let Some((id, depth)) = frontier.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for other in engine.touching(id) {
                if eligible(other) && next.insert(other) {
                    frontier.push_back((other, depth + 1));
                }
            }
        }

        let mut report = ActivationReport::default();
        for &id in self.active.difference(&next) {
            match engine.deactivate(id) {
                Ok(()) => report.deactivated.push(id),
                Err(e) => report.failed.push((id, e)),
            }
        }
        for &id in next.difference(&self.active) {
            match engine.activate(id) {
                Ok(()) => report.activated.push(id),
                Err(e) => report.failed.push((id, e)),
            }
        }
        for (id, _) in &report.failed {
            next.remove(id);
        }
        self.active = next;
        report
    }
}
