// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The seam to the native shape and classification engine.
//!
//! The manager never decides on its own whether a hand is holding something. Each step it asks
//! a [`NativeEngine`] to classify every tracked controller against the active objects within
//! touch range of it, nearest first, and to report which of them it physically touches. The
//! engine also owns whatever native representation an object needs while active.
//!
//! [`HeuristicEngine`] is a small reference engine driven by [`ControllerFrame::grip`]. It is
//! good enough for demos, benchmarks and tests; production hosts wrap their hand-tracking and
//! physics layers instead.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use crate::error::HostError;
use crate::types::{Candidate, Classification, ControllerFrame, ControllerId, ObjectId};

/// Host-provided classification and lifecycle hooks.
pub trait NativeEngine {
    /// Build the native representation of an object that became active.
    ///
    /// An error marks the object misbehaving.
    fn activate(&mut self, object: ObjectId) -> Result<(), HostError> {
        let _ = object;
        Ok(())
    }

    /// Tear down the native representation of an object that became inactive or was removed.
    ///
    /// An error marks the object misbehaving.
    fn deactivate(&mut self, object: ObjectId) -> Result<(), HostError> {
        let _ = object;
        Ok(())
    }

    /// Classify `controller` this step.
    ///
    /// `candidates` are the graspable active objects within the touch activation radius of the
    /// controller, nearest first.
    ///
    /// A grasp must name one of `candidates`, or the object the controller already holds
    /// (which may have drifted out of range while carried). Anything else is treated as
    /// [`Classification::Physics`], the same way contacts outside `candidates` are dropped.
    fn classify(
        &mut self,
        controller: &ControllerFrame,
        candidates: &[Candidate],
    ) -> Classification;

    /// Objects among `candidates` that `controller`'s physical proxy touches this step.
    ///
    /// Objects outside `candidates` are ignored.
    fn contacts(
        &mut self,
        controller: &ControllerFrame,
        candidates: &[Candidate],
    ) -> Vec<ObjectId> {
        let _ = (controller, candidates);
        Vec::new()
    }

    /// Objects resting against or attached to `object`; activation spreads along these links.
    fn touching(&self, object: ObjectId) -> Vec<ObjectId> {
        let _ = object;
        Vec::new()
    }
}

/// Grip-strength reference engine.
///
/// A controller closes its hand when [`ControllerFrame::grip`] reaches `grip_threshold` and
/// opens it again only once grip falls to `release_threshold`. A closed hand grasps its
/// nearest candidate within `touch_radius` and keeps that object until it opens.
#[derive(Clone, Debug)]
pub struct HeuristicEngine {
    /// Grip strength at which a hand closes.
    pub grip_threshold: f32,
    /// Grip strength at which a closed hand opens.
    pub release_threshold: f32,
    /// Candidates nearer than this are touched and graspable.
    pub touch_radius: f32,
    closed: BTreeSet<ControllerId>,
    held: BTreeMap<ControllerId, ObjectId>,
    links: BTreeMap<ObjectId, BTreeSet<ObjectId>>,
}

impl Default for HeuristicEngine {
    fn default() -> Self {
        Self::new(0.075)
    }
}

impl HeuristicEngine {
    /// An engine with the default grip thresholds (0.7 closes, 0.3 opens).
    pub fn new(touch_radius: f32) -> Self {
        Self {
            grip_threshold: 0.7,
            release_threshold: 0.3,
            touch_radius,
            closed: BTreeSet::new(),
            held: BTreeMap::new(),
            links: BTreeMap::new(),
        }
    }

    /// Record that `a` and `b` touch, so activating either spreads to the other.
    pub fn link(&mut self, a: ObjectId, b: ObjectId) {
        self.links.entry(a).or_default().insert(b);
        self.links.entry(b).or_default().insert(a);
    }

    /// Remove every link involving `object`.
    pub fn unlink(&mut self, object: ObjectId) {
        if let Some(others) = self.links.remove(&object) {
            for other in others {
                if let Some(set) = self.links.get_mut(&other) {
                    set.remove(&object);
                }
            }
        }
    }

    /// Whether `controller`'s hand is currently closed.
    pub fn is_closed(&self, controller: ControllerId) -> bool {
        self.closed.contains(&controller)
    }
}

impl NativeEngine for HeuristicEngine {
    fn deactivate(&mut self, object: ObjectId) -> Result<(), HostError> {
        self.held.retain(|_, o| *o != object);
        Ok(())
    }

    fn classify(
        &mut self,
        controller: &ControllerFrame,
        candidates: &[Candidate],
    ) -> Classification {
        let id = controller.id;
        if controller.grip >= self.grip_threshold {
            self.closed.insert(id);
        } else if controller.grip <= self.release_threshold {
            self.closed.remove(&id);
            self.held.remove(&id);
        }
        if !self.closed.contains(&id) {
            return Classification::Physics;
        }
        if let Some(&object) = self.held.get(&id) {
            return Classification::Grasp(object);
        }
        match candidates.first() {
            Some(c) if c.distance <= self.touch_radius => {
                self.held.insert(id, c.object);
                Classification::Grasp(c.object)
            }
            _ => Classification::Physics,
        }
    }

    fn contacts(
        &mut self,
        _controller: &ControllerFrame,
        candidates: &[Candidate],
    ) -> Vec<ObjectId> {
        candidates
            .iter()
            .filter(|c| c.distance <= self.touch_radius)
            .map(|c| c.object)
            .collect()
    }

    fn touching(&self, object: ObjectId) -> Vec<ObjectId> {
        self.links
            .get(&object)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }
}
