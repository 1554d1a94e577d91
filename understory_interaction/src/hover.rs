// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hover and primary hover arbitration.
//!
//! Hover is computed per object: every tracked controller whose pose lies within the hover
//! radius of the object's colliders hovers it, and the nearest one is its closest controller.
//!
//! Primary hover runs the other way, per controller: among the objects a controller hovers, the
//! one nearest to any of its primary hover points becomes its primary hover. A controller has at
//! most one primary hover; an object may be the primary hover of several controllers.
//!
//! Exact distance ties keep whichever candidate was found first. Controllers are scanned in
//! ascending id order and objects in ascending id order, so ties resolve the same way every run.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use crate::event::{EventKind, EventQueue, Stage};
use crate::geometry::{self, Collider};
use crate::types::{ControllerFrame, ControllerId, ObjectFlags, ObjectId, Pose};

/// Hover state of one object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HoverState {
    /// Controllers hovering the object.
    pub hovering: BTreeSet<ControllerId>,
    /// The hovering controller nearest to the object, if any.
    pub closest: Option<ControllerId>,
    /// Distance from `closest` to the object's colliders.
    pub closest_distance: f32,
    distances: BTreeMap<ControllerId, f32>,
}

impl HoverState {
    fn recompute_closest(&mut self) {
        self.closest = None;
        self.closest_distance = 0.0;
        for (&c, &d) in &self.distances {
            if self.closest.is_none() || d < self.closest_distance {
                self.closest = Some(c);
                self.closest_distance = d;
            }
        }
    }
}

/// An object as the hover pass sees it.
#[derive(Copy, Clone, Debug)]
pub(crate) struct HoverObject<'a> {
    pub(crate) id: ObjectId,
    pub(crate) colliders: &'a [Collider],
    pub(crate) pose: Pose,
    pub(crate) flags: ObjectFlags,
}

#[derive(Debug, Default)]
pub(crate) struct HoverArbiter {
    states: BTreeMap<ObjectId, HoverState>,
    primary: BTreeMap<ControllerId, ObjectId>,
    primary_inverse: BTreeMap<ObjectId, BTreeSet<ControllerId>>,
    locked: BTreeSet<ControllerId>,
}

impl HoverArbiter {
    pub(crate) fn state(&self, object: ObjectId) -> Option<&HoverState> {
        self.states.get(&object)
    }

    pub(crate) fn primary(&self, controller: ControllerId) -> Option<ObjectId> {
        self.primary.get(&controller).copied()
    }

    pub(crate) fn primary_hovering(&self, object: ObjectId) -> Option<&BTreeSet<ControllerId>> {
        self.primary_inverse.get(&object)
    }

    pub(crate) fn set_locked(&mut self, controller: ControllerId, locked: bool) {
        if locked {
            self.locked.insert(controller);
        } else {
            self.locked.remove(&controller);
        }
    }

    /// Run one hover pass.
    ///
    /// Objects missing from `objects` (inactive or unregistered) lose all hover.
    pub(crate) fn update(
        &mut self,
        controllers: &[&ControllerFrame],
        objects: &[HoverObject<'_>],
        radius: f32,
        events: &mut EventQueue,
    ) {
        let mut hovered: BTreeMap<ControllerId, Vec<ObjectId>> = controllers
            .iter()
            .map(|c| (c.id, Vec::new()))
            .collect();
        let mut next: BTreeMap<ObjectId, HoverState> = BTreeMap::new();
        for object in objects {
            if object.flags.contains(ObjectFlags::IGNORE_HOVER) {
                continue;
            }
            let mut state = HoverState::default();
            for c in controllers {
                let d = geometry::distance(object.colliders, &object.pose, c.pose.position);
                if d >= radius {
                    continue;
                }
                state.hovering.insert(c.id);
                state.distances.insert(c.id, d);
                if let Some(list) = hovered.get_mut(&c.id) {
                    list.push(object.id);
                }
            }
            if !state.hovering.is_empty() {
                state.recompute_closest();
                next.insert(object.id, state);
            }
        }

        let touched: BTreeSet<ObjectId> = self.states.keys().chain(next.keys()).copied().collect();
        let empty = BTreeSet::new();
        for object in touched {
            let old = self.states.get(&object).map_or(&empty, |s| &s.hovering);
            let new = next.get(&object).map_or(&empty, |s| &s.hovering);
            for &c in old.difference(new) {
                events.push(Stage::Hover, object, EventKind::PerControllerHoverEnd(c));
            }
            for &c in new.difference(old) {
                events.push(Stage::Hover, object, EventKind::PerControllerHoverBegin(c));
            }
            if !old.is_empty() && new.is_empty() {
                events.push(Stage::Hover, object, EventKind::HoverEnd);
            } else if old.is_empty() && !new.is_empty() {
                events.push(Stage::Hover, object, EventKind::HoverBegin);
            }
        }
        self.states = next;

        let by_id: BTreeMap<ObjectId, &HoverObject<'_>> =
            objects.iter().map(|o| (o.id, o)).collect();
        let mut targets: BTreeMap<ControllerId, Option<ObjectId>> =
            self.primary.keys().map(|&c| (c, None)).collect();
        for c in controllers {
            let hovered = hovered.get(&c.id).map_or(&[][..], Vec::as_slice);
            let eligible = |id: ObjectId| {
                by_id
                    .get(&id)
                    .is_some_and(|o| !o.flags.contains(ObjectFlags::IGNORE_PRIMARY_HOVER))
            };
            let current = self.primary.get(&c.id).copied();
            let keep = current.filter(|&o| {
                self.locked.contains(&c.id)
                    && eligible(o)
                    && hovered.contains(&o)
            });
            let target = keep.or_else(|| {
                let mut best: Option<(ObjectId, f32)> = None;
                for &id in hovered {
                    let Some(o) = by_id.get(&id).filter(|_| eligible(id)) else {
                        continue;
                    };
                    for p in c.hover_points() {
                        let d = geometry::distance(o.colliders, &o.pose, p);
                        if best.is_none_or(|(_, b)| d < b) {
                            best = Some((id, d));
                        }
                    }
                }
                best.map(|(o, _)| o)
            });
            targets.insert(c.id, target);
        }
        // Aggregate primary events compare whole-step membership, so an object handed from one
        // controller to another in the same pass stays primary-hovered throughout.
        let before: BTreeSet<ObjectId> = self.primary_inverse.keys().copied().collect();
        for (c, target) in targets {
            self.assign_primary(c, target, events);
        }
        for &object in before.iter().filter(|o| !self.primary_inverse.contains_key(o)) {
            events.push(Stage::Hover, object, EventKind::PrimaryHoverEnd);
        }
        for &object in self.primary_inverse.keys().filter(|o| !before.contains(o)) {
            events.push(Stage::Hover, object, EventKind::PrimaryHoverBegin);
        }
    }

    /// Move `controller`'s primary hover to `target`, emitting per-controller events only.
    fn assign_primary(
        &mut self,
        controller: ControllerId,
        target: Option<ObjectId>,
        events: &mut EventQueue,
    ) {
        let current = self.primary.get(&controller).copied();
        if current == target {
            return;
        }
        if let Some(old) = current {
            self.primary.remove(&controller);
            events.push(
                Stage::Hover,
                old,
                EventKind::PerControllerPrimaryHoverEnd(controller),
            );
            if let Some(set) = self.primary_inverse.get_mut(&old) {
                set.remove(&controller);
                if set.is_empty() {
                    self.primary_inverse.remove(&old);
                }
            }
        }
        if let Some(new) = target {
            self.primary.insert(controller, new);
            events.push(
                Stage::Hover,
                new,
                EventKind::PerControllerPrimaryHoverBegin(controller),
            );
            self.primary_inverse.entry(new).or_default().insert(controller);
        }
    }

    /// Drop all hover of `object`, emitting ends in hover order.
    pub(crate) fn remove_object(
        &mut self,
        object: ObjectId,
        stage: Stage,
        events: &mut EventQueue,
    ) {
        let hovering = self.states.remove(&object).map(|s| s.hovering).unwrap_or_default();
        let primaries = self.primary_inverse.remove(&object).unwrap_or_default();
        for &c in &hovering {
            events.push(stage, object, EventKind::PerControllerHoverEnd(c));
        }
        for &c in &primaries {
            self.primary.remove(&c);
            events.push(stage, object, EventKind::PerControllerPrimaryHoverEnd(c));
        }
        if !hovering.is_empty() {
            events.push(stage, object, EventKind::HoverEnd);
        }
        if !primaries.is_empty() {
            events.push(stage, object, EventKind::PrimaryHoverEnd);
        }
    }

    /// Drop all hover by `controller`, emitting ends in hover order.
    pub(crate) fn remove_controller(
        &mut self,
        controller: ControllerId,
        stage: Stage,
        events: &mut EventQueue,
    ) {
        self.locked.remove(&controller);
        let mut emptied = Vec::new();
        for (&object, state) in &mut self.states {
            if state.hovering.remove(&controller) {
                events.push(stage, object, EventKind::PerControllerHoverEnd(controller));
                state.distances.remove(&controller);
                state.recompute_closest();
                if state.hovering.is_empty() {
                    emptied.push(object);
                }
            }
        }
        let primary = self.primary.remove(&controller);
        let mut primary_emptied = false;
        if let Some(object) = primary {
            events.push(stage, object, EventKind::PerControllerPrimaryHoverEnd(controller));
            if let Some(set) = self.primary_inverse.get_mut(&object) {
                set.remove(&controller);
                if set.is_empty() {
                    self.primary_inverse.remove(&object);
                    primary_emptied = true;
                }
            }
        }
        for &object in &emptied {
            self.states.remove(&object);
            events.push(stage, object, EventKind::HoverEnd);
        }
        if let (Some(object), true) = (primary, primary_emptied) {
            events.push(stage, object, EventKind::PrimaryHoverEnd);
        }
    }

    /// Stay events for every hovered and primary-hovered object.
    pub(crate) fn stays(&self, events: &mut EventQueue) {
        for &object in self.states.keys() {
            events.push(Stage::Stay, object, EventKind::HoverStay);
        }
        for &object in self.primary_inverse.keys() {
            events.push(Stage::Stay, object, EventKind::PrimaryHoverStay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chirality;
    use alloc::vec;
    use glam::Vec3;

    const A: ControllerId = ControllerId(1);
    const B: ControllerId = ControllerId(2);
    const O1: ObjectId = ObjectId::new(0, 1);
    const O2: ObjectId = ObjectId::new(1, 1);

    const BALL: [Collider; 1] = [Collider::Sphere {
        center: Vec3::ZERO,
        radius: 0.05,
    }];

    fn obj(id: ObjectId, x: f32) -> HoverObject<'static> {
        HoverObject {
            id,
            colliders: &BALL,
            pose: Pose::from_position(Vec3::new(x, 0.0, 0.0)),
            flags: ObjectFlags::empty(),
        }
    }

    fn hand(id: ControllerId, x: f32) -> ControllerFrame {
        ControllerFrame::new(id, Chirality::None, Pose::from_position(Vec3::new(x, 0.0, 0.0)))
    }

    fn kinds(q: &mut EventQueue) -> Vec<(ObjectId, EventKind)> {
        q.take_ordered().into_iter().map(|e| (e.object, e.kind)).collect()
    }

    #[test]
    fn enter_and_leave_follow_contract() {
        let mut h = HoverArbiter::default();
        let mut q = EventQueue::default();
        let a = hand(A, 0.0);
        h.update(&[&a], &[obj(O1, 0.1)], 0.2, &mut q);
        assert_eq!(
            kinds(&mut q),
            vec![
                (O1, EventKind::PerControllerPrimaryHoverBegin(A)),
                (O1, EventKind::PerControllerHoverBegin(A)),
                (O1, EventKind::PrimaryHoverBegin),
                (O1, EventKind::HoverBegin),
            ]
        );

        let a = hand(A, 1.0);
        h.update(&[&a], &[obj(O1, 0.1)], 0.2, &mut q);
        assert_eq!(
            kinds(&mut q),
            vec![
                (O1, EventKind::PerControllerHoverEnd(A)),
                (O1, EventKind::PerControllerPrimaryHoverEnd(A)),
                (O1, EventKind::HoverEnd),
                (O1, EventKind::PrimaryHoverEnd),
            ]
        );
        assert!(h.state(O1).is_none());
        assert_eq!(h.primary(A), None);
    }

    #[test]
    fn closest_and_primary_exclusivity() {
        let mut h = HoverArbiter::default();
        let mut q = EventQueue::default();
        let a = hand(A, 0.0);
        let b = hand(B, 0.25);
        let objects = [obj(O1, 0.1), obj(O2, 0.2)];
        h.update(&[&a, &b], &objects, 0.2, &mut q);

        let s1 = h.state(O1).unwrap();
        assert_eq!(s1.hovering, BTreeSet::from([A, B]));
        assert_eq!(s1.closest, Some(A));
        assert_eq!(h.primary(A), Some(O1));
        assert_eq!(h.primary(B), Some(O2));
        assert_eq!(h.state(O2).unwrap().closest, Some(B));
        for (c, o) in [(A, O1), (B, O2)] {
            assert!(h.state(o).unwrap().hovering.contains(&c));
        }
    }

    #[test]
    fn exact_tie_keeps_first_found() {
        let mut h = HoverArbiter::default();
        let mut q = EventQueue::default();
        let a = hand(A, 0.0);
        h.update(&[&a], &[obj(O1, -0.1), obj(O2, 0.1)], 0.2, &mut q);
        assert_eq!(h.primary(A), Some(O1));
    }

    #[test]
    fn ignore_primary_hover_still_hovers() {
        let mut h = HoverArbiter::default();
        let mut q = EventQueue::default();
        let a = hand(A, 0.0);
        let mut o = obj(O1, 0.1);
        o.flags = ObjectFlags::IGNORE_PRIMARY_HOVER;
        h.update(&[&a], &[o], 0.2, &mut q);
        assert!(h.state(O1).is_some());
        assert_eq!(h.primary(A), None);
    }

    #[test]
    fn primary_points_refine_choice() {
        let mut h = HoverArbiter::default();
        let mut q = EventQueue::default();
        // Palm is nearer O1, fingertip is nearer O2.
        let a = hand(A, 0.0).with_primary_hover_points(vec![Vec3::new(0.14, 0.0, 0.0)]);
        h.update(&[&a], &[obj(O1, -0.09), obj(O2, 0.15)], 0.2, &mut q);
        assert_eq!(h.state(O1).unwrap().closest, Some(A));
        assert_eq!(h.primary(A), Some(O2));
    }

    #[test]
    fn lock_keeps_primary_while_hovered() {
        let mut h = HoverArbiter::default();
        let mut q = EventQueue::default();
        let objects = [obj(O1, 0.0), obj(O2, 0.2)];
        h.update(&[&hand(A, 0.05)], &objects, 0.2, &mut q);
        assert_eq!(h.primary(A), Some(O1));
        h.set_locked(A, true);
        h.update(&[&hand(A, 0.14)], &objects, 0.2, &mut q);
        assert_eq!(h.primary(A), Some(O1));
        // Out of hover range of O1: the lock gives way.
        h.update(&[&hand(A, 0.3)], &objects, 0.2, &mut q);
        assert_eq!(h.primary(A), Some(O2));
    }

    #[test]
    fn removing_controller_ends_everything_it_hovered() {
        let mut h = HoverArbiter::default();
        let mut q = EventQueue::default();
        h.update(&[&hand(A, 0.0)], &[obj(O1, 0.1)], 0.2, &mut q);
        let _ = q.take();
        h.remove_controller(A, Stage::Tracking, &mut q);
        assert_eq!(
            kinds(&mut q),
            vec![
                (O1, EventKind::PerControllerHoverEnd(A)),
                (O1, EventKind::PerControllerPrimaryHoverEnd(A)),
                (O1, EventKind::HoverEnd),
                (O1, EventKind::PrimaryHoverEnd),
            ]
        );
        assert_eq!(h.primary(A), None);
        assert!(h.state(O1).is_none());
    }
}
