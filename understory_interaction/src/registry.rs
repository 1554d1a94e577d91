// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry: the live sets of objects and controllers. Pure bookkeeping, no policy.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::geometry::Collider;
use crate::types::{
    BodyState, ControllerFrame, ControllerId, GraspPolicy, ObjectDesc, ObjectFlags, ObjectId,
};

/// A registered object.
#[derive(Clone, Debug)]
pub(crate) struct ObjectRecord {
    pub(crate) colliders: Vec<Collider>,
    pub(crate) flags: ObjectFlags,
    pub(crate) policy: GraspPolicy,
    pub(crate) body: BodyState,
    /// A host callback serving this object failed; it is unregistered at the next safe point.
    pub(crate) misbehaving: bool,
}

impl From<ObjectDesc> for ObjectRecord {
    fn from(desc: ObjectDesc) -> Self {
        Self {
            colliders: desc.colliders,
            flags: desc.flags,
            policy: desc.policy,
            body: desc.body,
            misbehaving: false,
        }
    }
}

/// A registered controller and its latest sample.
#[derive(Clone, Debug)]
pub(crate) struct ControllerRecord {
    pub(crate) frame: ControllerFrame,
    pub(crate) tracked: bool,
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    record: ObjectRecord,
}

/// Objects in generational slots, controllers by raw id.
#[derive(Clone, Debug, Default)]
pub(crate) struct Registry {
    slots: Vec<Option<Slot>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    controllers: BTreeMap<ControllerId, ControllerRecord>,
}

impl Registry {
    pub(crate) fn insert(&mut self, record: ObjectRecord) -> ObjectId {
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(Slot { generation, record });
            return object_id(idx, generation);
        }
        self.slots.push(Some(Slot {
            generation: 1,
            record,
        }));
        self.generations.push(1);
        object_id(self.slots.len() - 1, 1)
    }

    /// Remove an object. Unknown or stale ids yield `None`.
    pub(crate) fn remove(&mut self, id: ObjectId) -> Option<ObjectRecord> {
        self.get(id)?;
        let slot = self.slots[id.idx()].take()?;
        self.free_list.push(id.idx());
        Some(slot.record)
    }

    pub(crate) fn get(&self, id: ObjectId) -> Option<&ObjectRecord> {
        let slot = self.slots.get(id.idx())?.as_ref()?;
        (slot.generation == id.1).then_some(&slot.record)
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut ObjectRecord> {
        let slot = self.slots.get_mut(id.idx())?.as_mut()?;
        (slot.generation == id.1).then_some(&mut slot.record)
    }

    pub(crate) fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// Live objects in ascending id order.
    pub(crate) fn objects(&self) -> impl Iterator<Item = (ObjectId, &ObjectRecord)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            let s = s.as_ref()?;
            Some((object_id(i, s.generation), &s.record))
        })
    }

    pub(crate) fn object_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Insert or refresh a controller. Returns `true` if it was not registered before.
    pub(crate) fn upsert_controller(&mut self, frame: ControllerFrame, tracked: bool) -> bool {
        match self.controllers.get_mut(&frame.id) {
            Some(record) => {
                record.frame = frame;
                record.tracked = tracked;
                false
            }
            None => {
                self.controllers.insert(frame.id, ControllerRecord { frame, tracked });
                true
            }
        }
    }

    pub(crate) fn remove_controller(&mut self, id: ControllerId) -> Option<ControllerRecord> {
        self.controllers.remove(&id)
    }

    pub(crate) fn controller(&self, id: ControllerId) -> Option<&ControllerRecord> {
        self.controllers.get(&id)
    }

    pub(crate) fn controller_mut(&mut self, id: ControllerId) -> Option<&mut ControllerRecord> {
        self.controllers.get_mut(&id)
    }

    /// Tracked controllers in ascending id order.
    pub(crate) fn tracked_controllers(&self) -> impl Iterator<Item = &ControllerFrame> + '_ {
        self.controllers
            .values()
            .filter(|c| c.tracked)
            .map(|c| &c.frame)
    }

    pub(crate) fn controller_ids(&self) -> impl Iterator<Item = ControllerId> + '_ {
        self.controllers.keys().copied()
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Object ids are 32-bit; more than u32::MAX live objects is unsupported."
)]
fn object_id(idx: usize, generation: u32) -> ObjectId {
    ObjectId::new(idx as u32, generation)
}
