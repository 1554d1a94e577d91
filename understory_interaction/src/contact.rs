// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contact tracking: which controllers physically touch which objects.

use alloc::collections::{BTreeMap, BTreeSet};

use crate::event::{EventKind, EventQueue, Stage};
use crate::types::{ControllerId, ObjectId};

#[derive(Debug, Default)]
pub(crate) struct ContactTracker {
    touching: BTreeMap<ObjectId, BTreeSet<ControllerId>>,
}

impl ContactTracker {
    pub(crate) fn touching(&self, object: ObjectId) -> Option<&BTreeSet<ControllerId>> {
        self.touching.get(&object)
    }

    /// Replace the contact sets with this step's reports.
    pub(crate) fn update(
        &mut self,
        next: BTreeMap<ObjectId, BTreeSet<ControllerId>>,
        events: &mut EventQueue,
    ) {
        let objects: BTreeSet<ObjectId> =
            self.touching.keys().chain(next.keys()).copied().collect();
        let empty = BTreeSet::new();
        for object in objects {
            let old = self.touching.get(&object).unwrap_or(&empty);
            let new = next.get(&object).unwrap_or(&empty);
            for &c in old.difference(new) {
                events.push(Stage::Contact, object, EventKind::PerControllerContactEnd(c));
            }
            for &c in new.difference(old) {
                events.push(Stage::Contact, object, EventKind::PerControllerContactBegin(c));
            }
            if !old.is_empty() && new.is_empty() {
                events.push(Stage::Contact, object, EventKind::ContactEnd);
            } else if old.is_empty() && !new.is_empty() {
                events.push(Stage::Contact, object, EventKind::ContactBegin);
            }
        }
        self.touching = next;
        self.touching.retain(|_, s| !s.is_empty());
    }

    pub(crate) fn remove_object(
        &mut self,
        object: ObjectId,
        stage: Stage,
        events: &mut EventQueue,
    ) {
        let Some(set) = self.touching.remove(&object) else {
            return;
        };
        for c in set {
            events.push(stage, object, EventKind::PerControllerContactEnd(c));
        }
        events.push(stage, object, EventKind::ContactEnd);
    }

    pub(crate) fn remove_controller(
        &mut self,
        controller: ControllerId,
        stage: Stage,
        events: &mut EventQueue,
    ) {
        let mut emptied = alloc::vec::Vec::new();
        for (&object, set) in &mut self.touching {
            if set.remove(&controller) {
                events.push(stage, object, EventKind::PerControllerContactEnd(controller));
                if set.is_empty() {
                    emptied.push(object);
                }
            }
        }
        for object in emptied {
            self.touching.remove(&object);
            events.push(stage, object, EventKind::ContactEnd);
        }
    }

    pub(crate) fn stays(&self, events: &mut EventQueue) {
        for &object in self.touching.keys() {
            events.push(Stage::Stay, object, EventKind::ContactStay);
        }
    }
}
