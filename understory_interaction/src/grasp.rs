// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grasp arbitration: who holds what, suspension while a holder is untracked, and release.
//!
//! ## Transitions
//!
//! - Begin: a controller starts holding an object. On a single-grasp object any other holder
//!   is released first (a swap), and a holder suspended by lost tracking is released first on
//!   any object. The first holder saves the body's physical properties and prepares it for the
//!   object's movement strategy.
//! - End: a controller lets go. Ending the sole holder of a suspended object ends the suspension
//!   first. When the last holder leaves, the saved properties are restored and the throw
//!   strategy runs exactly once.
//! - Suspend / resume: the sole holder lost tracking; the object is frozen in place until the
//!   holder resumes, is rebound to a re-detected controller id, or times out.
//!
//! A swap carries the previous holder's latest scheduled pose into the new holder's grip offset,
//! so the object does not slip back to where it was before the last velocity step.
//!
//! Classifications are reconciled against each controller's previous classification, not
//! against the current grasp state. A controller whose object was taken by another controller
//! must therefore report something else before it can grasp that object again.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use glam::Vec3;
use tracing::{debug, warn};

use crate::config::InteractionConfig;
use crate::event::{EventKind, EventQueue, Stage};
use crate::movement::{blend_targets, freeze, grasp_offset};
use crate::registry::Registry;
use crate::throw::VelocityHistory;
use crate::types::{BodyState, Classification, ControllerId, ObjectFlags, ObjectId, Pose};

/// Everything a grasp transition reads or writes outside the arbiter itself.
#[derive(Debug)]
pub(crate) struct GraspContext<'a> {
    pub(crate) registry: &'a mut Registry,
    pub(crate) config: &'a InteractionConfig,
    pub(crate) events: &'a mut EventQueue,
    pub(crate) stage: Stage,
}

impl GraspContext<'_> {
    fn emit(&mut self, object: ObjectId, kind: EventKind) {
        self.events.push(self.stage, object, kind);
    }
}

/// Physical properties saved at grasp begin and restored at release.
#[derive(Copy, Clone, Debug)]
struct SavedBody {
    kinematic: bool,
    linear_damping: f32,
    angular_damping: f32,
}

impl SavedBody {
    fn of(body: &BodyState) -> Self {
        Self {
            kinematic: body.kinematic,
            linear_damping: body.linear_damping,
            angular_damping: body.angular_damping,
        }
    }

    fn restore(&self, body: &mut BodyState) {
        body.kinematic = self.kinematic;
        body.linear_damping = self.linear_damping;
        body.angular_damping = self.angular_damping;
    }
}

#[derive(Debug)]
struct GraspRecord {
    grasping: BTreeSet<ControllerId>,
    suspending: Option<ControllerId>,
    saved: SavedBody,
    /// Object pose relative to each holder's pose.
    offsets: BTreeMap<ControllerId, Pose>,
    latest_scheduled: Option<Pose>,
    history: VelocityHistory,
}

#[derive(Debug, Default)]
pub(crate) struct GraspArbiter {
    records: BTreeMap<ObjectId, GraspRecord>,
    by_controller: BTreeMap<ControllerId, ObjectId>,
    last_class: BTreeMap<ControllerId, Classification>,
    suppressed: BTreeSet<ControllerId>,
}

impl GraspArbiter {
    pub(crate) fn grasping(&self, object: ObjectId) -> Option<&BTreeSet<ControllerId>> {
        self.records.get(&object).map(|r| &r.grasping)
    }

    pub(crate) fn suspending(&self, object: ObjectId) -> Option<ControllerId> {
        self.records.get(&object).and_then(|r| r.suspending)
    }

    pub(crate) fn grasped_object(&self, controller: ControllerId) -> Option<ObjectId> {
        self.by_controller.get(&controller).copied()
    }

    pub(crate) fn held_objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.records.keys().copied()
    }

    /// Skip the next classification-driven transition for `controller`.
    pub(crate) fn suppress(&mut self, controller: ControllerId) {
        self.suppressed.insert(controller);
    }

    /// Start `controller` holding `object`. The caller has checked that both exist and that the
    /// object is graspable.
    pub(crate) fn begin(
        &mut self,
        controller: ControllerId,
        object: ObjectId,
        ctx: &mut GraspContext<'_>,
    ) {
        match self.by_controller.get(&controller).copied() {
            Some(current) if current == object => return,
            Some(current) => {
                let _ = self.end(controller, current, ctx);
            }
            None => {}
        }
        let multi = ctx
            .registry
            .get(object)
            .is_some_and(|r| r.flags.contains(ObjectFlags::ALLOW_MULTI_GRASP));
        let (suspending, holders) = match self.records.get(&object) {
            Some(rec) => (rec.suspending, rec.grasping.iter().copied().collect()),
            None => (None, Vec::new()),
        };
        let mut carried = None;
        if let Some(stale) = suspending {
            debug!(
                ?object,
                from = ?stale,
                to = ?controller,
                "grasp taken from suspended controller"
            );
            carried = self.end(stale, object, ctx);
        } else if !multi {
            for other in holders {
                debug!(?object, from = ?other, to = ?controller, "grasp swap");
                carried = self.end(other, object, ctx).or(carried);
            }
        }

        let Some(controller_pose) = ctx.registry.controller(controller).map(|r| r.frame.pose) else {
            return;
        };
        let keep = ctx.config.velocity_history_window;
        let Some(record) = ctx.registry.get_mut(object) else {
            return;
        };
        let movement = record.policy.movement.unwrap_or(ctx.config.default_movement);
        let throw = record.policy.throw.unwrap_or(ctx.config.default_throw);
        let first = !self.records.contains_key(&object);
        let rec = self.records.entry(object).or_insert_with(|| {
            let saved = SavedBody::of(&record.body);
            movement.prepare(&mut record.body);
            GraspRecord {
                grasping: BTreeSet::new(),
                suspending: None,
                saved,
                offsets: BTreeMap::new(),
                latest_scheduled: None,
                history: VelocityHistory::new(f64::from(keep.max(throw.lookback()))),
            }
        });
        let base = carried.unwrap_or(record.body.pose);
        rec.offsets
            .insert(controller, grasp_offset(&controller_pose, &base));
        rec.grasping.insert(controller);
        self.by_controller.insert(controller, object);
        debug!(?object, ?controller, "grasp begin");
        ctx.emit(object, EventKind::PerControllerGraspBegin(controller));
        if first {
            ctx.emit(object, EventKind::GraspBegin);
        }
    }

    /// Stop `controller` holding `object`.
    ///
    /// When this was the last holder, returns the pose a successor should pick the object up
    /// at: the latest scheduled pose if movement ran, else the current pose.
    pub(crate) fn end(
        &mut self,
        controller: ControllerId,
        object: ObjectId,
        ctx: &mut GraspContext<'_>,
    ) -> Option<Pose> {
        let rec = self.records.get_mut(&object)?;
        if !rec.grasping.contains(&controller) {
            return None;
        }
        if rec.grasping.len() == 1 {
            if let Some(s) = rec.suspending.take() {
                ctx.emit(object, EventKind::SuspensionEnd(s));
            }
        }
        rec.grasping.remove(&controller);
        rec.offsets.remove(&controller);
        self.by_controller.remove(&controller);
        debug!(?object, ?controller, "grasp end");
        ctx.emit(object, EventKind::PerControllerGraspEnd(controller));
        if !rec.grasping.is_empty() {
            return None;
        }

        let rec = self.records.remove(&object)?;
        let velocity = ctx
            .registry
            .controller(controller)
            .map_or(Vec3::ZERO, |r| r.frame.velocity);
        let mut carry = rec.latest_scheduled;
        if let Some(record) = ctx.registry.get_mut(object) {
            rec.saved.restore(&mut record.body);
            let throw = record.policy.throw.unwrap_or(ctx.config.default_throw);
            throw.release(&mut record.body, &rec.history, velocity);
            carry = carry.or(Some(record.body.pose));
        }
        ctx.emit(object, EventKind::GraspEnd);
        carry
    }

    /// Release every holder of `object`, in ascending controller order.
    pub(crate) fn release_object(&mut self, object: ObjectId, ctx: &mut GraspContext<'_>) {
        let holders: Vec<ControllerId> = self
            .grasping(object)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        for c in holders {
            let _ = self.end(c, object, ctx);
        }
    }

    /// The sole holder of an object lost tracking.
    ///
    /// Returns `false` when there was nothing to suspend. A holder sharing a multi-grasp object
    /// with others is released instead, and `false` is returned as well.
    pub(crate) fn suspend(&mut self, controller: ControllerId, ctx: &mut GraspContext<'_>) -> bool {
        let Some(object) = self.grasped_object(controller) else {
            return false;
        };
        let Some(rec) = self.records.get_mut(&object) else {
            return false;
        };
        if rec.grasping.len() > 1 {
            debug!(?object, ?controller, "untracked co-holder released");
            let _ = self.end(controller, object, ctx);
            return false;
        }
        if rec.suspending.is_none() {
            rec.suspending = Some(controller);
            rec.history.clear();
            rec.latest_scheduled = None;
            if let Some(record) = ctx.registry.get_mut(object) {
                freeze(&mut record.body);
            }
            debug!(?object, ?controller, "suspension begin");
            ctx.emit(object, EventKind::SuspensionBegin(controller));
        }
        true
    }

    /// The suspended holder regained tracking under its own id.
    pub(crate) fn resume(&mut self, controller: ControllerId, ctx: &mut GraspContext<'_>) {
        let Some(object) = self.grasped_object(controller) else {
            return;
        };
        let Some(rec) = self.records.get_mut(&object) else {
            return;
        };
        if rec.suspending != Some(controller) {
            return;
        }
        rec.suspending = None;
        if let (Some(c), Some(o)) = (
            ctx.registry.controller(controller),
            ctx.registry.get(object),
        ) {
            rec.offsets
                .insert(controller, grasp_offset(&c.frame.pose, &o.body.pose));
        }
        debug!(?object, ?controller, "suspension end: resumed");
        ctx.emit(object, EventKind::SuspensionEnd(controller));
    }

    /// Move everything `old` holds, suspends or has classified onto `new`.
    pub(crate) fn rebind(
        &mut self,
        old: ControllerId,
        new: ControllerId,
        ctx: &mut GraspContext<'_>,
    ) {
        if let Some(class) = self.last_class.remove(&old) {
            self.last_class.insert(new, class);
        }
        if self.suppressed.remove(&old) {
            self.suppressed.insert(new);
        }
        let Some(object) = self.by_controller.remove(&old) else {
            return;
        };
        self.by_controller.insert(new, object);
        let Some(rec) = self.records.get_mut(&object) else {
            return;
        };
        rec.grasping.remove(&old);
        rec.grasping.insert(new);
        rec.offsets.remove(&old);
        if let (Some(c), Some(o)) = (ctx.registry.controller(new), ctx.registry.get(object)) {
            rec.offsets
                .insert(new, grasp_offset(&c.frame.pose, &o.body.pose));
        }
        debug!(?object, ?old, ?new, "grasp rebound to re-detected controller");
        if rec.suspending.take().is_some() {
            ctx.emit(object, EventKind::SuspensionEnd(new));
        }
    }

    /// Forget a controller, releasing whatever it holds.
    pub(crate) fn remove_controller(
        &mut self,
        controller: ControllerId,
        ctx: &mut GraspContext<'_>,
    ) {
        if let Some(object) = self.grasped_object(controller) {
            let _ = self.end(controller, object, ctx);
        }
        self.last_class.remove(&controller);
        self.suppressed.remove(&controller);
    }

    /// Apply one classification result for a tracked controller.
    pub(crate) fn reconcile(
        &mut self,
        controller: ControllerId,
        class: Classification,
        ctx: &mut GraspContext<'_>,
    ) {
        let class = match class {
            Classification::Grasp(object) if !graspable(ctx.registry, object) => {
                warn!(?controller, ?object, "classification names an ungraspable object");
                Classification::Physics
            }
            other => other,
        };
        let prev = self
            .last_class
            .insert(controller, class)
            .unwrap_or(Classification::Physics);
        if self.suppressed.remove(&controller) || prev == class {
            return;
        }
        match (prev, class) {
            (_, Classification::Grasp(object)) => self.begin(controller, object, ctx),
            (Classification::Grasp(object), Classification::Physics) => {
                if self.grasped_object(controller) == Some(object) {
                    let _ = self.end(controller, object, ctx);
                }
            }
            (Classification::Physics, Classification::Physics) => {}
        }
    }

    /// Drive every held, unsuspended object toward its holders and record its motion.
    pub(crate) fn update_movement(&mut self, dt: f32, time: f64, ctx: &mut GraspContext<'_>) {
        for (&object, rec) in &mut self.records {
            if rec.suspending.is_some() {
                continue;
            }
            let targets: Vec<Pose> = rec
                .offsets
                .iter()
                .filter_map(|(c, offset)| Some(ctx.registry.controller(*c)?.frame.pose * *offset))
                .collect();
            let Some(target) = blend_targets(&targets) else {
                continue;
            };
            let Some(record) = ctx.registry.get_mut(object) else {
                continue;
            };
            let movement = record.policy.movement.unwrap_or(ctx.config.default_movement);
            let scheduled = movement.drive(&mut record.body, target, dt);
            if dt > 0.0 {
                rec.latest_scheduled = Some(scheduled);
                rec.history.record(time, scheduled.position);
            }
        }
    }

    pub(crate) fn stays(&self, events: &mut EventQueue) {
        for &object in self.records.keys() {
            events.push(Stage::Stay, object, EventKind::GraspStay);
        }
    }
}

/// Whether classification may start a grasp on `object`.
pub(crate) fn graspable(registry: &Registry, object: ObjectId) -> bool {
    registry
        .get(object)
        .is_some_and(|r| !r.misbehaving && !r.flags.contains(ObjectFlags::IGNORE_GRASP))
}
