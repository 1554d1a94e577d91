// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The interaction manager: registration, the per-step pipeline, and queries.
//!
//! ## Step pipeline
//!
//! [`InteractionManager::step`] runs, in order:
//!
//! 1. Safe point: objects marked misbehaving since the last step are unregistered, and the
//!    engine tears down native state of objects removed since then.
//! 2. Tracking continuity: lost holders are suspended, re-detected hands are reconnected,
//!    expired suspensions are released, and untracked hands holding nothing are dropped.
//! 3. Activation around every tracked controller.
//! 4. Hover and primary hover.
//! 5. Contact.
//! 6. Grasp: each tracked controller's classification is reconciled in ascending id order,
//!    then held objects are moved.
//! 7. Stay events.
//!
//! The step's events are then ordered (see [`event`](crate::event)) and delivered to observers.
//!
//! Explicit calls outside a step (`unregister`, `grasp`, `release`, `set_flags`, ...) apply
//! immediately and deliver their events in emission order.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use glam::Vec3;
use tracing::{debug, trace, warn};

use crate::activity::ProximityActivator;
use crate::config::InteractionConfig;
use crate::contact::ContactTracker;
use crate::dispatch::{Command, CommandQueue, EventDispatcher, InteractionObserver, ObserverId};
use crate::error::{ConfigError, HostError, InteractionError};
use crate::event::{EventCategories, EventQueue, InteractionEvent, Stage};
use crate::geometry;
use crate::grasp::{GraspArbiter, GraspContext};
use crate::hover::{HoverArbiter, HoverObject, HoverState};
use crate::native::NativeEngine;
use crate::registry::Registry;
use crate::tracking::{LogicalHand, TrackingContinuityTracker};
use crate::types::{
    BodyState, Candidate, Classification, ControllerFrame, ControllerId, ObjectDesc, ObjectFlags,
    ObjectId, TrackingFrame,
};

/// Rounds of observer commands applied after one delivery before the rest are dropped.
const MAX_COMMAND_ROUNDS: usize = 8;

macro_rules! grasp_ctx {
    ($self:ident, $stage:expr) => {
        &mut GraspContext {
            registry: &mut $self.registry,
            config: &$self.config,
            events: &mut $self.events,
            stage: $stage,
        }
    };
}

/// Owns every registered object and controller and arbitrates their interactions.
///
/// Managers share no state; several can run side by side.
#[derive(Debug)]
pub struct InteractionManager {
    config: InteractionConfig,
    registry: Registry,
    activator: ProximityActivator,
    hover: HoverArbiter,
    contact: ContactTracker,
    grasp: GraspArbiter,
    tracking: TrackingContinuityTracker,
    dispatcher: EventDispatcher,
    events: EventQueue,
    pending_unregister: BTreeSet<ObjectId>,
    pending_teardown: Vec<ObjectId>,
    time: Option<f64>,
}

impl Default for InteractionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionManager {
    /// A manager with the default configuration.
    pub fn new() -> Self {
        Self::build(InteractionConfig::default())
    }

    /// A manager with a custom configuration, validated first.
    pub fn with_config(config: InteractionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: InteractionConfig) -> Self {
        Self {
            activator: ProximityActivator::new(config.broadphase),
            config,
            registry: Registry::default(),
            hover: HoverArbiter::default(),
            contact: ContactTracker::default(),
            grasp: GraspArbiter::default(),
            tracking: TrackingContinuityTracker::default(),
            dispatcher: EventDispatcher::default(),
            events: EventQueue::default(),
            pending_unregister: BTreeSet::new(),
            pending_teardown: Vec::new(),
            time: None,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    // --- Registration ---

    /// Register an object. It takes part in interaction from the next step.
    pub fn register(&mut self, desc: ObjectDesc) -> ObjectId {
        let aabb = geometry::world_aabb(&desc.colliders, &desc.body.pose);
        let id = self.registry.insert(desc.into());
        self.activator.sync(id, aabb);
        debug!(object = ?id, "registered");
        id
    }

    /// Unregister an object, releasing its grasps and ending its contact and hover first.
    ///
    /// Unknown or stale ids are a no-op.
    pub fn unregister(&mut self, object: ObjectId) -> Vec<InteractionEvent> {
        self.remove_object(object, Stage::Grasp);
        self.flush()
    }

    /// Register a controller ahead of its first tracking sample, or refresh its sample.
    ///
    /// Refreshing a controller that lost tracking while holding something resumes its grasp,
    /// exactly as if it had reappeared in a step's frame. A controller that is absent from the
    /// next step's frame is dropped unless it holds something.
    pub fn register_controller(&mut self, frame: ControllerFrame) -> Vec<InteractionEvent> {
        let now = self.time.unwrap_or(0.0);
        let id = frame.id;
        let resumed = if self.tracking.hand(id).is_some() {
            self.tracking.refresh(&frame, now)
        } else {
            let _ = self.tracking.create(&frame, now);
            false
        };
        let _ = self.registry.upsert_controller(frame, true);
        if resumed {
            debug!(controller = ?id, "tracking restored by registration");
            self.grasp.resume(id, grasp_ctx!(self, Stage::Tracking));
        }
        self.flush()
    }

    /// Unregister a controller, releasing whatever it holds. Unknown ids are a no-op.
    pub fn unregister_controller(&mut self, controller: ControllerId) -> Vec<InteractionEvent> {
        self.remove_controller(controller, Stage::Grasp);
        self.flush()
    }

    // --- Object state ---

    /// Replace an object's physical state, for example after the host's physics step.
    pub fn set_body(&mut self, object: ObjectId, body: BodyState) -> Result<(), InteractionError> {
        let record = self
            .registry
            .get_mut(object)
            .ok_or(InteractionError::UnknownObject(object))?;
        record.body = body;
        let aabb = geometry::world_aabb(&record.colliders, &record.body.pose);
        self.activator.sync(object, aabb);
        Ok(())
    }

    /// Replace an object's flags. Setting [`ObjectFlags::IGNORE_GRASP`] on a held object
    /// releases it immediately, and clearing [`ObjectFlags::ALLOW_MULTI_GRASP`] keeps only its
    /// lowest-id holder. Hover and contact flags apply from the next step.
    pub fn set_flags(
        &mut self,
        object: ObjectId,
        flags: ObjectFlags,
    ) -> Result<Vec<InteractionEvent>, InteractionError> {
        let record = self
            .registry
            .get_mut(object)
            .ok_or(InteractionError::UnknownObject(object))?;
        record.flags = flags;
        let holders: Vec<ControllerId> = self.grasping_controllers(object).collect();
        if flags.contains(ObjectFlags::IGNORE_GRASP) && !holders.is_empty() {
            debug!(?object, "grasp now ignored; releasing");
            self.release_all(object);
        } else if !flags.contains(ObjectFlags::ALLOW_MULTI_GRASP) && holders.len() > 1 {
            debug!(?object, "multi-grasp disallowed; keeping one holder");
            for &c in &holders[1..] {
                let _ = self.grasp.end(c, object, grasp_ctx!(self, Stage::Grasp));
                self.grasp.suppress(c);
            }
        }
        Ok(self.flush())
    }

    // --- Grasp control ---

    /// Make `controller` grasp `object`, bypassing classification.
    ///
    /// The controller's next classification-driven transition is skipped, so the engine does not
    /// immediately contradict the call. A single-grasp object held by another tracked controller
    /// is refused; one held only by a suspended controller is taken over.
    pub fn grasp(
        &mut self,
        controller: ControllerId,
        object: ObjectId,
    ) -> Result<Vec<InteractionEvent>, InteractionError> {
        let record = self
            .registry
            .get(object)
            .ok_or(InteractionError::UnknownObject(object))?;
        let tracked = self
            .registry
            .controller(controller)
            .ok_or(InteractionError::UnknownController(controller))?
            .tracked;
        if !tracked {
            return Err(InteractionError::ControllerUntracked(controller));
        }
        if record.misbehaving || record.flags.contains(ObjectFlags::IGNORE_GRASP) {
            return Err(InteractionError::GraspIgnored(object));
        }
        if !record.flags.contains(ObjectFlags::ALLOW_MULTI_GRASP)
            && self.grasp.suspending(object).is_none()
        {
            let holder = self
                .grasp
                .grasping(object)
                .and_then(|s| s.iter().copied().find(|&c| c != controller));
            if let Some(by) = holder {
                return Err(InteractionError::AlreadyGrasped { object, by });
            }
        }
        self.grasp.begin(controller, object, grasp_ctx!(self, Stage::Grasp));
        self.grasp.suppress(controller);
        Ok(self.flush())
    }

    /// Make `controller` let go of whatever it holds, bypassing classification.
    pub fn release(
        &mut self,
        controller: ControllerId,
    ) -> Result<Vec<InteractionEvent>, InteractionError> {
        if self.registry.controller(controller).is_none() {
            return Err(InteractionError::UnknownController(controller));
        }
        let object = self
            .grasp
            .grasped_object(controller)
            .ok_or(InteractionError::NotGrasping { controller })?;
        let _ = self.grasp.end(controller, object, grasp_ctx!(self, Stage::Grasp));
        self.grasp.suppress(controller);
        Ok(self.flush())
    }

    /// Release every grasp on `object`.
    pub fn release_object(
        &mut self,
        object: ObjectId,
    ) -> Result<Vec<InteractionEvent>, InteractionError> {
        if !self.registry.contains(object) {
            return Err(InteractionError::UnknownObject(object));
        }
        if self.grasp.grasping(object).is_none() {
            return Err(InteractionError::ObjectNotGrasped(object));
        }
        self.release_all(object);
        Ok(self.flush())
    }

    /// Pin `controller`'s current primary hover while it stays hovered.
    pub fn lock_primary_hover(
        &mut self,
        controller: ControllerId,
        locked: bool,
    ) -> Result<(), InteractionError> {
        if self.registry.controller(controller).is_none() {
            return Err(InteractionError::UnknownController(controller));
        }
        self.hover.set_locked(controller, locked);
        Ok(())
    }

    // --- Observers ---

    /// Subscribe an observer to `categories`. Observers run in subscription order.
    pub fn add_observer(
        &mut self,
        categories: EventCategories,
        observer: impl InteractionObserver + 'static,
    ) -> ObserverId {
        self.dispatcher.add(categories, Box::new(observer))
    }

    /// Unsubscribe an observer. Returns whether it was subscribed.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.dispatcher.remove(id)
    }

    // --- Step ---

    /// Advance one step with this frame's tracking input and return its events in order.
    pub fn step<E: NativeEngine + ?Sized>(
        &mut self,
        frame: &TrackingFrame,
        engine: &mut E,
    ) -> Vec<InteractionEvent> {
        for object in core::mem::take(&mut self.pending_unregister) {
            warn!(?object, "unregistering misbehaving object");
            self.remove_object(object, Stage::Tracking);
        }
        for object in self.pending_teardown.drain(..) {
            if let Err(error) = engine.deactivate(object) {
                warn!(?object, %error, "teardown of removed object failed");
            }
        }

        let now = frame.time;
        let dt = match self.time {
            Some(prev) if now < prev => {
                warn!(prev, now, "tracking time went backwards");
                0.0
            }
            Some(prev) => now - prev,
            None => 0.0,
        };
        self.time = Some(now);

        self.track(frame);
        self.activate(engine);

        let frames: Vec<ControllerFrame> = self.registry.tracked_controllers().cloned().collect();
        self.update_hover(&frames);
        let candidates = self.touch_candidates(&frames);
        self.update_contact(&frames, &candidates, engine);

        for f in &frames {
            let graspable: Vec<Candidate> =
                self.filtered(&candidates, f.id, ObjectFlags::IGNORE_GRASP);
            let class = match engine.classify(f, &graspable) {
                Classification::Grasp(object)
                    if !graspable.iter().any(|c| c.object == object)
                        && self.grasp.grasped_object(f.id) != Some(object) =>
                {
                    warn!(controller = ?f.id, ?object, "grasp reported outside candidates");
                    Classification::Physics
                }
                other => other,
            };
            self.grasp.reconcile(f.id, class, grasp_ctx!(self, Stage::Grasp));
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Step intervals are far below f32 precision limits."
        )]
        let dt = dt as f32;
        self.grasp.update_movement(dt, now, grasp_ctx!(self, Stage::Grasp));

        self.hover.stays(&mut self.events);
        self.contact.stays(&mut self.events);
        self.grasp.stays(&mut self.events);
        self.debug_check();

        let events = self.events.take_ordered();
        trace!(
            time = now,
            controllers = frames.len(),
            objects = self.registry.object_count(),
            events = events.len(),
            "step"
        );
        self.deliver(events)
    }

    fn track(&mut self, frame: &TrackingFrame) {
        let now = frame.time;
        let mut frames: Vec<&ControllerFrame> = frame.controllers.iter().collect();
        frames.sort_by_key(|f| f.id);
        frames.dedup_by_key(|f| f.id);
        let seen: BTreeSet<ControllerId> = frames.iter().map(|f| f.id).collect();

        for c in self.tracking.newly_missing(&seen) {
            if let Some(record) = self.registry.controller_mut(c) {
                record.tracked = false;
            }
            let Some(object) = self.grasp.grasped_object(c) else {
                continue;
            };
            let timeout = self
                .registry
                .get(object)
                .and_then(|r| r.policy.max_suspension_time)
                .unwrap_or(self.config.default_max_suspension_time);
            self.tracking.mark_untracked(c, timeout);
            let _ = self.grasp.suspend(c, grasp_ctx!(self, Stage::Tracking));
        }

        for f in frames {
            if self.tracking.hand(f.id).is_some() {
                let resumed = self.tracking.refresh(f, now);
                let _ = self.registry.upsert_controller(f.clone(), true);
                if resumed {
                    self.grasp.resume(f.id, grasp_ctx!(self, Stage::Tracking));
                }
                continue;
            }
            let grasp = &self.grasp;
            let old = self
                .tracking
                .reconnect_candidate(f, self.config.reconnect_policy, |c| {
                    grasp.grasped_object(c).is_some()
                });
            let _ = self.registry.upsert_controller(f.clone(), true);
            match old {
                Some(old) => {
                    debug!(?old, new = ?f.id, "hand reconnected");
                    self.tracking.rebind(old, f, now);
                    self.hover.remove_controller(old, Stage::Tracking, &mut self.events);
                    self.contact.remove_controller(old, Stage::Tracking, &mut self.events);
                    self.grasp.rebind(old, f.id, grasp_ctx!(self, Stage::Tracking));
                    let _ = self.registry.remove_controller(old);
                }
                None => {
                    let _ = self.tracking.create(f, now);
                }
            }
        }

        for c in self.tracking.expired(now) {
            if let Some(object) = self.grasp.grasped_object(c) {
                debug!(?object, controller = ?c, "suspension timed out");
                let _ = self.grasp.end(c, object, grasp_ctx!(self, Stage::Tracking));
            }
        }

        for c in self.tracking.stale(&seen) {
            if self.grasp.grasped_object(c).is_none() {
                debug!(controller = ?c, "untracked hand dropped");
                self.remove_controller(c, Stage::Tracking);
            }
        }
    }

    fn activate<E: NativeEngine + ?Sized>(&mut self, engine: &mut E) {
        for (id, record) in self.registry.objects() {
            self.activator.sync(id, geometry::world_aabb(&record.colliders, &record.body.pose));
        }
        let positions: Vec<Vec3> = self
            .registry
            .tracked_controllers()
            .map(|c| c.pose.position)
            .collect();
        let held: Vec<ObjectId> = self.grasp.held_objects().collect();
        let report = self.activator.update(
            &self.registry,
            &positions,
            held,
            self.config.activation_radius,
            self.config.max_activation_depth,
            engine,
        );
        if !report.activated.is_empty() || !report.deactivated.is_empty() {
            debug!(
                activated = report.activated.len(),
                deactivated = report.deactivated.len(),
                "activation changed"
            );
        }
        for (object, error) in report.failed {
            self.mark_misbehaving(object, &error);
        }
    }

    fn update_hover(&mut self, frames: &[ControllerFrame]) {
        let controllers: Vec<&ControllerFrame> = frames.iter().collect();
        let objects: Vec<HoverObject<'_>> = self
            .activator
            .active()
            .filter_map(|id| {
                let r = self.registry.get(id).filter(|r| !r.misbehaving)?;
                Some(HoverObject {
                    id,
                    colliders: &r.colliders,
                    pose: r.body.pose,
                    flags: r.flags,
                })
            })
            .collect();
        self.hover.update(
            &controllers,
            &objects,
            self.config.hover_activation_radius,
            &mut self.events,
        );
    }

    fn update_contact<E: NativeEngine + ?Sized>(
        &mut self,
        frames: &[ControllerFrame],
        candidates: &BTreeMap<ControllerId, Vec<Candidate>>,
        engine: &mut E,
    ) {
        let mut touching: BTreeMap<ObjectId, BTreeSet<ControllerId>> = BTreeMap::new();
        for f in frames {
            let contactable = self.filtered(candidates, f.id, ObjectFlags::IGNORE_CONTACT);
            for object in engine.contacts(f, &contactable) {
                if contactable.iter().any(|c| c.object == object) {
                    touching.entry(object).or_default().insert(f.id);
                } else {
                    warn!(controller = ?f.id, ?object, "contact reported outside candidates");
                }
            }
        }
        self.contact.update(touching, &mut self.events);
    }

    /// Per controller, the active objects within touch radius, nearest first.
    ///
    /// Hover flags play no part here; contact and grasp have flags of their own.
    fn touch_candidates(
        &self,
        frames: &[ControllerFrame],
    ) -> BTreeMap<ControllerId, Vec<Candidate>> {
        let radius = self.config.touch_activation_radius;
        let mut out = BTreeMap::new();
        for f in frames {
            let mut near: Vec<Candidate> = self
                .activator
                .active()
                .filter_map(|object| {
                    let r = self.registry.get(object).filter(|r| !r.misbehaving)?;
                    let distance = geometry::distance(&r.colliders, &r.body.pose, f.pose.position);
                    (distance < radius).then_some(Candidate { object, distance })
                })
                .collect();
            near.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            out.insert(f.id, near);
        }
        out
    }

    /// The candidates of `controller`, minus objects carrying `exclude`.
    fn filtered(
        &self,
        candidates: &BTreeMap<ControllerId, Vec<Candidate>>,
        controller: ControllerId,
        exclude: ObjectFlags,
    ) -> Vec<Candidate> {
        candidates
            .get(&controller)
            .into_iter()
            .flatten()
            .filter(|c| {
                self.registry
                    .get(c.object)
                    .is_some_and(|r| !r.flags.intersects(exclude))
            })
            .copied()
            .collect()
    }

    // --- Internals shared by explicit calls, commands and the step ---

    fn remove_object(&mut self, object: ObjectId, stage: Stage) {
        if !self.registry.contains(object) {
            return;
        }
        self.grasp.release_object(object, grasp_ctx!(self, stage));
        self.contact.remove_object(object, stage, &mut self.events);
        self.hover.remove_object(object, stage, &mut self.events);
        let _ = self.registry.remove(object);
        self.pending_unregister.remove(&object);
        if self.activator.remove(object) {
            self.pending_teardown.push(object);
        }
        debug!(?object, "unregistered");
    }

    fn remove_controller(&mut self, controller: ControllerId, stage: Stage) {
        if self.registry.controller(controller).is_none() {
            return;
        }
        self.grasp.remove_controller(controller, grasp_ctx!(self, stage));
        self.contact.remove_controller(controller, stage, &mut self.events);
        self.hover.remove_controller(controller, stage, &mut self.events);
        let _ = self.tracking.remove(controller);
        let _ = self.registry.remove_controller(controller);
    }

    fn release_all(&mut self, object: ObjectId) {
        let holders: Vec<ControllerId> = self
            .grasp
            .grasping(object)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        self.grasp.release_object(object, grasp_ctx!(self, Stage::Grasp));
        for c in holders {
            self.grasp.suppress(c);
        }
    }

    fn debug_check(&self) {
        for object in self.grasp.held_objects() {
            debug_assert!(
                self.registry.contains(object),
                "grasp state outlived {object:?}"
            );
            let holders = self.grasp.grasping(object).map_or(0, |s| s.len());
            debug_assert!(
                holders == 1
                    || self
                        .flags(object)
                        .is_some_and(|f| f.contains(ObjectFlags::ALLOW_MULTI_GRASP)),
                "{object:?} has {holders} holders"
            );
            if let Some(c) = self.grasp.suspending(object) {
                debug_assert!(!self.is_tracked(c), "{c:?} suspends {object:?} while tracked");
            }
        }
        for hand in self.tracking.hands() {
            debug_assert!(
                self.registry.controller(hand.controller()).is_some(),
                "hand {:?} has no controller",
                hand.id()
            );
        }
    }

    fn mark_misbehaving(&mut self, object: ObjectId, error: &HostError) {
        let Some(record) = self.registry.get_mut(object) else {
            return;
        };
        if !record.misbehaving {
            warn!(?object, %error, "object misbehaving; unregistering at next step");
            record.misbehaving = true;
            self.pending_unregister.insert(object);
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Unregister(object) => self.remove_object(object, Stage::Grasp),
            Command::UnregisterController(c) => self.remove_controller(c, Stage::Grasp),
            Command::Release(object) => {
                if self.grasp.grasping(object).is_some() {
                    self.release_all(object);
                }
            }
        }
    }

    /// Deliver events raised outside a step.
    fn flush(&mut self) -> Vec<InteractionEvent> {
        let events = self.events.take();
        self.deliver(events)
    }

    /// Deliver a batch, then apply observer commands and deliver what they raise, for a bounded
    /// number of rounds.
    fn deliver(&mut self, mut batch: Vec<InteractionEvent>) -> Vec<InteractionEvent> {
        let mut delivered = Vec::new();
        if self.dispatcher.is_empty() {
            return batch;
        }
        for round in 0..=MAX_COMMAND_ROUNDS {
            if batch.is_empty() {
                break;
            }
            let mut commands = CommandQueue::default();
            let failed = self.dispatcher.dispatch(&batch, &mut commands);
            for object in failed {
                self.mark_misbehaving(object, &HostError::new("observer failed"));
            }
            delivered.append(&mut batch);
            let commands = commands.take();
            if commands.is_empty() {
                break;
            }
            if round == MAX_COMMAND_ROUNDS {
                warn!(dropped = commands.len(), "observer commands exceeded the round limit");
                break;
            }
            for command in commands {
                self.apply(command);
            }
            batch = self.events.take();
        }
        delivered
    }

    // --- Queries ---

    /// Whether `object` is registered.
    pub fn is_registered(&self, object: ObjectId) -> bool {
        self.registry.contains(object)
    }

    /// Number of registered objects.
    pub fn object_count(&self) -> usize {
        self.registry.object_count()
    }

    /// The physical state of `object`.
    pub fn body(&self, object: ObjectId) -> Option<&BodyState> {
        self.registry.get(object).map(|r| &r.body)
    }

    /// The flags of `object`.
    pub fn flags(&self, object: ObjectId) -> Option<ObjectFlags> {
        self.registry.get(object).map(|r| r.flags)
    }

    /// Whether `object` was active in the last step.
    pub fn is_active(&self, object: ObjectId) -> bool {
        self.activator.is_active(object)
    }

    /// Whether `object` is awaiting forced unregistration.
    pub fn is_misbehaving(&self, object: ObjectId) -> bool {
        self.registry.get(object).is_some_and(|r| r.misbehaving)
    }

    /// Hover state of `object`, if anything hovers it.
    pub fn hover_state(&self, object: ObjectId) -> Option<&HoverState> {
        self.hover.state(object)
    }

    /// Controllers hovering `object`, in ascending id order.
    pub fn hovering_controllers(
        &self,
        object: ObjectId,
    ) -> impl Iterator<Item = ControllerId> + '_ {
        self.hover
            .state(object)
            .into_iter()
            .flat_map(|s| s.hovering.iter().copied())
    }

    /// The hovering controller nearest to `object`.
    pub fn closest_hovering_controller(&self, object: ObjectId) -> Option<ControllerId> {
        self.hover.state(object).and_then(|s| s.closest)
    }

    /// The primary hover of `controller`.
    pub fn primary_hover(&self, controller: ControllerId) -> Option<ObjectId> {
        self.hover.primary(controller)
    }

    /// Controllers whose primary hover is `object`, in ascending id order.
    pub fn primary_hovering_controllers(
        &self,
        object: ObjectId,
    ) -> impl Iterator<Item = ControllerId> + '_ {
        self.hover
            .primary_hovering(object)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Controllers touching `object`, in ascending id order.
    pub fn contacting_controllers(
        &self,
        object: ObjectId,
    ) -> impl Iterator<Item = ControllerId> + '_ {
        self.contact
            .touching(object)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Controllers grasping `object`, in ascending id order.
    pub fn grasping_controllers(
        &self,
        object: ObjectId,
    ) -> impl Iterator<Item = ControllerId> + '_ {
        self.grasp
            .grasping(object)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Whether any controller grasps `object`.
    pub fn is_grasped(&self, object: ObjectId) -> bool {
        self.grasp.grasping(object).is_some()
    }

    /// The object `controller` grasps.
    pub fn grasped_object(&self, controller: ControllerId) -> Option<ObjectId> {
        self.grasp.grasped_object(controller)
    }

    /// The untracked controller keeping `object`'s grasp alive.
    pub fn suspending_controller(&self, object: ObjectId) -> Option<ControllerId> {
        self.grasp.suspending(object)
    }

    /// Whether `object`'s grasp is suspended.
    pub fn is_suspended(&self, object: ObjectId) -> bool {
        self.grasp.suspending(object).is_some()
    }

    /// Whether `controller` is registered and tracked this step.
    pub fn is_tracked(&self, controller: ControllerId) -> bool {
        self.registry.controller(controller).is_some_and(|c| c.tracked)
    }

    /// Registered controllers, in ascending id order.
    pub fn controllers(&self) -> impl Iterator<Item = ControllerId> + '_ {
        self.registry.controller_ids()
    }

    /// The logical hand currently reported under `controller`.
    pub fn logical_hand(&self, controller: ControllerId) -> Option<&LogicalHand> {
        self.tracking.hand(controller)
    }

    /// All logical hands.
    pub fn logical_hands(&self) -> impl Iterator<Item = &LogicalHand> + '_ {
        self.tracking.hands()
    }

    /// Number of logical hands.
    pub fn logical_hand_count(&self) -> usize {
        self.tracking.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::geometry::Collider;
    use crate::native::HeuristicEngine;
    use crate::throw::ThrowHandler;
    use crate::types::{Chirality, GraspPolicy, Pose};
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    const A: ControllerId = ControllerId(1);
    const B: ControllerId = ControllerId(2);

    /// An engine that returns whatever the test scripted.
    #[derive(Default)]
    struct Script {
        classes: BTreeMap<ControllerId, Classification>,
        contacts: BTreeMap<ControllerId, Vec<ObjectId>>,
        refuse: Option<ObjectId>,
        torn_down: Vec<ObjectId>,
    }

    impl Script {
        fn grasp(&mut self, c: ControllerId, o: ObjectId) {
            self.classes.insert(c, Classification::Grasp(o));
        }

        fn open(&mut self, c: ControllerId) {
            self.classes.remove(&c);
        }
    }

    impl NativeEngine for Script {
        fn activate(&mut self, object: ObjectId) -> Result<(), HostError> {
            if self.refuse == Some(object) {
                return Err(HostError::new("refused"));
            }
            Ok(())
        }

        fn deactivate(&mut self, object: ObjectId) -> Result<(), HostError> {
            self.torn_down.push(object);
            Ok(())
        }

        fn classify(&mut self, c: &ControllerFrame, _: &[Candidate]) -> Classification {
            self.classes.get(&c.id).copied().unwrap_or(Classification::Physics)
        }

        fn contacts(&mut self, c: &ControllerFrame, _: &[Candidate]) -> Vec<ObjectId> {
            self.contacts.get(&c.id).cloned().unwrap_or_default()
        }
    }

    fn ball(x: f32) -> ObjectDesc {
        ObjectDesc::at(Pose::from_position(Vec3::new(x, 0.0, 0.0)))
            .with_collider(Collider::ball(0.05))
    }

    fn hand(id: ControllerId, x: f32) -> ControllerFrame {
        ControllerFrame::new(id, Chirality::Left, Pose::from_position(Vec3::new(x, 0.0, 0.0)))
    }

    fn frame(time: f64, hands: &[ControllerFrame]) -> TrackingFrame {
        TrackingFrame {
            time,
            controllers: hands.to_vec(),
        }
    }

    fn of(events: &[InteractionEvent], category: EventCategories) -> Vec<EventKind> {
        events
            .iter()
            .filter(|e| e.kind.category() == category)
            .map(|e| e.kind)
            .collect()
    }

    fn position(events: &[InteractionEvent], kind: EventKind) -> usize {
        events.iter().position(|e| e.kind == kind).unwrap()
    }

    #[test]
    fn simple_grasp() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o = m.register(ball(0.0));
        let _ = m.step(&frame(0.0, &[hand(A, 0.06)]), &mut e);
        assert!(m.is_active(o));
        assert_eq!(m.hovering_controllers(o).collect::<Vec<_>>(), vec![A]);

        e.grasp(A, o);
        let ev = m.step(&frame(0.1, &[hand(A, 0.06)]), &mut e);
        assert_eq!(
            of(&ev, EventCategories::GRASP),
            vec![
                EventKind::PerControllerGraspBegin(A),
                EventKind::GraspBegin,
                EventKind::GraspStay,
            ]
        );
        assert_eq!(m.grasping_controllers(o).collect::<Vec<_>>(), vec![A]);
        assert_eq!(m.grasped_object(A), Some(o));
    }

    #[test]
    fn contested_grasp_swaps_without_interleaving() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o = m.register(ball(0.0));
        let hands = [hand(A, -0.03), hand(B, 0.03)];
        e.grasp(A, o);
        let _ = m.step(&frame(0.0, &hands), &mut e);
        assert_eq!(m.grasped_object(A), Some(o));

        e.grasp(B, o);
        let ev = m.step(&frame(0.1, &hands), &mut e);
        let start = position(&ev, EventKind::PerControllerGraspEnd(A));
        let swap: Vec<EventKind> = ev[start..start + 4].iter().map(|e| e.kind).collect();
        assert_eq!(
            swap,
            vec![
                EventKind::PerControllerGraspEnd(A),
                EventKind::GraspEnd,
                EventKind::PerControllerGraspBegin(B),
                EventKind::GraspBegin,
            ]
        );
        assert!(ev[start..start + 4].iter().all(|e| e.object == o));
        assert_eq!(m.grasping_controllers(o).collect::<Vec<_>>(), vec![B]);
        assert_eq!(m.grasped_object(A), None);

        // A still reports Grasp(o); without a fresh classification change it does not steal back.
        let ev = m.step(&frame(0.2, &hands), &mut e);
        assert_eq!(of(&ev, EventCategories::GRASP), vec![EventKind::GraspStay]);
    }

    #[test]
    fn suspension_and_timeout() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o = m.register(ball(0.0).with_policy(GraspPolicy {
            max_suspension_time: Some(1.0),
            ..GraspPolicy::default()
        }));
        e.grasp(A, o);
        let _ = m.step(&frame(0.0, &[hand(A, 0.05)]), &mut e);
        let _ = m.step(&frame(0.1, &[hand(A, 0.05)]), &mut e);

        let ev = m.step(&frame(0.2, &[]), &mut e);
        assert_eq!(ev[0].kind, EventKind::SuspensionBegin(A));
        assert!(m.is_suspended(o));
        assert_eq!(m.suspending_controller(o), Some(A));
        assert!(m.logical_hand(A).unwrap().is_untracked());
        let frozen = *m.body(o).unwrap();
        assert_eq!(frozen.linear_velocity, Vec3::ZERO);

        for t in [0.5, 0.9] {
            let ev = m.step(&frame(t, &[]), &mut e);
            assert!(!ev.iter().any(|e| e.kind == EventKind::GraspEnd), "t = {t}");
        }
        assert_eq!(m.body(o).unwrap().pose, frozen.pose, "suspended objects do not move");

        let ev = m.step(&frame(1.2, &[]), &mut e);
        assert_eq!(
            of(&ev, EventCategories::GRASP),
            vec![EventKind::PerControllerGraspEnd(A), EventKind::GraspEnd]
        );
        assert!(
            position(&ev, EventKind::SuspensionEnd(A)) < position(&ev, EventKind::GraspEnd)
        );
        assert_eq!(m.grasped_object(A), None);
        assert!(m.logical_hand(A).is_none());
        assert!(!m.is_grasped(o));
    }

    #[test]
    fn reconnection_keeps_the_grasp() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o = m.register(ball(0.0));
        e.grasp(A, o);
        let _ = m.step(&frame(0.0, &[hand(A, 0.05)]), &mut e);
        let hand_id = m.logical_hand(A).unwrap().id();
        let _ = m.step(&frame(0.1, &[]), &mut e);

        let a2 = ControllerId(7);
        e.grasp(a2, o);
        let ev = m.step(&frame(0.5, &[hand(a2, 0.06)]), &mut e);
        assert!(ev.contains(&InteractionEvent {
            object: o,
            kind: EventKind::SuspensionEnd(a2)
        }));
        assert!(of(&ev, EventCategories::GRASP)
            .iter()
            .all(|k| *k == EventKind::GraspStay));
        assert_eq!(m.grasping_controllers(o).collect::<Vec<_>>(), vec![a2]);
        assert_eq!(m.logical_hand(a2).unwrap().id(), hand_id);
        assert!(m.logical_hand(A).is_none());
        assert!(!m.is_suspended(o));
    }

    #[test]
    fn registering_a_suspended_controller_resumes_its_grasp() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o = m.register(ball(0.0));
        e.grasp(A, o);
        let _ = m.step(&frame(0.0, &[hand(A, 0.05)]), &mut e);
        let _ = m.step(&frame(0.1, &[]), &mut e);
        assert_eq!(m.suspending_controller(o), Some(A));

        let ev = m.register_controller(hand(A, 0.05));
        assert_eq!(
            ev,
            vec![InteractionEvent {
                object: o,
                kind: EventKind::SuspensionEnd(A)
            }]
        );
        assert!(m.is_tracked(A));
        assert!(!m.is_suspended(o));
        assert!(!m.logical_hand(A).unwrap().is_untracked());
        assert_eq!(m.grasped_object(A), Some(o));

        // Missing again from the next frame: suspended once more, not torn.
        let ev = m.step(&frame(0.2, &[]), &mut e);
        assert_eq!(ev[0].kind, EventKind::SuspensionBegin(A));
        assert_eq!(m.suspending_controller(o), Some(A));
        assert!(!m.is_tracked(A));
    }

    #[test]
    fn registering_a_new_controller_emits_nothing() {
        let mut m = InteractionManager::new();
        assert!(m.register_controller(hand(A, 0.0)).is_empty());
        assert!(m.is_tracked(A));
        assert!(m.logical_hand(A).is_some());
    }

    #[test]
    fn hover_ignored_objects_still_take_contact_and_grasp() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o = m.register(ball(0.0).with_flags(ObjectFlags::IGNORE_HOVER));
        e.contacts.insert(A, vec![o]);
        let ev = m.step(&frame(0.0, &[hand(A, 0.1)]), &mut e);
        assert!(of(&ev, EventCategories::HOVER).is_empty());
        assert!(m.hover_state(o).is_none());
        assert_eq!(
            of(&ev, EventCategories::CONTACT),
            vec![
                EventKind::PerControllerContactBegin(A),
                EventKind::ContactBegin,
                EventKind::ContactStay,
            ]
        );
        assert_eq!(m.contacting_controllers(o).collect::<Vec<_>>(), vec![A]);

        let mut engine = HeuristicEngine::default();
        for t in [0.1, 0.2] {
            let _ = m.step(&frame(t, &[hand(A, 0.1).with_grip(1.0)]), &mut engine);
        }
        assert_eq!(m.grasped_object(A), Some(o));
        assert_eq!(m.primary_hover(A), None);
    }

    #[test]
    fn grasp_outside_candidates_is_treated_as_physics() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let near = m.register(ball(0.0));
        let far = m.register(ball(0.3));
        let _ = m.step(&frame(0.0, &[hand(A, 0.1)]), &mut e);
        assert!(m.is_active(far), "within activation radius but out of touch range");

        e.grasp(A, far);
        let ev = m.step(&frame(0.1, &[hand(A, 0.1)]), &mut e);
        assert!(of(&ev, EventCategories::GRASP).is_empty());
        assert_eq!(m.grasped_object(A), None);

        // A held object that lags out of touch range is still held.
        e.grasp(A, near);
        let _ = m.step(&frame(0.2, &[hand(A, 0.1)]), &mut e);
        assert_eq!(m.grasped_object(A), Some(near));
        let ev = m.step(&frame(0.3, &[hand(A, 0.5)]), &mut e);
        assert_eq!(of(&ev, EventCategories::GRASP), vec![EventKind::GraspStay]);
        assert_eq!(m.grasped_object(A), Some(near));
    }

    #[test]
    fn unregister_while_grasped_releases_first() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o = m.register(ball(0.0));
        e.grasp(A, o);
        e.contacts.insert(A, vec![o]);
        let _ = m.step(&frame(0.0, &[hand(A, 0.05)]), &mut e);
        assert_eq!(m.contacting_controllers(o).collect::<Vec<_>>(), vec![A]);

        let ev = m.unregister(o);
        let kinds: Vec<EventKind> = ev.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds[..2],
            [EventKind::PerControllerGraspEnd(A), EventKind::GraspEnd]
        );
        assert!(kinds.contains(&EventKind::ContactEnd));
        assert!(kinds.contains(&EventKind::HoverEnd));
        assert!(!m.is_registered(o));
        assert_eq!(m.grasped_object(A), None);
        assert!(m.unregister(o).is_empty(), "second unregister is a no-op");

        let _ = m.step(&frame(0.1, &[hand(A, 0.05)]), &mut e);
        assert_eq!(e.torn_down, vec![o]);
    }

    #[test]
    fn untracked_idle_hand_is_dropped() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o = m.register(ball(0.0));
        let _ = m.step(&frame(0.0, &[hand(A, 0.05)]), &mut e);
        let ev = m.step(&frame(0.1, &[]), &mut e);
        assert_eq!(ev[0].kind, EventKind::PerControllerHoverEnd(A));
        assert!(ev.iter().all(|e| e.object == o));
        assert!(m.logical_hand(A).is_none());
        assert_eq!(m.controllers().count(), 0);
    }

    #[test]
    fn manual_grasp_errors() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o = m.register(ball(0.0));
        let ignored = m.register(ball(1.0).with_flags(ObjectFlags::IGNORE_GRASP));
        let _ = m.step(&frame(0.0, &[hand(A, 0.0), hand(B, 0.0)]), &mut e);

        assert_eq!(
            m.grasp(ControllerId(9), o),
            Err(InteractionError::UnknownController(ControllerId(9)))
        );
        assert_eq!(m.grasp(A, ignored), Err(InteractionError::GraspIgnored(ignored)));
        assert_eq!(
            m.release(A),
            Err(InteractionError::NotGrasping { controller: A })
        );

        let ev = m.grasp(A, o).unwrap();
        assert_eq!(ev.len(), 2);
        assert_eq!(
            m.grasp(B, o),
            Err(InteractionError::AlreadyGrasped { object: o, by: A })
        );

        // The engine still says Physics for A, but the manual grasp survives the next step.
        let _ = m.step(&frame(0.1, &[hand(A, 0.0), hand(B, 0.0)]), &mut e);
        assert_eq!(m.grasped_object(A), Some(o));

        let _ = m.release(A).unwrap();
        let _ = m.unregister(o);
        assert_eq!(m.grasp(A, o), Err(InteractionError::UnknownObject(o)));
        assert_eq!(m.release_object(o), Err(InteractionError::UnknownObject(o)));
    }

    #[test]
    fn suspended_controller_cannot_grasp_but_object_can_be_taken() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o = m.register(ball(0.0));
        let other = m.register(ball(0.02));
        e.grasp(A, o);
        let _ = m.step(&frame(0.0, &[hand(A, 0.05), hand(B, 0.05)]), &mut e);
        let _ = m.step(&frame(0.1, &[hand(B, 0.05)]), &mut e);
        assert_eq!(
            m.grasp(A, other),
            Err(InteractionError::ControllerUntracked(A))
        );
        let ev = m.grasp(B, o).unwrap();
        assert_eq!(ev[0].kind, EventKind::SuspensionEnd(A));
        assert_eq!(m.grasping_controllers(o).collect::<Vec<_>>(), vec![B]);
        // A holds nothing now and is dropped at the next step.
        let _ = m.step(&frame(0.2, &[hand(B, 0.05)]), &mut e);
        assert!(m.logical_hand(A).is_none());
    }

    #[test]
    fn multi_grasp_blends_and_co_holder_loss_releases() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o = m.register(ball(0.0).with_flags(ObjectFlags::ALLOW_MULTI_GRASP));
        e.grasp(A, o);
        e.grasp(B, o);
        let ev = m.step(&frame(0.0, &[hand(A, -0.05), hand(B, 0.05)]), &mut e);
        assert_eq!(
            of(&ev, EventCategories::GRASP),
            vec![
                EventKind::PerControllerGraspBegin(A),
                EventKind::GraspBegin,
                EventKind::PerControllerGraspBegin(B),
                EventKind::GraspStay,
            ]
        );
        let ev = m.step(&frame(0.1, &[hand(B, 0.05)]), &mut e);
        assert_eq!(ev[0].kind, EventKind::PerControllerGraspEnd(A));
        assert!(!ev.iter().any(|e| matches!(e.kind, EventKind::SuspensionBegin(_))));
        assert_eq!(m.grasping_controllers(o).collect::<Vec<_>>(), vec![B]);
    }

    #[test]
    fn release_throws_with_controller_velocity() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o = m.register(ball(0.0).with_policy(GraspPolicy {
            throw: Some(ThrowHandler::LastVelocity),
            ..GraspPolicy::default()
        }));
        e.grasp(A, o);
        let moving = hand(A, 0.05).with_velocity(Vec3::new(0.0, 3.0, 0.0));
        let _ = m.step(&frame(0.0, &[moving.clone()]), &mut e);
        e.open(A);
        let ev = m.step(&frame(0.1, &[moving]), &mut e);
        assert!(ev.iter().any(|e| e.kind == EventKind::GraspEnd));
        let body = m.body(o).unwrap();
        assert_eq!(body.linear_velocity, Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(body.angular_damping, 0.05, "pre-grasp damping restored");
    }

    #[test]
    fn ignore_grasp_flag_releases_held_object() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o = m.register(ball(0.0));
        e.grasp(A, o);
        let _ = m.step(&frame(0.0, &[hand(A, 0.05)]), &mut e);
        let ev = m.set_flags(o, ObjectFlags::IGNORE_GRASP).unwrap();
        assert_eq!(
            ev.iter().map(|e| e.kind).collect::<Vec<_>>(),
            vec![EventKind::PerControllerGraspEnd(A), EventKind::GraspEnd]
        );
        let ev = m.step(&frame(0.1, &[hand(A, 0.05)]), &mut e);
        assert!(of(&ev, EventCategories::GRASP).is_empty());
    }

    #[test]
    fn step_order_puts_stays_last() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o1 = m.register(ball(0.0));
        let o2 = m.register(ball(0.5));
        e.contacts.insert(A, vec![o1]);
        let _ = m.step(&frame(0.0, &[hand(A, 0.05)]), &mut e);
        e.contacts.clear();
        let ev = m.step(&frame(0.1, &[hand(A, 0.45)]), &mut e);
        let kinds: Vec<EventKind> = ev.iter().map(|e| e.kind).collect();
        let first_stay = kinds
            .iter()
            .position(|k| matches!(k, EventKind::HoverStay | EventKind::PrimaryHoverStay))
            .unwrap();
        assert!(kinds[first_stay..].iter().all(|k| matches!(
            k,
            EventKind::HoverStay
                | EventKind::PrimaryHoverStay
                | EventKind::ContactStay
                | EventKind::GraspStay
        )));
        assert!(
            position(&ev, EventKind::PerControllerHoverEnd(A))
                < position(&ev, EventKind::PerControllerPrimaryHoverEnd(A))
        );
        assert!(
            position(&ev, EventKind::PerControllerPrimaryHoverBegin(A))
                < position(&ev, EventKind::PerControllerHoverBegin(A))
        );
        assert!(position(&ev, EventKind::HoverBegin) < position(&ev, EventKind::ContactEnd));
        assert_eq!(m.primary_hover(A), Some(o2));
        assert_eq!(m.closest_hovering_controller(o2), Some(A));
    }

    #[test]
    fn observer_commands_apply_after_dispatch() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let o = m.register(ball(0.0));
        let _ = m.add_observer(
            EventCategories::GRASP,
            |ev: &InteractionEvent, q: &mut CommandQueue| -> Result<(), HostError> {
                if ev.kind == EventKind::GraspBegin {
                    q.unregister(ev.object);
                }
                Ok(())
            },
        );
        e.grasp(A, o);
        let ev = m.step(&frame(0.0, &[hand(A, 0.05)]), &mut e);
        assert!(!m.is_registered(o));
        let begin = position(&ev, EventKind::GraspBegin);
        let end = position(&ev, EventKind::GraspEnd);
        assert!(begin < end);
        assert!(ev.iter().any(|e| e.kind == EventKind::HoverEnd));
    }

    #[test]
    fn failing_observer_isolates_object() {
        let mut m = InteractionManager::new();
        let mut e = Script::default();
        let calm = m.register(ball(0.1));
        let noisy = m.register(ball(-0.1));
        let seen = Rc::new(RefCell::new(0_usize));
        let counter = seen.clone();
        let _ = m.add_observer(
            EventCategories::HOVER,
            move |ev: &InteractionEvent, _: &mut CommandQueue| -> Result<(), HostError> {
                *counter.borrow_mut() += 1;
                if ev.object == noisy {
                    return Err(HostError::new("observer bug"));
                }
                Ok(())
            },
        );
        let _ = m.step(&frame(0.0, &[hand(A, 0.0)]), &mut e);
        assert!(m.is_misbehaving(noisy));
        assert!(!m.is_misbehaving(calm));
        assert!(*seen.borrow() > 0);

        let ev = m.step(&frame(0.1, &[hand(A, 0.0)]), &mut e);
        assert!(!m.is_registered(noisy));
        assert_eq!(ev[0].object, noisy);
        assert!(m.is_registered(calm));
    }

    #[test]
    fn activation_failure_marks_misbehaving() {
        let mut m = InteractionManager::new();
        let o = m.register(ball(0.0));
        let mut e = Script {
            refuse: Some(o),
            ..Script::default()
        };
        let ev = m.step(&frame(0.0, &[hand(A, 0.05)]), &mut e);
        assert!(ev.is_empty());
        assert!(m.is_misbehaving(o));
        let _ = m.step(&frame(0.1, &[hand(A, 0.05)]), &mut e);
        assert!(!m.is_registered(o));
    }

    #[test]
    fn invariants_hold_over_a_walk() {
        let mut m = InteractionManager::with_config(InteractionConfig {
            broadphase: crate::Broadphase::Grid { cell: 0.25 },
            ..InteractionConfig::default()
        })
        .unwrap();
        let mut engine = HeuristicEngine::default();
        let objects: Vec<ObjectId> = [-0.2, 0.0, 0.2]
            .into_iter()
            .map(|x| {
                let flags = if x > 0.1 {
                    ObjectFlags::ALLOW_MULTI_GRASP
                } else {
                    ObjectFlags::empty()
                };
                m.register(ball(x).with_flags(flags))
            })
            .collect();
        let mut begins = BTreeMap::<ObjectId, i32>::new();
        let mut hovers = BTreeMap::<ObjectId, i32>::new();
        // Triangle wave in -1..=1.
        let wave = |t: f32, period: f32| {
            let x = (t % period) / period;
            if x < 0.5 { 4.0 * x - 1.0 } else { 3.0 - 4.0 * x }
        };
        for i in 0..200_u16 {
            let t = f32::from(i) * 0.05;
            let xa = wave(t, 4.1) * 0.3;
            let xb = wave(t + 1.0, 2.3) * 0.3;
            let grip = |period: f32| if wave(t, period) > 0.0 { 1.0 } else { 0.0 };
            let hands = if i >= 100 {
                Vec::new()
            } else {
                vec![
                    hand(A, xa).with_grip(grip(1.7)),
                    hand(B, xb).with_grip(grip(1.1)),
                ]
            };
            let ev = m.step(&frame(f64::from(t), &hands), &mut engine);
            for e in &ev {
                match e.kind {
                    EventKind::GraspBegin => *begins.entry(e.object).or_default() += 1,
                    EventKind::GraspEnd => *begins.entry(e.object).or_default() -= 1,
                    EventKind::HoverBegin => *hovers.entry(e.object).or_default() += 1,
                    EventKind::HoverEnd => *hovers.entry(e.object).or_default() -= 1,
                    _ => {}
                }
            }
            for c in [A, B] {
                if let Some(o) = m.primary_hover(c) {
                    assert!(m.hovering_controllers(o).any(|h| h == c), "step {i}");
                }
            }
            for &o in &objects {
                if !m.flags(o).unwrap().contains(ObjectFlags::ALLOW_MULTI_GRASP) {
                    assert!(m.grasping_controllers(o).count() <= 1, "step {i}");
                }
                if let Some(s) = m.hover_state(o) {
                    assert!(s.closest.is_some_and(|c| s.hovering.contains(&c)));
                }
            }
        }
        // Every hand has been gone longer than the suspension timeout, so everything has ended
        // exactly once.
        assert!(begins.values().all(|&n| n == 0), "{begins:?}");
        assert!(hovers.values().all(|&n| n == 0), "{hovers:?}");
        assert_eq!(m.logical_hand_count(), 0);
    }
}
