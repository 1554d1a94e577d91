// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracking continuity: logical hands that outlive raw controller id churn.
//!
//! Hand-tracking runtimes may report the same physical hand under a new controller id after
//! they lose and re-detect it. A [`LogicalHand`] is the stable identity behind those ids. The
//! tracker only keeps the bookkeeping; the manager decides, step by step, when a hand is lost,
//! reconnected, timed out or dropped.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use glam::Vec3;

use crate::config::ReconnectPolicy;
use crate::types::{Chirality, ControllerFrame, ControllerId, HandId};

/// A hand identity spanning controller id changes.
#[derive(Clone, Debug, PartialEq)]
pub struct LogicalHand {
    id: HandId,
    controller: ControllerId,
    chirality: Chirality,
    last_update_time: f64,
    last_position: Vec3,
    untracked: bool,
    max_suspension_time: f32,
}

impl LogicalHand {
    /// Stable handle of this hand.
    pub fn id(&self) -> HandId {
        self.id
    }

    /// Controller id the hand is currently reported under.
    pub fn controller(&self) -> ControllerId {
        self.controller
    }

    /// Handedness.
    pub fn chirality(&self) -> Chirality {
        self.chirality
    }

    /// Time of the last tracking sample, in seconds.
    pub fn last_update_time(&self) -> f64 {
        self.last_update_time
    }

    /// Position at the last tracking sample.
    pub fn last_position(&self) -> Vec3 {
        self.last_position
    }

    /// Whether the hand has lost tracking while holding something.
    pub fn is_untracked(&self) -> bool {
        self.untracked
    }

    /// Suspension timeout that applies while untracked, in seconds.
    pub fn max_suspension_time(&self) -> f32 {
        self.max_suspension_time
    }

    /// Seconds since the last sample.
    pub fn age(&self, now: f64) -> f64 {
        now - self.last_update_time
    }
}

#[derive(Debug, Default)]
pub(crate) struct TrackingContinuityTracker {
    hands: Vec<Option<LogicalHand>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    by_controller: BTreeMap<ControllerId, HandId>,
}

impl TrackingContinuityTracker {
    pub(crate) fn hand(&self, controller: ControllerId) -> Option<&LogicalHand> {
        let id = *self.by_controller.get(&controller)?;
        self.hands.get(id.idx())?.as_ref()
    }

    fn hand_mut(&mut self, controller: ControllerId) -> Option<&mut LogicalHand> {
        let id = *self.by_controller.get(&controller)?;
        self.hands.get_mut(id.idx())?.as_mut()
    }

    /// Hands in slot order.
    pub(crate) fn hands(&self) -> impl Iterator<Item = &LogicalHand> + '_ {
        self.hands.iter().flatten()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_controller.len()
    }

    /// Create a hand for a controller seen for the first time.
    pub(crate) fn create(&mut self, frame: &ControllerFrame, time: f64) -> HandId {
        let idx = self.free_list.pop().unwrap_or_else(|| {
            self.hands.push(None);
            self.generations.push(0);
            self.hands.len() - 1
        });
        let generation = self.generations[idx].saturating_add(1);
        self.generations[idx] = generation;
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Hand slots are bounded by the number of simultaneously tracked controllers."
        )]
        let id = HandId::new(idx as u32, generation);
        self.hands[idx] = Some(LogicalHand {
            id,
            controller: frame.id,
            chirality: frame.chirality,
            last_update_time: time,
            last_position: frame.pose.position,
            untracked: false,
            max_suspension_time: 0.0,
        });
        self.by_controller.insert(frame.id, id);
        id
    }

    /// Record a sample for a mapped controller. Returns `true` if the hand was untracked.
    pub(crate) fn refresh(&mut self, frame: &ControllerFrame, time: f64) -> bool {
        let Some(hand) = self.hand_mut(frame.id) else {
            return false;
        };
        let was_untracked = hand.untracked;
        hand.untracked = false;
        hand.last_update_time = time;
        hand.last_position = frame.pose.position;
        hand.chirality = frame.chirality;
        was_untracked
    }

    /// Mark a hand untracked with the timeout of the object it holds.
    pub(crate) fn mark_untracked(&mut self, controller: ControllerId, max_suspension_time: f32) {
        if let Some(hand) = self.hand_mut(controller) {
            hand.untracked = true;
            hand.max_suspension_time = max_suspension_time;
        }
    }

    /// Pick the untracked hand a newly seen controller should take over, among those for which
    /// `eligible` holds.
    pub(crate) fn reconnect_candidate(
        &self,
        frame: &ControllerFrame,
        policy: ReconnectPolicy,
        eligible: impl Fn(ControllerId) -> bool,
    ) -> Option<ControllerId> {
        let mut matching = self
            .hands()
            .filter(|h| h.untracked && h.chirality == frame.chirality && eligible(h.controller));
        match policy {
            ReconnectPolicy::FirstFound => matching.next().map(|h| h.controller),
            ReconnectPolicy::Nearest => {
                let p = frame.pose.position;
                let mut best: Option<(&LogicalHand, f32)> = None;
                for h in matching {
                    let d = h.last_position.distance_squared(p);
                    if best.is_none_or(|(_, b)| d < b) {
                        best = Some((h, d));
                    }
                }
                best.map(|(h, _)| h.controller)
            }
        }
    }

    /// Move a hand from `old` to `new` and mark it tracked.
    pub(crate) fn rebind(&mut self, old: ControllerId, frame: &ControllerFrame, time: f64) {
        let Some(id) = self.by_controller.remove(&old) else {
            return;
        };
        self.by_controller.insert(frame.id, id);
        let _ = self.refresh(frame, time);
        if let Some(hand) = self.hand_mut(frame.id) {
            hand.controller = frame.id;
        }
    }

    /// Tracked hands whose controller is absent from `seen`.
    pub(crate) fn newly_missing(&self, seen: &BTreeSet<ControllerId>) -> Vec<ControllerId> {
        self.hands()
            .filter(|h| !h.untracked && !seen.contains(&h.controller))
            .map(|h| h.controller)
            .collect()
    }

    /// Untracked hands whose suspension has run out at `time`.
    pub(crate) fn expired(&self, time: f64) -> Vec<ControllerId> {
        self.hands()
            .filter(|h| h.untracked && h.age(time) > f64::from(h.max_suspension_time))
            .map(|h| h.controller)
            .collect()
    }

    /// Hands whose controller is absent from `seen`, tracked or not.
    pub(crate) fn stale(&self, seen: &BTreeSet<ControllerId>) -> Vec<ControllerId> {
        self.hands()
            .filter(|h| !seen.contains(&h.controller))
            .map(|h| h.controller)
            .collect()
    }

    pub(crate) fn remove(&mut self, controller: ControllerId) -> Option<LogicalHand> {
        let id = self.by_controller.remove(&controller)?;
        let hand = self.hands.get_mut(id.idx())?.take()?;
        self.free_list.push(id.idx());
        Some(hand)
    }
}
