// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interaction events and their ordering.
//!
//! ## Ordering
//!
//! Every event raised during a step is tagged with the [`Stage`] that produced it. Before a step's
//! events are dispatched they are stably sorted by stage and, inside the hover, contact and stay
//! stages, by a fixed rank:
//!
//! - Tracking: emission order (suspension begin, timeouts, drops).
//! - Hover: per-controller hover end, per-controller primary end, per-controller primary begin,
//!   per-controller hover begin, then aggregate hover end, primary end, primary begin, hover begin.
//! - Contact: per-controller end, per-controller begin, aggregate end, aggregate begin.
//! - Grasp: emission order, so a swap reads end-then-begin with nothing in between.
//! - Stay: hover, primary hover, contact, grasp.
//!
//! Events raised outside a step are delivered in emission order.

use alloc::vec::Vec;

use crate::types::{ControllerId, ObjectId};

/// What happened.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The first controller started hovering the object.
    HoverBegin,
    /// The object is hovered by at least one controller this step.
    HoverStay,
    /// The last hovering controller left.
    HoverEnd,
    /// The object became the primary hover of its first controller.
    PrimaryHoverBegin,
    /// The object is some controller's primary hover this step.
    PrimaryHoverStay,
    /// The object stopped being anyone's primary hover.
    PrimaryHoverEnd,
    /// The first controller touched the object.
    ContactBegin,
    /// The object is touched this step.
    ContactStay,
    /// The last touching controller let go.
    ContactEnd,
    /// The first controller grasped the object.
    GraspBegin,
    /// The object is held this step.
    GraspStay,
    /// The last grasping controller released the object.
    GraspEnd,
    /// A controller started hovering the object.
    PerControllerHoverBegin(ControllerId),
    /// A controller stopped hovering the object.
    PerControllerHoverEnd(ControllerId),
    /// The object became this controller's primary hover.
    PerControllerPrimaryHoverBegin(ControllerId),
    /// The object stopped being this controller's primary hover.
    PerControllerPrimaryHoverEnd(ControllerId),
    /// A controller started touching the object.
    PerControllerContactBegin(ControllerId),
    /// A controller stopped touching the object.
    PerControllerContactEnd(ControllerId),
    /// A controller grasped the object.
    PerControllerGraspBegin(ControllerId),
    /// A controller released the object.
    PerControllerGraspEnd(ControllerId),
    /// The object's sole grasping controller lost tracking; the grasp is held open.
    SuspensionBegin(ControllerId),
    /// The suspension ended. Carries the controller now holding the object after a
    /// reconnection or resumption, or the suspending controller when the grasp is ending.
    SuspensionEnd(ControllerId),
}

impl EventKind {
    /// The controller a per-controller event is about.
    pub fn controller(&self) -> Option<ControllerId> {
        match *self {
            Self::PerControllerHoverBegin(c)
            | Self::PerControllerHoverEnd(c)
            | Self::PerControllerPrimaryHoverBegin(c)
            | Self::PerControllerPrimaryHoverEnd(c)
            | Self::PerControllerContactBegin(c)
            | Self::PerControllerContactEnd(c)
            | Self::PerControllerGraspBegin(c)
            | Self::PerControllerGraspEnd(c)
            | Self::SuspensionBegin(c)
            | Self::SuspensionEnd(c) => Some(c),
            _ => None,
        }
    }

    /// The observer category this event is delivered under.
    pub fn category(&self) -> EventCategories {
        match self {
            Self::HoverBegin
            | Self::HoverStay
            | Self::HoverEnd
            | Self::PerControllerHoverBegin(_)
            | Self::PerControllerHoverEnd(_) => EventCategories::HOVER,
            Self::PrimaryHoverBegin
            | Self::PrimaryHoverStay
            | Self::PrimaryHoverEnd
            | Self::PerControllerPrimaryHoverBegin(_)
            | Self::PerControllerPrimaryHoverEnd(_) => EventCategories::PRIMARY_HOVER,
            Self::ContactBegin
            | Self::ContactStay
            | Self::ContactEnd
            | Self::PerControllerContactBegin(_)
            | Self::PerControllerContactEnd(_) => EventCategories::CONTACT,
            Self::GraspBegin
            | Self::GraspStay
            | Self::GraspEnd
            | Self::PerControllerGraspBegin(_)
            | Self::PerControllerGraspEnd(_) => EventCategories::GRASP,
            Self::SuspensionBegin(_) | Self::SuspensionEnd(_) => EventCategories::SUSPENSION,
        }
    }

    /// Position inside a ranked stage. Lower sorts first.
    fn rank(&self) -> u8 {
        match self {
            Self::PerControllerHoverEnd(_)
            | Self::PerControllerContactEnd(_)
            | Self::HoverStay => 0,
            Self::PerControllerPrimaryHoverEnd(_)
            | Self::PerControllerContactBegin(_)
            | Self::PrimaryHoverStay => 1,
            Self::PerControllerPrimaryHoverBegin(_) | Self::ContactEnd | Self::ContactStay => 2,
            Self::PerControllerHoverBegin(_) | Self::ContactBegin | Self::GraspStay => 3,
            Self::HoverEnd => 4,
            Self::PrimaryHoverEnd => 5,
            Self::PrimaryHoverBegin => 6,
            Self::HoverBegin => 7,
            _ => 0,
        }
    }
}

/// An event about one object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InteractionEvent {
    /// The object concerned.
    pub object: ObjectId,
    /// What happened.
    pub kind: EventKind,
}

bitflags::bitflags! {
    /// Event categories observers subscribe to.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EventCategories: u8 {
        /// Hover and per-controller hover events.
        const HOVER         = 0b0000_0001;
        /// Primary hover events.
        const PRIMARY_HOVER = 0b0000_0010;
        /// Contact events.
        const CONTACT       = 0b0000_0100;
        /// Grasp events.
        const GRASP         = 0b0000_1000;
        /// Suspension begin/end.
        const SUSPENSION    = 0b0001_0000;
    }
}

/// The pipeline stage an event was raised in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Stage {
    Tracking,
    Hover,
    Contact,
    Grasp,
    Stay,
}

impl Stage {
    const fn ranked(self) -> bool {
        matches!(self, Self::Hover | Self::Contact | Self::Stay)
    }
}

/// Events collected while state changes, awaiting dispatch.
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    entries: Vec<(Stage, InteractionEvent)>,
}

impl EventQueue {
    pub(crate) fn push(&mut self, stage: Stage, object: ObjectId, kind: EventKind) {
        self.entries.push((stage, InteractionEvent { object, kind }));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take all events in emission order.
    pub(crate) fn take(&mut self) -> Vec<InteractionEvent> {
        self.entries.drain(..).map(|(_, e)| e).collect()
    }

    /// Take all events in step order.
    pub(crate) fn take_ordered(&mut self) -> Vec<InteractionEvent> {
        self.entries.sort_by_key(|(stage, e)| {
            let rank = if stage.ranked() { e.kind.rank() } else { 0 };
            (*stage, rank)
        });
        self.take()
    }
}
