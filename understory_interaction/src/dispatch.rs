// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observers, deferred commands, and the dispatcher that feeds one to the other.
//!
//! Observers are kept in one explicit list and called in registration order for every event in
//! the categories they subscribed to. An observer cannot touch the manager while it is being
//! called; instead it queues [`Command`]s, which the manager applies once the current batch of
//! events has been delivered. Events raised by those commands are delivered in turn.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use tracing::warn;

use crate::error::HostError;
use crate::event::{EventCategories, InteractionEvent};
use crate::types::{ControllerId, ObjectId};

/// A mutation requested from inside an observer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Unregister an object.
    Unregister(ObjectId),
    /// Unregister a controller.
    UnregisterController(ControllerId),
    /// Release every grasp on an object.
    Release(ObjectId),
}

/// Commands queued by observers, applied after the current dispatch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandQueue {
    commands: Vec<Command>,
}

impl CommandQueue {
    /// Queue a command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Queue unregistration of `object`.
    pub fn unregister(&mut self, object: ObjectId) {
        self.push(Command::Unregister(object));
    }

    /// Queue unregistration of `controller`.
    pub fn unregister_controller(&mut self, controller: ControllerId) {
        self.push(Command::UnregisterController(controller));
    }

    /// Queue release of `object`.
    pub fn release(&mut self, object: ObjectId) {
        self.push(Command::Release(object));
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub(crate) fn take(&mut self) -> Vec<Command> {
        core::mem::take(&mut self.commands)
    }
}

/// Receives interaction events.
///
/// Returning an error never aborts the caller: the event's object is marked misbehaving and
/// unregistered at the start of the next step.
pub trait InteractionObserver {
    /// Handle one event.
    fn on_event(
        &mut self,
        event: &InteractionEvent,
        commands: &mut CommandQueue,
    ) -> Result<(), HostError>;
}

impl<F> InteractionObserver for F
where
    F: FnMut(&InteractionEvent, &mut CommandQueue) -> Result<(), HostError>,
{
    fn on_event(
        &mut self,
        event: &InteractionEvent,
        commands: &mut CommandQueue,
    ) -> Result<(), HostError> {
        self(event, commands)
    }
}

/// Handle returned by [`InteractionManager::add_observer`](crate::InteractionManager::add_observer).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

struct Entry {
    id: ObserverId,
    categories: EventCategories,
    observer: Box<dyn InteractionObserver>,
}

#[derive(Default)]
pub(crate) struct EventDispatcher {
    observers: Vec<Entry>,
    next_id: u32,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("observers", &self.observers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl EventDispatcher {
    pub(crate) fn add(
        &mut self,
        categories: EventCategories,
        observer: Box<dyn InteractionObserver>,
    ) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.observers.push(Entry {
            id,
            categories,
            observer,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|e| e.id != id);
        self.observers.len() != before
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver `events` in order. Returns the objects whose observers failed.
    pub(crate) fn dispatch(
        &mut self,
        events: &[InteractionEvent],
        commands: &mut CommandQueue,
    ) -> Vec<ObjectId> {
        let mut failed = Vec::new();
        for event in events {
            let category = event.kind.category();
            for entry in &mut self.observers {
                if !entry.categories.intersects(category) {
                    continue;
                }
                if let Err(error) = entry.observer.on_event(event, commands) {
                    warn!(object = ?event.object, kind = ?event.kind, %error, "observer failed");
                    if !failed.contains(&event.object) {
                        failed.push(event.object);
                    }
                }
            }
        }
        failed
    }
}
