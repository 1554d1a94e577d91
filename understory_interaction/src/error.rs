// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! | Error | Returned by | Recoverable |
//! |-------|-------------|-------------|
//! | [`InteractionError`] | manual grasp/release, flag and body updates | Yes: fix the call |
//! | [`ConfigError`] | [`InteractionConfig::validate`](crate::InteractionConfig::validate) | No: fix the config |
//! | [`HostError`] | host callbacks (engine hooks, observers) | Always: the object is isolated |
//!
//! Unregistering an unknown object or controller is not an error; it is a no-op.

use alloc::string::String;

use thiserror::Error;

use crate::types::{ControllerId, ObjectId};

/// Failure of an explicit API call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InteractionError {
    /// The object id is stale or was never registered.
    #[error("unknown object {0:?}")]
    UnknownObject(ObjectId),
    /// The controller id is not registered.
    #[error("unknown controller {0:?}")]
    UnknownController(ControllerId),
    /// The object has [`ObjectFlags::IGNORE_GRASP`](crate::ObjectFlags::IGNORE_GRASP) set.
    #[error("object {0:?} ignores grasping")]
    GraspIgnored(ObjectId),
    /// A single-grasp object is already held by another controller.
    #[error("object {object:?} is already grasped by {by:?}")]
    AlreadyGrasped {
        /// The contested object.
        object: ObjectId,
        /// The current holder.
        by: ControllerId,
    },
    /// The controller is registered but has lost tracking.
    #[error("controller {0:?} is untracked")]
    ControllerUntracked(ControllerId),
    /// The controller is not holding anything.
    #[error("controller {controller:?} is not grasping")]
    NotGrasping {
        /// The idle controller.
        controller: ControllerId,
    },
    /// The object is not held by any controller.
    #[error("object {0:?} is not grasped")]
    ObjectNotGrasped(ObjectId),
}

/// An invalid [`InteractionConfig`](crate::InteractionConfig).
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A radius or duration is negative, NaN or infinite.
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidValue {
        /// Field name.
        name: &'static str,
        /// Offending value.
        value: f32,
    },
    /// The touch radius exceeds the hover radius, so contact could begin without hover.
    #[error("touch radius {touch} exceeds hover radius {hover}")]
    TouchExceedsHover {
        /// Configured touch radius.
        touch: f32,
        /// Configured hover radius.
        hover: f32,
    },
    /// The hover radius exceeds the activation radius, so inactive objects could be hovered.
    #[error("hover radius {hover} exceeds activation radius {activation}")]
    HoverExceedsActivation {
        /// Configured hover radius.
        hover: f32,
        /// Configured activation radius.
        activation: f32,
    },
    /// The velocity history window is zero.
    #[error("velocity history window must be positive")]
    EmptyHistoryWindow,
}

/// Failure reported by a host callback.
///
/// Never aborts a step. The object the callback was serving is marked misbehaving and
/// unregistered at the start of the next step.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("host callback failed: {message}")]
pub struct HostError {
    /// Human-readable cause.
    pub message: String,
}

impl HostError {
    /// Create an error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
