// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Manager configuration.

use crate::error::ConfigError;
use crate::movement::GraspMovement;
use crate::throw::ThrowHandler;

/// How a controller id that appears out of nowhere is matched to a hand that lost tracking.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Take the first untracked hand of matching chirality, in hand slot order.
    #[default]
    FirstFound,
    /// Take the untracked hand of matching chirality whose last known position is nearest.
    Nearest,
}

/// Broad-phase structure used to find objects near controllers.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum Broadphase {
    /// Linear scan. Best for a few dozen objects.
    #[default]
    Flat,
    /// Uniform grid with cubic cells of the given side, in meters.
    Grid {
        /// Cell side length.
        cell: f32,
    },
}

/// Tunables for an [`InteractionManager`](crate::InteractionManager).
#[derive(Clone, Debug, PartialEq)]
pub struct InteractionConfig {
    /// Controllers closer than this to an object's colliders hover it.
    pub hover_activation_radius: f32,
    /// Objects closer than this are offered to the engine as contact and grasp candidates.
    pub touch_activation_radius: f32,
    /// Objects closer than this to a controller are activated.
    pub activation_radius: f32,
    /// How many touching hops activation spreads from a directly activated object.
    pub max_activation_depth: u32,
    /// Default suspension timeout in seconds for objects without their own.
    pub default_max_suspension_time: f32,
    /// Matching rule for re-detected hands.
    pub reconnect_policy: ReconnectPolicy,
    /// Seconds of held-object poses kept for throw velocity estimation.
    pub velocity_history_window: f32,
    /// Default movement strategy.
    pub default_movement: GraspMovement,
    /// Default throw strategy.
    pub default_throw: ThrowHandler,
    /// Broad-phase structure.
    pub broadphase: Broadphase,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            hover_activation_radius: 0.2,
            touch_activation_radius: 0.075,
            activation_radius: 0.3,
            max_activation_depth: 3,
            default_max_suspension_time: 4.0,
            reconnect_policy: ReconnectPolicy::FirstFound,
            velocity_history_window: 0.1,
            default_movement: GraspMovement::default(),
            default_throw: ThrowHandler::default(),
            broadphase: Broadphase::Flat,
        }
    }
}

impl InteractionConfig {
    /// Check that every radius and duration is usable and that the radii nest.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("hover_activation_radius", self.hover_activation_radius),
            ("touch_activation_radius", self.touch_activation_radius),
            ("activation_radius", self.activation_radius),
            (
                "default_max_suspension_time",
                self.default_max_suspension_time,
            ),
            ("velocity_history_window", self.velocity_history_window),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue { name, value });
            }
        }
        if let Broadphase::Grid { cell } = self.broadphase {
            if !cell.is_finite() || cell <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    name: "broadphase.cell",
                    value: cell,
                });
            }
        }
        if let GraspMovement::NonKinematic { max_speed } = self.default_movement {
            if !max_speed.is_finite() || max_speed < 0.0 {
                return Err(ConfigError::InvalidValue {
                    name: "default_movement.max_speed",
                    value: max_speed,
                });
            }
        }
        if self.touch_activation_radius > self.hover_activation_radius {
            return Err(ConfigError::TouchExceedsHover {
                touch: self.touch_activation_radius,
                hover: self.hover_activation_radius,
            });
        }
        if self.hover_activation_radius > self.activation_radius {
            return Err(ConfigError::HoverExceedsActivation {
                hover: self.hover_activation_radius,
                activation: self.activation_radius,
            });
        }
        if self.velocity_history_window == 0.0 {
            return Err(ConfigError::EmptyHistoryWindow);
        }
        Ok(())
    }
}
