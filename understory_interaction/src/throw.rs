// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Release velocity: what happens to an object's momentum when the last controller lets go.

use alloc::collections::VecDeque;

use glam::Vec3;

use crate::types::BodyState;

/// Strategy for computing an object's velocity on release.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ThrowHandler {
    /// Leave the body's velocity as the grasp movement left it.
    None,
    /// Release with the last known velocity of the releasing controller.
    LastVelocity,
    /// Average the object's own velocity over the trailing `window` seconds of recorded
    /// poses, scaled by `multiplier`.
    ///
    /// Falls back to the controller velocity when fewer than two samples fall in the window.
    SlidingWindow {
        /// Window length in seconds.
        window: f32,
        /// Scale applied to the averaged velocity.
        multiplier: f32,
    },
}

impl Default for ThrowHandler {
    fn default() -> Self {
        Self::SlidingWindow {
            window: 0.1,
            multiplier: 1.0,
        }
    }
}

impl ThrowHandler {
    /// Seconds of history this handler looks back over.
    pub(crate) fn lookback(&self) -> f32 {
        match *self {
            Self::SlidingWindow { window, .. } => window,
            Self::None | Self::LastVelocity => 0.0,
        }
    }

    /// Compute the release velocity and write it into `body`.
    pub fn release(
        &self,
        body: &mut BodyState,
        history: &VelocityHistory,
        controller_velocity: Vec3,
    ) {
        match *self {
            Self::None => {}
            Self::LastVelocity => body.linear_velocity = controller_velocity,
            Self::SlidingWindow { window, multiplier } => {
                let v = history
                    .average_velocity(f64::from(window))
                    .unwrap_or(controller_velocity);
                body.linear_velocity = v * multiplier;
            }
        }
    }
}

/// Timestamped positions of a held object, trimmed to a trailing window.
#[derive(Clone, Debug, Default)]
pub struct VelocityHistory {
    samples: VecDeque<(f64, Vec3)>,
    keep: f64,
}

impl VelocityHistory {
    /// An empty history retaining `keep` seconds of samples.
    pub fn new(keep: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            keep,
        }
    }

    /// Record a sample. Samples that do not advance time replace the newest one.
    pub fn record(&mut self, time: f64, position: Vec3) {
        match self.samples.back_mut() {
            Some(last) if last.0 >= time => *last = (time, position),
            _ => self.samples.push_back((time, position)),
        }
        // Keep one sample older than the window so a full window can always be spanned.
        while self.samples.len() > 2 && self.samples[1].0 < time - self.keep {
            self.samples.pop_front();
        }
    }

    /// Forget all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are retained.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean velocity over the trailing `window` seconds, if at least two samples span it.
    pub fn average_velocity(&self, window: f64) -> Option<Vec3> {
        let &(t1, p1) = self.samples.back()?;
        let &(t0, p0) = self
            .samples
            .iter()
            .find(|(t, _)| *t >= t1 - window)
            .filter(|(t, _)| *t < t1)?;
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Step intervals are far below f32 precision limits."
        )]
        let dt = (t1 - t0) as f32;
        Some((p1 - p0) / dt)
    }
}
