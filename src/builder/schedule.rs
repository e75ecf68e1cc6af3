use bevy::prelude::*;

/// Default delay between the last edit and the recompute, in seconds.
pub const DEFAULT_UPDATE_INTERVAL: f32 = 1.0;

/// Debounced recompute timer.
///
/// Every edit re-arms the timer. It fires once `interval` seconds after the
/// last edit, unless the host moved since it was armed, in which case it
/// re-arms and waits again.
#[derive(Debug, Clone, PartialEq)]
pub struct RecomputeSchedule {
    interval: f32,
    elapsed: f32,
    armed: bool,
    armed_transform: Transform,
}

impl Default for RecomputeSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATE_INTERVAL)
    }
}

impl RecomputeSchedule {
    /// Create a disarmed timer, clamping `interval` to `0.01..=10` seconds.
    pub fn new(interval: f32) -> Self {
        Self {
            interval: interval.clamp(0.01, 10.0),
            elapsed: 0.0,
            armed: false,
            armed_transform: Transform::IDENTITY,
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Change the delay, clamped to `0.01..=10` seconds.
    pub fn set_interval(&mut self, interval: f32) {
        self.interval = interval.clamp(0.01, 10.0);
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Restart the countdown, remembering where the host is now.
    pub fn arm(&mut self, transform: Transform) {
        self.armed = true;
        self.elapsed = 0.0;
        self.armed_transform = transform;
    }

    /// Stop the countdown without firing.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.elapsed = 0.0;
    }

    /// Advance by `delta` seconds. Returns `true` when a recompute is due.
    pub fn tick(&mut self, delta: f32, transform: Transform) -> bool {
        if !self.armed {
            return false;
        }

        self.elapsed += delta;
        if self.elapsed < self.interval {
            return false;
        }

        if transform != self.armed_transform {
            // Still being moved, wait for it to settle
            self.arm(transform);
            return false;
        }

        self.disarm();
        true
    }
}
