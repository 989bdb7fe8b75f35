//! Bounded exponential backoff for polling reads.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Read backoff settings.
///
/// Each empty read doubles the wait for the next one, up to `max`.
/// Any data resets the wait to `initial`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backoff {
    /// Wait before the first retry.
    pub initial: Duration,

    /// Upper bound for a single wait.
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(50),
            max: Duration::from_millis(800),
        }
    }
}

impl Backoff {
    /// Create a backoff with the given bounds.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    /// Start a fresh sequence of waits.
    pub fn start(&self) -> BackoffState {
        BackoffState {
            current: self.initial.min(self.max),
            config: *self,
        }
    }
}

/// Progress through a backoff sequence.
#[derive(Debug, Clone)]
pub struct BackoffState {
    current: Duration,
    config: Backoff,
}

impl BackoffState {
    /// The wait to use for the next read.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Record an empty read.
    pub fn grow(&mut self) {
        self.current = (self.current * 2).min(self.config.max);
    }

    /// Record a read that returned data.
    pub fn reset(&mut self) {
        self.current = self.config.initial.min(self.config.max);
    }
}
