//! Snapshot type returned to accessor callers.

use serde::{Deserialize, Serialize};

/// Immutable view of the two bounded channel histories.
///
/// Both sequences are ordered oldest to newest and are always exactly
/// `history_len` elements long, zero-padded until enough datagrams have
/// arrived. The chatbot-context collaborator serializes this directly into
/// its prompt-building payload, hence the serde derives.
///
/// # Example
///
/// ```rust
/// use simwatch::SensorSnapshot;
///
/// let snapshot = SensorSnapshot::zeroed(20);
/// assert_eq!(snapshot.steering.len(), 20);
/// assert_eq!(snapshot.speed.len(), 20);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Recent steering-wheel angles, in degrees.
    pub steering: Vec<f64>,
    /// Recent longitudinal speeds.
    pub speed: Vec<f64>,
}

impl SensorSnapshot {
    /// A snapshot of `history_len` zeros per channel, the state readers
    /// observe before any telemetry has arrived.
    pub fn zeroed(history_len: usize) -> Self {
        Self { steering: vec![0.0; history_len], speed: vec![0.0; history_len] }
    }

    /// The newest steering sample.
    pub fn latest_steering(&self) -> Option<f64> {
        self.steering.last().copied()
    }

    /// The newest speed sample.
    pub fn latest_speed(&self) -> Option<f64> {
        self.speed.last().copied()
    }
}
