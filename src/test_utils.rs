//! Shared helpers for unit tests and benches.

use crate::wire::encode_pairs;

/// Default wire ids used by the observed deployment.
pub const STEERING_CHANNEL: f64 = 167.0;
pub const SPEED_CHANNEL: f64 = 120.0;

/// Build a well-formed datagram carrying one steering and one speed sample.
pub fn steering_speed_datagram(steering: f64, speed: f64) -> Vec<u8> {
    encode_pairs(&[(STEERING_CHANNEL, steering), (SPEED_CHANNEL, speed)])
}

/// Build a datagram with the tracked samples interleaved among untracked
/// channels and sentinel pairs, the way a busy export filter emits them.
pub fn noisy_datagram(steering: f64, speed: f64) -> Vec<u8> {
    encode_pairs(&[
        (11.0, 0.25),
        (f64::INFINITY, -1.0),
        (STEERING_CHANNEL, steering),
        (54.0, 987.0),
        (SPEED_CHANNEL, speed),
    ])
}

/// Install the fmt subscriber for test diagnostics; repeated calls are fine.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}
