//! Wire format for simulator telemetry datagrams.
//!
//! The simulator's export filter pushes UDP datagrams containing a flat
//! sequence of little-endian 64-bit IEEE-754 doubles. The sequence is
//! logically paired by position: even positions carry a channel key
//! (encoded as a double and cast to integer), odd positions carry the
//! value for the preceding key.
//!
//! A key of positive or negative infinity is the export filter's "no
//! channel" sentinel; the value that follows it belongs to no channel and
//! is skipped. The sentinel check happens before any integer cast, since
//! casting a non-finite double to an integer is exactly the kind of
//! accidental behavior this decoder refuses to rely on.
//!
//! Decoding never panics. A datagram whose byte length is not a whole
//! multiple of the value width is rejected as malformed; the caller drops
//! it and the receive loop continues.

use crate::config::ChannelMap;
use crate::{Result, SensorError};
use tracing::trace;

/// Byte width of one encoded value: a 64-bit double.
pub const VALUE_WIDTH: usize = std::mem::size_of::<f64>();

/// One decoded (channel id, value) observation from a datagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelReading {
    /// Integer channel id from the wire.
    pub key: i64,
    /// Observed value for the channel.
    pub value: f64,
}

/// Values extracted for the two tracked channels from one datagram.
///
/// When a channel key repeats within a datagram, the last occurrence wins,
/// matching how the export filter emits refreshed values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackedValues {
    pub steering: Option<f64>,
    pub speed: Option<f64>,
}

/// Whether a decoded key position carries the "no channel" sentinel.
///
/// The protocol documents ±∞; NaN keys are treated the same way, since a
/// saturating NaN→0 cast would silently alias a real channel id.
pub fn is_no_channel_sentinel(key: f64) -> bool {
    !key.is_finite()
}

/// Decode one datagram into channel readings.
///
/// A trailing key without a value contributes nothing. Sentinel-keyed
/// pairs are skipped without disturbing the parse of subsequent pairs.
///
/// # Errors
///
/// Returns [`SensorError::MalformedDatagram`] when the byte length is not
/// a whole multiple of [`VALUE_WIDTH`].
pub fn decode_datagram(data: &[u8]) -> Result<Vec<ChannelReading>> {
    if data.len() % VALUE_WIDTH != 0 {
        return Err(SensorError::malformed(
            data.len(),
            format!("length is not a multiple of {VALUE_WIDTH}"),
        ));
    }

    let mut values = data.chunks_exact(VALUE_WIDTH).map(|chunk| {
        let mut bytes = [0u8; VALUE_WIDTH];
        bytes.copy_from_slice(chunk);
        f64::from_le_bytes(bytes)
    });

    let mut readings = Vec::with_capacity(data.len() / (2 * VALUE_WIDTH));
    while let Some(raw_key) = values.next() {
        let Some(value) = values.next() else {
            // Trailing key without a value
            trace!(raw_key, "datagram ends on an unpaired key");
            break;
        };
        if is_no_channel_sentinel(raw_key) {
            trace!("skipping no-channel sentinel pair");
            continue;
        }
        readings.push(ChannelReading { key: raw_key as i64, value });
    }

    Ok(readings)
}

/// Pick out the tracked steering and speed values from decoded readings.
pub fn route(readings: &[ChannelReading], channels: &ChannelMap) -> TrackedValues {
    let mut tracked = TrackedValues::default();
    for reading in readings {
        if reading.key == channels.steering {
            tracked.steering = Some(reading.value);
        } else if reading.key == channels.speed {
            tracked.speed = Some(reading.value);
        }
    }
    tracked
}

/// Encode (key, value) pairs into a wire datagram.
///
/// Used by the synthetic source and by tests to produce the same traffic
/// the simulator's export filter would.
pub fn encode_pairs(pairs: &[(f64, f64)]) -> Vec<u8> {
    let mut data = Vec::with_capacity(pairs.len() * 2 * VALUE_WIDTH);
    for &(key, value) in pairs {
        data.extend_from_slice(&key.to_le_bytes());
        data.extend_from_slice(&value.to_le_bytes());
    }
    data
}
