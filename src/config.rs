//! Listener configuration.
//!
//! Construction parameters for the telemetry listener. The surrounding
//! application supplies these either as a plain config object, from
//! environment variables (`SIMWATCH_*`), or from a YAML config file.
//!
//! The two tracked wire channel ids are a deployment constant of the
//! simulator's export setup and therefore always configurable, never
//! hard-coded. The defaults match the observed SCANeR deployment:
//! steering angle on channel 167, longitudinal speed on channel 120,
//! pushed to port 46012 as 8-byte little-endian doubles.

use crate::{Result, SensorError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Default UDP endpoint the simulator pushes datagrams to.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:46012";

/// Byte width of one encoded value on the wire (64-bit double).
pub const DEFAULT_VALUE_WIDTH: usize = 8;

/// Default capacity of each bounded channel history.
pub const DEFAULT_HISTORY_LEN: usize = 20;

/// Wire channel ids for the two tracked vehicle signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMap {
    /// Channel id carrying the steering-wheel angle in degrees.
    pub steering: i64,
    /// Channel id carrying the longitudinal vehicle speed.
    pub speed: i64,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self { steering: 167, speed: 120 }
    }
}

/// How a datagram carrying only one of the two tracked channels is applied.
///
/// The upstream export is inconsistent about whether both channels arrive
/// in every datagram, so the choice is explicit configuration rather than
/// an inferred behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// Each tracked channel present in a datagram updates its own history.
    #[default]
    Independent,
    /// Both tracked channels must be present or the datagram is a no-op
    /// for both histories.
    RequireBoth,
}

/// Construction parameters for a [`SensorListener`](crate::SensorListener).
///
/// # Example
///
/// ```rust
/// use simwatch::ListenerConfig;
///
/// let config = ListenerConfig {
///     bind_addr: "127.0.0.1:46012".parse().unwrap(),
///     history_len: 20,
///     ..ListenerConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Local endpoint to bind; the simulator pushes datagrams here.
    pub bind_addr: SocketAddr,

    /// Maximum blocking duration per receive, in seconds. Expiry is a
    /// "no data" condition, logged and retried, never fatal.
    pub receive_timeout_secs: f64,

    /// Maximum bytes read per datagram.
    pub buffer_size: usize,

    /// Byte width of one encoded value. Only 8 (little-endian f64) is a
    /// supported wire encoding.
    pub value_width: usize,

    /// Capacity of each bounded channel history.
    pub history_len: usize,

    /// Wire ids of the tracked channels.
    pub channels: ChannelMap,

    /// Partial-datagram routing policy.
    pub update_policy: UpdatePolicy,

    /// Optional delay applied after each processed datagram, in seconds.
    /// Some data boxes flood faster than consumers care to sample.
    pub pace_secs: Option<f64>,

    /// Optional request message sent before each receive. Poll-style
    /// acquisition boxes (MDAQ) answer only when prompted.
    pub probe: Option<Vec<u8>>,

    /// Peer the probe is sent to. Required when `probe` is set.
    pub probe_addr: Option<SocketAddr>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.parse().expect("default bind addr parses"),
            receive_timeout_secs: 5.0,
            buffer_size: 2048,
            value_width: DEFAULT_VALUE_WIDTH,
            history_len: DEFAULT_HISTORY_LEN,
            channels: ChannelMap::default(),
            update_policy: UpdatePolicy::default(),
            pace_secs: None,
            probe: None,
            probe_addr: None,
        }
    }
}

impl ListenerConfig {
    /// Build a config from `SIMWATCH_*` environment variables, starting
    /// from the defaults. Unset variables keep their default value.
    ///
    /// Recognized variables: `SIMWATCH_BIND_ADDR`,
    /// `SIMWATCH_RECEIVE_TIMEOUT_SECS`, `SIMWATCH_BUFFER_SIZE`,
    /// `SIMWATCH_HISTORY_LEN`, `SIMWATCH_STEERING_CHANNEL`,
    /// `SIMWATCH_SPEED_CHANNEL`, `SIMWATCH_UPDATE_POLICY`
    /// (`independent` | `require_both`).
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Config`] when a set variable fails to parse
    /// or the resulting config fails [`validate`](Self::validate).
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("SIMWATCH_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|e| SensorError::config(format!("SIMWATCH_BIND_ADDR: {e}")))?;
        }
        if let Ok(secs) = std::env::var("SIMWATCH_RECEIVE_TIMEOUT_SECS") {
            config.receive_timeout_secs = secs
                .parse()
                .map_err(|e| SensorError::config(format!("SIMWATCH_RECEIVE_TIMEOUT_SECS: {e}")))?;
        }
        if let Ok(size) = std::env::var("SIMWATCH_BUFFER_SIZE") {
            config.buffer_size = size
                .parse()
                .map_err(|e| SensorError::config(format!("SIMWATCH_BUFFER_SIZE: {e}")))?;
        }
        if let Ok(len) = std::env::var("SIMWATCH_HISTORY_LEN") {
            config.history_len = len
                .parse()
                .map_err(|e| SensorError::config(format!("SIMWATCH_HISTORY_LEN: {e}")))?;
        }
        if let Ok(id) = std::env::var("SIMWATCH_STEERING_CHANNEL") {
            config.channels.steering = id
                .parse()
                .map_err(|e| SensorError::config(format!("SIMWATCH_STEERING_CHANNEL: {e}")))?;
        }
        if let Ok(id) = std::env::var("SIMWATCH_SPEED_CHANNEL") {
            config.channels.speed = id
                .parse()
                .map_err(|e| SensorError::config(format!("SIMWATCH_SPEED_CHANNEL: {e}")))?;
        }
        if let Ok(policy) = std::env::var("SIMWATCH_UPDATE_POLICY") {
            config.update_policy = match policy.as_str() {
                "independent" => UpdatePolicy::Independent,
                "require_both" => UpdatePolicy::RequireBoth,
                other => {
                    return Err(SensorError::config(format!(
                        "SIMWATCH_UPDATE_POLICY: unknown policy '{other}'"
                    )));
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a config from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Config`] on parse or validation failure.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| SensorError::config(format!("YAML config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Config`] when the file cannot be read or
    /// parsed, or the result fails validation.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SensorError::config(format!("reading {}: {e}", path.display())))?;
        Self::from_yaml_str(&contents)
    }

    /// Check the parameters for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.value_width != DEFAULT_VALUE_WIDTH {
            return Err(SensorError::config(format!(
                "value_width {} is unsupported; the wire format is 8-byte little-endian doubles",
                self.value_width
            )));
        }
        if self.history_len == 0 {
            return Err(SensorError::config("history_len must be nonzero"));
        }
        if self.buffer_size < self.value_width {
            return Err(SensorError::config(format!(
                "buffer_size {} cannot hold a single {}-byte value",
                self.buffer_size, self.value_width
            )));
        }
        if !self.receive_timeout_secs.is_finite() || self.receive_timeout_secs <= 0.0 {
            return Err(SensorError::config("receive_timeout_secs must be positive and finite"));
        }
        if let Some(pace) = self.pace_secs {
            if !pace.is_finite() || pace < 0.0 {
                return Err(SensorError::config("pace_secs must be nonnegative and finite"));
            }
        }
        if self.probe.is_some() && self.probe_addr.is_none() {
            return Err(SensorError::config("probe requires probe_addr"));
        }
        Ok(())
    }

    /// Receive timeout as a [`Duration`].
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.receive_timeout_secs)
    }

    /// Post-datagram pacing delay, if configured.
    pub fn pace(&self) -> Option<Duration> {
        self.pace_secs.map(Duration::from_secs_f64)
    }
}
