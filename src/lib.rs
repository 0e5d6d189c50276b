//! Bounded-history telemetry capture for driving-simulator sensor streams.
//!
//! Simwatch maintains a live, bounded-history view of two numeric vehicle
//! channels (steering angle and longitudinal speed) pushed over UDP by a
//! driving simulator's export filter.
//!
//! # Features
//!
//! - **Live capture**: UDP datagram decode loop on a background task
//! - **Bounded histories**: the most recent N samples per channel,
//!   zero-padded until data arrives
//! - **Torn-read-free snapshots**: readers clone an atomically-swapped
//!   immutable snapshot, never a half-updated buffer
//! - **Scripted replay**: deterministic datagram feeds for tests and demos
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use simwatch::{ListenerConfig, Simwatch};
//!
//! #[tokio::main]
//! async fn main() -> simwatch::Result<()> {
//!     let listener = Simwatch::listen(ListenerConfig::default()).await?;
//!
//!     let snapshot = listener.get_sensor_data();
//!     println!("steering history: {:?}", snapshot.steering);
//!     println!("speed history: {:?}", snapshot.speed);
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
pub mod history;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;
pub mod wire;

// Capture architecture
pub mod listener;
pub mod source;
pub mod sources;
pub mod watcher;

// Core exports
pub use config::{ChannelMap, ListenerConfig, UpdatePolicy};
pub use error::*;
pub use history::BoundedHistory;
pub use types::SensorSnapshot;

// Capture exports
pub use listener::SensorListener;
pub use source::DatagramSource;
pub use sources::{ScriptedSource, UdpSource};

/// Unified entry point for telemetry capture.
///
/// This factory provides a consistent API for starting a listener against
/// a live simulator endpoint or a scripted datagram feed.
///
/// # Examples
///
/// ## Live capture
/// ```rust,no_run
/// use simwatch::{ListenerConfig, Simwatch};
///
/// #[tokio::main]
/// async fn main() -> simwatch::Result<()> {
///     let listener = Simwatch::listen(ListenerConfig::default()).await?;
///     // Read snapshots...
///     Ok(())
/// }
/// ```
///
/// ## Scripted feed
/// ```rust
/// use simwatch::{ListenerConfig, Simwatch, wire};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> simwatch::Result<()> {
///     let datagrams = vec![wire::encode_pairs(&[(167.0, 10.5), (120.0, 30.2)])];
///     let listener = Simwatch::scripted(datagrams, ListenerConfig::default())?;
///     // Read snapshots...
///     Ok(())
/// }
/// ```
pub struct Simwatch;

impl Simwatch {
    /// Start capturing from the configured UDP endpoint.
    ///
    /// Constructs and activates a [`SensorListener`] in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The UDP endpoint cannot be bound
    pub async fn listen(config: ListenerConfig) -> Result<SensorListener> {
        let mut listener = SensorListener::new(config)?;
        listener.activate().await?;
        Ok(listener)
    }

    /// Start an activated listener over a scripted datagram sequence.
    ///
    /// The capture task ends on its own once the script drains; the last
    /// snapshot stays readable afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn scripted(datagrams: Vec<Vec<u8>>, config: ListenerConfig) -> Result<SensorListener> {
        SensorListener::scripted(datagrams, config)
    }
}
