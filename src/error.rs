//! Error types for the telemetry listener.
//!
//! All errors implement the `std::error::Error` trait and carry structured
//! context. The taxonomy follows the failure semantics of the capture
//! service:
//!
//! - **Bind errors**: the UDP endpoint could not be bound at activation.
//!   Fatal: surfaced to the caller, the service does not start.
//! - **Transport errors**: unexpected socket failures while receiving.
//!   Tolerated up to a bound by the watcher task.
//! - **Timeouts**: the source was silent for one receive interval.
//!   Steady-state noise, recovered locally and never fatal.
//! - **Malformed datagrams**: wire data that cannot be decoded. The
//!   datagram is dropped; existing history state is never touched.
//! - **Config errors**: invalid construction parameters or config files.
//!
//! Transport closure during `deactivate()` is the expected shutdown path
//! and is reported as end-of-stream by the source, not as an error.
//!
//! ## Retry classification
//!
//! ```rust
//! use simwatch::SensorError;
//!
//! let error = SensorError::transport("receive failed", std::io::Error::other("reset"));
//! assert!(error.is_retryable());
//!
//! let error = SensorError::config("history_len must be nonzero");
//! assert!(!error.is_retryable());
//! ```

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for listener operations.
pub type Result<T, E = SensorError> = std::result::Result<T, E>;

/// Main error type for the telemetry listener.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SensorError {
    #[error("Failed to bind UDP endpoint {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport error: {context}")]
    Transport {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No datagram within {duration:?}")]
    Timeout { duration: Duration },

    #[error("Malformed datagram ({len} bytes): {details}")]
    MalformedDatagram { len: usize, details: String },

    #[error("Invalid listener configuration: {reason}")]
    Config { reason: String },
}

impl SensorError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// Timeouts and transport hiccups clear on their own once the upstream
    /// source resumes sending; bind failures, malformed data, and bad
    /// configuration do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SensorError::Timeout { .. } => true,
            SensorError::Transport { .. } => true,
            SensorError::Bind { .. } => false,
            SensorError::MalformedDatagram { .. } => false,
            SensorError::Config { .. } => false,
        }
    }

    /// Helper constructor for bind failures with endpoint context.
    pub fn bind_failed(addr: SocketAddr, source: std::io::Error) -> Self {
        SensorError::Bind { addr, source }
    }

    /// Helper constructor for transport errors.
    pub fn transport(context: impl Into<String>, source: std::io::Error) -> Self {
        SensorError::Transport { context: context.into(), source }
    }

    /// Helper constructor for malformed-datagram errors.
    pub fn malformed(len: usize, details: impl Into<String>) -> Self {
        SensorError::MalformedDatagram { len, details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        SensorError::Config { reason: reason.into() }
    }
}
