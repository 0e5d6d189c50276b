//! Datagram source abstraction.

use crate::Result;
use std::net::SocketAddr;

/// Trait for raw datagram sources feeding the watcher task.
///
/// Sources abstract over where telemetry bytes come from (a bound UDP
/// socket, a scripted replay) and handle their own timing internally:
/// the UDP source absorbs receive timeouts, the scripted source paces
/// its queue.
#[async_trait::async_trait]
pub trait DatagramSource: Send + 'static {
    /// Get the next raw datagram.
    ///
    /// Returns:
    /// - `Ok(Some(bytes))` - Datagram received
    /// - `Ok(None)` - Source ended (normal termination; the expected path
    ///   when the transport closes during shutdown)
    /// - `Err(e)` - Unexpected transport error (tolerated up to a bound
    ///   by the watcher)
    ///
    /// Receive timeouts are steady-state noise while the upstream process
    /// is silent; implementations log and keep waiting rather than
    /// surfacing them.
    async fn next_datagram(&mut self) -> Result<Option<Vec<u8>>>;

    /// The local endpoint this source receives on, if it has one.
    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}
