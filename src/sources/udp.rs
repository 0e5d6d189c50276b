//! Live UDP datagram source.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ListenerConfig;
use crate::source::DatagramSource;
use crate::{Result, SensorError};

/// Datagram source reading from a bound UDP socket.
///
/// The simulator pushes data proactively, so the source binds the
/// configured endpoint rather than connecting outward. Receive timeouts
/// are absorbed internally; the upstream process going quiet must never
/// end the capture loop. A failed receive on a closed socket ends the
/// stream cleanly instead of surfacing an error; that is the expected
/// shutdown path.
#[derive(Debug)]
pub struct UdpSource {
    socket: UdpSocket,
    local_addr: SocketAddr,
    receive_timeout: Duration,
    buffer: Vec<u8>,
    probe: Option<(Vec<u8>, SocketAddr)>,
    pace: Option<Duration>,
    receiving: bool,
}

impl UdpSource {
    /// Bind the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Bind`] when the address is already in use or
    /// otherwise unavailable. Binding is not retried internally.
    pub async fn bind(config: &ListenerConfig) -> Result<Self> {
        let socket = UdpSocket::bind(config.bind_addr)
            .await
            .map_err(|e| SensorError::bind_failed(config.bind_addr, e))?;
        let local_addr = socket
            .local_addr()
            .map_err(|e| SensorError::transport("resolving bound local address", e))?;

        info!(%local_addr, timeout = ?config.receive_timeout(), "UDP telemetry source bound");

        Ok(Self {
            socket,
            local_addr,
            receive_timeout: config.receive_timeout(),
            buffer: vec![0u8; config.buffer_size],
            probe: config.probe.clone().zip(config.probe_addr),
            pace: config.pace(),
            receiving: false,
        })
    }
}

#[async_trait::async_trait]
impl DatagramSource for UdpSource {
    async fn next_datagram(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            // Poll-style acquisition boxes answer only when prompted
            if let Some((probe, peer)) = &self.probe {
                if let Err(e) = self.socket.send_to(probe, *peer).await {
                    warn!(error = %e, peer = %peer, "probe request failed");
                }
            }

            match timeout(self.receive_timeout, self.socket.recv_from(&mut self.buffer)).await {
                Ok(Ok((len, _peer))) => {
                    if !self.receiving {
                        self.receiving = true;
                        info!("telemetry source is sending");
                    }
                    let datagram = self.buffer[..len].to_vec();
                    if let Some(pace) = self.pace {
                        tokio::time::sleep(pace).await;
                    }
                    return Ok(Some(datagram));
                }
                Ok(Err(e)) => match e.kind() {
                    // ICMP unreachable noise from a prior probe send
                    std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::ConnectionReset => {
                        debug!(error = %e, "transient receive error, retrying");
                        continue;
                    }
                    _ => {
                        debug!(error = %e, "socket receive failed, ending datagram stream");
                        return Ok(None);
                    }
                },
                Err(_elapsed) => {
                    debug!(timeout = ?self.receive_timeout, "(timeout) waiting for telemetry datagrams");
                    self.receiving = false;
                    continue;
                }
            }
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config() -> ListenerConfig {
        ListenerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            receive_timeout_secs: 0.2,
            ..ListenerConfig::default()
        }
    }

    #[tokio::test]
    async fn bind_reports_ephemeral_local_addr() {
        let source = UdpSource::bind(&loopback_config()).await.expect("loopback bind succeeds");
        let addr = source.local_addr().expect("UDP source has a local addr");
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn bind_conflict_surfaces_bind_error() {
        let first = UdpSource::bind(&loopback_config()).await.expect("first bind succeeds");
        let taken = first.local_addr().unwrap();

        let conflicting = ListenerConfig { bind_addr: taken, ..loopback_config() };
        let err = UdpSource::bind(&conflicting).await.expect_err("second bind must fail");
        assert!(matches!(err, SensorError::Bind { addr, .. } if addr == taken));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn receives_a_pushed_datagram() {
        let mut source = UdpSource::bind(&loopback_config()).await.expect("bind succeeds");
        let target = source.local_addr().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.expect("sender bind succeeds");
        sender.send_to(b"\x01\x02\x03", target).await.expect("send succeeds");

        let datagram = source
            .next_datagram()
            .await
            .expect("receive succeeds")
            .expect("datagram arrives before the source ends");
        assert_eq!(datagram, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn silence_does_not_end_the_stream() {
        let mut source = UdpSource::bind(&loopback_config()).await.expect("bind succeeds");
        let target = source.local_addr().unwrap();

        // Deliver a datagram after more than one timeout interval of silence
        let sender = UdpSocket::bind("127.0.0.1:0").await.expect("sender bind succeeds");
        let delayed = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            sender.send_to(b"\x00", target).await.expect("send succeeds");
        });

        let datagram = source
            .next_datagram()
            .await
            .expect("timeouts are absorbed internally")
            .expect("stream survives the silent interval");
        assert_eq!(datagram, vec![0]);
        delayed.await.unwrap();
    }
}
