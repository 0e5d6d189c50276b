//! Telemetry listener lifecycle and snapshot accessor.

use futures::Stream;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ListenerConfig;
use crate::source::DatagramSource;
use crate::sources::{ScriptedSource, UdpSource};
use crate::types::SensorSnapshot;
use crate::watcher::Watcher;
use crate::{Result, SensorError};

/// Live, bounded-history view of two vehicle telemetry channels.
///
/// Owns the UDP socket and the background decode task for its active
/// lifetime: construct, [`activate`](Self::activate), read snapshots, then
/// [`deactivate`](Self::deactivate). Dropping an active listener cancels
/// the task, so cleanup runs on all exit paths even when `deactivate` is
/// never reached.
///
/// # Example
///
/// ```rust,no_run
/// use simwatch::{ListenerConfig, SensorListener};
///
/// #[tokio::main]
/// async fn main() -> simwatch::Result<()> {
///     let mut listener = SensorListener::new(ListenerConfig::default())?;
///     listener.activate().await?;
///
///     let snapshot = listener.get_sensor_data();
///     println!("newest speed: {:?}", snapshot.latest_speed());
///
///     listener.deactivate().await;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct SensorListener {
    config: ListenerConfig,
    snapshots: watch::Receiver<Arc<SensorSnapshot>>,
    local_addr: Option<SocketAddr>,
    active: Option<ActiveWatcher>,
    spent: bool,
}

/// Resources owned only while the listener is active.
#[derive(Debug)]
struct ActiveWatcher {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SensorListener {
    /// Create an inactive listener.
    ///
    /// The accessor already works: it serves the zero-padded snapshot
    /// until activation delivers real data.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Config`] when the configuration is invalid.
    pub fn new(config: ListenerConfig) -> Result<Self> {
        config.validate()?;

        // Sender dropped on purpose: the receiver keeps serving the
        // zero-padded value until activation swaps in the watcher channel.
        let (_tx, snapshots) = watch::channel(Arc::new(SensorSnapshot::zeroed(config.history_len)));

        Ok(Self { config, snapshots, local_addr: None, active: None, spent: false })
    }

    /// Bind the UDP endpoint and start the decode task.
    ///
    /// Activating an already-active listener is a no-op. A listener that
    /// has been deactivated stays spent; create a new instance instead of
    /// rebinding through a stale one.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Bind`] when the endpoint is unavailable.
    /// Binding is not retried internally; the service does not start.
    /// Returns [`SensorError::Config`] for a spent listener.
    pub async fn activate(&mut self) -> Result<()> {
        if self.active.is_some() {
            debug!("listener already active");
            return Ok(());
        }
        if self.spent {
            return Err(SensorError::config(
                "listener already deactivated; create a new instance",
            ));
        }

        info!(bind_addr = %self.config.bind_addr, "activating telemetry listener");

        let source = UdpSource::bind(&self.config).await?;
        self.local_addr = source.local_addr();
        self.attach(Watcher::spawn(source, &self.config));

        info!(local_addr = ?self.local_addr, "telemetry listener activated");
        Ok(())
    }

    /// Stop the decode task and wait for it to terminate.
    ///
    /// Cancellation is cooperative: the in-flight receive aborts as a
    /// normal shutdown signal, never as a fault. Idempotent: calling this
    /// on an inactive listener is a no-op.
    pub async fn deactivate(&mut self) {
        let Some(active) = self.active.take() else {
            debug!("listener already inactive");
            return;
        };
        self.spent = true;

        info!("deactivating telemetry listener");
        active.cancel.cancel();
        if let Err(e) = active.handle.await {
            warn!(error = %e, "watcher task ended abnormally");
        }
        info!("telemetry listener deactivated");
    }

    /// Immutable snapshot of the two bounded histories, oldest to newest,
    /// always exactly `history_len` elements per channel.
    ///
    /// Never blocks on the decode loop and never fails: upstream transport
    /// trouble only makes the snapshot stale, not unavailable.
    pub fn get_sensor_data(&self) -> SensorSnapshot {
        self.snapshots.borrow().as_ref().clone()
    }

    /// Stream of snapshot publications for push-style consumers.
    ///
    /// Yields the current snapshot immediately, then one item per accepted
    /// datagram. Lags are collapsed to the latest value by the underlying
    /// watch channel.
    pub fn snapshot_updates(&self) -> impl Stream<Item = Arc<SensorSnapshot>> + 'static {
        WatchStream::new(self.snapshots.clone())
    }

    /// The bound local endpoint while active. Useful with a port-0 config.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Whether the decode task is currently running.
    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|active| !active.handle.is_finished())
    }

    /// Capacity of each channel history.
    pub fn history_len(&self) -> usize {
        self.config.history_len
    }

    /// Create an activated listener fed by a scripted datagram sequence
    /// instead of a UDP socket.
    ///
    /// The task ends on its own once the script drains; the last snapshot
    /// stays readable afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Config`] when the configuration is invalid.
    pub fn scripted(datagrams: Vec<Vec<u8>>, config: ListenerConfig) -> Result<Self> {
        config.validate()?;

        let channels = Watcher::spawn(ScriptedSource::new(datagrams), &config);
        let snapshots = channels.snapshots.clone();

        let mut listener =
            Self { config, snapshots, local_addr: None, active: None, spent: false };
        listener.attach(channels);
        Ok(listener)
    }

    fn attach(&mut self, channels: crate::watcher::WatcherChannels) {
        self.snapshots = channels.snapshots;
        self.active = Some(ActiveWatcher { cancel: channels.cancel, handle: channels.handle });
    }
}

impl Drop for SensorListener {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            debug!("dropping active listener, cancelling watcher task");
            active.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpdatePolicy;
    use crate::wire::encode_pairs;
    use std::time::Duration;

    fn scripted_config(history_len: usize) -> ListenerConfig {
        ListenerConfig { history_len, ..ListenerConfig::default() }
    }

    /// Wait for a scripted watcher to drain its queue, then join it.
    async fn drain(listener: &mut SensorListener) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while listener.is_active() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("scripted watcher must drain promptly");
        listener.deactivate().await;
    }

    #[tokio::test]
    async fn accessor_serves_zeros_before_activation() {
        let listener = SensorListener::new(scripted_config(20)).expect("config is valid");

        assert!(!listener.is_active());
        assert_eq!(listener.get_sensor_data(), SensorSnapshot::zeroed(20));
    }

    #[tokio::test]
    async fn construction_rejects_invalid_config() {
        let config = ListenerConfig { history_len: 0, ..ListenerConfig::default() };
        assert!(matches!(
            SensorListener::new(config),
            Err(SensorError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn scripted_listener_fills_histories_and_finishes() {
        let datagrams = vec![
            encode_pairs(&[(167.0, 1.5), (120.0, 10.0)]),
            encode_pairs(&[(167.0, 2.5), (120.0, 20.0)]),
        ];
        let mut listener =
            SensorListener::scripted(datagrams, scripted_config(3)).expect("config is valid");

        drain(&mut listener).await;

        let snapshot = listener.get_sensor_data();
        assert_eq!(snapshot.steering, vec![0.0, 1.5, 2.5]);
        assert_eq!(snapshot.speed, vec![0.0, 10.0, 20.0]);
        assert!(!listener.is_active());
    }

    #[tokio::test]
    async fn deactivate_is_idempotent() {
        let mut listener =
            SensorListener::scripted(vec![], scripted_config(3)).expect("config is valid");

        listener.deactivate().await;
        listener.deactivate().await;
        assert!(!listener.is_active());
    }

    #[tokio::test]
    async fn snapshot_updates_yield_each_publication() {
        use futures::StreamExt;

        let datagrams = vec![
            encode_pairs(&[(167.0, 1.0), (120.0, 2.0)]),
            encode_pairs(&[(167.0, 3.0), (120.0, 4.0)]),
        ];
        let listener =
            SensorListener::scripted(datagrams, scripted_config(2)).expect("config is valid");

        let mut updates = listener.snapshot_updates();
        let last = tokio::time::timeout(Duration::from_secs(2), async {
            let mut last = None;
            while let Some(snapshot) = updates.next().await {
                let done = snapshot.latest_speed() == Some(4.0);
                last = Some(snapshot);
                if done {
                    break;
                }
            }
            last
        })
        .await
        .expect("updates must arrive promptly")
        .expect("stream yields at least the initial snapshot");

        assert_eq!(last.steering, vec![1.0, 3.0]);
        assert_eq!(last.speed, vec![2.0, 4.0]);
    }

    #[tokio::test]
    async fn interleaved_reads_always_see_full_length_histories() {
        let datagrams: Vec<Vec<u8>> = (0..200)
            .map(|i| encode_pairs(&[(167.0, i as f64), (120.0, (i * 2) as f64)]))
            .collect();
        let mut listener =
            SensorListener::scripted(datagrams, scripted_config(5)).expect("config is valid");

        // Read while the watcher is appending
        for _ in 0..500 {
            let snapshot = listener.get_sensor_data();
            assert_eq!(snapshot.steering.len(), 5);
            assert_eq!(snapshot.speed.len(), 5);
            assert!(snapshot.steering.iter().all(|v| v.is_finite()));
            assert!(snapshot.speed.iter().all(|v| v.is_finite()));
            tokio::task::yield_now().await;
        }

        drain(&mut listener).await;
        let final_snapshot = listener.get_sensor_data();
        assert_eq!(final_snapshot.steering, vec![195.0, 196.0, 197.0, 198.0, 199.0]);
    }

    #[tokio::test]
    async fn update_policy_is_honored_end_to_end() {
        let config = ListenerConfig {
            history_len: 2,
            update_policy: UpdatePolicy::RequireBoth,
            ..ListenerConfig::default()
        };
        let datagrams = vec![
            encode_pairs(&[(167.0, 9.0)]),
            encode_pairs(&[(167.0, 1.0), (120.0, 2.0)]),
        ];
        let mut listener = SensorListener::scripted(datagrams, config).expect("config is valid");
        drain(&mut listener).await;

        let snapshot = listener.get_sensor_data();
        assert_eq!(snapshot.steering, vec![0.0, 1.0]);
        assert_eq!(snapshot.speed, vec![0.0, 2.0]);
    }
}
