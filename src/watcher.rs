//! Watcher spawns and manages the telemetry decode task.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::{ChannelMap, ListenerConfig, UpdatePolicy};
use crate::history::BoundedHistory;
use crate::source::DatagramSource;
use crate::types::SensorSnapshot;
use crate::wire::{self, TrackedValues};

/// Result of spawning the watcher task.
pub struct WatcherChannels {
    /// Receiver for snapshot publications. Holds the zero-padded snapshot
    /// until the first tracked datagram is processed.
    pub snapshots: watch::Receiver<Arc<SensorSnapshot>>,
    /// Cancellation token for cooperative shutdown.
    pub cancel: CancellationToken,
    /// Handle of the decode task, awaited by `deactivate`.
    pub handle: JoinHandle<()>,
}

/// Watcher spawns and manages the telemetry decode task.
///
/// Exactly one task per listener owns the datagram source and both bounded
/// histories, as the sole writer. After each accepted datagram it publishes a
/// fresh immutable [`SensorSnapshot`] through a watch channel; readers
/// clone the current `Arc` and can never observe a torn sample or a
/// half-updated history.
pub struct Watcher;

/// Per-task copy of the decode parameters.
struct DecodeParams {
    channels: ChannelMap,
    update_policy: UpdatePolicy,
    history_len: usize,
}

impl Watcher {
    /// Spawn the decode task for the given source.
    ///
    /// Returns the snapshot receiver, a cancellation token, and the task
    /// handle for joined shutdown.
    pub fn spawn<S>(source: S, config: &ListenerConfig) -> WatcherChannels
    where
        S: DatagramSource,
    {
        let (snapshot_tx, snapshot_rx) =
            watch::channel(Arc::new(SensorSnapshot::zeroed(config.history_len)));

        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();
        let params = DecodeParams {
            channels: config.channels,
            update_policy: config.update_policy,
            history_len: config.history_len,
        };

        let handle = tokio::spawn(async move {
            Self::decode_loop(source, params, snapshot_tx, cancel_task).await;
        });

        WatcherChannels { snapshots: snapshot_rx, cancel, handle }
    }

    /// Decode task - receives datagrams, routes tracked channels, publishes snapshots.
    async fn decode_loop<S>(
        mut source: S,
        params: DecodeParams,
        snapshot_tx: watch::Sender<Arc<SensorSnapshot>>,
        cancel: CancellationToken,
    ) where
        S: DatagramSource,
    {
        info!("telemetry watcher task started");
        let mut steering = BoundedHistory::new(params.history_len);
        let mut speed = BoundedHistory::new(params.history_len);
        let mut datagram_count = 0u64;
        let mut dropped_count = 0u64;
        let mut error_count = 0u32;
        const MAX_TRANSPORT_ERRORS: u32 = 10;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("watcher cancelled during receive");
                    break;
                }
                result = source.next_datagram() => result,
            };

            match result {
                Ok(Some(datagram)) => {
                    datagram_count += 1;
                    error_count = 0;

                    // One bad datagram never takes down the listener:
                    // decode failures become dropped-datagram events
                    let tracked = match wire::decode_datagram(&datagram) {
                        Ok(readings) => wire::route(&readings, &params.channels),
                        Err(e) => {
                            dropped_count += 1;
                            warn!(error = %e, dropped = dropped_count, "dropping undecodable datagram");
                            continue;
                        }
                    };

                    if !apply_tracked(&mut steering, &mut speed, tracked, params.update_policy) {
                        trace!("datagram carried no applicable tracked channels");
                        continue;
                    }

                    trace!(
                        steering = steering.latest(),
                        speed = speed.latest(),
                        datagram_count,
                        "histories updated"
                    );

                    let snapshot = Arc::new(SensorSnapshot {
                        steering: steering.snapshot(),
                        speed: speed.snapshot(),
                    });
                    if snapshot_tx.send(snapshot).is_err() {
                        debug!("all snapshot receivers dropped, shutting down");
                        break;
                    }
                }
                Ok(None) => {
                    info!(datagrams = datagram_count, "datagram source ended");
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    error!("source error ({}/{}): {}", error_count, MAX_TRANSPORT_ERRORS, e);

                    if error_count >= MAX_TRANSPORT_ERRORS {
                        error!("too many source errors, shutting down");
                        break;
                    }

                    // Exponential backoff: 50ms, 100ms, 200ms, ...
                    let backoff =
                        std::time::Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        info!(
            datagrams = datagram_count,
            dropped = dropped_count,
            "watcher task ended"
        );
    }
}

/// Apply tracked values to the histories under the configured policy.
///
/// Returns whether either history changed.
fn apply_tracked(
    steering: &mut BoundedHistory,
    speed: &mut BoundedHistory,
    tracked: TrackedValues,
    policy: UpdatePolicy,
) -> bool {
    match policy {
        UpdatePolicy::RequireBoth => {
            let (Some(steering_value), Some(speed_value)) = (tracked.steering, tracked.speed)
            else {
                return false;
            };
            steering.push(steering_value);
            speed.push(speed_value);
            true
        }
        UpdatePolicy::Independent => {
            let mut updated = false;
            if let Some(value) = tracked.steering {
                steering.push(value);
                updated = true;
            }
            if let Some(value) = tracked.speed {
                speed.push(value);
                updated = true;
            }
            updated
        }
    }
}
