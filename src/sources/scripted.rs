//! Scripted datagram source for replay and testing.

use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

use crate::source::DatagramSource;
use crate::Result;

/// Datagram source that replays a fixed sequence, then ends.
///
/// The synthetic stand-in for a live simulator: feeds pre-built datagrams
/// to the watcher at an optional pace and signals end-of-stream once the
/// queue drains. Useful in tests and anywhere a deterministic feed beats
/// a real simulator hookup.
pub struct ScriptedSource {
    datagrams: VecDeque<Vec<u8>>,
    pace: Option<Duration>,
}

impl ScriptedSource {
    /// Create a source that yields `datagrams` in order.
    pub fn new(datagrams: Vec<Vec<u8>>) -> Self {
        Self { datagrams: datagrams.into(), pace: None }
    }

    /// Delay each datagram by `pace`, simulating a periodic export.
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    /// Datagrams not yet delivered.
    pub fn remaining(&self) -> usize {
        self.datagrams.len()
    }
}

#[async_trait::async_trait]
impl DatagramSource for ScriptedSource {
    async fn next_datagram(&mut self) -> Result<Option<Vec<u8>>> {
        match self.datagrams.pop_front() {
            Some(datagram) => {
                if let Some(pace) = self.pace {
                    tokio::time::sleep(pace).await;
                }
                Ok(Some(datagram))
            }
            None => {
                debug!("scripted source drained");
                Ok(None)
            }
        }
    }
}
