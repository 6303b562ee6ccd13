#![cfg(feature = "web")]

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::record::LogRecord;

/// A change to the underlying record set.
///
/// Dashboards treat any event as "refetch everything": the Aggregator
/// recomputes from the full snapshot, so a dropped event costs nothing
/// beyond a slightly later refresh.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum ChangeEvent {
    Inserted(LogRecord),
    Deleted(u64),
}

/// Broadcast fan-out of change events to realtime subscribers.
///
/// Publishing never blocks and never fails: with no subscribers the event
/// is simply dropped, and a lagged subscriber loses the oldest events
/// rather than stalling the publisher.
#[derive(Clone, Debug)]
pub struct Hub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Hub { tx }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // An Err here only means nobody is listening right now.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(64)
    }
}
