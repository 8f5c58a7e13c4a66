//! Hot replay-latest channels
//!
//! A [`Subject`] multicasts every value written to it and remembers the last
//! one, so late subscribers start from the current state. Primary signals and
//! the hot copies of derived signals are both subjects.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use super::Observable;

/// Per-subscriber buffer before slow receivers start lagging
const CHANNEL_CAPACITY: usize = 256;

struct SubjectState {
    latest: Option<Value>,
    tx: broadcast::Sender<Value>,
}

/// Writable, multicast, replay-latest channel
#[derive(Clone)]
pub struct Subject {
    state: Arc<Mutex<SubjectState>>,
}

/// Write side of a primary signal, handed to component callbacks
pub type InputChannel = Subject;

impl Subject {
    /// Subject with no current value
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(SubjectState { latest: None, tx })),
        }
    }

    /// Subject seeded with a current value
    pub fn with_initial(value: Value) -> Self {
        let subject = Self::new();
        subject.state.lock().latest = Some(value);
        subject
    }

    /// Publish a value to every subscriber
    pub fn next(&self, value: Value) {
        let mut state = self.state.lock();
        state.latest = Some(value.clone());
        // No receivers is fine: the value is still kept for replay
        let _ = state.tx.send(value);
    }

    /// Last published value, if any
    pub fn latest(&self) -> Option<Value> {
        self.state.lock().latest.clone()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().tx.receiver_count()
    }

    /// Read side: replays the latest value, then follows live writes
    pub fn observable(&self) -> Observable {
        let state = Arc::clone(&self.state);
        Observable::from_fn(move || {
            // Snapshot and subscribe under one lock so no write slips between them
            let (head, rx) = {
                let state = state.lock();
                (state.latest.clone(), state.tx.subscribe())
            };
            let live = BroadcastStream::new(rx).filter_map(|item| async move {
                match item {
                    Ok(value) => Some(value),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Subscriber lagged, dropping values");
                        None
                    }
                }
            });
            stream::iter(head).chain(live).boxed()
        })
    }
}

impl Default for Subject {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject")
            .field("latest", &self.latest())
            .finish()
    }
}
