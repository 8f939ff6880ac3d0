//! Topic-filtered, self-releasing subscriptions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::bus::{ChangeEvent, Topic};

/// Why a subscription could not yield an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecvError {
    /// The subscriber fell behind and `n` events were dropped; the consumer
    /// should reload its state.
    #[error("subscription lagged, {0} events dropped")]
    Lagged(u64),

    #[error("change bus closed")]
    Closed,
}

/// A live subscription to one [`Topic`].
///
/// Dropping it (or calling [`unsubscribe`](Self::unsubscribe)) releases it
/// exactly once.
pub struct Subscription {
    topic: Topic,
    receiver: broadcast::Receiver<ChangeEvent>,
    active: Arc<AtomicUsize>,
}

impl Subscription {
    pub(crate) fn new(
        topic: Topic,
        receiver: broadcast::Receiver<ChangeEvent>,
        active: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            topic,
            receiver,
            active,
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Wait for the next event on this topic.
    pub async fn recv(&mut self) -> Result<ChangeEvent, RecvError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.topic.matches(&event) => return Ok(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, topic = ?self.topic, "Subscription lagged");
                    return Err(RecvError::Lagged(n));
                }
                Err(broadcast::error::RecvError::Closed) => return Err(RecvError::Closed),
            }
        }
    }

    /// Take the next buffered event on this topic without waiting.
    /// `Ok(None)` means nothing is pending.
    pub fn try_recv(&mut self) -> Result<Option<ChangeEvent>, RecvError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.topic.matches(&event) => return Ok(Some(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, topic = ?self.topic, "Subscription lagged");
                    return Err(RecvError::Lagged(n));
                }
                Err(broadcast::error::TryRecvError::Closed) => return Err(RecvError::Closed),
            }
        }
    }

    /// Release the subscription now.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!(topic = ?self.topic, "Subscription released");
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}
