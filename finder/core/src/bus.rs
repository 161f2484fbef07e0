//! Event Bus - Typed Publish/Subscribe
//!
//! Every component of a finder page talks through this bus instead of
//! holding references to each other. Publishers hand a [`FinderMessage`] to
//! [`EventBus::publish`]; each subscriber receives its own copy on a bounded
//! channel.
//!
//! # Architecture
//!
//! ```text
//!                         EventBus
//!                ┌─────────────────────────────────────┐
//!                │ HashMap<SubscriberId, Subscriber>   │
//!                │   - wrapped in Arc<RwLock<>>        │
//!                └──────────────┬──────────────────────┘
//!                               │ try_send (never blocks)
//!          ┌────────────────────┼────────────────────┐
//!   ┌──────▼──────┐     ┌───────▼──────┐     ┌───────▼──────┐
//!   │  progress   │     │   history    │     │  analytics   │
//!   │   sub-1     │     │    sub-2     │     │    sub-3     │
//!   └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Publishing never blocks the navigator: a subscriber whose channel is full
//! misses the message, and a subscriber whose receiver was dropped is pruned.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::messages::FinderMessage;

/// Default per-subscriber channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Unique identifier for a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Create a new unique subscriber ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw numeric value
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug)]
struct Subscriber {
    name: String,
    tx: mpsc::Sender<FinderMessage>,
}

/// Result of a publish operation
#[derive(Debug, Clone, Default)]
pub struct PublishResult {
    /// Number of subscribers that received the message
    pub delivered: usize,
    /// Number of subscribers that missed it (full or closed channel)
    pub failed: usize,
    /// Subscribers removed because their receiver was dropped
    pub pruned: Vec<SubscriberId>,
}

impl PublishResult {
    /// Whether every subscriber received the message
    #[must_use]
    pub fn all_delivered(&self) -> bool {
        self.failed == 0
    }
}

/// Publish/subscribe bus for [`FinderMessage`]s
///
/// Cloning yields another handle to the same bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<RwLock<HashMap<SubscriberId, Subscriber>>>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl EventBus {
    /// Create a bus with the default channel capacity
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus whose subscribers buffer up to `capacity` messages
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe anonymously
    pub fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<FinderMessage>) {
        self.subscribe_named("anonymous")
    }

    /// Subscribe with a name used in logs
    pub fn subscribe_named(
        &self,
        name: impl Into<String>,
    ) -> (SubscriberId, mpsc::Receiver<FinderMessage>) {
        let id = SubscriberId::new();
        let name = name.into();
        let (tx, rx) = mpsc::channel(self.capacity);
        tracing::debug!(subscriber = %id, name = %name, "Subscriber registered");
        self.inner.write().insert(id, Subscriber { name, tx });
        (id, rx)
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, id: &SubscriberId) -> bool {
        let removed = self.inner.write().remove(id);
        if let Some(ref subscriber) = removed {
            tracing::debug!(subscriber = %id, name = %subscriber.name, "Subscriber removed");
        }
        removed.is_some()
    }

    /// Number of subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.read().len()
    }

    /// Deliver `message` to every subscriber without waiting
    pub fn publish(&self, message: FinderMessage) -> PublishResult {
        let mut result = PublishResult::default();

        {
            let inner = self.inner.read();
            for (id, subscriber) in inner.iter() {
                match subscriber.tx.try_send(message.clone()) {
                    Ok(()) => result.delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        result.failed += 1;
                        tracing::warn!(
                            subscriber = %id,
                            name = %subscriber.name,
                            message = message.kind(),
                            "Subscriber channel full, message dropped"
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        result.failed += 1;
                        result.pruned.push(*id);
                    }
                }
            }
        }

        if !result.pruned.is_empty() {
            let mut inner = self.inner.write();
            for id in &result.pruned {
                inner.remove(id);
            }
            tracing::debug!(count = result.pruned.len(), "Pruned closed subscribers");
        }

        tracing::trace!(
            message = message.kind(),
            delivered = result.delivered,
            "Published"
        );
        result
    }
}
