//! Cross-tab change notifications.
//!
//! Every store that persists a value announces it on a shared [`StorageBus`].
//! Other tabs subscribed to the bus pick the event up and replace their
//! in-memory state. Events carry the origin [`TabId`] so a tab can skip its
//! own writes.

use std::fmt;

use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 64;

/// Identity of one open tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(Uuid);

impl TabId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A storage slot changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Storage key that changed
    pub key: String,
    /// New serialized value, `None` when the key was removed
    pub new_value: Option<String>,
    /// Tab that made the change
    pub origin: TabId,
}

/// Broadcast channel shared by every tab of one shopper.
#[derive(Debug, Clone)]
pub struct StorageBus {
    sender: broadcast::Sender<StorageEvent>,
}

impl StorageBus {
    /// Bus buffering up to `capacity` events per slow subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.sender.subscribe()
    }

    /// Announce a change. Returns how many subscribers received it.
    pub fn publish(&self, event: StorageEvent) -> usize {
        // No subscribers is fine; the event simply has no audience.
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for StorageBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
