//! Persisted, cross-tab synchronized stores.
//!
//! Each store keeps its state in a `tokio::sync::watch` channel so UI code can
//! subscribe to changes. Local mutations are applied synchronously, then the
//! serialized value is queued to a per-store writer task that persists it and
//! announces it on the [`StorageBus`]. A listener task applies values
//! announced by other tabs.
//!
//! Writes leave the store in mutation order. Persistence failures are logged
//! and never roll back the in-memory state.

mod cart;
mod favorites;

use std::sync::Arc;

use optika_core::{Cart, Favorites};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::storage::StorageSlot;
use crate::sync::{StorageBus, StorageEvent, TabId};

pub use cart::CartStore;
pub use favorites::FavoritesStore;

/// A value persisted under a fixed storage key.
pub trait Collection:
    Serialize + DeserializeOwned + Default + Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static
{
    /// Storage key shared by every tab.
    const STORAGE_KEY: &'static str;
    /// Name used in logs.
    const LABEL: &'static str;
}

impl Collection for Cart {
    const STORAGE_KEY: &'static str = "optic_cart";
    const LABEL: &'static str = "cart";
}

impl Collection for Favorites {
    const STORAGE_KEY: &'static str = "optic_favorites";
    const LABEL: &'static str = "favorites";
}

enum WriteCommand {
    Persist(String),
    Flush(oneshot::Sender<()>),
}

/// Shared machinery behind [`CartStore`] and [`FavoritesStore`].
pub struct SyncedCollection<T: Collection> {
    state: Arc<watch::Sender<T>>,
    writes: mpsc::UnboundedSender<WriteCommand>,
    tab: TabId,
    listener: JoinHandle<()>,
}

impl<T: Collection> std::fmt::Debug for SyncedCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncedCollection")
            .field("key", &T::STORAGE_KEY)
            .field("tab", &self.tab)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl<T: Collection> SyncedCollection<T> {
    /// Load the persisted value and start the writer and listener tasks.
    ///
    /// A missing, unreadable or malformed slot starts from the default value.
    /// Must be called from within a Tokio runtime.
    pub fn open(storage: Arc<dyn StorageSlot>, bus: &StorageBus, tab: TabId) -> Self {
        let initial = load::<T>(storage.as_ref());
        let state = Arc::new(watch::Sender::new(initial));

        // Subscribe before anything can be published so no event is missed.
        let events = bus.subscribe();
        let (writes, commands) = mpsc::unbounded_channel();

        tokio::spawn(run_writer::<T>(
            Arc::clone(&storage),
            bus.clone(),
            tab,
            commands,
        ));
        let listener = tokio::spawn(run_listener(Arc::clone(&state), storage, events, tab));

        Self {
            state,
            writes,
            tab,
            listener,
        }
    }

    #[must_use]
    pub const fn tab(&self) -> TabId {
        self.tab
    }

    /// Apply `f` to the state. When it reports a change, subscribers are
    /// notified and the new value is queued for persistence.
    pub fn mutate(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.state.send_if_modified(|value| {
            if !f(value) {
                return false;
            }
            // Queued while the state is locked so writes keep mutation order.
            match serde_json::to_string(value) {
                Ok(payload) => {
                    if self.writes.send(WriteCommand::Persist(payload)).is_err() {
                        warn!(collection = T::LABEL, "Writer task is gone, change not persisted");
                    }
                }
                Err(e) => {
                    warn!(collection = T::LABEL, error = %e, "Failed to serialize state");
                }
            }
            true
        })
    }

    /// Read the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.borrow())
    }

    #[must_use]
    pub fn snapshot(&self) -> T {
        self.state.borrow().clone()
    }

    /// Receiver that observes every local and remote change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.state.subscribe()
    }

    /// Wait until every write queued so far has been attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.writes.send(WriteCommand::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

impl<T: Collection> Drop for SyncedCollection<T> {
    fn drop(&mut self) {
        // The writer drains and exits once `writes` is dropped.
        self.listener.abort();
    }
}

fn load<T: Collection>(storage: &dyn StorageSlot) -> T {
    match storage.get(T::STORAGE_KEY) {
        Ok(Some(raw)) => parse(&raw).unwrap_or_default(),
        Ok(None) => T::default(),
        Err(e) => {
            warn!(collection = T::LABEL, error = %e, "Failed to read storage, starting empty");
            T::default()
        }
    }
}

fn parse<T: Collection>(raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(collection = T::LABEL, error = %e, "Ignoring malformed stored value");
            None
        }
    }
}

async fn run_writer<T: Collection>(
    storage: Arc<dyn StorageSlot>,
    bus: StorageBus,
    tab: TabId,
    mut commands: mpsc::UnboundedReceiver<WriteCommand>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            WriteCommand::Persist(payload) => persist::<T>(&storage, &bus, tab, payload).await,
            WriteCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

async fn persist<T: Collection>(
    storage: &Arc<dyn StorageSlot>,
    bus: &StorageBus,
    tab: TabId,
    payload: String,
) {
    let slot = Arc::clone(storage);
    let value = payload.clone();
    let result = tokio::task::spawn_blocking(move || slot.set(T::STORAGE_KEY, &value)).await;

    match result {
        Ok(Ok(())) => {
            let receivers = bus.publish(StorageEvent {
                key: T::STORAGE_KEY.to_string(),
                new_value: Some(payload),
                origin: tab,
            });
            debug!(collection = T::LABEL, %tab, receivers, "Persisted");
        }
        Ok(Err(e)) => {
            warn!(collection = T::LABEL, error = %e, "Failed to persist, keeping in-memory state");
        }
        Err(e) => {
            warn!(collection = T::LABEL, error = %e, "Persist task failed");
        }
    }
}

async fn run_listener<T: Collection>(
    state: Arc<watch::Sender<T>>,
    storage: Arc<dyn StorageSlot>,
    mut events: broadcast::Receiver<StorageEvent>,
    tab: TabId,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                apply_remote(&state, &event, tab);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(collection = T::LABEL, skipped, "Missed storage events, reloading");
                let slot = Arc::clone(&storage);
                match tokio::task::spawn_blocking(move || slot.get(T::STORAGE_KEY)).await {
                    Ok(Ok(Some(raw))) => {
                        replace(&state, parse(&raw));
                    }
                    Ok(Ok(None)) => {}
                    Ok(Err(e)) => warn!(collection = T::LABEL, error = %e, "Reload failed"),
                    Err(e) => warn!(collection = T::LABEL, error = %e, "Reload task failed"),
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Apply an event from another tab. Returns whether the state changed.
///
/// Events for other keys, from this tab, or without a value are ignored, as
/// are values that fail to parse. Applied values are not persisted again.
fn apply_remote<T: Collection>(state: &watch::Sender<T>, event: &StorageEvent, tab: TabId) -> bool {
    if event.key != T::STORAGE_KEY || event.origin == tab {
        return false;
    }
    let Some(raw) = event.new_value.as_deref() else {
        return false;
    };

    let changed = replace(state, parse(raw));
    if changed {
        debug!(collection = T::LABEL, origin = %event.origin, "Applied change from another tab");
    }
    changed
}

fn replace<T: Collection>(state: &watch::Sender<T>, value: Option<T>) -> bool {
    let Some(value) = value else {
        return false;
    };
    state.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    })
}

/// One open storefront tab: a cart and a favorites store sharing a [`TabId`].
#[derive(Debug)]
pub struct Tab {
    pub id: TabId,
    pub cart: CartStore,
    pub favorites: FavoritesStore,
}

impl Tab {
    /// Open both stores against `storage`, synchronized over `bus`.
    pub fn open(storage: Arc<dyn StorageSlot>, bus: &StorageBus) -> Self {
        let id = TabId::new();
        Self {
            id,
            cart: CartStore::open(Arc::clone(&storage), bus, id),
            favorites: FavoritesStore::open(storage, bus, id),
        }
    }

    /// Wait for both stores to finish pending writes.
    pub async fn flush(&self) {
        self.cart.flush().await;
        self.favorites.flush().await;
    }
}
