use std::sync::Arc;

use optika_core::{Favorites, ProductId};
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use super::SyncedCollection;
use crate::storage::StorageSlot;
use crate::sync::{StorageBus, TabId};

/// Favorite products, persisted under `optic_favorites`.
#[derive(Debug)]
pub struct FavoritesStore {
    inner: SyncedCollection<Favorites>,
}

impl FavoritesStore {
    pub fn open(storage: Arc<dyn StorageSlot>, bus: &StorageBus, tab: TabId) -> Self {
        Self {
            inner: SyncedCollection::open(storage, bus, tab),
        }
    }

    /// Flip membership. Returns whether the product is now a favorite.
    pub fn toggle_favorite(&self, product_id: ProductId) -> bool {
        let mut now_favorite = false;
        self.inner.mutate(|favorites| {
            now_favorite = favorites.toggle(product_id);
            true
        });
        debug!(%product_id, now_favorite, "Toggled favorite");
        now_favorite
    }

    /// Toggle a loosely typed ID; `None` when it is not a valid product ID.
    pub fn toggle_favorite_raw(&self, raw: &Value) -> Option<bool> {
        let mut outcome = None;
        self.inner.mutate(|favorites| {
            outcome = favorites.toggle_raw(raw);
            outcome.is_some()
        });
        outcome
    }

    pub fn add_to_favorites(&self, product_id: ProductId) -> bool {
        self.inner.mutate(|favorites| favorites.add(product_id))
    }

    pub fn remove_from_favorites(&self, product_id: ProductId) -> bool {
        self.inner.mutate(|favorites| favorites.remove(product_id))
    }

    #[must_use]
    pub fn is_favorite(&self, product_id: ProductId) -> bool {
        self.inner.read(|favorites| favorites.contains(product_id))
    }

    pub fn clear_favorites(&self) -> bool {
        self.inner.mutate(|favorites| {
            let had_any = !favorites.is_empty();
            favorites.clear();
            had_any
        })
    }

    /// Favorite IDs in insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<ProductId> {
        self.inner.read(|favorites| favorites.ids().to_vec())
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.read(Favorites::len)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Favorites> {
        self.inner.subscribe()
    }

    pub async fn flush(&self) {
        self.inner.flush().await;
    }
}
