use std::sync::Arc;

use optika_core::{Cart, CartItem, CartLine, CartLineKey, CartSummary, Price, ProductId, VariantId};
use tokio::sync::watch;
use tracing::{debug, instrument};

use super::SyncedCollection;
use crate::storage::StorageSlot;
use crate::sync::{StorageBus, TabId};

/// The shopper's cart, persisted under `optic_cart`.
#[derive(Debug)]
pub struct CartStore {
    inner: SyncedCollection<Cart>,
}

impl CartStore {
    pub fn open(storage: Arc<dyn StorageSlot>, bus: &StorageBus, tab: TabId) -> Self {
        Self {
            inner: SyncedCollection::open(storage, bus, tab),
        }
    }

    /// Add `quantity` of `item`, merging with an existing line of the same key.
    #[instrument(skip(self, item), fields(key = %item.key()))]
    pub fn add_to_cart(&self, item: CartItem, quantity: u32) -> bool {
        let changed = self.inner.mutate(|cart| cart.add(item, quantity));
        if changed {
            debug!(quantity, "Added to cart");
        }
        changed
    }

    /// Set a line's quantity; zero or less removes the line.
    pub fn update_quantity(&self, key: &CartLineKey, quantity: i64) -> bool {
        self.inner.mutate(|cart| cart.update_quantity(key, quantity))
    }

    pub fn remove_from_cart(&self, key: &CartLineKey) -> bool {
        self.inner.mutate(|cart| cart.remove(key))
    }

    pub fn clear_cart(&self) -> bool {
        self.inner.mutate(|cart| {
            let had_lines = !cart.is_empty();
            cart.clear();
            had_lines
        })
    }

    #[must_use]
    pub fn is_in_cart(&self, product_id: ProductId, variant_id: Option<VariantId>) -> bool {
        self.inner.read(|cart| cart.is_in_cart(product_id, variant_id))
    }

    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.inner.read(|cart| cart.lines().to_vec())
    }

    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.inner.read(Cart::total_items)
    }

    #[must_use]
    pub fn total_price(&self) -> Price {
        self.inner.read(Cart::total_price)
    }

    #[must_use]
    pub fn summary(&self, shipping: Price, discount: Price) -> CartSummary {
        self.inner.read(|cart| cart.summary(shipping, discount))
    }

    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.inner.snapshot()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.inner.subscribe()
    }

    pub async fn flush(&self) {
        self.inner.flush().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn lens(variant: i64) -> CartItem {
        CartItem {
            variant_id: Some(VariantId::new(variant)),
            variant_label: Some(format!("Diopter: -{variant}")),
            ..CartItem::simple(ProductId::new(40), "Acuvue Oasys", Price::from(1_800))
        }
    }

    #[tokio::test]
    async fn test_cart_operations_persist() {
        let storage = Arc::new(MemoryStorage::new());
        let bus = StorageBus::default();
        let store = CartStore::open(storage.clone(), &bus, TabId::new());

        assert!(store.add_to_cart(lens(1), 2));
        assert!(store.add_to_cart(lens(1), 1));
        assert!(store.add_to_cart(lens(2), 1));
        assert!(!store.add_to_cart(lens(3), 0));

        assert_eq!(store.lines().len(), 2);
        assert_eq!(store.total_items(), 4);
        assert_eq!(store.total_price(), Price::from(7_200));
        assert!(store.is_in_cart(ProductId::new(40), Some(VariantId::new(1))));
        assert!(!store.is_in_cart(ProductId::new(40), None));

        let key = CartLineKey::new(ProductId::new(40), Some(VariantId::new(1)));
        assert!(store.update_quantity(&key, 5));
        assert!(!store.update_quantity(&key, 5));
        assert!(store.update_quantity(&key, 0));
        assert!(!store.remove_from_cart(&key));

        store.flush().await;
        let stored: Cart =
            serde_json::from_str(&storage.get("optic_cart").unwrap().unwrap()).unwrap();
        assert_eq!(stored, store.snapshot());
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_persisted_payload_uses_camel_case() {
        let storage = Arc::new(MemoryStorage::new());
        let bus = StorageBus::default();
        let store = CartStore::open(storage.clone(), &bus, TabId::new());

        store.add_to_cart(lens(7), 1);
        store.flush().await;

        let raw = storage.get("optic_cart").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["productId"], 40);
        assert_eq!(json[0]["variantId"], 7);
        assert_eq!(json[0]["quantity"], 1);
    }

    #[tokio::test]
    async fn test_clear_cart_and_reopen() {
        let storage = Arc::new(MemoryStorage::new());
        let bus = StorageBus::default();

        {
            let store = CartStore::open(storage.clone(), &bus, TabId::new());
            store.add_to_cart(lens(1), 1);
            store.flush().await;
        }

        let reopened = CartStore::open(storage.clone(), &bus, TabId::new());
        assert_eq!(reopened.total_items(), 1);
        assert!(reopened.clear_cart());
        assert!(!reopened.clear_cart());
        reopened.flush().await;
        assert_eq!(storage.get("optic_cart").unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let bus = StorageBus::default();
        let store = CartStore::open(Arc::new(MemoryStorage::new()), &bus, TabId::new());
        let mut updates = store.subscribe();

        store.add_to_cart(lens(1), 1);
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow_and_update().total_items(), 1);
    }
}
