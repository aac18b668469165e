//! Persistent cart store.
//!
//! Wraps the pure [`Cart`] with write-through persistence to the visitor's
//! durable storage and a broadcast channel of [`CartEvent`]s. Route handlers
//! subscribe before mutating and turn the events into `HX-Trigger` headers,
//! so badges and drawers outside the swapped fragment update through events
//! rather than by rewriting each other's markup.

use ironic_gym_core::{Cart, CartProduct, Cents, ProductId};
use tokio::sync::broadcast;

use crate::storage::{DurableStore, StorageError, keys};

/// Capacity of the event channel. Handlers drain it right after mutating.
const EVENT_CAPACITY: usize = 16;

/// Something that happened to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartEvent {
    /// Lines changed; carries the new derived totals.
    Changed { total_items: u64, subtotal: Cents },
    /// The cart view should open (emitted by every add).
    OpenRequested,
    /// The cart was emptied and its storage entry removed.
    Cleared,
}

impl CartEvent {
    /// Client-side event name dispatched through `HX-Trigger`.
    #[must_use]
    pub const fn trigger_name(self) -> &'static str {
        match self {
            Self::Changed { .. } => "cart-updated",
            Self::OpenRequested => "open-cart",
            Self::Cleared => "cart-cleared",
        }
    }
}

/// The cart, bound to the storage it persists to.
pub struct CartStore<S> {
    storage: S,
    cart: Cart,
    events: broadcast::Sender<CartEvent>,
}

impl<S: DurableStore> CartStore<S> {
    /// Restore the cart from storage.
    ///
    /// Missing, unreadable or malformed data yields an empty cart; the
    /// problem is logged, never returned.
    pub async fn load(storage: S) -> Self {
        let cart = match storage.get::<Cart>(keys::CART).await {
            Ok(cart) => cart.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable stored cart");
                Cart::new()
            }
        };

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            storage,
            cart,
            events,
        }
    }

    /// Receive events for every subsequent mutation.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    /// Current cart contents.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The storage this cart persists to.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.cart.total_items()
    }

    #[must_use]
    pub fn subtotal(&self) -> Cents {
        self.cart.subtotal()
    }

    /// Add one unit of a product and request that the cart view opens.
    ///
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be written to storage.
    pub async fn add_item(&mut self, product: CartProduct) -> Result<u32, StorageError> {
        let quantity = self.cart.add_item(product);
        self.persist().await?;
        self.notify_changed();
        self.notify(CartEvent::OpenRequested);
        Ok(quantity)
    }

    /// Set a line's quantity; anything below 1 removes the line.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be written to storage.
    pub async fn update_quantity(
        &mut self,
        id: &ProductId,
        quantity: i64,
    ) -> Result<(), StorageError> {
        self.cart.update_quantity(id, quantity);
        self.persist().await?;
        self.notify_changed();
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be written to storage.
    pub async fn remove_item(&mut self, id: &ProductId) -> Result<(), StorageError> {
        self.cart.remove_item(id);
        self.persist().await?;
        self.notify_changed();
        Ok(())
    }

    /// Empty the cart and delete its storage entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage entry cannot be removed.
    pub async fn clear(&mut self) -> Result<(), StorageError> {
        self.cart.clear();
        self.storage.remove(keys::CART).await?;
        self.notify(CartEvent::Cleared);
        self.notify_changed();
        Ok(())
    }

    /// Replace the cart wholesale (used when a cancelled checkout is undone).
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be written to storage.
    pub async fn replace(&mut self, cart: Cart) -> Result<(), StorageError> {
        self.cart = cart;
        self.persist().await?;
        self.notify_changed();
        Ok(())
    }

    async fn persist(&self) -> Result<(), StorageError> {
        self.storage.insert(keys::CART, &self.cart).await
    }

    fn notify_changed(&self) {
        self.notify(CartEvent::Changed {
            total_items: self.cart.total_items(),
            subtotal: self.cart.subtotal(),
        });
    }

    fn notify(&self, event: CartEvent) {
        // No subscribers is fine: nothing is listening for this request.
        let _ = self.events.send(event);
    }
}

/// Drain pending events into an `HX-Trigger` header value.
///
/// Returns `None` when nothing happened. Duplicate names are collapsed.
#[must_use]
pub fn drain_triggers(events: &mut broadcast::Receiver<CartEvent>) -> Option<String> {
    let mut names: Vec<&'static str> = Vec::new();
    while let Ok(event) = events.try_recv() {
        let name = event.trigger_name();
        if !names.contains(&name) {
            names.push(name);
        }
    }

    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    fn product(id: &str, price: i64) -> CartProduct {
        CartProduct {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price_cents: Cents::new(price),
            image_url: String::new(),
            brand: "Ironic".to_string(),
        }
    }

    #[tokio::test]
    async fn test_every_mutation_writes_through() {
        let storage = InMemoryStore::new();
        let mut store = CartStore::load(storage.clone()).await;

        store.add_item(product("a", 500)).await.unwrap();
        store.add_item(product("a", 500)).await.unwrap();
        store.add_item(product("b", 1200)).await.unwrap();

        let reloaded = CartStore::load(storage.clone()).await;
        assert_eq!(reloaded.cart(), store.cart());
        assert_eq!(reloaded.subtotal(), Cents::new(2200));
        assert_eq!(reloaded.total_items(), 3);

        store.update_quantity(&ProductId::new("a"), 0).await.unwrap();
        let reloaded = CartStore::load(storage).await;
        assert_eq!(reloaded.cart().lines().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_storage_yields_empty_cart() {
        let storage = InMemoryStore::new();
        storage
            .insert_raw(keys::CART, serde_json::json!({"not": "an array"}))
            .await
            .unwrap();

        let store = CartStore::load(storage).await;
        assert!(store.cart().is_empty());
    }

    #[tokio::test]
    async fn test_clear_removes_storage_entry() {
        let storage = InMemoryStore::new();
        let mut store = CartStore::load(storage.clone()).await;
        store.add_item(product("a", 500)).await.unwrap();
        assert!(storage.contains(keys::CART));

        store.clear().await.unwrap();
        assert!(store.cart().is_empty());
        assert!(!storage.contains(keys::CART));
    }

    #[tokio::test]
    async fn test_add_emits_change_and_open_request() {
        let mut store = CartStore::load(InMemoryStore::new()).await;
        let mut events = store.subscribe();

        store.add_item(product("a", 500)).await.unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            CartEvent::Changed {
                total_items: 1,
                subtotal: Cents::new(500)
            }
        );
        assert_eq!(events.try_recv().unwrap(), CartEvent::OpenRequested);
    }

    #[tokio::test]
    async fn test_drain_triggers_collapses_duplicates() {
        let mut store = CartStore::load(InMemoryStore::new()).await;
        let mut events = store.subscribe();

        store.add_item(product("a", 500)).await.unwrap();
        store.add_item(product("b", 500)).await.unwrap();

        assert_eq!(
            drain_triggers(&mut events).as_deref(),
            Some("cart-updated, open-cart")
        );
        assert_eq!(drain_triggers(&mut events), None);
    }

    #[tokio::test]
    async fn test_update_does_not_request_open() {
        let mut store = CartStore::load(InMemoryStore::new()).await;
        store.add_item(product("a", 500)).await.unwrap();
        let mut events = store.subscribe();

        store.update_quantity(&ProductId::new("a"), 3).await.unwrap();

        assert_eq!(drain_triggers(&mut events).as_deref(), Some("cart-updated"));
    }
}
