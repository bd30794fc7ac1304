use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::storage::{KeyValueStore, StorageError};
use crate::domain::cart::{Cart, CartItem};
use crate::domain::errors::DomainError;
use crate::domain::shipping::ShippingInfo;

pub const CART_KEY: &str = "refurb.cart";
pub const SHIPPING_KEY: &str = "refurb.shipping";

/// The persisted cart snapshot.
///
/// `owner` names the user whose server cart `cart` mirrors; a cart built
/// while signed out has no owner. `unsynced` holds the lines the server has
/// not seen yet and is the only thing ever uploaded. `pending_sync` is sent
/// with every upload attempt of those lines, so the server can recognise a
/// repeat and they are never counted twice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalCart {
    pub cart: Cart,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub unsynced: Cart,
    #[serde(default)]
    pub pending_sync: Option<Uuid>,
}

impl LocalCart {
    /// A snapshot of `user`'s server cart with nothing waiting for upload.
    pub fn mirror(user: &str, cart: Cart) -> Self {
        Self {
            cart,
            owner: Some(user.to_string()),
            unsynced: Cart::default(),
            pending_sync: None,
        }
    }

    pub fn needs_sync(&self) -> bool {
        self.pending_sync.is_some() && !self.unsynced.is_empty()
    }

    /// A mirror of one user's cart is never shown to a guest or to another
    /// user. Ownerless guest carts are visible to anyone on this device.
    pub fn visible_to(&self, identity: Option<&str>) -> bool {
        match (self.owner.as_deref(), identity) {
            (None, _) => true,
            (Some(owner), Some(user)) => owner == user,
            (Some(_), None) => false,
        }
    }

    /// Returns the current sync token, minting one if there is none.
    pub fn mark_pending(&mut self) -> Uuid {
        *self.pending_sync.get_or_insert_with(Uuid::new_v4)
    }

    /// Record a line that still has to reach the server.
    pub fn queue(&mut self, item: CartItem) -> Result<(), DomainError> {
        self.unsynced.add(item)?;
        self.mark_pending();
        Ok(())
    }

    /// Without an owner every line is local-only, so the upload set is the
    /// whole cart.
    pub fn track_guest_lines(&mut self) {
        self.unsynced = self.cart.clone();
        if self.unsynced.is_empty() {
            self.pending_sync = None;
        } else {
            self.mark_pending();
        }
    }

    /// The queued lines reached the server; `cart` now belongs to `user`.
    pub fn synced(&mut self, user: &str) {
        self.owner = Some(user.to_string());
        self.unsynced = Cart::default();
        self.pending_sync = None;
    }
}

pub struct LocalCartStore<S> {
    store: S,
}

impl<S: KeyValueStore> LocalCartStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Unreadable or corrupt content reads as an empty cart.
    pub fn read(&self) -> LocalCart {
        let raw = match self.store.get(CART_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return LocalCart::default(),
            Err(e) => {
                log::warn!("Local cart unavailable, starting empty: {e}");
                return LocalCart::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("Discarding corrupt local cart: {e}");
            LocalCart::default()
        })
    }

    pub fn write(&self, cart: &LocalCart) -> Result<(), StorageError> {
        let raw = serde_json::to_string(cart)?;
        self.store.set(CART_KEY, &raw)
    }
}

/// Last shipping form submitted in this session. Bridges the shipping and
/// payment steps without another round trip.
pub struct SessionShippingStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionShippingStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn read(&self) -> Option<ShippingInfo> {
        let raw = match self.store.get(SHIPPING_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                log::warn!("Session shipping info unavailable: {e}");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| log::warn!("Discarding corrupt session shipping info: {e}"))
            .ok()
    }

    pub fn write(&self, info: &ShippingInfo) -> Result<(), StorageError> {
        let raw = serde_json::to_string(info)?;
        self.store.set(SHIPPING_KEY, &raw)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(SHIPPING_KEY)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::storage::InMemoryStore;
    use crate::domain::cart::tests::phone;
    use crate::domain::shipping::tests::address;

    #[test]
    fn corrupt_content_reads_as_empty_cart() {
        let store = Arc::new(InMemoryStore::new());
        store.set(CART_KEY, "{not json").unwrap();

        let local = LocalCartStore::new(store).read();

        assert!(local.cart.is_empty());
        assert!(local.pending_sync.is_none());
    }

    #[test]
    fn written_cart_reads_back_with_token() {
        let store = Arc::new(InMemoryStore::new());
        let carts = LocalCartStore::new(store.clone());
        let mut local = LocalCart::default();
        local.cart.add(phone(42, "199.99", 2)).unwrap();
        local.queue(phone(42, "199.99", 2)).unwrap();
        let token = local.pending_sync;

        carts.write(&local).unwrap();
        let back = carts.read();

        assert_eq!(back.pending_sync, token);
        assert_eq!(back.cart.total_items(), 2);
        assert_eq!(back.unsynced.total_items(), 2);
        assert!(back.needs_sync());
        assert!(store.get(CART_KEY).unwrap().unwrap().contains("\"totalItems\":2"));
    }

    #[test]
    fn snapshot_without_owner_fields_reads_as_guest_cart() {
        let store = Arc::new(InMemoryStore::new());
        store
            .set(CART_KEY, r#"{"cart":{"items":[]},"pendingSync":null}"#)
            .unwrap();

        let local = LocalCartStore::new(store).read();

        assert!(local.owner.is_none());
        assert!(local.unsynced.is_empty());
    }

    #[test]
    fn mark_pending_keeps_existing_token() {
        let mut local = LocalCart::default();
        let first = local.mark_pending();
        assert_eq!(local.mark_pending(), first);
        assert!(!local.needs_sync());
    }

    #[test]
    fn mirror_is_hidden_from_guests_and_other_users() {
        let mirror = LocalCart::mirror("ada", Cart::default());
        assert!(mirror.visible_to(Some("ada")));
        assert!(!mirror.visible_to(Some("bob")));
        assert!(!mirror.visible_to(None));

        let guest = LocalCart::default();
        assert!(guest.visible_to(None));
        assert!(guest.visible_to(Some("bob")));
    }

    #[test]
    fn guest_lines_follow_the_cart() {
        let mut local = LocalCart::default();
        local.cart.add(phone(42, "199.99", 1)).unwrap();
        local.track_guest_lines();
        assert!(local.needs_sync());

        local.cart.clear();
        local.track_guest_lines();
        assert!(!local.needs_sync());
        assert!(local.pending_sync.is_none());
    }

    #[test]
    fn shipping_round_trips_and_clears() {
        let shipping = SessionShippingStore::new(InMemoryStore::new());
        assert!(shipping.read().is_none());

        shipping.write(&address()).unwrap();
        assert_eq!(shipping.read(), Some(address()));

        shipping.clear().unwrap();
        assert!(shipping.read().is_none());
    }
}
