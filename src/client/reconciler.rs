use std::sync::Arc;

use super::api::ApiError;
use super::local_cart::{LocalCart, LocalCartStore};
use super::storage::KeyValueStore;
use super::ui::{Notice, NoticeLevel};
use super::ClientContext;
use crate::domain::cart::{Cart, CartItem, ItemStatus};
use crate::domain::errors::DomainError;

/// Keeps the local cart and the server cart in agreement.
///
/// Changes land in the local cart first. With a signed-in user the same
/// change is sent to the server and the server cart is fetched back as the
/// authoritative state. Network failures are reported through the notifier
/// and the local cart is returned instead; only invalid input is an error.
///
/// A snapshot mirrored from one user's server cart is dropped as soon as a
/// guest or a different user touches the cart. Only lines the server has not
/// seen are ever uploaded.
pub struct CartReconciler {
    ctx: ClientContext,
    carts: LocalCartStore<Arc<dyn KeyValueStore>>,
}

impl CartReconciler {
    pub fn new(ctx: ClientContext) -> Self {
        let carts = LocalCartStore::new(ctx.local.clone());
        Self { ctx, carts }
    }

    /// The cart as currently persisted on this device.
    pub fn local(&self) -> Cart {
        self.carts.read().cart
    }

    /// Produce the authoritative cart after an identity change or on load.
    pub async fn reconcile(&self, identity: Option<&str>) -> Cart {
        let mut local = self.load(identity);
        let Some(user) = identity else {
            return local.cart;
        };

        self.flush_pending(user, &mut local).await;
        if local.needs_sync() {
            // Fetching now would overwrite lines the server has not seen.
            return local.cart;
        }
        self.refresh(user, local).await
    }

    /// The server cart of `user` once every queued line has been uploaded.
    /// `None` when that cannot be established right now; the local cart is
    /// left as it was.
    pub async fn confirmed(&self, user: &str) -> Option<Cart> {
        let mut local = self.load(Some(user));
        self.flush_pending(user, &mut local).await;
        if local.needs_sync() {
            return None;
        }
        match self.fetch(user).await {
            Ok(cart) => Some(cart),
            Err(e) => {
                self.warn("Could not load your cart from the store", &e);
                None
            }
        }
    }

    pub async fn add_item(&self, identity: Option<&str>, item: CartItem) -> Result<Cart, DomainError> {
        item.validate()?;
        let item = item.normalized();
        let mut local = self.load(identity);
        if let Some(user) = identity {
            self.flush_pending(user, &mut local).await;
        }
        local.cart.add(item.clone())?;

        let Some(user) = self.online(identity, &mut local) else {
            return Ok(local.cart);
        };
        let result = {
            let _busy = self.ctx.busy.acquire();
            self.ctx.api.add_item(user, &item).await
        };
        if let Err(ApiError::Network(_)) = &result {
            local.queue(item)?;
            self.persist(&local);
        }
        Ok(self.settle(user, local, result, "Could not add the item to your cart").await)
    }

    /// Set the absolute quantity of an existing line; zero removes it.
    pub async fn update_quantity(
        &self,
        identity: Option<&str>,
        item: CartItem,
    ) -> Result<Cart, DomainError> {
        let mut local = self.load(identity);
        if let Some(user) = identity {
            self.flush_pending(user, &mut local).await;
        }
        if !local.cart.set_quantity(&item.key(), item.quantity)? {
            return Err(DomainError::NotFound);
        }

        let Some(user) = self.online(identity, &mut local) else {
            return Ok(local.cart);
        };
        let result = {
            let _busy = self.ctx.busy.acquire();
            self.ctx.api.update_quantity(user, &item).await
        };
        Ok(self.settle(user, local, result, "Could not update your cart").await)
    }

    pub async fn remove_variant(&self, identity: Option<&str>, variant_id: i32) -> Cart {
        let mut local = self.load(identity);
        if let Some(user) = identity {
            self.flush_pending(user, &mut local).await;
        }
        local.cart.remove_variant(variant_id);
        local.unsynced.remove_variant(variant_id);

        let Some(user) = self.online(identity, &mut local) else {
            return local.cart;
        };
        let result = {
            let _busy = self.ctx.busy.acquire();
            self.ctx.api.remove_variant(user, variant_id).await
        };
        self.settle(user, local, result, "Could not remove the item from your cart")
            .await
    }

    pub async fn clear(&self, identity: Option<&str>) -> Cart {
        let local = LocalCart::default();
        self.persist(&local);
        let Some(user) = identity else {
            return local.cart;
        };
        let result = {
            let _busy = self.ctx.busy.acquire();
            self.ctx.api.clear_cart(user).await
        };
        self.settle(user, local, result, "Could not clear your cart").await
    }

    /// Read the persisted snapshot, dropping it when it mirrors someone other
    /// than `identity`.
    fn load(&self, identity: Option<&str>) -> LocalCart {
        let local = self.carts.read();
        if local.visible_to(identity) {
            return local;
        }
        log::info!(
            "Dropping cart snapshot of {} for {}",
            local.owner.as_deref().unwrap_or("guest"),
            identity.unwrap_or("guest")
        );
        let fresh = LocalCart::default();
        self.persist(&fresh);
        fresh
    }

    /// Persist the local change. Returns the user when it should also go to
    /// the server; guests and guest carts still waiting for their first
    /// upload keep the change local under a sync token.
    fn online<'a>(&self, identity: Option<&'a str>, local: &mut LocalCart) -> Option<&'a str> {
        match identity {
            Some(user) if local.owner.is_some() || !local.needs_sync() => {
                self.persist(local);
                Some(user)
            }
            _ => {
                local.track_guest_lines();
                self.persist(local);
                None
            }
        }
    }

    /// Upload the lines the server has not seen yet.
    async fn flush_pending(&self, user: &str, local: &mut LocalCart) {
        if !local.needs_sync() {
            if local.pending_sync.take().is_some() {
                self.persist(local);
            }
            return;
        }

        let result = {
            let _busy = self.ctx.busy.acquire();
            self.ctx
                .api
                .merge_cart(user, local.unsynced.items(), local.pending_sync)
                .await
        };
        match result {
            Ok(_) => {
                log::info!(
                    "Uploaded {} unsynced cart lines for {user}",
                    local.unsynced.items().len()
                );
                local.synced(user);
                self.persist(local);
            }
            Err(e) => self.warn("Could not sync your saved cart", &e),
        }
    }

    async fn settle<T>(
        &self,
        user: &str,
        local: LocalCart,
        result: Result<T, ApiError>,
        failure: &str,
    ) -> Cart {
        match result {
            Ok(_) => self.refresh(user, local).await,
            Err(e) => {
                self.warn(failure, &e);
                local.cart
            }
        }
    }

    /// Mirror the server cart locally, falling back to `local`. Queued lines
    /// keep the local cart in place until they are uploaded.
    async fn refresh(&self, user: &str, local: LocalCart) -> Cart {
        if local.needs_sync() {
            self.persist(&local);
            return local.cart;
        }
        match self.fetch(user).await {
            Ok(cart) => cart,
            Err(e) => {
                self.warn("Showing your saved cart, the store is unreachable", &e);
                local.cart
            }
        }
    }

    async fn fetch(&self, user: &str) -> Result<Cart, ApiError> {
        let cart = {
            let _busy = self.ctx.busy.acquire();
            self.ctx.api.fetch_cart(user, ItemStatus::InCart).await?
        };
        self.persist(&LocalCart::mirror(user, cart.clone()));
        Ok(cart)
    }

    fn persist(&self, local: &LocalCart) {
        if let Err(e) = self.carts.write(local) {
            log::warn!("Could not persist local cart: {e}");
        }
    }

    fn warn(&self, message: &str, error: &ApiError) {
        log::warn!("{message}: {error}");
        self.ctx
            .notifier
            .notify(Notice::new(NoticeLevel::Warning, message));
    }
}
