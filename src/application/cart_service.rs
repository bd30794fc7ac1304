use uuid::Uuid;

use crate::domain::cart::{Cart, CartItem, ItemStatus, LineKey};
use crate::domain::errors::DomainError;
use crate::domain::order::{FinalizeOutcome, OrderNumber};
use crate::domain::ports::CartRepository;

#[derive(Clone)]
pub struct CartService<R> {
    repo: R,
}

impl<R: CartRepository> CartService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn get_cart(&self, user: &str, status: ItemStatus) -> Result<Cart, DomainError> {
        Cart::from_items(self.repo.list(user, status)?)
    }

    pub fn add_item(&self, user: &str, item: CartItem) -> Result<Cart, DomainError> {
        item.validate()?;
        self.repo.upsert(user, &item.normalized())?;
        self.get_cart(user, ItemStatus::InCart)
    }

    /// Fold a whole cart into the user's server cart. Lines sharing a key are
    /// summed before they reach the repository.
    pub fn merge_cart(
        &self,
        user: &str,
        items: Vec<CartItem>,
        sync_token: Option<Uuid>,
    ) -> Result<Cart, DomainError> {
        for item in &items {
            item.validate()?;
        }
        let incoming = Cart::from_items(items.into_iter().map(CartItem::normalized))?;
        let applied = self.repo.merge(user, incoming.items(), sync_token)?;
        if !applied {
            log::info!("Ignoring replayed cart sync {sync_token:?} for {user}");
        }
        self.get_cart(user, ItemStatus::InCart)
    }

    pub fn update_quantity(&self, user: &str, item: CartItem) -> Result<Cart, DomainError> {
        if item.quantity < 0 {
            return Err(DomainError::InvalidInput(format!(
                "quantity must not be negative, got {}",
                item.quantity
            )));
        }
        let key: LineKey = item.key();
        if !self.repo.set_quantity(user, &key, item.quantity)? {
            return Err(DomainError::NotFound);
        }
        self.get_cart(user, ItemStatus::InCart)
    }

    pub fn remove_variant(&self, user: &str, variant_id: i32) -> Result<(usize, Cart), DomainError> {
        let removed = self.repo.remove_variant(user, variant_id)?;
        Ok((removed, self.get_cart(user, ItemStatus::InCart)?))
    }

    pub fn clear(&self, user: &str) -> Result<usize, DomainError> {
        self.repo.clear(user)
    }

    pub fn finalize(
        &self,
        user: &str,
        order_number: &OrderNumber,
        payment_intent_id: Option<&str>,
    ) -> Result<FinalizeOutcome, DomainError> {
        let outcome = self.repo.finalize(user, order_number, payment_intent_id)?;
        if outcome.replayed {
            log::warn!(
                "Payment intent {:?} already finalized as {} for {user}",
                payment_intent_id,
                outcome.order_number
            );
        } else {
            log::info!(
                "Finalized order {} for {user} ({} lines)",
                outcome.order_number,
                outcome.updated
            );
        }
        Ok(outcome)
    }
}
