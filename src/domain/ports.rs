use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::cart::{CartItem, ItemStatus, LineKey};
use super::errors::{DomainError, PaymentError};
use super::order::{FinalizeOutcome, OrderNumber, OrderRecord};
use super::payment::PaymentIntent;
use super::shipping::ShippingInfo;

/// Per-user cart rows. Every call is scoped to `user`.
pub trait CartRepository: Send + Sync + 'static {
    fn list(&self, user: &str, status: ItemStatus) -> Result<Vec<CartItem>, DomainError>;
    fn upsert(&self, user: &str, item: &CartItem) -> Result<(), DomainError>;
    /// Upsert many lines at once. A `sync_token` already applied for `user`
    /// turns the call into a no-op; returns whether anything was applied.
    fn merge(
        &self,
        user: &str,
        items: &[CartItem],
        sync_token: Option<Uuid>,
    ) -> Result<bool, DomainError>;
    fn set_quantity(&self, user: &str, key: &LineKey, quantity: i32) -> Result<bool, DomainError>;
    fn remove_variant(&self, user: &str, variant_id: i32) -> Result<usize, DomainError>;
    fn clear(&self, user: &str) -> Result<usize, DomainError>;
    /// Move every `IN_CART` row to `PURCHASED` under `order_number`, all or nothing.
    fn finalize(
        &self,
        user: &str,
        order_number: &OrderNumber,
        payment_intent_id: Option<&str>,
    ) -> Result<FinalizeOutcome, DomainError>;
    fn find_order(
        &self,
        user: &str,
        order_number: &OrderNumber,
    ) -> Result<Option<OrderRecord>, DomainError>;
}

pub trait ShippingRepository: Send + Sync + 'static {
    fn find(&self, user: &str) -> Result<Option<ShippingInfo>, DomainError>;
    fn upsert(&self, user: &str, info: &ShippingInfo) -> Result<ShippingInfo, DomainError>;
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<PaymentIntent, PaymentError>;

    /// Look an intent up again; the redirect parameters alone prove nothing.
    async fn retrieve_intent(
        &self,
        id: &str,
        client_secret: &str,
    ) -> Result<PaymentIntent, PaymentError>;
}

impl<T: CartRepository + ?Sized> CartRepository for Arc<T> {
    fn list(&self, user: &str, status: ItemStatus) -> Result<Vec<CartItem>, DomainError> {
        (**self).list(user, status)
    }

    fn upsert(&self, user: &str, item: &CartItem) -> Result<(), DomainError> {
        (**self).upsert(user, item)
    }

    fn merge(
        &self,
        user: &str,
        items: &[CartItem],
        sync_token: Option<Uuid>,
    ) -> Result<bool, DomainError> {
        (**self).merge(user, items, sync_token)
    }

    fn set_quantity(&self, user: &str, key: &LineKey, quantity: i32) -> Result<bool, DomainError> {
        (**self).set_quantity(user, key, quantity)
    }

    fn remove_variant(&self, user: &str, variant_id: i32) -> Result<usize, DomainError> {
        (**self).remove_variant(user, variant_id)
    }

    fn clear(&self, user: &str) -> Result<usize, DomainError> {
        (**self).clear(user)
    }

    fn finalize(
        &self,
        user: &str,
        order_number: &OrderNumber,
        payment_intent_id: Option<&str>,
    ) -> Result<FinalizeOutcome, DomainError> {
        (**self).finalize(user, order_number, payment_intent_id)
    }

    fn find_order(
        &self,
        user: &str,
        order_number: &OrderNumber,
    ) -> Result<Option<OrderRecord>, DomainError> {
        (**self).find_order(user, order_number)
    }
}

impl<T: ShippingRepository + ?Sized> ShippingRepository for Arc<T> {
    fn find(&self, user: &str) -> Result<Option<ShippingInfo>, DomainError> {
        (**self).find(user)
    }

    fn upsert(&self, user: &str, info: &ShippingInfo) -> Result<ShippingInfo, DomainError> {
        (**self).upsert(user, info)
    }
}
