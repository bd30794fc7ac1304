use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::cart::{Cart, CartItem, ItemStatus};
use crate::domain::order::{OrderNumber, OrderSummary};
use crate::domain::shipping::ShippingInfo;
use crate::handlers::cart::FinalizeResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("store unreachable: {0}")]
    Network(String),
    #[error("store returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("not found")]
    NotFound,
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// The store's HTTP surface as seen by the client. Every call acts on
/// behalf of `user`.
#[async_trait]
pub trait StoreApi: Send + Sync {
    async fn fetch_cart(&self, user: &str, status: ItemStatus) -> Result<Cart, ApiError>;

    async fn add_item(&self, user: &str, item: &CartItem) -> Result<Cart, ApiError>;

    /// Upload a whole cart. Replays of the same `sync_token` are ignored server-side.
    async fn merge_cart(
        &self,
        user: &str,
        items: &[CartItem],
        sync_token: Option<Uuid>,
    ) -> Result<Cart, ApiError>;

    async fn update_quantity(&self, user: &str, item: &CartItem) -> Result<Cart, ApiError>;

    async fn remove_variant(&self, user: &str, variant_id: i32) -> Result<Cart, ApiError>;

    async fn clear_cart(&self, user: &str) -> Result<usize, ApiError>;

    async fn finalize(
        &self,
        user: &str,
        order_number: &OrderNumber,
        payment_intent_id: Option<&str>,
    ) -> Result<FinalizeResponse, ApiError>;

    async fn fetch_shipping(&self, user: &str) -> Result<Option<ShippingInfo>, ApiError>;

    async fn save_shipping(&self, user: &str, info: &ShippingInfo)
        -> Result<ShippingInfo, ApiError>;

    /// Returns the client secret of the new intent.
    async fn create_payment_intent(
        &self,
        user: &str,
        amount: &BigDecimal,
        metadata: &HashMap<String, String>,
    ) -> Result<String, ApiError>;

    async fn fetch_order(&self, user: &str, order_id: &str) -> Result<OrderSummary, ApiError>;
}
