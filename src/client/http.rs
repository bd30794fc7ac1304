use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use super::api::{ApiError, StoreApi};
use crate::auth::USER_HEADER;
use crate::domain::cart::{Cart, CartItem, ItemStatus};
use crate::domain::order::{OrderNumber, OrderSummary};
use crate::domain::shipping::ShippingInfo;
use crate::handlers::cart::{
    AddToCartRequest, BulkCartRequest, CartResponse, FinalizeRequest, FinalizeResponse,
    RemoveFromCartResponse, UpdateCartRequest,
};
use crate::handlers::payment::{CreatePaymentIntentRequest, CreatePaymentIntentResponse};
use crate::handlers::shipping::ShippingResponse;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// [`StoreApi`] over HTTP. Identity travels in the `x-user-id` header.
#[derive(Debug, Clone)]
pub struct HttpStoreApi {
    http: Client,
    base_url: String,
}

impl HttpStoreApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, path: &str, user: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header(USER_HEADER, user)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl StoreApi for HttpStoreApi {
    async fn fetch_cart(&self, user: &str, status: ItemStatus) -> Result<Cart, ApiError> {
        let mut request = self.request(Method::GET, "/cart", user);
        if status == ItemStatus::Purchased {
            request = request.query(&[("page", "purchased")]);
        }
        let body: CartResponse = Self::send(request).await?;
        Ok(body.cart.into())
    }

    async fn add_item(&self, user: &str, item: &CartItem) -> Result<Cart, ApiError> {
        let payload = AddToCartRequest {
            cart_item: Some(item.clone()),
            cart: None,
        };
        let body: CartResponse =
            Self::send(self.request(Method::POST, "/cart", user).json(&payload)).await?;
        Ok(body.cart.into())
    }

    async fn merge_cart(
        &self,
        user: &str,
        items: &[CartItem],
        sync_token: Option<Uuid>,
    ) -> Result<Cart, ApiError> {
        let payload = AddToCartRequest {
            cart_item: None,
            cart: Some(BulkCartRequest {
                items: items.to_vec(),
                sync_token,
            }),
        };
        let body: CartResponse =
            Self::send(self.request(Method::POST, "/cart", user).json(&payload)).await?;
        Ok(body.cart.into())
    }

    async fn update_quantity(&self, user: &str, item: &CartItem) -> Result<Cart, ApiError> {
        let payload = UpdateCartRequest {
            cart_item: item.clone(),
        };
        let body: CartResponse =
            Self::send(self.request(Method::PUT, "/cart", user).json(&payload)).await?;
        Ok(body.cart.into())
    }

    async fn remove_variant(&self, user: &str, variant_id: i32) -> Result<Cart, ApiError> {
        let request = self
            .request(Method::DELETE, "/cart", user)
            .query(&[("id", variant_id)]);
        let body: RemoveFromCartResponse = Self::send(request).await?;
        Ok(body.cart.into())
    }

    async fn clear_cart(&self, user: &str) -> Result<usize, ApiError> {
        let body: RemoveFromCartResponse =
            Self::send(self.request(Method::DELETE, "/cart", user)).await?;
        Ok(body.removed)
    }

    async fn finalize(
        &self,
        user: &str,
        order_number: &OrderNumber,
        payment_intent_id: Option<&str>,
    ) -> Result<FinalizeResponse, ApiError> {
        let payload = FinalizeRequest {
            order_number: order_number.clone(),
            payment_intent_id: payment_intent_id.map(str::to_string),
        };
        Self::send(self.request(Method::PATCH, "/cart", user).json(&payload)).await
    }

    async fn fetch_shipping(&self, user: &str) -> Result<Option<ShippingInfo>, ApiError> {
        let body: ShippingResponse =
            Self::send(self.request(Method::GET, "/shipping", user)).await?;
        Ok(body.shipping_info)
    }

    async fn save_shipping(
        &self,
        user: &str,
        info: &ShippingInfo,
    ) -> Result<ShippingInfo, ApiError> {
        let body: ShippingResponse =
            Self::send(self.request(Method::POST, "/shipping", user).json(info)).await?;
        body.shipping_info
            .ok_or_else(|| ApiError::Decode("shippingInfo missing from response".to_string()))
    }

    async fn create_payment_intent(
        &self,
        user: &str,
        amount: &BigDecimal,
        metadata: &HashMap<String, String>,
    ) -> Result<String, ApiError> {
        let payload = CreatePaymentIntentRequest {
            amount: amount.clone(),
            metadata: metadata.clone(),
        };
        let body: CreatePaymentIntentResponse = Self::send(
            self.request(Method::POST, "/create_payment_intent", user)
                .json(&payload),
        )
        .await?;
        Ok(body.client_secret)
    }

    async fn fetch_order(&self, user: &str, order_id: &str) -> Result<OrderSummary, ApiError> {
        let request = self
            .request(Method::GET, "/purchased", user)
            .query(&[("orderId", order_id)]);
        Self::send(request).await
    }
}
