use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Caller;
use crate::domain::cart::{CartItem, CartSummary, ItemStatus};
use crate::domain::order::OrderNumber;
use crate::errors::AppError;
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartResponse {
    pub cart: CartSummary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkCartRequest {
    pub items: Vec<CartItem>,
    /// Identifies one guest cart upload; replays with the same token are ignored.
    #[serde(default)]
    pub sync_token: Option<Uuid>,
}

/// Either a single line or a whole cart.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    #[serde(default)]
    pub cart_item: Option<CartItem>,
    #[serde(default)]
    pub cart: Option<BulkCartRequest>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    pub cart_item: CartItem,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RemoveFromCartResponse {
    pub removed: usize,
    pub cart: CartSummary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub order_number: OrderNumber,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    pub count: usize,
    pub order_number: OrderNumber,
}

#[derive(Debug, Deserialize)]
pub struct CartParams {
    #[serde(default)]
    pub page: Option<String>,
}

impl CartParams {
    fn status(&self) -> Result<ItemStatus, AppError> {
        match self.page.as_deref() {
            None | Some("") | Some("cart") => Ok(ItemStatus::InCart),
            Some("purchased") => Ok(ItemStatus::Purchased),
            Some(other) => Err(AppError::BadRequest(format!("unknown page '{other}'"))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RemoveParams {
    #[serde(default)]
    pub id: Option<i32>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart
///
/// Returns the caller's cart. `page=purchased` lists purchased items instead.
#[utoipa::path(
    get,
    path = "/cart",
    params(
        ("page" = Option<String>, Query, description = "`purchased` for order history, default is the open cart"),
    ),
    responses(
        (status = 200, description = "Current cart", body = CartResponse),
        (status = 401, description = "Missing caller identity"),
    ),
    tag = "cart"
)]
pub async fn get_cart(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<CartParams>,
) -> Result<HttpResponse, AppError> {
    let status = query.into_inner().status()?;

    let cart = web::block(move || state.carts.get_cart(caller.id(), status))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse {
        cart: cart.summary(),
    }))
}

/// POST /cart
///
/// Upserts one line (`cartItem`) or a whole cart (`cart.items`). Lines that
/// match an existing line's variant, condition, storage, color and seller
/// increment its quantity.
#[utoipa::path(
    post,
    path = "/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Invalid cart item"),
        (status = 401, description = "Missing caller identity"),
    ),
    tag = "cart"
)]
pub async fn add_to_cart(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<AddToCartRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let cart = match (body.cart_item, body.cart) {
        (Some(item), None) => {
            web::block(move || state.carts.add_item(caller.id(), item))
                .await
                .map_err(|e| AppError::Internal(e.to_string()))??
        }
        (None, Some(bulk)) => {
            web::block(move || state.carts.merge_cart(caller.id(), bulk.items, bulk.sync_token))
                .await
                .map_err(|e| AppError::Internal(e.to_string()))??
        }
        _ => {
            return Err(AppError::BadRequest(
                "expected exactly one of `cartItem` or `cart`".to_string(),
            ))
        }
    };

    Ok(HttpResponse::Ok().json(CartResponse {
        cart: cart.summary(),
    }))
}

/// PUT /cart
///
/// Sets the absolute quantity of an existing line; quantity 0 removes it.
#[utoipa::path(
    put,
    path = "/cart",
    request_body = UpdateCartRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "No such line in the cart"),
    ),
    tag = "cart"
)]
pub async fn update_cart(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<UpdateCartRequest>,
) -> Result<HttpResponse, AppError> {
    let item = body.into_inner().cart_item;

    let cart = web::block(move || state.carts.update_quantity(caller.id(), item))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse {
        cart: cart.summary(),
    }))
}

/// DELETE /cart
///
/// Removes every open line of variant `id`, or clears the cart when no id is given.
#[utoipa::path(
    delete,
    path = "/cart",
    params(
        ("id" = Option<i32>, Query, description = "Variant to remove"),
    ),
    responses(
        (status = 200, description = "Remaining cart", body = RemoveFromCartResponse),
    ),
    tag = "cart"
)]
pub async fn remove_from_cart(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<RemoveParams>,
) -> Result<HttpResponse, AppError> {
    let variant = query.into_inner().id;

    let (removed, cart) = web::block(move || match variant {
        Some(id) => state.carts.remove_variant(caller.id(), id),
        None => {
            let removed = state.carts.clear(caller.id())?;
            Ok((removed, Default::default()))
        }
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(RemoveFromCartResponse {
        removed,
        cart: CartSummary::from(cart),
    }))
}

/// PATCH /cart
///
/// Moves every open line to `PURCHASED` under `orderNumber` in one
/// transaction. Fails without changing anything if the cart is empty.
#[utoipa::path(
    patch,
    path = "/cart",
    request_body = FinalizeRequest,
    responses(
        (status = 200, description = "Lines purchased", body = FinalizeResponse),
        (status = 409, description = "Cart empty or order number already used"),
    ),
    tag = "cart"
)]
pub async fn finalize_cart(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<FinalizeRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let outcome = web::block(move || {
        state.carts.finalize(
            caller.id(),
            &body.order_number,
            body.payment_intent_id.as_deref(),
        )
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(FinalizeResponse {
        count: outcome.updated,
        order_number: outcome.order_number,
    }))
}
