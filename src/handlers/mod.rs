pub mod cart;
pub mod payment;
pub mod purchased;
pub mod shipping;

use actix_web::web;
use utoipa::OpenApi;

use crate::domain::cart::{CartItem, CartSummary, Condition, ItemStatus};
use crate::domain::order::{OrderNumber, OrderSummary};
use crate::domain::shipping::ShippingInfo;

#[derive(OpenApi)]
#[openapi(
    paths(
        cart::get_cart,
        cart::add_to_cart,
        cart::update_cart,
        cart::remove_from_cart,
        cart::finalize_cart,
        shipping::get_shipping,
        shipping::save_shipping,
        payment::create_payment_intent,
        purchased::get_purchased,
    ),
    components(schemas(
        CartItem,
        CartSummary,
        Condition,
        ItemStatus,
        OrderNumber,
        OrderSummary,
        ShippingInfo,
        cart::CartResponse,
        cart::BulkCartRequest,
        cart::AddToCartRequest,
        cart::UpdateCartRequest,
        cart::RemoveFromCartResponse,
        cart::FinalizeRequest,
        cart::FinalizeResponse,
        shipping::ShippingResponse,
        payment::CreatePaymentIntentRequest,
        payment::CreatePaymentIntentResponse,
    )),
    tags(
        (name = "cart", description = "Server cart for the signed-in caller"),
        (name = "shipping", description = "Shipping details captured during checkout"),
        (name = "payment", description = "Payment intent creation"),
        (name = "orders", description = "Finalized orders"),
    )
)]
pub struct ApiDoc;

/// Register every storefront route. Shared by the server and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/cart")
            .route(web::get().to(cart::get_cart))
            .route(web::post().to(cart::add_to_cart))
            .route(web::put().to(cart::update_cart))
            .route(web::delete().to(cart::remove_from_cart))
            .route(web::patch().to(cart::finalize_cart)),
    )
    .service(
        web::resource("/shipping")
            .route(web::get().to(shipping::get_shipping))
            .route(web::post().to(shipping::save_shipping)),
    )
    .route(
        "/create_payment_intent",
        web::post().to(payment::create_payment_intent),
    )
    .route("/purchased", web::get().to(purchased::get_purchased));
}
