use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Caller;
use crate::domain::shipping::ShippingInfo;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingResponse {
    pub shipping_info: Option<ShippingInfo>,
}

/// GET /shipping
#[utoipa::path(
    get,
    path = "/shipping",
    responses(
        (status = 200, description = "Saved shipping info, null if none", body = ShippingResponse),
    ),
    tag = "shipping"
)]
pub async fn get_shipping(
    state: web::Data<AppState>,
    caller: Caller,
) -> Result<HttpResponse, AppError> {
    let info = web::block(move || state.shipping.get(caller.id()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ShippingResponse {
        shipping_info: info,
    }))
}

/// POST /shipping
///
/// Creates or replaces the caller's shipping info. Field problems come back
/// as 422 with a `fields` map.
#[utoipa::path(
    post,
    path = "/shipping",
    request_body = ShippingInfo,
    responses(
        (status = 200, description = "Stored shipping info", body = ShippingResponse),
        (status = 422, description = "Field validation failed"),
    ),
    tag = "shipping"
)]
pub async fn save_shipping(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<ShippingInfo>,
) -> Result<HttpResponse, AppError> {
    let info = body.into_inner();

    let saved = web::block(move || state.shipping.save(caller.id(), info))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ShippingResponse {
        shipping_info: Some(saved),
    }))
}
