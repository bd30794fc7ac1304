use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Caller;
use crate::domain::pricing::to_minor_units;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePaymentIntentRequest {
    /// Checkout total in major currency units, e.g. "224.99"
    #[schema(value_type = String)]
    pub amount: BigDecimal,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub client_secret: String,
}

/// POST /create_payment_intent
///
/// Creates a payment intent with the external provider and hands back its
/// client secret. The intent is tagged with the caller's identity.
#[utoipa::path(
    post,
    path = "/create_payment_intent",
    request_body = CreatePaymentIntentRequest,
    responses(
        (status = 200, description = "Intent created", body = CreatePaymentIntentResponse),
        (status = 400, description = "Amount is not positive"),
        (status = 502, description = "Payment provider unavailable"),
    ),
    tag = "payment"
)]
pub async fn create_payment_intent(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<CreatePaymentIntentRequest>,
) -> Result<HttpResponse, AppError> {
    let CreatePaymentIntentRequest {
        amount,
        mut metadata,
    } = body.into_inner();
    let amount_minor = to_minor_units(&amount)?;
    metadata.insert("userId".to_string(), caller.id().to_string());

    let intent = state
        .payments
        .create_intent(amount_minor, &state.currency, &metadata)
        .await?;
    log::debug!("Payment intent {} belongs to {}", intent.id, caller.id());

    Ok(HttpResponse::Ok().json(CreatePaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}
