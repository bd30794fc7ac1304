use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::Caller;
use crate::domain::order::OrderSummary;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct PurchasedParams {
    /// Order number, e.g. `ORD-01234567-042`
    pub order_id: String,
}

/// GET /purchased?orderId=
///
/// Materializes one of the caller's finalized orders. Orders belonging to
/// someone else are indistinguishable from unknown ones.
#[utoipa::path(
    get,
    path = "/purchased",
    params(PurchasedParams),
    responses(
        (status = 200, description = "Order found", body = OrderSummary),
        (status = 404, description = "No such order for this caller"),
    ),
    tag = "orders"
)]
pub async fn get_purchased(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<PurchasedParams>,
) -> Result<HttpResponse, AppError> {
    let order_id = query.into_inner().order_id;

    let summary = web::block(move || state.orders.get_order(caller.id(), &order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(summary))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use super::*;
    use crate::auth::USER_HEADER;
    use crate::test_support::{memory_state, StubPaymentProvider};

    #[actix_web::test]
    async fn order_is_visible_to_its_owner_only() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(memory_state(StubPaymentProvider::default())))
                .configure(crate::handlers::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/cart")
            .insert_header((USER_HEADER, "ada"))
            .set_json(json!({ "cartItem": {
                "id": 7, "title": "iPhone 13", "condition": "Excellent",
                "storage": "256GB", "color": "Blue", "price": "410.00", "quantity": 2
            }}))
            .to_request();
        test::call_service(&app, req).await;
        let req = test::TestRequest::patch()
            .uri("/cart")
            .insert_header((USER_HEADER, "ada"))
            .set_json(json!({ "orderNumber": "ORD-00000042-007" }))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get()
            .uri("/purchased?orderId=ORD-00000042-007")
            .insert_header((USER_HEADER, "ada"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["orderId"], "ORD-00000042-007");
        assert_eq!(body["totalItems"], 2);
        assert_eq!(body["totalPrice"], "820.00");

        let req = test::TestRequest::get()
            .uri("/purchased?orderId=ORD-00000042-007")
            .insert_header((USER_HEADER, "bob"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn missing_order_id_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(memory_state(StubPaymentProvider::default())))
                .configure(crate::handlers::configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/purchased")
            .insert_header((USER_HEADER, "ada"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
