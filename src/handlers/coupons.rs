use crate::{
    errors::ServiceError,
    handlers::common::{created_response, success_response},
    services::coupons::CreateCouponInput,
    AppState,
};
use axum::{
    extract::{Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/coupons", post(create_coupon))
        .route("/coupons/validate", get(validate_coupon))
}

async fn create_coupon(
    State(state): State<AppState>,
    Json(payload): Json<CreateCouponInput>,
) -> Result<Response, ServiceError> {
    let coupon = state.services.coupons.create_coupon(payload).await?;
    Ok(created_response(coupon))
}

#[derive(Debug, Deserialize)]
struct ValidateCouponQuery {
    code: String,
    /// Optional order total to preview the discount against.
    order_total: Option<Decimal>,
}

async fn validate_coupon(
    State(state): State<AppState>,
    Query(query): Query<ValidateCouponQuery>,
) -> Result<Response, ServiceError> {
    let verdict = state
        .services
        .coupons
        .validate_code(&query.code, query.order_total)
        .await?;
    Ok(success_response(verdict))
}
