use crate::{
    entities::OrderStatus,
    errors::ServiceError,
    handlers::common::{
        admin_from_headers, created_response, customer_from_headers, success_response,
        validate_input, PaginationMeta, PaginationParams,
    },
    services::orders::CheckoutRequest,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/status", put(update_status))
}

async fn checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&payload)?;
    let customer_id = customer_from_headers(&headers)?;
    let placed = state.services.orders.place_order(customer_id, payload).await?;
    Ok(created_response(placed))
}

#[derive(Debug, Serialize)]
struct OrderListResponse<T: Serialize> {
    orders: T,
    meta: PaginationMeta,
}

async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ServiceError> {
    let customer_id = customer_from_headers(&headers)?;
    let per_page = state.config.clamp_page_size(Some(pagination.per_page));
    let (orders, total) = state
        .services
        .orders
        .list_orders(customer_id, pagination.page, per_page)
        .await?;

    Ok(success_response(OrderListResponse {
        orders,
        meta: PaginationMeta::new(pagination.page, per_page, total),
    }))
}

async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let customer_id = customer_from_headers(&headers)?;
    let (order, items) = state.services.orders.get_order(id, customer_id).await?;
    Ok(success_response(serde_json::json!({
        "order": order,
        "items": items,
    })))
}

async fn cancel_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let customer_id = customer_from_headers(&headers)?;
    let order = state.services.orders.cancel_order(id, customer_id).await?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: OrderStatus,
}

async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Response, ServiceError> {
    admin_from_headers(&headers)?;
    let order = state.services.orders.update_status(id, payload.status).await?;
    Ok(success_response(order))
}
