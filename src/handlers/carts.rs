use crate::{
    errors::ServiceError,
    handlers::common::{owner_from_headers, success_response, validate_input},
    services::cart::QuantityChange,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/:product_id", delete(remove_item))
        .route("/cart/from-wishlist", post(add_wishlist_to_cart))
}

#[derive(Debug, Deserialize, Validate)]
struct AddCartItemRequest {
    product_id: Uuid,
    /// Explicit quantity overwrites the line; omitted means "+1".
    #[validate(range(min = 1, max = 999))]
    quantity: Option<i32>,
}

async fn get_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let owner = owner_from_headers(&headers)?;
    match state.services.carts.get_cart(&owner).await? {
        Some(view) => Ok(success_response(view)),
        None => Err(ServiceError::NotFound("Cart not found".to_string())),
    }
}

async fn add_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AddCartItemRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&payload)?;
    let owner = owner_from_headers(&headers)?;

    let change = match payload.quantity {
        Some(q) => QuantityChange::Set(q),
        None => QuantityChange::Increment,
    };

    let view = state
        .services
        .carts
        .add_item(&owner, payload.product_id, change)
        .await?;
    Ok(success_response(view))
}

async fn remove_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let owner = owner_from_headers(&headers)?;
    let view = state.services.carts.remove_item(&owner, product_id).await?;
    Ok(success_response(view))
}

async fn clear_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let owner = owner_from_headers(&headers)?;
    let view = state.services.carts.clear(&owner).await?;
    Ok(success_response(view))
}

async fn add_wishlist_to_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let customer_id = crate::handlers::common::customer_from_headers(&headers)?;
    let added = state.services.carts.add_wishlist_to_cart(customer_id).await?;
    Ok(success_response(serde_json::json!({ "added": added })))
}
