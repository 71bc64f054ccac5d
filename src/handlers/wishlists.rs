use crate::{
    errors::ServiceError,
    handlers::common::{customer_from_headers, success_response},
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

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wishlist", get(get_wishlist))
        .route("/wishlist/items", post(add_item))
        .route("/wishlist/items/:product_id", delete(remove_item))
}

async fn get_wishlist(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let customer_id = customer_from_headers(&headers)?;
    let view = state.services.wishlists.get_wishlist(customer_id).await?;
    Ok(success_response(view))
}

#[derive(Debug, Deserialize)]
struct AddWishlistItemRequest {
    product_id: Uuid,
}

async fn add_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AddWishlistItemRequest>,
) -> Result<Response, ServiceError> {
    let customer_id = customer_from_headers(&headers)?;
    let view = state
        .services
        .wishlists
        .add_item(customer_id, payload.product_id)
        .await?;
    Ok(success_response(view))
}

async fn remove_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let customer_id = customer_from_headers(&headers)?;
    let view = state
        .services
        .wishlists
        .remove_item(customer_id, product_id)
        .await?;
    Ok(success_response(view))
}
