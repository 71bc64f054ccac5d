use crate::{
    errors::ServiceError,
    handlers::common::{owner_from_headers, success_response},
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
        .route("/comparison", get(get_comparison).delete(clear_comparison))
        .route("/comparison/items", post(add_item))
        .route("/comparison/items/:product_id", delete(remove_item))
}

async fn get_comparison(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let owner = owner_from_headers(&headers)?;
    let view = state.services.comparisons.get_comparison(&owner).await?;
    Ok(success_response(view))
}

#[derive(Debug, Deserialize)]
struct AddComparisonItemRequest {
    product_id: Uuid,
}

async fn add_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AddComparisonItemRequest>,
) -> Result<Response, ServiceError> {
    let owner = owner_from_headers(&headers)?;
    let view = state
        .services
        .comparisons
        .add_item(&owner, payload.product_id)
        .await?;
    Ok(success_response(view))
}

async fn remove_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let owner = owner_from_headers(&headers)?;
    let view = state
        .services
        .comparisons
        .remove_item(&owner, product_id)
        .await?;
    Ok(success_response(view))
}

async fn clear_comparison(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let owner = owner_from_headers(&headers)?;
    let view = state.services.comparisons.clear(&owner).await?;
    Ok(success_response(view))
}
