use crate::{
    errors::ServiceError,
    handlers::common::{customer_from_headers, success_response},
    services::catalog::ProductQuery,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/featured", get(featured_products))
        .route("/products/recently-viewed", get(recently_viewed))
        .route("/products/:id", get(get_product))
        .route("/categories", get(list_categories))
        .route("/categories/:id", get(get_category))
}

async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Response, ServiceError> {
    let listing = state.services.catalog.list_products(query).await?;
    Ok(success_response(listing))
}

#[derive(Debug, Deserialize)]
struct FeaturedQuery {
    limit: Option<u64>,
}

async fn featured_products(
    State(state): State<AppState>,
    Query(query): Query<FeaturedQuery>,
) -> Result<Response, ServiceError> {
    let products = state
        .services
        .catalog
        .featured_products(query.limit.unwrap_or(8))
        .await?;
    Ok(success_response(products))
}

async fn get_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let detail = state.services.catalog.get_product(id).await?;

    // Track the view for signed-in customers; anonymous browsing and
    // tracking failures never affect the response.
    if let Ok(customer_id) = customer_from_headers(&headers) {
        if let Err(err) = state
            .services
            .recently_viewed
            .record_view(customer_id, id)
            .await
        {
            warn!(product_id = %id, error = %err, "failed to record product view");
        }
    }

    Ok(success_response(detail))
}

async fn recently_viewed(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let customer_id = customer_from_headers(&headers)?;
    let products = state
        .services
        .recently_viewed
        .recent_products(customer_id)
        .await?;
    Ok(success_response(products))
}

async fn list_categories(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(success_response(categories))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let category = state.services.catalog.get_category(id).await?;
    Ok(success_response(category))
}
