use crate::{
    errors::ServiceError,
    handlers::common::{
        customer_from_headers, no_content_response, success_response, validate_input,
    },
    services::reviews::SubmitReviewInput,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products/:id/reviews",
            get(list_reviews).post(submit_review).delete(delete_review),
        )
        .route("/products/:id/reviews/summary", get(rating_summary))
}

async fn list_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let reviews = state.services.reviews.list_for_product(product_id).await?;
    Ok(success_response(reviews))
}

async fn submit_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<SubmitReviewInput>,
) -> Result<Response, ServiceError> {
    validate_input(&payload)?;
    let customer_id = customer_from_headers(&headers)?;
    let review = state
        .services
        .reviews
        .upsert_review(product_id, customer_id, payload)
        .await?;
    Ok(success_response(review))
}

async fn delete_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let customer_id = customer_from_headers(&headers)?;
    state
        .services
        .reviews
        .delete_review(product_id, customer_id)
        .await?;
    Ok(no_content_response())
}

async fn rating_summary(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let summary = state.services.reviews.rating_summary(product_id).await?;
    Ok(success_response(summary))
}
