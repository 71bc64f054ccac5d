use crate::{errors::ServiceError, services::Owner};
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))
}

const CUSTOMER_HEADER: &str = "x-customer-id";
const SESSION_HEADER: &str = "x-session-id";
const ADMIN_HEADER: &str = "x-admin-id";

/// Authenticated customer identity. Token verification happens upstream; by
/// the time a request reaches us the verified customer id is carried in the
/// `X-Customer-Id` header.
pub fn customer_from_headers(headers: &HeaderMap) -> Result<Uuid, ServiceError> {
    let raw = headers
        .get(CUSTOMER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::ValidationError("Missing X-Customer-Id header".to_string()))?;

    Uuid::parse_str(raw)
        .map_err(|_| ServiceError::ValidationError("Invalid X-Customer-Id header".to_string()))
}

/// Back-office identity for admin-only endpoints such as order status
/// updates. Verified upstream like the customer id and carried in
/// `X-Admin-Id`; its absence means the caller is not staff.
pub fn admin_from_headers(headers: &HeaderMap) -> Result<Uuid, ServiceError> {
    headers
        .get(ADMIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| ServiceError::Forbidden("Admin access required".to_string()))
}

/// Cart/comparison owner: a customer id when present, otherwise an anonymous
/// session id from `X-Session-Id`.
pub fn owner_from_headers(headers: &HeaderMap) -> Result<Owner, ServiceError> {
    if headers.contains_key(CUSTOMER_HEADER) {
        return Ok(Owner::Customer(customer_from_headers(headers)?));
    }

    let session = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ServiceError::ValidationError(
                "Provide X-Customer-Id or X-Session-Id to identify the cart owner".to_string(),
            )
        })?;

    Ok(Owner::Session(session.to_string()))
}

/// Pagination parameters for list operations
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

/// Standard pagination response metadata
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn owner_prefers_customer_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(CUSTOMER_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        headers.insert(SESSION_HEADER, HeaderValue::from_static("sess-1"));

        assert_eq!(owner_from_headers(&headers).unwrap(), Owner::Customer(id));
    }

    #[test]
    fn owner_falls_back_to_session() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static("sess-1"));

        assert_eq!(
            owner_from_headers(&headers).unwrap(),
            Owner::Session("sess-1".to_string())
        );
    }

    #[test]
    fn missing_identity_is_a_validation_error() {
        let headers = HeaderMap::new();
        assert!(matches!(
            owner_from_headers(&headers),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn missing_admin_header_is_forbidden() {
        let headers = HeaderMap::new();
        assert!(matches!(
            admin_from_headers(&headers),
            Err(ServiceError::Forbidden(_))
        ));

        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(matches!(
            admin_from_headers(&headers),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_header_parses_to_uuid() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(admin_from_headers(&headers).unwrap(), id);
    }

    #[test]
    fn pagination_meta_rounds_pages_up() {
        let meta = PaginationMeta::new(1, 20, 41);
        assert_eq!(meta.total_pages, 3);
    }
}
