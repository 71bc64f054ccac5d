//! Business logic layer. Each service owns one slice of the storefront and
//! returns `Result<_, ServiceError>`; handlers stay thin.

pub mod cart;
pub mod catalog;
pub mod comparisons;
pub mod coupons;
pub mod orders;
pub mod recently_viewed;
pub mod reviews;
pub mod wishlists;

pub use cart::CartService;
pub use catalog::ProductCatalogService;
pub use comparisons::ComparisonService;
pub use coupons::CouponService;
pub use orders::OrderService;
pub use recently_viewed::RecentlyViewedService;
pub use reviews::ReviewService;
pub use wishlists::WishlistService;

use sea_orm::{error::SqlErr, DbErr};
use uuid::Uuid;

/// True when a write was rejected by a unique index, meaning a concurrent
/// request inserted the same row first. Upsert paths use this to fall back to
/// their update branch instead of surfacing a 500.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Identity a cart or comparison list is keyed on: an authenticated customer
/// or an anonymous session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Customer(Uuid),
    Session(String),
}

impl Owner {
    pub fn customer_id(&self) -> Option<Uuid> {
        match self {
            Owner::Customer(id) => Some(*id),
            Owner::Session(_) => None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Owner::Customer(_) => None,
            Owner::Session(s) => Some(s),
        }
    }
}
