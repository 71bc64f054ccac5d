//! HTTP handlers. Thin adapters: extract identity and payload, call the
//! service, shape the response.

pub mod carts;
pub mod common;
pub mod comparisons;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod wishlists;

use crate::{
    config::AppConfig,
    events::EventSender,
    services::{
        CartService, ComparisonService, CouponService, OrderService, ProductCatalogService,
        RecentlyViewedService, ReviewService, WishlistService,
    },
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Service container wired once at startup and cloned into handlers through
/// `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<ProductCatalogService>,
    pub carts: Arc<CartService>,
    pub coupons: Arc<CouponService>,
    pub orders: Arc<OrderService>,
    pub reviews: Arc<ReviewService>,
    pub wishlists: Arc<WishlistService>,
    pub comparisons: Arc<ComparisonService>,
    pub recently_viewed: Arc<RecentlyViewedService>,
}

impl AppServices {
    pub fn build(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Self {
        Self {
            catalog: Arc::new(ProductCatalogService::new(
                db.clone(),
                config.api_page_size,
                config.api_max_page_size,
            )),
            carts: Arc::new(CartService::new(db.clone(), event_sender.clone())),
            coupons: Arc::new(CouponService::new(db.clone())),
            orders: Arc::new(OrderService::new(db.clone(), event_sender.clone())),
            reviews: Arc::new(ReviewService::new(db.clone(), event_sender.clone())),
            wishlists: Arc::new(WishlistService::new(db.clone(), event_sender.clone())),
            recently_viewed: Arc::new(RecentlyViewedService::new(db.clone())),
            comparisons: Arc::new(ComparisonService::new(db, event_sender)),
        }
    }
}
