mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use storefront_api::{
    entities::{recently_viewed, RecentlyViewed},
    errors::ServiceError,
    services::recently_viewed::RECENTLY_VIEWED_CAP,
};
use uuid::Uuid;

#[tokio::test]
async fn history_is_capped_and_newest_first() {
    let app = TestApp::new().await;
    let category = app.seed_category("Gadgets").await;
    let customer = Uuid::new_v4();

    let mut products = Vec::new();
    for i in 0..12 {
        let id = app
            .seed_product(category, &format!("Gadget {i}"), dec!(10.00))
            .await;
        products.push(id);
    }
    for id in &products {
        app.state
            .services
            .recently_viewed
            .record_view(customer, *id)
            .await
            .expect("record view");
    }

    let recent = app
        .state
        .services
        .recently_viewed
        .recent_products(customer)
        .await
        .expect("list");
    assert_eq!(recent.len(), RECENTLY_VIEWED_CAP as usize);
    assert_eq!(recent[0].id, products[11]);
    assert!(!recent.iter().any(|p| p.id == products[0]));
    assert!(!recent.iter().any(|p| p.id == products[1]));

    // Old records are deleted, not just hidden.
    let rows = RecentlyViewed::find()
        .filter(recently_viewed::Column::CustomerId.eq(customer))
        .count(&*app.state.db)
        .await
        .expect("count");
    assert_eq!(rows, RECENTLY_VIEWED_CAP);
}

#[tokio::test]
async fn repeat_view_moves_product_to_front_without_duplicating() {
    let app = TestApp::new().await;
    let category = app.seed_category("Gadgets").await;
    let customer = Uuid::new_v4();
    let first = app.seed_product(category, "Compass", dec!(14.00)).await;
    let second = app.seed_product(category, "Sextant", dec!(90.00)).await;

    for id in [first, second, first] {
        app.state
            .services
            .recently_viewed
            .record_view(customer, id)
            .await
            .expect("record view");
    }

    let recent = app
        .state
        .services
        .recently_viewed
        .recent_products(customer)
        .await
        .expect("list");
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, first);
    assert_eq!(recent[1].id, second);

    let rows = RecentlyViewed::find()
        .filter(recently_viewed::Column::CustomerId.eq(customer))
        .filter(recently_viewed::Column::ProductId.eq(first))
        .count(&*app.state.db)
        .await
        .expect("count");
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn viewing_an_unknown_product_fails() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .recently_viewed
        .record_view(Uuid::new_v4(), Uuid::new_v4())
        .await
        .expect_err("unknown product");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn histories_are_scoped_per_customer() {
    let app = TestApp::new().await;
    let category = app.seed_category("Gadgets").await;
    let product = app.seed_product(category, "Barometer", dec!(40.00)).await;

    let viewer = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    app.state
        .services
        .recently_viewed
        .record_view(viewer, product)
        .await
        .expect("record view");

    let recent = app
        .state
        .services
        .recently_viewed
        .recent_products(stranger)
        .await
        .expect("list");
    assert!(recent.is_empty());
}
