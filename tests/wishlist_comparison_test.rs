mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use storefront_api::{
    errors::ServiceError,
    services::{reviews::SubmitReviewInput, Owner},
};
use uuid::Uuid;

#[tokio::test]
async fn wishlist_rejects_duplicate_products() {
    let app = TestApp::new().await;
    let category = app.seed_category("Gifts").await;
    let product = app.seed_product(category, "Scarf", dec!(18.00)).await;
    let customer = Uuid::new_v4();

    let view = app
        .state
        .services
        .wishlists
        .add_item(customer, product)
        .await
        .expect("add");
    assert_eq!(view.total_items, 1);

    let err = app
        .state
        .services
        .wishlists
        .add_item(customer, product)
        .await
        .expect_err("duplicate");
    assert!(matches!(err, ServiceError::AlreadyExists(_)));
}

#[tokio::test]
async fn wishlist_is_created_lazily_and_removal_works() {
    let app = TestApp::new().await;
    let category = app.seed_category("Gifts").await;
    let product = app.seed_product(category, "Mittens", dec!(12.00)).await;
    let customer = Uuid::new_v4();

    // First access creates an empty wishlist.
    let view = app
        .state
        .services
        .wishlists
        .get_wishlist(customer)
        .await
        .expect("get");
    assert_eq!(view.total_items, 0);

    app.state
        .services
        .wishlists
        .add_item(customer, product)
        .await
        .expect("add");
    let view = app
        .state
        .services
        .wishlists
        .remove_item(customer, product)
        .await
        .expect("remove");
    assert_eq!(view.total_items, 0);

    let err = app
        .state
        .services
        .wishlists
        .remove_item(customer, product)
        .await
        .expect_err("already removed");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn comparison_matrix_carries_product_attributes() {
    let app = TestApp::new().await;
    let category = app.seed_category("Audio").await;
    let cheap = app.seed_product(category, "Earbuds", dec!(25.00)).await;
    let fancy = app.seed_product(category, "Headphones", dec!(150.00)).await;

    // One rated product, one unrated.
    app.state
        .services
        .reviews
        .upsert_review(
            cheap,
            Uuid::new_v4(),
            SubmitReviewInput {
                rating: 4,
                title: "Good value".to_string(),
                comment: "Solid for the price".to_string(),
            },
        )
        .await
        .expect("review");

    let owner = Owner::Session("compare-session".to_string());
    app.state
        .services
        .comparisons
        .add_item(&owner, cheap)
        .await
        .expect("add");
    let view = app
        .state
        .services
        .comparisons
        .add_item(&owner, fancy)
        .await
        .expect("add");

    assert_eq!(view.count, 2);
    let earbuds = view
        .entries
        .iter()
        .find(|e| e.product_id == cheap)
        .expect("earbuds entry");
    assert_eq!(earbuds.price, dec!(25.00));
    assert_eq!(earbuds.category.as_deref(), Some("Audio"));
    assert!(earbuds.in_stock);
    assert_eq!(earbuds.review_count, 1);
    assert!((earbuds.rating_average - 4.0).abs() < f64::EPSILON);

    let headphones = view
        .entries
        .iter()
        .find(|e| e.product_id == fancy)
        .expect("headphones entry");
    assert_eq!(headphones.review_count, 0);
    assert_eq!(headphones.rating_average, 0.0);
}

#[tokio::test]
async fn comparison_duplicates_and_clear() {
    let app = TestApp::new().await;
    let category = app.seed_category("Audio").await;
    let product = app.seed_product(category, "Speaker", dec!(80.00)).await;
    let owner = Owner::Customer(Uuid::new_v4());

    app.state
        .services
        .comparisons
        .add_item(&owner, product)
        .await
        .expect("add");

    let err = app
        .state
        .services
        .comparisons
        .add_item(&owner, product)
        .await
        .expect_err("duplicate");
    assert!(matches!(err, ServiceError::AlreadyExists(_)));

    let view = app
        .state
        .services
        .comparisons
        .clear(&owner)
        .await
        .expect("clear");
    assert_eq!(view.count, 0);
}

#[tokio::test]
async fn customer_and_session_lists_are_independent() {
    let app = TestApp::new().await;
    let category = app.seed_category("Audio").await;
    let product = app.seed_product(category, "Cable", dec!(5.00)).await;

    let customer_owner = Owner::Customer(Uuid::new_v4());
    let session_owner = Owner::Session("other-session".to_string());

    app.state
        .services
        .comparisons
        .add_item(&customer_owner, product)
        .await
        .expect("add");

    let session_view = app
        .state
        .services
        .comparisons
        .get_comparison(&session_owner)
        .await
        .expect("get");
    assert_eq!(session_view.count, 0);
}
