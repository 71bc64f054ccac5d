mod common;

use chrono::Utc;
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DbErr, EntityTrait, PaginatorTrait, Set};
use storefront_api::{
    entities::{cart_item, Cart, Product},
    errors::ServiceError,
    services::{cart::QuantityChange, is_unique_violation, Owner},
};
use uuid::Uuid;

#[tokio::test]
async fn first_add_creates_the_cart_lazily() {
    let app = TestApp::new().await;
    let category = app.seed_category("Books").await;
    let product = app.seed_product(category, "Atlas", dec!(15.00)).await;

    let owner = Owner::Customer(Uuid::new_v4());
    assert!(app
        .state
        .services
        .carts
        .get_cart(&owner)
        .await
        .expect("lookup")
        .is_none());

    let view = app
        .state
        .services
        .carts
        .add_item(&owner, product, QuantityChange::Increment)
        .await
        .expect("add item");

    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.total_items, 1);
    assert_eq!(view.total_price, dec!(15.00));

    let count = Cart::find().count(&*app.state.db).await.expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn increment_and_set_change_quantity_differently() {
    let app = TestApp::new().await;
    let category = app.seed_category("Books").await;
    let product = app.seed_product(category, "Dictionary", dec!(8.00)).await;
    let owner = Owner::Session("anon-session-1".to_string());

    app.state
        .services
        .carts
        .add_item(&owner, product, QuantityChange::Increment)
        .await
        .expect("add");
    let view = app
        .state
        .services
        .carts
        .add_item(&owner, product, QuantityChange::Increment)
        .await
        .expect("add again");
    assert_eq!(view.lines[0].item.quantity, 2);

    // An explicit quantity overwrites, it does not accumulate.
    let view = app
        .state
        .services
        .carts
        .add_item(&owner, product, QuantityChange::Set(5))
        .await
        .expect("set quantity");
    assert_eq!(view.lines[0].item.quantity, 5);
    assert_eq!(view.total_items, 5);
    assert_eq!(view.total_price, dec!(40.00));
}

#[tokio::test]
async fn totals_follow_live_product_prices() {
    let app = TestApp::new().await;
    let category = app.seed_category("Food").await;
    let tea = app.seed_product(category, "Tea", dec!(4.50)).await;
    let pot = app.seed_product(category, "Teapot", dec!(21.00)).await;
    let owner = Owner::Customer(Uuid::new_v4());

    app.state
        .services
        .carts
        .add_item(&owner, tea, QuantityChange::Set(3))
        .await
        .expect("add tea");
    let view = app
        .state
        .services
        .carts
        .add_item(&owner, pot, QuantityChange::Set(1))
        .await
        .expect("add pot");

    assert_eq!(view.total_items, 4);
    assert_eq!(view.total_price, dec!(34.50));
}

#[tokio::test]
async fn adding_an_unknown_product_fails() {
    let app = TestApp::new().await;
    let owner = Owner::Customer(Uuid::new_v4());

    let err = app
        .state
        .services
        .carts
        .add_item(&owner, Uuid::new_v4(), QuantityChange::Increment)
        .await
        .expect_err("unknown product");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let app = TestApp::new().await;
    let category = app.seed_category("Books").await;
    let product = app.seed_product(category, "Zine", dec!(2.00)).await;
    let owner = Owner::Customer(Uuid::new_v4());

    let err = app
        .state
        .services
        .carts
        .add_item(&owner, product, QuantityChange::Set(0))
        .await
        .expect_err("zero quantity");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn removing_a_missing_line_is_not_found() {
    let app = TestApp::new().await;
    let category = app.seed_category("Books").await;
    let in_cart = app.seed_product(category, "Primer", dec!(3.00)).await;
    let never_added = app.seed_product(category, "Reader", dec!(3.00)).await;
    let owner = Owner::Customer(Uuid::new_v4());

    app.state
        .services
        .carts
        .add_item(&owner, in_cart, QuantityChange::Increment)
        .await
        .expect("add");

    let err = app
        .state
        .services
        .carts
        .remove_item(&owner, never_added)
        .await
        .expect_err("missing line");
    assert!(matches!(err, ServiceError::NotFound(_)));

    let view = app
        .state
        .services
        .carts
        .remove_item(&owner, in_cart)
        .await
        .expect("remove");
    assert!(view.lines.is_empty());
    assert_eq!(view.total_price, dec!(0));
}

#[tokio::test]
async fn clear_empties_lines_and_keeps_the_cart() {
    let app = TestApp::new().await;
    let category = app.seed_category("Books").await;
    let product = app.seed_product(category, "Folio", dec!(60.00)).await;
    let owner = Owner::Session("anon-clear".to_string());

    app.state
        .services
        .carts
        .add_item(&owner, product, QuantityChange::Set(2))
        .await
        .expect("add");
    let view = app.state.services.carts.clear(&owner).await.expect("clear");

    assert!(view.lines.is_empty());
    assert_eq!(view.total_items, 0);

    let count = Cart::find().count(&*app.state.db).await.expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn wishlist_contents_move_into_the_cart() {
    let app = TestApp::new().await;
    let category = app.seed_category("Gifts").await;
    let first = app.seed_product(category, "Candle", dec!(6.00)).await;
    let second = app.seed_product(category, "Card", dec!(2.00)).await;

    let customer = Uuid::new_v4();
    app.state
        .services
        .wishlists
        .add_item(customer, first)
        .await
        .expect("wishlist add");
    app.state
        .services
        .wishlists
        .add_item(customer, second)
        .await
        .expect("wishlist add");

    let added = app
        .state
        .services
        .carts
        .add_wishlist_to_cart(customer)
        .await
        .expect("move to cart");
    assert_eq!(added, 2);

    let view = app
        .state
        .services
        .carts
        .get_cart(&Owner::Customer(customer))
        .await
        .expect("load cart")
        .expect("cart exists");
    assert_eq!(view.total_items, 2);
    assert_eq!(view.total_price, dec!(8.00));
}

#[tokio::test]
async fn wishlist_move_skips_deleted_products_without_partial_state() {
    let app = TestApp::new().await;
    let category = app.seed_category("Gifts").await;
    let candle = app.seed_product(category, "Candle", dec!(6.00)).await;
    let card = app.seed_product(category, "Card", dec!(2.00)).await;
    let discontinued = app.seed_product(category, "Snow Globe", dec!(4.00)).await;

    let customer = Uuid::new_v4();
    for product in [candle, discontinued, card] {
        app.state
            .services
            .wishlists
            .add_item(customer, product)
            .await
            .expect("wishlist add");
    }

    Product::delete_by_id(discontinued)
        .exec(&*app.state.db)
        .await
        .expect("remove product from catalog");

    let added = app
        .state
        .services
        .carts
        .add_wishlist_to_cart(customer)
        .await
        .expect("move to cart");
    assert_eq!(added, 2);

    let view = app
        .state
        .services
        .carts
        .get_cart(&Owner::Customer(customer))
        .await
        .expect("load cart")
        .expect("cart exists");
    assert_eq!(view.lines.len(), 2);
    assert!(view.lines.iter().all(|line| line.item.quantity == 1));
    assert_eq!(view.total_price, dec!(8.00));
}

#[tokio::test]
async fn duplicate_line_insert_is_classified_as_unique_violation() {
    let app = TestApp::new().await;
    let category = app.seed_category("Books").await;
    let product = app.seed_product(category, "Almanac", dec!(12.00)).await;
    let owner = Owner::Customer(Uuid::new_v4());

    let view = app
        .state
        .services
        .carts
        .add_item(&owner, product, QuantityChange::Increment)
        .await
        .expect("add");

    // Simulates the losing side of two identical concurrent adds.
    let now = Utc::now();
    let dup = cart_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        cart_id: Set(view.cart.id),
        product_id: Set(product),
        quantity: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let err = dup
        .insert(&*app.state.db)
        .await
        .expect_err("unique index must reject the duplicate line");

    assert!(is_unique_violation(&err));
    assert!(!is_unique_violation(&DbErr::Custom("boom".to_string())));
}
