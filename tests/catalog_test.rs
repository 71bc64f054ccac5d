mod common;

use chrono::Utc;
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use storefront_api::{
    entities::product,
    errors::ServiceError,
    services::catalog::{ProductQuery, ProductSort},
};
use uuid::Uuid;

async fn seed_custom_product(
    app: &TestApp,
    category_id: Uuid,
    name: &str,
    price: Decimal,
    featured: bool,
    available: bool,
    discount_percentage: Decimal,
) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let row = product::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        description: Set(format!("{name} description")),
        price: Set(price),
        category_id: Set(category_id),
        image_path: Set(None),
        stock: Set(5),
        available: Set(available),
        featured: Set(featured),
        is_premium: Set(false),
        discount_percentage: Set(discount_percentage),
        has_free_shipping: Set(false),
        limited_edition: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    };
    row.insert(&*app.state.db).await.expect("seed product");
    id
}

#[tokio::test]
async fn listing_hides_unavailable_products_by_default() {
    let app = TestApp::new().await;
    let category = app.seed_category("Shoes").await;
    seed_custom_product(&app, category, "Boots", dec!(90.00), false, true, dec!(0)).await;
    seed_custom_product(&app, category, "Sandals", dec!(30.00), false, false, dec!(0)).await;

    let listing = app
        .state
        .services
        .catalog
        .list_products(ProductQuery::default())
        .await
        .expect("list");
    assert_eq!(listing.total, 1);
    assert_eq!(listing.products[0].product.name, "Boots");

    let listing = app
        .state
        .services
        .catalog
        .list_products(ProductQuery {
            available_only: Some(false),
            ..Default::default()
        })
        .await
        .expect("list all");
    assert_eq!(listing.total, 2);
}

#[tokio::test]
async fn search_matches_name_and_description() {
    let app = TestApp::new().await;
    let category = app.seed_category("Shoes").await;
    seed_custom_product(&app, category, "Trail Runner", dec!(80.00), false, true, dec!(0)).await;
    seed_custom_product(&app, category, "Loafer", dec!(60.00), false, true, dec!(0)).await;

    let listing = app
        .state
        .services
        .catalog
        .list_products(ProductQuery {
            search: Some("trail".to_string()),
            ..Default::default()
        })
        .await
        .expect("search");
    assert_eq!(listing.total, 1);
    assert_eq!(listing.products[0].product.name, "Trail Runner");
}

#[tokio::test]
async fn price_sort_and_pagination() {
    let app = TestApp::new().await;
    let category = app.seed_category("Shoes").await;
    for (name, price) in [("A", dec!(30.00)), ("B", dec!(10.00)), ("C", dec!(20.00))] {
        seed_custom_product(&app, category, name, price, false, true, dec!(0)).await;
    }

    let listing = app
        .state
        .services
        .catalog
        .list_products(ProductQuery {
            sort: ProductSort::PriceAsc,
            per_page: Some(2),
            page: Some(1),
            ..Default::default()
        })
        .await
        .expect("sorted page");

    assert_eq!(listing.total, 3);
    assert_eq!(listing.products.len(), 2);
    assert_eq!(listing.products[0].product.price, dec!(10.00));
    assert_eq!(listing.products[1].product.price, dec!(20.00));

    let page2 = app
        .state
        .services
        .catalog
        .list_products(ProductQuery {
            sort: ProductSort::PriceAsc,
            per_page: Some(2),
            page: Some(2),
            ..Default::default()
        })
        .await
        .expect("page 2");
    assert_eq!(page2.products.len(), 1);
    assert_eq!(page2.products[0].product.price, dec!(30.00));
}

#[tokio::test]
async fn featured_listing_and_product_discount() {
    let app = TestApp::new().await;
    let category = app.seed_category("Shoes").await;
    let featured = seed_custom_product(
        &app,
        category,
        "Limited Sneaker",
        dec!(200.00),
        true,
        true,
        dec!(25),
    )
    .await;
    seed_custom_product(&app, category, "Plain Shoe", dec!(50.00), false, true, dec!(0)).await;

    let products = app
        .state
        .services
        .catalog
        .featured_products(8)
        .await
        .expect("featured");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].product.id, featured);
    assert_eq!(products[0].discounted_price, dec!(150.00));
}

#[tokio::test]
async fn product_detail_includes_category_and_ratings() {
    let app = TestApp::new().await;
    let category = app.seed_category("Shoes").await;
    let product = app.seed_product(category, "Oxford", dec!(120.00)).await;

    let detail = app
        .state
        .services
        .catalog
        .get_product(product)
        .await
        .expect("detail");
    assert_eq!(detail.category.as_ref().map(|c| c.name.as_str()), Some("Shoes"));
    assert_eq!(detail.ratings.count, 0);

    let err = app
        .state
        .services
        .catalog
        .get_product(Uuid::new_v4())
        .await
        .expect_err("unknown product");
    assert!(matches!(err, ServiceError::NotFound(_)));
}
