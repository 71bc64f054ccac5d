#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use storefront_api::{
    config::AppConfig,
    db,
    entities::{category, coupon, product, DiscountType},
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Test harness: application state backed by a throwaway SQLite database.
/// Every `TestApp` gets its own database file, so tests stay independent.
pub struct TestApp {
    pub state: AppState,
    db_file: std::path::PathBuf,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_file = std::env::temp_dir().join(format!("storefront_test_{}.db", Uuid::new_v4()));

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::build(db_arc.clone(), event_sender.clone(), &cfg);

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        Self {
            state,
            db_file,
            _event_task: event_task,
        }
    }

    /// Insert a category fixture.
    pub async fn seed_category(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        let row = category::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            description: Set(format!("{name} products")),
        };
        row.insert(&*self.state.db)
            .await
            .expect("failed to seed category");
        id
    }

    /// Insert an available product fixture with the given price.
    pub async fn seed_product(&self, category_id: Uuid, name: &str, price: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let row = product::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            description: Set(format!("{name} description")),
            price: Set(price),
            category_id: Set(category_id),
            image_path: Set(None),
            stock: Set(25),
            available: Set(true),
            featured: Set(false),
            is_premium: Set(false),
            discount_percentage: Set(Decimal::ZERO),
            has_free_shipping: Set(false),
            limited_edition: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };
        row.insert(&*self.state.db)
            .await
            .expect("failed to seed product");
        id
    }

    /// Insert a coupon fixture valid for the next 24 hours.
    pub async fn seed_coupon(
        &self,
        code: &str,
        discount_type: DiscountType,
        value: Decimal,
        max_uses: i32,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let row = coupon::ActiveModel {
            id: Set(id),
            code: Set(code.to_uppercase()),
            valid_from: Set(now - Duration::hours(1)),
            valid_to: Set(now + Duration::hours(24)),
            discount_type: Set(discount_type),
            discount_value: Set(value),
            active: Set(true),
            max_uses: Set(max_uses),
            current_uses: Set(0),
            min_order_value: Set(Decimal::ZERO),
            created_at: Set(now),
        };
        row.insert(&*self.state.db)
            .await
            .expect("failed to seed coupon");
        id
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_file);
    }
}
