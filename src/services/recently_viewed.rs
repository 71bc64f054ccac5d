use crate::{
    entities::{recently_viewed, Product, ProductModel, RecentlyViewed},
    errors::ServiceError,
    services::is_unique_violation,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// At most this many products are remembered per customer; older views fall
/// off the end.
pub const RECENTLY_VIEWED_CAP: u64 = 10;

#[derive(Clone)]
pub struct RecentlyViewedService {
    db: Arc<DatabaseConnection>,
}

impl RecentlyViewedService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records that a customer looked at a product. A repeat view bumps the
    /// existing record to the front; the per-customer list is then trimmed to
    /// the cap, oldest first.
    #[instrument(skip(self))]
    pub async fn record_view(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        Product::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        Self::upsert_view(&txn, customer_id, product_id).await?;

        let rows = RecentlyViewed::find()
            .filter(recently_viewed::Column::CustomerId.eq(customer_id))
            .order_by_desc(recently_viewed::Column::ViewedAt)
            .all(&txn)
            .await?;
        for stale in rows.into_iter().skip(RECENTLY_VIEWED_CAP as usize) {
            stale.delete(&txn).await?;
        }

        txn.commit().await?;

        info!(customer_id = %customer_id, product_id = %product_id, "product view recorded");
        Ok(())
    }

    /// The customer's recently viewed products, newest first, capped.
    /// Products deleted from the catalog since the view are skipped.
    #[instrument(skip(self))]
    pub async fn recent_products(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<ProductModel>, ServiceError> {
        let rows = RecentlyViewed::find()
            .filter(recently_viewed::Column::CustomerId.eq(customer_id))
            .order_by_desc(recently_viewed::Column::ViewedAt)
            .limit(RECENTLY_VIEWED_CAP)
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        Ok(rows.into_iter().filter_map(|(_, product)| product).collect())
    }

    async fn upsert_view<C: ConnectionTrait>(
        conn: &C,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        let existing = RecentlyViewed::find()
            .filter(recently_viewed::Column::CustomerId.eq(customer_id))
            .filter(recently_viewed::Column::ProductId.eq(product_id))
            .one(conn)
            .await?;

        let now = Utc::now();
        if let Some(row) = existing {
            let mut active: recently_viewed::ActiveModel = row.into();
            active.viewed_at = Set(now);
            active.update(conn).await?;
            return Ok(());
        }

        let fresh = recently_viewed::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            product_id: Set(product_id),
            viewed_at: Set(now),
        };
        match fresh.insert(conn).await {
            Ok(_) => Ok(()),
            // A concurrent view of the same product won the insert; bump it.
            Err(err) if is_unique_violation(&err) => {
                let row = RecentlyViewed::find()
                    .filter(recently_viewed::Column::CustomerId.eq(customer_id))
                    .filter(recently_viewed::Column::ProductId.eq(product_id))
                    .one(conn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError(
                            "View record vanished after conflict".to_string(),
                        )
                    })?;
                let mut active: recently_viewed::ActiveModel = row.into();
                active.viewed_at = Set(Utc::now());
                active.update(conn).await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
