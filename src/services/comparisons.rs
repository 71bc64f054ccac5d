use crate::{
    entities::{
        comparison_item, comparison_list, Category, ComparisonItem, ComparisonList,
        ComparisonListModel, Product, Review,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{catalog::discounted_price, Owner},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// One column of the comparison matrix: the attributes shoppers weigh
/// side by side.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonEntry {
    pub product_id: Uuid,
    pub name: String,
    pub image_path: Option<String>,
    pub price: Decimal,
    pub discounted_price: Decimal,
    pub category: Option<String>,
    pub in_stock: bool,
    pub stock: i32,
    pub has_free_shipping: bool,
    pub is_premium: bool,
    pub limited_edition: bool,
    pub rating_average: f64,
    pub review_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonView {
    pub list: ComparisonListModel,
    pub entries: Vec<ComparisonEntry>,
    pub count: u64,
}

#[derive(Clone)]
pub struct ComparisonService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ComparisonService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn find_list<C: ConnectionTrait>(
        conn: &C,
        owner: &Owner,
    ) -> Result<Option<ComparisonListModel>, ServiceError> {
        let query = match owner {
            Owner::Customer(id) => {
                ComparisonList::find().filter(comparison_list::Column::CustomerId.eq(*id))
            }
            Owner::Session(sid) => {
                ComparisonList::find().filter(comparison_list::Column::SessionId.eq(sid.clone()))
            }
        };
        Ok(query.one(conn).await?)
    }

    async fn get_or_create<C: ConnectionTrait>(
        conn: &C,
        owner: &Owner,
    ) -> Result<ComparisonListModel, ServiceError> {
        if let Some(existing) = Self::find_list(conn, owner).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let fresh = comparison_list::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(owner.customer_id()),
            session_id: Set(owner.session_id().map(str::to_owned)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(fresh.insert(conn).await?)
    }

    /// Adds a product to the owner's comparison list, creating the list
    /// lazily. Duplicates are a typed already-exists error.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        owner: &Owner,
        product_id: Uuid,
    ) -> Result<ComparisonView, ServiceError> {
        let txn = self.db.begin().await?;

        Product::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let list = Self::get_or_create(&txn, owner).await?;

        let duplicate = ComparisonItem::find()
            .filter(comparison_item::Column::ComparisonListId.eq(list.id))
            .filter(comparison_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::AlreadyExists(
                "Product is already being compared".to_string(),
            ));
        }

        let item = comparison_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            comparison_list_id: Set(list.id),
            product_id: Set(product_id),
            added_at: Set(Utc::now()),
        };
        item.insert(&txn).await?;

        let view = Self::load_view(&txn, list).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ComparisonItemAdded {
                list_id: view.list.id,
                product_id,
            })
            .await;

        Ok(view)
    }

    /// Removes one product from the comparison list.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        owner: &Owner,
        product_id: Uuid,
    ) -> Result<ComparisonView, ServiceError> {
        let txn = self.db.begin().await?;

        let list = Self::find_list(&txn, owner)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Comparison list not found".to_string()))?;

        let item = ComparisonItem::find()
            .filter(comparison_item::Column::ComparisonListId.eq(list.id))
            .filter(comparison_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} is not being compared", product_id))
            })?;

        item.delete(&txn).await?;
        let view = Self::load_view(&txn, list).await?;
        txn.commit().await?;
        Ok(view)
    }

    /// Empties the comparison list; the list row stays.
    #[instrument(skip(self))]
    pub async fn clear(&self, owner: &Owner) -> Result<ComparisonView, ServiceError> {
        let txn = self.db.begin().await?;

        let list = Self::find_list(&txn, owner)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Comparison list not found".to_string()))?;

        ComparisonItem::delete_many()
            .filter(comparison_item::Column::ComparisonListId.eq(list.id))
            .exec(&txn)
            .await?;

        let view = Self::load_view(&txn, list).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ComparisonCleared(view.list.id))
            .await;
        Ok(view)
    }

    /// The owner's comparison matrix. An owner with no list gets an empty
    /// one created on the spot.
    #[instrument(skip(self))]
    pub async fn get_comparison(&self, owner: &Owner) -> Result<ComparisonView, ServiceError> {
        let list = Self::get_or_create(&*self.db, owner).await?;
        Self::load_view(&*self.db, list).await
    }

    async fn load_view<C: ConnectionTrait>(
        conn: &C,
        list: ComparisonListModel,
    ) -> Result<ComparisonView, ServiceError> {
        let rows = ComparisonItem::find()
            .filter(comparison_item::Column::ComparisonListId.eq(list.id))
            .order_by_asc(comparison_item::Column::AddedAt)
            .find_also_related(Product)
            .all(conn)
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for (_, product) in rows {
            let Some(product) = product else { continue };

            let category = Category::find_by_id(product.category_id)
                .one(conn)
                .await?
                .map(|c| c.name);

            let ratings: Vec<i32> = Review::find()
                .filter(crate::entities::review::Column::ProductId.eq(product.id))
                .all(conn)
                .await?
                .into_iter()
                .map(|r| r.rating)
                .collect();
            let review_count = ratings.len() as u64;
            let rating_average = if ratings.is_empty() {
                0.0
            } else {
                ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / review_count as f64
            };

            entries.push(ComparisonEntry {
                product_id: product.id,
                name: product.name.clone(),
                image_path: product.image_path.clone(),
                price: product.price,
                discounted_price: discounted_price(&product),
                category,
                in_stock: product.stock > 0 && product.available,
                stock: product.stock,
                has_free_shipping: product.has_free_shipping,
                is_premium: product.is_premium,
                limited_edition: product.limited_edition,
                rating_average,
                review_count,
            });
        }

        let count = entries.len() as u64;
        Ok(ComparisonView {
            list,
            entries,
            count,
        })
    }
}
