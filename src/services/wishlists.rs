use crate::{
    entities::{
        wishlist, wishlist_item, Product, ProductModel, Wishlist, WishlistItem, WishlistItemModel,
        WishlistModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::catalog::discounted_price,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct WishlistEntry {
    pub item: WishlistItemModel,
    pub product: ProductModel,
    pub discounted_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct WishlistView {
    pub wishlist: WishlistModel,
    pub entries: Vec<WishlistEntry>,
    pub total_items: u64,
}

#[derive(Clone)]
pub struct WishlistService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl WishlistService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// One wishlist per customer, created lazily.
    pub async fn get_or_create<C: ConnectionTrait>(
        conn: &C,
        customer_id: Uuid,
    ) -> Result<WishlistModel, ServiceError> {
        let existing = Wishlist::find()
            .filter(wishlist::Column::CustomerId.eq(customer_id))
            .one(conn)
            .await?;

        if let Some(found) = existing {
            return Ok(found);
        }

        let now = Utc::now();
        let fresh = wishlist::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(fresh.insert(conn).await?)
    }

    /// Adds a product to the customer's wishlist. Products are unique per
    /// wishlist; adding one twice is a typed already-exists error.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<WishlistView, ServiceError> {
        let txn = self.db.begin().await?;

        Product::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let wishlist = Self::get_or_create(&txn, customer_id).await?;

        let duplicate = WishlistItem::find()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist.id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::AlreadyExists(
                "Product is already on the wishlist".to_string(),
            ));
        }

        let item = wishlist_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            wishlist_id: Set(wishlist.id),
            product_id: Set(product_id),
            added_at: Set(Utc::now()),
        };
        item.insert(&txn).await?;

        let view = Self::load_view(&txn, wishlist).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::WishlistItemAdded {
                wishlist_id: view.wishlist.id,
                product_id,
            })
            .await;

        Ok(view)
    }

    /// Removes a product from the customer's wishlist.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<WishlistView, ServiceError> {
        let txn = self.db.begin().await?;

        let wishlist = Wishlist::find()
            .filter(wishlist::Column::CustomerId.eq(customer_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Wishlist not found".to_string()))?;

        let item = WishlistItem::find()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist.id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} is not on the wishlist", product_id))
            })?;

        item.delete(&txn).await?;

        let view = Self::load_view(&txn, wishlist).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::WishlistItemRemoved {
                wishlist_id: view.wishlist.id,
                product_id,
            })
            .await;

        Ok(view)
    }

    /// The customer's wishlist with product details. Creates the (empty)
    /// wishlist on first access.
    #[instrument(skip(self))]
    pub async fn get_wishlist(&self, customer_id: Uuid) -> Result<WishlistView, ServiceError> {
        let wishlist = Self::get_or_create(&*self.db, customer_id).await?;
        let view = Self::load_view(&*self.db, wishlist).await?;
        info!(customer_id = %customer_id, items = view.total_items, "loaded wishlist");
        Ok(view)
    }

    async fn load_view<C: ConnectionTrait>(
        conn: &C,
        wishlist: WishlistModel,
    ) -> Result<WishlistView, ServiceError> {
        let rows = WishlistItem::find()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist.id))
            .order_by_desc(wishlist_item::Column::AddedAt)
            .find_also_related(Product)
            .all(conn)
            .await?;

        let entries: Vec<WishlistEntry> = rows
            .into_iter()
            .filter_map(|(item, product)| {
                let product = product?;
                let discounted = discounted_price(&product);
                Some(WishlistEntry {
                    item,
                    product,
                    discounted_price: discounted,
                })
            })
            .collect();

        let total_items = entries.len() as u64;
        Ok(WishlistView {
            wishlist,
            entries,
            total_items,
        })
    }
}
