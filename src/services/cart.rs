use crate::{
    entities::{
        cart, cart_item, wishlist, wishlist_item, Cart, CartItem, CartItemModel, CartModel,
        Product, ProductModel, Wishlist, WishlistItem,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{is_unique_violation, Owner},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, ModelTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// How `add_item` changes an existing line's quantity: overwrite it with an
/// explicit value, or bump it by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    Set(i32),
    Increment,
}

/// One cart line joined with its product and priced at the live price.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub item: CartItemModel,
    pub product: ProductModel,
    pub line_total: Decimal,
}

/// Full cart view: lines plus derived totals.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart: CartModel,
    pub lines: Vec<CartLine>,
    pub total_items: i64,
    pub total_price: Decimal,
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Finds the owner's cart, if one exists.
    pub async fn find_cart<C: ConnectionTrait>(
        conn: &C,
        owner: &Owner,
    ) -> Result<Option<CartModel>, ServiceError> {
        let query = match owner {
            Owner::Customer(id) => Cart::find().filter(cart::Column::CustomerId.eq(*id)),
            Owner::Session(sid) => Cart::find().filter(cart::Column::SessionId.eq(sid.clone())),
        };
        Ok(query.one(conn).await?)
    }

    /// Explicit get-or-create: look the cart up, insert on the miss branch.
    pub async fn get_or_create_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner: &Owner,
    ) -> Result<CartModel, ServiceError> {
        if let Some(existing) = Self::find_cart(conn, owner).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let new_cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(owner.customer_id()),
            session_id: Set(owner.session_id().map(str::to_owned)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = new_cart.insert(conn).await?;

        self.event_sender
            .send_or_log(Event::CartCreated(created.id))
            .await;
        Ok(created)
    }

    /// Adds a product to the owner's cart, creating the cart lazily. The
    /// product must exist; stock is not checked here.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        owner: &Owner,
        product_id: Uuid,
        change: QuantityChange,
    ) -> Result<CartView, ServiceError> {
        if let QuantityChange::Set(q) = change {
            if q < 1 {
                return Err(ServiceError::ValidationError(
                    "Quantity must be at least 1".to_string(),
                ));
            }
        }

        let txn = self.db.begin().await?;

        Product::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let cart = self.get_or_create_cart(&txn, owner).await?;
        Self::upsert_line(&txn, cart.id, product_id, change).await?;
        Self::touch_cart(&txn, &cart).await?;
        let view = Self::load_view(&txn, cart.id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: view.cart.id,
                product_id,
            })
            .await;

        Ok(view)
    }

    /// Removes a line from the owner's cart. Missing cart or line is a
    /// not-found error.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        owner: &Owner,
        product_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Self::find_cart(&txn, owner)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;

        let item = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} is not in the cart", product_id))
            })?;

        item.delete(&txn).await?;
        Self::touch_cart(&txn, &cart).await?;
        let view = Self::load_view(&txn, cart.id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id: view.cart.id,
                product_id,
            })
            .await;

        Ok(view)
    }

    /// Deletes every line in the owner's cart; the cart row stays.
    #[instrument(skip(self))]
    pub async fn clear(&self, owner: &Owner) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Self::find_cart(&txn, owner)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;

        Self::touch_cart(&txn, &cart).await?;
        let view = Self::load_view(&txn, cart.id).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartCleared(view.cart.id))
            .await;

        Ok(view)
    }

    /// Returns the owner's cart with lines and totals. An owner who has never
    /// added anything gets an empty view without a cart being created.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, owner: &Owner) -> Result<Option<CartView>, ServiceError> {
        let cart = match Self::find_cart(&*self.db, owner).await? {
            Some(cart) => cart,
            None => return Ok(None),
        };
        let view = Self::load_view(&*self.db, cart.id).await?;
        Ok(Some(view))
    }

    /// Moves every wishlist product into the cart, one unit each, in a single
    /// transaction. Wishlist entries whose product has been deleted from the
    /// catalog are skipped. Returns how many products were added or bumped.
    #[instrument(skip(self))]
    pub async fn add_wishlist_to_cart(&self, customer_id: Uuid) -> Result<usize, ServiceError> {
        let txn = self.db.begin().await?;

        let wishlist = Wishlist::find()
            .filter(wishlist::Column::CustomerId.eq(customer_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Wishlist not found".to_string()))?;

        let entries = WishlistItem::find()
            .filter(wishlist_item::Column::WishlistId.eq(wishlist.id))
            .find_also_related(Product)
            .all(&txn)
            .await?;

        let owner = Owner::Customer(customer_id);
        let cart = self.get_or_create_cart(&txn, &owner).await?;

        let mut moved = Vec::new();
        for (entry, product) in entries {
            if product.is_none() {
                continue;
            }
            Self::upsert_line(&txn, cart.id, entry.product_id, QuantityChange::Increment).await?;
            moved.push(entry.product_id);
        }

        if !moved.is_empty() {
            Self::touch_cart(&txn, &cart).await?;
        }
        txn.commit().await?;

        for product_id in &moved {
            self.event_sender
                .send_or_log(Event::CartItemAdded {
                    cart_id: cart.id,
                    product_id: *product_id,
                })
                .await;
        }

        info!(customer_id = %customer_id, added = moved.len(), "moved wishlist into cart");
        Ok(moved.len())
    }

    /// Creates or adjusts one cart line. If a concurrent request inserted the
    /// same line first, the unique index rejects the insert and we retry as an
    /// update.
    async fn upsert_line<C: ConnectionTrait>(
        conn: &C,
        cart_id: Uuid,
        product_id: Uuid,
        change: QuantityChange,
    ) -> Result<(), ServiceError> {
        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(conn)
            .await?;

        let now = Utc::now();
        if let Some(item) = existing {
            return Self::update_line(conn, item, change).await;
        }

        let quantity = match change {
            QuantityChange::Set(q) => q,
            QuantityChange::Increment => 1,
        };
        let fresh = cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            created_at: Set(now),
            updated_at: Set(now),
        };
        match fresh.insert(conn).await {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                let item = CartItem::find()
                    .filter(cart_item::Column::CartId.eq(cart_id))
                    .filter(cart_item::Column::ProductId.eq(product_id))
                    .one(conn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError("Cart line vanished after conflict".to_string())
                    })?;
                Self::update_line(conn, item, change).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update_line<C: ConnectionTrait>(
        conn: &C,
        item: CartItemModel,
        change: QuantityChange,
    ) -> Result<(), ServiceError> {
        let new_quantity = match change {
            QuantityChange::Set(q) => q,
            QuantityChange::Increment => item.quantity + 1,
        };
        let mut active: cart_item::ActiveModel = item.into();
        active.quantity = Set(new_quantity);
        active.updated_at = Set(Utc::now());
        active.update(conn).await?;
        Ok(())
    }

    async fn touch_cart(txn: &DatabaseTransaction, cart: &CartModel) -> Result<(), ServiceError> {
        let mut active: cart::ActiveModel = cart.clone().into();
        active.updated_at = Set(Utc::now());
        active.update(txn).await?;
        Ok(())
    }

    /// Joins cart lines with live products and derives totals. Lines whose
    /// product has been deleted from the catalog are skipped.
    pub async fn load_view<C: ConnectionTrait>(
        conn: &C,
        cart_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .find_also_related(Product)
            .all(conn)
            .await?;

        let mut lines = Vec::with_capacity(rows.len());
        let mut total_items: i64 = 0;
        let mut total_price = Decimal::ZERO;

        for (item, product) in rows {
            let Some(product) = product else { continue };
            let line_total = product.price * Decimal::from(item.quantity);
            total_items += i64::from(item.quantity);
            total_price += line_total;
            lines.push(CartLine {
                item,
                product,
                line_total,
            });
        }

        Ok(CartView {
            cart,
            lines,
            total_items,
            total_price,
        })
    }
}
