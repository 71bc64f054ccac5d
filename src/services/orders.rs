use crate::{
    entities::{
        cart_item, order, order_item, CartItem, Order, OrderItem, OrderItemModel, OrderModel,
        OrderStatus, PaymentMethod, Product,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{cart::CartService, coupons, Owner},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Checkout form: contact and shipping details plus an optional coupon code.
/// The coupon travels with the request, never through ambient session state.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 250))]
    pub address: String,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
}

/// What happened to the coupon code supplied at checkout. Dropping a coupon
/// is never fatal to placement; the order simply prices without it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CouponOutcome {
    NotRequested,
    Applied { code: String, discount: Decimal },
    Dropped { code: String, reason: String },
}

/// Result of a successful placement.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
    pub coupon: CouponOutcome,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Converts the customer's cart into a pending order.
    ///
    /// Runs entirely in one transaction: recompute the cart total from live
    /// product prices, resolve and apply the coupon (guarded usage increment;
    /// failure drops the coupon), insert the order and its price-snapshot
    /// items, record the coupon use, and delete the cart items. The cart row
    /// itself is kept. Any persistence error rolls everything back.
    #[instrument(skip(self, request))]
    pub async fn place_order(
        &self,
        customer_id: Uuid,
        request: CheckoutRequest,
    ) -> Result<PlacedOrder, ServiceError> {
        request.validate()?;

        let txn = self.db.begin().await?;
        let owner = Owner::Customer(customer_id);

        let cart = CartService::find_cart(&txn, &owner)
            .await?
            .ok_or_else(|| ServiceError::InvalidOperation("Cart is empty".to_string()))?;

        let cart_lines = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(Product)
            .all(&txn)
            .await?;

        if cart_lines.is_empty() {
            return Err(ServiceError::InvalidOperation("Cart is empty".to_string()));
        }

        // Live prices, not whatever the cart was shown earlier.
        let mut priced_lines = Vec::with_capacity(cart_lines.len());
        let mut subtotal = Decimal::ZERO;
        for (item, product) in cart_lines {
            let product = product.ok_or_else(|| {
                ServiceError::InvalidOperation(format!(
                    "Product {} is no longer available",
                    item.product_id
                ))
            })?;
            subtotal += product.price * Decimal::from(item.quantity);
            priced_lines.push((item, product));
        }

        let (coupon_id, discount, coupon_outcome) = self
            .resolve_coupon(&txn, request.coupon_code.as_deref(), subtotal)
            .await?;

        let total = subtotal - discount;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let new_order = order::ActiveModel {
            id: Set(order_id),
            customer_id: Set(customer_id),
            first_name: Set(request.first_name),
            last_name: Set(request.last_name),
            email: Set(request.email),
            address: Set(request.address),
            postal_code: Set(request.postal_code),
            city: Set(request.city),
            country: Set(request.country),
            phone: Set(request.phone),
            notes: Set(request.notes),
            payment_method: Set(request.payment_method),
            status: Set(OrderStatus::Pending),
            coupon_id: Set(coupon_id),
            subtotal_price: Set(subtotal),
            discount_amount: Set(discount),
            total_price: Set(total),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let order = new_order.insert(&txn).await?;

        let mut items = Vec::with_capacity(priced_lines.len());
        for (cart_line, product) in &priced_lines {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                price: Set(product.price),
                quantity: Set(cart_line.quantity),
            };
            items.push(item.insert(&txn).await?);
        }

        if let Some(coupon_id) = coupon_id {
            coupons::record_use(&txn, coupon_id, customer_id, Some(order_id), discount).await?;
        }

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender.send_or_log(Event::OrderPlaced(order_id)).await;
        if let Some(coupon_id) = coupon_id {
            self.event_sender
                .send_or_log(Event::CouponApplied {
                    coupon_id,
                    order_id,
                })
                .await;
        }
        if let CouponOutcome::Dropped { code, reason } = &coupon_outcome {
            self.event_sender
                .send_or_log(Event::CouponDropped {
                    code: code.clone(),
                    reason: reason.clone(),
                })
                .await;
        }

        info!(order_id = %order_id, customer_id = %customer_id, %total, "order placed");

        Ok(PlacedOrder {
            order,
            items,
            coupon: coupon_outcome,
        })
    }

    /// Resolves a coupon code inside the placement transaction. Returns the
    /// applied coupon id, the discount, and the outcome to report. Every
    /// failure path downgrades to a dropped coupon rather than an error.
    async fn resolve_coupon(
        &self,
        txn: &DatabaseTransaction,
        code: Option<&str>,
        cart_total: Decimal,
    ) -> Result<(Option<Uuid>, Decimal, CouponOutcome), ServiceError> {
        let Some(code) = code.filter(|c| !c.trim().is_empty()) else {
            return Ok((None, Decimal::ZERO, CouponOutcome::NotRequested));
        };

        let Some(coupon) = coupons::find_by_code(txn, code).await? else {
            warn!(code, "unknown coupon code at checkout");
            return Ok((
                None,
                Decimal::ZERO,
                CouponOutcome::Dropped {
                    code: code.to_string(),
                    reason: "unknown code".to_string(),
                },
            ));
        };

        let discount = coupons::coupon_discount(&coupon, cart_total, Utc::now());
        if discount <= Decimal::ZERO {
            return Ok((
                None,
                Decimal::ZERO,
                CouponOutcome::Dropped {
                    code: coupon.code,
                    reason: "coupon not applicable to this order".to_string(),
                },
            ));
        }

        // Guarded increment: zero rows means a concurrent checkout consumed
        // the last use, so the coupon is dropped here too.
        if !coupons::try_consume_use(txn, coupon.id).await? {
            return Ok((
                None,
                Decimal::ZERO,
                CouponOutcome::Dropped {
                    code: coupon.code,
                    reason: "usage limit reached".to_string(),
                },
            ));
        }

        Ok((
            Some(coupon.id),
            discount,
            CouponOutcome::Applied {
                code: coupon.code,
                discount,
            },
        ))
    }

    /// Fetches one order with its items, scoped to the owning customer.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
    ) -> Result<(OrderModel, Vec<OrderItemModel>), ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .filter(|o| o.customer_id == customer_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        Ok((order, items))
    }

    /// Lists a customer's orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        customer_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    /// Customer-initiated cancellation. Only pending orders qualify; anything
    /// further along is a typed business-rule error, not a silent no-op.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .filter(|o| o.customer_id == customer_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "Order in status {} cannot be cancelled",
                order.status.as_str()
            )));
        }

        let updated = Self::write_status(&txn, order, OrderStatus::Cancelled).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCancelled(order_id))
            .await;
        Ok(updated)
    }

    /// Moves an order along the status machine. Invalid transitions are
    /// rejected without touching the row.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if !order.status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot transition order from {} to {}",
                order.status.as_str(),
                new_status.as_str()
            )));
        }

        let old_status = order.status;
        let updated = Self::write_status(&txn, order, new_status).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.as_str().to_string(),
                new_status: new_status.as_str().to_string(),
            })
            .await;
        Ok(updated)
    }

    /// Re-derives order totals from its items and stored coupon, preserving
    /// `total = subtotal - discount`. The coupon is re-checked for validity;
    /// a coupon that has since lapsed contributes nothing.
    #[instrument(skip(self))]
    pub async fn recompute_totals(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;

        let subtotal: Decimal = items.iter().map(OrderItemModel::cost).sum();

        let discount = match order.coupon_id {
            Some(coupon_id) => {
                let coupon = crate::entities::Coupon::find_by_id(coupon_id).one(&txn).await?;
                coupon
                    .map(|c| coupons::coupon_discount(&c, subtotal, Utc::now()))
                    .unwrap_or(Decimal::ZERO)
            }
            None => Decimal::ZERO,
        };

        let mut active: order::ActiveModel = order.into();
        active.subtotal_price = Set(subtotal);
        active.discount_amount = Set(discount);
        active.total_price = Set(subtotal - discount);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    async fn write_status(
        txn: &DatabaseTransaction,
        order: OrderModel,
        status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let mut active: order::ActiveModel = order.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        Ok(active.update(txn).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_orders_can_start_processing_or_cancel() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn shipped_orders_only_deliver() {
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn terminal_states_admit_no_transitions() {
        for next in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert!(!OrderStatus::Delivered.can_transition_to(next));
            assert!(!OrderStatus::Cancelled.can_transition_to(next));
        }
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
    }
}
