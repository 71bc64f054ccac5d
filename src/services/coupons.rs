use crate::{
    entities::{coupon, coupon_use, Coupon, CouponModel, DiscountType},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

const PERCENT_BASE: Decimal = Decimal::ONE_HUNDRED;

/// Whether a coupon can currently be redeemed: it must be active, inside its
/// validity window, and under its usage cap (`max_uses == 0` is unlimited).
pub fn coupon_is_valid(coupon: &CouponModel, now: DateTime<Utc>) -> bool {
    if !coupon.active {
        return false;
    }
    if now < coupon.valid_from || now > coupon.valid_to {
        return false;
    }
    if coupon.max_uses > 0 && coupon.current_uses >= coupon.max_uses {
        return false;
    }
    true
}

/// Discount a coupon grants on `order_total` at time `now`.
///
/// Returns zero when the coupon is not valid or the total is below its
/// minimum order value. Percentage discounts are rounded to two decimal
/// places with banker's rounding; fixed discounts are capped at the order
/// total so the result never exceeds it and is never negative.
pub fn coupon_discount(coupon: &CouponModel, order_total: Decimal, now: DateTime<Utc>) -> Decimal {
    if !coupon_is_valid(coupon, now) || order_total < coupon.min_order_value {
        return Decimal::ZERO;
    }

    match coupon.discount_type {
        DiscountType::Percentage => (order_total * coupon.discount_value / PERCENT_BASE)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven),
        DiscountType::Fixed => coupon.discount_value.min(order_total).max(Decimal::ZERO),
    }
}

/// Look up a coupon by code, case-insensitively.
pub async fn find_by_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<Option<CouponModel>, ServiceError> {
    let normalized = code.trim().to_uppercase();
    let found = Coupon::find()
        .filter(Expr::expr(Func::upper(Expr::col(coupon::Column::Code))).eq(normalized))
        .one(conn)
        .await?;
    Ok(found)
}

/// Guarded usage increment. Returns `false` when the cap was consumed
/// concurrently, in which case the caller must not apply the coupon.
pub async fn try_consume_use<C: ConnectionTrait>(
    conn: &C,
    coupon_id: Uuid,
) -> Result<bool, ServiceError> {
    let result = Coupon::update_many()
        .col_expr(
            coupon::Column::CurrentUses,
            Expr::col(coupon::Column::CurrentUses).add(1),
        )
        .filter(coupon::Column::Id.eq(coupon_id))
        .filter(
            Condition::any()
                .add(coupon::Column::MaxUses.eq(0))
                .add(Expr::col(coupon::Column::CurrentUses).lt(Expr::col(coupon::Column::MaxUses))),
        )
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Record one redemption. Caller is responsible for running this in the same
/// transaction as the guarded increment.
pub async fn record_use<C: ConnectionTrait>(
    conn: &C,
    coupon_id: Uuid,
    customer_id: Uuid,
    order_id: Option<Uuid>,
    discount_amount: Decimal,
) -> Result<(), ServiceError> {
    let use_row = coupon_use::ActiveModel {
        id: Set(Uuid::new_v4()),
        coupon_id: Set(coupon_id),
        customer_id: Set(customer_id),
        order_id: Set(order_id),
        discount_amount: Set(discount_amount),
        used_at: Set(Utc::now()),
    };
    use_row.insert(conn).await?;
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCouponInput {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub max_uses: i32,
    #[serde(default)]
    pub min_order_value: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Outcome of validating a coupon code against an optional order total.
#[derive(Debug, Clone, Serialize)]
pub struct CouponValidation {
    pub code: String,
    pub valid: bool,
    /// Discount the coupon would grant on the supplied total, if any.
    pub discount: Option<Decimal>,
    pub message: String,
}

#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a coupon. Codes are stored uppercase so the case-insensitive
    /// lookup and the unique index agree.
    #[instrument(skip(self))]
    pub async fn create_coupon(&self, input: CreateCouponInput) -> Result<CouponModel, ServiceError> {
        input.validate()?;

        if input.valid_to < input.valid_from {
            return Err(ServiceError::ValidationError(
                "valid_to must not precede valid_from".to_string(),
            ));
        }
        if input.discount_value < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "discount_value must not be negative".to_string(),
            ));
        }
        if input.discount_type == DiscountType::Percentage && input.discount_value > PERCENT_BASE {
            return Err(ServiceError::ValidationError(
                "percentage discount cannot exceed 100".to_string(),
            ));
        }
        if input.max_uses < 0 {
            return Err(ServiceError::ValidationError(
                "max_uses must not be negative".to_string(),
            ));
        }

        let code = input.code.trim().to_uppercase();
        if find_by_code(&*self.db, &code).await?.is_some() {
            return Err(ServiceError::AlreadyExists(format!(
                "Coupon code {} already exists",
                code
            )));
        }

        let coupon = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.clone()),
            valid_from: Set(input.valid_from),
            valid_to: Set(input.valid_to),
            discount_type: Set(input.discount_type),
            discount_value: Set(input.discount_value),
            active: Set(input.active),
            max_uses: Set(input.max_uses),
            current_uses: Set(0),
            min_order_value: Set(input.min_order_value),
            created_at: Set(Utc::now()),
        };

        let coupon = coupon.insert(&*self.db).await?;
        info!(code = %code, "created coupon");
        Ok(coupon)
    }

    pub async fn get_coupon(&self, id: Uuid) -> Result<CouponModel, ServiceError> {
        Coupon::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", id)))
    }

    /// Validates a code for display purposes. Unknown codes are a `NotFound`
    /// error; known codes always return a verdict, so callers can tell an
    /// expired coupon apart from a typo.
    #[instrument(skip(self))]
    pub async fn validate_code(
        &self,
        code: &str,
        order_total: Option<Decimal>,
    ) -> Result<CouponValidation, ServiceError> {
        let coupon = find_by_code(&*self.db, code)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon code {} not found", code)))?;

        let now = Utc::now();
        if !coupon_is_valid(&coupon, now) {
            return Ok(CouponValidation {
                code: coupon.code,
                valid: false,
                discount: None,
                message: "Coupon is no longer valid".to_string(),
            });
        }

        if let Some(total) = order_total {
            if total < coupon.min_order_value {
                return Ok(CouponValidation {
                    code: coupon.code,
                    valid: false,
                    discount: None,
                    message: format!(
                        "Order total must be at least {} to use this coupon",
                        coupon.min_order_value
                    ),
                });
            }
        }

        let discount = order_total.map(|total| coupon_discount(&coupon, total, now));
        Ok(CouponValidation {
            code: coupon.code,
            valid: true,
            discount,
            message: "Coupon is valid".to_string(),
        })
    }
}
