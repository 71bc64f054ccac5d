use crate::{
    entities::{product, Category, CategoryModel, Product, ProductModel},
    errors::ServiceError,
    services::reviews::{summarize_ratings, RatingSummary},
};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Effective sale price: list price less the product's own percentage
/// discount, rounded to 2dp with banker's rounding.
pub fn discounted_price(product: &ProductModel) -> Decimal {
    if product.discount_percentage <= Decimal::ZERO {
        return product.price;
    }
    let discount = product.price * product.discount_percentage / Decimal::ONE_HUNDRED;
    (product.price - discount).round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    Name,
    PriceAsc,
    PriceDesc,
}

/// Catalog listing filters. All optional; defaults list every available
/// product, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub category_id: Option<Uuid>,
    /// Case-insensitive substring match on name and description.
    pub search: Option<String>,
    pub featured: Option<bool>,
    /// When false, unavailable products are included too.
    pub available_only: Option<bool>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    pub products: Vec<ProductSummary>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    #[serde(flatten)]
    pub product: ProductModel,
    pub discounted_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductModel,
    pub discounted_price: Decimal,
    pub category: Option<CategoryModel>,
    pub ratings: RatingSummary,
}

#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
    default_page_size: u64,
    max_page_size: u64,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>, default_page_size: u64, max_page_size: u64) -> Self {
        Self {
            db,
            default_page_size,
            max_page_size,
        }
    }

    /// Lists products with filtering, search, sort and pagination.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: ProductQuery) -> Result<ProductListing, ServiceError> {
        let mut select = Product::find();

        if query.available_only.unwrap_or(true) {
            select = select.filter(product::Column::Available.eq(true));
        }
        if let Some(category_id) = query.category_id {
            select = select.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(featured) = query.featured {
            select = select.filter(product::Column::Featured.eq(featured));
        }
        if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term);
            select = select.filter(
                Condition::any()
                    .add(product::Column::Name.like(pattern.clone()))
                    .add(product::Column::Description.like(pattern)),
            );
        }

        select = match query.sort {
            ProductSort::Newest => select.order_by_desc(product::Column::CreatedAt),
            ProductSort::Name => select.order_by_asc(product::Column::Name),
            ProductSort::PriceAsc => select.order_by_asc(product::Column::Price),
            ProductSort::PriceDesc => select.order_by_desc(product::Column::Price),
        };

        let per_page = query
            .per_page
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);
        let page = query.page.unwrap_or(1).max(1);

        let paginator = select.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let products = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(|product| {
                let discounted = discounted_price(&product);
                ProductSummary {
                    product,
                    discounted_price: discounted,
                }
            })
            .collect();

        Ok(ProductListing {
            products,
            total,
            page,
            per_page,
        })
    }

    /// Single product with category and rating summary.
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductDetail, ServiceError> {
        let (product, category) = Product::find_by_id(product_id)
            .find_also_related(Category)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let ratings: Vec<i32> = crate::entities::Review::find()
            .filter(crate::entities::review::Column::ProductId.eq(product_id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|r| r.rating)
            .collect();

        let discounted = discounted_price(&product);
        Ok(ProductDetail {
            discounted_price: discounted,
            category,
            ratings: summarize_ratings(&ratings),
            product,
        })
    }

    /// Featured, available products for landing pages.
    #[instrument(skip(self))]
    pub async fn featured_products(&self, limit: u64) -> Result<Vec<ProductSummary>, ServiceError> {
        let products = Product::find()
            .filter(product::Column::Featured.eq(true))
            .filter(product::Column::Available.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .limit(limit.clamp(1, self.max_page_size))
            .all(&*self.db)
            .await?;

        Ok(products
            .into_iter()
            .map(|product| {
                let discounted = discounted_price(&product);
                ProductSummary {
                    product,
                    discounted_price: discounted,
                }
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        use crate::entities::category;
        let categories = Category::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(categories)
    }

    pub async fn get_category(&self, id: Uuid) -> Result<CategoryModel, ServiceError> {
        Category::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn product_with(price: Decimal, discount_percentage: Decimal) -> ProductModel {
        let now = Utc::now();
        ProductModel {
            id: Uuid::new_v4(),
            name: "Widget".to_string(),
            description: String::new(),
            price,
            category_id: Uuid::new_v4(),
            image_path: None,
            stock: 10,
            available: true,
            featured: false,
            is_premium: false,
            discount_percentage,
            has_free_shipping: false,
            limited_edition: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn no_discount_returns_list_price() {
        let product = product_with(dec!(19.99), dec!(0));
        assert_eq!(discounted_price(&product), dec!(19.99));
    }

    #[test]
    fn percentage_discount_applies_with_2dp_rounding() {
        let product = product_with(dec!(100.00), dec!(25));
        assert_eq!(discounted_price(&product), dec!(75.00));

        // 10% off 0.05 leaves 0.045, banker's rounding gives 0.04
        let tiny = product_with(dec!(0.05), dec!(10));
        assert_eq!(discounted_price(&tiny), dec!(0.04));
    }
}
