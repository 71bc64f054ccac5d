use crate::{
    entities::{review, Product, Review, ReviewModel},
    errors::ServiceError,
    events::{Event, EventSender},
    services::is_unique_violation,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitReviewInput {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 4000))]
    pub comment: String,
}

/// Count and share of one rating bucket.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatingBucket {
    pub rating: i32,
    pub count: u64,
    pub percentage: f64,
}

/// Aggregate review figures for a product. `average` and every percentage
/// are zero when there are no reviews.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatingSummary {
    pub count: u64,
    pub average: f64,
    pub buckets: Vec<RatingBucket>,
}

/// Pure histogram computation over a list of ratings.
pub fn summarize_ratings(ratings: &[i32]) -> RatingSummary {
    let count = ratings.len() as u64;
    let average = if count == 0 {
        0.0
    } else {
        ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / count as f64
    };

    let buckets = (1..=5)
        .map(|rating| {
            let bucket_count = ratings.iter().filter(|r| **r == rating).count() as u64;
            let percentage = if count == 0 {
                0.0
            } else {
                bucket_count as f64 * 100.0 / count as f64
            };
            RatingBucket {
                rating,
                count: bucket_count,
                percentage,
            }
        })
        .collect();

    RatingSummary {
        count,
        average,
        buckets,
    }
}

#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Submits a review. One row per (product, customer): a second submission
    /// by the same customer updates the existing review in place.
    #[instrument(skip(self, input))]
    pub async fn upsert_review(
        &self,
        product_id: Uuid,
        customer_id: Uuid,
        input: SubmitReviewInput,
    ) -> Result<ReviewModel, ServiceError> {
        input.validate()?;

        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let existing = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .filter(review::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?;

        let now = Utc::now();
        let saved = match existing {
            Some(current) => Self::apply_update(&*self.db, current, &input).await?,
            None => {
                let fresh = review::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(product_id),
                    customer_id: Set(customer_id),
                    rating: Set(input.rating),
                    title: Set(input.title.clone()),
                    comment: Set(input.comment.clone()),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                match fresh.insert(&*self.db).await {
                    Ok(saved) => saved,
                    // A concurrent submission won the insert; update its row.
                    Err(err) if is_unique_violation(&err) => {
                        let current = Review::find()
                            .filter(review::Column::ProductId.eq(product_id))
                            .filter(review::Column::CustomerId.eq(customer_id))
                            .one(&*self.db)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::InternalError(
                                    "Review vanished after conflict".to_string(),
                                )
                            })?;
                        Self::apply_update(&*self.db, current, &input).await?
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        };

        self.event_sender
            .send_or_log(Event::ReviewSubmitted {
                product_id,
                customer_id,
            })
            .await;

        info!(product_id = %product_id, customer_id = %customer_id, rating = saved.rating, "review saved");
        Ok(saved)
    }

    async fn apply_update<C: sea_orm::ConnectionTrait>(
        conn: &C,
        current: ReviewModel,
        input: &SubmitReviewInput,
    ) -> Result<ReviewModel, ServiceError> {
        let mut active: review::ActiveModel = current.into();
        active.rating = Set(input.rating);
        active.title = Set(input.title.clone());
        active.comment = Set(input.comment.clone());
        active.updated_at = Set(Utc::now());
        Ok(active.update(conn).await?)
    }

    /// Deletes the customer's own review of a product.
    #[instrument(skip(self))]
    pub async fn delete_review(
        &self,
        product_id: Uuid,
        customer_id: Uuid,
    ) -> Result<(), ServiceError> {
        let existing = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .filter(review::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Review not found".to_string()))?;

        let review_id = existing.id;
        existing.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ReviewDeleted(review_id))
            .await;
        Ok(())
    }

    /// Lists reviews for a product, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_product(&self, product_id: Uuid) -> Result<Vec<ReviewModel>, ServiceError> {
        let reviews = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .order_by_desc(review::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(reviews)
    }

    /// Rating histogram for a product.
    #[instrument(skip(self))]
    pub async fn rating_summary(&self, product_id: Uuid) -> Result<RatingSummary, ServiceError> {
        let ratings: Vec<i32> = Review::find()
            .filter(review::Column::ProductId.eq(product_id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|r| r.rating)
            .collect();

        Ok(summarize_ratings(&ratings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ratings_produce_all_zeros() {
        let summary = summarize_ratings(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average, 0.0);
        assert_eq!(summary.buckets.len(), 5);
        for bucket in &summary.buckets {
            assert_eq!(bucket.count, 0);
            assert_eq!(bucket.percentage, 0.0);
        }
    }

    #[test]
    fn histogram_counts_and_percentages() {
        let summary = summarize_ratings(&[5, 5, 4, 1]);
        assert_eq!(summary.count, 4);
        assert!((summary.average - 3.75).abs() < f64::EPSILON);

        let five = &summary.buckets[4];
        assert_eq!(five.rating, 5);
        assert_eq!(five.count, 2);
        assert_eq!(five.percentage, 50.0);

        let one = &summary.buckets[0];
        assert_eq!(one.count, 1);
        assert_eq!(one.percentage, 25.0);

        let two = &summary.buckets[1];
        assert_eq!(two.count, 0);
        assert_eq!(two.percentage, 0.0);
    }
}
