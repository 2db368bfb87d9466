use serde::Deserialize;
use validator::Validate;

use crate::db::is_unique_violation;
use crate::db::orders::{self, OrderRepository};
use crate::db::reviews::{self, ReviewRepository, ReviewRow};
use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::{Rating, Status};
use crate::error::{AppError, ResultExt};
use crate::security::CurrentUser;
use crate::services::non_blank;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub order_item_id: Option<i64>,
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

impl ReviewRequest {
    fn rating(&self) -> Result<Rating, AppError> {
        let value = self.rating.ok_or_else(|| AppError::not_null("Rating must be not null"))?;
        if self.validate().is_err() {
            return Err(AppError::not_valid("Rating must be between 1 and 5"));
        }
        Rating::new(value).ok_or_else(|| AppError::not_valid("Rating must be between 1 and 5"))
    }
}

pub struct ReviewService<'a> { state: &'a AppState }

impl<'a> ReviewService<'a> {
    pub const fn new(state: &'a AppState) -> Self { Self { state } }

    fn reviews(&self) -> ReviewRepository<'a> { ReviewRepository::new(self.state.db()) }

    pub async fn get_all(&self) -> Result<Vec<ReviewRow>, AppError> {
        Ok(self.reviews().list_all().await?)
    }

    pub async fn by_product(&self, product_id: i64) -> Result<Vec<ReviewRow>, AppError> {
        Ok(self.reviews().list_by_product(product_id).await?)
    }

    pub async fn add(&self, current: &CurrentUser, req: &ReviewRequest) -> Result<ReviewRow, AppError> {
        let order_item_id = req.order_item_id.ok_or_else(|| AppError::not_null("Order item id must be not null"))?;
        let rating = req.rating()?;
        let item = OrderRepository::new(self.state.db())
            .find_reviewable_item(order_item_id)
            .await?
            .ok_or_else(|| AppError::not_found("OrderItem could not be found"))?;
        current.ensure_owner_or_admin(item.user_id)?;
        if item.order_status != OrderStatus::Completed {
            return Err(AppError::not_valid("Order is not completed"));
        }
        if item.is_reviewed {
            return Err(AppError::existed("Order item has already been reviewed"));
        }

        let mut tx = self.state.db().begin().await?;
        let id = reviews::insert_review(&mut *tx, order_item_id, rating.value(), non_blank(&req.comment))
            .await
            .map_err(|e| {
                if is_unique_violation(&e) { AppError::existed("Order item has already been reviewed") } else { e.into() }
            })?;
        orders::mark_reviewed(&mut *tx, order_item_id).await.or_system("Error when add review")?;
        tx.commit().await?;

        tracing::info!(review_id = id, order_item_id, rating = rating.value(), "Review added");
        self.reviews().find(id).await?.ok_or_else(|| AppError::not_found("Review not found"))
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.reviews().find(id).await?.ok_or_else(|| AppError::not_found("Review could not be found"))?;
        self.reviews().set_status(id, Status::Inactive).await.or_system("Error when delete review")?;
        tracing::info!(review_id = id, "Review deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::codes;

    fn req(rating: Option<i32>) -> ReviewRequest {
        ReviewRequest { order_item_id: Some(1), rating, comment: Some("Great cold brew".into()) }
    }

    #[test]
    fn rating_must_be_one_to_five() {
        assert_eq!(req(Some(5)).rating().unwrap().value(), 5);
        assert_eq!(req(Some(1)).rating().unwrap().value(), 1);
        for bad in [0, 6, -3] {
            let err = req(Some(bad)).rating().unwrap_err();
            assert_eq!((err.code(), err.to_string().as_str()), (codes::FIELD_NOT_VALID, "Rating must be between 1 and 5"));
        }
        assert_eq!(req(None).rating().unwrap_err().code(), codes::FIELD_NOT_NULL);
    }
}
