//! Product reviews.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::domain::value_objects::Status;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRow {
    pub id: i64,
    pub order_item_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub product_id: i64,
    pub user_id: i64,
    pub user_name: Option<String>,
}

const REVIEW_SELECT: &str = "SELECT r.id, r.order_item_id, r.rating, r.comment, r.status, r.created_at, \
     pi.product_id, u.id AS user_id, u.name AS user_name \
     FROM reviews r JOIN order_items oi ON oi.id = r.order_item_id \
     JOIN product_items pi ON pi.id = oi.product_item_id \
     JOIN orders o ON o.id = oi.order_id JOIN users u ON u.id = o.user_id";

pub struct ReviewRepository<'a> { pool: &'a PgPool }

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    pub async fn list_all(&self) -> Result<Vec<ReviewRow>, sqlx::Error> {
        sqlx::query_as::<_, ReviewRow>(&format!("{REVIEW_SELECT} ORDER BY r.created_at DESC")).fetch_all(self.pool).await
    }

    pub async fn list_by_product(&self, product_id: i64) -> Result<Vec<ReviewRow>, sqlx::Error> {
        sqlx::query_as::<_, ReviewRow>(&format!(
            "{REVIEW_SELECT} WHERE pi.product_id = $1 AND r.status = 'ACTIVE' ORDER BY r.created_at DESC"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await
    }

    pub async fn find(&self, id: i64) -> Result<Option<ReviewRow>, sqlx::Error> {
        sqlx::query_as::<_, ReviewRow>(&format!("{REVIEW_SELECT} WHERE r.id = $1")).bind(id).fetch_optional(self.pool).await
    }

    pub async fn set_status(&self, id: i64, status: Status) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE reviews SET status = $2 WHERE id = $1").bind(id).bind(status).execute(self.pool).await?;
        Ok(())
    }
}

pub async fn insert_review(conn: &mut PgConnection, order_item_id: i64, rating: i32, comment: Option<&str>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("INSERT INTO reviews (order_item_id, rating, comment) VALUES ($1, $2, $3) RETURNING id")
        .bind(order_item_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(conn)
        .await
}
