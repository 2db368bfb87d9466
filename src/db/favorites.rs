//! Favorite products.

use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRow {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub image_url: Option<String>,
}

pub struct FavoriteRepository<'a> { pool: &'a PgPool }

impl<'a> FavoriteRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    pub async fn list(&self, user_id: i64) -> Result<Vec<FavoriteRow>, sqlx::Error> {
        sqlx::query_as::<_, FavoriteRow>(
            "SELECT f.id, f.user_id, f.product_id, p.name AS product_name, \
                    (SELECT i.url FROM images i WHERE i.product_id = p.id ORDER BY i.id LIMIT 1) AS image_url \
             FROM favorite_products f JOIN products p ON p.id = f.product_id \
             WHERE f.user_id = $1 ORDER BY f.id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
    }

    pub async fn exists(&self, user_id: i64, product_id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM favorite_products WHERE user_id = $1 AND product_id = $2)")
            .bind(user_id)
            .bind(product_id)
            .fetch_one(self.pool)
            .await
    }

    pub async fn create(&self, user_id: i64, product_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("INSERT INTO favorite_products (user_id, product_id) VALUES ($1, $2) RETURNING id")
            .bind(user_id)
            .bind(product_id)
            .fetch_one(self.pool)
            .await
    }

    /// `false` when the pair was not a favorite.
    pub async fn delete(&self, user_id: i64, product_id: i64) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("DELETE FROM favorite_products WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
