//! Cart lines.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRow { pub id: i64, pub user_id: i64, pub product_item_id: i64, pub quantity: i32 }

/// Cart line joined with its product item and product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub id: i64,
    pub product_item_id: i64,
    pub quantity: i32,
    pub price: Decimal,
    pub discount: Decimal,
    pub stock: i32,
    pub type_name: String,
    pub product_id: i64,
    pub product_name: String,
    pub image_url: Option<String>,
}

pub struct CartRepository<'a> { pool: &'a PgPool }

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    pub async fn find_line(&self, user_id: i64, product_item_id: i64) -> Result<Option<CartItemRow>, sqlx::Error> {
        sqlx::query_as::<_, CartItemRow>("SELECT * FROM cart_items WHERE user_id = $1 AND product_item_id = $2")
            .bind(user_id)
            .bind(product_item_id)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn find(&self, id: i64) -> Result<Option<CartItemRow>, sqlx::Error> {
        sqlx::query_as::<_, CartItemRow>("SELECT * FROM cart_items WHERE id = $1").bind(id).fetch_optional(self.pool).await
    }

    pub async fn insert(&self, user_id: i64, product_item_id: i64, quantity: i32) -> Result<CartItemRow, sqlx::Error> {
        sqlx::query_as::<_, CartItemRow>(
            "INSERT INTO cart_items (user_id, product_item_id, quantity) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(user_id)
        .bind(product_item_id)
        .bind(quantity)
        .fetch_one(self.pool)
        .await
    }

    pub async fn set_quantity(&self, id: i64, quantity: i32) -> Result<CartItemRow, sqlx::Error> {
        sqlx::query_as::<_, CartItemRow>("UPDATE cart_items SET quantity = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(quantity)
            .fetch_one(self.pool)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("DELETE FROM cart_items WHERE id = $1").bind(id).execute(self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn list_view(&self, user_id: i64) -> Result<Vec<CartLineView>, sqlx::Error> {
        sqlx::query_as::<_, CartLineView>(
            "SELECT ci.id, ci.product_item_id, ci.quantity, pi.price, pi.discount, pi.stock, t.name AS type_name, \
                    p.id AS product_id, p.name AS product_name, \
                    (SELECT i.url FROM images i WHERE i.product_id = p.id ORDER BY i.id LIMIT 1) AS image_url \
             FROM cart_items ci \
             JOIN product_items pi ON pi.id = ci.product_item_id \
             JOIN type_products t ON t.id = pi.type_id \
             JOIN products p ON p.id = pi.product_id \
             WHERE ci.user_id = $1 ORDER BY ci.id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
    }
}

/// Drops the user's cart lines for items that were just ordered.
pub async fn remove_ordered_lines(conn: &mut PgConnection, user_id: i64, product_item_ids: &[i64]) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_item_id = ANY($2)")
        .bind(user_id)
        .bind(product_item_ids)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}
