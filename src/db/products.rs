//! Products, their images and product items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::domain::value_objects::Status;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub brand_id: Option<i64>,
    pub brand_name: Option<String>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductItemRow {
    pub id: i64,
    pub product_id: i64,
    pub type_id: i64,
    pub type_name: String,
    pub price: Decimal,
    pub discount: Decimal,
    pub stock: i32,
    pub status: Status,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImageRow { pub product_id: i64, pub url: String }

/// Average rating, review count and units sold for one product.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct ProductStatsRow { pub product_id: i64, pub average_rating: Option<f64>, pub review_count: i64, pub total_sold: i64 }

const PRODUCT_SELECT: &str = "SELECT p.id, p.name, p.description, p.category_id, c.name AS category_name, \
     p.brand_id, b.name AS brand_name, p.status, p.created_at FROM products p \
     LEFT JOIN categories c ON c.id = p.category_id LEFT JOIN brands b ON b.id = p.brand_id";

const ITEM_SELECT: &str = "SELECT pi.id, pi.product_id, pi.type_id, t.name AS type_name, pi.price, pi.discount, \
     pi.stock, pi.status FROM product_items pi JOIN type_products t ON t.id = pi.type_id";

pub struct ProductRepository<'a> { pool: &'a PgPool }

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    pub async fn list_active(&self) -> Result<Vec<ProductRow>, sqlx::Error> {
        sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.status = 'ACTIVE' ORDER BY p.created_at DESC"))
            .fetch_all(self.pool)
            .await
    }

    pub async fn list_by_category(&self, category_id: i64) -> Result<Vec<ProductRow>, sqlx::Error> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} WHERE p.status = 'ACTIVE' AND p.category_id = $1 ORDER BY p.created_at DESC"
        ))
        .bind(category_id)
        .fetch_all(self.pool)
        .await
    }

    /// Case-insensitive match on name or description.
    pub async fn search(&self, keyword: &str) -> Result<Vec<ProductRow>, sqlx::Error> {
        let pattern = format!("%{}%", keyword.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
        sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} WHERE p.status = 'ACTIVE' AND (p.name ILIKE $1 OR p.description ILIKE $1) ORDER BY p.name"
        ))
        .bind(pattern)
        .fetch_all(self.pool)
        .await
    }

    pub async fn find(&self, id: i64) -> Result<Option<ProductRow>, sqlx::Error> {
        sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn exists(&self, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool)
            .await
    }

    pub async fn create(&self, name: &str, description: Option<&str>, category_id: i64, brand_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("INSERT INTO products (name, description, category_id, brand_id) VALUES ($1, $2, $3, $4) RETURNING id")
            .bind(name)
            .bind(description)
            .bind(category_id)
            .bind(brand_id)
            .fetch_one(self.pool)
            .await
    }

    pub async fn update(&self, id: i64, name: &str, description: Option<&str>, category_id: i64, brand_id: i64) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("UPDATE products SET name = $2, description = $3, category_id = $4, brand_id = $5 WHERE id = $1")
            .bind(id)
            .bind(name)
            .bind(description)
            .bind(category_id)
            .bind(brand_id)
            .execute(self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn set_status(&self, id: i64, status: Status) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("UPDATE products SET status = $2 WHERE id = $1").bind(id).bind(status).execute(self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn add_image(&self, product_id: i64, url: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO images (url, product_id) VALUES ($1, $2)").bind(url).bind(product_id).execute(self.pool).await?;
        Ok(())
    }

    pub async fn images_for(&self, product_ids: &[i64]) -> Result<Vec<ImageRow>, sqlx::Error> {
        sqlx::query_as::<_, ImageRow>("SELECT product_id, url FROM images WHERE product_id = ANY($1) ORDER BY id")
            .bind(product_ids)
            .fetch_all(self.pool)
            .await
    }

    /// Ratings of ACTIVE reviews and units sold in completed orders.
    pub async fn stats_for(&self, product_ids: &[i64]) -> Result<Vec<ProductStatsRow>, sqlx::Error> {
        sqlx::query_as::<_, ProductStatsRow>(
            "SELECT p.id AS product_id, \
                    (SELECT AVG(r.rating)::float8 FROM reviews r JOIN order_items oi ON oi.id = r.order_item_id \
                       JOIN product_items pi ON pi.id = oi.product_item_id \
                      WHERE pi.product_id = p.id AND r.status = 'ACTIVE') AS average_rating, \
                    (SELECT COUNT(*) FROM reviews r JOIN order_items oi ON oi.id = r.order_item_id \
                       JOIN product_items pi ON pi.id = oi.product_item_id \
                      WHERE pi.product_id = p.id AND r.status = 'ACTIVE') AS review_count, \
                    (SELECT COALESCE(SUM(oi.amount), 0)::bigint FROM order_items oi \
                       JOIN orders o ON o.id = oi.order_id JOIN product_items pi ON pi.id = oi.product_item_id \
                      WHERE pi.product_id = p.id AND o.status = 'Completed') AS total_sold \
             FROM products p WHERE p.id = ANY($1)",
        )
        .bind(product_ids)
        .fetch_all(self.pool)
        .await
    }

    // ---- product items ----

    /// ACTIVE items of the given products.
    pub async fn items_for(&self, product_ids: &[i64]) -> Result<Vec<ProductItemRow>, sqlx::Error> {
        sqlx::query_as::<_, ProductItemRow>(&format!(
            "{ITEM_SELECT} WHERE pi.product_id = ANY($1) AND pi.status = 'ACTIVE' ORDER BY pi.price"
        ))
        .bind(product_ids)
        .fetch_all(self.pool)
        .await
    }

    pub async fn find_item(&self, id: i64) -> Result<Option<ProductItemRow>, sqlx::Error> {
        sqlx::query_as::<_, ProductItemRow>(&format!("{ITEM_SELECT} WHERE pi.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn create_item(&self, product_id: i64, type_id: i64, price: Decimal, discount: Decimal, stock: i32) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO product_items (product_id, type_id, price, discount, stock) VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(product_id)
        .bind(type_id)
        .bind(price)
        .bind(discount)
        .bind(stock)
        .fetch_one(self.pool)
        .await
    }

    pub async fn update_item(
        &self,
        id: i64,
        product_id: i64,
        type_id: i64,
        price: Decimal,
        discount: Decimal,
        stock: i32,
    ) -> Result<bool, sqlx::Error> {
        let res = sqlx::query(
            "UPDATE product_items SET product_id = $2, type_id = $3, price = $4, discount = $5, stock = $6 WHERE id = $1",
        )
        .bind(id)
        .bind(product_id)
        .bind(type_id)
        .bind(price)
        .bind(discount)
        .bind(stock)
        .execute(self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn set_item_status(&self, id: i64, status: Status) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("UPDATE product_items SET status = $2 WHERE id = $1").bind(id).bind(status).execute(self.pool).await?;
        Ok(res.rows_affected() > 0)
    }
}
