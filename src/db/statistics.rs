//! Sales aggregates over completed orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopProductRow { pub product_id: i64, pub product_name: String, pub total_sold: i64, pub revenue: Decimal }

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomerRow { pub user_id: i64, pub email: String, pub name: Option<String>, pub order_count: i64, pub total_spent: Decimal }

const TOP_PRODUCTS: &str = "SELECT p.id AS product_id, p.name AS product_name, \
     SUM(oi.amount)::bigint AS total_sold, SUM(oi.amount * GREATEST(oi.price - oi.discount, 0)) AS revenue \
     FROM order_items oi JOIN orders o ON o.id = oi.order_id \
     JOIN product_items pi ON pi.id = oi.product_item_id JOIN products p ON p.id = pi.product_id \
     WHERE o.status = 'Completed' AND o.order_date >= $1 AND o.order_date < $2 \
     GROUP BY p.id, p.name ORDER BY total_sold DESC, revenue DESC LIMIT 5";

const TOP_CUSTOMERS: &str = "SELECT u.id AS user_id, u.email, u.name, COUNT(DISTINCT o.id) AS order_count, \
     SUM(oi.amount * GREATEST(oi.price - oi.discount, 0)) AS total_spent \
     FROM orders o JOIN order_items oi ON oi.order_id = o.id JOIN users u ON u.id = o.user_id \
     WHERE o.status = 'Completed' AND o.order_date >= $1 AND o.order_date < $2 \
     GROUP BY u.id, u.email, u.name ORDER BY total_spent DESC, order_count DESC LIMIT 5";

pub struct StatisticsRepository<'a> { pool: &'a PgPool }

impl<'a> StatisticsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    /// Best sellers with orders placed in `[from, to)`.
    pub async fn top_products(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<TopProductRow>, sqlx::Error> {
        sqlx::query_as::<_, TopProductRow>(TOP_PRODUCTS).bind(from).bind(to).fetch_all(self.pool).await
    }

    /// Biggest spenders with orders placed in `[from, to)`.
    pub async fn top_customers(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<TopCustomerRow>, sqlx::Error> {
        sqlx::query_as::<_, TopCustomerRow>(TOP_CUSTOMERS).bind(from).bind(to).fetch_all(self.pool).await
    }
}
