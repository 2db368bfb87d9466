//! Orders and order items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::PaymentMethod;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address_id: i64,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub location: String,
    pub user_id: i64,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRow {
    pub id: i64,
    pub order_id: i64,
    pub product_item_id: i64,
    pub amount: i32,
    pub price: Decimal,
    pub discount: Decimal,
    pub is_reviewed: bool,
    pub product_id: i64,
    pub product_name: String,
    pub type_name: String,
    pub image_url: Option<String>,
}

/// Order item with the ownership and status data reviews need.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewableItemRow { pub id: i64, pub user_id: i64, pub order_status: OrderStatus, pub is_reviewed: bool }

const ORDER_SELECT: &str = "SELECT o.id, o.order_date, o.status, o.payment_method, o.shipping_address_id, \
     sa.receiver_name, sa.receiver_phone, sa.location, o.user_id, \
     COALESCE((SELECT SUM(oi.amount * GREATEST(oi.price - oi.discount, 0)) FROM order_items oi WHERE oi.order_id = o.id), 0) AS total \
     FROM orders o JOIN shipping_addresses sa ON sa.id = o.shipping_address_id";

const ITEM_SELECT: &str = "SELECT oi.id, oi.order_id, oi.product_item_id, oi.amount, oi.price, oi.discount, oi.is_reviewed, \
     p.id AS product_id, p.name AS product_name, t.name AS type_name, \
     (SELECT i.url FROM images i WHERE i.product_id = p.id ORDER BY i.id LIMIT 1) AS image_url \
     FROM order_items oi JOIN product_items pi ON pi.id = oi.product_item_id \
     JOIN products p ON p.id = pi.product_id JOIN type_products t ON t.id = pi.type_id";

pub struct OrderRepository<'a> { pool: &'a PgPool }

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    pub async fn list_all(&self) -> Result<Vec<OrderRow>, sqlx::Error> {
        sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} ORDER BY o.order_date DESC")).fetch_all(self.pool).await
    }

    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<OrderRow>, sqlx::Error> {
        sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.user_id = $1 ORDER BY o.order_date DESC"))
            .bind(user_id)
            .fetch_all(self.pool)
            .await
    }

    pub async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<OrderRow>, sqlx::Error> {
        sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.status = $1 ORDER BY o.order_date DESC"))
            .bind(status)
            .fetch_all(self.pool)
            .await
    }

    pub async fn find(&self, id: i64) -> Result<Option<OrderRow>, sqlx::Error> {
        sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1")).bind(id).fetch_optional(self.pool).await
    }

    pub async fn items_for(&self, order_ids: &[i64]) -> Result<Vec<OrderItemRow>, sqlx::Error> {
        sqlx::query_as::<_, OrderItemRow>(&format!("{ITEM_SELECT} WHERE oi.order_id = ANY($1) ORDER BY oi.id"))
            .bind(order_ids)
            .fetch_all(self.pool)
            .await
    }

    pub async fn list_all_items(&self) -> Result<Vec<OrderItemRow>, sqlx::Error> {
        sqlx::query_as::<_, OrderItemRow>(&format!("{ITEM_SELECT} ORDER BY oi.id")).fetch_all(self.pool).await
    }

    pub async fn find_reviewable_item(&self, order_item_id: i64) -> Result<Option<ReviewableItemRow>, sqlx::Error> {
        sqlx::query_as::<_, ReviewableItemRow>(
            "SELECT oi.id, o.user_id, o.status AS order_status, oi.is_reviewed \
             FROM order_items oi JOIN orders o ON o.id = oi.order_id WHERE oi.id = $1",
        )
        .bind(order_item_id)
        .fetch_optional(self.pool)
        .await
    }
}

pub async fn insert_order(
    conn: &mut PgConnection,
    user_id: i64,
    shipping_address_id: i64,
    payment_method: PaymentMethod,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO orders (user_id, shipping_address_id, payment_method, status) VALUES ($1, $2, $3, 'Processing') RETURNING id",
    )
    .bind(user_id)
    .bind(shipping_address_id)
    .bind(payment_method)
    .fetch_one(conn)
    .await
}

pub async fn insert_item(
    conn: &mut PgConnection,
    order_id: i64,
    product_item_id: i64,
    amount: i32,
    price: Decimal,
    discount: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO order_items (order_id, product_item_id, amount, price, discount) VALUES ($1, $2, $3, $4, $5)")
        .bind(order_id)
        .bind(product_item_id)
        .bind(amount)
        .bind(price)
        .bind(discount)
        .execute(conn)
        .await?;
    Ok(())
}

/// Takes `amount` units of stock; `false` when not enough is left.
pub async fn decrement_stock(conn: &mut PgConnection, product_item_id: i64, amount: i32) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("UPDATE product_items SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
        .bind(product_item_id)
        .bind(amount)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

/// Puts the stock of every item of the order back.
pub async fn restore_stock(conn: &mut PgConnection, order_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE product_items pi SET stock = pi.stock + s.total \
         FROM (SELECT product_item_id, SUM(amount)::INTEGER AS total FROM order_items WHERE order_id = $1 GROUP BY product_item_id) s \
         WHERE s.product_item_id = pi.id",
    )
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Changes the status only when it is still `expected`; `false` when another request won.
pub async fn transition_status(
    conn: &mut PgConnection,
    order_id: i64,
    expected: OrderStatus,
    next: OrderStatus,
) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
        .bind(order_id)
        .bind(expected)
        .bind(next)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn mark_reviewed(conn: &mut PgConnection, order_item_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE order_items SET is_reviewed = TRUE WHERE id = $1").bind(order_item_id).execute(conn).await?;
    Ok(())
}
