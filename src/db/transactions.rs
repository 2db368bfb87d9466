//! Payment transactions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRow {
    pub id: i64,
    pub order_id: i64,
    pub amount: i64,
    pub txn_ref: String,
    pub transaction_no: Option<String>,
    pub command: String,
    pub pay_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction<'t> {
    pub order_id: i64,
    pub amount: i64,
    pub txn_ref: &'t str,
    pub transaction_no: Option<&'t str>,
    pub command: &'t str,
    pub pay_date: DateTime<Utc>,
}

pub struct TransactionRepository<'a> { pool: &'a PgPool }

impl<'a> TransactionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    pub async fn create(&self, tx: &NewTransaction<'_>) -> Result<TransactionRow, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_transaction(&mut *conn, tx).await
    }

    /// Latest payment recorded for the order.
    pub async fn find_payment(&self, order_id: i64) -> Result<Option<TransactionRow>, sqlx::Error> {
        sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE order_id = $1 AND command = 'pay' ORDER BY pay_date DESC, id DESC LIMIT 1",
        )
        .bind(order_id)
        .fetch_optional(self.pool)
        .await
    }
}

pub async fn insert_transaction(conn: &mut PgConnection, tx: &NewTransaction<'_>) -> Result<TransactionRow, sqlx::Error> {
    sqlx::query_as::<_, TransactionRow>(
        "INSERT INTO transactions (order_id, amount, txn_ref, transaction_no, command, pay_date) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(tx.order_id)
    .bind(tx.amount)
    .bind(tx.txn_ref)
    .bind(tx.transaction_no)
    .bind(tx.command)
    .bind(tx.pay_date)
    .fetch_one(conn)
    .await
}
