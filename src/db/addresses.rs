//! Shipping addresses.

use serde::Serialize;
use sqlx::PgPool;

use crate::domain::value_objects::Status;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AddressRow {
    pub id: i64,
    pub user_id: i64,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub location: String,
    pub status: Status,
}

pub struct AddressRepository<'a> { pool: &'a PgPool }

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    pub async fn list_active(&self, user_id: i64) -> Result<Vec<AddressRow>, sqlx::Error> {
        sqlx::query_as::<_, AddressRow>("SELECT * FROM shipping_addresses WHERE user_id = $1 AND status = 'ACTIVE' ORDER BY id")
            .bind(user_id)
            .fetch_all(self.pool)
            .await
    }

    pub async fn find(&self, id: i64) -> Result<Option<AddressRow>, sqlx::Error> {
        sqlx::query_as::<_, AddressRow>("SELECT * FROM shipping_addresses WHERE id = $1").bind(id).fetch_optional(self.pool).await
    }

    pub async fn create(&self, user_id: i64, receiver_name: &str, receiver_phone: &str, location: &str) -> Result<AddressRow, sqlx::Error> {
        sqlx::query_as::<_, AddressRow>(
            "INSERT INTO shipping_addresses (user_id, receiver_name, receiver_phone, location) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(user_id)
        .bind(receiver_name)
        .bind(receiver_phone)
        .bind(location)
        .fetch_one(self.pool)
        .await
    }

    pub async fn update(&self, id: i64, receiver_name: &str, receiver_phone: &str, location: &str) -> Result<AddressRow, sqlx::Error> {
        sqlx::query_as::<_, AddressRow>(
            "UPDATE shipping_addresses SET receiver_name = $2, receiver_phone = $3, location = $4 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(receiver_name)
        .bind(receiver_phone)
        .bind(location)
        .fetch_one(self.pool)
        .await
    }

    pub async fn set_status(&self, id: i64, status: Status) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE shipping_addresses SET status = $2 WHERE id = $1").bind(id).bind(status).execute(self.pool).await?;
        Ok(())
    }
}
