//! Database access for the coffee shop `PostgreSQL` schema.
//!
//! One repository per aggregate, each borrowing the pool. Writes that must be
//! atomic with others (order placement, cancellation, reviews) are free
//! functions over a `PgConnection` so callers can run them inside a transaction.
//!
//! # Migrations
//!
//! Stored in `migrations/` and applied at start-up with `sqlx::migrate!`.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub mod addresses;
pub mod carts;
pub mod catalog;
pub mod chat;
pub mod favorites;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod statistics;
pub mod transactions;
pub mod users;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// True when `err` is a unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
