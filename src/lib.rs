//! Coffee shop e-commerce backend
//!
//! REST API for an online coffee shop built on axum and Postgres.
//!
//! ## Features
//! - JWT authentication with OTP password recovery
//! - Catalog: categories, brands, product types, products and sizes
//! - Cart, shipping addresses, favorites and orders
//! - Reviews of delivered items and support chat
//! - VNPay checkout and refunds
//! - Sales statistics for administrators

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod events;
pub mod mail;
pub mod message;
pub mod payment;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use routes::build_router;
pub use state::AppState;
