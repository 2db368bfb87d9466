//! Fixtures shared by unit and database tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{routing::post, Json, Router};
use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;

use crate::config::{AppConfig, JwtConfig, VnPayConfig};
use crate::domain::value_objects::RoleName;
use crate::events::EventPublisher;
use crate::mail::Mailer;
use crate::security::CurrentUser;
use crate::state::AppState;

pub const VNPAY_API_URL: &str = "https://sandbox.vnpayment.vn/merchant_webapi/api/transaction";

pub fn config(vnpay_api_url: &str) -> AppConfig {
    AppConfig {
        database_url: SecretString::from("postgres://localhost/coffee_shop_test"),
        host: [127, 0, 0, 1].into(),
        port: 8080,
        frontend_url: "http://localhost:3000".into(),
        backend_url: "http://localhost:8080".into(),
        jwt: JwtConfig { secret: SecretString::from("test-secret"), access_ttl_secs: 3600, refresh_ttl_secs: 604_800 },
        admin: None,
        vnpay: VnPayConfig {
            tmn_code: "TESTCODE".into(),
            hash_secret: SecretString::from("SECRETKEY"),
            pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".into(),
            api_url: vnpay_api_url.into(),
        },
        smtp: None,
        upload_dir: std::env::temp_dir().join("coffee-shop-test-media"),
        nats_url: None,
    }
}

pub fn state(pool: PgPool) -> AppState {
    state_with_vnpay(pool, VNPAY_API_URL)
}

pub fn state_with_vnpay(pool: PgPool, vnpay_api_url: &str) -> AppState {
    AppState::new(config(vnpay_api_url), pool, Mailer::log_only(), EventPublisher::default())
}

pub async fn seed_user(pool: &PgPool, email: &str, role: RoleName) -> CurrentUser {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, role_id) VALUES ($1, 'x', (SELECT id FROM roles WHERE name = $2)) RETURNING id",
    )
    .bind(email)
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap();
    CurrentUser { id, email: email.to_string(), role }
}

pub async fn seed_address(pool: &PgPool, user_id: i64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO shipping_addresses (user_id, receiver_name, receiver_phone, location) \
         VALUES ($1, 'Lan', '0901234567', '12 Nguyen Trai') RETURNING id",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_product(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO products (name) VALUES ($1) RETURNING id").bind(name).fetch_one(pool).await.unwrap()
}

pub async fn seed_type(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO type_products (name) VALUES ($1) RETURNING id").bind(name).fetch_one(pool).await.unwrap()
}

/// Product item with its own product and size; returns the item id.
pub async fn seed_item(pool: &PgPool, name: &str, price: i64, stock: i32) -> i64 {
    let product_id = seed_product(pool, name).await;
    let type_id = seed_type(pool, &format!("{name} size")).await;
    sqlx::query_scalar("INSERT INTO product_items (product_id, type_id, price, stock) VALUES ($1, $2, $3, $4) RETURNING id")
        .bind(product_id)
        .bind(type_id)
        .bind(Decimal::from(price))
        .bind(stock)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn stock_of(pool: &PgPool, product_item_id: i64) -> i32 {
    sqlx::query_scalar("SELECT stock FROM product_items WHERE id = $1").bind(product_item_id).fetch_one(pool).await.unwrap()
}

/// Local stand-in for the VNPay refund API answering every call with `response_code`.
pub struct FakeVnPay {
    pub url: String,
    calls: Arc<AtomicUsize>,
}

impl FakeVnPay {
    pub async fn start(response_code: &'static str) -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/api",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(serde_json::json!({ "vnp_ResponseCode": response_code }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, app).await });
        Self { url, calls }
    }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}
