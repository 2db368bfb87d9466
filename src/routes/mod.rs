//! HTTP surface: every route lives under `/api/v1` and answers with a
//! `RespMessage` envelope.

mod account;
mod catalog;
mod chat;
pub mod extract;
mod payment;
mod shop;
mod statistics;

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Multipart},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::error::AppError;
use crate::message::{MessageBuilder, RespMessage};
use crate::services::catalog::Upload;
use crate::state::AppState;
use crate::storage::MEDIA_PREFIX;

pub type ApiResult = Result<Json<RespMessage>, AppError>;

/// Wraps `data` in a success envelope.
pub(crate) fn ok<T: Serialize>(msg: &MessageBuilder, data: T) -> ApiResult {
    Ok(Json(msg.success(data)?))
}

pub fn build_router(state: AppState) -> Router {
    let media = ServeDir::new(state.storage().root().to_path_buf());
    let api = Router::new()
        .merge(account::routes())
        .merge(catalog::routes())
        .merge(shop::routes())
        .merge(chat::routes())
        .merge(payment::routes())
        .merge(statistics::routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .nest_service(MEDIA_PREFIX, media)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "healthy", "service": "coffee-shop" })))
}

/// Caller address: first `X-Forwarded-For` hop, else the socket peer.
pub(crate) fn client_ip(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

/// Text fields and file parts of a multipart form.
#[derive(Debug, Default)]
pub(crate) struct Form {
    pub fields: Vec<(String, String)>,
    pub files: Vec<Upload>,
}

impl Form {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(|e| AppError::not_valid(e.body_text()))? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(|e| AppError::not_valid(e.body_text()))?;
                    if !bytes.is_empty() {
                        form.files.push(Upload { bytes: bytes.to_vec(), file_name });
                    }
                }
                None => {
                    let text = field.text().await.map_err(|e| AppError::not_valid(e.body_text()))?;
                    form.fields.push((name, text));
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::test_support;

    fn test_state() -> AppState {
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/coffee_shop_test").unwrap();
        test_support::state(pool)
    }

    async fn call(req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = build_router(test_state()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn health_check() {
        let (status, body) = call(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn protected_route_without_token_is_401() {
        let (status, body) = call(Request::get("/api/v1/orders/me").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["respCode"], "401");
        assert!(body["respDesc"].as_str().unwrap().starts_with("Authentication error"));
    }

    #[tokio::test]
    async fn garbage_token_is_401() {
        let req = Request::get("/api/v1/users")
            .header("Authorization", "Bearer not.a.jwt")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["respCode"], "401");
    }

    #[tokio::test]
    async fn refresh_requires_bearer_header() {
        let (status, body) = call(Request::post("/api/v1/auth/refresh").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["respCode"], "101");
        assert_eq!(body["respDesc"], "Invalid refresh token");
    }

    #[tokio::test]
    async fn login_validates_before_touching_the_database() {
        let req = Request::post("/api/v1/auth/login")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"email":"","password":"x"}"#))
            .unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["respCode"], "100");
    }

    #[tokio::test]
    async fn malformed_json_gets_an_envelope() {
        let req = Request::post("/api/v1/auth/login")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["respCode"], "101");
        assert!(body["respDesc"].as_str().unwrap().contains("JSON"));
    }

    #[tokio::test]
    async fn non_numeric_path_id_gets_an_envelope() {
        let (status, body) = call(Request::get("/api/v1/products/latte").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["respCode"], "101");
    }

    #[tokio::test]
    async fn payment_return_redirects_to_failure_page() {
        let req = Request::get("/api/v1/payment/vnpay-return?vnp_ResponseCode=24").body(Body::empty()).unwrap();
        let res = build_router(test_state()).oneshot(req).await.unwrap();
        assert!(res.status().is_redirection());
        assert_eq!(res.headers()["location"], "http://localhost:3000/order-status?status=fail");
    }

    #[test]
    fn client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        let peer = ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 5123)));
        assert_eq!(client_ip(&headers, Some(&peer)), "10.0.0.7");
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(&peer)), "203.0.113.9");
        assert_eq!(client_ip(&HeaderMap::new(), None), "127.0.0.1");
    }
}
