use axum::{extract::State, routing::get, Router};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::AppError;
use crate::message::MessageBuilder;
use crate::routes::extract::Query;
use crate::routes::{ok, ApiResult};
use crate::security::AdminUser;
use crate::services::statistics::StatisticService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
struct PeriodParams { start: Option<NaiveDate>, end: Option<NaiveDate> }

#[derive(Debug, Default, Deserialize)]
struct MonthParams { month: Option<u32>, year: Option<i32> }

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/statistics/top-products", get(top_products))
        .route("/statistics/top-products/monthly", get(top_products_monthly))
        .route("/statistics/top-customers", get(top_customers))
        .route("/statistics/top-customers/monthly", get(top_customers_monthly))
}

/// Unparseable parameters count as missing, which the service reports with its own message.
fn params_or_default<T: Default>(params: Result<Query<T>, AppError>) -> T {
    params.map(|Query(p)| p).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Ignoring malformed statistics parameters");
        T::default()
    })
}

async fn top_products_monthly(
    State(s): State<AppState>,
    msg: MessageBuilder,
    _admin: AdminUser,
    params: Result<Query<PeriodParams>, AppError>,
) -> ApiResult {
    let p = params_or_default(params);
    ok(&msg, StatisticService::new(&s).top5_monthly_selling_products(p.start, p.end).await?)
}

async fn top_products(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser) -> ApiResult {
    ok(&msg, StatisticService::new(&s).top5_best_selling_products().await?)
}

async fn top_customers(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser) -> ApiResult {
    ok(&msg, StatisticService::new(&s).top5_best_customers().await?)
}

async fn top_customers_monthly(
    State(s): State<AppState>,
    msg: MessageBuilder,
    _admin: AdminUser,
    params: Result<Query<MonthParams>, AppError>,
) -> ApiResult {
    let p = params_or_default(params);
    ok(&msg, StatisticService::new(&s).top5_monthly_customers(p.month, p.year).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use sqlx::PgPool;
    use tower::ServiceExt;

    use crate::domain::value_objects::RoleName;
    use crate::routes::build_router;
    use crate::security::jwt::TokenType;
    use crate::test_support::{seed_user, state};

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
    async fn malformed_month_is_a_system_error(pool: PgPool) {
        let state = state(pool.clone());
        let admin = seed_user(&pool, "admin@shop.vn", RoleName::Admin).await;
        let token = state.tokens().issue(&admin.email, admin.role, TokenType::Access).unwrap();

        let req = Request::get("/api/v1/statistics/top-customers/monthly?month=june&year=2024")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let res = build_router(state).oneshot(req).await.unwrap();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["respCode"], "500");
        assert_eq!(body["respDesc"], "Error getting top 5 monthly customers");
    }
}
