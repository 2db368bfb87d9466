//! VNPay checkout, return, refund and recorded transactions.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    response::Redirect,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::message::MessageBuilder;
use crate::routes::extract::{Json, Path, Query};
use crate::routes::{client_ip, ok, ApiResult};
use crate::security::{AdminUser, CurrentUser};
use crate::services::payments::{PaymentService, TransactionRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct AmountParams { amount: Option<i64> }

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/payment/vnpay", get(create_payment))
        .route("/payment/vnpay-return", get(vnpay_return))
        .route("/payment/vnpay-refund/:order_id", post(refund))
        .route("/transactions", post(add_transaction))
        .route("/transactions/:order_id", get(get_transaction))
}

async fn create_payment(
    State(s): State<AppState>,
    msg: MessageBuilder,
    _user: CurrentUser,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Query(p): Query<AmountParams>,
) -> ApiResult {
    let ip = client_ip(&headers, peer.as_ref());
    ok(&msg, PaymentService::new(&s).create_payment(p.amount, &ip)?)
}

async fn vnpay_return(State(s): State<AppState>, Query(params): Query<BTreeMap<String, String>>) -> Redirect {
    Redirect::to(&PaymentService::new(&s).handle_return(&params))
}

async fn refund(
    State(s): State<AppState>,
    msg: MessageBuilder,
    _admin: AdminUser,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    Path(order_id): Path<i64>,
) -> ApiResult {
    let ip = client_ip(&headers, peer.as_ref());
    ok(&msg, PaymentService::new(&s).refund(order_id, &ip).await?)
}

async fn add_transaction(
    State(s): State<AppState>,
    msg: MessageBuilder,
    user: CurrentUser,
    Json(req): Json<TransactionRequest>,
) -> ApiResult {
    ok(&msg, PaymentService::new(&s).add_transaction(&user, &req).await?)
}

async fn get_transaction(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Path(order_id): Path<i64>) -> ApiResult {
    ok(&msg, PaymentService::new(&s).get_transaction(&user, order_id).await?)
}
