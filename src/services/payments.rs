//! Payment transactions and the VNPay flows built on them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::db::orders::{OrderRepository, OrderRow};
use crate::db::transactions::{self, NewTransaction, TransactionRepository, TransactionRow};
use crate::error::AppError;
use crate::message::codes;
use crate::payment::{vnpay::{COMMAND_PAY, COMMAND_REFUND}, PaymentResponse};
use crate::security::CurrentUser;
use crate::services::{orders::PendingCancel, required};
use crate::state::AppState;

const TRANSACTION_NOT_FOUND: &str = "Transaction not found";

/// Payment reported by the frontend after a successful VNPay return.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub order_id: Option<i64>,
    pub amount: Option<i64>,
    pub transaction_no: Option<String>,
    pub pay_date: Option<DateTime<Utc>>,
    pub txn_ref: Option<String>,
}

pub struct PaymentService<'a> { state: &'a AppState }

impl<'a> PaymentService<'a> {
    pub const fn new(state: &'a AppState) -> Self { Self { state } }

    fn transactions(&self) -> TransactionRepository<'a> { TransactionRepository::new(self.state.db()) }

    async fn find_order(&self, order_id: i64) -> Result<Option<OrderRow>, AppError> {
        Ok(OrderRepository::new(self.state.db()).find(order_id).await?)
    }

    async fn payment_of(&self, order_id: i64) -> Result<TransactionRow, AppError> {
        self.transactions().find_payment(order_id).await?.ok_or_else(|| AppError::not_found(TRANSACTION_NOT_FOUND))
    }

    pub async fn add_transaction(&self, current: &CurrentUser, req: &TransactionRequest) -> Result<TransactionRow, AppError> {
        let order_id = req.order_id.ok_or_else(|| AppError::not_null("Order id must be not null"))?;
        let amount = req.amount.filter(|a| *a > 0).ok_or_else(|| AppError::not_valid("amount must be greater than 0"))?;
        let txn_ref = required(&req.txn_ref, "Transaction reference must be not null")?;
        let order = self.find_order(order_id).await?.ok_or_else(|| AppError::not_found("Order not found"))?;
        current.ensure_owner_or_admin(order.user_id)?;
        let row = self
            .transactions()
            .create(&NewTransaction {
                order_id,
                amount,
                txn_ref,
                transaction_no: req.transaction_no.as_deref(),
                command: COMMAND_PAY,
                pay_date: req.pay_date.unwrap_or_else(Utc::now),
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, order_id, "Cannot save transaction");
                AppError::business(codes::UNDEFINED, "Cannot save transaction")
            })?;
        tracing::info!(order_id, txn_ref, amount, "Payment transaction recorded");
        Ok(row)
    }

    pub async fn get_transaction(&self, current: &CurrentUser, order_id: i64) -> Result<TransactionRow, AppError> {
        let payment = self.payment_of(order_id).await?;
        let order = self.find_order(order_id).await?.ok_or_else(|| AppError::not_found(TRANSACTION_NOT_FOUND))?;
        current.ensure_owner_or_admin(order.user_id)?;
        Ok(payment)
    }

    pub fn create_payment(&self, amount: Option<i64>, client_ip: &str) -> Result<PaymentResponse, AppError> {
        let amount = amount.ok_or_else(|| AppError::not_null("amount must be not null"))?;
        self.state.vnpay().create_payment(amount, client_ip, Utc::now())
    }

    pub fn handle_return(&self, params: &BTreeMap<String, String>) -> String {
        self.state.vnpay().return_redirect(params)
    }

    /// Refunds the order's payment in full and cancels the order.
    ///
    /// The order must still be cancellable before VNPay is called. After VNPay
    /// accepts, the cancellation and the refund row commit together.
    pub async fn refund(&self, order_id: i64, client_ip: &str) -> Result<TransactionRow, AppError> {
        let payment = self.payment_of(order_id).await?;
        let order = self.find_order(order_id).await?.ok_or_else(|| AppError::not_found("No order found"))?;
        let pending = PendingCancel::new(&order)?;

        let vnpay = self.state.vnpay();
        let request = vnpay.refund_request(
            &payment.txn_ref,
            payment.amount,
            payment.transaction_no.as_deref().unwrap_or_default(),
            payment.pay_date,
            client_ip,
            Utc::now(),
        )?;
        let outcome = vnpay.send_refund(&request).await?;
        if outcome.response_code != "00" {
            tracing::warn!(order_id, code = %outcome.response_code, "VNPay refused refund");
            return Err(AppError::not_found(TRANSACTION_NOT_FOUND));
        }

        let saved = self.record_refund(&pending, &payment, &outcome.txn_ref).await;
        let (row, cancelled) = saved.map_err(|e| {
            tracing::error!(error = %e, order_id, txn_ref = %outcome.txn_ref, "VNPay refunded but the refund was not recorded");
            AppError::system("Cannot save transaction")
        })?;
        if cancelled {
            pending.finish(self.state).await;
        } else {
            tracing::warn!(order_id, "Refund recorded but the order status changed meanwhile");
        }
        tracing::info!(order_id, txn_ref = %outcome.txn_ref, "Order refunded");
        Ok(row)
    }

    async fn record_refund(
        &self,
        pending: &PendingCancel,
        payment: &TransactionRow,
        txn_ref: &str,
    ) -> Result<(TransactionRow, bool), AppError> {
        let mut tx = self.state.db().begin().await?;
        let cancelled = pending.apply(&mut *tx).await?;
        let row = transactions::insert_transaction(
            &mut *tx,
            &NewTransaction {
                order_id: payment.order_id,
                amount: payment.amount,
                txn_ref,
                transaction_no: payment.transaction_no.as_deref(),
                command: COMMAND_REFUND,
                pay_date: Utc::now(),
            },
        )
        .await?;
        tx.commit().await?;
        Ok((row, cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    use crate::domain::aggregates::OrderStatus;
    use crate::domain::value_objects::{PaymentMethod, RoleName};
    use crate::services::orders::{OrderItemRequest, OrderRequest, OrderService};
    use crate::test_support::{seed_address, seed_item, seed_user, state_with_vnpay, stock_of, FakeVnPay, VNPAY_API_URL};

    fn payment(order_id: i64) -> TransactionRequest {
        TransactionRequest {
            order_id: Some(order_id),
            amount: Some(9_000_000),
            transaction_no: Some("14422574".into()),
            pay_date: None,
            txn_ref: Some("48392017".into()),
        }
    }

    /// A paid VNPay order for a fresh user, with one line taking 2 of 10 in stock.
    async fn paid_order(state: &AppState, pool: &PgPool) -> (CurrentUser, i64, i64) {
        let user = seed_user(pool, "lan@shop.vn", RoleName::User).await;
        let address = seed_address(pool, user.id).await;
        let latte = seed_item(pool, "Latte", 45_000, 10).await;
        let req = OrderRequest {
            shipping_address_id: Some(address),
            payment_method: Some(PaymentMethod::Vnpay),
            order_items: vec![OrderItemRequest { product_item_id: Some(latte), amount: Some(2), ..Default::default() }],
        };
        let order = OrderService::new(state).add(&user, &req).await.unwrap();
        PaymentService::new(state).add_transaction(&user, &payment(order.id)).await.unwrap();
        (user, order.id, latte)
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
    async fn refund_cancels_the_order_and_records_the_refund(pool: PgPool) {
        let vnpay = FakeVnPay::start("00").await;
        let state = state_with_vnpay(pool.clone(), &vnpay.url);
        let (user, order_id, latte) = paid_order(&state, &pool).await;

        let refund = PaymentService::new(&state).refund(order_id, "127.0.0.1").await.unwrap();
        assert_eq!(refund.command, COMMAND_REFUND);
        assert_eq!(refund.amount, 9_000_000);
        assert_eq!(vnpay.calls(), 1);

        let order = OrderService::new(&state).get_by_id(&user, order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(stock_of(&pool, latte).await, 10);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
    async fn shipped_orders_are_not_refunded(pool: PgPool) {
        let vnpay = FakeVnPay::start("00").await;
        let state = state_with_vnpay(pool.clone(), &vnpay.url);
        let (_, order_id, latte) = paid_order(&state, &pool).await;
        sqlx::query("UPDATE orders SET status = 'Processed' WHERE id = $1").bind(order_id).execute(&pool).await.unwrap();

        let err = PaymentService::new(&state).refund(order_id, "127.0.0.1").await.unwrap_err();
        assert_eq!(err.code(), codes::FIELD_NOT_VALID);
        assert_eq!(vnpay.calls(), 0);
        assert_eq!(stock_of(&pool, latte).await, 8);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
    async fn refused_refund_leaves_the_order_alone(pool: PgPool) {
        let vnpay = FakeVnPay::start("94").await;
        let state = state_with_vnpay(pool.clone(), &vnpay.url);
        let (user, order_id, latte) = paid_order(&state, &pool).await;

        let err = PaymentService::new(&state).refund(order_id, "127.0.0.1").await.unwrap_err();
        assert_eq!((err.code(), err.to_string().as_str()), (codes::NOT_FOUND, TRANSACTION_NOT_FOUND));
        assert_eq!(vnpay.calls(), 1);
        let order = OrderService::new(&state).get_by_id(&user, order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(stock_of(&pool, latte).await, 8);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
    async fn transactions_belong_to_the_order_owner(pool: PgPool) {
        let state = state_with_vnpay(pool.clone(), VNPAY_API_URL);
        let (user, order_id, _) = paid_order(&state, &pool).await;
        let stranger = seed_user(&pool, "binh@shop.vn", RoleName::User).await;
        let admin = seed_user(&pool, "admin@shop.vn", RoleName::Admin).await;
        let service = PaymentService::new(&state);

        assert_eq!(service.get_transaction(&stranger, order_id).await.unwrap_err().code(), codes::FORBIDDEN);
        assert_eq!(service.add_transaction(&stranger, &payment(order_id)).await.unwrap_err().code(), codes::FORBIDDEN);
        assert_eq!(service.get_transaction(&user, order_id).await.unwrap().txn_ref, "48392017");
        assert_eq!(service.get_transaction(&admin, order_id).await.unwrap().order_id, order_id);
    }
}
