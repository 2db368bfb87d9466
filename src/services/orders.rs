//! Order placement and fulfilment.
//!
//! Placement and cancellation each run in a single database transaction so
//! stock, order rows and cart lines never disagree. Status changes are
//! compare-and-set on the current status.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::db::addresses::AddressRepository;
use crate::db::carts::remove_ordered_lines;
use crate::db::orders::{self, OrderItemRow, OrderRepository, OrderRow};
use crate::db::products::ProductRepository;
use crate::domain::aggregates::{LineItem, Order, OrderError, OrderStatus};
use crate::domain::value_objects::{Money, PaymentMethod, Quantity};
use crate::error::{AppError, ResultExt};
use crate::security::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_item_id: Option<i64>,
    pub amount: Option<i32>,
    pub price: Option<Decimal>,
    pub discount: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub shipping_address_id: Option<i64>,
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub order_items: Vec<OrderItemRequest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressSummary { pub id: i64, pub receiver_name: String, pub receiver_phone: String, pub location: String }

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: i64,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub user_id: i64,
    pub shipping_address: ShippingAddressSummary,
    pub total: Decimal,
    pub order_items: Vec<OrderItemRow>,
}

impl OrderResponse {
    fn new(row: OrderRow, order_items: Vec<OrderItemRow>) -> Self {
        Self {
            id: row.id,
            order_date: row.order_date,
            status: row.status,
            payment_method: row.payment_method,
            user_id: row.user_id,
            shipping_address: ShippingAddressSummary {
                id: row.shipping_address_id,
                receiver_name: row.receiver_name,
                receiver_phone: row.receiver_phone,
                location: row.location,
            },
            total: row.total,
            order_items,
        }
    }
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::NoItems => AppError::not_null(e.to_string()),
            OrderError::FinalStatus(_) | OrderError::CannotCancel(_) => AppError::not_valid(e.to_string()),
        }
    }
}

/// Requested quantity per product item, in first-seen order; repeated items are merged.
fn requested_lines(items: &[OrderItemRequest]) -> Result<Vec<(i64, Quantity)>, AppError> {
    let mut lines: Vec<(i64, Quantity)> = Vec::with_capacity(items.len());
    for item in items {
        let id = item
            .product_item_id
            .filter(|id| *id > 0)
            .ok_or_else(|| AppError::not_null("Product item id must be not null"))?;
        let qty = item.amount.and_then(Quantity::new).ok_or_else(|| AppError::not_valid("Amount must be greater than 0"))?;
        match lines.iter_mut().find(|(seen, _)| *seen == id) {
            Some((_, total)) => *total = total.add(qty),
            None => lines.push((id, qty)),
        }
    }
    Ok(lines)
}

pub struct OrderService<'a> { state: &'a AppState }

impl<'a> OrderService<'a> {
    pub const fn new(state: &'a AppState) -> Self { Self { state } }

    fn orders(&self) -> OrderRepository<'a> { OrderRepository::new(self.state.db()) }

    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<OrderResponse>, AppError> {
        if rows.is_empty() { return Ok(vec![]); }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut by_order: HashMap<i64, Vec<OrderItemRow>> = HashMap::new();
        for item in self.orders().items_for(&ids).await? {
            by_order.entry(item.order_id).or_default().push(item);
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                OrderResponse::new(row, items)
            })
            .collect())
    }

    async fn load(&self, id: i64) -> Result<OrderRow, AppError> {
        self.orders().find(id).await?.ok_or_else(|| AppError::not_found("Order not found"))
    }

    pub async fn get_all(&self) -> Result<Vec<OrderResponse>, AppError> {
        let rows = self.orders().list_all().await?;
        self.with_items(rows).await
    }

    pub async fn get_by_id(&self, current: &CurrentUser, id: i64) -> Result<OrderResponse, AppError> {
        let row = self.load(id).await?;
        current.ensure_owner_or_admin(row.user_id)?;
        let items = self.orders().items_for(&[id]).await?;
        Ok(OrderResponse::new(row, items))
    }

    pub async fn by_user(&self, current: &CurrentUser) -> Result<Vec<OrderResponse>, AppError> {
        let rows = self.orders().list_by_user(current.id).await?;
        self.with_items(rows).await
    }

    pub async fn by_status(&self, status: &str) -> Result<Vec<OrderResponse>, AppError> {
        let status = OrderStatus::parse(status).ok_or_else(|| AppError::not_valid(format!("Order status {status} is not valid")))?;
        let rows = self.orders().list_by_status(status).await?;
        self.with_items(rows).await
    }

    pub async fn get_all_order_items(&self) -> Result<Vec<OrderItemRow>, AppError> {
        Ok(self.orders().list_all_items().await?)
    }

    pub async fn add(&self, current: &CurrentUser, req: &OrderRequest) -> Result<OrderResponse, AppError> {
        let address_id = req.shipping_address_id.ok_or_else(|| AppError::not_null("Shipping address must be not null"))?;
        let payment_method = req.payment_method.ok_or_else(|| AppError::not_null("Payment method must be not null"))?;
        let address = AddressRepository::new(self.state.db())
            .find(address_id)
            .await?
            .filter(|a| a.status.is_active() && a.user_id == current.id)
            .ok_or_else(|| AppError::not_found("Shipping address not found"))?;

        // Prices come from the catalog, never from the request.
        let products = ProductRepository::new(self.state.db());
        let mut lines = Vec::with_capacity(req.order_items.len());
        for (product_item_id, quantity) in requested_lines(&req.order_items)? {
            let item = products
                .find_item(product_item_id)
                .await?
                .filter(|i| i.status.is_active())
                .ok_or_else(|| AppError::field_not_found("Product item not found"))?;
            if !quantity.fits(item.stock) {
                return Err(AppError::not_valid("Not enough stock"));
            }
            let unit = Money::new(item.price, item.discount).map_err(|e| AppError::not_valid(e.to_string()))?;
            lines.push(LineItem { product_item_id, quantity, unit });
        }
        let mut order = Order::place(current.id, payment_method, lines)?;

        let mut tx = self.state.db().begin().await?;
        let order_id = orders::insert_order(&mut *tx, current.id, address.id, order.payment_method())
            .await
            .or_system("Error when add order")?;
        for line in order.items() {
            orders::insert_item(&mut *tx, order_id, line.product_item_id, line.quantity.as_i32(), line.unit.price(), line.unit.discount())
                .await
                .or_system("Error when add order")?;
            if !orders::decrement_stock(&mut *tx, line.product_item_id, line.quantity.as_i32()).await? {
                return Err(AppError::not_valid("Not enough stock"));
            }
        }
        let ordered: Vec<i64> = order.items().iter().map(|l| l.product_item_id).collect();
        remove_ordered_lines(&mut *tx, current.id, &ordered).await?;
        tx.commit().await?;

        order.persisted(order_id);
        tracing::info!(order_id, user_id = current.id, total = %order.total(), "Order placed");
        self.state.events().publish_all(order.take_events()).await;

        let row = self.load(order_id).await?;
        let items = self.orders().items_for(&[order_id]).await?;
        Ok(OrderResponse::new(row, items))
    }

    /// Moves the order one step along the fulfilment chain.
    pub async fn update_status(&self, id: i64) -> Result<OrderResponse, AppError> {
        let row = self.load(id).await?;
        let mut order = Order::restore(row.id, row.user_id, row.status, row.payment_method);
        let from = order.status();
        let to = order.advance()?;

        let mut conn = self.state.db().acquire().await?;
        if !orders::transition_status(&mut *conn, id, from, to).await? {
            return Err(AppError::not_valid(STATUS_RACE));
        }
        tracing::info!(order_id = id, %from, %to, "Order status updated");
        self.state.events().publish_all(order.take_events()).await;

        let row = self.load(id).await?;
        let items = self.orders().items_for(&[id]).await?;
        Ok(OrderResponse::new(row, items))
    }

    pub async fn cancel(&self, current: &CurrentUser, id: i64) -> Result<OrderResponse, AppError> {
        let row = self.load(id).await?;
        current.ensure_owner_or_admin(row.user_id)?;
        self.cancel_order(row).await?;
        let row = self.load(id).await?;
        let items = self.orders().items_for(&[id]).await?;
        Ok(OrderResponse::new(row, items))
    }

    async fn cancel_order(&self, row: OrderRow) -> Result<(), AppError> {
        let pending = PendingCancel::new(&row)?;
        let mut tx = self.state.db().begin().await?;
        if !pending.apply(&mut *tx).await? {
            return Err(AppError::not_valid(STATUS_RACE));
        }
        tx.commit().await?;
        pending.finish(self.state).await;
        Ok(())
    }
}

const STATUS_RACE: &str = "Order status was changed by another request";

/// A cancellation that passed the status check and waits to be written.
pub(crate) struct PendingCancel {
    order: Order,
    order_id: i64,
    user_id: i64,
    from: OrderStatus,
}

impl PendingCancel {
    /// Checks that the order can be cancelled, without writing anything or checking ownership.
    pub(crate) fn new(row: &OrderRow) -> Result<Self, AppError> {
        let mut order = Order::restore(row.id, row.user_id, row.status, row.payment_method);
        let from = order.status();
        order.cancel()?;
        Ok(Self { order, order_id: row.id, user_id: row.user_id, from })
    }

    /// Cancels and puts the stock back inside the caller's transaction.
    /// `false` when the status moved since the check; nothing is written then.
    pub(crate) async fn apply(&self, conn: &mut PgConnection) -> Result<bool, AppError> {
        if !orders::transition_status(&mut *conn, self.order_id, self.from, self.order.status()).await? {
            return Ok(false);
        }
        orders::restore_stock(conn, self.order_id).await.or_system("Error when cancel order")?;
        Ok(true)
    }

    /// Publishes the cancellation once the transaction committed.
    pub(crate) async fn finish(mut self, state: &AppState) {
        tracing::info!(order_id = self.order_id, user_id = self.user_id, "Order cancelled");
        state.events().publish_all(self.order.take_events()).await;
    }
}
