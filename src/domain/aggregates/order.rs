//! Order Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{Money, PaymentMethod, Quantity};
use crate::domain::events::{DomainEvent, OrderEvent};

#[derive(Clone, Debug)]
pub struct Order {
    id: i64,
    user_id: i64,
    status: OrderStatus,
    payment_method: PaymentMethod,
    items: Vec<LineItem>,
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug)] pub struct LineItem { pub product_item_id: i64, pub quantity: Quantity, pub unit: Money }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status")]
pub enum OrderStatus { #[default] Processing, Processed, Shipping, Completed, Cancelled }

impl OrderStatus {
    /// Next step of the fulfilment chain.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Processing => Some(Self::Processed),
            Self::Processed => Some(Self::Shipping),
            Self::Shipping => Some(Self::Completed),
            Self::Completed | Self::Cancelled => None,
        }
    }
    pub fn is_cancellable(self) -> bool { self == Self::Processing }
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "Processing", Self::Processed => "Processed", Self::Shipping => "Shipping",
            Self::Completed => "Completed", Self::Cancelled => "Cancelled",
        }
    }
    pub fn parse(value: &str) -> Option<Self> {
        [Self::Processing, Self::Processed, Self::Shipping, Self::Completed, Self::Cancelled]
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl Order {
    /// New order awaiting processing.
    pub fn place(user_id: i64, payment_method: PaymentMethod, items: Vec<LineItem>) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        Ok(Self { id: 0, user_id, status: OrderStatus::Processing, payment_method, items, events: vec![] })
    }

    /// Rebuilds an existing order for a status change.
    pub fn restore(id: i64, user_id: i64, status: OrderStatus, payment_method: PaymentMethod) -> Self {
        Self { id, user_id, status, payment_method, items: vec![], events: vec![] }
    }

    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn total(&self) -> Decimal { self.items.iter().map(|i| i.unit.line_total(i.quantity)).sum() }

    /// Records the id assigned by storage and announces the order.
    pub fn persisted(&mut self, id: i64) {
        self.id = id;
        self.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: id, user_id: self.user_id, total: self.total() }));
    }

    pub fn advance(&mut self) -> Result<OrderStatus, OrderError> {
        let next = self.status.next().ok_or(OrderError::FinalStatus(self.status))?;
        let from = self.status;
        self.status = next;
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: next }));
        Ok(next)
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.status.is_cancellable() { return Err(OrderError::CannotCancel(self.status)); }
        self.status = OrderStatus::Cancelled;
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { NoItems, FinalStatus(OrderStatus), CannotCancel(OrderStatus) }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "Order must have at least one item"),
            Self::FinalStatus(s) => write!(f, "Order status {s} can not be updated"),
            Self::CannotCancel(s) => write!(f, "Order in status {s} can not be cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latte(qty: i32) -> LineItem {
        LineItem { product_item_id: 7, quantity: Quantity::new(qty).unwrap(), unit: Money::new(Decimal::new(45_000, 0), Decimal::new(5_000, 0)).unwrap() }
    }

    #[test]
    fn test_order_workflow() {
        let mut order = Order::place(3, PaymentMethod::Cod, vec![latte(2)]).unwrap();
        order.persisted(11);
        assert_eq!(order.total(), Decimal::new(80_000, 0));
        assert_eq!(order.advance().unwrap(), OrderStatus::Processed);
        assert_eq!(order.advance().unwrap(), OrderStatus::Shipping);
        assert_eq!(order.advance().unwrap(), OrderStatus::Completed);
        assert_eq!(order.advance(), Err(OrderError::FinalStatus(OrderStatus::Completed)));
        assert_eq!(order.take_events().len(), 4);
        assert!(order.take_events().is_empty());
    }

    #[test]
    fn test_empty_order_rejected() {
        assert_eq!(Order::place(1, PaymentMethod::Vnpay, vec![]).unwrap_err(), OrderError::NoItems);
    }

    #[test]
    fn test_cancel_only_while_processing() {
        let mut order = Order::restore(5, 1, OrderStatus::Processing, PaymentMethod::Cod);
        order.cancel().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert!(order.advance().is_err());

        let mut shipped = Order::restore(6, 1, OrderStatus::Shipping, PaymentMethod::Cod);
        assert_eq!(shipped.cancel(), Err(OrderError::CannotCancel(OrderStatus::Shipping)));
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(OrderStatus::parse("shipping"), Some(OrderStatus::Shipping));
        assert_eq!(OrderStatus::parse("Done"), None);
    }
}
