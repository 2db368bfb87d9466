//! Domain events
use crate::domain::aggregates::OrderStatus;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", content = "event")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::ItemCreated { .. }) => "coffee_shop.product.item_created",
            Self::Order(OrderEvent::Placed { .. }) => "coffee_shop.order.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "coffee_shop.order.status_changed",
            Self::Order(OrderEvent::Cancelled { .. }) => "coffee_shop.order.cancelled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    ItemCreated { product_id: i64, type_id: i64 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: i64, user_id: i64, total: Decimal },
    StatusChanged { order_id: i64, from: OrderStatus, to: OrderStatus },
    Cancelled { order_id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_event_payload() {
        let e = DomainEvent::Order(OrderEvent::StatusChanged { order_id: 9, from: OrderStatus::Processing, to: OrderStatus::Processed });
        assert_eq!(e.subject(), "coffee_shop.order.status_changed");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["aggregate"], "Order");
        assert_eq!(json["event"]["type"], "status_changed");
        assert_eq!(json["event"]["to"], "Processed");
    }
}
