//! Product item Aggregate

use rust_decimal::Decimal;
use crate::domain::value_objects::{positive_id, Money, MoneyError};
use crate::domain::events::{DomainEvent, ProductEvent};

/// A sellable variant of a product (e.g. a size) with its own price and stock.
#[derive(Clone, Debug)]
pub struct ProductItem {
    product_id: i64,
    type_id: i64,
    money: Money,
    stock: i32,
    events: Vec<DomainEvent>,
}

impl ProductItem {
    pub fn create(product_id: i64, type_id: i64, price: Decimal, stock: i32, discount: Decimal) -> Result<Self, ProductError> {
        let money = Money::new(price, discount).map_err(ProductError::Money)?;
        if stock < 0 { return Err(ProductError::NegativeStock); }
        if !positive_id(product_id) { return Err(ProductError::InvalidProductId); }
        if !positive_id(type_id) { return Err(ProductError::InvalidTypeId); }
        let mut item = Self { product_id, type_id, money, stock, events: vec![] };
        item.raise_event(DomainEvent::Product(ProductEvent::ItemCreated { product_id, type_id }));
        Ok(item)
    }

    pub fn product_id(&self) -> i64 { self.product_id }
    pub fn type_id(&self) -> i64 { self.type_id }
    pub fn price(&self) -> Decimal { self.money.price() }
    pub fn discount(&self) -> Decimal { self.money.discount() }
    pub fn stock(&self) -> i32 { self.stock }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductError { Money(MoneyError), NegativeStock, InvalidProductId, InvalidTypeId }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Money(e) => write!(f, "{e}"),
            Self::NegativeStock => write!(f, "Stock can not be negative"),
            Self::InvalidProductId => write!(f, "Product id must be greater than 0"),
            Self::InvalidTypeId => write!(f, "Type id must be greater than 0"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_item_created() {
        let mut item = ProductItem::create(1, 2, Decimal::new(30_000, 0), 5, Decimal::new(2_000, 0)).unwrap();
        assert_eq!((item.price(), item.discount(), item.stock()), (Decimal::new(30_000, 0), Decimal::new(2_000, 0), 5));
        let events = item.take_events();
        assert_eq!(events, vec![DomainEvent::Product(ProductEvent::ItemCreated { product_id: 1, type_id: 2 })]);
        assert!(item.take_events().is_empty());
    }
    #[test]
    fn test_validation_messages() {
        let err = ProductItem::create(1, 1, Decimal::new(-5, 0), 1, Decimal::ZERO).unwrap_err();
        assert_eq!(err.to_string(), "Price can not be negative");
        let err = ProductItem::create(1, 1, Decimal::ONE, -1, Decimal::ZERO).unwrap_err();
        assert_eq!(err.to_string(), "Stock can not be negative");
        let err = ProductItem::create(1, 1, Decimal::ONE, 1, Decimal::new(-1, 0)).unwrap_err();
        assert_eq!(err.to_string(), "Discount can not be negative");
        let err = ProductItem::create(1, 1, Decimal::new(20_000, 0), 1, Decimal::new(25_000, 0)).unwrap_err();
        assert_eq!(err, ProductError::Money(MoneyError::DiscountExceedsPrice));
        assert_eq!(ProductItem::create(0, 1, Decimal::ONE, 1, Decimal::ZERO).unwrap_err(), ProductError::InvalidProductId);
        assert_eq!(ProductItem::create(1, -2, Decimal::ONE, 1, Decimal::ZERO).unwrap_err(), ProductError::InvalidTypeId);
    }
}
