//! Value Objects for the coffee shop

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle flag used for soft deletes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entity_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status { #[default] Active, Inactive }

impl Status {
    pub fn is_active(self) -> bool { self == Self::Active }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "role_name")]
pub enum RoleName {
    #[sqlx(rename = "ROLE_ADMIN")] #[serde(rename = "ROLE_ADMIN")] Admin,
    #[sqlx(rename = "ROLE_USER")] #[serde(rename = "ROLE_USER")] User,
}

impl RoleName {
    pub fn as_str(self) -> &'static str {
        match self { Self::Admin => "ROLE_ADMIN", Self::User => "ROLE_USER" }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod { Cod, Vnpay }

/// Unit price with a per-unit discount, both in VND.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { price: Decimal, discount: Decimal }

impl Money {
    pub fn new(price: Decimal, discount: Decimal) -> Result<Self, MoneyError> {
        if price.is_sign_negative() { return Err(MoneyError::NegativePrice); }
        if discount.is_sign_negative() { return Err(MoneyError::NegativeDiscount); }
        if discount > price { return Err(MoneyError::DiscountExceedsPrice); }
        Ok(Self { price, discount })
    }
    pub fn price(&self) -> Decimal { self.price }
    pub fn discount(&self) -> Decimal { self.discount }
    /// Price actually charged per unit.
    pub fn unit_net(&self) -> Decimal { (self.price - self.discount).max(Decimal::ZERO) }
    pub fn line_total(&self, qty: Quantity) -> Decimal { self.unit_net() * Decimal::from(qty.value()) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum MoneyError { NegativePrice, NegativeDiscount, DiscountExceedsPrice }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativePrice => write!(f, "Price can not be negative"),
            Self::NegativeDiscount => write!(f, "Discount can not be negative"),
            Self::DiscountExceedsPrice => write!(f, "Discount can not be greater than price"),
        }
    }
}

/// Strictly positive item count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: i32) -> Option<Self> { u32::try_from(value).ok().filter(|v| *v > 0).map(Self) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn as_i32(&self) -> i32 { i32::try_from(self.0).unwrap_or(i32::MAX) }
    pub fn add(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0)) }
    pub fn fits(&self, stock: i32) -> bool { i64::from(self.0) <= i64::from(stock) }
}

/// Review score between 1 and 5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i32) -> Option<Self> { (1..=5).contains(&value).then(|| Self(value as u8)) }
    pub fn value(&self) -> i32 { i32::from(self.0) }
}

/// Positive database identifier check shared by request validation.
pub fn positive_id(id: i64) -> bool { id > 0 }

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_money_net() {
        let m = Money::new(Decimal::new(45_000, 0), Decimal::new(5_000, 0)).unwrap();
        assert_eq!(m.unit_net(), Decimal::new(40_000, 0));
        assert_eq!(m.line_total(Quantity::new(3).unwrap()), Decimal::new(120_000, 0));
    }
    #[test]
    fn test_money_rejects_negative() {
        assert_eq!(Money::new(Decimal::new(-1, 0), Decimal::ZERO), Err(MoneyError::NegativePrice));
        assert_eq!(Money::new(Decimal::ONE, Decimal::new(-1, 0)), Err(MoneyError::NegativeDiscount));
    }
    #[test]
    fn test_discount_capped_by_price() {
        assert_eq!(Money::new(Decimal::new(10, 0), Decimal::new(20, 0)), Err(MoneyError::DiscountExceedsPrice));
        let free = Money::new(Decimal::new(10, 0), Decimal::new(10, 0)).unwrap();
        assert_eq!(free.unit_net(), Decimal::ZERO);
    }
    #[test]
    fn test_quantity() {
        assert!(Quantity::new(0).is_none());
        assert!(Quantity::new(-3).is_none());
        let q = Quantity::new(2).unwrap().add(Quantity::new(3).unwrap());
        assert_eq!(q.value(), 5);
        assert!(q.fits(5));
        assert!(!q.fits(4));
    }
    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_none());
        assert!(Rating::new(6).is_none());
        assert_eq!(Rating::new(5).map(|r| r.value()), Some(5));
    }
    #[test]
    fn test_role_names() {
        assert_eq!(RoleName::User.to_string(), "ROLE_USER");
        assert_eq!(serde_json::to_string(&RoleName::Admin).unwrap(), "\"ROLE_ADMIN\"");
    }
    #[test]
    fn test_status_serde() {
        assert_eq!(serde_json::to_string(&Status::Inactive).unwrap(), "\"INACTIVE\"");
        assert_eq!(serde_json::to_string(&PaymentMethod::Vnpay).unwrap(), "\"VNPAY\"");
    }
}
