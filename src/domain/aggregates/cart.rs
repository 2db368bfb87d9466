//! Cart line rules

use crate::domain::value_objects::Quantity;

/// One product item in a user's cart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CartLine {
    pub product_item_id: i64,
    quantity: Quantity,
}

impl CartLine {
    pub fn new(product_item_id: i64, quantity: Quantity, stock: i32) -> Result<Self, CartError> {
        if !quantity.fits(stock) { return Err(CartError::ExceedsStock { requested: quantity.value(), stock }); }
        Ok(Self { product_item_id, quantity })
    }

    /// A line already stored in the cart.
    pub fn restore(product_item_id: i64, quantity: Quantity) -> Self { Self { product_item_id, quantity } }

    pub fn quantity(&self) -> Quantity { self.quantity }

    /// Adding to an existing line merges the quantities.
    pub fn add(&mut self, more: Quantity, stock: i32) -> Result<(), CartError> {
        let merged = self.quantity.add(more);
        if !merged.fits(stock) { return Err(CartError::ExceedsStock { requested: merged.value(), stock }); }
        self.quantity = merged;
        Ok(())
    }

    pub fn set(&mut self, quantity: Quantity, stock: i32) -> Result<(), CartError> {
        if !quantity.fits(stock) { return Err(CartError::ExceedsStock { requested: quantity.value(), stock }); }
        self.quantity = quantity;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ExceedsStock { requested: u32, stock: i32 } }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::ExceedsStock { requested, stock } => write!(f, "Quantity {requested} exceeds stock {stock}") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn q(v: i32) -> Quantity { Quantity::new(v).unwrap() }
    #[test]
    fn test_cart_operations() {
        let mut line = CartLine::new(4, q(2), 10).unwrap();
        line.add(q(3), 10).unwrap();
        assert_eq!(line.quantity().value(), 5); // Merged
        assert_eq!(line.add(q(6), 10), Err(CartError::ExceedsStock { requested: 11, stock: 10 }));
        assert_eq!(line.quantity().value(), 5);
        line.set(q(10), 10).unwrap();
        assert!(line.set(q(11), 10).is_err());
    }
    #[test]
    fn test_new_line_checks_stock() {
        assert!(CartLine::new(1, q(3), 2).is_err());
        assert!(CartLine::new(1, q(2), 2).is_ok());
    }
    #[test]
    fn test_restored_line_merges_against_current_stock() {
        // Stock may have dropped since the line was stored.
        let mut line = CartLine::restore(7, q(4));
        assert!(line.add(q(1), 4).is_err());
        line.set(q(2), 4).unwrap();
        assert_eq!(line.quantity().value(), 2);
    }
}
