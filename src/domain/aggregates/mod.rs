//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{ProductError, ProductItem};
pub use order::{LineItem, Order, OrderError, OrderStatus};
pub use cart::{CartError, CartLine};
