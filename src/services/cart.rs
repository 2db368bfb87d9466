use serde::Deserialize;

use crate::db::carts::{CartItemRow, CartLineView, CartRepository};
use crate::db::products::ProductRepository;
use crate::db::users::UserRepository;
use crate::domain::aggregates::{CartError, CartLine};
use crate::domain::value_objects::{positive_id, Quantity};
use crate::error::{AppError, ResultExt};
use crate::security::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub user_id: Option<i64>,
    pub product_item_id: Option<i64>,
    pub quantity: Option<i32>,
}

impl From<CartError> for AppError {
    fn from(e: CartError) -> Self { AppError::not_valid(e.to_string()) }
}

/// Ids and quantity of a cart write, checked before any lookup.
fn parse_request(req: &CartItemRequest) -> Result<(i64, i64, Quantity), AppError> {
    let user_id = req.user_id.filter(|id| positive_id(*id)).ok_or_else(|| AppError::not_valid("User id must be greater than 0"))?;
    let item_id = req
        .product_item_id
        .filter(|id| positive_id(*id))
        .ok_or_else(|| AppError::not_valid("Product item id must be greater than 0"))?;
    let quantity = req.quantity.and_then(Quantity::new).ok_or_else(|| AppError::not_valid("Quantity must be greater than 0"))?;
    Ok((user_id, item_id, quantity))
}

pub struct CartService<'a> { state: &'a AppState }

impl<'a> CartService<'a> {
    pub const fn new(state: &'a AppState) -> Self { Self { state } }

    fn carts(&self) -> CartRepository<'a> { CartRepository::new(self.state.db()) }

    async fn stock_of(&self, product_item_id: i64) -> Result<i32, AppError> {
        ProductRepository::new(self.state.db())
            .find_item(product_item_id)
            .await?
            .filter(|item| item.status.is_active())
            .map(|item| item.stock)
            .ok_or_else(|| AppError::field_not_found("Product item not found"))
    }

    pub async fn add(&self, current: &CurrentUser, req: &CartItemRequest) -> Result<CartItemRow, AppError> {
        let (user_id, item_id, quantity) = parse_request(req)?;
        current.ensure_owner_or_admin(user_id)?;
        if !UserRepository::new(self.state.db()).exists(user_id).await? {
            return Err(AppError::field_not_found("User not found"));
        }
        let stock = self.stock_of(item_id).await?;

        let row = match self.carts().find_line(user_id, item_id).await? {
            Some(existing) => {
                let current_qty = Quantity::new(existing.quantity).ok_or_else(|| AppError::system("Invalid cart quantity"))?;
                let mut line = CartLine::restore(item_id, current_qty);
                line.add(quantity, stock)?;
                self.carts().set_quantity(existing.id, line.quantity().as_i32()).await.or_system("Error when update cart")?
            }
            None => {
                let line = CartLine::new(item_id, quantity, stock)?;
                self.carts().insert(user_id, item_id, line.quantity().as_i32()).await.or_system("Error when add to cart")?
            }
        };
        tracing::info!(user_id, product_item_id = item_id, quantity = row.quantity, "Cart line saved");
        Ok(row)
    }

    pub async fn get(&self, current: &CurrentUser, user_id: i64) -> Result<Vec<CartLineView>, AppError> {
        if !positive_id(user_id) {
            return Err(AppError::not_valid("User id must be greater than 0"));
        }
        current.ensure_owner_or_admin(user_id)?;
        Ok(self.carts().list_view(user_id).await?)
    }

    pub async fn update(&self, current: &CurrentUser, req: &CartItemRequest) -> Result<CartItemRow, AppError> {
        let (user_id, item_id, quantity) = parse_request(req)?;
        current.ensure_owner_or_admin(user_id)?;
        let existing = self
            .carts()
            .find_line(user_id, item_id)
            .await?
            .ok_or_else(|| AppError::field_not_found("Cart item not found"))?;
        let stock = self.stock_of(item_id).await?;
        let current_qty = Quantity::new(existing.quantity).ok_or_else(|| AppError::system("Invalid cart quantity"))?;
        let mut line = CartLine::restore(item_id, current_qty);
        line.set(quantity, stock)?;
        self.carts().set_quantity(existing.id, line.quantity().as_i32()).await.or_system("Error when update cart")
    }

    pub async fn delete(&self, current: &CurrentUser, id: i64) -> Result<(), AppError> {
        let line = self.carts().find(id).await?.ok_or_else(|| AppError::field_not_found("Cart item not found"))?;
        current.ensure_owner_or_admin(line.user_id)?;
        self.carts().delete(id).await?;
        tracing::info!(cart_item_id = id, user_id = line.user_id, "Cart line removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::codes;

    fn req(user: i64, item: i64, qty: i32) -> CartItemRequest {
        CartItemRequest { user_id: Some(user), product_item_id: Some(item), quantity: Some(qty) }
    }

    #[test]
    fn request_ids_and_quantity_must_be_positive() {
        let (user, item, qty) = parse_request(&req(1, 2, 3)).unwrap();
        assert_eq!((user, item, qty.value()), (1, 2, 3));

        for bad in [req(0, 2, 3), req(1, -2, 3), req(1, 2, 0), CartItemRequest::default()] {
            assert_eq!(parse_request(&bad).unwrap_err().code(), codes::FIELD_NOT_VALID);
        }
    }

    #[test]
    fn stock_overflow_is_not_valid() {
        let err: AppError = CartLine::new(1, Quantity::new(4).unwrap(), 3).unwrap_err().into();
        assert_eq!(err.code(), codes::FIELD_NOT_VALID);
        assert_eq!(err.to_string(), "Quantity 4 exceeds stock 3");
    }
}
