use serde::Deserialize;

use crate::db::favorites::{FavoriteRepository, FavoriteRow};
use crate::db::is_unique_violation;
use crate::db::products::ProductRepository;
use crate::db::users::UserRepository;
use crate::domain::value_objects::positive_id;
use crate::error::AppError;
use crate::security::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest { pub user_id: Option<i64>, pub product_id: Option<i64> }

impl FavoriteRequest {
    fn ids(&self) -> Result<(i64, i64), AppError> {
        let user_id = self.user_id.filter(|id| positive_id(*id)).ok_or_else(|| AppError::not_valid("User id must be greater than 0"))?;
        let product_id = self
            .product_id
            .filter(|id| positive_id(*id))
            .ok_or_else(|| AppError::not_valid("Product id must be greater than 0"))?;
        Ok((user_id, product_id))
    }
}

pub struct FavoriteService<'a> { state: &'a AppState }

impl<'a> FavoriteService<'a> {
    pub const fn new(state: &'a AppState) -> Self { Self { state } }

    fn favorites(&self) -> FavoriteRepository<'a> { FavoriteRepository::new(self.state.db()) }

    pub async fn get(&self, current: &CurrentUser, user_id: i64) -> Result<Vec<FavoriteRow>, AppError> {
        if !positive_id(user_id) {
            return Err(AppError::not_valid("User id must be greater than 0"));
        }
        current.ensure_owner_or_admin(user_id)?;
        Ok(self.favorites().list(user_id).await?)
    }

    pub async fn add(&self, current: &CurrentUser, req: &FavoriteRequest) -> Result<Vec<FavoriteRow>, AppError> {
        let (user_id, product_id) = req.ids()?;
        current.ensure_owner_or_admin(user_id)?;
        if !UserRepository::new(self.state.db()).exists(user_id).await? {
            return Err(AppError::field_not_found("User not found"));
        }
        if !ProductRepository::new(self.state.db()).exists(product_id).await? {
            return Err(AppError::field_not_found("Product not found"));
        }
        if self.favorites().exists(user_id, product_id).await? {
            return Err(AppError::existed("Product is already a favorite"));
        }
        self.favorites().create(user_id, product_id).await.map_err(|e| {
            if is_unique_violation(&e) { AppError::existed("Product is already a favorite") } else { e.into() }
        })?;
        tracing::info!(user_id, product_id, "Favorite added");
        Ok(self.favorites().list(user_id).await?)
    }

    pub async fn remove(&self, current: &CurrentUser, req: &FavoriteRequest) -> Result<(), AppError> {
        let (user_id, product_id) = req.ids()?;
        current.ensure_owner_or_admin(user_id)?;
        if !self.favorites().delete(user_id, product_id).await? {
            return Err(AppError::field_not_found("Favorite product not found"));
        }
        tracing::info!(user_id, product_id, "Favorite removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_positive() {
        assert_eq!(FavoriteRequest { user_id: Some(2), product_id: Some(9) }.ids().unwrap(), (2, 9));
        let err = FavoriteRequest { user_id: Some(2), product_id: Some(0) }.ids().unwrap_err();
        assert_eq!(err.to_string(), "Product id must be greater than 0");
        let err = FavoriteRequest { user_id: None, product_id: Some(9) }.ids().unwrap_err();
        assert_eq!(err.to_string(), "User id must be greater than 0");
    }
}
