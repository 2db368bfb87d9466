//! Categories, brands and product types.

use serde::Deserialize;

use crate::db::catalog::{BrandRepository, CategoryRepository, CategoryRow, NamedRow, TypeRepository};
use crate::db::is_unique_violation;
use crate::domain::value_objects::Status;
use crate::error::{AppError, ResultExt};
use crate::services::{non_blank, required};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryRequest { pub name: Option<String>, pub description: Option<String> }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameRequest { pub name: Option<String> }

/// Uploaded image attached to a catalog write.
#[derive(Debug, Clone)]
pub struct Upload { pub bytes: Vec<u8>, pub file_name: String }

/// A name may be reused by the entity that already owns it.
fn name_taken_by_other(existing: Option<&NamedRow>, id: i64) -> bool {
    existing.is_some_and(|row| row.id != id)
}

pub struct CatalogService<'a> { state: &'a AppState }

impl<'a> CatalogService<'a> {
    pub const fn new(state: &'a AppState) -> Self { Self { state } }

    fn categories(&self) -> CategoryRepository<'a> { CategoryRepository::new(self.state.db()) }
    fn brands(&self) -> BrandRepository<'a> { BrandRepository::new(self.state.db()) }
    fn types(&self) -> TypeRepository<'a> { TypeRepository::new(self.state.db()) }

    async fn store(&self, image: Option<&Upload>) -> Result<Option<String>, AppError> {
        match image {
            Some(up) => self.state.storage().store_image(&up.bytes, &up.file_name).await.map(Some),
            None => Ok(None),
        }
    }

    async fn discard(&self, url: Option<&str>) {
        if let Some(url) = url {
            self.state.storage().discard(url).await;
        }
    }

    // ---- categories ----

    pub async fn get_all_categories(&self) -> Result<Vec<CategoryRow>, AppError> {
        Ok(self.categories().list_active().await?)
    }

    pub async fn get_category(&self, id: i64) -> Result<CategoryRow, AppError> {
        let category = self.categories().find(id).await?.ok_or_else(|| AppError::field_not_found("Category not found"))?;
        if !category.status.is_active() {
            return Err(AppError::not_valid("Category not active"));
        }
        Ok(category)
    }

    pub async fn add_category(&self, req: &CategoryRequest, image: Option<&Upload>) -> Result<CategoryRow, AppError> {
        let name = required(&req.name, "Category name must be not null")?;
        if self.categories().find_by_name(name).await?.is_some() {
            return Err(AppError::existed("Category name is duplicate"));
        }
        let url = self.store(image).await?;
        let created = self.categories().create(name, non_blank(&req.description), url.as_deref()).await;
        let row = match created {
            Ok(row) => row,
            Err(e) => {
                self.discard(url.as_deref()).await;
                return Err(if is_unique_violation(&e) { AppError::existed("Category name is duplicate") } else { e.into() });
            }
        };
        tracing::info!(category_id = row.id, "Category added");
        Ok(row)
    }

    pub async fn update_category(&self, id: i64, req: &CategoryRequest, image: Option<&Upload>) -> Result<CategoryRow, AppError> {
        let name = required(&req.name, "Category name must be not null")?;
        if self.categories().find_by_name(name).await?.is_some_and(|c| c.id != id) {
            return Err(AppError::existed("Category name is duplicate"));
        }
        let url = self.store(image).await?;
        let updated = self
            .categories()
            .update(id, name, non_blank(&req.description), url.as_deref())
            .await
            .or_system("Could not update category");
        if !matches!(updated, Ok(Some(_))) {
            self.discard(url.as_deref()).await;
        }
        updated?.ok_or_else(|| AppError::field_not_found("Category not found"))
    }

    pub async fn delete_category(&self, id: i64) -> Result<(), AppError> {
        if !self.categories().set_status(id, Status::Inactive).await.or_system("Could not delete category")? {
            return Err(AppError::field_not_found("Category not found"));
        }
        tracing::info!(category_id = id, "Category deactivated");
        Ok(())
    }

    // ---- brands ----

    pub async fn get_all_brands(&self) -> Result<Vec<NamedRow>, AppError> {
        Ok(self.brands().list_active().await?)
    }

    pub async fn add_brand(&self, req: &NameRequest) -> Result<NamedRow, AppError> {
        let name = required(&req.name, "Brand name must be not null")?;
        if self.brands().find_by_name(name).await?.is_some() {
            return Err(AppError::existed("Brand name is duplicate"));
        }
        let row = self.brands().create(name).await.or_system("Error when add brand")?;
        tracing::info!(brand_id = row.id, "Brand added");
        Ok(row)
    }

    pub async fn update_brand(&self, id: i64, req: &NameRequest) -> Result<NamedRow, AppError> {
        let name = required(&req.name, "Brand name must be not null")?;
        self.brands().find(id).await?.ok_or_else(|| AppError::not_found("Brand not found"))?;
        let existing = self.brands().find_by_name(name).await?;
        if name_taken_by_other(existing.as_ref(), id) {
            return Err(AppError::existed("Brand name is duplicate"));
        }
        self.brands()
            .rename(id, name)
            .await
            .or_system("Could not update brand")?
            .ok_or_else(|| AppError::not_found("Brand not found"))
    }

    pub async fn delete_brand(&self, id: i64) -> Result<NamedRow, AppError> {
        let brand = self.brands().find(id).await?.ok_or_else(|| AppError::not_found("Brand not found"))?;
        self.brands().set_status(id, Status::Inactive).await.or_system("Could not delete brand")?;
        tracing::info!(brand_id = id, "Brand deactivated");
        Ok(NamedRow { status: Status::Inactive, ..brand })
    }

    // ---- product types ----

    pub async fn get_all_types(&self) -> Result<Vec<NamedRow>, AppError> {
        Ok(self.types().list_active().await?)
    }

    pub async fn add_type(&self, req: &NameRequest) -> Result<NamedRow, AppError> {
        let name = required(&req.name, "Type product name must be not null")?;
        if self.types().find_by_name(name).await?.is_some() {
            return Err(AppError::existed("Type product name is duplicate"));
        }
        let row = self.types().create(name).await.or_system("Error when add type product")?;
        tracing::info!(type_id = row.id, "Product type added");
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brand(id: i64) -> NamedRow { NamedRow { id, name: "Trung Nguyen".into(), status: Status::Active } }

    #[test]
    fn renaming_to_own_name_is_allowed() {
        assert!(!name_taken_by_other(Some(&brand(3)), 3));
        assert!(name_taken_by_other(Some(&brand(4)), 3));
        assert!(!name_taken_by_other(None, 3));
    }
}
