//! Products and their sellable items.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::catalog::{BrandRepository, CategoryRepository, TypeRepository};
use crate::db::products::{ProductItemRow, ProductRepository, ProductRow};
use crate::domain::aggregates::{ProductError, ProductItem};
use crate::domain::value_objects::Status;
use crate::error::{AppError, ResultExt};
use crate::services::{catalog::Upload, non_blank, required};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductItemRequest {
    pub product_id: Option<i64>,
    pub type_id: Option<i64>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub discount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i64,
    pub product_name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub brand_id: Option<i64>,
    pub brand_name: Option<String>,
    pub images: Vec<String>,
    pub product_items: Vec<ProductItemRow>,
    pub rating: f64,
    pub review_count: i64,
    pub total_sold: i64,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

const ITEM_NOT_FOUND: &str = "ProductItem not found";

impl From<ProductError> for AppError {
    fn from(e: ProductError) -> Self {
        match e {
            ProductError::InvalidProductId | ProductError::InvalidTypeId => AppError::not_null(e.to_string()),
            ProductError::Money(_) | ProductError::NegativeStock => AppError::not_valid(e.to_string()),
        }
    }
}

impl ProductItemRequest {
    /// Checks the request and builds the validated item.
    pub fn to_item(&self) -> Result<ProductItem, AppError> {
        let price = self.price.ok_or_else(|| AppError::not_null("Price must be not null"))?;
        let stock = self.stock.ok_or_else(|| AppError::not_null("Stock must be not null"))?;
        let discount = self.discount.unwrap_or(Decimal::ZERO);
        Ok(ProductItem::create(self.product_id.unwrap_or(0), self.type_id.unwrap_or(0), price, stock, discount)?)
    }
}

pub struct ProductService<'a> { state: &'a AppState }

impl<'a> ProductService<'a> {
    pub const fn new(state: &'a AppState) -> Self { Self { state } }

    fn products(&self) -> ProductRepository<'a> { ProductRepository::new(self.state.db()) }

    /// Attaches images, active items and sales/review figures.
    async fn assemble(&self, rows: Vec<ProductRow>) -> Result<Vec<ProductResponse>, AppError> {
        if rows.is_empty() { return Ok(vec![]); }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let repo = self.products();
        let load = async {
            Ok::<_, sqlx::Error>((repo.images_for(&ids).await?, repo.items_for(&ids).await?, repo.stats_for(&ids).await?))
        };
        let (images, items, stats) = load.await.or_system("Error when get product response")?;

        let mut images_by: HashMap<i64, Vec<String>> = HashMap::new();
        for img in images { images_by.entry(img.product_id).or_default().push(img.url); }
        let mut items_by: HashMap<i64, Vec<ProductItemRow>> = HashMap::new();
        for item in items { items_by.entry(item.product_id).or_default().push(item); }
        let stats_by: HashMap<i64, _> = stats.into_iter().map(|s| (s.product_id, s)).collect();

        Ok(rows
            .into_iter()
            .map(|p| {
                let stat = stats_by.get(&p.id).cloned().unwrap_or_default();
                ProductResponse {
                    images: images_by.remove(&p.id).unwrap_or_default(),
                    product_items: items_by.remove(&p.id).unwrap_or_default(),
                    rating: stat.average_rating.unwrap_or(0.0),
                    review_count: stat.review_count,
                    total_sold: stat.total_sold,
                    id: p.id,
                    product_name: p.name,
                    description: p.description,
                    category_id: p.category_id,
                    category_name: p.category_name,
                    brand_id: p.brand_id,
                    brand_name: p.brand_name,
                    status: p.status,
                    created_at: p.created_at,
                }
            })
            .collect())
    }

    async fn assemble_one(&self, row: ProductRow) -> Result<ProductResponse, AppError> {
        self.assemble(vec![row]).await?.pop().ok_or_else(|| AppError::system("Error when get product response"))
    }

    pub async fn get_all(&self) -> Result<Vec<ProductResponse>, AppError> {
        let rows = self.products().list_active().await?;
        self.assemble(rows).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<ProductResponse, AppError> {
        let row = self.products().find(id).await?.ok_or_else(|| AppError::field_not_found("Product not found"))?;
        if !row.status.is_active() {
            return Err(AppError::not_valid("Product not active"));
        }
        self.assemble_one(row).await
    }

    pub async fn by_category(&self, category_id: i64) -> Result<Vec<ProductResponse>, AppError> {
        CategoryRepository::new(self.state.db())
            .find(category_id)
            .await?
            .ok_or_else(|| AppError::field_not_found("Category not found"))?;
        let rows = self.products().list_by_category(category_id).await?;
        self.assemble(rows).await
    }

    /// Empty when nothing matches; a blank keyword lists everything.
    pub async fn search(&self, keyword: Option<&str>) -> Result<Vec<ProductResponse>, AppError> {
        let rows = match keyword.map(str::trim).filter(|k| !k.is_empty()) {
            Some(k) => self.products().search(k).await?,
            None => self.products().list_active().await?,
        };
        self.assemble(rows).await
    }

    async fn check_refs(&self, req: &ProductRequest) -> Result<(i64, i64), AppError> {
        let category_id = req.category_id.unwrap_or(0);
        CategoryRepository::new(self.state.db())
            .find(category_id)
            .await?
            .ok_or_else(|| AppError::field_not_found("Category id not found"))?;
        let brand_id = req.brand_id.unwrap_or(0);
        BrandRepository::new(self.state.db())
            .find(brand_id)
            .await?
            .ok_or_else(|| AppError::field_not_found("Brand id not found"))?;
        Ok((category_id, brand_id))
    }

    pub async fn add(&self, req: &ProductRequest) -> Result<ProductResponse, AppError> {
        let name = required(&req.name, "Product name must be not null")?;
        let (category_id, brand_id) = self.check_refs(req).await?;
        let id = self
            .products()
            .create(name, non_blank(&req.description), category_id, brand_id)
            .await
            .or_system("Error when add product")?;
        tracing::info!(product_id = id, "Product added");
        let row = self.products().find(id).await?.ok_or_else(|| AppError::field_not_found("Product not found"))?;
        self.assemble_one(row).await
    }

    pub async fn update(&self, id: i64, req: &ProductRequest) -> Result<ProductResponse, AppError> {
        let name = required(&req.name, "Product name must be not null")?;
        if !self.products().exists(id).await? {
            return Err(AppError::field_not_found("Product not found"));
        }
        let (category_id, brand_id) = self.check_refs(req).await?;
        self.products()
            .update(id, name, non_blank(&req.description), category_id, brand_id)
            .await
            .or_system("Error when update product")?;
        let row = self.products().find(id).await?.ok_or_else(|| AppError::field_not_found("Product not found"))?;
        self.assemble_one(row).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.products().set_status(id, Status::Inactive).await.or_system("Error when delete product")? {
            return Err(AppError::field_not_found("Product not found"));
        }
        tracing::info!(product_id = id, "Product deactivated");
        Ok(())
    }

    pub async fn add_images(&self, id: i64, uploads: &[Upload]) -> Result<ProductResponse, AppError> {
        if !self.products().exists(id).await? {
            return Err(AppError::field_not_found("Product not found"));
        }
        if uploads.is_empty() {
            return Err(AppError::not_null("Image must be not null"));
        }
        for up in uploads {
            let url = self.state.storage().store_image(&up.bytes, &up.file_name).await?;
            if let Err(e) = self.products().add_image(id, &url).await.or_system("Error when upload image") {
                self.state.storage().discard(&url).await;
                return Err(e);
            }
        }
        tracing::info!(product_id = id, count = uploads.len(), "Product images added");
        let row = self.products().find(id).await?.ok_or_else(|| AppError::field_not_found("Product not found"))?;
        self.assemble_one(row).await
    }

    // ---- product items ----

    async fn check_item_refs(&self, item: &ProductItem) -> Result<(), AppError> {
        if !self.products().exists(item.product_id()).await? {
            return Err(AppError::field_not_found("Product id not found"));
        }
        TypeRepository::new(self.state.db())
            .find(item.type_id())
            .await?
            .ok_or_else(|| AppError::field_not_found("Type id not found"))?;
        Ok(())
    }

    async fn load_item(&self, id: i64) -> Result<ProductItemRow, AppError> {
        self.products().find_item(id).await?.ok_or_else(|| AppError::field_not_found(ITEM_NOT_FOUND))
    }

    pub async fn add_item(&self, req: &ProductItemRequest) -> Result<ProductItemRow, AppError> {
        let mut item = req.to_item()?;
        self.check_item_refs(&item).await?;
        let id = self
            .products()
            .create_item(item.product_id(), item.type_id(), item.price(), item.discount(), item.stock())
            .await
            .or_system("Error when add product item")?;
        tracing::info!(product_item_id = id, product_id = item.product_id(), "Product item added");
        self.state.events().publish_all(item.take_events()).await;
        self.load_item(id).await
    }

    pub async fn items_by_product(&self, product_id: i64) -> Result<Vec<ProductItemRow>, AppError> {
        if !self.products().exists(product_id).await? {
            return Err(AppError::field_not_found("Product not found"));
        }
        Ok(self.products().items_for(&[product_id]).await?)
    }

    /// Replaces every field of the item, including the product it belongs to.
    pub async fn update_item(&self, id: i64, req: &ProductItemRequest) -> Result<ProductItemRow, AppError> {
        let item = req.to_item()?;
        self.load_item(id).await?;
        self.check_item_refs(&item).await?;
        self.products()
            .update_item(id, item.product_id(), item.type_id(), item.price(), item.discount(), item.stock())
            .await
            .or_system("Error when update product item")?;
        tracing::info!(product_item_id = id, product_id = item.product_id(), "Product item updated");
        self.load_item(id).await
    }

    pub async fn delete_item(&self, id: i64) -> Result<(), AppError> {
        if !self.products().set_item_status(id, Status::Inactive).await.or_system("Error when delete product item")? {
            return Err(AppError::field_not_found(ITEM_NOT_FOUND));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::codes;

    fn req() -> ProductItemRequest {
        ProductItemRequest { product_id: Some(1), type_id: Some(2), price: Some(Decimal::new(39_000, 0)), stock: Some(10), discount: None }
    }

    #[test]
    fn item_request_defaults_discount() {
        let item = req().to_item().unwrap();
        assert_eq!(item.discount(), Decimal::ZERO);
        assert_eq!(item.stock(), 10);
    }

    #[test]
    fn item_request_error_codes() {
        let err = ProductItemRequest { price: Some(Decimal::new(-1, 0)), ..req() }.to_item().unwrap_err();
        assert_eq!((err.code(), err.to_string().as_str()), (codes::FIELD_NOT_VALID, "Price can not be negative"));

        let err = ProductItemRequest { stock: Some(-4), ..req() }.to_item().unwrap_err();
        assert_eq!(err.to_string(), "Stock can not be negative");

        let err = ProductItemRequest { discount: Some(Decimal::new(-2, 0)), ..req() }.to_item().unwrap_err();
        assert_eq!(err.to_string(), "Discount can not be negative");

        let err = ProductItemRequest { product_id: None, ..req() }.to_item().unwrap_err();
        assert_eq!((err.code(), err.to_string().as_str()), (codes::FIELD_NOT_NULL, "Product id must be greater than 0"));

        let err = ProductItemRequest { type_id: Some(0), ..req() }.to_item().unwrap_err();
        assert_eq!(err.to_string(), "Type id must be greater than 0");

        let err = ProductItemRequest { price: None, ..req() }.to_item().unwrap_err();
        assert_eq!(err.code(), codes::FIELD_NOT_NULL);

        let err = ProductItemRequest { discount: Some(Decimal::new(40_000, 0)), ..req() }.to_item().unwrap_err();
        assert_eq!((err.code(), err.to_string().as_str()), (codes::FIELD_NOT_VALID, "Discount can not be greater than price"));
    }

    mod db {
        use super::*;
        use sqlx::PgPool;

        use crate::test_support::{seed_item, seed_product, seed_type, state};

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
        async fn update_item_moves_the_item_to_the_requested_product(pool: PgPool) {
            let state = state(pool.clone());
            let latte = seed_item(&pool, "Latte", 45_000, 10).await;
            let mocha = seed_product(&pool, "Mocha").await;
            let large = seed_type(&pool, "Large").await;
            let service = ProductService::new(&state);

            let update = ProductItemRequest {
                product_id: Some(mocha),
                type_id: Some(large),
                price: Some(Decimal::new(55_000, 0)),
                stock: Some(4),
                discount: Some(Decimal::new(5_000, 0)),
            };
            let row = service.update_item(latte, &update).await.unwrap();
            assert_eq!((row.product_id, row.type_id, row.stock), (mocha, large, 4));
            assert_eq!(row.price - row.discount, Decimal::new(50_000, 0));
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
        async fn update_item_error_messages(pool: PgPool) {
            let state = state(pool.clone());
            let latte = seed_item(&pool, "Latte", 45_000, 10).await;
            let mocha = seed_product(&pool, "Mocha").await;
            let large = seed_type(&pool, "Large").await;
            let service = ProductService::new(&state);
            let valid = ProductItemRequest { product_id: Some(mocha), type_id: Some(large), ..req() };

            let err = service.update_item(latte, &ProductItemRequest { product_id: Some(0), ..valid.clone() }).await.unwrap_err();
            assert_eq!((err.code(), err.to_string().as_str()), (codes::FIELD_NOT_NULL, "Product id must be greater than 0"));

            let err = service.update_item(latte + 1000, &valid).await.unwrap_err();
            assert_eq!((err.code(), err.to_string().as_str()), (codes::FIELD_NOT_FOUND, "ProductItem not found"));

            let err = service.update_item(latte, &ProductItemRequest { product_id: Some(mocha + 1000), ..valid.clone() }).await.unwrap_err();
            assert_eq!((err.code(), err.to_string().as_str()), (codes::FIELD_NOT_FOUND, "Product id not found"));

            let err = service.update_item(latte, &ProductItemRequest { type_id: Some(large + 1000), ..valid }).await.unwrap_err();
            assert_eq!((err.code(), err.to_string().as_str()), (codes::FIELD_NOT_FOUND, "Type id not found"));
        }
    }
}
