//! Categories, brands and product types.

use serde::Serialize;
use sqlx::PgPool;

use crate::domain::value_objects::Status;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRow { pub id: i64, pub name: String, pub description: Option<String>, pub default_image_url: Option<String>, pub status: Status }

/// Brands and product types share the same shape.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NamedRow { pub id: i64, pub name: String, pub status: Status }

pub struct CategoryRepository<'a> { pool: &'a PgPool }

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    pub async fn list_active(&self) -> Result<Vec<CategoryRow>, sqlx::Error> {
        sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE status = 'ACTIVE' ORDER BY name")
            .fetch_all(self.pool)
            .await
    }

    pub async fn find(&self, id: i64) -> Result<Option<CategoryRow>, sqlx::Error> {
        sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE id = $1").bind(id).fetch_optional(self.pool).await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<CategoryRow>, sqlx::Error> {
        sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE lower(name) = lower($1)")
            .bind(name)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn create(&self, name: &str, description: Option<&str>, image_url: Option<&str>) -> Result<CategoryRow, sqlx::Error> {
        sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (name, description, default_image_url) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(description)
        .bind(image_url)
        .fetch_one(self.pool)
        .await
    }

    pub async fn update(&self, id: i64, name: &str, description: Option<&str>, image_url: Option<&str>) -> Result<Option<CategoryRow>, sqlx::Error> {
        sqlx::query_as::<_, CategoryRow>(
            "UPDATE categories SET name = $2, description = $3, default_image_url = COALESCE($4, default_image_url) \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(image_url)
        .fetch_optional(self.pool)
        .await
    }

    pub async fn set_status(&self, id: i64, status: Status) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("UPDATE categories SET status = $2 WHERE id = $1").bind(id).bind(status).execute(self.pool).await?;
        Ok(res.rows_affected() > 0)
    }
}

pub struct BrandRepository<'a> { pool: &'a PgPool }

impl<'a> BrandRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    pub async fn list_active(&self) -> Result<Vec<NamedRow>, sqlx::Error> {
        sqlx::query_as::<_, NamedRow>("SELECT id, name, status FROM brands WHERE status = 'ACTIVE' ORDER BY name")
            .fetch_all(self.pool)
            .await
    }

    pub async fn find(&self, id: i64) -> Result<Option<NamedRow>, sqlx::Error> {
        sqlx::query_as::<_, NamedRow>("SELECT id, name, status FROM brands WHERE id = $1").bind(id).fetch_optional(self.pool).await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<NamedRow>, sqlx::Error> {
        sqlx::query_as::<_, NamedRow>("SELECT id, name, status FROM brands WHERE lower(name) = lower($1)")
            .bind(name)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn create(&self, name: &str) -> Result<NamedRow, sqlx::Error> {
        sqlx::query_as::<_, NamedRow>("INSERT INTO brands (name) VALUES ($1) RETURNING id, name, status")
            .bind(name)
            .fetch_one(self.pool)
            .await
    }

    pub async fn rename(&self, id: i64, name: &str) -> Result<Option<NamedRow>, sqlx::Error> {
        sqlx::query_as::<_, NamedRow>("UPDATE brands SET name = $2 WHERE id = $1 RETURNING id, name, status")
            .bind(id)
            .bind(name)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn set_status(&self, id: i64, status: Status) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("UPDATE brands SET status = $2 WHERE id = $1").bind(id).bind(status).execute(self.pool).await?;
        Ok(res.rows_affected() > 0)
    }
}

pub struct TypeRepository<'a> { pool: &'a PgPool }

impl<'a> TypeRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    pub async fn list_active(&self) -> Result<Vec<NamedRow>, sqlx::Error> {
        sqlx::query_as::<_, NamedRow>("SELECT id, name, status FROM type_products WHERE status = 'ACTIVE' ORDER BY name")
            .fetch_all(self.pool)
            .await
    }

    pub async fn find(&self, id: i64) -> Result<Option<NamedRow>, sqlx::Error> {
        sqlx::query_as::<_, NamedRow>("SELECT id, name, status FROM type_products WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<NamedRow>, sqlx::Error> {
        sqlx::query_as::<_, NamedRow>("SELECT id, name, status FROM type_products WHERE lower(name) = lower($1)")
            .bind(name)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn create(&self, name: &str) -> Result<NamedRow, sqlx::Error> {
        sqlx::query_as::<_, NamedRow>("INSERT INTO type_products (name) VALUES ($1) RETURNING id, name, status")
            .bind(name)
            .fetch_one(self.pool)
            .await
    }
}
