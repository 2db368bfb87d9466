//! Categories, brands, product types, products and product items.

use axum::{
    extract::{Multipart, State},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

use crate::message::{codes, MessageBuilder};
use crate::routes::extract::{Json, Path, Query};
use crate::routes::{ok, ApiResult, Form};
use crate::security::AdminUser;
use crate::services::catalog::{CatalogService, CategoryRequest, NameRequest};
use crate::services::products::{ProductItemRequest, ProductRequest, ProductService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct SearchParams { keyword: Option<String> }

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(add_category))
        .route("/categories/:id", get(get_category).put(update_category).delete(delete_category))
        .route("/brands", get(list_brands).post(add_brand))
        .route("/brands/:id", put(update_brand).delete(delete_brand))
        .route("/types", get(list_types).post(add_type))
        .route("/products", get(list_products).post(add_product))
        .route("/products/search", get(search_products))
        .route("/products/category/:id", get(products_by_category))
        .route("/products/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/products/:id/images", post(add_product_images))
        .route("/product-items", post(add_item))
        .route("/product-items/product/:id", get(items_by_product))
        .route("/product-items/:id", put(update_item).delete(delete_item))
}

fn category_request(form: &Form) -> CategoryRequest {
    CategoryRequest { name: form.text("name"), description: form.text("description") }
}

// ---- categories ----

async fn list_categories(State(s): State<AppState>, msg: MessageBuilder) -> ApiResult {
    ok(&msg, CatalogService::new(&s).get_all_categories().await?)
}

async fn get_category(State(s): State<AppState>, msg: MessageBuilder, Path(id): Path<i64>) -> ApiResult {
    ok(&msg, CatalogService::new(&s).get_category(id).await?)
}

async fn add_category(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser, multipart: Multipart) -> ApiResult {
    let form = Form::read(multipart).await?;
    ok(&msg, CatalogService::new(&s).add_category(&category_request(&form), form.files.first()).await?)
}

async fn update_category(
    State(s): State<AppState>,
    msg: MessageBuilder,
    _admin: AdminUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult {
    let form = Form::read(multipart).await?;
    ok(&msg, CatalogService::new(&s).update_category(id, &category_request(&form), form.files.first()).await?)
}

async fn delete_category(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser, Path(id): Path<i64>) -> ApiResult {
    CatalogService::new(&s).delete_category(id).await?;
    ok(&msg, ())
}

// ---- brands and types ----

async fn list_brands(State(s): State<AppState>, msg: MessageBuilder) -> ApiResult {
    ok(&msg, CatalogService::new(&s).get_all_brands().await?)
}

async fn add_brand(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser, Json(req): Json<NameRequest>) -> ApiResult {
    ok(&msg, CatalogService::new(&s).add_brand(&req).await?)
}

async fn update_brand(
    State(s): State<AppState>,
    msg: MessageBuilder,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<NameRequest>,
) -> ApiResult {
    ok(&msg, CatalogService::new(&s).update_brand(id, &req).await?)
}

async fn delete_brand(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser, Path(id): Path<i64>) -> ApiResult {
    ok(&msg, CatalogService::new(&s).delete_brand(id).await?)
}

async fn list_types(State(s): State<AppState>, msg: MessageBuilder) -> ApiResult {
    ok(&msg, CatalogService::new(&s).get_all_types().await?)
}

async fn add_type(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser, Json(req): Json<NameRequest>) -> ApiResult {
    ok(&msg, CatalogService::new(&s).add_type(&req).await?)
}

// ---- products ----

async fn list_products(State(s): State<AppState>, msg: MessageBuilder) -> ApiResult {
    ok(&msg, ProductService::new(&s).get_all().await?)
}

async fn search_products(State(s): State<AppState>, msg: MessageBuilder, Query(p): Query<SearchParams>) -> ApiResult {
    let found = ProductService::new(&s).search(p.keyword.as_deref()).await?;
    if found.is_empty() {
        return Ok(axum::Json(msg.failure(codes::FIELD_NOT_FOUND, &["Product"], found)?));
    }
    ok(&msg, found)
}

async fn products_by_category(State(s): State<AppState>, msg: MessageBuilder, Path(id): Path<i64>) -> ApiResult {
    ok(&msg, ProductService::new(&s).by_category(id).await?)
}

async fn get_product(State(s): State<AppState>, msg: MessageBuilder, Path(id): Path<i64>) -> ApiResult {
    ok(&msg, ProductService::new(&s).get_by_id(id).await?)
}

async fn add_product(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser, Json(req): Json<ProductRequest>) -> ApiResult {
    ok(&msg, ProductService::new(&s).add(&req).await?)
}

async fn update_product(
    State(s): State<AppState>,
    msg: MessageBuilder,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<ProductRequest>,
) -> ApiResult {
    ok(&msg, ProductService::new(&s).update(id, &req).await?)
}

async fn delete_product(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser, Path(id): Path<i64>) -> ApiResult {
    ProductService::new(&s).delete(id).await?;
    ok(&msg, ())
}

async fn add_product_images(
    State(s): State<AppState>,
    msg: MessageBuilder,
    _admin: AdminUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult {
    let form = Form::read(multipart).await?;
    ok(&msg, ProductService::new(&s).add_images(id, &form.files).await?)
}

// ---- product items ----

async fn add_item(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser, Json(req): Json<ProductItemRequest>) -> ApiResult {
    ok(&msg, ProductService::new(&s).add_item(&req).await?)
}

async fn items_by_product(State(s): State<AppState>, msg: MessageBuilder, Path(id): Path<i64>) -> ApiResult {
    ok(&msg, ProductService::new(&s).items_by_product(id).await?)
}

async fn update_item(
    State(s): State<AppState>,
    msg: MessageBuilder,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<ProductItemRequest>,
) -> ApiResult {
    ok(&msg, ProductService::new(&s).update_item(id, &req).await?)
}

async fn delete_item(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser, Path(id): Path<i64>) -> ApiResult {
    ProductService::new(&s).delete_item(id).await?;
    ok(&msg, ())
}
