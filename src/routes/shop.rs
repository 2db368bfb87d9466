//! Customer-facing shopping: cart, addresses, favorites, orders and reviews.

use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Router,
};

use crate::message::MessageBuilder;
use crate::routes::extract::{Json, Path};
use crate::routes::{ok, ApiResult};
use crate::security::{AdminUser, CurrentUser};
use crate::services::addresses::{AddressRequest, AddressService};
use crate::services::cart::{CartItemRequest, CartService};
use crate::services::favorites::{FavoriteRequest, FavoriteService};
use crate::services::orders::{OrderRequest, OrderService};
use crate::services::reviews::{ReviewRequest, ReviewService};
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", post(add_to_cart).put(update_cart))
        .route("/cart/:id", get(get_cart).delete(delete_cart_item))
        .route("/shipping-addresses", get(list_addresses).post(add_address))
        .route("/shipping-addresses/:id", put(update_address).delete(delete_address))
        .route("/favorites", post(add_favorite).delete(remove_favorite))
        .route("/favorites/:user_id", get(list_favorites))
        .route("/orders", get(list_orders).post(place_order))
        .route("/orders/me", get(my_orders))
        .route("/orders/status/:status", get(orders_by_status))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", put(advance_order))
        .route("/orders/:id/cancel", put(cancel_order))
        .route("/order-items", get(list_order_items))
        .route("/reviews", get(list_reviews).post(add_review))
        .route("/reviews/product/:id", get(reviews_by_product))
        .route("/reviews/:id", delete(delete_review))
}

// ---- cart ----

async fn add_to_cart(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Json(req): Json<CartItemRequest>) -> ApiResult {
    ok(&msg, CartService::new(&s).add(&user, &req).await?)
}

/// `GET` takes a user id, `DELETE` a cart item id.
async fn get_cart(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Path(user_id): Path<i64>) -> ApiResult {
    ok(&msg, CartService::new(&s).get(&user, user_id).await?)
}

async fn update_cart(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Json(req): Json<CartItemRequest>) -> ApiResult {
    ok(&msg, CartService::new(&s).update(&user, &req).await?)
}

async fn delete_cart_item(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Path(id): Path<i64>) -> ApiResult {
    CartService::new(&s).delete(&user, id).await?;
    ok(&msg, ())
}

// ---- shipping addresses ----

async fn list_addresses(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser) -> ApiResult {
    ok(&msg, AddressService::new(&s).get(&user).await?)
}

async fn add_address(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Json(req): Json<AddressRequest>) -> ApiResult {
    ok(&msg, AddressService::new(&s).add(&user, &req).await?)
}

async fn update_address(
    State(s): State<AppState>,
    msg: MessageBuilder,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<AddressRequest>,
) -> ApiResult {
    ok(&msg, AddressService::new(&s).update(&user, id, &req).await?)
}

async fn delete_address(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Path(id): Path<i64>) -> ApiResult {
    AddressService::new(&s).delete(&user, id).await?;
    ok(&msg, ())
}

// ---- favorites ----

async fn list_favorites(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Path(user_id): Path<i64>) -> ApiResult {
    ok(&msg, FavoriteService::new(&s).get(&user, user_id).await?)
}

async fn add_favorite(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Json(req): Json<FavoriteRequest>) -> ApiResult {
    ok(&msg, FavoriteService::new(&s).add(&user, &req).await?)
}

async fn remove_favorite(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Json(req): Json<FavoriteRequest>) -> ApiResult {
    FavoriteService::new(&s).remove(&user, &req).await?;
    ok(&msg, ())
}

// ---- orders ----

async fn list_orders(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser) -> ApiResult {
    ok(&msg, OrderService::new(&s).get_all().await?)
}

async fn place_order(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Json(req): Json<OrderRequest>) -> ApiResult {
    ok(&msg, OrderService::new(&s).add(&user, &req).await?)
}

async fn my_orders(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser) -> ApiResult {
    ok(&msg, OrderService::new(&s).by_user(&user).await?)
}

async fn orders_by_status(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser, Path(status): Path<String>) -> ApiResult {
    ok(&msg, OrderService::new(&s).by_status(&status).await?)
}

async fn get_order(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Path(id): Path<i64>) -> ApiResult {
    ok(&msg, OrderService::new(&s).get_by_id(&user, id).await?)
}

async fn advance_order(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser, Path(id): Path<i64>) -> ApiResult {
    ok(&msg, OrderService::new(&s).update_status(id).await?)
}

async fn cancel_order(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Path(id): Path<i64>) -> ApiResult {
    ok(&msg, OrderService::new(&s).cancel(&user, id).await?)
}

async fn list_order_items(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser) -> ApiResult {
    ok(&msg, OrderService::new(&s).get_all_order_items().await?)
}

// ---- reviews ----

async fn list_reviews(State(s): State<AppState>, msg: MessageBuilder) -> ApiResult {
    ok(&msg, ReviewService::new(&s).get_all().await?)
}

async fn add_review(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, Json(req): Json<ReviewRequest>) -> ApiResult {
    ok(&msg, ReviewService::new(&s).add(&user, &req).await?)
}

async fn reviews_by_product(State(s): State<AppState>, msg: MessageBuilder, Path(id): Path<i64>) -> ApiResult {
    ok(&msg, ReviewService::new(&s).by_product(id).await?)
}

async fn delete_review(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser, Path(id): Path<i64>) -> ApiResult {
    ReviewService::new(&s).delete(id).await?;
    ok(&msg, ())
}
