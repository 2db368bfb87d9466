//! Authentication, profile and user administration.

use axum::{
    extract::{Multipart, State},
    http::{header::AUTHORIZATION, HeaderMap},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::message::MessageBuilder;
use crate::routes::extract::{Json, Path};
use crate::routes::{ok, ApiResult, Form};
use crate::security::{AdminUser, CurrentUser};
use crate::services::auth::{AuthService, ChangePasswordRequest, LoginRequest, OtpRequest, RegisterRequest, ResetPasswordRequest};
use crate::services::users::{ProfileUpdateRequest, UserInfoRequest, UserService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct EmailRequest { email: Option<String> }

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh))
        .route("/auth/profile", get(profile))
        .route("/auth/change-password", put(change_password))
        .route("/auth/forgot-password/send-otp", post(send_otp))
        .route("/auth/forgot-password/verify-otp", post(verify_otp))
        .route("/auth/forgot-password/reset", post(reset_password))
        .route("/profile", get(profile).put(update_profile))
        .route("/profile/avatar", post(update_avatar))
        .route("/users", get(list_users))
        .route("/users/me", get(current_user).put(update_user_info))
        .route("/users/:id/ban", put(ban_user))
        .route("/users/:id/unban", put(unban_user))
}

async fn login(State(s): State<AppState>, msg: MessageBuilder, Json(req): Json<LoginRequest>) -> ApiResult {
    ok(&msg, AuthService::new(&s).login(&req).await?)
}

async fn register(State(s): State<AppState>, msg: MessageBuilder, Json(req): Json<RegisterRequest>) -> ApiResult {
    ok(&msg, AuthService::new(&s).register(&req).await?)
}

async fn refresh(State(s): State<AppState>, msg: MessageBuilder, headers: HeaderMap) -> ApiResult {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    ok(&msg, AuthService::new(&s).refresh_access_token(header).await?)
}

async fn profile(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser) -> ApiResult {
    ok(&msg, AuthService::new(&s).profile(&user).await?)
}

async fn change_password(
    State(s): State<AppState>,
    msg: MessageBuilder,
    user: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult {
    AuthService::new(&s).change_password(&user, &req).await?;
    ok(&msg, ())
}

async fn send_otp(State(s): State<AppState>, msg: MessageBuilder, Json(req): Json<EmailRequest>) -> ApiResult {
    AuthService::new(&s).send_otp(&req.email).await?;
    ok(&msg, ())
}

async fn verify_otp(State(s): State<AppState>, msg: MessageBuilder, Json(req): Json<OtpRequest>) -> ApiResult {
    AuthService::new(&s).verify_otp(&req).await?;
    ok(&msg, ())
}

async fn reset_password(State(s): State<AppState>, msg: MessageBuilder, Json(req): Json<ResetPasswordRequest>) -> ApiResult {
    AuthService::new(&s).reset_password(&req).await?;
    ok(&msg, ())
}

async fn update_profile(
    State(s): State<AppState>,
    msg: MessageBuilder,
    user: CurrentUser,
    Json(req): Json<ProfileUpdateRequest>,
) -> ApiResult {
    ok(&msg, UserService::new(&s).update_profile(&user, &req).await?)
}

async fn update_avatar(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser, multipart: Multipart) -> ApiResult {
    let form = Form::read(multipart).await?;
    let file = form.files.first().ok_or_else(|| AppError::not_null("Image must be not null"))?;
    ok(&msg, UserService::new(&s).update_avatar(&user, &file.bytes, &file.file_name).await?)
}

async fn list_users(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser) -> ApiResult {
    ok(&msg, UserService::new(&s).get_all_users().await?)
}

async fn current_user(State(s): State<AppState>, msg: MessageBuilder, user: CurrentUser) -> ApiResult {
    ok(&msg, UserService::new(&s).get_current_user(&user).await?)
}

async fn update_user_info(
    State(s): State<AppState>,
    msg: MessageBuilder,
    user: CurrentUser,
    Json(req): Json<UserInfoRequest>,
) -> ApiResult {
    ok(&msg, UserService::new(&s).update_user_info(&user, &req).await?)
}

async fn ban_user(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser, Path(id): Path<i64>) -> ApiResult {
    ok(&msg, UserService::new(&s).ban_user(id).await?)
}

async fn unban_user(State(s): State<AppState>, msg: MessageBuilder, _admin: AdminUser, Path(id): Path<i64>) -> ApiResult {
    ok(&msg, UserService::new(&s).unban_user(id).await?)
}
