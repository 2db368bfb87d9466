//! Extractors resolving the caller from a `Bearer` access token.

use axum::{extract::FromRequestParts, http::{header::AUTHORIZATION, request::Parts}};

use crate::db::users::UserRepository;
use crate::domain::value_objects::RoleName;
use crate::error::AppError;
use crate::security::jwt::TokenType;
use crate::state::AppState;

/// Authenticated, ACTIVE user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser { pub id: i64, pub email: String, pub role: RoleName }

impl CurrentUser {
    pub fn is_admin(&self) -> bool { self.role == RoleName::Admin }

    /// Admins act on anyone's data, others only on their own.
    pub fn ensure_owner_or_admin(&self, owner_id: i64) -> Result<(), AppError> {
        if self.is_admin() || self.id == owner_id { Ok(()) } else { Err(AppError::forbidden("Access denied")) }
    }
}

/// Authenticated user holding `ROLE_ADMIN`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

fn auth_error(reason: &str) -> AppError {
    AppError::unauthorized(format!("Authentication error: {reason}"))
}

/// Token part of an `Authorization: Bearer <token>` header.
pub fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| auth_error("missing Authorization header"))?
        .to_str()
        .map_err(|_| auth_error("malformed Authorization header"))?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| auth_error("expected Bearer token"))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state
            .tokens()
            .validate_typed(token, TokenType::Access)
            .map_err(|e| auth_error(&e.to_string()))?;
        let user = UserRepository::new(state.db())
            .find_by_email(&claims.sub)
            .await?
            .ok_or_else(|| auth_error("user not found"))?;
        if !user.status.is_active() {
            return Err(auth_error("user is disabled"));
        }
        Ok(Self { id: user.id, email: user.email, role: user.role })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::forbidden("Access denied"));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use crate::message::codes;

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(v) = auth { builder = builder.header(AUTHORIZATION, v); }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))).unwrap(), "abc.def");
        let err = bearer_token(&parts(None)).unwrap_err();
        assert_eq!(err.code(), codes::UNAUTHORIZED);
        assert!(err.to_string().starts_with("Authentication error:"));
        assert!(bearer_token(&parts(Some("Basic abc"))).is_err());
        assert!(bearer_token(&parts(Some("Bearer "))).is_err());
    }

    #[test]
    fn ownership_rules() {
        let user = CurrentUser { id: 4, email: "u@shop.vn".into(), role: RoleName::User };
        assert!(user.ensure_owner_or_admin(4).is_ok());
        assert_eq!(user.ensure_owner_or_admin(5).unwrap_err().code(), codes::FORBIDDEN);
        let admin = CurrentUser { id: 1, email: "a@shop.vn".into(), role: RoleName::Admin };
        assert!(admin.ensure_owner_or_admin(5).is_ok());
    }
}
