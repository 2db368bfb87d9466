//! User administration and the caller's own profile.

use serde::Deserialize;

use crate::db::users::UserRepository;
use crate::domain::value_objects::Status;
use crate::error::{AppError, ResultExt};
use crate::security::{password, CurrentUser};
use crate::services::{auth::ProfileResponse, non_blank, secret};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfoRequest { pub name: Option<String>, pub phone: Option<String> }

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

impl ProfileUpdateRequest {
    /// New password when both fields are given and equal.
    pub fn new_password(&self) -> Option<&str> {
        match (secret(&self.password), secret(&self.confirm_password)) {
            (Some(p), Some(c)) if p == c => Some(p),
            _ => None,
        }
    }
}

pub struct UserService<'a> { state: &'a AppState }

impl<'a> UserService<'a> {
    pub const fn new(state: &'a AppState) -> Self { Self { state } }

    fn users(&self) -> UserRepository<'a> { UserRepository::new(self.state.db()) }

    pub async fn get_all_users(&self) -> Result<Vec<ProfileResponse>, AppError> {
        Ok(self.users().list().await?.into_iter().map(Into::into).collect())
    }

    pub async fn get_current_user(&self, current: &CurrentUser) -> Result<ProfileResponse, AppError> {
        self.users()
            .find_by_id(current.id)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::field_not_found("User not found"))
    }

    async fn set_status(&self, id: i64, status: Status) -> Result<ProfileResponse, AppError> {
        if !self.users().set_status(id, status).await? {
            return Err(AppError::not_found(format!("User not found with ID: {id}")));
        }
        tracing::info!(user_id = id, ?status, "User status changed");
        self.users()
            .find_by_id(id)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::not_found(format!("User not found with ID: {id}")))
    }

    pub async fn ban_user(&self, id: i64) -> Result<ProfileResponse, AppError> { self.set_status(id, Status::Inactive).await }

    pub async fn unban_user(&self, id: i64) -> Result<ProfileResponse, AppError> { self.set_status(id, Status::Active).await }

    pub async fn update_user_info(&self, current: &CurrentUser, req: &UserInfoRequest) -> Result<ProfileResponse, AppError> {
        self.users().update_info(current.id, non_blank(&req.name), non_blank(&req.phone)).await.or_system("Could not update user")?;
        self.get_current_user(current).await
    }

    pub async fn update_profile(&self, current: &CurrentUser, req: &ProfileUpdateRequest) -> Result<ProfileResponse, AppError> {
        self.users().update_info(current.id, non_blank(&req.name), non_blank(&req.phone)).await.or_system("Could not update profile")?;
        if let Some(new_password) = req.new_password() {
            let hash = password::hash_password(new_password).await?;
            self.users().update_password(current.id, &hash).await?;
            tracing::info!(user_id = current.id, "Password changed from profile");
        }
        self.get_current_user(current).await
    }

    pub async fn update_avatar(&self, current: &CurrentUser, bytes: &[u8], file_name: &str) -> Result<ProfileResponse, AppError> {
        let url = self.state.storage().store_image(bytes, file_name).await?;
        if let Err(e) = self.users().update_avatar(current.id, &url).await.or_system("Image upload fail") {
            self.state.storage().discard(&url).await;
            return Err(e);
        }
        self.get_current_user(current).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(p: Option<&str>, c: Option<&str>) -> ProfileUpdateRequest {
        ProfileUpdateRequest { password: p.map(Into::into), confirm_password: c.map(Into::into), ..Default::default() }
    }

    #[test]
    fn password_changes_only_when_confirmed() {
        assert_eq!(req(Some("n3w"), Some("n3w")).new_password(), Some("n3w"));
        assert_eq!(req(Some("n3w"), Some("other")).new_password(), None);
        assert_eq!(req(Some("n3w"), None).new_password(), None);
        assert_eq!(req(Some(" "), Some(" ")).new_password(), None);
    }
}
