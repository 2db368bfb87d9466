//! Login, registration, token refresh and password recovery.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::AdminSeed;
use crate::db::{is_unique_violation, users::{UserRepository, UserRow}};
use crate::domain::value_objects::RoleName;
use crate::error::{AppError, ResultExt};
use crate::mail::MailBody;
use crate::security::{jwt::{LoginResponse, TokenType}, password, CurrentUser};
use crate::services::{required, required_secret};
use crate::state::AppState;

const OTP_VALIDITY_MINUTES: i64 = 5;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest { pub email: Option<String>, pub password: Option<String> }

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OtpRequest { pub email: Option<String>, pub otp: Option<i32> }

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub otp: Option<i32>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Public view of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub profile_img: Option<String>,
    pub role: RoleName,
}

impl From<UserRow> for ProfileResponse {
    fn from(u: UserRow) -> Self {
        Self { id: u.id, email: u.email, name: u.name, phone: u.phone, profile_img: u.profile_img, role: u.role }
    }
}

impl LoginRequest {
    pub fn credentials(&self) -> Result<(&str, &str), AppError> {
        let email = required(&self.email, "Email must be not null")?;
        let password = required_secret(&self.password, "Password must be not null")?;
        Ok((email, password))
    }
}

impl RegisterRequest {
    pub fn credentials(&self) -> Result<(&str, &str), AppError> {
        let email = required(&self.email, "Email must be not null")?;
        let password = required_secret(&self.password, "Password must be not null")?;
        let confirm = required_secret(&self.confirm_password, "Confirm password must be not null")?;
        self.validate().map_err(|_| AppError::not_valid("Email is not valid"))?;
        if password != confirm { return Err(AppError::not_valid("Confirm password does not match")); }
        Ok((email, password))
    }
}

impl ChangePasswordRequest {
    pub fn passwords(&self) -> Result<(&str, &str), AppError> {
        let old = required_secret(&self.old_password, "Old password must be not null")?;
        let new = required_secret(&self.new_password, "New password must be not null")?;
        let confirm = required_secret(&self.confirm_password, "Confirm password must be not null")?;
        if new != confirm { return Err(AppError::not_valid("Confirm password does not match")); }
        Ok((old, new))
    }
}

/// Token of a `Bearer <token>` refresh header.
pub fn refresh_token_of(header: Option<&str>) -> Result<&str, AppError> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::not_valid("Invalid refresh token"))
}

/// Whether `otp` is the stored code and still valid at `now`.
pub fn check_otp(stored: i32, expiration_time: DateTime<Utc>, otp: i32, now: DateTime<Utc>) -> Result<(), AppError> {
    if stored != otp { return Err(AppError::not_valid("OTP is incorrect")); }
    if expiration_time < now { return Err(AppError::not_valid("OTP has expired")); }
    Ok(())
}

pub fn generate_otp() -> i32 {
    rand::thread_rng().gen_range(100_000..1_000_000)
}

pub struct AuthService<'a> { state: &'a AppState }

impl<'a> AuthService<'a> {
    pub const fn new(state: &'a AppState) -> Self { Self { state } }

    fn users(&self) -> UserRepository<'a> { UserRepository::new(self.state.db()) }

    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, AppError> {
        let (email, password) = req.credentials()?;
        let invalid = || AppError::unauthorized("Email or password is incorrect");
        let user = self.users().find_by_email(email).await?.ok_or_else(invalid)?;
        if !password::verify_password(password, &user.password_hash).await {
            return Err(invalid());
        }
        if !user.status.is_active() {
            return Err(AppError::unauthorized("User is disabled"));
        }
        tracing::info!(user_id = user.id, "User logged in");
        self.state.tokens().issue_pair(&user.email, user.role)
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<ProfileResponse, AppError> {
        let (email, password) = req.credentials()?;
        if self.users().find_by_email(email).await?.is_some() {
            return Err(AppError::existed("Email is already registered"));
        }
        let hash = password::hash_password(password).await?;
        let user = self.users().create(email, &hash, RoleName::User).await.map_err(|e| {
            if is_unique_violation(&e) { AppError::existed("Email is already registered") } else { e.into() }
        })?;
        tracing::info!(user_id = user.id, "User registered");
        Ok(user.into())
    }

    pub async fn change_password(&self, current: &CurrentUser, req: &ChangePasswordRequest) -> Result<(), AppError> {
        let (old, new) = req.passwords()?;
        let user = self
            .users()
            .find_by_id(current.id)
            .await?
            .ok_or_else(|| AppError::field_not_found("User not found when change password"))?;
        if !password::verify_password(old, &user.password_hash).await {
            return Err(AppError::not_valid("Old password is incorrect"));
        }
        let hash = password::hash_password(new).await?;
        self.users().update_password(user.id, &hash).await?;
        tracing::info!(user_id = user.id, "Password changed");
        Ok(())
    }

    pub async fn profile(&self, current: &CurrentUser) -> Result<ProfileResponse, AppError> {
        self.users()
            .find_by_id(current.id)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::unauthorized("Unauthorized"))
    }

    pub async fn refresh_access_token(&self, authorization: Option<&str>) -> Result<LoginResponse, AppError> {
        let token = refresh_token_of(authorization)?;
        let claims = self
            .state
            .tokens()
            .validate_typed(token, TokenType::Refresh)
            .map_err(|_| AppError::not_valid("Invalid refresh token"))?;
        let user = self
            .users()
            .find_by_email(&claims.sub)
            .await?
            .filter(|u| u.status.is_active())
            .ok_or_else(|| AppError::not_valid("Invalid refresh token"))?;
        self.state.tokens().issue_pair(&user.email, user.role)
    }

    async fn user_by_email(&self, email: &Option<String>) -> Result<UserRow, AppError> {
        let email = required(email, "Email must be not null")?;
        self.users()
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::field_not_found(format!("User not found with email: {email}")))
    }

    pub async fn send_otp(&self, email: &Option<String>) -> Result<(), AppError> {
        let user = self.user_by_email(email).await?;
        let otp = generate_otp();
        let expires = Utc::now() + Duration::minutes(OTP_VALIDITY_MINUTES);
        self.users().upsert_otp(user.id, otp, expires).await.or_system("Error when saving OTP")?;
        let body = MailBody::new(
            user.email.clone(),
            "OTP for forgot password request",
            format!("This is the OTP for your forgot password request: {otp}. It expires in {OTP_VALIDITY_MINUTES} minutes."),
        );
        self.state.mailer().send_simple_mail(&body).await?;
        tracing::info!(user_id = user.id, "Sent password reset OTP");
        Ok(())
    }

    pub async fn verify_otp(&self, req: &OtpRequest) -> Result<(), AppError> {
        let user = self.user_by_email(&req.email).await?;
        let otp = req.otp.ok_or_else(|| AppError::not_null("OTP must be not null"))?;
        self.check_user_otp(user.id, otp).await
    }

    async fn check_user_otp(&self, user_id: i64, otp: i32) -> Result<(), AppError> {
        let stored = self
            .users()
            .find_otp(user_id)
            .await?
            .ok_or_else(|| AppError::field_not_found("OTP not found"))?;
        let now = Utc::now();
        if let Err(e) = check_otp(stored.otp, stored.expiration_time, otp, now) {
            if stored.expiration_time < now {
                self.users().delete_otp(user_id).await?;
            }
            return Err(e);
        }
        Ok(())
    }

    pub async fn reset_password(&self, req: &ResetPasswordRequest) -> Result<(), AppError> {
        let user = self.user_by_email(&req.email).await?;
        let otp = req.otp.ok_or_else(|| AppError::not_null("OTP must be not null"))?;
        let new = required_secret(&req.new_password, "New password must be not null")?;
        let confirm = required_secret(&req.confirm_password, "Confirm password must be not null")?;
        if new != confirm { return Err(AppError::not_valid("Confirm password does not match")); }
        self.check_user_otp(user.id, otp).await?;
        let hash = password::hash_password(new).await?;
        self.users().update_password(user.id, &hash).await?;
        self.users().delete_otp(user.id).await?;
        tracing::info!(user_id = user.id, "Password reset with OTP");
        Ok(())
    }

    pub async fn delete_expired_forgot_passwords(&self) -> Result<u64, AppError> {
        let removed = self.users().delete_expired_otps(Utc::now()).await?;
        if removed > 0 { tracing::debug!(removed, "Purged expired OTPs"); }
        Ok(removed)
    }

    /// Ensures both roles exist and the configured administrator account is present.
    pub async fn seed(&self, admin: Option<&AdminSeed>) -> Result<(), AppError> {
        self.users().ensure_roles().await?;
        let Some(admin) = admin else { return Ok(()) };
        if self.users().find_by_email(&admin.email).await?.is_some() {
            return Ok(());
        }
        let hash = password::hash_password(admin.password.expose_secret()).await?;
        let user = self.users().create(&admin.email, &hash, RoleName::Admin).await?;
        tracing::info!(user_id = user.id, email = %user.email, "Seeded administrator");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::codes;

    fn s(v: &str) -> Option<String> { Some(v.to_string()) }

    #[test]
    fn login_requires_both_fields() {
        let err = LoginRequest { email: None, password: s("x") }.credentials().unwrap_err();
        assert_eq!(err.code(), codes::FIELD_NOT_NULL);
        let err = LoginRequest { email: s("a@b.vn"), password: s("") }.credentials().unwrap_err();
        assert_eq!(err.to_string(), "Password must be not null");
        assert_eq!(LoginRequest { email: s(" a@b.vn "), password: s("pw") }.credentials().unwrap(), ("a@b.vn", "pw"));
        // Only the email is trimmed.
        assert_eq!(LoginRequest { email: s("a@b.vn"), password: s(" pw ") }.credentials().unwrap(), ("a@b.vn", " pw "));
    }

    #[test]
    fn register_rules() {
        let ok = RegisterRequest { email: s("new@shop.vn"), password: s("pw1"), confirm_password: s("pw1") };
        assert!(ok.credentials().is_ok());

        let mismatch = RegisterRequest { confirm_password: s("pw2"), ..ok.clone() };
        assert_eq!(mismatch.credentials().unwrap_err().code(), codes::FIELD_NOT_VALID);

        let bad_email = RegisterRequest { email: s("not-an-email"), ..ok.clone() };
        assert_eq!(bad_email.credentials().unwrap_err().to_string(), "Email is not valid");

        let missing = RegisterRequest { confirm_password: None, ..ok };
        assert_eq!(missing.credentials().unwrap_err().code(), codes::FIELD_NOT_NULL);
    }

    #[test]
    fn change_password_rules() {
        let req = ChangePasswordRequest { old_password: s("old"), new_password: s("new"), confirm_password: s("new") };
        assert_eq!(req.passwords().unwrap(), ("old", "new"));
        let req = ChangePasswordRequest { confirm_password: s("other"), ..req };
        assert_eq!(req.passwords().unwrap_err().code(), codes::FIELD_NOT_VALID);
        let req = ChangePasswordRequest { old_password: s(" "), ..Default::default() };
        assert_eq!(req.passwords().unwrap_err().code(), codes::FIELD_NOT_NULL);
    }

    #[test]
    fn refresh_header_needs_bearer() {
        assert_eq!(refresh_token_of(Some("Bearer abc")).unwrap(), "abc");
        for bad in [None, Some("abc"), Some("Bearer  ")] {
            let err = refresh_token_of(bad).unwrap_err();
            assert_eq!(err.to_string(), "Invalid refresh token");
            assert_eq!(err.code(), codes::FIELD_NOT_VALID);
        }
    }

    #[test]
    fn otp_checks() {
        let now = Utc::now();
        assert!(check_otp(123_456, now + Duration::minutes(1), 123_456, now).is_ok());
        assert_eq!(check_otp(123_456, now + Duration::minutes(1), 654_321, now).unwrap_err().to_string(), "OTP is incorrect");
        assert_eq!(check_otp(123_456, now - Duration::seconds(1), 123_456, now).unwrap_err().to_string(), "OTP has expired");
    }

    #[test]
    fn otp_has_six_digits() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert!((100_000..1_000_000).contains(&otp));
        }
    }
}
