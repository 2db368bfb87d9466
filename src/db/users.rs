//! Users, roles and password-reset codes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::domain::value_objects::{RoleName, Status};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub profile_img: Option<String>,
    pub role: RoleName,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OtpRow { pub otp: i32, pub expiration_time: DateTime<Utc>, pub user_id: i64 }

const USER_SELECT: &str = "SELECT u.id, u.email, u.password_hash, u.name, u.phone, u.profile_img, r.name AS role, \
     u.status, u.created_at, u.updated_at FROM users u JOIN roles r ON r.id = u.role_id";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, sqlx::Error> {
        sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} WHERE lower(u.email) = lower($1)"))
            .bind(email)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<UserRow>, sqlx::Error> {
        sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn exists(&self, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool)
            .await
    }

    pub async fn list(&self) -> Result<Vec<UserRow>, sqlx::Error> {
        sqlx::query_as::<_, UserRow>(&format!("{USER_SELECT} ORDER BY u.id"))
            .fetch_all(self.pool)
            .await
    }

    /// Insert an ACTIVE user with the given role.
    ///
    /// # Errors
    ///
    /// Unique violations on `email` are returned as `sqlx::Error::Database`.
    pub async fn create(&self, email: &str, password_hash: &str, role: RoleName) -> Result<UserRow, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (email, password_hash, role_id, status) \
             SELECT $1, $2, r.id, 'ACTIVE' FROM roles r WHERE r.name = $3 RETURNING id",
        )
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(self.pool)
        .await?;
        self.find_by_id(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_info(&self, id: i64, name: Option<&str>, phone: Option<&str>) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET name = COALESCE($2, name), phone = COALESCE($3, phone), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(name)
        .bind(phone)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_avatar(&self, id: i64, url: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET profile_img = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(url)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Returns `false` when no user has this id.
    pub async fn set_status(&self, id: i64, status: Status) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn ensure_roles(&self) -> Result<(), sqlx::Error> {
        for role in [RoleName::Admin, RoleName::User] {
            sqlx::query("INSERT INTO roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(role)
                .execute(self.pool)
                .await?;
        }
        Ok(())
    }

    // ---- forgot-password codes ----

    /// Stores `otp` for the user, replacing any previous code.
    pub async fn upsert_otp(&self, user_id: i64, otp: i32, expiration_time: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO forgot_passwords (otp, expiration_time, user_id) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE SET otp = EXCLUDED.otp, expiration_time = EXCLUDED.expiration_time",
        )
        .bind(otp)
        .bind(expiration_time)
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_otp(&self, user_id: i64) -> Result<Option<OtpRow>, sqlx::Error> {
        sqlx::query_as::<_, OtpRow>("SELECT otp, expiration_time, user_id FROM forgot_passwords WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn delete_otp(&self, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM forgot_passwords WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_expired_otps(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let res = sqlx::query("DELETE FROM forgot_passwords WHERE expiration_time < $1")
            .bind(now)
            .execute(self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}
