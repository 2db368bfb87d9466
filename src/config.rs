//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `JWT_SECRET` - HS256 signing secret
//! - `VNPAY_HASH_SECRET` - VNPay merchant signing key
//!
//! ## Optional
//! - `HOST` / `PORT` - bind address (default: 0.0.0.0:8080)
//! - `JWT_EXPIRATION_SECS` (3600), `JWT_REFRESH_EXPIRATION_SECS` (604800)
//! - `ADMIN_EMAIL` / `ADMIN_PASSWORD` - seeded administrator account
//! - `FRONTEND_URL` / `BACKEND_URL` - used for payment redirects
//! - `VNPAY_TMN_CODE`, `VNPAY_PAY_URL`, `VNPAY_API_URL`
//! - `SMTP_HOST`, `SMTP_PORT` (587), `SMTP_USERNAME`, `SMTP_PASSWORD`, `MAIL_FROM`
//! - `UPLOAD_DIR` - image upload directory (default: ./uploads)
//! - `NATS_URL` - publish domain events when set

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_PAY_URL: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";
const DEFAULT_API_URL: &str = "https://sandbox.vnpayment.vn/merchant_webapi/api/transaction";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    pub frontend_url: String,
    pub backend_url: String,
    pub jwt: JwtConfig,
    pub admin: Option<AdminSeed>,
    pub vnpay: VnPayConfig,
    /// SMTP settings; mails are only logged when absent
    pub smtp: Option<SmtpConfig>,
    pub upload_dir: PathBuf,
    pub nats_url: Option<String>,
}

/// Token signing configuration.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

/// Administrator created on first start.
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: SecretString,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// VNPay merchant configuration.
#[derive(Clone)]
pub struct VnPayConfig {
    pub tmn_code: String,
    pub hash_secret: SecretString,
    pub pay_url: String,
    pub api_url: String,
}

impl std::fmt::Debug for VnPayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VnPayConfig")
            .field("tmn_code", &self.tmn_code)
            .field("hash_secret", &"[REDACTED]")
            .field("pay_url", &self.pay_url)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Outgoing mail configuration.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = get_env_or_default("HOST", "0.0.0.0")
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidEnvVar("HOST".into(), e.to_string()))?;
        let port = parse_env("PORT", 8080u16)?;
        let backend_default = format!("http://localhost:{port}");

        let admin = match (get_optional_env("ADMIN_EMAIL"), get_optional_env("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password: SecretString::from(password) }),
            _ => None,
        };

        Ok(Self {
            database_url: get_required_secret("DATABASE_URL")?,
            host,
            port,
            frontend_url: get_env_or_default("FRONTEND_URL", "http://localhost:3000"),
            backend_url: get_env_or_default("BACKEND_URL", &backend_default),
            jwt: JwtConfig {
                secret: get_required_secret("JWT_SECRET")?,
                access_ttl_secs: parse_env("JWT_EXPIRATION_SECS", 3600)?,
                refresh_ttl_secs: parse_env("JWT_REFRESH_EXPIRATION_SECS", 604_800)?,
            },
            admin,
            vnpay: VnPayConfig {
                tmn_code: get_env_or_default("VNPAY_TMN_CODE", ""),
                hash_secret: get_required_secret("VNPAY_HASH_SECRET")?,
                pay_url: get_env_or_default("VNPAY_PAY_URL", DEFAULT_PAY_URL),
                api_url: get_env_or_default("VNPAY_API_URL", DEFAULT_API_URL),
            },
            smtp: SmtpConfig::from_env()?,
            upload_dir: PathBuf::from(get_env_or_default("UPLOAD_DIR", "./uploads")),
            nats_url: get_optional_env("NATS_URL"),
        })
    }

    /// Socket address the HTTP server binds to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SmtpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            host,
            port: parse_env("SMTP_PORT", 587)?,
            username: get_required_env("SMTP_USERNAME")?,
            password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("MAIL_FROM")?,
        }))
    }
}

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// A secret that must be set and not blank.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    get_optional_env(key).map(SecretString::from).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn parse_env_falls_back_to_default() {
        let v: u16 = parse_env("COFFEE_SHOP_TEST_UNSET_PORT", 9000).unwrap();
        assert_eq!(v, 9000);
    }

    #[test]
    fn parse_env_rejects_garbage() {
        std::env::set_var("COFFEE_SHOP_TEST_BAD_TTL", "soon");
        let err = parse_env::<i64>("COFFEE_SHOP_TEST_BAD_TTL", 1).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "COFFEE_SHOP_TEST_BAD_TTL"));
    }

    #[test]
    fn blank_secret_counts_as_missing() {
        std::env::set_var("COFFEE_SHOP_TEST_BLANK_SECRET", "   ");
        let err = get_required_secret("COFFEE_SHOP_TEST_BLANK_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "COFFEE_SHOP_TEST_BLANK_SECRET"));
        assert!(get_required_secret("COFFEE_SHOP_TEST_UNSET_SECRET").is_err());

        std::env::set_var("COFFEE_SHOP_TEST_SET_SECRET", "k3y");
        assert_eq!(get_required_secret("COFFEE_SHOP_TEST_SET_SECRET").unwrap().expose_secret(), "k3y");
    }

    #[test]
    fn debug_redacts_secrets() {
        let jwt = JwtConfig { secret: SecretString::from("super-secret-value"), access_ttl_secs: 1, refresh_ttl_secs: 2 };
        let out = format!("{jwt:?}");
        assert!(out.contains("[REDACTED]"));
        assert!(!out.contains("super-secret-value"));
    }
}
