//! Access and refresh tokens (HS256).

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::domain::value_objects::RoleName;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType { Access, Refresh }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User email
    pub sub: String,
    pub role: RoleName,
    pub typ: TokenType,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
    pub role: RoleName,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl: config.access_ttl_secs,
            refresh_ttl: config.refresh_ttl_secs,
        }
    }

    pub fn issue(&self, email: &str, role: RoleName, typ: TokenType) -> Result<String, AppError> {
        let iat = Utc::now().timestamp();
        let ttl = match typ { TokenType::Access => self.access_ttl, TokenType::Refresh => self.refresh_ttl };
        let claims = Claims { sub: email.to_string(), role, typ, iat, exp: iat + ttl };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    pub fn issue_pair(&self, email: &str, role: RoleName) -> Result<LoginResponse, AppError> {
        Ok(LoginResponse {
            access_token: self.issue(email, role, TokenType::Access)?,
            refresh_token: self.issue(email, role, TokenType::Refresh)?,
            expires_in: self.access_ttl,
            refresh_expires_in: self.refresh_ttl,
            role,
        })
    }

    /// Decodes and checks signature and expiry.
    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected token");
                AppError::unauthorized("Invalid JWT token")
            })
    }

    pub fn validate_typed(&self, token: &str, typ: TokenType) -> Result<Claims, AppError> {
        let claims = self.validate(token)?;
        if claims.typ != typ { return Err(AppError::unauthorized("Invalid JWT token")); }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::codes;
    use secrecy::SecretString;

    fn service(access: i64) -> TokenService {
        TokenService::new(&JwtConfig { secret: SecretString::from("test-secret-test-secret-test-secret"), access_ttl_secs: access, refresh_ttl_secs: 600 })
    }

    #[test]
    fn pair_round_trips() {
        let tokens = service(60);
        let pair = tokens.issue_pair("barista@shop.vn", RoleName::User).unwrap();
        assert_ne!(pair.access_token, pair.refresh_token);
        let claims = tokens.validate_typed(&pair.access_token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, "barista@shop.vn");
        assert_eq!(claims.role, RoleName::User);
        assert_eq!(claims.exp - claims.iat, 60);
        assert!(tokens.validate_typed(&pair.refresh_token, TokenType::Access).is_err());
        assert!(tokens.validate_typed(&pair.refresh_token, TokenType::Refresh).is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service(-30);
        let token = tokens.issue("a@b.vn", RoleName::Admin, TokenType::Access).unwrap();
        let err = tokens.validate(&token).unwrap_err();
        assert_eq!(err.code(), codes::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Invalid JWT token");
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = TokenService::new(&JwtConfig { secret: SecretString::from("another-secret"), access_ttl_secs: 60, refresh_ttl_secs: 60 });
        let token = other.issue("a@b.vn", RoleName::User, TokenType::Access).unwrap();
        assert!(service(60).validate(&token).is_err());
        assert!(service(60).validate("garbage").is_err());
    }
}
