//! Password hashing with Argon2id.
//!
//! Hashing is CPU-bound, so the public functions run it on tokio's blocking pool.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AppError;

/// Hash a password using Argon2id.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_now(&password))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))?
}

/// Verify a password against a stored hash. Malformed hashes never verify.
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let (password, hash) = (password.to_owned(), hash.to_owned());
    match tokio::task::spawn_blocking(move || verify_now(&password, &hash)).await {
        Ok(verified) => verified,
        Err(e) => {
            tracing::error!(error = %e, "Password verification task failed");
            false
        }
    }
}

fn hash_now(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

fn verify_now(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("espresso-42").await.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("espresso-42", &hash).await);
        assert!(!verify_password("espresso-43", &hash).await);
    }

    #[tokio::test]
    async fn surrounding_spaces_are_part_of_the_password() {
        let hash = hash_password(" brew ").await.unwrap();
        assert!(verify_password(" brew ", &hash).await);
        assert!(!verify_password("brew", &hash).await);
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_now("same").unwrap(), hash_now("same").unwrap());
    }

    #[test]
    fn garbage_hash_fails() {
        assert!(!verify_now("x", "not-a-hash"));
    }
}
