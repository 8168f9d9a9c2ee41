//! Salted password hashing
//!
//! Argon2 is CPU-bound, so both operations run on the blocking thread pool to
//! keep request tasks responsive.

use anyhow::{Context, Result};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use std::sync::OnceLock;

/// Hash a plaintext password into a PHC string
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .context("password hashing task failed")?
}

/// Verify a plaintext password against a stored PHC string
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    tokio::task::spawn_blocking(move || verify_blocking(&password, &password_hash))
        .await
        .context("password verification task failed")?
}

/// Burn the same amount of work as a real verification.
///
/// Used when the account does not exist so response timing does not reveal
/// which check failed.
pub async fn verify_dummy(password: &str) -> Result<()> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let digest = dummy_hash()?;
        verify_blocking(&password, digest).map(|_| ())
    })
    .await
    .context("password verification task failed")?
}

fn hash_blocking(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(password_hash)
}

fn verify_blocking(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    let argon2 = Argon2::default();
    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn dummy_hash() -> Result<&'static str> {
    static DUMMY: OnceLock<String> = OnceLock::new();
    if let Some(digest) = DUMMY.get() {
        return Ok(digest);
    }
    let digest = hash_blocking("dummy-password-for-timing")?;
    Ok(DUMMY.get_or_init(|| digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let digest = hash_password("password123").await.unwrap();

        assert_ne!(digest, "password123");
        assert!(digest.starts_with("$argon2"));
        assert!(verify_password("password123", &digest).await.unwrap());
        assert!(!verify_password("password124", &digest).await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let first = hash_password("password123").await.unwrap();
        let second = hash_password("password123").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn malformed_digest_is_an_error() {
        assert!(verify_password("password123", "plaintext").await.is_err());
    }

    #[tokio::test]
    async fn dummy_verification_succeeds() {
        verify_dummy("anything").await.unwrap();
    }
}
