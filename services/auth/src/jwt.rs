//! JWT service for token issuance and verification
//!
//! Tokens are signed with HS256 using a single process-wide secret. Access
//! tokens carry the caller's identity and role, refresh tokens carry only the
//! subject, and reset tokens are short-lived access-shaped tokens used by the
//! password reset flow.

use anyhow::Result;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Role, User};

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret used for signing and verification
    pub secret: String,
    /// Access token expiration time in seconds (default: 1 day)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
    /// Password reset token expiration time in seconds (default: 1 hour)
    pub reset_token_expiry: u64,
}

impl JwtConfig {
    /// Configuration with the default lifetimes
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_token_expiry: 86_400,
            refresh_token_expiry: 604_800,
            reset_token_expiry: 3_600,
        }
    }

    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: Signing secret (required)
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 86400)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    /// - `JWT_RESET_TOKEN_EXPIRY`: Reset token expiry in seconds (default: 3600)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let defaults = Self::new(secret);
        let read = |name: &str, default: u64| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };

        Ok(JwtConfig {
            access_token_expiry: read("JWT_ACCESS_TOKEN_EXPIRY", defaults.access_token_expiry),
            refresh_token_expiry: read("JWT_REFRESH_TOKEN_EXPIRY", defaults.refresh_token_expiry),
            reset_token_expiry: read("JWT_RESET_TOKEN_EXPIRY", defaults.reset_token_expiry),
            ..defaults
        })
    }
}

/// Token type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
    Reset,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    pub token_type: TokenType,
}

impl Claims {
    /// Full identity claims for an access token
    pub fn access(user: &User) -> Self {
        Self::identity(user, TokenType::Access)
    }

    /// Subject-only claims for a refresh token
    pub fn refresh(user_id: Uuid) -> Self {
        Self {
            sub: user_id,
            email: None,
            role: None,
            full_name: None,
            iat: 0,
            exp: 0,
            token_type: TokenType::Refresh,
        }
    }

    /// Identity claims for a password reset token
    pub fn reset(user: &User) -> Self {
        Self::identity(user, TokenType::Reset)
    }

    fn identity(user: &User, token_type: TokenType) -> Self {
        Self {
            sub: user.id,
            email: Some(user.email.clone()),
            role: Some(user.role),
            full_name: Some(user.full_name.clone()),
            iat: 0,
            exp: 0,
            token_type,
        }
    }

    /// Role carried by the token; tokens without one are treated as plain users
    pub fn role(&self) -> Role {
        self.role.unwrap_or_default()
    }
}

/// Why a token was rejected
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => {
                debug!("Rejected token: {}", err);
                TokenError::Invalid
            }
        }
    }
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Sign `claims` so that they expire `ttl` seconds from now
    pub fn issue(&self, mut claims: Claims, ttl: u64) -> Result<String, TokenError> {
        let now = now_secs();
        claims.iat = now;
        claims.exp = now + ttl;

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    pub fn issue_access_token(&self, user: &User) -> Result<String, TokenError> {
        self.issue(Claims::access(user), self.config.access_token_expiry)
    }

    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.issue(Claims::refresh(user_id), self.config.refresh_token_expiry)
    }

    pub fn issue_reset_token(&self, user: &User) -> Result<String, TokenError> {
        self.issue(Claims::reset(user), self.config.reset_token_expiry)
    }

    /// Check signature and expiry and return the claims.
    ///
    /// The role claim is normalized while decoding; an unknown role makes the
    /// token invalid.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Verify a token and require it to be of the given type
    pub fn verify_as(&self, token: &str, token_type: TokenType) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.token_type != token_type {
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }

    // Get the access token expiry time
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serial_test::serial;

    fn service() -> JwtService {
        JwtService::new(JwtConfig::new("test-secret"))
    }

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            email: "alice@test.com".to_string(),
            password_hash: String::new(),
            full_name: "Alice".to_string(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn access_token_round_trips_identity() {
        let service = service();
        let user = user(Role::Admin);

        let token = service.issue_access_token(&user).unwrap();
        let claims = service.verify_as(&token, TokenType::Access).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email.as_deref(), Some("alice@test.com"));
        assert_eq!(claims.role(), Role::Admin);
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[test]
    fn refresh_token_is_subject_only() {
        let service = service();
        let id = Uuid::new_v4();

        let token = service.issue_refresh_token(id).unwrap();
        let claims = service.verify_as(&token, TokenType::Refresh).unwrap();
        assert_eq!(claims.sub, id);
        assert!(claims.email.is_none());
        assert!(claims.role.is_none());

        assert!(matches!(
            service.verify_as(&token, TokenType::Access),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let service = service();
        let mut claims = Claims::access(&user(Role::User));
        claims.iat = now_secs() - 120;
        claims.exp = now_secs() - 60;
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(service.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn tampered_token_is_invalid() {
        let service = service();
        let token = service.issue_access_token(&user(Role::User)).unwrap();

        let payload_start = token.find('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        let target = payload_start + 5;
        bytes[target] = if bytes[target] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(matches!(service.verify(&tampered), Err(TokenError::Invalid)));
        assert!(matches!(service.verify("not-a-token"), Err(TokenError::Invalid)));
    }

    #[test]
    fn token_from_other_secret_is_invalid() {
        let other = JwtService::new(JwtConfig::new("other-secret"));
        let token = other.issue_access_token(&user(Role::User)).unwrap();
        assert!(matches!(service().verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn uppercase_role_claim_is_normalized() {
        let service = service();
        let now = now_secs();
        let claims = serde_json::json!({
            "sub": Uuid::new_v4(),
            "role": "ADMIN",
            "iat": now,
            "exp": now + 60,
            "token_type": "access",
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(service.verify(&token).unwrap().role(), Role::Admin);
    }

    #[test]
    #[serial]
    fn config_requires_secret() {
        unsafe {
            std::env::remove_var("JWT_SECRET");
        }
        assert!(JwtConfig::from_env().is_err());

        unsafe {
            std::env::set_var("JWT_SECRET", "from-env");
            std::env::set_var("JWT_ACCESS_TOKEN_EXPIRY", "60");
        }
        let config = JwtConfig::from_env().unwrap();
        assert_eq!(config.secret, "from-env");
        assert_eq!(config.access_token_expiry, 60);
        assert_eq!(config.refresh_token_expiry, 604_800);

        unsafe {
            std::env::remove_var("JWT_SECRET");
            std::env::remove_var("JWT_ACCESS_TOKEN_EXPIRY");
        }
    }
}
