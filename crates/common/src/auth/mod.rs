//! Authentication utilities
//!
//! Provides:
//! - JWT bearer token generation and validation
//! - Confirmation code generation and hashing
//! - Caller identity extraction

mod registration;

pub use registration::{
    issue_confirmation_code, obtain_token, register, SignupPayload, SignupResponse, TokenPayload,
    TokenResponse,
};

use crate::config::AuthConfig;
use crate::db::models::User;
use crate::db::Repository;
use crate::errors::{AppError, Result};
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Username at issue time
    pub username: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl JwtClaims {
    pub fn user_id(&self) -> Result<i32> {
        self.sub.parse().map_err(|_| AppError::InvalidToken)
    }
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Build from configuration; without a configured secret a random one is
    /// generated and tokens do not survive a restart
    pub fn from_config(config: &AuthConfig) -> Self {
        match config.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => Self::new(secret, config.jwt_expiration_secs),
            None => {
                tracing::warn!("auth.jwt_secret is not set, using a random per-process secret");
                let random_bytes: [u8; 32] = rand::random();
                Self::new(&hex::encode(random_bytes), config.jwt_expiration_secs)
            }
        }
    }

    /// Generate a new JWT token
    pub fn generate_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }
}

/// Hash a confirmation code for storage
pub fn hash_confirmation_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new confirmation code (32 hex chars)
pub fn generate_confirmation_code() -> String {
    let random_bytes: [u8; 16] = rand::random();
    hex::encode(random_bytes)
}

/// Extract the token from an Authorization header
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// What the identity extractor needs from application state
pub trait AuthBackend {
    fn jwt(&self) -> &JwtManager;
    fn repository(&self) -> Repository;
}

/// The caller of a request
#[derive(Debug, Clone)]
pub enum Actor {
    Anonymous,
    User(User),
}

impl Actor {
    pub fn user(&self) -> Option<&User> {
        match self {
            Actor::User(user) => Some(user),
            Actor::Anonymous => None,
        }
    }

    /// The authenticated user, or 401
    pub fn require_user(&self) -> Result<&User> {
        self.user().ok_or_else(|| AppError::Unauthorized {
            message: "authentication credentials were not provided".to_string(),
        })
    }
}

/// Axum extractor for the caller identity.
///
/// No Authorization header means anonymous; a header carrying a bad,
/// expired or orphaned token is rejected rather than downgraded.
impl<S> FromRequestParts<S> for Actor
where
    S: AuthBackend + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Some(header) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
            return Ok(Actor::Anonymous);
        };

        let token = header
            .to_str()
            .ok()
            .and_then(extract_bearer)
            .ok_or(AppError::InvalidToken)?;

        let claims = state.jwt().validate_token(token)?;
        let user = state
            .repository()
            .find_user_by_id(claims.user_id()?)
            .await?
            .ok_or(AppError::InvalidToken)?;

        tracing::debug!(user_id = user.id, username = %user.username, "Request authenticated");
        Ok(Actor::User(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;

    fn user() -> User {
        User {
            id: 42,
            username: "bob".into(),
            email: "bob@x.com".into(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role: Role::User,
            is_superuser: false,
            confirmation_code_hash: None,
            date_joined: Utc::now().into(),
        }
    }

    #[test]
    fn test_confirmation_code_hashing() {
        let code = generate_confirmation_code();
        assert_eq!(code.len(), 32);
        let hash = hash_confirmation_code(&code);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash_confirmation_code(&code), hash);
        assert_ne!(hash_confirmation_code("wrong"), hash);
        assert_ne!(generate_confirmation_code(), code);
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("abc.def"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);
        let token = manager.generate_token(&user()).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.username, "bob");
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let token = JwtManager::new("one", 3600).generate_token(&user()).unwrap();
        assert!(matches!(
            JwtManager::new("two", 3600).validate_token(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_random_secret_when_unset() {
        let config = AuthConfig::default();
        let manager = JwtManager::from_config(&config);
        let token = manager.generate_token(&user()).unwrap();
        assert!(manager.validate_token(&token).is_ok());
    }

    #[test]
    fn test_anonymous_actor_needs_credentials() {
        let err = Actor::Anonymous.require_user().unwrap_err();
        assert_eq!(err.status_code().as_u16(), 401);
        assert_eq!(Actor::User(user()).require_user().unwrap().id, 42);
    }
}
