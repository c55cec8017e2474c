//! JWT validation and claims extraction.
//!
//! This module provides the core JWT validation logic, including signature
//! verification and claims validation.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use parley_core::UserId;

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// Validated claims extracted from a JWT.
#[derive(Debug, Clone)]
pub struct ValidatedClaims {
    /// The authenticated user, from the `sub` claim.
    pub user_id: UserId,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Trait for validating JWTs.
#[async_trait]
pub trait JwtValidator: Send + Sync {
    /// Validate a JWT and extract claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired, or cannot be validated.
    async fn validate(&self, token: &str) -> Result<ValidatedClaims>;
}

/// Extract the token from an `Authorization` header value.
///
/// Returns `None` unless the value uses the `Bearer` scheme with a
/// non-empty token.
#[must_use]
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Raw claims carried by a token.
#[derive(Debug, Serialize, Deserialize)]
struct RawClaims {
    /// Subject (user ID as UUID string)
    sub: String,
    /// Expiration timestamp
    exp: u64,
    /// Issued at timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<u64>,
    /// Issuer (validated by jsonwebtoken when configured)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
}

/// Shared-secret (HS256) JWT validator.
pub struct SecretValidator {
    key: DecodingKey,
    validation: Validation,
}

impl SecretValidator {
    /// Create a new validator from configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_seconds;
        validation.validate_exp = true;
        // Tokens are not audience-scoped
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl JwtValidator for SecretValidator {
    async fn validate(&self, token: &str) -> Result<ValidatedClaims> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let token_data =
            decode::<RawClaims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(claim) => {
                    AuthError::MissingClaim(claim.clone())
                }
                _ => AuthError::InvalidToken(e.to_string()),
            })
            .inspect_err(|e| tracing::debug!(error = %e, "Rejected bearer token"))?;

        let claims = token_data.claims;

        let user_id = UserId::from_str(&claims.sub).map_err(|_| AuthError::InvalidUserId)?;

        let exp_secs = i64::try_from(claims.exp).unwrap_or(i64::MAX);
        let expires_at = DateTime::from_timestamp(exp_secs, 0)
            .ok_or_else(|| AuthError::InvalidToken("invalid exp timestamp".to_string()))?;

        Ok(ValidatedClaims {
            user_id,
            expires_at,
        })
    }
}

/// Sign an HS256 token for `user_id` that expires after `ttl`.
///
/// Only available to tests; production tokens come from the login service.
///
/// # Errors
///
/// Returns an error if encoding fails.
#[cfg(any(test, feature = "test-utils"))]
pub fn sign_token(config: &AuthConfig, user_id: &UserId, ttl: chrono::Duration) -> Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = Utc::now();
    let claims = RawClaims {
        sub: user_id.to_string(),
        exp: u64::try_from((now + ttl).timestamp()).unwrap_or_default(),
        iat: u64::try_from(now.timestamp()).ok(),
        iss: config.issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AuthError::Internal(e.to_string()))
}

/// A mock JWT validator for testing.
///
/// This validator accepts any token in the format `test-token:<user_uuid>`
/// and extracts the ID from it.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockJwtValidator;

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl JwtValidator for MockJwtValidator {
    async fn validate(&self, token: &str) -> Result<ValidatedClaims> {
        // Expected format: test-token:<user_uuid>
        let rest = token
            .strip_prefix("test-token:")
            .ok_or_else(|| AuthError::InvalidToken("expected test-token:<user>".to_string()))?;

        let user_id = UserId::from_str(rest).map_err(|_| AuthError::InvalidUserId)?;

        Ok(ValidatedClaims {
            user_id,
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }
}
