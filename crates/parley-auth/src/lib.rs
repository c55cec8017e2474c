//! Bearer credential verification for parley.
//!
//! Tokens are issued by the external login flow. This crate only checks
//! them, using the same rule for HTTP requests and live connections:
//!
//! - HS256 signature over a shared secret
//! - `exp` validation with configurable leeway
//! - Optional `iss` check
//! - `sub` parsed as the caller's [`UserId`](parley_core::UserId)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   Gateway        │────▶│   JwtValidator   │
//! │   (HTTP/WS)      │     │   (trait)        │
//! └──────────────────┘     └────────┬─────────┘
//!                                   │
//!                          ┌────────▼─────────┐
//!                          │ SecretValidator  │
//!                          │ (HS256)          │
//!                          └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use parley_auth::{AuthConfig, JwtValidator, SecretValidator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig {
//!     secret: "super-secret".to_string(),
//!     issuer: None,
//!     leeway_seconds: 30,
//! };
//!
//! let validator = SecretValidator::new(&config);
//!
//! // In a request handler:
//! let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...";
//! let claims = validator.validate(token).await?;
//!
//! println!("User ID: {}", claims.user_id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod jwt;

pub use error::{AuthError, Result};
pub use jwt::{bearer_token, JwtValidator, SecretValidator, ValidatedClaims};

#[cfg(any(test, feature = "test-utils"))]
pub use jwt::{sign_token, MockJwtValidator};

/// Configuration for bearer credential verification.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared HS256 secret used by the token issuer.
    pub secret: String,
    /// Expected JWT issuer (`iss` claim). Not checked when `None`.
    pub issuer: Option<String>,
    /// Clock skew tolerated on `exp`, in seconds.
    pub leeway_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: None,
            leeway_seconds: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AuthConfig::default();
        assert!(config.secret.is_empty());
        assert!(config.issuer.is_none());
        assert_eq!(config.leeway_seconds, 60);
    }
}
