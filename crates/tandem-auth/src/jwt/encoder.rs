//! JWT token creation.
//!
//! Production tokens are minted by the identity provider; this encoder
//! exists for local tooling and tests that share the same secret.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use tandem_core::config::AuthConfig;
use tandem_core::error::AppError;
use tandem_core::result::AppResult;
use tandem_core::types::UserId;

use super::claims::Claims;

/// Creates signed HS256 tokens.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder").field("ttl", &self.ttl).finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl: Duration::seconds(i64::try_from(config.token_ttl_seconds).unwrap_or(i64::MAX)),
        }
    }

    /// Issue a token for `user_id` valid from now.
    pub fn issue(&self, user_id: UserId) -> AppResult<String> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token for `user_id` as if minted at `issued_at`.
    pub fn issue_at(&self, user_id: UserId, issued_at: DateTime<Utc>) -> AppResult<String> {
        let claims = Claims {
            sub: user_id,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }
}
