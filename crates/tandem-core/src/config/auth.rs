//! Bearer-token verification configuration.

use serde::{Deserialize, Serialize};

/// Identity verification configuration.
///
/// Tokens are issued by the external identity provider; Tandem only
/// verifies them with the shared HMAC secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for HS256 token verification.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Lifetime of locally minted tokens (dev tooling and tests), in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: u64,
    /// Allowed clock skew when checking `exp`, in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_seconds: default_token_ttl(),
            leeway_seconds: default_leeway(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_token_ttl() -> u64 {
    3600
}

fn default_leeway() -> u64 {
    5
}
