//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a serde default so that a partial file
//! (or none at all) still yields a usable configuration.

pub mod app;
pub mod auth;
pub mod database;
pub mod logging;
pub mod presence;
pub mod realtime;
pub mod session;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::auth::AuthConfig;
pub use self::database::{DatabaseConfig, FriendPair, StoreProvider};
pub use self::logging::LoggingConfig;
pub use self::presence::PresenceConfig;
pub use self::realtime::RealtimeConfig;
pub use self::session::{AutoJoinConfig, SessionConfig};

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// files (default.toml + environment overlay + `TANDEM__*` variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Durable store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Bearer-token verification settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Heartbeat and online-window settings.
    #[serde(default)]
    pub presence: PresenceConfig,
    /// Focus session coordination settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Update feed settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default.toml` with the `config/{env}.toml` overlay and
    /// environment variables prefixed with `TANDEM__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("TANDEM")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Validate cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.presence.online_window_seconds < self.presence.heartbeat_interval_seconds {
            return Err(AppError::configuration(format!(
                "presence.online_window_seconds ({}) must be at least heartbeat_interval_seconds ({})",
                self.presence.online_window_seconds, self.presence.heartbeat_interval_seconds
            )));
        }
        if self.session.auto_join.default_duration_minutes == 0 {
            return Err(AppError::configuration(
                "session.auto_join.default_duration_minutes must be positive",
            ));
        }
        if self.realtime.session_frame_interval_ms == 0 || self.realtime.presence_frame_interval_ms == 0
        {
            return Err(AppError::configuration("realtime frame intervals must be positive"));
        }
        if self.database.provider == StoreProvider::Postgres && self.database.url.is_empty() {
            return Err(AppError::configuration(
                "database.url is required when database.provider = \"postgres\"",
            ));
        }
        Ok(())
    }
}
