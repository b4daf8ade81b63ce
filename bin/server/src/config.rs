//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables.
//!
//! See [`GateConfig`] for the gate and login flow settings, nested under
//! the `GATE__` prefix.

use admin_gate_access::GateConfig;
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Interval between expired-session purges, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,

    /// Administrator created or updated at startup.
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,

    /// Gate configuration.
    #[serde(default)]
    pub gate: GateConfig,
}

/// Credentials of the administrator ensured at startup.
#[derive(Clone, Deserialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Longest accepted session lifetime: 366 days.
pub const MAX_SESSION_LIFETIME_SECONDS: i64 = 366 * 24 * 60 * 60;

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_secure_cookies() -> bool {
    true
}

fn default_cleanup_interval_seconds() -> u64 {
    300
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would fail later at request time.
    ///
    /// # Errors
    ///
    /// Returns an error if the session lifetime is not between one second
    /// and [`MAX_SESSION_LIFETIME_SECONDS`].
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let lifetime = self.gate.session_lifetime_seconds;
        if !(1..=MAX_SESSION_LIFETIME_SECONDS).contains(&lifetime) {
            return Err(config::ConfigError::Message(format!(
                "gate.session_lifetime_seconds must be between 1 and {MAX_SESSION_LIFETIME_SECONDS}, got {lifetime}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_has_correct_defaults() {
        let config: ServerConfig = serde_json::from_value(serde_json::json!({
            "database_url": "postgres://localhost/admin_gate"
        }))
        .expect("deserialize");

        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert!(config.secure_cookies);
        assert_eq!(config.cleanup_interval_seconds, 300);
        assert!(config.bootstrap_admin.is_none());
        assert_eq!(config.gate.session_lifetime_seconds, 900);
        assert!(config.gate.open_actions.iter().any(|a| a == "logout"));
    }

    #[test]
    fn nested_gate_settings_override_defaults() {
        let config: ServerConfig = serde_json::from_value(serde_json::json!({
            "database_url": "postgres://localhost/admin_gate",
            "gate": { "use_secret_key": true, "base_url": "https://shop.example/admin" }
        }))
        .expect("deserialize");

        assert!(config.gate.use_secret_key);
        assert_eq!(config.gate.base_url, "https://shop.example/admin");
        assert!(config.gate.reload_principal);
    }

    fn with_lifetime(seconds: i64) -> ServerConfig {
        serde_json::from_value(serde_json::json!({
            "database_url": "postgres://localhost/admin_gate",
            "gate": { "session_lifetime_seconds": seconds }
        }))
        .expect("deserialize")
    }

    #[test]
    fn default_lifetime_is_valid() {
        assert!(with_lifetime(900).validate().is_ok());
        assert!(with_lifetime(MAX_SESSION_LIFETIME_SECONDS).validate().is_ok());
    }

    #[test]
    fn out_of_range_lifetime_is_rejected() {
        for seconds in [0, -60, MAX_SESSION_LIFETIME_SECONDS + 1, i64::MAX] {
            let err = with_lifetime(seconds).validate().unwrap_err();
            assert!(err.to_string().contains("session_lifetime_seconds"));
        }
    }

    #[test]
    fn bootstrap_password_is_redacted() {
        let admin = BootstrapAdmin {
            username: "admin".to_string(),
            password: "s3cret".to_string(),
        };
        assert!(!format!("{admin:?}").contains("s3cret"));
    }
}
