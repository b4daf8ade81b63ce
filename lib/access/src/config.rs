//! Gate configuration.
//!
//! Every field has a default so the whole block can be omitted when loading
//! from environment variables.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::url::BackendApp;

/// Configuration for the request gate and the login flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Idle lifetime of an admin session, in seconds.
    #[serde(default = "default_session_lifetime_seconds")]
    pub session_lifetime_seconds: i64,

    /// Actions reachable without authentication.
    #[serde(default = "default_open_actions")]
    pub open_actions: Vec<String>,

    /// When set, the post-login redirect targets the canonical URL of the
    /// current request instead of the raw request URI.
    #[serde(default)]
    pub use_secret_key: bool,

    /// Reload the session's principal from the directory on every request.
    #[serde(default = "default_reload_principal")]
    pub reload_principal: bool,

    /// Base URL of the admin area.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Secondary applications reachable through the `app` request parameter.
    #[serde(default)]
    pub applications: Vec<BackendApp>,
}

fn default_session_lifetime_seconds() -> i64 {
    900
}

fn default_open_actions() -> Vec<String> {
    [
        "forgotpassword",
        "resetpassword",
        "resetpasswordpost",
        "logout",
        // captcha refresh
        "refresh",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_reload_principal() -> bool {
    true
}

fn default_base_url() -> String {
    "/admin".to_string()
}

impl GateConfig {
    /// Returns the session lifetime as a duration.
    #[must_use]
    pub fn session_lifetime(&self) -> Duration {
        Duration::seconds(self.session_lifetime_seconds)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            session_lifetime_seconds: default_session_lifetime_seconds(),
            open_actions: default_open_actions(),
            use_secret_key: false,
            reload_principal: default_reload_principal(),
            base_url: default_base_url(),
            applications: Vec::new(),
        }
    }
}
