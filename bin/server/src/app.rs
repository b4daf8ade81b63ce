//! Shared application state and the admin router.

use admin_gate_access::{
    GateConfig, GateInterceptor, InterceptorChain, PrincipalDirectory, RequestGate,
    SessionStore, TimingInterceptor,
};
use axum::{Router, response::Response, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::dispatch;

/// Shared application state.
pub struct AppState {
    /// Session persistence.
    pub sessions: Arc<dyn SessionStore>,
    /// Gate used by the interceptor chain, also consulted by actions.
    pub gate: RequestGate,
    /// Interceptors run around every admin action.
    pub chain: InterceptorChain<Response>,
    /// Whether to set the Secure flag on the session cookie.
    pub secure_cookies: bool,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        directory: Arc<dyn PrincipalDirectory>,
        gate_config: &GateConfig,
        secure_cookies: bool,
    ) -> Self {
        let gate = RequestGate::from_config(gate_config, directory);
        let chain = InterceptorChain::new()
            .with(TimingInterceptor)
            .with(GateInterceptor::new(gate.clone()));
        Self {
            sessions,
            gate,
            chain,
            secure_cookies,
        }
    }

    /// Absolute URL of an admin action.
    pub fn url(&self, controller: &str, action: &str) -> String {
        format!("{}/{}/{}", self.gate.urls().base_url(), controller, action)
    }

    /// URL of the login form.
    pub fn login_url(&self) -> String {
        self.url("auth", "login")
    }
}

/// Builds the admin router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/admin",
            get(dispatch::admin_index).post(dispatch::admin_index),
        )
        .route(
            "/admin/{controller}/{action}",
            get(dispatch::admin_action).post(dispatch::admin_action),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
