//! Admin actions reached after the gate.
//!
//! Pages are plain HTML strings; the panel has no layout engine.

use admin_gate_access::{ActionHandler, Exchange, Message, Severity};
use async_trait::async_trait;
use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::app::AppState;
use crate::dispatch::{LOGIN_PASSWORD_FIELD, LOGIN_USERNAME_FIELD};
use crate::error::ActionError;

/// Resource guarding the dashboard.
pub const DASHBOARD_RESOURCE: &str = "dashboard";
/// Resource guarding system maintenance actions.
pub const SYSTEM_RESOURCE: &str = "system";

/// Dispatches a gated request to its action.
pub struct AdminActions {
    state: Arc<AppState>,
}

impl AdminActions {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn require(exchange: &Exchange, resource: &str) -> Result<(), ActionError> {
        if exchange.session.permissions().allows(resource) {
            Ok(())
        } else {
            Err(ActionError::Forbidden {
                resource: resource.to_string(),
            })
        }
    }

    fn dashboard(&self, exchange: &Exchange) -> Result<Response, ActionError> {
        Self::require(exchange, DASHBOARD_RESOURCE)?;
        let username = exchange
            .session
            .principal()
            .map(|p| p.username().to_string())
            .unwrap_or_default();
        let body = format!(
            "<h1>Dashboard</h1>\n<p>Signed in as {}.</p>\n{}<p><a href=\"{}\">Sign out</a></p>",
            escape_html(&username),
            render_messages(exchange.messages.items()),
            escape_html(&self.state.url("auth", "logout")),
        );
        Ok(Html(page("Dashboard", &body)).into_response())
    }

    fn login_form(&self, exchange: &Exchange) -> Result<Response, ActionError> {
        if exchange.session.is_logged_in() {
            return Ok(Redirect::to(&self.state.url("dashboard", "index")).into_response());
        }
        let login_url = self.state.login_url();
        let action = exchange.request.request_uri().unwrap_or(login_url.as_str());
        let body = format!(
            "<h1>Sign in</h1>\n{}<form method=\"post\" action=\"{}\">\n\
             <label>User Name <input type=\"text\" name=\"{}\" autofocus></label>\n\
             <label>Password <input type=\"password\" name=\"{}\"></label>\n\
             <button type=\"submit\">Sign in</button>\n</form>\n\
             <p><a href=\"{}\">Forgot your password?</a></p>",
            render_messages(exchange.messages.items()),
            escape_html(action),
            LOGIN_USERNAME_FIELD,
            LOGIN_PASSWORD_FIELD,
            escape_html(&self.state.url("auth", "forgotpassword")),
        );
        Ok(Html(page("Sign in", &body)).into_response())
    }

    fn denied_json(&self) -> Response {
        let payload = json!({
            "ajaxExpired": 1,
            "ajaxRedirect": self.state.login_url(),
        });
        (StatusCode::FORBIDDEN, Json(payload)).into_response()
    }

    fn denied_iframe(&self) -> Response {
        // a JSON string literal is a valid JavaScript string literal
        let location = serde_json::Value::String(self.state.login_url()).to_string();
        let body = format!(
            "<script>parent.window.location = {};</script>",
            location.replace("</", "<\\/")
        );
        (StatusCode::FORBIDDEN, Html(page("Session expired", &body))).into_response()
    }

    fn logout(&self, exchange: &mut Exchange) -> Response {
        self.state.gate.authenticator().logout(&mut exchange.session);
        exchange.end_session();
        Redirect::to(&self.state.login_url()).into_response()
    }

    fn forgot_password(&self) -> Response {
        let body = format!(
            "<h1>Password recovery</h1>\n<p>Ask an administrator to reset your password.</p>\n\
             <p><a href=\"{}\">Back to sign in</a></p>",
            escape_html(&self.state.login_url()),
        );
        Html(page("Password recovery", &body)).into_response()
    }

    async fn purge_sessions(&self, exchange: &Exchange) -> Result<Response, ActionError> {
        Self::require(exchange, SYSTEM_RESOURCE)?;
        let purged = self
            .state
            .sessions
            .purge_expired()
            .await
            .map_err(|e| ActionError::Storage {
                details: e.to_string(),
            })?;
        info!(purged, "purged expired sessions");
        Ok(Json(json!({ "purged": purged })).into_response())
    }
}

#[async_trait]
impl ActionHandler<Response> for AdminActions {
    async fn handle(&self, exchange: &mut Exchange) -> Response {
        let target = exchange.request.target().clone();
        let result = match (target.controller(), target.action()) {
            ("index", "index") | ("dashboard", "index") => self.dashboard(exchange),
            ("auth", "login") => self.login_form(exchange),
            ("auth", "deniedJson") => Ok(self.denied_json()),
            ("auth", "deniedIframe") => Ok(self.denied_iframe()),
            ("auth", "logout") => Ok(self.logout(exchange)),
            ("auth", "forgotpassword") => Ok(self.forgot_password()),
            ("system", "purgeSessions") => self.purge_sessions(exchange).await,
            _ => Err(ActionError::NotFound {
                action: target.to_string(),
            }),
        };
        result.unwrap_or_else(IntoResponse::into_response)
    }
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{} / Admin</title></head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        body
    )
}

fn render_messages(messages: &[Message]) -> String {
    if messages.is_empty() {
        return String::new();
    }
    let items: String = messages
        .iter()
        .map(|m| {
            let class = match m.severity {
                Severity::Error => "error",
                Severity::Notice => "notice",
            };
            format!("<li class=\"{class}\">{}</li>", escape_html(&m.text))
        })
        .collect();
    format!("<ul class=\"messages\">{items}</ul>\n")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
