//! Login flow for requests that reach the gate unauthenticated.
//!
//! The resolver tries submitted credentials first, redirects after a
//! successful login when it knows where to send the browser, and otherwise
//! rewrites the request to the denial destination that fits the request's
//! shape. A request is rewritten at most once per dispatch: the forwarded
//! marker is checked before every rewrite.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::auth::Authenticator;
use crate::credentials::LoginCredentials;
use crate::message::MessageSink;
use crate::request::{RequestContext, RequestTarget};
use crate::session::Session;
use crate::url::UrlBuilder;

/// Route that serves the authentication pages.
pub const ADMIN_ROUTE: &str = "adminhtml";
/// Controller that serves the authentication pages.
pub const AUTH_CONTROLLER: &str = "auth";

/// Where an unauthenticated request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Denied {
    /// Request from an embedded frame: a page that breaks out of the frame.
    Frame,
    /// Asynchronous request: a structured (JSON) denial.
    Structured,
    /// Plain navigation: the login form.
    Login,
}

impl Denied {
    /// Picks the denial for a request. Frame requests win over ajax requests.
    #[must_use]
    pub fn for_request(request: &RequestContext) -> Self {
        if request.is_iframe() {
            Self::Frame
        } else if request.is_ajax() {
            Self::Structured
        } else {
            Self::Login
        }
    }

    #[must_use]
    pub fn action_name(self) -> &'static str {
        match self {
            Self::Frame => "deniedIframe",
            Self::Structured => "deniedJson",
            Self::Login => "login",
        }
    }

    #[must_use]
    pub fn target(self) -> RequestTarget {
        RequestTarget::new(ADMIN_ROUTE, AUTH_CONTROLLER, self.action_name())
    }
}

/// Outcome of the login flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Login succeeded; send the browser here and dispatch nothing.
    Redirect(String),
    /// The request now targets a denial destination.
    Rewrite(Denied),
    /// The request was already forwarded; let it run.
    Continue,
}

/// Resolves requests from sessions that are not logged in.
#[derive(Clone)]
pub struct LoginFlowResolver {
    authenticator: Authenticator,
    urls: Arc<dyn UrlBuilder>,
}

impl LoginFlowResolver {
    #[must_use]
    pub fn new(authenticator: Authenticator, urls: Arc<dyn UrlBuilder>) -> Self {
        Self {
            authenticator,
            urls,
        }
    }

    /// Runs the login flow for one pass of the gate.
    #[instrument(skip_all, fields(action = %request.target()))]
    pub async fn resolve(
        &self,
        request: &mut RequestContext,
        session: &mut Session,
        messages: &mut dyn MessageSink,
    ) -> Resolution {
        let mut redirect = None;
        if let Some(credentials) = request.take_login() {
            if self
                .perform_login(request, session, &credentials, messages)
                .await
            {
                redirect = self.redirect_after_login(request);
            }
        }

        if let Some(location) = redirect {
            debug!(%location, "redirecting after login");
            request.set_no_dispatch();
            return Resolution::Redirect(location);
        }

        if request.is_forwarded() {
            return Resolution::Continue;
        }

        let denied = Denied::for_request(request);
        debug!(destination = denied.action_name(), "rewriting unauthenticated request");
        request.rewrite(denied.target());
        Resolution::Rewrite(denied)
    }

    /// Attempts a login, reporting a failure to the user at most once per request.
    async fn perform_login(
        &self,
        request: &mut RequestContext,
        session: &mut Session,
        credentials: &LoginCredentials,
        messages: &mut dyn MessageSink,
    ) -> bool {
        match self.authenticator.login(session, credentials).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, username = %credentials.username(), "admin login failed");
                if !request.is_message_sent() {
                    messages.add_error(e.user_message().to_string());
                    request.mark_message_sent();
                }
                false
            }
        }
    }

    fn redirect_after_login(&self, request: &RequestContext) -> Option<String> {
        if self.urls.use_secret_key() {
            Some(self.urls.current_url(request))
        } else {
            request.request_uri().map(str::to_string)
        }
    }
}
