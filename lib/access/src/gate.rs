//! The request gate: decides, before any admin action runs, whether a
//! request may proceed, must be redirected, or has to be rewritten to a
//! denial destination.

use rootcause::Report;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::auth::Authenticator;
use crate::config::GateConfig;
use crate::directory::PrincipalDirectory;
use crate::error::GateError;
use crate::message::MessageSink;
use crate::request::RequestContext;
use crate::resolver::{Denied, LoginFlowResolver, Resolution};
use crate::session::Session;
use crate::url::{AdminUrl, Applications, UrlBuilder};

/// Verdict of the gate for one pass over a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Run the request's current target.
    Proceed,
    /// Send the browser elsewhere; nothing is dispatched.
    Redirect(String),
    /// The request was rewritten to a denial destination and must be re-dispatched.
    RewriteTo(Denied),
}

/// Actions reachable without authentication.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    actions: HashSet<String>,
}

impl AllowList {
    #[must_use]
    pub fn new<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, action: &str) -> bool {
        self.actions.contains(action)
    }
}

/// Authentication gate placed in front of every admin action.
#[derive(Clone)]
pub struct RequestGate {
    allow_list: AllowList,
    authenticator: Authenticator,
    resolver: LoginFlowResolver,
    urls: Arc<dyn UrlBuilder>,
    applications: Applications,
    reload_principal: bool,
}

impl RequestGate {
    #[must_use]
    pub fn new(
        allow_list: AllowList,
        authenticator: Authenticator,
        urls: Arc<dyn UrlBuilder>,
        applications: Applications,
    ) -> Self {
        let resolver = LoginFlowResolver::new(authenticator.clone(), Arc::clone(&urls));
        Self {
            allow_list,
            authenticator,
            resolver,
            urls,
            applications,
            reload_principal: true,
        }
    }

    /// Builds a gate from configuration.
    #[must_use]
    pub fn from_config(config: &GateConfig, directory: Arc<dyn PrincipalDirectory>) -> Self {
        let authenticator = Authenticator::new(directory, config.session_lifetime());
        let urls = Arc::new(AdminUrl::new(&config.base_url, config.use_secret_key));
        Self::new(
            AllowList::new(config.open_actions.iter().cloned()),
            authenticator,
            urls,
            Applications::new(config.applications.clone()),
        )
        .with_principal_reload(config.reload_principal)
    }

    /// Enables or disables the per-request principal reload.
    #[must_use]
    pub fn with_principal_reload(mut self, enabled: bool) -> Self {
        self.reload_principal = enabled;
        self
    }

    #[must_use]
    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    #[must_use]
    pub fn urls(&self) -> &dyn UrlBuilder {
        self.urls.as_ref()
    }

    /// Gates one pass of a request.
    ///
    /// Open actions pass without the session being read or written. For
    /// everything else the attached principal is reloaded, unauthenticated
    /// sessions go through the login flow, and authenticated sessions are
    /// prolonged and get their permission cache refreshed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the principal directory fails during reload.
    #[instrument(skip_all, fields(action = %request.target(), session = %session.key()))]
    pub async fn check(
        &self,
        request: &mut RequestContext,
        session: &mut Session,
        messages: &mut dyn MessageSink,
    ) -> Result<GateDecision, Report<GateError>> {
        if self.allow_list.contains(request.action_name()) {
            debug!("open action");
            request.set_dispatched(true);
            return Ok(GateDecision::Proceed);
        }

        if self.reload_principal {
            self.authenticator
                .reload_principal(session)
                .await
                .map_err(|e| GateError::Directory {
                    reason: e.to_string(),
                })?;
        }

        if !self.authenticator.is_logged_in(session) {
            match self.resolver.resolve(request, session, messages).await {
                Resolution::Redirect(location) => return Ok(GateDecision::Redirect(location)),
                Resolution::Rewrite(denied) => return Ok(GateDecision::RewriteTo(denied)),
                Resolution::Continue => {}
            }
        } else {
            self.authenticator.prolong(session);
            self.authenticator.refresh_permissions(session);

            if let Some(app) = self.applications.current(request) {
                let location = self.applications.startup_url(self.urls.as_ref(), app);
                debug!(app = app.name(), %location, "redirecting to secondary application");
                return Ok(GateDecision::Redirect(location));
            }
        }

        self.authenticator.refresh_permissions(session);
        Ok(GateDecision::Proceed)
    }
}
