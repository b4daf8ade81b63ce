//! Per-request state seen by the gate.
//!
//! A [`RequestContext`] is built once per inbound request and carries the
//! routing target plus the one-shot markers the login flow relies on
//! (`forwarded`, `message_sent`) and the dispatch flags read by the
//! dispatch loop.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::credentials::LoginCredentials;

/// Request parameter naming a secondary application.
pub const PARAM_APP: &str = "app";
/// Request parameter marking an asynchronous request.
pub const PARAM_IS_AJAX: &str = "isAjax";
/// Request parameter marking a request made from an embedded frame.
pub const PARAM_IS_IFRAME: &str = "isIframe";

/// Route, controller and action a request is dispatched to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestTarget {
    route: String,
    controller: String,
    action: String,
}

impl RequestTarget {
    #[must_use]
    pub fn new(
        route: impl Into<String>,
        controller: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            route: route.into(),
            controller: controller.into(),
            action: action.into(),
        }
    }

    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    #[must_use]
    pub fn controller(&self) -> &str {
        &self.controller
    }

    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }
}

impl fmt::Display for RequestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.route, self.controller, self.action)
    }
}

/// Everything the gate needs to know about one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    target: RequestTarget,
    params: BTreeMap<String, String>,
    is_ajax: bool,
    is_iframe: bool,
    login: Option<LoginCredentials>,
    request_uri: Option<String>,
    forwarded: bool,
    message_sent: bool,
    dispatched: bool,
    no_dispatch: bool,
}

impl RequestContext {
    /// Creates a context for a plain browser request to `target`.
    #[must_use]
    pub fn new(target: RequestTarget) -> Self {
        Self {
            target,
            params: BTreeMap::new(),
            is_ajax: false,
            is_iframe: false,
            login: None,
            request_uri: None,
            forwarded: false,
            message_sent: false,
            dispatched: false,
            no_dispatch: false,
        }
    }

    /// Sets the request parameters, picking up the `isAjax` and `isIframe` flags.
    #[must_use]
    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.is_ajax |= params.get(PARAM_IS_AJAX).is_some_and(|v| is_truthy(v));
        self.is_iframe |= params.get(PARAM_IS_IFRAME).is_some_and(|v| is_truthy(v));
        self.params = params;
        self
    }

    /// Marks the request as asynchronous (e.g. from an `X-Requested-With` header).
    #[must_use]
    pub fn with_ajax(mut self, is_ajax: bool) -> Self {
        self.is_ajax |= is_ajax;
        self
    }

    #[must_use]
    pub fn with_iframe(mut self, is_iframe: bool) -> Self {
        self.is_iframe |= is_iframe;
        self
    }

    /// Attaches credentials submitted through the login form.
    #[must_use]
    pub fn with_login(mut self, login: LoginCredentials) -> Self {
        self.login = Some(login);
        self
    }

    /// Sets the raw URI the client requested.
    #[must_use]
    pub fn with_request_uri(mut self, uri: impl Into<String>) -> Self {
        self.request_uri = Some(uri.into());
        self
    }

    #[must_use]
    pub fn target(&self) -> &RequestTarget {
        &self.target
    }

    /// Returns the action name of the current target.
    #[must_use]
    pub fn action_name(&self) -> &str {
        self.target.action()
    }

    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Returns a non-empty request parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn is_ajax(&self) -> bool {
        self.is_ajax
    }

    #[must_use]
    pub fn is_iframe(&self) -> bool {
        self.is_iframe
    }

    /// Returns true if login credentials are still attached.
    #[must_use]
    pub fn has_login(&self) -> bool {
        self.login.is_some()
    }

    /// Detaches the submitted credentials so they cannot be echoed back.
    pub fn take_login(&mut self) -> Option<LoginCredentials> {
        self.login.take()
    }

    #[must_use]
    pub fn request_uri(&self) -> Option<&str> {
        self.request_uri.as_deref().filter(|uri| !uri.is_empty())
    }

    /// Returns true once the request has been rewritten.
    #[must_use]
    pub fn is_forwarded(&self) -> bool {
        self.forwarded
    }

    /// Returns true once a login error has been reported for this request.
    #[must_use]
    pub fn is_message_sent(&self) -> bool {
        self.message_sent
    }

    pub fn mark_message_sent(&mut self) {
        self.message_sent = true;
    }

    /// Returns true if the current target has been resolved and may run.
    #[must_use]
    pub fn is_dispatched(&self) -> bool {
        self.dispatched
    }

    pub fn set_dispatched(&mut self, dispatched: bool) {
        self.dispatched = dispatched;
    }

    /// Returns true if no action may run for this request.
    #[must_use]
    pub fn is_no_dispatch(&self) -> bool {
        self.no_dispatch
    }

    pub fn set_no_dispatch(&mut self) {
        self.no_dispatch = true;
    }

    /// Points the request at a new target and marks it forwarded and unresolved.
    pub fn rewrite(&mut self, target: RequestTarget) {
        self.target = target;
        self.forwarded = true;
        self.dispatched = false;
    }
}

/// Flag parameters are set by any value except empty, `0` and `false`.
fn is_truthy(value: &str) -> bool {
    !matches!(value, "" | "0" | "false")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dashboard() -> RequestTarget {
        RequestTarget::new("adminhtml", "dashboard", "index")
    }

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn target_display() {
        assert_eq!(dashboard().to_string(), "adminhtml/dashboard/index");
    }

    #[test]
    fn flags_parsed_from_params() {
        let ctx = RequestContext::new(dashboard())
            .with_params(params(&[("isAjax", "1"), ("isIframe", "0")]));
        assert!(ctx.is_ajax());
        assert!(!ctx.is_iframe());
    }

    #[test]
    fn false_like_flag_values_are_unset() {
        for value in ["", "0", "false"] {
            let ctx = RequestContext::new(dashboard())
                .with_params(params(&[("isAjax", value), ("isIframe", value)]));
            assert!(!ctx.is_ajax(), "isAjax={value:?}");
            assert!(!ctx.is_iframe(), "isIframe={value:?}");
        }
        for value in ["1", "true", "yes"] {
            let ctx = RequestContext::new(dashboard()).with_params(params(&[("isAjax", value)]));
            assert!(ctx.is_ajax(), "isAjax={value:?}");
        }
    }

    #[test]
    fn header_flag_survives_params() {
        let ctx = RequestContext::new(dashboard())
            .with_ajax(true)
            .with_params(BTreeMap::new());
        assert!(ctx.is_ajax());
    }

    #[test]
    fn empty_params_are_absent() {
        let ctx = RequestContext::new(dashboard()).with_params(params(&[("app", "")]));
        assert_eq!(ctx.param("app"), None);
    }

    #[test]
    fn take_login_clears_credentials() {
        let mut ctx = RequestContext::new(dashboard())
            .with_login(LoginCredentials::new("admin", "secret"));
        assert!(ctx.has_login());
        assert!(ctx.take_login().is_some());
        assert!(!ctx.has_login());
        assert!(ctx.take_login().is_none());
    }

    #[test]
    fn rewrite_marks_forwarded_and_undispatched() {
        let mut ctx = RequestContext::new(dashboard());
        ctx.set_dispatched(true);
        ctx.rewrite(RequestTarget::new("adminhtml", "auth", "login"));
        assert!(ctx.is_forwarded());
        assert!(!ctx.is_dispatched());
        assert_eq!(ctx.action_name(), "login");
    }
}
