//! URL building for redirects issued by the gate.

use serde::{Deserialize, Serialize};

use crate::request::{PARAM_APP, PARAM_IS_AJAX, PARAM_IS_IFRAME, RequestContext};

/// Supplies the URLs the gate redirects to.
pub trait UrlBuilder: Send + Sync {
    /// Base URL of the admin area, without a trailing slash.
    fn base_url(&self) -> &str;

    /// Returns true if post-login redirects must use the canonical current URL.
    fn use_secret_key(&self) -> bool;

    /// Canonical URL of the request's current target and parameters.
    fn current_url(&self, request: &RequestContext) -> String;
}

/// URL builder for the admin area.
///
/// The canonical URL is `{base}/{controller}/{action}` followed by the
/// request parameters in key order. Transport flags (`isAjax`, `isIframe`)
/// and the `app` selector are dropped so the redirect lands on a plain page.
#[derive(Debug, Clone)]
pub struct AdminUrl {
    base_url: String,
    use_secret_key: bool,
}

impl AdminUrl {
    #[must_use]
    pub fn new(base_url: impl Into<String>, use_secret_key: bool) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            use_secret_key,
        }
    }
}

impl UrlBuilder for AdminUrl {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn use_secret_key(&self) -> bool {
        self.use_secret_key
    }

    fn current_url(&self, request: &RequestContext) -> String {
        let target = request.target();
        let mut url = format!(
            "{}/{}/{}",
            self.base_url,
            urlencoding::encode(target.controller()),
            urlencoding::encode(target.action())
        );
        let query: Vec<String> = request
            .params()
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), PARAM_APP | PARAM_IS_AJAX | PARAM_IS_IFRAME))
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }
}

/// A secondary admin application with its own landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendApp {
    name: String,
    startup_page: String,
}

impl BackendApp {
    #[must_use]
    pub fn new(name: impl Into<String>, startup_page: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            startup_page: startup_page.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the landing page, relative to the admin base URL.
    #[must_use]
    pub fn startup_page(&self) -> &str {
        &self.startup_page
    }
}

/// Registry of secondary applications, fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct Applications {
    apps: Vec<BackendApp>,
}

impl Applications {
    #[must_use]
    pub fn new(apps: Vec<BackendApp>) -> Self {
        Self { apps }
    }

    /// Returns the application named by the request's `app` parameter.
    #[must_use]
    pub fn current(&self, request: &RequestContext) -> Option<&BackendApp> {
        let name = request.param(PARAM_APP)?;
        self.apps.iter().find(|app| app.name == name)
    }

    /// Returns the absolute startup URL of an application.
    #[must_use]
    pub fn startup_url(&self, urls: &dyn UrlBuilder, app: &BackendApp) -> String {
        format!("{}{}", urls.base_url(), app.startup_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestTarget;
    use std::collections::BTreeMap;

    fn request(params: &[(&str, &str)]) -> RequestContext {
        RequestContext::new(RequestTarget::new("adminhtml", "sales", "view")).with_params(
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let urls = AdminUrl::new("https://shop.example/admin/", false);
        assert_eq!(urls.base_url(), "https://shop.example/admin");
    }

    #[test]
    fn current_url_without_params() {
        let urls = AdminUrl::new("/admin", true);
        assert_eq!(urls.current_url(&request(&[])), "/admin/sales/view");
    }

    #[test]
    fn current_url_keeps_sorted_params_and_drops_transport_flags() {
        let urls = AdminUrl::new("/admin", true);
        let url = urls.current_url(&request(&[
            ("order", "42"),
            ("isAjax", "1"),
            ("filter", "a b"),
            ("app", "reports"),
        ]));
        assert_eq!(url, "/admin/sales/view?filter=a%20b&order=42");
    }

    #[test]
    fn current_app_from_param() {
        let apps = Applications::new(vec![BackendApp::new("reports", "/reports/index")]);
        let urls = AdminUrl::new("/admin", false);

        let selected = apps.current(&request(&[("app", "reports")])).expect("app");
        assert_eq!(apps.startup_url(&urls, selected), "/admin/reports/index");
        assert!(apps.current(&request(&[("app", "unknown")])).is_none());
        assert!(apps.current(&request(&[])).is_none());
    }
}
