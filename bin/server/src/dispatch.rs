//! HTTP entry points: turn requests into gated admin dispatches.
//!
//! Each request loads (or starts) the client's session, runs the
//! interceptor chain, then writes the session back and refreshes the
//! session cookie.

use admin_gate_access::{
    Exchange, LoginCredentials, Outcome, RequestContext, RequestTarget, Session, SessionKey,
    StoreError, resolver::ADMIN_ROUTE,
};
use axum::{
    Form,
    extract::{
        Path, Query, State,
        rejection::{FormRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rootcause::Report;
use std::collections::BTreeMap;
use std::sync::Arc;
use time::Duration as TimeDuration;
use tracing::debug;

use crate::actions::AdminActions;
use crate::app::AppState;
use crate::error::ActionError;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "admin_session";

/// Form field carrying the login name.
pub const LOGIN_USERNAME_FIELD: &str = "login[username]";
/// Form field carrying the password.
pub const LOGIN_PASSWORD_FIELD: &str = "login[password]";

const X_REQUESTED_WITH: &str = "x-requested-with";

/// `/admin`: the default action.
pub async fn admin_index(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
    jar: CookieJar,
    query: Result<Query<BTreeMap<String, String>>, QueryRejection>,
    form: Result<Form<BTreeMap<String, String>>, FormRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(e) => return bad_request(e.body_text()),
    };
    let target = RequestTarget::new(ADMIN_ROUTE, "index", "index");
    let request = build_request(target, &headers, &uri, query, form_fields(&method, form));
    dispatch(state, jar, request).await
}

/// `/admin/{controller}/{action}`.
pub async fn admin_action(
    State(state): State<Arc<AppState>>,
    path: Result<Path<(String, String)>, PathRejection>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
    jar: CookieJar,
    query: Result<Query<BTreeMap<String, String>>, QueryRejection>,
    form: Result<Form<BTreeMap<String, String>>, FormRejection>,
) -> Response {
    let (controller, action) = match path {
        Ok(Path(segments)) => segments,
        Err(e) => return bad_request(e.body_text()),
    };
    let query = match query {
        Ok(Query(query)) => query,
        Err(e) => return bad_request(e.body_text()),
    };
    let target = RequestTarget::new(ADMIN_ROUTE, controller, action);
    let request = build_request(target, &headers, &uri, query, form_fields(&method, form));
    dispatch(state, jar, request).await
}

fn bad_request(details: String) -> Response {
    ActionError::BadRequest { details }.into_response()
}

/// Posted form fields; empty for other methods or unreadable bodies.
fn form_fields(
    method: &Method,
    form: Result<Form<BTreeMap<String, String>>, FormRejection>,
) -> BTreeMap<String, String> {
    if method != Method::POST {
        return BTreeMap::new();
    }
    match form {
        Ok(Form(fields)) => fields,
        Err(e) => {
            debug!(error = %e, "ignoring unreadable form body");
            BTreeMap::new()
        }
    }
}

/// Builds the gate's view of a request.
///
/// Login fields are lifted out of the form into credentials; remaining form
/// fields override query parameters of the same name.
pub fn build_request(
    target: RequestTarget,
    headers: &HeaderMap,
    uri: &Uri,
    query: BTreeMap<String, String>,
    mut fields: BTreeMap<String, String>,
) -> RequestContext {
    let username = fields.remove(LOGIN_USERNAME_FIELD);
    let password = fields.remove(LOGIN_PASSWORD_FIELD);

    let mut params = query;
    params.extend(fields);

    let is_ajax = headers
        .get(X_REQUESTED_WITH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));
    let request_uri = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string);

    let request = RequestContext::new(target)
        .with_params(params)
        .with_ajax(is_ajax)
        .with_request_uri(request_uri);

    if username.is_some() || password.is_some() {
        request.with_login(LoginCredentials::new(
            username.unwrap_or_default(),
            password.unwrap_or_default(),
        ))
    } else {
        request
    }
}

async fn dispatch(state: Arc<AppState>, jar: CookieJar, request: RequestContext) -> Response {
    let loaded = match load_session(&state, &jar).await {
        Ok(loaded) => loaded,
        Err(e) => {
            return ActionError::Storage {
                details: e.to_string(),
            }
            .into_response();
        }
    };
    let was_logged_in = loaded.session.is_logged_in();

    let mut exchange = Exchange::new(request, loaded.session);
    if loaded.expired {
        exchange
            .messages
            .add_notice("Your session has expired. Please sign in again.".to_string());
    }

    let actions = AdminActions::new(Arc::clone(&state));
    let response = match state.chain.dispatch(&mut exchange, &actions).await {
        Ok(Outcome::Completed(response)) => response,
        Ok(Outcome::Redirect(location)) => Redirect::to(&location).into_response(),
        Ok(Outcome::Halted) => StatusCode::NO_CONTENT.into_response(),
        Ok(Outcome::Forwarded(target)) => ActionError::Internal {
            details: format!("request left forwarded to {target}"),
        }
        .into_response(),
        Err(e) => ActionError::Internal {
            details: e.to_string(),
        }
        .into_response(),
    };

    let stored = match persist_session(&state, &mut exchange, loaded.is_new, was_logged_in).await
    {
        Ok(stored) => stored,
        Err(e) => {
            return ActionError::Storage {
                details: e.to_string(),
            }
            .into_response();
        }
    };

    let jar = if stored {
        let lifetime = state.gate.authenticator().lifetime();
        let session_cookie = Cookie::build((SESSION_COOKIE, exchange.session.key().to_string()))
            .path("/")
            .http_only(true)
            .secure(state.secure_cookies)
            .same_site(SameSite::Lax)
            .max_age(TimeDuration::seconds(lifetime.num_seconds()));
        jar.add(session_cookie)
    } else {
        let remove_session = Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .max_age(TimeDuration::ZERO);
        jar.add(remove_session)
    };

    (jar, response).into_response()
}

/// A session as found at the start of a request.
struct LoadedSession {
    session: Session,
    /// Not in the store yet.
    is_new: bool,
    /// The cookie named a session that had expired.
    expired: bool,
}

/// Loads the session named by the cookie, or starts an anonymous one.
///
/// Expired sessions are deleted and replaced rather than revived.
async fn load_session(
    state: &AppState,
    jar: &CookieJar,
) -> Result<LoadedSession, Report<StoreError>> {
    let mut expired = false;
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let key = SessionKey::new(cookie.value().to_string());
        match state.sessions.load(&key).await? {
            Some(session) if !session.is_expired() => {
                return Ok(LoadedSession {
                    session,
                    is_new: false,
                    expired: false,
                });
            }
            Some(_) => {
                debug!(session = %key, "session expired");
                state.sessions.remove(&key).await?;
                expired = true;
            }
            None => debug!(session = %key, "unknown session key"),
        }
    }
    Ok(LoadedSession {
        session: Session::anonymous(
            SessionKey::generate(),
            state.gate.authenticator().lifetime(),
        ),
        is_new: true,
        expired,
    })
}

/// Writes the session back, or deletes it after logout.
///
/// A session that just logged in moves to a fresh key. An existing session
/// is only ever updated in place, so one removed by a concurrent logout is
/// not brought back. Returns whether the session is still stored.
async fn persist_session(
    state: &AppState,
    exchange: &mut Exchange,
    is_new: bool,
    was_logged_in: bool,
) -> Result<bool, Report<StoreError>> {
    if exchange.is_session_ended() {
        state.sessions.remove(exchange.session.key()).await?;
        return Ok(false);
    }
    if !was_logged_in && exchange.session.is_logged_in() {
        let previous = exchange.session.regenerate_key();
        if !is_new {
            state.sessions.remove(&previous).await?;
        }
        state.sessions.insert(&exchange.session).await?;
        return Ok(true);
    }
    if is_new {
        state.sessions.insert(&exchange.session).await?;
        return Ok(true);
    }
    let stored = state.sessions.update(&exchange.session).await?;
    if !stored {
        debug!(session = %exchange.session.key(), "session removed while the request was in flight");
    }
    Ok(stored)
}
