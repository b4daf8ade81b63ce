//! Interceptor chain wrapped around action dispatch.
//!
//! Interceptors run in order; each receives the [`Exchange`] and a [`Next`]
//! handle and may short-circuit by returning without calling it. When an
//! interceptor rewrites the request, the chain is run again for the new
//! target, up to a fixed number of forwards.

use async_trait::async_trait;
use rootcause::Report;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::GateError;
use crate::gate::{GateDecision, RequestGate};
use crate::message::Messages;
use crate::request::{RequestContext, RequestTarget};
use crate::session::Session;

/// Forwards allowed per dispatch before the chain gives up.
pub const DEFAULT_MAX_FORWARDS: usize = 10;

/// State shared by the interceptors and the action handler for one request.
#[derive(Debug)]
pub struct Exchange {
    pub request: RequestContext,
    pub session: Session,
    pub messages: Messages,
    session_ended: bool,
}

impl Exchange {
    #[must_use]
    pub fn new(request: RequestContext, session: Session) -> Self {
        Self {
            request,
            session,
            messages: Messages::new(),
            session_ended: false,
        }
    }

    /// Marks the session for destruction once the response is produced.
    pub fn end_session(&mut self) {
        self.session_ended = true;
    }

    #[must_use]
    pub fn is_session_ended(&self) -> bool {
        self.session_ended
    }
}

/// Result of running the chain.
#[derive(Debug)]
pub enum Outcome<R> {
    /// The action handler ran and produced a response.
    Completed(R),
    /// The browser must be redirected; no action ran.
    Redirect(String),
    /// The request was rewritten and must be dispatched again.
    Forwarded(RequestTarget),
    /// The request was marked no-dispatch; no action ran and nothing was rendered.
    Halted,
}

/// Runs the admin action the request targets.
#[async_trait]
pub trait ActionHandler<R: Send + 'static>: Send + Sync {
    async fn handle(&self, exchange: &mut Exchange) -> R;
}

/// A step wrapped around dispatch.
#[async_trait]
pub trait Interceptor<R: Send + 'static>: Send + Sync {
    async fn handle(
        &self,
        exchange: &mut Exchange,
        next: Next<'_, R>,
    ) -> Result<Outcome<R>, Report<GateError>>;
}

/// The remainder of the chain after the current interceptor.
pub struct Next<'a, R> {
    interceptors: &'a [Arc<dyn Interceptor<R>>],
    handler: &'a dyn ActionHandler<R>,
}

impl<R: Send + 'static> Next<'_, R> {
    /// Runs the remaining interceptors, then the action handler unless the
    /// request has been marked no-dispatch.
    pub async fn run(self, exchange: &mut Exchange) -> Result<Outcome<R>, Report<GateError>> {
        match self.interceptors.split_first() {
            Some((first, rest)) => {
                let next = Next {
                    interceptors: rest,
                    handler: self.handler,
                };
                first.handle(exchange, next).await
            }
            None if exchange.request.is_no_dispatch() => {
                debug!(action = %exchange.request.target(), "dispatch suppressed");
                Ok(Outcome::Halted)
            }
            None => Ok(Outcome::Completed(self.handler.handle(exchange).await)),
        }
    }
}

/// Ordered interceptors plus the forward loop.
pub struct InterceptorChain<R> {
    interceptors: Vec<Arc<dyn Interceptor<R>>>,
    max_forwards: usize,
}

impl<R: Send + 'static> InterceptorChain<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
            max_forwards: DEFAULT_MAX_FORWARDS,
        }
    }

    /// Appends an interceptor; earlier interceptors wrap later ones.
    #[must_use]
    pub fn with(mut self, interceptor: impl Interceptor<R> + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    #[must_use]
    pub fn with_max_forwards(mut self, max_forwards: usize) -> Self {
        self.max_forwards = max_forwards;
        self
    }

    /// Dispatches a request, re-running the chain after every rewrite.
    ///
    /// The returned outcome is never `Forwarded`.
    ///
    /// # Errors
    ///
    /// Returns an error if an interceptor fails or the request is forwarded
    /// more than the configured number of times.
    pub async fn dispatch(
        &self,
        exchange: &mut Exchange,
        handler: &dyn ActionHandler<R>,
    ) -> Result<Outcome<R>, Report<GateError>> {
        for _ in 0..=self.max_forwards {
            exchange.request.set_dispatched(true);
            let next = Next {
                interceptors: &self.interceptors,
                handler,
            };
            match next.run(exchange).await? {
                Outcome::Forwarded(target) => {
                    debug!(%target, "dispatching forwarded request");
                }
                outcome => return Ok(outcome),
            }
        }
        Err(GateError::ForwardLimitExceeded {
            limit: self.max_forwards,
        }
        .into())
    }
}

impl<R: Send + 'static> Default for InterceptorChain<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Puts the [`RequestGate`] in front of the action handler.
pub struct GateInterceptor {
    gate: RequestGate,
}

impl GateInterceptor {
    #[must_use]
    pub fn new(gate: RequestGate) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl<R: Send + 'static> Interceptor<R> for GateInterceptor {
    async fn handle(
        &self,
        exchange: &mut Exchange,
        next: Next<'_, R>,
    ) -> Result<Outcome<R>, Report<GateError>> {
        let Exchange {
            request,
            session,
            messages,
            ..
        } = exchange;
        match self.gate.check(request, session, messages).await? {
            GateDecision::Proceed => next.run(exchange).await,
            GateDecision::Redirect(location) => Ok(Outcome::Redirect(location)),
            GateDecision::RewriteTo(denied) => Ok(Outcome::Forwarded(denied.target())),
        }
    }
}

/// Logs each pass through the chain with its latency.
pub struct TimingInterceptor;

#[async_trait]
impl<R: Send + 'static> Interceptor<R> for TimingInterceptor {
    async fn handle(
        &self,
        exchange: &mut Exchange,
        next: Next<'_, R>,
    ) -> Result<Outcome<R>, Report<GateError>> {
        let started = Instant::now();
        let target = exchange.request.target().clone();
        let outcome = next.run(exchange).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(Outcome::Completed(_)) => info!(action = %target, elapsed_ms, "action dispatched"),
            Ok(Outcome::Redirect(location)) => {
                debug!(action = %target, %location, elapsed_ms, "request redirected");
            }
            Ok(Outcome::Forwarded(to)) => {
                debug!(action = %target, forwarded_to = %to, elapsed_ms, "request forwarded");
            }
            Ok(Outcome::Halted) => debug!(action = %target, elapsed_ms, "request halted"),
            Err(e) => warn!(action = %target, error = %e, elapsed_ms, "dispatch failed"),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::credentials::{LoginCredentials, hash_password};
    use crate::directory::InMemoryPrincipalDirectory;
    use crate::principal::Principal;
    use crate::session::SessionKey;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the dispatched target.
    #[derive(Default)]
    struct Echo {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ActionHandler<String> for Echo {
        async fn handle(&self, exchange: &mut Exchange) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            exchange.request.target().to_string()
        }
    }

    /// Rewrites every request, forever.
    struct Bounce;

    #[async_trait]
    impl Interceptor<String> for Bounce {
        async fn handle(
            &self,
            exchange: &mut Exchange,
            _next: Next<'_, String>,
        ) -> Result<Outcome<String>, Report<GateError>> {
            let target = RequestTarget::new("adminhtml", "loop", "again");
            exchange.request.rewrite(target.clone());
            Ok(Outcome::Forwarded(target))
        }
    }

    /// Short-circuits with a redirect.
    struct Maintenance;

    #[async_trait]
    impl Interceptor<String> for Maintenance {
        async fn handle(
            &self,
            _exchange: &mut Exchange,
            _next: Next<'_, String>,
        ) -> Result<Outcome<String>, Report<GateError>> {
            Ok(Outcome::Redirect("/maintenance".to_string()))
        }
    }

    /// Marks the request no-dispatch, then carries on.
    struct Suppress;

    #[async_trait]
    impl Interceptor<String> for Suppress {
        async fn handle(
            &self,
            exchange: &mut Exchange,
            next: Next<'_, String>,
        ) -> Result<Outcome<String>, Report<GateError>> {
            exchange.request.set_no_dispatch();
            next.run(exchange).await
        }
    }

    async fn gated_chain() -> InterceptorChain<String> {
        let directory = Arc::new(InMemoryPrincipalDirectory::new());
        directory
            .upsert(Principal::new("admin", hash_password("s3cret").expect("hash")))
            .await;
        let gate = RequestGate::from_config(&GateConfig::default(), directory);
        InterceptorChain::new()
            .with(TimingInterceptor)
            .with(GateInterceptor::new(gate))
    }

    fn exchange(controller: &str, action: &str) -> Exchange {
        Exchange::new(
            RequestContext::new(RequestTarget::new("adminhtml", controller, action))
                .with_request_uri(format!("/admin/{controller}/{action}")),
            Session::anonymous(SessionKey::generate(), Duration::minutes(15)),
        )
    }

    #[tokio::test]
    async fn open_action_dispatches_directly() {
        let chain = gated_chain().await;
        let handler = Echo::default();
        let mut ex = exchange("auth", "logout");

        let outcome = chain.dispatch(&mut ex, &handler).await.expect("dispatch");

        assert!(matches!(outcome, Outcome::Completed(ref t) if t == "adminhtml/auth/logout"));
        assert!(ex.request.is_dispatched());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unauthenticated_ajax_ends_at_structured_denial() {
        let chain = gated_chain().await;
        let handler = Echo::default();
        let mut ex = exchange("dashboard", "index");
        ex.request = ex.request.clone().with_ajax(true);

        let outcome = chain.dispatch(&mut ex, &handler).await.expect("dispatch");

        assert!(matches!(outcome, Outcome::Completed(ref t) if t == "adminhtml/auth/deniedJson"));
        assert!(ex.request.is_forwarded());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successful_login_redirects_without_dispatch() {
        let chain = gated_chain().await;
        let handler = Echo::default();
        let mut ex = exchange("dashboard", "index");
        ex.request = ex
            .request
            .clone()
            .with_login(LoginCredentials::new("admin", "s3cret"));

        let outcome = chain.dispatch(&mut ex, &handler).await.expect("dispatch");

        assert!(matches!(outcome, Outcome::Redirect(ref l) if l == "/admin/dashboard/index"));
        assert!(ex.session.is_logged_in());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_login_renders_login_with_one_message() {
        let chain = gated_chain().await;
        let handler = Echo::default();
        let mut ex = exchange("dashboard", "index");
        ex.request = ex
            .request
            .clone()
            .with_login(LoginCredentials::new("admin", "wrong"));

        let outcome = chain.dispatch(&mut ex, &handler).await.expect("dispatch");

        assert!(matches!(outcome, Outcome::Completed(ref t) if t == "adminhtml/auth/login"));
        assert_eq!(ex.messages.error_count(), 1);
    }

    #[tokio::test]
    async fn short_circuit_skips_handler() {
        let chain = InterceptorChain::new().with(Maintenance);
        let handler = Echo::default();
        let mut ex = exchange("dashboard", "index");

        let outcome = chain.dispatch(&mut ex, &handler).await.expect("dispatch");

        assert!(matches!(outcome, Outcome::Redirect(_)));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_dispatch_request_never_reaches_handler() {
        let chain = InterceptorChain::new().with(TimingInterceptor).with(Suppress);
        let handler = Echo::default();
        let mut ex = exchange("dashboard", "index");

        let outcome = chain.dispatch(&mut ex, &handler).await.expect("dispatch");

        assert!(matches!(outcome, Outcome::Halted));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn endless_forwarding_is_cut_off() {
        let chain = InterceptorChain::new().with(Bounce).with_max_forwards(3);
        let handler = Echo::default();
        let mut ex = exchange("dashboard", "index");

        let err = chain.dispatch(&mut ex, &handler).await.unwrap_err();

        assert!(err.to_string().contains("forwarded more than 3 times"));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }
}
