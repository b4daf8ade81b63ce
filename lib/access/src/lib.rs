//! Session authentication and request gating for the admin-gate panel.
//!
//! This crate provides:
//! - Principals, roles and the permission cache (`Principal`, `Role`, `PermissionSet`)
//! - Admin sessions and their persistence seam (`Session`, `SessionStore`)
//! - The login flow for unauthenticated requests (`LoginFlowResolver`)
//! - The gate placed in front of every admin action (`RequestGate`)
//! - An interceptor chain that runs the gate around dispatch (`InterceptorChain`)
//!
//! # Gate Model
//!
//! A small allow-list of actions is reachable without signing in. Every
//! other request needs a logged-in session; otherwise it is answered by a
//! denial destination chosen from the request's shape: a frame-breaking page
//! for embedded frames, a structured denial for asynchronous requests, and
//! the login form for everything else.
//!
//! # Example
//!
//! ```
//! use admin_gate_access::{Principal, Role, Session, SessionKey, hash_password};
//! use chrono::Duration;
//!
//! let hash = hash_password("s3cret").expect("hash");
//! let principal = Principal::new("admin", hash).with_roles(vec![Role::administrator()]);
//! assert!(principal.verify_password("s3cret"));
//!
//! let mut session = Session::anonymous(SessionKey::generate(), Duration::minutes(15));
//! assert!(!session.is_logged_in());
//!
//! session.set_permissions(principal.permissions());
//! session.attach(principal, Duration::minutes(15));
//!
//! assert!(session.is_logged_in());
//! assert!(session.permissions().allows("dashboard"));
//! ```

pub mod auth;
pub mod chain;
pub mod config;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod gate;
pub mod message;
pub mod principal;
pub mod request;
pub mod resolver;
pub mod role;
pub mod session;
pub mod store;
pub mod url;

// Re-export main types at crate root
pub use auth::Authenticator;
pub use chain::{
    ActionHandler, Exchange, GateInterceptor, Interceptor, InterceptorChain, Next, Outcome,
    TimingInterceptor,
};
pub use config::GateConfig;
pub use credentials::{LoginCredentials, hash_password, verify_password};
pub use directory::{InMemoryPrincipalDirectory, PrincipalDirectory};
pub use error::{AuthenticationError, CredentialError, GateError, StoreError};
pub use gate::{AllowList, GateDecision, RequestGate};
pub use message::{Message, MessageSink, Messages, Severity};
pub use principal::Principal;
pub use request::{RequestContext, RequestTarget};
pub use resolver::{Denied, LoginFlowResolver, Resolution};
pub use role::{PermissionSet, Role};
pub use session::{Session, SessionKey};
pub use store::{InMemorySessionStore, SessionStore};
pub use url::{AdminUrl, Applications, BackendApp, UrlBuilder};
