//! PostgreSQL persistence for the admin panel.
//!
//! This module provides:
//! - Session storage behind [`SessionStore`](admin_gate_access::SessionStore)
//! - Principal lookup behind [`PrincipalDirectory`](admin_gate_access::PrincipalDirectory)

pub mod principal;
pub mod session;

pub use principal::PgPrincipalDirectory;
pub use session::PgSessionStore;
