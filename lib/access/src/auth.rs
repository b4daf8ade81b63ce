//! Session authentication operations.
//!
//! The [`Authenticator`] is the session-facing half of access control: it
//! logs principals in, keeps the session alive, keeps the permission cache
//! in step with the principal's roles, and reloads the principal so that a
//! concurrently deactivated account loses access on its next request.

use chrono::Duration;
use rootcause::Report;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::credentials::LoginCredentials;
use crate::directory::PrincipalDirectory;
use crate::error::{AuthenticationError, StoreError};
use crate::principal::Principal;
use crate::session::Session;

/// Authenticates sessions against a principal directory.
#[derive(Clone)]
pub struct Authenticator {
    directory: Arc<dyn PrincipalDirectory>,
    lifetime: Duration,
}

impl Authenticator {
    /// Creates an authenticator whose sessions stay alive for `lifetime` after the last request.
    #[must_use]
    pub fn new(directory: Arc<dyn PrincipalDirectory>, lifetime: Duration) -> Self {
        Self {
            directory,
            lifetime,
        }
    }

    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    #[must_use]
    pub fn is_logged_in(&self, session: &Session) -> bool {
        session.is_logged_in()
    }

    /// Returns the principal of a logged-in session.
    #[must_use]
    pub fn principal<'a>(&self, session: &'a Session) -> Option<&'a Principal> {
        session.principal().filter(|_| session.is_logged_in())
    }

    /// Verifies credentials and attaches the principal to the session.
    ///
    /// A refused login is an expected outcome, so it is returned as a plain
    /// error value rather than a report.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for empty fields, unknown usernames and
    /// wrong passwords, `AccountInactive` for deactivated accounts, and
    /// `DirectoryUnavailable` if the lookup itself fails.
    #[instrument(skip_all, fields(username = %credentials.username(), session = %session.key()))]
    pub async fn login(
        &self,
        session: &mut Session,
        credentials: &LoginCredentials,
    ) -> Result<(), AuthenticationError> {
        if credentials.is_incomplete() {
            return Err(AuthenticationError::InvalidCredentials);
        }

        let principal = self
            .directory
            .find_by_username(credentials.username())
            .await
            .map_err(|e| AuthenticationError::DirectoryUnavailable {
                reason: e.to_string(),
            })?
            .ok_or(AuthenticationError::InvalidCredentials)?;

        if !principal.verify_password(credentials.password()) {
            return Err(AuthenticationError::InvalidCredentials);
        }
        if !principal.is_active() {
            return Err(AuthenticationError::AccountInactive {
                username: principal.username().to_string(),
            });
        }

        info!(principal = %principal.id(), "admin login succeeded");
        session.attach(principal, self.lifetime);
        self.refresh_permissions(session);
        Ok(())
    }

    /// Extends the session's expiry.
    pub fn prolong(&self, session: &mut Session) {
        session.prolong(self.lifetime);
    }

    /// Recomputes the permission cache from the attached principal's roles.
    pub fn refresh_permissions(&self, session: &mut Session) {
        let permissions = session
            .principal()
            .map(Principal::permissions)
            .unwrap_or_default();
        session.set_permissions(permissions);
    }

    /// Re-reads the attached principal from the directory.
    ///
    /// A principal that has been deleted or deactivated since it was attached
    /// is detached, leaving the session anonymous.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory lookup fails; the session is left as it was.
    pub async fn reload_principal(&self, session: &mut Session) -> Result<(), Report<StoreError>> {
        let Some(id) = session.principal().map(Principal::id) else {
            return Ok(());
        };

        match self.directory.find_by_id(id).await? {
            Some(principal) if principal.is_active() => session.replace_principal(principal),
            Some(_) => {
                info!(principal = %id, "principal deactivated, ending session");
                session.detach();
            }
            None => {
                info!(principal = %id, "principal no longer exists, ending session");
                session.detach();
            }
        }
        Ok(())
    }

    /// Detaches the principal from the session.
    pub fn logout(&self, session: &mut Session) {
        if let Some(principal) = session.detach() {
            debug!(principal = %principal.id(), "admin logout");
        }
    }
}
