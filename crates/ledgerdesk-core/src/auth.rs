//! Login and logout.

use crate::error::RemoteError;
use crate::notify::{Notice, Notifier};
use crate::remote::RemoteService;
use crate::session::SessionStore;
use std::sync::Arc;

/// Exchanges credentials for a session and clears it again.
#[derive(Clone)]
pub struct Authenticator {
    service: Arc<dyn RemoteService>,
    session: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
}

impl Authenticator {
    pub fn new(
        service: Arc<dyn RemoteService>,
        session: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            service,
            session,
            notifier,
        }
    }

    /// Attempt a login. Returns true when a session was established. On any
    /// failure the previous session (if any) is left untouched.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        if username.trim().is_empty() || password.is_empty() {
            self.notifier
                .notify(Notice::warning("Username and password are required."));
            return false;
        }

        tracing::info!("Logging in as {}", username);
        match self.service.login(username, password).await {
            Ok(token) => match self.session.set(&token) {
                Ok(()) => {
                    self.notifier.notify(Notice::success("Successfully logged in!"));
                    true
                }
                Err(err) => {
                    tracing::error!("Failed to store session: {}", err);
                    self.notifier
                        .notify(Notice::error(format!("Could not save the session: {err}")));
                    false
                }
            },
            Err(RemoteError::Rejected(reason)) | Err(RemoteError::Unauthenticated(reason)) => {
                tracing::warn!("Login refused: {}", reason);
                self.notifier.notify(Notice::error("Wrong username/password!"));
                false
            }
            Err(err) => {
                tracing::error!("Login failed: {}", err);
                self.notifier
                    .notify(Notice::error("Could not reach the service. Try again later."));
                false
            }
        }
    }

    /// Drop the session. Safe to call when already logged out.
    pub fn logout(&self) {
        match self.session.clear() {
            Ok(()) => {
                tracing::info!("Logged out");
                self.notifier.notify(Notice::info("Logged out."));
            }
            Err(err) => {
                tracing::error!("Failed to clear session: {}", err);
                self.notifier
                    .notify(Notice::error(format!("Could not remove the session: {err}")));
            }
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_active()
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("logged_in", &self.is_logged_in())
            .finish_non_exhaustive()
    }
}
