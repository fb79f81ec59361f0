//! Attaches the session credential to outgoing requests.

use crate::session::SessionStore;
use reqwest::RequestBuilder;
use std::sync::Arc;
use std::time::Duration;

/// Decorates every request with `Authorization: Bearer <token>` when a
/// session exists. Never retries or refreshes; a rejected credential comes
/// back to the caller as an ordinary failure.
#[derive(Clone)]
pub struct RequestInterceptor {
    session: Arc<dyn SessionStore>,
    timeout: Option<Duration>,
}

impl RequestInterceptor {
    pub fn new(session: Arc<dyn SessionStore>) -> Self {
        Self {
            session,
            timeout: None,
        }
    }

    /// Bound every request by `timeout`. Without one a hung request keeps
    /// its controller busy until the connection drops.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Decorate `request`. Reads the session at call time, so a login or
    /// logout takes effect on the very next request.
    pub fn decorate(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match self.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        };

        match self.session.get() {
            Some(token) => request.bearer_auth(token),
            None => {
                tracing::debug!("No session, sending request without credentials");
                request
            }
        }
    }
}

impl std::fmt::Debug for RequestInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestInterceptor")
            .field("signed_in", &self.session.is_active())
            .field("timeout", &self.timeout)
            .finish()
    }
}
