//! Gatekeeping for the protected pages.

use crate::schema::Resource;
use crate::session::SessionStore;
use std::sync::Arc;

/// A page the console can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The unauthenticated entry point.
    Login,
    /// A resource listing page.
    Resource(Resource),
}

impl Route {
    pub const LOGIN_PATH: &'static str = "/login";

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => Self::LOGIN_PATH,
            Route::Resource(resource) => resource.route(),
        }
    }

    /// Parse a path into a route. Unknown paths yield `None`.
    pub fn parse(path: &str) -> Option<Self> {
        if path.trim_end_matches('/') == Self::LOGIN_PATH {
            return Some(Route::Login);
        }
        Resource::from_route(path).map(Route::Resource)
    }
}

/// Decides which page a navigation lands on.
///
/// A pure function of session presence: the guard does not ask the service
/// whether the token is still good. An expired token is treated as valid
/// until a request is rejected and the operator logs out.
#[derive(Clone)]
pub struct RouteGuard {
    session: Arc<dyn SessionStore>,
    landing: Resource,
}

impl RouteGuard {
    pub fn new(session: Arc<dyn SessionStore>) -> Self {
        Self {
            session,
            landing: Resource::Expense,
        }
    }

    /// Page shown for `/`, `/login` or an unknown path once signed in.
    pub fn with_landing(mut self, landing: Resource) -> Self {
        self.landing = landing;
        self
    }

    /// Resolve a navigation to `requested`. Without a session every path
    /// resolves to the login page and the requested target is dropped.
    pub fn resolve(&self, requested: &str) -> Route {
        if !self.session.is_active() {
            tracing::debug!("No session, redirecting {} to login", requested);
            return Route::Login;
        }

        match Route::parse(requested) {
            Some(route @ Route::Resource(_)) => route,
            _ => Route::Resource(self.landing),
        }
    }
}
