//! Client-side routing for the storefront.
//!
//! This module provides:
//! - `routes`: the static route table with per-route access requirements
//! - `guard`: the pre-navigation decision function
//! - `Router`: a `Navigator` that applies the guard and tracks history

pub mod guard;
pub mod routes;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::auth::AuthStatus;

pub use guard::{evaluate, GuardDecision};
pub use routes::{
    resolve, ResolvedRoute, Route, RouteMeta, HOME_PATH, LOGIN_LANDING_PATH, LOGIN_PATH,
    PROFILE_PATH, REGISTER_LANDING_PATH, ROUTES,
};

/// Guard redirects never chain more than a couple of times; anything longer
/// is a loop in the route table.
const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Landed on the requested path
    Allowed { path: String },
    /// The guard sent us somewhere else
    Redirected { requested: String, path: String },
    /// No route matches; the current route is unchanged
    NotFound { path: String },
}

impl Navigation {
    /// The path that is current after this navigation, if it moved
    pub fn landed_on(&self) -> Option<&str> {
        match self {
            Navigation::Allowed { path } | Navigation::Redirected { path, .. } => Some(path),
            Navigation::NotFound { .. } => None,
        }
    }
}

/// Moves the UI between routes.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, to: &str, status: &AuthStatus) -> Navigation;
}

struct RouterState {
    current: String,
    history: Vec<String>,
}

pub struct Router {
    state: Mutex<RouterState>,
}

impl Router {
    pub fn new() -> Self {
        Self::starting_at(HOME_PATH)
    }

    pub fn starting_at(path: &str) -> Self {
        let (path, _) = routes::normalize(path);
        Self {
            state: Mutex::new(RouterState {
                current: path,
                history: Vec::new(),
            }),
        }
    }

    /// Every path committed by a navigation, oldest first
    pub fn history(&self) -> Vec<String> {
        self.state.lock().history.clone()
    }

    pub fn current_route(&self) -> Option<ResolvedRoute> {
        resolve(&self.current_path())
    }

    fn commit(&self, path: &str) {
        let mut state = self.state.lock();
        state.current = path.to_string();
        state.history.push(path.to_string());
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for Router {
    fn current_path(&self) -> String {
        self.state.lock().current.clone()
    }

    fn navigate(&self, to: &str, status: &AuthStatus) -> Navigation {
        let Some(mut resolved) = resolve(to) else {
            debug!(path = to, "No route matches");
            return Navigation::NotFound { path: to.to_string() };
        };
        let requested = resolved.path.clone();

        for _ in 0..MAX_REDIRECTS {
            match evaluate(&resolved.route.meta, status) {
                GuardDecision::Allow => {
                    let path = resolved.path.clone();
                    self.commit(&path);
                    debug!(path = %path, "Navigated");
                    return if path == requested {
                        Navigation::Allowed { path }
                    } else {
                        Navigation::Redirected { requested, path }
                    };
                }
                GuardDecision::Redirect(target) => {
                    debug!(from = %resolved.path, to = target, "Guard redirect");
                    match resolve(target) {
                        Some(next) => resolved = next,
                        None => {
                            warn!(target = target, "Guard redirected to an unknown route");
                            return Navigation::NotFound { path: target.to_string() };
                        }
                    }
                }
            }
        }

        warn!(path = %requested, "Too many guard redirects, staying put");
        Navigation::NotFound { path: requested }
    }
}
