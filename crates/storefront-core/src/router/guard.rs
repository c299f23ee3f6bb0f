//! Pre-navigation access checks.

use crate::auth::AuthStatus;

use super::routes::{RouteMeta, HOME_PATH, LOGIN_PATH, PROFILE_PATH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

/// Decide whether a navigation to a route with `meta` may proceed.
///
/// Checks run in a fixed order and the first redirect wins: authentication,
/// then admin role, then routes hidden from signed-in users.
pub fn evaluate(meta: &RouteMeta, status: &AuthStatus) -> GuardDecision {
    if meta.requires_auth {
        if !status.authenticated {
            return GuardDecision::Redirect(LOGIN_PATH);
        }
        if meta.requires_admin && !status.is_admin() {
            return GuardDecision::Redirect(HOME_PATH);
        }
    }

    if meta.hide_for_auth && status.authenticated {
        return GuardDecision::Redirect(PROFILE_PATH);
    }

    GuardDecision::Allow
}
