use std::sync::Arc;

use crate::error::{ClientError, Result};
use crate::routes::{LANDING_PATH, LOGIN_PATH, NavigationRegistry, RouteDescriptor, normalize_path};
use crate::session::SessionManager;

/// Upper bound on redirects/retries a single navigation may take before giving up.
pub const MAX_HOPS: usize = 8;

/// GuardDecision
///
/// Outcome of consulting the guard for one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Commit the navigation to this route.
    Allow(RouteDescriptor),
    /// Abandon the target and navigate to this path instead.
    Redirect(String),
    /// Gated routes were just installed; dispatch the same target again so it is matched
    /// against the updated table.
    Retry(String),
    /// Allowed, but nothing in the live table matches the path.
    NotFound(String),
}

// Pending -> Installing -> Decided(Retry) on the first authenticated navigation,
// Pending -> Decided(..) otherwise.
enum Phase {
    Pending,
    Installing,
    Decided(GuardDecision),
}

/// Result of a full navigation: where it ended up and every decision along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub path: String,
    pub route: Option<RouteDescriptor>,
    pub trail: Vec<GuardDecision>,
}

impl Navigation {
    pub fn is_found(&self) -> bool {
        self.route.is_some()
    }
}

/// NavigationGuard
///
/// Decides every navigation from session presence alone and installs the gated
/// routes on the first authenticated one. No permission codes are checked here.
#[derive(Clone)]
pub struct NavigationGuard {
    session: Arc<SessionManager>,
    registry: Arc<NavigationRegistry>,
}

impl NavigationGuard {
    pub fn new(session: Arc<SessionManager>, registry: Arc<NavigationRegistry>) -> Self {
        Self { session, registry }
    }

    /// check
    ///
    /// One decision for `target`. Never fails: a session that cannot be read counts as
    /// no session.
    pub fn check(&self, target: &str) -> GuardDecision {
        let authenticated = self
            .session
            .try_snapshot()
            .map(|session| session.is_authenticated())
            .unwrap_or(false);
        let path = normalize_path(target);

        let mut phase = Phase::Pending;
        loop {
            phase = match phase {
                Phase::Pending => match (authenticated, path == LOGIN_PATH) {
                    (false, true) => Phase::Decided(self.resolve(&path)),
                    (false, false) => Phase::Decided(GuardDecision::Redirect(LOGIN_PATH.to_string())),
                    (true, true) => Phase::Decided(GuardDecision::Redirect(LANDING_PATH.to_string())),
                    (true, false) if !self.registry.is_installed() => Phase::Installing,
                    (true, false) => Phase::Decided(self.resolve(&path)),
                },
                Phase::Installing => {
                    self.registry.install();
                    Phase::Decided(GuardDecision::Retry(path.clone()))
                }
                Phase::Decided(decision) => {
                    tracing::debug!(path = %path, ?decision, "navigation decided");
                    return decision;
                }
            };
        }
    }

    /// navigate
    ///
    /// Follows redirects and retries until the guard allows a route or reports it
    /// missing.
    pub fn navigate(&self, target: &str) -> Result<Navigation> {
        let mut current = normalize_path(target);
        let mut trail = Vec::new();

        for _ in 0..MAX_HOPS {
            let decision = self.check(&current);
            trail.push(decision.clone());

            match decision {
                GuardDecision::Allow(route) => {
                    return Ok(Navigation {
                        path: route.path.clone(),
                        route: Some(route),
                        trail,
                    });
                }
                GuardDecision::NotFound(path) => {
                    return Ok(Navigation {
                        path,
                        route: None,
                        trail,
                    });
                }
                GuardDecision::Redirect(next) | GuardDecision::Retry(next) => current = next,
            }
        }

        tracing::error!(path = %target, hops = MAX_HOPS, "navigation did not settle");
        Err(ClientError::NavigationLoop(target.to_string()))
    }

    fn resolve(&self, path: &str) -> GuardDecision {
        match self.registry.resolve(path) {
            Some(RouteDescriptor {
                redirect: Some(next),
                ..
            }) => GuardDecision::Redirect(next),
            Some(route) => GuardDecision::Allow(route),
            None => GuardDecision::NotFound(path.to_string()),
        }
    }
}
