use std::sync::{Arc, Mutex, PoisonError};

use super::gated::gated_routes;
use super::{RouteDescriptor, RouteHost};

/// NavigationRegistry
///
/// Owns the gated route set and the `installed` flag recording whether that set is in
/// the live table for the current session. The flag is re-armed by `reset()` at login
/// and logout; the routes themselves are never removed from the live table.
pub struct NavigationRegistry {
    host: Arc<dyn RouteHost>,
    gated: Vec<RouteDescriptor>,
    installed: Mutex<bool>,
}

impl NavigationRegistry {
    pub fn new(host: Arc<dyn RouteHost>) -> Self {
        Self::with_gated(host, gated_routes())
    }

    pub fn with_gated(host: Arc<dyn RouteHost>, gated: Vec<RouteDescriptor>) -> Self {
        Self {
            host,
            gated,
            installed: Mutex::new(false),
        }
    }

    /// Adds the gated set to the live table in descriptor order, once.
    ///
    /// Returns `true` when this call performed the installation and `false` when the set
    /// was already installed (no-op).
    pub fn install(&self) -> bool {
        let mut installed = self.installed.lock().unwrap_or_else(PoisonError::into_inner);
        if *installed {
            return false;
        }

        for route in &self.gated {
            tracing::debug!(path = %route.path, name = %route.name, "adding gated route");
        }
        self.host.add_routes(&self.gated);
        *installed = true;

        tracing::info!(count = self.gated.len(), "gated routes installed");
        true
    }

    /// Re-arms installation for the next session.
    pub fn reset(&self) {
        *self.installed.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    pub fn is_installed(&self) -> bool {
        *self.installed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn resolve(&self, path: &str) -> Option<RouteDescriptor> {
        self.host.resolve(path)
    }

    /// Live routes that should appear in menus, in table order.
    pub fn menu(&self) -> Vec<RouteDescriptor> {
        self.host
            .routes()
            .into_iter()
            .filter(RouteDescriptor::is_shown)
            .collect()
    }

    pub fn host(&self) -> &Arc<dyn RouteHost> {
        &self.host
    }
}
