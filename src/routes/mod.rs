//! Route Catalogue and Live Route Table
//!
//! Navigable paths are split into two disjoint sets fixed at build time:
//! `public` routes are always reachable, `gated` routes are only installed into the live
//! table once a session exists. The split is a UX convenience; the service enforces every
//! permission on its own.

use std::sync::{Mutex, PoisonError};

/// Routes reachable without a session.
pub mod public;

/// Routes installed after the first authenticated navigation.
pub mod gated;

/// One-shot installation of the gated set.
pub mod registry;

pub use registry::NavigationRegistry;

pub const LOGIN_PATH: &str = "/login";
pub const FORBIDDEN_PATH: &str = "/403";
/// Where an authenticated user lands when asking for the login page.
pub const LANDING_PATH: &str = "/dashboard";

/// Whether a route is offered in navigational listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Shown,
    Hidden,
}

/// RouteDescriptor
///
/// A navigable path. `gating_key` names the permission or module code the page is about;
/// it is informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub path: String,
    pub name: String,
    pub title: String,
    pub gating_key: Option<String>,
    pub visibility: Visibility,
    /// Set on alias routes that only forward elsewhere.
    pub redirect: Option<String>,
}

impl RouteDescriptor {
    pub fn new(path: &str, name: &str, title: &str) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            title: title.to_string(),
            gating_key: None,
            visibility: Visibility::Shown,
            redirect: None,
        }
    }

    pub fn gated_by(mut self, key: &str) -> Self {
        self.gating_key = Some(key.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visibility = Visibility::Hidden;
        self
    }

    pub fn redirect_to(path: &str, target: &str) -> Self {
        Self {
            redirect: Some(target.to_string()),
            ..Self::new(path, "", "").hidden()
        }
    }

    pub fn is_shown(&self) -> bool {
        self.visibility == Visibility::Shown
    }
}

/// Canonical form of a navigation target: leading slash, no trailing slash, no query.
pub fn normalize_path(target: &str) -> String {
    let path = target.split(['?', '#']).next().unwrap_or_default().trim();
    let trimmed = path.trim_matches('/');
    format!("/{}", trimmed)
}

// --- Navigation host ---

/// RouteHost
///
/// The live router's route table as seen by the registry and the guard: routes can be
/// added at runtime and paths resolved against what is currently installed.
pub trait RouteHost: Send + Sync {
    /// Adds routes in order. A path already present is replaced in place.
    fn add_routes(&self, routes: &[RouteDescriptor]);

    fn resolve(&self, path: &str) -> Option<RouteDescriptor>;

    /// Everything installed, in installation order.
    fn routes(&self) -> Vec<RouteDescriptor>;
}

/// RouteTable
///
/// In-process route table, seeded with the public routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Mutex<Vec<RouteDescriptor>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::with_routes(public::public_routes())
    }

    pub fn with_routes(routes: Vec<RouteDescriptor>) -> Self {
        let table = Self::default();
        table.add_routes(&routes);
        table
    }
}

impl RouteHost for RouteTable {
    fn add_routes(&self, routes: &[RouteDescriptor]) {
        let mut table = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        for route in routes {
            match table.iter_mut().find(|existing| existing.path == route.path) {
                Some(existing) => *existing = route.clone(),
                None => table.push(route.clone()),
            }
        }
    }

    fn resolve(&self, path: &str) -> Option<RouteDescriptor> {
        let path = normalize_path(path);
        let table = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        table.iter().find(|route| route.path == path).cloned()
    }

    fn routes(&self) -> Vec<RouteDescriptor> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
