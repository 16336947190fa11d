use super::{FORBIDDEN_PATH, LANDING_PATH, LOGIN_PATH, RouteDescriptor};

/// Public Route Set
///
/// Routes present in the live table from process start, with or without a session.
/// The guard still bounces unauthenticated users to the login page for everything
/// except `/login` itself.
pub fn public_routes() -> Vec<RouteDescriptor> {
    vec![
        // GET /login
        // Credential form. Never listed in menus.
        RouteDescriptor::new(LOGIN_PATH, "Login", "Sign in").hidden(),
        // GET /403
        // Shown when the service refuses an operation.
        RouteDescriptor::new(FORBIDDEN_PATH, "Forbidden", "Forbidden").hidden(),
        // GET /
        // Bare origin forwards to the landing page.
        RouteDescriptor::redirect_to("/", LANDING_PATH),
        // GET /dashboard
        // Default authenticated landing page.
        RouteDescriptor::new(LANDING_PATH, "Dashboard", "Dashboard").gated_by("dashboard:view"),
    ]
}
