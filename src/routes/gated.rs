use super::RouteDescriptor;

/// Gated Route Set
///
/// Management pages, installed unconditionally once a session exists. Each carries the
/// permission code of the service operation behind it, but no client-side filtering
/// happens on it: the service refuses what the session may not do.
pub fn gated_routes() -> Vec<RouteDescriptor> {
    vec![
        // --- User management (system:user:*) ---
        RouteDescriptor::new("/user/list", "UserList", "Users").gated_by("system:user:list"),
        // --- Role management (system:role:*) ---
        RouteDescriptor::redirect_to("/role", "/role/list"),
        RouteDescriptor::new("/role/list", "RoleList", "Roles").gated_by("system:role:list"),
        RouteDescriptor::new("/role/create", "RoleCreate", "New role")
            .gated_by("system:role:create"),
        RouteDescriptor::new("/role/assign-permission", "RoleAssignPermission", "Assign permissions")
            .gated_by("system:role:permission"),
        // --- Permission management (system:permission:*) ---
        RouteDescriptor::redirect_to("/permission", "/permission/list"),
        RouteDescriptor::new("/permission/list", "PermissionList", "Permissions")
            .gated_by("system:permission:list"),
        RouteDescriptor::new("/permission/create", "PermissionCreate", "New permission")
            .gated_by("system:permission:create"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::public::public_routes;
    use std::collections::HashSet;

    #[test]
    fn test_gated_and_public_sets_are_disjoint() {
        let public: HashSet<String> = public_routes().into_iter().map(|r| r.path).collect();
        for route in gated_routes() {
            assert!(!public.contains(&route.path), "{} is in both sets", route.path);
        }
    }

    #[test]
    fn test_section_aliases_forward_to_lists() {
        let routes = gated_routes();
        for (alias, target) in [("/role", "/role/list"), ("/permission", "/permission/list")] {
            let route = routes.iter().find(|r| r.path == alias).unwrap();
            assert_eq!(route.redirect.as_deref(), Some(target));
            assert!(!route.is_shown());
            assert!(routes.iter().any(|r| r.path == target));
        }
    }

    #[test]
    fn test_gated_paths_unique() {
        let routes = gated_routes();
        let paths: HashSet<&str> = routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths.len(), routes.len());
    }
}
