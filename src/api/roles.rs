use serde_json::json;

use super::Endpoint;
use crate::models::Role;

pub fn list_roles(token: &str) -> Endpoint<Vec<Role>> {
    Endpoint::new("/role/list", token, "system:role:list", None)
}

/// A missing description is sent as an empty string.
pub fn create_role(token: &str, role_name: &str, description: Option<&str>) -> Endpoint<String> {
    Endpoint::new(
        "/role/create",
        token,
        "system:role:create",
        Some(json!({
            "roleName": role_name,
            "description": description.unwrap_or_default(),
        })),
    )
}

/// Replaces the permission set of `role_id` with `perm_ids`.
pub fn assign_permissions_to_role(token: &str, role_id: i64, perm_ids: &[i64]) -> Endpoint<String> {
    Endpoint::new(
        "/role/permission/assign",
        token,
        "system:role:permission",
        Some(json!({ "roleId": role_id, "permIdList": perm_ids })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_create_role_defaults_description() {
        let endpoint = create_role("alice", "auditor", None);
        let params: Value = serde_json::from_str(&endpoint.envelope.biz_params).unwrap();
        assert_eq!(params, json!({ "roleName": "auditor", "description": "" }));
    }

    #[test]
    fn test_assign_permissions_payload() {
        let endpoint = assign_permissions_to_role("alice", 2, &[1, 5, 9]);
        assert_eq!(endpoint.path, "/role/permission/assign");
        assert_eq!(endpoint.perm_code(), "system:role:permission");

        let params: Value = serde_json::from_str(&endpoint.envelope.biz_params).unwrap();
        assert_eq!(params, json!({ "roleId": 2, "permIdList": [1, 5, 9] }));
    }
}
