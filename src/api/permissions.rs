use serde::Serialize;

use super::Endpoint;
use crate::models::Permission;

/// Body of a permission creation. Field names are the service's snake_case keys.
#[derive(Debug, Clone, Serialize)]
pub struct NewPermission {
    pub permission_name: String,
    pub code: String,
    pub parent_id: i64,
}

pub fn list_permissions(token: &str) -> Endpoint<Vec<Permission>> {
    Endpoint::new("/permission/list", token, "system:permission:list", None)
}

pub fn create_permission(token: &str, permission: &NewPermission) -> Endpoint<String> {
    // Serializing a struct of strings and integers cannot fail.
    let params = serde_json::to_value(permission).unwrap_or_default();
    Endpoint::new(
        "/permission/create",
        token,
        "system:permission:create",
        Some(params),
    )
}
