use serde_json::json;

use super::Endpoint;
use crate::models::{LOGIN_PERM_CODE, User};

/// Credential exchange. Sent with an empty token and never decorated.
pub fn login(username: &str, password: &str) -> Endpoint<String> {
    Endpoint::new(
        "/user/login",
        "",
        LOGIN_PERM_CODE,
        Some(json!({ "username": username, "password": password })),
    )
}

pub fn list_users(token: &str) -> Endpoint<Vec<User>> {
    Endpoint::new("/user/list", token, "system:user:list", None)
}

pub fn create_user(token: &str, username: &str, password: &str) -> Endpoint<String> {
    Endpoint::new(
        "/user/create",
        token,
        "system:user:create",
        Some(json!({ "username": username, "password": password })),
    )
}

/// Resets another user's password to the service default.
pub fn reset_user_password(token: &str, user_id: i64) -> Endpoint<String> {
    Endpoint::new(
        "/user/password/reset",
        token,
        "system:user:password",
        Some(json!({ "userid": user_id })),
    )
}

pub fn update_user_role(token: &str, user_id: i64, role_id: i64) -> Endpoint<String> {
    Endpoint::new(
        "/user/role/update",
        token,
        "system:user:role",
        Some(json!({ "userid": user_id, "roleid": role_id })),
    )
}

pub fn delete_user(token: &str, user_id: i64) -> Endpoint<String> {
    Endpoint::new(
        "/user/delete",
        token,
        "system:user:delete",
        Some(json!({ "userid": user_id })),
    )
}

/// Role label of `user_id`.
pub fn get_user_role(token: &str, user_id: i64) -> Endpoint<String> {
    Endpoint::new(
        "/user/role/get",
        token,
        "system:user:own:role",
        Some(json!({ "userid": user_id })),
    )
}

/// Permission codes granted to `user_id`.
pub fn get_user_permissions(token: &str, user_id: i64) -> Endpoint<Vec<String>> {
    Endpoint::new(
        "/user/permission/get",
        token,
        "system:user:own:permission",
        Some(json!({ "userid": user_id })),
    )
}

pub fn update_own_password(token: &str, new_password: &str) -> Endpoint<String> {
    Endpoint::new(
        "/user/password/update",
        token,
        "system:user:own:password",
        Some(json!({ "newPassword": new_password })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn params<T>(endpoint: &Endpoint<T>) -> Value {
        serde_json::from_str(&endpoint.envelope.biz_params).unwrap()
    }

    #[test]
    fn test_login_envelope() {
        let endpoint = login("alice", "pw");
        assert_eq!(endpoint.path, "/user/login");
        assert_eq!(endpoint.envelope.token, "");
        assert!(endpoint.envelope.is_login());
        assert_eq!(params(&endpoint), json!({ "username": "alice", "password": "pw" }));
    }

    #[test]
    fn test_user_id_is_lowercase_userid() {
        let endpoint = delete_user("alice", 42);
        assert_eq!(endpoint.perm_code(), "system:user:delete");
        assert_eq!(params(&endpoint), json!({ "userid": 42 }));

        let endpoint = update_user_role("alice", 42, 3);
        assert_eq!(params(&endpoint), json!({ "userid": 42, "roleid": 3 }));
    }

    #[test]
    fn test_list_users_has_empty_params() {
        let endpoint = list_users("alice");
        assert_eq!(endpoint.envelope.biz_params, "{}");
        assert_eq!(endpoint.envelope.token, "alice");
    }

    #[test]
    fn test_update_own_password_key() {
        let endpoint = update_own_password("alice", "s3cret");
        assert_eq!(endpoint.path, "/user/password/update");
        assert_eq!(params(&endpoint), json!({ "newPassword": "s3cret" }));
    }
}
