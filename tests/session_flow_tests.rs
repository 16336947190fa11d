mod common;

use std::collections::BTreeSet;

use common::{SLOW_USER, console, console_on_disk, open_store, spawn_app};
use rbac_console::{Session, storage::{SessionStore, keys}};

#[tokio::test]
async fn test_login_over_http_builds_session() {
    let app = spawn_app().await;
    let (state, store) = console(&app).await;

    assert!(state.session.login("alice", "pw").await);

    let session = state.session.snapshot();
    assert_eq!(session.token, "alice");
    assert_eq!(session.role, "admin");
    assert_eq!(
        session.permissions,
        BTreeSet::from(["a:b".to_string(), "system:user:list".to_string()])
    );
    assert_eq!(store.entries().await[keys::IS_LOGGED_IN], "true");

    assert_eq!(
        app.backend.paths(),
        vec!["/user/login", "/user/role/get", "/user/permission/get"]
    );
}

#[tokio::test]
async fn test_login_wire_format() {
    let app = spawn_app().await;
    let (state, _store) = console(&app).await;
    state.session.login("alice", "pw").await;

    let login = app.backend.last("/user/login").unwrap();
    assert_eq!(login.body["permCode"], "system:user:own:login");
    assert_eq!(login.body["token"], "");
    assert!(login.body.get("user").is_none());
    assert!(login.token_header.is_none());
    assert_eq!(login.biz_params()["username"], "alice");

    let role = app.backend.last("/user/role/get").unwrap();
    assert_eq!(role.token_header.as_deref(), Some("alice"));
    assert_eq!(role.body["user"]["username"], "alice");
    assert_eq!(role.biz_params()["userid"], 1);
    assert!(role.body["timestamp"].is_i64());
    assert!(role.request_id.is_some());
}

#[tokio::test]
async fn test_bad_credentials_return_false_and_keep_state() {
    let app = spawn_app().await;
    let (state, store) = console(&app).await;

    assert!(!state.session.login("bob", "bad").await);

    assert_eq!(state.session.snapshot(), Session::default());
    assert!(store.entries().await.is_empty());
    // No follow-up fetches after a rejection.
    assert_eq!(app.backend.paths(), vec!["/user/login"]);
}

#[tokio::test]
async fn test_login_timeout_is_a_failed_login() {
    let app = spawn_app().await;
    let (state, _store) = console(&app).await;

    assert!(!state.session.login(SLOW_USER, "pw").await);
    assert!(!state.session.snapshot().is_authenticated());
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let app = spawn_app().await;
    let (state, store) = console(&app).await;
    state.session.login("alice", "pw").await;

    state.session.logout().await.unwrap();

    assert_eq!(state.session.snapshot(), Session::default());
    assert!(state.session.current_user().is_none());
    assert!(store.entries().await.is_empty());
}

#[tokio::test]
async fn test_session_survives_restart_on_disk() {
    let app = spawn_app().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("session.db");
    let db_path = db_path.to_str().unwrap();

    {
        let state = console_on_disk(&app, db_path).await;
        assert!(state.session.login("alice", "pw").await);
    }

    let restarted = console_on_disk(&app, db_path).await;
    let session = restarted.session.snapshot();
    assert_eq!(session.token, "alice");
    assert_eq!(session.role, "admin");
    assert_eq!(session.permissions.len(), 2);
    assert_eq!(restarted.session.current_token(), "alice");
    // Routes are rebuilt per process; the new process has not installed anything yet.
    assert!(!restarted.registry.is_installed());
}

#[tokio::test]
async fn test_logout_then_restart_starts_empty() {
    let app = spawn_app().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("session.db");
    let db_path = db_path.to_str().unwrap();

    {
        let state = console_on_disk(&app, db_path).await;
        state.session.login("alice", "pw").await;
        state.session.logout().await.unwrap();
    }

    let store = open_store(db_path).await;
    for key in keys::ALL {
        assert_eq!(store.get(key).await.unwrap(), None, "{key} left behind");
    }

    let restarted = console_on_disk(&app, db_path).await;
    assert_eq!(restarted.session.snapshot(), Session::default());
}

#[tokio::test]
async fn test_corrupt_values_restore_as_absent() {
    let app = spawn_app().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("session.db");
    let db_path = db_path.to_str().unwrap();

    let store = open_store(db_path).await;
    store.set(keys::TOKEN, "alice").await.unwrap();
    store.set(keys::USER_INFO, "{{{").await.unwrap();
    store.set(keys::USER_PERMISSIONS, "nope").await.unwrap();
    drop(store);

    let state = console_on_disk(&app, db_path).await;
    let session = state.session.snapshot();
    assert!(session.is_authenticated());
    assert_eq!(session.username(), "alice");
    assert!(session.permissions.is_empty());
}
