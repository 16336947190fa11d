#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use rbac_console::{AppConfig, ConsoleState, MockSessionStore, SqliteSessionStore, StoreState};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const PREFIX: &str = "/api/v1";

/// Username the fake service stalls on, to exercise the client timeout.
pub const SLOW_USER: &str = "sloth";

/// One request as the fake service saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub token_header: Option<String>,
    pub request_id: Option<String>,
    pub body: Value,
}

impl RecordedCall {
    pub fn biz_params(&self) -> Value {
        self.body["bizParams"]
            .as_str()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(Value::Null)
    }
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl FakeBackend {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.path).collect()
    }

    pub fn last(&self, path: &str) -> Option<RecordedCall> {
        self.calls().into_iter().rev().find(|call| call.path == path)
    }
}

pub struct TestApp {
    pub address: String,
    pub backend: FakeBackend,
}

impl TestApp {
    /// Config pointing at the fake service with a short timeout.
    pub fn config(&self) -> AppConfig {
        AppConfig::default()
            .with_api_url(self.address.clone())
            .with_timeout(Duration::from_millis(300))
    }
}

/// Handles every path: answers like the RBAC service would for a user "alice"/"pw".
async fn fake_service(
    State(backend): State<FakeBackend>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = uri.path().strip_prefix(PREFIX).unwrap_or(uri.path()).to_string();
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    let call = RecordedCall {
        path: path.clone(),
        token_header: header("token"),
        request_id: header("x-request-id"),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    };
    let params = call.biz_params();
    backend.calls.lock().unwrap().push(call);

    match path.as_str() {
        "/user/login" => {
            let username = params["username"].as_str().unwrap_or_default();
            if username == SLOW_USER {
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            if params["password"] == "pw" {
                Json(json!({ "success": true, "msg": "login ok", "data": null })).into_response()
            } else {
                Json(json!({ "success": false, "msg": "bad credentials", "errorCode": "LOGIN_FAILED" }))
                    .into_response()
            }
        }
        "/user/role/get" => Json(json!({ "success": true, "data": "admin" })).into_response(),
        "/user/permission/get" => {
            Json(json!({ "success": true, "data": ["a:b", "system:user:list"] })).into_response()
        }
        "/user/list" => {
            if header("token").is_none() {
                return Json(json!({ "success": false, "msg": "token required" })).into_response();
            }
            Json(json!({
                "success": true,
                "msg": "ok",
                "data": [
                    { "id": 1, "username": "alice" },
                    { "id": 2, "username": "bob", "createdAt": "2024-05-01" }
                ],
                "traceId": "TRACE-1",
                "costTime": 3
            }))
            .into_response()
        }
        "/role/list" => Json(json!({
            "success": true,
            "data": [{ "id": 1, "name": "admin", "description": "everything" }]
        }))
        .into_response(),
        "/permission/list" => Json(json!({
            "success": true,
            "data": [{ "id": 4, "name": "List users", "code": "system:user:list", "parentId": 1 }]
        }))
        .into_response(),
        "/broken" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "/garbage" => (StatusCode::OK, "not json at all").into_response(),
        _ => Json(json!({ "success": true, "msg": "ok", "data": null })).into_response(),
    }
}

pub async fn spawn_app() -> TestApp {
    let backend = FakeBackend::default();
    let router = Router::new().fallback(fake_service).with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, backend }
}

/// Console wired to the fake service over HTTP with an in-memory store.
pub async fn console(app: &TestApp) -> (ConsoleState, Arc<MockSessionStore>) {
    let store = Arc::new(MockSessionStore::new());
    let transport = Arc::new(rbac_console::HttpTransport::new(&app.config()).unwrap());
    let state = ConsoleState::assemble(app.config(), store.clone() as StoreState, transport).await;
    (state, store)
}

/// Console wired to the fake service over HTTP with a SQLite store at `db_path`.
pub async fn console_on_disk(app: &TestApp, db_path: &str) -> ConsoleState {
    let mut config = app.config();
    config.session_db = db_path.to_string();
    ConsoleState::connect(config).await.unwrap()
}

pub async fn open_store(db_path: &str) -> SqliteSessionStore {
    SqliteSessionStore::connect(db_path).await.unwrap()
}
