use std::collections::{BTreeSet, HashMap};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;

/// The only operation that may be sent without a session identity.
pub const LOGIN_PERM_CODE: &str = "system:user:own:login";

/// Identity id assigned at login. The service's login answer carries no user record,
/// so the console addresses the freshly authenticated user by this id until a real
/// profile lookup exists on the service side.
pub const PROVISIONAL_USER_ID: i64 = 1;

// --- Entities (mirrors of the service's records) ---

/// User
///
/// A service user. Also used as the `user` identity attached to outbound envelopes,
/// where usually only `username` is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl User {
    /// Minimal identity carrying only a username.
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// Identity minted locally after a successful credential exchange.
    pub fn provisional(username: impl Into<String>) -> Self {
        Self {
            id: PROVISIONAL_USER_ID,
            ..Self::named(username)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub parent_id: i64,
}

// --- Wire envelopes ---

/// ApiRequest
///
/// The outbound envelope every remote call is wrapped in. `biz_params` is the
/// operation's parameters already encoded as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub perm_code: String,
    #[serde(default = "empty_params")]
    pub biz_params: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

fn empty_params() -> String {
    "{}".to_string()
}

impl Default for ApiRequest {
    fn default() -> Self {
        Self {
            token: String::new(),
            perm_code: String::new(),
            biz_params: empty_params(),
            timestamp: None,
            user: None,
        }
    }
}

impl ApiRequest {
    pub fn new(token: impl Into<String>, perm_code: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            perm_code: perm_code.into(),
            ..Self::default()
        }
    }

    /// Replaces the parameters with the JSON encoding of `params`.
    pub fn with_params(mut self, params: &Value) -> Self {
        self.biz_params = params.to_string();
        self
    }

    pub fn is_login(&self) -> bool {
        self.perm_code == LOGIN_PERM_CODE
    }
}

/// ApiResponse
///
/// The inbound envelope. Callers receive the whole envelope rather than just `data`
/// because both `msg` and `data` matter to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T = Value> {
    pub success: bool,
    /// Empty when the service sent no message or an explicit `null`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub msg: String,
    #[serde(default)]
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<HashMap<String, Value>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ApiResponse<Value> {
    /// Re-reads `data` as `T`. A `null` payload becomes `T::default()`.
    pub fn into_typed<T>(self) -> Result<ApiResponse<T>>
    where
        T: DeserializeOwned + Default,
    {
        let data = match self.data {
            Value::Null => T::default(),
            other => serde_json::from_value(other)?,
        };

        Ok(ApiResponse {
            success: self.success,
            msg: self.msg,
            data,
            cost_time: self.cost_time,
            error_code: self.error_code,
            trace_id: self.trace_id,
            timestamp: self.timestamp,
            ext: self.ext,
        })
    }
}

// --- Session ---

/// Session
///
/// The authenticated context of the current user. An empty `token` means no session,
/// and `identity` is only present while a token is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub token: String,
    pub identity: Option<User>,
    pub role: String,
    pub permissions: BTreeSet<String>,
}

impl Session {
    /// A fresh session for `username`; the service uses the username itself as the token.
    pub fn authenticated(username: &str) -> Self {
        Self {
            token: username.to_string(),
            identity: Some(User::provisional(username)),
            ..Self::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    /// Username the session speaks for: the cached identity's, else the raw token.
    pub fn username(&self) -> &str {
        self.identity
            .as_ref()
            .map(|user| user.username.as_str())
            .unwrap_or(&self.token)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.identity.as_ref().map(|user| user.id)
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.contains(code)
    }
}
