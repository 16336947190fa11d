//! Request pipeline: outbound decoration, transport, inbound normalization.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::Endpoint;
use crate::config::AppConfig;
use crate::error::{ClientError, Result};
use crate::models::{ApiRequest, ApiResponse, Session, User};
use crate::session::SessionManager;

/// One decorated call, ready for the wire.
#[derive(Debug, Clone)]
pub struct OutboundCall<'a> {
    /// Endpoint path relative to the configured base, e.g. "/user/list".
    pub path: &'a str,
    pub envelope: &'a ApiRequest,
    /// Session token, sent as the `token` header when non-empty.
    pub token: &'a str,
    pub request_id: Uuid,
}

// 1. Transport Contract
/// Transport
///
/// Moves one envelope to the service and returns the raw JSON body. Implementations
/// report connection problems as `ClientError::Transport` and expiry as
/// `ClientError::Timeout`; they never interpret `success`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, call: OutboundCall<'_>) -> Result<Value>;
}

pub type TransportState = Arc<dyn Transport>;

// 2. The Real Implementation (HTTP)
/// HttpTransport
///
/// `reqwest` client with the configured connect and response timeout applied to
/// every call.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, call: OutboundCall<'_>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, call.path);

        let mut request = self
            .client
            .post(&url)
            .header("x-request-id", call.request_id.to_string())
            .json(call.envelope);
        if !call.token.is_empty() {
            request = request.header("token", call.token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Transport(format!("HTTP {} from {}", status, url)));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

// 3. The Mock Implementation (For Unit Tests)
enum Scripted {
    Reply(Value),
    Delayed(Duration, Value),
    Transport(String),
    Timeout,
}

/// MockTransport
///
/// Replays scripted answers in order and records every call it receives.
/// An unscripted call fails as a transport error.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<(String, ApiRequest)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, body: Value) -> Self {
        self.push(Scripted::Reply(body));
        self
    }

    /// Like [`reply`](Self::reply), but the answer only arrives after `delay`.
    pub fn reply_after(self, delay: Duration, body: Value) -> Self {
        self.push(Scripted::Delayed(delay, body));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.push(Scripted::Transport(message.to_string()));
        self
    }

    pub fn time_out(self) -> Self {
        self.push(Scripted::Timeout);
        self
    }

    /// Every (path, envelope) received so far.
    pub fn sent(&self) -> Vec<(String, ApiRequest)> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push(&self, entry: Scripted) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(entry);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, call: OutboundCall<'_>) -> Result<Value> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((call.path.to_string(), call.envelope.clone()));

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(Scripted::Reply(body)) => Ok(body),
            Some(Scripted::Delayed(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            Some(Scripted::Transport(message)) => Err(ClientError::Transport(message)),
            Some(Scripted::Timeout) => Err(ClientError::Timeout),
            None => Err(ClientError::Transport(format!(
                "no scripted response for {}",
                call.path
            ))),
        }
    }
}

// --- Interceptors ---

/// decorate
///
/// Outbound decoration. Supplies a default envelope when the caller gave none; leaves
/// the login operation untouched; otherwise attaches the session identity (a minimal
/// username-only one if nothing is cached) and a timestamp.
pub fn decorate(envelope: Option<ApiRequest>, session: &Session) -> ApiRequest {
    let mut envelope = envelope.unwrap_or_else(|| ApiRequest::new(session.token.clone(), ""));

    if envelope.is_login() {
        return envelope;
    }

    let identity = match &session.identity {
        Some(user) => user.clone(),
        None if session.is_authenticated() => User::named(session.token.clone()),
        // No session at all: the envelope's own token is the only name available.
        None => User::named(envelope.token.clone()),
    };
    envelope.user = Some(identity);

    if envelope.timestamp.is_none() {
        envelope.timestamp = Some(chrono::Utc::now().timestamp_millis());
    }

    envelope
}

/// normalize
///
/// Inbound normalization. `success=false` becomes `ClientError::Rejected` carrying the
/// service message; anything else passes through as the full envelope.
pub fn normalize<T>(response: ApiResponse<T>) -> Result<ApiResponse<T>> {
    if response.success {
        Ok(response)
    } else {
        Err(ClientError::rejected(response.msg, response.error_code))
    }
}

/// dispatch
///
/// Runs one call through the whole pipeline against `session`.
pub async fn dispatch(
    transport: &dyn Transport,
    session: &Session,
    path: &str,
    envelope: Option<ApiRequest>,
) -> Result<ApiResponse> {
    let envelope = decorate(envelope, session);
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "rbac_call",
        perm_code = %envelope.perm_code,
        path = %path,
        req_id = %request_id,
    );

    async {
        let call = OutboundCall {
            path,
            envelope: &envelope,
            token: &session.token,
            request_id,
        };

        let raw = transport.post(call).await.inspect_err(|err| {
            tracing::error!(error = %err, "remote call failed before a response");
        })?;

        let response: ApiResponse = serde_json::from_value(raw)?;
        normalize(response)
    }
    .instrument(span)
    .await
}

/// ApiClient
///
/// Entry point for every non-session call: reads a snapshot of the current session,
/// dispatches, and types the payload.
#[derive(Clone)]
pub struct ApiClient {
    transport: TransportState,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(transport: TransportState, session: Arc<SessionManager>) -> Self {
        Self { transport, session }
    }

    pub async fn send<T>(&self, endpoint: Endpoint<T>) -> Result<ApiResponse<T>>
    where
        T: DeserializeOwned + Default,
    {
        let session = self.session.snapshot();
        let (path, envelope) = endpoint.into_parts();
        dispatch(self.transport.as_ref(), &session, path, Some(envelope))
            .await?
            .into_typed()
    }

    /// Token of the current session, for building endpoints.
    pub fn token(&self) -> String {
        self.session.snapshot().token
    }
}
