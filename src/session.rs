use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

use crate::api::users;
use crate::error::{ClientError, Result};
use crate::models::{Session, User};
use crate::pipeline::{TransportState, dispatch};
use crate::routes::NavigationRegistry;
use crate::storage::{SessionStore, StoreState, keys};

// --- Failure policy ---

/// Session-level operations that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOperation {
    Login,
    FetchRole,
    FetchPermissions,
    Persist,
    Restore,
}

/// What a failed operation does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log and keep whatever the session held before the call.
    RetainPrevious,
    /// Log and fall back to the empty value.
    SubstituteDefault,
    /// Hand the error to the caller.
    Propagate,
}

/// failure_policy
///
/// The single table deciding how each session operation reacts to an error:
///
/// | operation          | on failure        |
/// |--------------------|-------------------|
/// | `Login`            | retain previous (returns `false`) |
/// | `FetchRole`        | retain previous   |
/// | `FetchPermissions` | retain previous   |
/// | `Persist`          | propagate         |
/// | `Restore`          | substitute default |
///
/// No fallback permission list exists: a session whose permission fetch failed or came
/// back empty simply holds no permissions, and the service stays the authority.
pub const fn failure_policy(operation: SessionOperation) -> FailurePolicy {
    match operation {
        SessionOperation::Login
        | SessionOperation::FetchRole
        | SessionOperation::FetchPermissions => FailurePolicy::RetainPrevious,
        SessionOperation::Persist => FailurePolicy::Propagate,
        SessionOperation::Restore => FailurePolicy::SubstituteDefault,
    }
}

/// Applies the table to `err`: `Ok(())` when the failure is absorbed.
fn absorb(operation: SessionOperation, err: ClientError) -> Result<()> {
    match failure_policy(operation) {
        FailurePolicy::Propagate => Err(err),
        FailurePolicy::RetainPrevious => {
            tracing::warn!(?operation, error = %err, "keeping previous session values");
            Ok(())
        }
        FailurePolicy::SubstituteDefault => {
            tracing::warn!(?operation, error = %err, "falling back to empty session values");
            Ok(())
        }
    }
}

/// SessionManager
///
/// Sole owner of the in-memory [`Session`]. Readers get clones; every mutation goes
/// through this type and is mirrored to the [`SessionStore`] in one place (`persist`).
pub struct SessionManager {
    state: RwLock<Session>,
    store: StoreState,
    transport: TransportState,
    registry: Arc<NavigationRegistry>,
    // Serializes login/logout so overlapping calls cannot interleave their writes.
    login_gate: Mutex<()>,
}

impl SessionManager {
    /// A manager holding the empty session.
    pub fn new(
        store: StoreState,
        transport: TransportState,
        registry: Arc<NavigationRegistry>,
    ) -> Self {
        Self::with_session(Session::default(), store, transport, registry)
    }

    /// A manager holding whatever session the store has from an earlier run.
    pub async fn restore(
        store: StoreState,
        transport: TransportState,
        registry: Arc<NavigationRegistry>,
    ) -> Self {
        let session = match restore_session(store.as_ref()).await {
            Ok(session) => session,
            Err(err) => {
                // Restore only ever substitutes, so the result is always Ok.
                let _ = absorb(SessionOperation::Restore, err);
                Session::default()
            }
        };

        if session.is_authenticated() {
            tracing::info!(username = %session.username(), "session restored");
        }
        Self::with_session(session, store, transport, registry)
    }

    fn with_session(
        session: Session,
        store: StoreState,
        transport: TransportState,
        registry: Arc<NavigationRegistry>,
    ) -> Self {
        Self {
            state: RwLock::new(session),
            store,
            transport,
            registry,
            login_gate: Mutex::new(()),
        }
    }

    // --- Readers ---

    /// Copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Like [`snapshot`](Self::snapshot), but `None` if the state lock was poisoned.
    pub fn try_snapshot(&self) -> Option<Session> {
        self.state.read().ok().map(|session| session.clone())
    }

    pub fn current_user(&self) -> Option<User> {
        self.snapshot().identity
    }

    pub fn current_token(&self) -> String {
        self.snapshot().token
    }

    pub fn registry(&self) -> &Arc<NavigationRegistry> {
        &self.registry
    }

    // --- Operations ---

    /// login
    ///
    /// Exchanges credentials, then fetches role and permissions for the new identity,
    /// one after the other. The new session is assembled off to the side and only
    /// becomes visible once it has been persisted; any failure before that leaves the
    /// previous session untouched and returns `false`.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        let _gate = self.login_gate.lock().await;

        match self.exchange_credentials(username, password).await {
            Ok(session) => {
                self.commit(session);
                self.registry.reset();
                tracing::info!(username, "login succeeded");
                true
            }
            Err(err) => {
                if matches!(err, ClientError::Rejected { .. }) {
                    tracing::info!(username, reason = %err, "login rejected");
                }
                // Login failures never reach the caller beyond `false`.
                let _ = absorb(SessionOperation::Login, err);
                false
            }
        }
    }

    async fn exchange_credentials(&self, username: &str, password: &str) -> Result<Session> {
        let (path, envelope) = users::login(username, password).into_parts();
        dispatch(self.transport.as_ref(), &self.snapshot(), path, Some(envelope)).await?;

        // The service does not mint a credential; the username is the token.
        let mut session = Session::authenticated(username);
        let user_id = session.user_id().unwrap_or_default();

        match self.request_role(&session, user_id).await {
            Ok(role) => session.role = role,
            Err(err) => absorb(SessionOperation::FetchRole, err)?,
        }
        match self.request_permissions(&session, user_id).await {
            Ok(permissions) => session.permissions = permissions,
            Err(err) => absorb(SessionOperation::FetchPermissions, err)?,
        }

        if session.permissions.is_empty() {
            tracing::warn!(username, "session holds no permissions");
        }

        self.persist(&session).await?;
        Ok(session)
    }

    /// logout
    ///
    /// Resets the session to empty and erases every stored key. Installed routes stay in
    /// the live table; only the registry's flag is re-armed.
    pub async fn logout(&self) -> Result<()> {
        let _gate = self.login_gate.lock().await;

        let empty = Session::default();
        self.commit(empty.clone());
        self.registry.reset();
        self.persist(&empty).await?;

        tracing::info!("logged out");
        Ok(())
    }

    /// clear_token
    ///
    /// Drops the credential only. The session reads as unauthenticated afterwards, so the
    /// identity goes with it; role and permissions are left as they were.
    pub async fn clear_token(&self) -> Result<()> {
        let _gate = self.login_gate.lock().await;

        self.mutate(|session| {
            session.token.clear();
            session.identity = None;
        });

        for key in [keys::TOKEN, keys::IS_LOGGED_IN] {
            self.store.delete(key).await?;
        }
        Ok(())
    }

    /// fetch_role
    ///
    /// Best-effort refresh of the role label. A failed fetch keeps the previous role;
    /// without a session nothing is fetched.
    pub async fn fetch_role(&self, user_id: i64) -> Result<()> {
        let session = self.snapshot();
        if !session.is_authenticated() {
            tracing::debug!(user_id, "no session, role not fetched");
            return Ok(());
        }

        match self.request_role(&session, user_id).await {
            Ok(role) => self.refresh(&session.token, |session| session.role = role).await,
            Err(err) => absorb(SessionOperation::FetchRole, err),
        }
    }

    /// fetch_permissions
    ///
    /// Best-effort refresh of the permission set. A failed fetch keeps the previous set;
    /// without a session nothing is fetched.
    pub async fn fetch_permissions(&self, user_id: i64) -> Result<()> {
        let session = self.snapshot();
        if !session.is_authenticated() {
            tracing::debug!(user_id, "no session, permissions not fetched");
            return Ok(());
        }

        match self.request_permissions(&session, user_id).await {
            Ok(permissions) => {
                self.refresh(&session.token, |session| session.permissions = permissions)
                    .await
            }
            Err(err) => absorb(SessionOperation::FetchPermissions, err),
        }
    }

    /// Applies a fetched value, but only if the session it was fetched for is still the
    /// live one. Runs under the login gate so a concurrent logout cannot be overwritten.
    async fn refresh(&self, token: &str, change: impl FnOnce(&mut Session)) -> Result<()> {
        let _gate = self.login_gate.lock().await;

        let updated = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.token != token {
                None
            } else {
                change(&mut *state);
                Some(state.clone())
            }
        };

        match updated {
            Some(updated) => self.persist(&updated).await,
            None => {
                tracing::debug!("session changed during fetch, result dropped");
                Ok(())
            }
        }
    }

    async fn request_role(&self, session: &Session, user_id: i64) -> Result<String> {
        let (path, envelope) = users::get_user_role(&session.token, user_id).into_parts();
        let response = dispatch(self.transport.as_ref(), session, path, Some(envelope))
            .await?
            .into_typed::<String>()?;
        Ok(response.data)
    }

    async fn request_permissions(
        &self,
        session: &Session,
        user_id: i64,
    ) -> Result<BTreeSet<String>> {
        let (path, envelope) = users::get_user_permissions(&session.token, user_id).into_parts();
        let response = dispatch(self.transport.as_ref(), session, path, Some(envelope))
            .await?
            .into_typed::<Vec<String>>()?;
        Ok(response.data.into_iter().collect())
    }

    // --- State plumbing ---

    fn commit(&self, session: Session) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    /// Applies `change` under the write lock and returns the resulting session.
    fn mutate(&self, change: impl FnOnce(&mut Session)) -> Session {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        change(&mut *state);
        state.clone()
    }

    /// Mirrors `session` to the store. An unauthenticated session erases every key.
    async fn persist(&self, session: &Session) -> Result<()> {
        let result = write_session(self.store.as_ref(), session).await;
        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::error!(error = %err, "failed to persist session");
                absorb(SessionOperation::Persist, err)
            }
        }
    }
}

async fn write_session(store: &dyn SessionStore, session: &Session) -> Result<()> {
    if !session.is_authenticated() {
        for key in keys::ALL {
            store.delete(key).await?;
        }
        return Ok(());
    }

    let identity = serde_json::to_string(&session.identity)?;
    let permissions = serde_json::to_string(&session.permissions)?;

    store.set(keys::TOKEN, &session.token).await?;
    store.set(keys::USER_INFO, &identity).await?;
    store.set(keys::USER_ROLE, &session.role).await?;
    store.set(keys::USER_PERMISSIONS, &permissions).await?;
    store.set(keys::IS_LOGGED_IN, "true").await?;
    store.set(keys::USERNAME, session.username()).await?;
    Ok(())
}

/// Reads a session back. Malformed values count as absent; a token without a usable
/// identity gets a provisional one so the identity/token pairing always holds.
async fn restore_session(store: &dyn SessionStore) -> Result<Session> {
    let token = store.get(keys::TOKEN).await?.unwrap_or_default();
    if token.is_empty() {
        return Ok(Session::default());
    }

    let identity = store
        .get(keys::USER_INFO)
        .await?
        .and_then(|raw| serde_json::from_str::<Option<User>>(&raw).ok())
        .flatten();
    let identity = match identity {
        Some(user) => user,
        None => {
            let username = store
                .get(keys::USERNAME)
                .await?
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| token.clone());
            User::provisional(username)
        }
    };

    let permissions = store
        .get(keys::USER_PERMISSIONS)
        .await?
        .and_then(|raw| serde_json::from_str::<BTreeSet<String>>(&raw).ok())
        .unwrap_or_default();

    Ok(Session {
        token,
        identity: Some(identity),
        role: store.get(keys::USER_ROLE).await?.unwrap_or_default(),
        permissions,
    })
}
