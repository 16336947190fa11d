use std::sync::Arc;

// --- Module Structure ---

// Core session components.
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod storage;

// Outbound calls: the pipeline and the per-entity builders feeding it.
pub mod api;
pub mod pipeline;

// Navigation: route catalogue, one-shot registry, per-attempt guard.
pub mod guard;
pub mod routes;

// --- Public Re-exports ---

pub use config::{AppConfig, Env};
pub use error::{ClientError, Result};
pub use guard::{GuardDecision, Navigation, NavigationGuard};
pub use models::{ApiRequest, ApiResponse, Session};
pub use pipeline::{ApiClient, HttpTransport, MockTransport, TransportState};
pub use routes::{NavigationRegistry, RouteHost, RouteTable};
pub use session::SessionManager;
pub use storage::{MockSessionStore, SqliteSessionStore, StoreState};

/// ConsoleState
///
/// The assembled component graph. Every component receives its collaborators here at
/// construction; there is no global session.
#[derive(Clone)]
pub struct ConsoleState {
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
    /// Session Manager: sole writer of the session.
    pub session: Arc<SessionManager>,
    /// Registry of gated routes, shared with the session (reset) and the guard (install).
    pub registry: Arc<NavigationRegistry>,
    pub guard: NavigationGuard,
    pub api: ApiClient,
}

impl ConsoleState {
    /// assemble
    ///
    /// Wires the graph around an existing store and transport, restoring whatever
    /// session the store holds.
    pub async fn assemble(config: AppConfig, store: StoreState, transport: TransportState) -> Self {
        let host: Arc<dyn RouteHost> = Arc::new(RouteTable::new());
        let registry = Arc::new(NavigationRegistry::new(host));

        let session =
            Arc::new(SessionManager::restore(store, transport.clone(), registry.clone()).await);
        let guard = NavigationGuard::new(session.clone(), registry.clone());
        let api = ApiClient::new(transport, session.clone());

        Self {
            config,
            session,
            registry,
            guard,
            api,
        }
    }

    /// connect
    ///
    /// Production wiring: SQLite store at `config.session_db` and the HTTP transport.
    pub async fn connect(config: AppConfig) -> Result<Self> {
        let store = Arc::new(SqliteSessionStore::connect(&config.session_db).await?) as StoreState;
        let transport = Arc::new(HttpTransport::new(&config)?) as TransportState;

        Ok(Self::assemble(config, store, transport).await)
    }
}
