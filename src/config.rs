use std::env;
use std::time::Duration;

/// Fallback timeout applied to every remote call when `RBAC_TIMEOUT_MS` is absent or unparsable.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// AppConfig
///
/// Holds the console's entire configuration state. Loaded once at startup and immutable
/// afterwards; every component that needs a setting receives a clone at construction.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Origin of the RBAC service, e.g. "http://localhost:8080".
    pub api_url: String,
    // Base path prefix every endpoint lives under.
    pub api_prefix: String,
    // Connect and response timeout for every remote call.
    pub request_timeout: Duration,
    // SQLite file backing the persistent session store.
    pub session_db: String,
    // Runtime environment marker. Selects the log format and fail-fast rules.
    pub env: Env,
}

/// Env
///
/// Runtime context: `Local` favours readable logs and lenient defaults, `Production`
/// demands an explicit service URL and emits JSON logs.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Non-panicking configuration used by tests and by the local fallback path.
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            api_prefix: "/api/v1".to_string(),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            session_db: "rbac-session.db".to_string(),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables (call `dotenv` first).
    ///
    /// # Panics
    /// Panics in `Env::Production` when `RBAC_API_URL` is not set, so the console never
    /// talks to a guessed endpoint in production.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let defaults = Self::default();

        let api_url = match env {
            Env::Production => {
                env::var("RBAC_API_URL").expect("FATAL: RBAC_API_URL must be set in production.")
            }
            Env::Local => env::var("RBAC_API_URL").unwrap_or(defaults.api_url),
        };

        let request_timeout = env::var("RBAC_TIMEOUT_MS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_timeout);

        Self {
            api_url,
            api_prefix: env::var("RBAC_API_PREFIX").unwrap_or(defaults.api_prefix),
            request_timeout,
            session_db: env::var("RBAC_SESSION_DB").unwrap_or(defaults.session_db),
            env,
        }
    }

    /// Origin joined with the prefix, without a doubled or trailing slash.
    pub fn api_base(&self) -> String {
        let origin = self.api_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            origin.to_string()
        } else {
            format!("{}/{}", origin, prefix)
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
