use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{ClientError, Result};

/// Keys the session is persisted under. Every value is a plain string; structured
/// values (identity, permission set) are JSON-encoded.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const USER_INFO: &str = "userInfo";
    pub const USER_ROLE: &str = "userRole";
    pub const USER_PERMISSIONS: &str = "userPermissions";
    pub const IS_LOGGED_IN: &str = "isLoggedIn";
    pub const USERNAME: &str = "username";

    pub const ALL: [&str; 6] = [
        TOKEN,
        USER_INFO,
        USER_ROLE,
        USER_PERMISSIONS,
        IS_LOGGED_IN,
        USERNAME,
    ];
}

// 1. SessionStore Contract
/// SessionStore
///
/// Durable key/value surface that survives process restarts. Each write is atomic per
/// key; nothing spanning several keys is promised.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

// 2. The Real Implementation (SQLite)
/// SqliteSessionStore
///
/// One `session_kv` table in a local SQLite file.
#[derive(Clone, Debug)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Opens (creating if needed) the database at `path` and ensures the table exists.
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_kv (
                key   TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        tracing::debug!(path, "session store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM session_kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO session_kv (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM session_kv WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// 3. The Mock Implementation (For Unit Tests)
/// MockSessionStore
///
/// In-memory store for tests. `should_fail` makes every operation return a store error.
#[derive(Default)]
pub struct MockSessionStore {
    entries: Mutex<HashMap<String, String>>,
    pub should_fail: bool,
}

impl MockSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Pre-seeded store, e.g. to simulate state left behind by an earlier process.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            entries: Mutex::new(entries),
            should_fail: false,
        }
    }

    /// Copy of everything currently stored.
    pub async fn entries(&self) -> HashMap<String, String> {
        self.entries.lock().await.clone()
    }

    fn check(&self) -> Result<()> {
        if self.should_fail {
            return Err(ClientError::Store(
                "Mock Store Error: Simulation requested".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check()?;
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// StoreState
///
/// Shared handle to whichever store the console was assembled with.
pub type StoreState = Arc<dyn SessionStore>;
