//! Persistent response cache.
//!
//! [`CacheStore`] maps a request fingerprint ([`cache_key`]) to the final,
//! filtered response text and the provider that produced it. Entries expire
//! `ttl_days` after they were written.
//!
//! # Storage
//!
//! A single SQLite table (bundled `rusqlite`):
//!
//! ```text
//! responses(key TEXT PRIMARY KEY, response TEXT, provider TEXT, created_at TEXT)
//! ```
//!
//! `created_at` is RFC 3339 UTC with fixed millisecond precision, so string
//! comparison orders timestamps correctly and expiry can be evaluated in SQL.
//!
//! # Expiry
//!
//! Expiry is lazy: [`CacheStore::get`] deletes a stale row when it reads
//! one. [`CacheStore::open`] additionally sweeps all expired rows once.
//!
//! # Concurrency
//!
//! The connection lives behind a `Mutex`, so one store can be shared as
//! `Arc<CacheStore>` within a process. Across processes, WAL journaling and
//! a busy timeout let readers proceed while another process upserts; a
//! reader sees either the old row or the new one.
//!
//! # Failure semantics
//!
//! Every operation returns [`HuginnError::Cache`] on failure. The cache is
//! an accelerator only: the engine logs these errors and carries on as if
//! caching were disabled for that operation.

mod key;

pub use key::cache_key;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{HuginnError, Result};

/// Default time-to-live in days.
pub const DEFAULT_TTL_DAYS: u32 = 7;

/// How long a writer waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the response cache.
///
/// ```rust
/// # use huginn::cache::CacheConfig;
/// let config = CacheConfig::new().ttl_days(30);
/// assert!(config.enabled);
/// assert_eq!(config.ttl_days, 30);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether responses are read from and written to the cache. Default: true.
    pub enabled: bool,
    /// Entry lifetime in days. Must be > 0. Default: 7.
    pub ttl_days: u32,
    /// Database file. Default: `{cache_dir}/huginn/responses.db`.
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_days: DEFAULT_TTL_DAYS,
            path: None,
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable caching.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the entry lifetime in days.
    pub fn ttl_days(mut self, days: u32) -> Self {
        self.ttl_days = days;
        self
    }

    /// Set an explicit database path.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// The configured path, or the platform default.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_cache_path)
    }
}

/// Default database path: `~/.cache/huginn/responses.db` (platform cache dir).
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("huginn")
        .join("responses.db")
}

/// A cached response.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub response: String,
    pub provider: String,
    pub created_at: DateTime<Utc>,
}

/// Summary statistics for `huginn cache stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of rows, including expired rows not yet swept.
    pub entries: u64,
    /// Size of the database in bytes (`page_count * page_size`).
    pub size_bytes: u64,
}

/// SQLite-backed response cache with TTL expiry.
pub struct CacheStore {
    conn: Mutex<Connection>,
    ttl: chrono::Duration,
    path: Option<PathBuf>,
}

impl CacheStore {
    /// Open (or create) the store described by `config`.
    ///
    /// Creates the parent directory if needed and sweeps expired rows once.
    pub fn open(config: &CacheConfig) -> Result<Self> {
        let path = config.resolved_path();
        Self::open_path(&path, config.ttl_days)
    }

    /// Open (or create) a store at an explicit path.
    pub fn open_path(path: &Path, ttl_days: u32) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                HuginnError::Cache(format!(
                    "failed to create cache dir {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            HuginnError::Cache(format!("failed to open {}: {e}", path.display()))
        })?;
        // WAL lets readers in other processes proceed while a writer upserts.
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let store = Self::from_connection(conn, ttl_days, Some(path.to_path_buf()))?;
        let purged = store.purge_expired()?;
        if purged > 0 {
            info!(purged, path = %path.display(), "swept expired cache entries");
        }
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory(ttl_days: u32) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, ttl_days, None)
    }

    fn from_connection(conn: Connection, ttl_days: u32, path: Option<PathBuf>) -> Result<Self> {
        if ttl_days == 0 {
            return Err(HuginnError::Configuration(
                "cache ttl_days must be greater than 0".to_string(),
            ));
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS responses (
                key TEXT PRIMARY KEY,
                response TEXT NOT NULL,
                provider TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_responses_created
                ON responses(created_at);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            ttl: chrono::Duration::days(i64::from(ttl_days)),
            path,
        })
    }

    /// Database file path, or `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up a live entry. Expired entries are deleted and reported as misses.
    pub fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        self.get_at(key, Utc::now())
    }

    /// [`get`](Self::get) evaluated at an explicit instant.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheEntry>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT response, provider, created_at FROM responses WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((response, provider, created_at)) = row else {
            return Ok(None);
        };

        // An unparseable timestamp is treated like an expired row.
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|t| t.with_timezone(&Utc))
            .ok();
        // A lifetime that runs past the representable range never expires.
        let live = created_at.filter(|t| {
            t.checked_add_signed(self.ttl)
                .is_none_or(|expires| now < expires)
        });
        match live {
            Some(created_at) => Ok(Some(CacheEntry {
                key: key.to_string(),
                response,
                provider,
                created_at,
            })),
            _ => {
                conn.execute("DELETE FROM responses WHERE key = ?1", params![key])?;
                debug!(key, "deleted expired cache entry");
                Ok(None)
            }
        }
    }

    /// Insert or replace the entry for `key`, stamped with the current time.
    pub fn set(&self, key: &str, response: &str, provider: &str) -> Result<()> {
        self.set_at(key, response, provider, Utc::now())
    }

    /// [`set`](Self::set) with an explicit creation time.
    pub fn set_at(
        &self,
        key: &str,
        response: &str,
        provider: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO responses (key, response, provider, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, response, provider, format_timestamp(created_at)],
        )?;
        Ok(())
    }

    /// Remove one entry. Returns whether a row existed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let n = conn.execute("DELETE FROM responses WHERE key = ?1", params![key])?;
        Ok(n > 0)
    }

    /// Remove every entry. Returns the number of rows removed.
    pub fn clear(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n = conn.execute("DELETE FROM responses", [])?;
        Ok(n)
    }

    /// Remove every expired entry. Returns the number of rows removed.
    pub fn purge_expired(&self) -> Result<usize> {
        self.purge_expired_at(Utc::now())
    }

    /// [`purge_expired`](Self::purge_expired) evaluated at an explicit instant.
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let Some(cutoff) = now.checked_sub_signed(self.ttl) else {
            return Ok(0);
        };
        let cutoff = format_timestamp(cutoff);
        let conn = self.lock()?;
        let n = conn.execute(
            "DELETE FROM responses WHERE created_at <= ?1",
            params![cutoff],
        )?;
        Ok(n)
    }

    /// Row count and database size.
    pub fn stats(&self) -> Result<CacheStats> {
        let conn = self.lock()?;
        let entries: i64 = conn.query_row("SELECT COUNT(*) FROM responses", [], |r| r.get(0))?;
        let page_count: i64 = conn.query_row("PRAGMA page_count", [], |r| r.get(0))?;
        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |r| r.get(0))?;
        Ok(CacheStats {
            entries: entries.max(0) as u64,
            size_bytes: (page_count * page_size).max(0) as u64,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| HuginnError::Cache("lock poisoned".to_string()))
    }
}

fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}
