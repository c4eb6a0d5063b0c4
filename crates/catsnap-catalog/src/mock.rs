//! Mock catalog session for testing
//!
//! This session replays canned rows per catalog query without connecting to
//! any server. Queries are matched by their `catsnap:<tag>` marker, so every
//! reader and the whole extraction run unchanged against it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use catsnap_catalog::{CatalogQuery, CatalogRow, MockSession};
//!
//! let session = MockSession::new();
//! session.add_rows(CatalogQuery::Tablespaces, vec![
//!     CatalogRow::new()
//!         .with("oid", 16400u32)
//!         .with("name", "test_tablespace")
//!         .with("location", "test_dir"),
//! ]).await;
//!
//! let pool = session.pool(4)?;
//! ```
//!
//! ## Simulating Failures
//!
//! ```rust,ignore
//! // Every query fails
//! let session = MockSession::new().with_connection_failure();
//!
//! // Every query waits first
//! let session = MockSession::new().with_latency(100);
//! ```

use catsnap_core::{ObjectKind, Oid};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::adapter::{CatalogError, CatalogRow, CatalogSession, SessionPool};
use crate::queries::CatalogQuery;

/// Snapshot identifier reported by mock pools
pub const MOCK_SNAPSHOT_ID: &str = "mock-snapshot";

/// In-memory catalog session
///
/// Clones share their rows, errors, query log and cancel counter, so a pool
/// built from one mock behaves like several sessions on the same snapshot.
#[derive(Clone)]
pub struct MockSession {
    /// Canned rows by query
    rows: Arc<RwLock<HashMap<CatalogQuery, Vec<CatalogRow>>>>,

    /// Errors to return for specific queries
    errors: Arc<RwLock<HashMap<CatalogQuery, CatalogError>>>,

    /// Identifiers returned by `oid_of`
    names: Arc<RwLock<HashMap<(ObjectKind, String, String), Oid>>>,

    /// Every query text received, in arrival order
    log: Arc<RwLock<Vec<String>>>,

    cancels: Arc<AtomicUsize>,

    /// Simulate connection failure
    fail_connection: bool,

    /// Simulate query latency (milliseconds)
    latency_ms: u64,
}

impl MockSession {
    /// Create a mock session that returns no rows for any query
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
            errors: Arc::new(RwLock::new(HashMap::new())),
            names: Arc::new(RwLock::new(HashMap::new())),
            log: Arc::new(RwLock::new(Vec::new())),
            cancels: Arc::new(AtomicUsize::new(0)),
            fail_connection: false,
            latency_ms: 0,
        }
    }

    /// Rows returned for `query`, replacing earlier ones
    pub async fn add_rows(&self, query: CatalogQuery, rows: Vec<CatalogRow>) {
        self.rows.write().await.insert(query, rows);
    }

    /// Configure an error to be returned for a specific query
    pub async fn add_error(&self, query: CatalogQuery, error: CatalogError) {
        self.errors.write().await.insert(query, error);
    }

    /// Register the identifier `oid_of` returns for a name
    pub async fn add_name(&self, kind: ObjectKind, schema: &str, name: &str, oid: Oid) {
        self.names
            .write()
            .await
            .insert((kind, schema.to_string(), name.to_string()), oid);
    }

    /// Configure every query to fail with a connection error
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Configure simulated latency for every query
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// A pool of `count` sessions sharing this mock's data
    pub fn pool(&self, count: usize) -> Result<SessionPool, CatalogError> {
        let sessions = (0..count)
            .map(|_| Arc::new(self.clone()) as Arc<dyn CatalogSession>)
            .collect();

        SessionPool::new(sessions, Some(MOCK_SNAPSHOT_ID.to_string()))
    }

    /// Query texts received so far
    pub async fn query_log(&self) -> Vec<String> {
        self.log.read().await.clone()
    }

    /// How many times `query` was issued
    pub async fn query_count(&self, query: CatalogQuery) -> usize {
        self.log
            .read()
            .await
            .iter()
            .filter(|sql| CatalogQuery::from_sql(sql) == Some(query))
            .count()
    }

    /// Cancel requests received across every clone
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    async fn simulate(&self) -> Result<(), CatalogError> {
        if self.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.latency_ms)).await;
        }

        if self.fail_connection {
            return Err(CatalogError::Connection("Mock connection failure".to_string()));
        }

        Ok(())
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CatalogSession for MockSession {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn query(&self, sql: &str) -> Result<Vec<CatalogRow>, CatalogError> {
        self.simulate().await?;
        self.log.write().await.push(sql.to_string());

        if sql.trim() == "SELECT 1 AS ok" {
            return Ok(vec![CatalogRow::new().with("ok", 1i64)]);
        }

        let query = CatalogQuery::from_sql(sql)
            .ok_or_else(|| CatalogError::Query(format!("Mock has no query matching: {}", sql.trim())))?;

        if let Some(error) = self.errors.read().await.get(&query) {
            return Err(error.clone());
        }

        Ok(self.rows.read().await.get(&query).cloned().unwrap_or_default())
    }

    async fn cancel(&self) -> Result<(), CatalogError> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn oid_of(
        &self,
        kind: ObjectKind,
        schema: &str,
        name: &str,
    ) -> Result<Option<Oid>, CatalogError> {
        self.simulate().await?;

        let key = (kind, schema.to_string(), name.to_string());
        Ok(self.names.read().await.get(&key).copied())
    }
}
