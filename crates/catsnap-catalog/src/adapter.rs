//! Catalog session trait and the rows it returns

use catsnap_core::{ObjectKind, Oid};
use std::sync::Arc;

use crate::queries;

/// A decoded column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    OidList(Vec<Oid>),
    TextList(Vec<String>),
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<Oid>> for Value {
    fn from(value: Vec<Oid>) -> Self {
        Value::OidList(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::TextList(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One result row, columns addressed by name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogRow {
    columns: Vec<(String, Value)>,
}

impl CatalogRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((column.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn value(&self, column: &str) -> Result<&Value, CatalogError> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
            .ok_or_else(|| CatalogError::decode(column, "column missing from result"))
    }

    pub fn opt_text(&self, column: &str) -> Result<Option<String>, CatalogError> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::Text(text) => Ok(Some(text.clone())),
            other => Err(CatalogError::decode(column, format!("expected text, found {:?}", other))),
        }
    }

    pub fn text(&self, column: &str) -> Result<String, CatalogError> {
        self.opt_text(column)?
            .ok_or_else(|| CatalogError::decode(column, "unexpected null"))
    }

    /// Text where null means "unset"
    pub fn text_or_empty(&self, column: &str) -> Result<String, CatalogError> {
        Ok(self.opt_text(column)?.unwrap_or_default())
    }

    pub fn bool(&self, column: &str) -> Result<bool, CatalogError> {
        match self.value(column)? {
            Value::Bool(value) => Ok(*value),
            Value::Null => Err(CatalogError::decode(column, "unexpected null")),
            other => Err(CatalogError::decode(column, format!("expected bool, found {:?}", other))),
        }
    }

    pub fn opt_int(&self, column: &str) -> Result<Option<i64>, CatalogError> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::Int(value) => Ok(Some(*value)),
            other => Err(CatalogError::decode(column, format!("expected integer, found {:?}", other))),
        }
    }

    pub fn int(&self, column: &str) -> Result<i64, CatalogError> {
        self.opt_int(column)?
            .ok_or_else(|| CatalogError::decode(column, "unexpected null"))
    }

    pub fn float(&self, column: &str) -> Result<f64, CatalogError> {
        match self.value(column)? {
            Value::Float(value) => Ok(*value),
            Value::Int(value) => Ok(*value as f64),
            Value::Null => Err(CatalogError::decode(column, "unexpected null")),
            other => Err(CatalogError::decode(column, format!("expected number, found {:?}", other))),
        }
    }

    /// Identifier column; null reads as 0 ("not set")
    pub fn oid(&self, column: &str) -> Result<Oid, CatalogError> {
        match self.opt_int(column)? {
            None => Ok(0),
            Some(value) => Oid::try_from(value)
                .map_err(|_| CatalogError::decode(column, format!("{} is not a valid oid", value))),
        }
    }

    /// Null reads as an empty list
    pub fn oid_list(&self, column: &str) -> Result<Vec<Oid>, CatalogError> {
        match self.value(column)? {
            Value::Null => Ok(Vec::new()),
            Value::OidList(oids) => Ok(oids.clone()),
            other => Err(CatalogError::decode(column, format!("expected oid list, found {:?}", other))),
        }
    }

    /// Null reads as an empty list
    pub fn text_list(&self, column: &str) -> Result<Vec<String>, CatalogError> {
        match self.value(column)? {
            Value::Null => Ok(Vec::new()),
            Value::TextList(items) => Ok(items.clone()),
            other => Err(CatalogError::decode(column, format!("expected text list, found {:?}", other))),
        }
    }
}

/// Errors raised by a catalog session or while decoding its rows
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Cannot decode column `{column}`{}: {message}", object_suffix(.oid))]
    Decode {
        column: String,
        oid: Option<Oid>,
        message: String,
    },
}

fn object_suffix(oid: &Option<Oid>) -> String {
    oid.map(|oid| format!(" of object {}", oid)).unwrap_or_default()
}

impl CatalogError {
    pub fn decode(column: &str, message: impl Into<String>) -> Self {
        CatalogError::Decode {
            column: column.to_string(),
            oid: None,
            message: message.into(),
        }
    }

    /// Attach the identifier of the row being decoded
    pub fn with_oid(self, row_oid: Oid) -> Self {
        match self {
            CatalogError::Decode { column, oid: None, message } => CatalogError::Decode {
                column,
                oid: Some(row_oid),
                message,
            },
            other => other,
        }
    }
}

/// A read-only session pinned to the extraction snapshot
#[async_trait::async_trait]
pub trait CatalogSession: Send + Sync {
    /// Get the session name (e.g., "PostgreSQL", "Mock")
    fn name(&self) -> &'static str;

    /// Run a query and return its rows
    async fn query(&self, sql: &str) -> Result<Vec<CatalogRow>, CatalogError>;

    /// Abort whatever query is currently running on this session
    async fn cancel(&self) -> Result<(), CatalogError>;

    /// Test the connection
    async fn test_connection(&self) -> Result<(), CatalogError> {
        self.query("SELECT 1 AS ok").await.map(|_| ())
    }

    /// Look up the identifier of a named object
    ///
    /// Used by callers to verify extracted identifiers; `schema` is ignored
    /// for global kinds. Kinds without a single name resolve to `None`.
    async fn oid_of(
        &self,
        kind: ObjectKind,
        schema: &str,
        name: &str,
    ) -> Result<Option<Oid>, CatalogError> {
        let Some(sql) = queries::oid_lookup(kind, schema, name) else {
            return Ok(None);
        };

        let rows = self.query(&sql).await?;
        match rows.first() {
            Some(row) => row.oid("oid").map(Some),
            None => Ok(None),
        }
    }
}

/// Sessions that all read the same transaction snapshot
#[derive(Clone)]
pub struct SessionPool {
    sessions: Vec<Arc<dyn CatalogSession>>,
    snapshot_id: Option<String>,
}

impl SessionPool {
    pub fn new(
        sessions: Vec<Arc<dyn CatalogSession>>,
        snapshot_id: Option<String>,
    ) -> Result<Self, CatalogError> {
        if sessions.is_empty() {
            return Err(CatalogError::Connection("session pool is empty".to_string()));
        }

        Ok(Self { sessions, snapshot_id })
    }

    /// Session for the `index`-th unit of work, assigned round-robin
    pub fn session(&self, index: usize) -> &dyn CatalogSession {
        self.sessions[index % self.sessions.len()].as_ref()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Exported snapshot shared by every session, when the server has one
    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot_id.as_deref()
    }

    /// Cancel in-flight queries on every session
    pub async fn cancel_all(&self) {
        for session in &self.sessions {
            if let Err(e) = session.cancel().await {
                tracing::warn!(session = session.name(), error = %e, "failed to cancel catalog query");
            }
        }
    }
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("sessions", &self.sessions.len())
            .field("snapshot_id", &self.snapshot_id)
            .finish()
    }
}
