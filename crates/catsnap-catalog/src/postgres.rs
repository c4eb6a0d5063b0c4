//! PostgreSQL/Greenplum catalog sessions
//!
//! A pool is opened as one leader plus followers. The leader starts a
//! read-only repeatable-read transaction and exports its snapshot; every
//! follower imports it with `SET TRANSACTION SNAPSHOT`, so all sessions see
//! exactly the same catalog state. Catalogs without snapshot export (gpdb5)
//! get a single serializable session instead.
//!
//! ## Usage
//!
//! ```rust,ignore
//! // Plain connection
//! let pool = PostgresSession::open_pool(
//!     "host=localhost port=5432 dbname=mydb user=gpadmin",
//!     &config,
//!     false,
//! ).await?;
//!
//! // TLS via native-tls
//! let pool = PostgresSession::open_pool(conn_str, &config, true).await?;
//! ```

use crate::adapter::{CatalogError, CatalogRow, CatalogSession, SessionPool};
use catsnap_core::Config;

#[cfg(feature = "postgres")]
use crate::adapter::Value;

#[cfg(feature = "postgres")]
use catsnap_core::CatalogVersion;

#[cfg(feature = "postgres")]
use std::sync::Arc;

#[cfg(feature = "postgres")]
use tokio_postgres::{types::Type, CancelToken, Client, Config as PgConfig, NoTls, Row};

#[cfg(feature = "postgres")]
use postgres_native_tls::MakeTlsConnector;

#[cfg(feature = "postgres")]
use native_tls::TlsConnector;

/// One catalog session over a dedicated connection
pub struct PostgresSession {
    /// PostgreSQL client (only available with postgres feature)
    #[cfg(feature = "postgres")]
    client: Client,

    /// Token for aborting the running query from outside
    #[cfg(feature = "postgres")]
    cancel_token: CancelToken,

    /// Whether the connection (and therefore cancel requests) use TLS
    tls: bool,

    /// `host:port/dbname`, for logs
    target: String,

    /// Placeholder for when feature is disabled
    #[cfg(not(feature = "postgres"))]
    _phantom: std::marker::PhantomData<()>,
}

#[cfg(feature = "postgres")]
fn describe_target(config: &PgConfig) -> String {
    let host = config
        .get_hosts()
        .first()
        .map(|h| format!("{:?}", h))
        .unwrap_or_else(|| "localhost".to_string());
    let port = config.get_ports().first().copied().unwrap_or(5432);
    let database = config.get_dbname().unwrap_or("postgres");

    format!("{}:{}/{}", host, port, database)
}

#[cfg(feature = "postgres")]
fn spawn_connection<F>(connection: F, target: String)
where
    F: std::future::Future<Output = Result<(), tokio_postgres::Error>> + Send + 'static,
{
    // Spawn connection handler in background
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(server = %target, error = %e, "catalog connection error");
        }
    });
}

#[cfg(feature = "postgres")]
fn query_error(e: tokio_postgres::Error) -> CatalogError {
    match e.as_db_error() {
        Some(db) => CatalogError::Query(format!("{}: {}", db.code().code(), db.message())),
        None if e.is_closed() => CatalogError::Connection(e.to_string()),
        None => CatalogError::Query(e.to_string()),
    }
}

/// Decode one result column by its wire type
#[cfg(feature = "postgres")]
fn column_value(row: &Row, idx: usize, ty: &Type) -> Result<Value, tokio_postgres::Error> {
    let value: Value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.into(),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(i64::from).into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(i64::from).into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.into(),
        Type::OID => row.try_get::<_, Option<u32>>(idx)?.into(),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.map(f64::from).into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.into(),
        Type::OID_ARRAY => row.try_get::<_, Option<Vec<u32>>>(idx)?.into(),
        Type::TEXT_ARRAY => row.try_get::<_, Option<Vec<String>>>(idx)?.into(),
        _ => row.try_get::<_, Option<String>>(idx)?.into(),
    };

    Ok(value)
}

#[cfg(feature = "postgres")]
fn convert_row(row: &Row) -> Result<CatalogRow, CatalogError> {
    let mut converted = CatalogRow::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = column_value(row, idx, column.type_())
            .map_err(|e| CatalogError::decode(column.name(), e.to_string()))?;
        converted.push(column.name(), value);
    }

    Ok(converted)
}

impl PostgresSession {
    /// Connect one session from a libpq-style connection string
    #[cfg(feature = "postgres")]
    pub async fn connect(conn_str: &str, tls: bool) -> Result<Self, CatalogError> {
        let config: PgConfig = conn_str
            .parse()
            .map_err(|e| CatalogError::Connection(format!("Invalid connection string: {}", e)))?;
        let target = describe_target(&config);

        let client = if tls {
            let connector = TlsConnector::builder()
                .build()
                .map_err(|e| CatalogError::Connection(format!("Failed to create TLS connector: {}", e)))?;

            let (client, connection) = config
                .connect(MakeTlsConnector::new(connector))
                .await
                .map_err(|e| CatalogError::Connection(format!("Failed to connect to {} with TLS: {}", target, e)))?;
            spawn_connection(connection, target.clone());
            client
        } else {
            let (client, connection) = config
                .connect(NoTls)
                .await
                .map_err(|e| CatalogError::Connection(format!("Failed to connect to {}: {}", target, e)))?;
            spawn_connection(connection, target.clone());
            client
        };

        let cancel_token = client.cancel_token();
        tracing::debug!(server = %target, tls, "catalog session connected");

        Ok(Self {
            client,
            cancel_token,
            tls,
            target,
        })
    }

    /// Connect without postgres feature (returns error)
    #[cfg(not(feature = "postgres"))]
    pub async fn connect(_conn_str: &str, _tls: bool) -> Result<Self, CatalogError> {
        Err(CatalogError::Connection(
            "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres".to_string(),
        ))
    }

    /// Open `config.session_count()` sessions pinned to one snapshot
    #[cfg(feature = "postgres")]
    pub async fn open_pool(conn_str: &str, config: &Config, tls: bool) -> Result<SessionPool, CatalogError> {
        let leader = Self::connect(conn_str, tls).await?;

        if config.catalog_version == CatalogVersion::Gpdb5 {
            leader.execute("BEGIN ISOLATION LEVEL SERIALIZABLE READ ONLY").await?;
            tracing::info!(server = %leader.target, "snapshot export unavailable, using one session");
            return SessionPool::new(vec![Arc::new(leader) as Arc<dyn CatalogSession>], None);
        }

        leader.execute("BEGIN ISOLATION LEVEL REPEATABLE READ READ ONLY").await?;
        let snapshot_id = leader.export_snapshot().await?;

        let mut sessions: Vec<Arc<dyn CatalogSession>> = vec![Arc::new(leader)];
        for _ in 1..config.session_count() {
            let follower = Self::connect(conn_str, tls).await?;
            follower.execute("BEGIN ISOLATION LEVEL REPEATABLE READ READ ONLY").await?;
            follower
                .execute(&format!("SET TRANSACTION SNAPSHOT '{}'", snapshot_id.replace('\'', "''")))
                .await?;
            sessions.push(Arc::new(follower));
        }

        tracing::info!(sessions = sessions.len(), snapshot = %snapshot_id, "catalog sessions opened");
        SessionPool::new(sessions, Some(snapshot_id))
    }

    /// Open pool without postgres feature (returns error)
    #[cfg(not(feature = "postgres"))]
    pub async fn open_pool(_conn_str: &str, _config: &Config, _tls: bool) -> Result<SessionPool, CatalogError> {
        Err(CatalogError::Connection(
            "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres".to_string(),
        ))
    }

    #[cfg(feature = "postgres")]
    async fn execute(&self, sql: &str) -> Result<(), CatalogError> {
        self.client.batch_execute(sql).await.map_err(query_error)
    }

    #[cfg(feature = "postgres")]
    async fn export_snapshot(&self) -> Result<String, CatalogError> {
        let row = self
            .client
            .query_one("SELECT pg_export_snapshot()", &[])
            .await
            .map_err(query_error)?;

        row.try_get::<_, String>(0)
            .map_err(|e| CatalogError::decode("pg_export_snapshot", e.to_string()))
    }

    /// Get the connection target
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn uses_tls(&self) -> bool {
        self.tls
    }
}

#[async_trait::async_trait]
impl CatalogSession for PostgresSession {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    #[cfg(feature = "postgres")]
    async fn query(&self, sql: &str) -> Result<Vec<CatalogRow>, CatalogError> {
        let rows = self.client.query(sql, &[]).await.map_err(query_error)?;
        rows.iter().map(convert_row).collect()
    }

    #[cfg(not(feature = "postgres"))]
    async fn query(&self, _sql: &str) -> Result<Vec<CatalogRow>, CatalogError> {
        Err(CatalogError::Connection(
            "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres".to_string(),
        ))
    }

    #[cfg(feature = "postgres")]
    async fn cancel(&self) -> Result<(), CatalogError> {
        let result = if self.tls {
            let connector = TlsConnector::builder()
                .build()
                .map_err(|e| CatalogError::Connection(format!("Failed to create TLS connector: {}", e)))?;
            self.cancel_token.cancel_query(MakeTlsConnector::new(connector)).await
        } else {
            self.cancel_token.cancel_query(NoTls).await
        };

        result.map_err(|e| CatalogError::Connection(format!("Cancel request to {} failed: {}", self.target, e)))
    }

    #[cfg(not(feature = "postgres"))]
    async fn cancel(&self) -> Result<(), CatalogError> {
        Ok(())
    }
}
