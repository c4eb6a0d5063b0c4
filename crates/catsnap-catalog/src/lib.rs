//! Catalog readers for metadata extraction
//!
//! This crate reads every SQL-level object kind from the system catalogs of
//! a running cluster and decodes the rows into the typed records of
//! `catsnap_core`. All reads go through the [`CatalogSession`] trait, so the
//! same readers run against a live server or the in-memory [`MockSession`].
//!
//! ## Features
//!
//! - `postgres` - PostgreSQL/Greenplum sessions pinned to an exported snapshot
//!
//! ## Example
//!
//! ```rust,ignore
//! use catsnap_catalog::{CatalogExtractor, PostgresSession};
//! use tokio_util::sync::CancellationToken;
//!
//! let pool = PostgresSession::open_pool(conn_str, config.session_count(), false).await?;
//! let contents = CatalogExtractor::new(pool, config)
//!     .extract(&CancellationToken::new())
//!     .await?;
//! ```

pub mod adapter;
pub mod queries;
pub mod reader;
pub mod extract;
pub mod postgres;
pub mod mock;

pub use adapter::{CatalogError, CatalogRow, CatalogSession, SessionPool, Value};
pub use queries::CatalogQuery;
pub use extract::{CatalogExtractor, ExtractError};
pub use postgres::PostgresSession;
pub use mock::MockSession;
