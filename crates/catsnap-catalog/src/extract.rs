//! Concurrent extraction of every object kind
//!
//! Each kind is read on its own session from the pool; all sessions share one
//! exported snapshot, so the combined result describes a single point in
//! time. Cancellation and the configured timeout abort every in-flight query
//! and fail the whole extraction.

use catsnap_core::{CatalogContents, Config, ObjectKind};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapter::{CatalogError, SessionPool};
use crate::reader;

/// Errors that abort an extraction
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to read {kind}: {source}")]
    Read {
        kind: ObjectKind,
        source: CatalogError,
    },

    #[error("Catalog extraction cancelled")]
    Cancelled,

    #[error("Catalog extraction timed out after {0:?}")]
    Timeout(Duration),
}

impl ExtractError {
    /// Object kind being read when the error occurred
    pub fn kind(&self) -> Option<ObjectKind> {
        match self {
            ExtractError::Read { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Reads a whole catalog through a session pool
pub struct CatalogExtractor {
    pool: SessionPool,
    config: Config,
}

impl CatalogExtractor {
    pub fn new(pool: SessionPool, config: Config) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read every object kind
    ///
    /// Returns no partial result: the first failed read, a cancellation, or
    /// the configured timeout cancels the remaining queries and fails.
    pub async fn extract(&self, cancel: &CancellationToken) -> Result<CatalogContents, ExtractError> {
        info!(
            sessions = self.pool.len(),
            snapshot = self.pool.snapshot_id().unwrap_or("none"),
            "extracting catalog"
        );
        let started = Instant::now();

        let outcome = match self.config.query_timeout() {
            Some(limit) => tokio::select! {
                _ = cancel.cancelled() => Err(ExtractError::Cancelled),
                result = tokio::time::timeout(limit, self.read_all()) => match result {
                    Ok(contents) => contents,
                    Err(_) => Err(ExtractError::Timeout(limit)),
                },
            },
            None => tokio::select! {
                _ = cancel.cancelled() => Err(ExtractError::Cancelled),
                result = self.read_all() => result,
            },
        };

        match outcome {
            Ok(contents) => {
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    functions = contents.functions.len(),
                    aggregates = contents.aggregates.len(),
                    types = contents.types.len(),
                    roles = contents.roles.len(),
                    "catalog extraction finished"
                );
                Ok(contents)
            }
            Err(e) => {
                warn!(error = %e, "catalog extraction aborted");
                self.pool.cancel_all().await;
                Err(e)
            }
        }
    }

    async fn read_all(&self) -> Result<CatalogContents, ExtractError> {
        let pool = &self.pool;
        let config = &self.config;

        let (
            session_gucs,
            database_gucs,
            resource_queues,
            roles,
            role_members,
            tablespaces,
            languages,
            types,
            conversions,
            casts,
            functions,
            function_info,
            aggregates,
        ) = tokio::try_join!(
            reader::get_session_gucs(pool.session(0), config),
            reader::get_database_gucs(pool.session(1), config),
            reader::get_resource_queues(pool.session(2), config),
            reader::get_roles(pool.session(3), config),
            reader::get_role_members(pool.session(4), config),
            reader::get_tablespaces(pool.session(5), config),
            reader::get_procedural_languages(pool.session(6), config),
            reader::get_types(pool.session(7), config),
            reader::get_conversions(pool.session(8), config),
            reader::get_casts(pool.session(9), config),
            reader::get_functions(pool.session(10), config),
            reader::get_function_oid_to_info_map(pool.session(11), config),
            reader::get_aggregates(pool.session(12), config),
        )?;

        Ok(CatalogContents {
            session_gucs,
            database_gucs,
            resource_queues,
            roles,
            role_members,
            tablespaces,
            languages,
            types,
            conversions,
            casts,
            functions,
            aggregates,
            function_info,
        })
    }
}
