//! Configuration schema (catsnap.toml)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Schemas owned by the engine itself
const SYSTEM_SCHEMAS: &[&str] = &[
    "pg_catalog",
    "information_schema",
    "gp_toolkit",
    "pg_aoseg",
    "pg_bitmapindex",
    "pg_toast",
];

/// Catalog layout of the source cluster
///
/// Selects between query variants where catalog columns differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogVersion {
    /// Filespaces, `datconfig`, `aggprelimfn`, `aggordered`
    Gpdb5,

    /// Tablespace locations, `pg_db_role_setting`, `aggcombinefn`, `aggkind`
    Gpdb6,
}

impl Default for CatalogVersion {
    fn default() -> Self {
        Self::Gpdb6
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog_version: CatalogVersion,

    /// Number of sessions sharing the exported snapshot
    #[serde(default = "default_sessions")]
    pub sessions: usize,

    /// Upper bound on the whole catalog extraction
    #[serde(default)]
    pub query_timeout_secs: Option<u64>,

    /// Additional schemas treated like system schemas
    #[serde(default)]
    pub exclude_schemas: Vec<String>,

    /// Schemas searched for unqualified names in SQL function bodies
    #[serde(default = "default_search_path")]
    pub search_path: Vec<String>,

    /// libpq-style connection string
    #[serde(default)]
    pub connection: Option<String>,
}

fn default_sessions() -> usize {
    4
}

fn default_search_path() -> Vec<String> {
    vec!["public".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_version: CatalogVersion::default(),
            sessions: default_sessions(),
            query_timeout_secs: None,
            exclude_schemas: Vec::new(),
            search_path: default_search_path(),
            connection: None,
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Session count, never less than one
    pub fn session_count(&self) -> usize {
        self.sessions.max(1)
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_secs.map(Duration::from_secs)
    }

    /// Whether objects in `schema` belong to the engine rather than a user
    pub fn is_system_schema(&self, schema: &str) -> bool {
        SYSTEM_SCHEMAS.contains(&schema)
            || schema.starts_with("pg_temp_")
            || schema.starts_with("pg_toast_temp_")
            || self.exclude_schemas.iter().any(|excluded| excluded == schema)
    }

    /// SQL predicate keeping only user schemas, applied to `column`
    pub fn user_schema_predicate(&self, column: &str) -> String {
        let excluded = SYSTEM_SCHEMAS
            .iter()
            .map(|s| s.to_string())
            .chain(self.exclude_schemas.iter().cloned())
            .map(|s| format!("'{}'", s.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{col} NOT LIKE 'pg_temp_%' AND {col} NOT LIKE 'pg_toast_temp_%' AND {col} NOT IN ({excluded})",
            col = column,
            excluded = excluded
        )
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.catalog_version, CatalogVersion::Gpdb6);
        assert_eq!(config.session_count(), 4);
        assert_eq!(config.search_path, vec!["public".to_string()]);
        assert!(config.query_timeout().is_none());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            catalog_version = "gpdb5"
            sessions = 0
            query_timeout_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.catalog_version, CatalogVersion::Gpdb5);
        assert_eq!(config.session_count(), 1);
        assert_eq!(config.query_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.search_path, vec!["public".to_string()]);
    }

    #[test]
    fn system_schema_detection() {
        let mut config = Config::default();
        config.exclude_schemas = vec!["audit".to_string()];

        assert!(config.is_system_schema("pg_catalog"));
        assert!(config.is_system_schema("pg_temp_12"));
        assert!(config.is_system_schema("audit"));
        assert!(!config.is_system_schema("public"));
    }

    #[test]
    fn schema_predicate_escapes_quotes() {
        let mut config = Config::default();
        config.exclude_schemas = vec!["o'brien".to_string()];

        let predicate = config.user_schema_predicate("n.nspname");
        assert!(predicate.starts_with("n.nspname NOT LIKE 'pg_temp_%'"));
        assert!(predicate.contains("'o''brien'"));
        assert!(predicate.contains("'pg_catalog'"));
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }
}
