//! Snapshot assembly

use catsnap_core::{CatalogContents, CatalogObject, Config, ObjectKey, SessionGucs};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::info;

use crate::dag::{graph_objects, DependencyGraph, GraphError, Sequence};
use crate::dependencies::extract_dependencies;
use crate::resolver::NameResolver;

/// Every extracted object in dependency order, plus the cycle report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub session_gucs: SessionGucs,
    pub database_gucs: Vec<String>,
    pub objects: Vec<CatalogObject>,
    pub cycles: Vec<Vec<ObjectKey>>,
}

impl MetadataSnapshot {
    /// Resolve dependencies for `contents`, order its objects and compose
    /// the snapshot
    pub fn assemble(mut contents: CatalogContents, config: &Config) -> Result<Self, GraphError> {
        let resolver = NameResolver::build(&contents);
        extract_dependencies(&mut contents, &resolver, config);

        let objects = graph_objects(&contents);
        let sequence = DependencyGraph::build(&objects, &resolver)?.sequence();

        let snapshot = Self::compose(contents.session_gucs, contents.database_gucs, objects, sequence);
        info!(
            objects = snapshot.objects.len(),
            cycles = snapshot.cycles.len(),
            "assembled snapshot"
        );
        Ok(snapshot)
    }

    /// Arrange `objects` in `sequence` order
    pub fn compose(
        session_gucs: SessionGucs,
        database_gucs: Vec<String>,
        objects: Vec<CatalogObject>,
        sequence: Sequence,
    ) -> Self {
        let mut by_key: HashMap<ObjectKey, CatalogObject> =
            objects.into_iter().map(|object| (object.key(), object)).collect();

        let objects = sequence
            .order
            .iter()
            .filter_map(|key| by_key.remove(key))
            .collect();

        Self {
            session_gucs,
            database_gucs,
            objects,
            cycles: sequence.cycles,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn position(&self, key: &ObjectKey) -> Option<usize> {
        self.objects.iter().position(|object| &object.key() == key)
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&CatalogObject> {
        self.objects.iter().find(|object| &object.key() == key)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// SHA-256 of the compact JSON encoding
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}
