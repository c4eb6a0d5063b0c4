//! Dependency resolution and ordering for extracted catalogs
//!
//! Turns the per-kind collections read from the catalog into one
//! dependency-ordered snapshot:
//!
//! 1. [`NameResolver`] indexes every identifier once per extraction
//! 2. [`dependencies`] fills each function's and aggregate's `depends_upon`
//! 3. [`DependencyGraph`] merges those with structural edges and orders the set
//! 4. [`MetadataSnapshot`] composes the ordered objects and the cycle report

pub mod resolver;
pub mod dependencies;
pub mod dag;
pub mod snapshot;

pub use resolver::{CatalogObjectRef, NameResolver, ResolveError};
pub use dependencies::extract_dependencies;
pub use dag::{graph_objects, DependencyGraph, GraphError, Sequence};
pub use snapshot::MetadataSnapshot;
