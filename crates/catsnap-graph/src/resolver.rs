//! Identifier to name resolution
//!
//! The resolver is built once per extraction from the catalog contents and
//! is read-only afterwards, so dependency extraction can share it across
//! threads. It indexes every type and every function (built-ins included)
//! plus the remaining identified objects.

use catsnap_core::{CatalogContents, ObjectKey, ObjectKind, Oid, qualify};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Schema whose objects need no qualification when unambiguous
const DEFAULT_SCHEMA: &str = "pg_catalog";

/// An identified catalog object as seen by the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogObjectRef {
    pub oid: Oid,
    pub kind: ObjectKind,

    /// Empty for global objects and casts
    pub schema: String,
    pub name: String,
    pub key: ObjectKey,

    /// Belongs to the engine rather than a user
    pub is_builtin: bool,

    /// Emitted as an object of the snapshot
    pub extracted: bool,
}

impl CatalogObjectRef {
    pub fn qualified_name(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            qualify(&self.schema, &self.name)
        }
    }

    /// Name to record in a dependency list, if this object can be one
    pub fn dependency_name(&self) -> Option<&str> {
        if self.extracted {
            self.key.qualified_name()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Unknown reference to object {oid}")]
    UnknownReference { oid: Oid },
}

/// Reverse index from identifiers to objects, and from names back
#[derive(Debug, Default)]
pub struct NameResolver {
    by_oid: HashMap<Oid, CatalogObjectRef>,
    by_key: HashMap<ObjectKey, Oid>,

    /// (schema, name) -> type identifiers
    types: HashMap<(String, String), Vec<Oid>>,

    /// (schema, name) -> function and aggregate identifiers, one per overload
    functions: HashMap<(String, String), Vec<Oid>>,

    /// (kind, bare name) -> schemas defining it
    schemas: HashMap<(ObjectKind, String), HashSet<String>>,
}

impl NameResolver {
    /// Index everything `contents` identifies
    pub fn build(contents: &CatalogContents) -> Self {
        let mut resolver = Self::default();

        for ty in &contents.types {
            resolver.insert(CatalogObjectRef {
                oid: ty.oid,
                kind: ObjectKind::Type,
                schema: ty.schema.clone(),
                name: ty.name.clone(),
                key: ty.key(),
                is_builtin: ty.is_builtin,
                extracted: ty.is_user_defined(),
            });
        }

        let functions: HashSet<Oid> = contents.functions.iter().map(|f| f.oid).collect();
        let aggregates: HashSet<Oid> = contents.aggregates.iter().map(|a| a.oid).collect();

        for info in contents.function_info.values() {
            let (kind, key, extracted) = if aggregates.contains(&info.oid) {
                (ObjectKind::Aggregate, ObjectKey::Aggregate(info.signature()), true)
            } else {
                let extracted = functions.contains(&info.oid);
                (ObjectKind::Function, ObjectKey::Function(info.signature()), extracted)
            };

            resolver.insert(CatalogObjectRef {
                oid: info.oid,
                kind,
                schema: info.schema.clone(),
                name: info.name.clone(),
                key,
                is_builtin: info.is_internal,
                extracted,
            });
        }

        for language in &contents.languages {
            resolver.insert(global(language.oid, ObjectKind::Language, &language.name, language.key()));
        }
        for queue in &contents.resource_queues {
            resolver.insert(global(queue.oid, ObjectKind::ResourceQueue, &queue.name, queue.key()));
        }
        for role in &contents.roles {
            resolver.insert(global(role.oid, ObjectKind::Role, &role.name, role.key()));
        }
        for tablespace in &contents.tablespaces {
            resolver.insert(global(tablespace.oid, ObjectKind::Tablespace, &tablespace.name, tablespace.key()));
        }
        for conversion in &contents.conversions {
            resolver.insert(CatalogObjectRef {
                oid: conversion.oid,
                kind: ObjectKind::Conversion,
                schema: conversion.schema.clone(),
                name: conversion.name.clone(),
                key: conversion.key(),
                is_builtin: false,
                extracted: true,
            });
        }
        for cast in &contents.casts {
            let key = cast.key();
            resolver.insert(CatalogObjectRef {
                oid: cast.oid,
                kind: ObjectKind::Cast,
                schema: String::new(),
                name: format!("({} AS {})", cast.source_type, cast.target_type),
                key,
                is_builtin: false,
                extracted: true,
            });
        }

        debug!(objects = resolver.by_oid.len(), "built name resolver");
        resolver
    }

    fn insert(&mut self, object: CatalogObjectRef) {
        if object.oid == 0 {
            return;
        }
        if let Some(existing) = self.by_oid.get(&object.oid) {
            debug!(oid = object.oid, kept = %existing.key, dropped = %object.key, "duplicate identifier");
            return;
        }

        let name_key = (object.schema.clone(), object.name.clone());
        match object.kind {
            ObjectKind::Type => self.types.entry(name_key).or_default().push(object.oid),
            ObjectKind::Function | ObjectKind::Aggregate => {
                self.functions.entry(name_key).or_default().push(object.oid)
            }
            _ => {}
        }

        self.schemas
            .entry((display_class(object.kind), object.name.clone()))
            .or_default()
            .insert(object.schema.clone());
        self.by_key.insert(object.key.clone(), object.oid);
        self.by_oid.insert(object.oid, object);
    }

    pub fn len(&self) -> usize {
        self.by_oid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_oid.is_empty()
    }

    /// Resolve an identifier
    ///
    /// Zero means "not applicable" and resolves to `None`; an identifier the
    /// index has never seen is an [`ResolveError::UnknownReference`].
    pub fn resolve(&self, oid: Oid) -> Result<Option<&CatalogObjectRef>, ResolveError> {
        if oid == 0 {
            return Ok(None);
        }

        self.by_oid
            .get(&oid)
            .map(Some)
            .ok_or(ResolveError::UnknownReference { oid })
    }

    /// Identifier of the object with `key`
    pub fn oid_of(&self, key: &ObjectKey) -> Option<Oid> {
        self.by_key.get(key).copied()
    }

    /// Name for display; default-schema objects drop their schema when no
    /// other schema defines the same name
    pub fn display_name(&self, oid: Oid) -> Result<Option<String>, ResolveError> {
        let Some(object) = self.resolve(oid)? else {
            return Ok(None);
        };

        if object.schema == DEFAULT_SCHEMA {
            let unambiguous = self
                .schemas
                .get(&(display_class(object.kind), object.name.clone()))
                .map_or(true, |schemas| schemas.len() == 1);
            if unambiguous {
                return Ok(Some(object.name.clone()));
            }
        }

        Ok(Some(object.qualified_name()))
    }

    /// Find the type a name in SQL text refers to
    ///
    /// Unqualified names search the default schema first, then
    /// `search_path`; the first schema defining the type wins.
    pub fn lookup_type(&self, schema: Option<&str>, name: &str, search_path: &[String]) -> Option<&CatalogObjectRef> {
        search_schemas(schema, search_path)
            .into_iter()
            .find_map(|schema| self.types.get(&(schema.to_string(), name.to_string())))
            .and_then(|oids| oids.first())
            .and_then(|oid| self.by_oid.get(oid))
    }

    /// Find the function a call in SQL text refers to
    ///
    /// Searches like [`NameResolver::lookup_type`]. A name only resolves
    /// when the first schema defining it has a single overload.
    pub fn lookup_function(
        &self,
        schema: Option<&str>,
        name: &str,
        search_path: &[String],
    ) -> Option<&CatalogObjectRef> {
        for schema in search_schemas(schema, search_path) {
            match self
                .functions
                .get(&(schema.to_string(), name.to_string()))
                .map(Vec::as_slice)
            {
                Some([oid]) => return self.by_oid.get(oid),
                Some([]) | None => continue,
                Some(overloads) => {
                    debug!(schema, name, overloads = overloads.len(), "ambiguous function reference");
                    return None;
                }
            }
        }

        None
    }
}

fn search_schemas<'a>(schema: Option<&'a str>, search_path: &'a [String]) -> Vec<&'a str> {
    match schema {
        Some(schema) => vec![schema],
        None => std::iter::once(DEFAULT_SCHEMA)
            .chain(search_path.iter().map(String::as_str))
            .collect(),
    }
}

fn global(oid: Oid, kind: ObjectKind, name: &str, key: ObjectKey) -> CatalogObjectRef {
    CatalogObjectRef {
        oid,
        kind,
        schema: String::new(),
        name: name.to_string(),
        key,
        is_builtin: false,
        extracted: true,
    }
}

/// Aggregates share the function namespace
fn display_class(kind: ObjectKind) -> ObjectKind {
    match kind {
        ObjectKind::Aggregate => ObjectKind::Function,
        other => other,
    }
}
