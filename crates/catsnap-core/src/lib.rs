//! catsnap core
//!
//! Typed model of the catalog objects captured by a metadata snapshot, the
//! keys used to order them, and the extraction configuration.
//! Serialized field names are part of the snapshot format; never rename them.

pub mod object;
pub mod key;
pub mod config;

pub use object::{
    Aggregate, CastContext, CatalogContents, Cast, Conversion, DataAccess, Function, FunctionInfo,
    Oid, ProceduralLanguage, QueuePriority, ResourceQueue, Role, RoleMember, SessionGucs,
    Tablespace, TimeConstraint, TypeDefinition, TypeKind, Volatility, qualify,
};
pub use key::{CatalogObject, ObjectKey, ObjectKind};
pub use config::{CatalogVersion, Config, ConfigError};
