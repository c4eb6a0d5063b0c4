//! Object kinds, graph keys and the tagged object union

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::object::{
    Aggregate, Cast, Conversion, Function, Oid, ProceduralLanguage, ResourceQueue, Role,
    RoleMember, Tablespace, TypeDefinition,
};

/// Kind of catalog data being read or ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    SessionSettings,
    DatabaseSettings,
    ResourceQueue,
    Role,
    RoleMember,
    Tablespace,
    Language,
    Type,
    Conversion,
    Cast,
    Function,
    FunctionInfo,
    Aggregate,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionSettings => "session settings",
            Self::DatabaseSettings => "database settings",
            Self::ResourceQueue => "resource queue",
            Self::Role => "role",
            Self::RoleMember => "role member",
            Self::Tablespace => "tablespace",
            Self::Language => "language",
            Self::Type => "type",
            Self::Conversion => "conversion",
            Self::Cast => "cast",
            Self::Function => "function",
            Self::FunctionInfo => "function info",
            Self::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Node key in the dependency graph
///
/// Global objects are keyed by bare name, schema objects by qualified name,
/// functions and aggregates by qualified name plus identity arguments, and
/// the unnamed kinds by the pair that identifies them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ObjectKey {
    ResourceQueue(String),
    Role(String),
    RoleMember { role: String, member: String },
    Tablespace(String),
    Language(String),
    Type(String),
    Conversion(String),
    Cast { source: String, target: String },
    Function(String),
    Aggregate(String),
}

impl ObjectKey {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::ResourceQueue(_) => ObjectKind::ResourceQueue,
            Self::Role(_) => ObjectKind::Role,
            Self::RoleMember { .. } => ObjectKind::RoleMember,
            Self::Tablespace(_) => ObjectKind::Tablespace,
            Self::Language(_) => ObjectKind::Language,
            Self::Type(_) => ObjectKind::Type,
            Self::Conversion(_) => ObjectKind::Conversion,
            Self::Cast { .. } => ObjectKind::Cast,
            Self::Function(_) => ObjectKind::Function,
            Self::Aggregate(_) => ObjectKind::Aggregate,
        }
    }

    /// The name dependency lists use to refer to this object, if any
    pub fn qualified_name(&self) -> Option<&str> {
        match self {
            Self::Type(name) | Self::Function(name) | Self::Aggregate(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoleMember { role, member } => write!(f, "role member {} -> {}", role, member),
            Self::Cast { source, target } => write!(f, "cast ({} AS {})", source, target),
            Self::ResourceQueue(name)
            | Self::Role(name)
            | Self::Tablespace(name)
            | Self::Language(name)
            | Self::Type(name)
            | Self::Conversion(name)
            | Self::Function(name)
            | Self::Aggregate(name) => write!(f, "{} {}", self.kind(), name),
        }
    }
}

/// One catalog object of any kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogObject {
    ResourceQueue(ResourceQueue),
    Role(Role),
    RoleMember(RoleMember),
    Tablespace(Tablespace),
    Language(ProceduralLanguage),
    Type(TypeDefinition),
    Conversion(Conversion),
    Cast(Cast),
    Function(Function),
    Aggregate(Aggregate),
}

impl CatalogObject {
    pub fn key(&self) -> ObjectKey {
        match self {
            Self::ResourceQueue(queue) => queue.key(),
            Self::Role(role) => role.key(),
            Self::RoleMember(member) => member.key(),
            Self::Tablespace(tablespace) => tablespace.key(),
            Self::Language(language) => language.key(),
            Self::Type(ty) => ty.key(),
            Self::Conversion(conversion) => conversion.key(),
            Self::Cast(cast) => cast.key(),
            Self::Function(function) => function.key(),
            Self::Aggregate(aggregate) => aggregate.key(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.key().kind()
    }

    /// Catalog identifier; role membership edges have none
    pub fn oid(&self) -> Oid {
        match self {
            Self::ResourceQueue(queue) => queue.oid,
            Self::Role(role) => role.oid,
            Self::RoleMember(_) => 0,
            Self::Tablespace(tablespace) => tablespace.oid,
            Self::Language(language) => language.oid,
            Self::Type(ty) => ty.oid,
            Self::Conversion(conversion) => conversion.oid,
            Self::Cast(cast) => cast.oid,
            Self::Function(function) => function.oid,
            Self::Aggregate(aggregate) => aggregate.oid,
        }
    }

    /// Extracted (non-structural) dependencies
    pub fn depends_upon(&self) -> &[String] {
        match self {
            Self::Function(function) => &function.depends_upon,
            Self::Aggregate(aggregate) => &aggregate.depends_upon,
            _ => &[],
        }
    }
}
