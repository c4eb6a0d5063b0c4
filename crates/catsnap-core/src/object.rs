//! Catalog object records
//!
//! One record type per object kind. Records are built once by the catalog
//! reader and never mutated afterwards, except for the `depends_upon` lists
//! that the dependency extractor fills in before ordering.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::key::ObjectKey;

/// Catalog object identifier. Zero means "not set".
pub type Oid = u32;

/// Join a schema and an object name into a qualified name
pub fn qualify(schema: &str, name: &str) -> String {
    format!("{}.{}", schema, name)
}

/// A login-deny window attached to a role
///
/// Days use 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeConstraint {
    pub start_day: u8,
    pub start_time: String,
    pub end_day: u8,
    pub end_time: String,
}

/// A database role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub oid: Oid,
    pub name: String,
    pub super_user: bool,
    pub inherit: bool,
    pub create_role: bool,
    pub create_db: bool,
    pub can_login: bool,
    pub connection_limit: i64,

    /// Password hash, empty when unset
    pub password: String,

    /// Expiry timestamp as text, empty when unset
    pub valid_until: String,

    /// Name of the assigned resource queue
    pub res_queue: String,

    pub create_read_ext_http: bool,
    pub create_read_ext_gpfdist: bool,
    pub create_write_ext_gpfdist: bool,
    pub create_read_ext_hdfs: bool,
    pub create_write_ext_hdfs: bool,

    /// Login-deny windows in catalog insertion order
    pub time_constraints: Vec<TimeConstraint>,
}

impl Role {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::Role(self.name.clone())
    }
}

/// One membership grant edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMember {
    /// The group role being granted
    pub role: String,
    pub member: String,
    pub grantor: String,
    pub admin_option: bool,
}

impl RoleMember {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::RoleMember {
            role: self.role.clone(),
            member: self.member.clone(),
        }
    }
}

/// Resource queue priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueuePriority {
    Min,
    Low,
    #[default]
    Medium,
    High,
    Max,
}

impl QueuePriority {
    /// Parse a catalog priority setting, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "min" => Some(Self::Min),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Max => "max",
        }
    }
}

impl std::fmt::Display for QueuePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A workload-management resource queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQueue {
    pub oid: Oid,
    pub name: String,

    /// -1 means unlimited
    pub active_statements: i64,

    /// Two-decimal string, "-1.00" means unlimited
    pub max_cost: String,
    pub cost_overcommit: bool,
    pub min_cost: String,
    pub priority: QueuePriority,

    /// Free-form, "-1" means unlimited
    pub memory_limit: String,
}

impl ResourceQueue {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::ResourceQueue(self.name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tablespace {
    pub oid: Oid,
    pub name: String,

    /// Backing storage location (filespace name or directory)
    pub location: String,
}

impl Tablespace {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::Tablespace(self.name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProceduralLanguage {
    pub oid: Oid,
    pub name: String,
    pub owner: String,
    pub trusted: bool,
    pub procedural: bool,
    pub handler_oid: Oid,
    pub inline_oid: Oid,
    pub validator_oid: Oid,
}

impl ProceduralLanguage {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::Language(self.name.clone())
    }
}

/// `pg_type.typtype`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    #[serde(rename = "b")]
    Base,
    #[serde(rename = "c")]
    Composite,
    #[serde(rename = "d")]
    Domain,
    #[serde(rename = "e")]
    Enum,
    #[serde(rename = "p")]
    Pseudo,
    #[serde(rename = "r")]
    Range,
}

impl TypeKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "b" => Some(Self::Base),
            "c" => Some(Self::Composite),
            "d" => Some(Self::Domain),
            "e" => Some(Self::Enum),
            "p" => Some(Self::Pseudo),
            "r" => Some(Self::Range),
            _ => None,
        }
    }
}

/// A non-array type, built-in or user-defined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub oid: Oid,
    pub schema: String,
    pub name: String,
    pub type_kind: TypeKind,
    pub input_oid: Oid,
    pub output_oid: Oid,
    pub receive_oid: Oid,
    pub send_oid: Oid,

    /// Underlying type of a domain, 0 otherwise
    pub base_type_oid: Oid,

    /// Attribute types of a composite, in attribute order
    pub attribute_type_oids: Vec<Oid>,

    /// Row type of a table rather than a standalone type
    pub is_table_rowtype: bool,

    /// Lives in a system schema
    pub is_builtin: bool,
}

impl TypeDefinition {
    pub fn qualified_name(&self) -> String {
        qualify(&self.schema, &self.name)
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::Type(self.qualified_name())
    }

    /// Whether this type is emitted as its own object
    pub fn is_user_defined(&self) -> bool {
        !self.is_builtin && !self.is_table_rowtype
    }

    /// I/O routines, skipping the unset ones
    pub fn io_functions(&self) -> impl Iterator<Item = Oid> + '_ {
        [self.input_oid, self.output_oid, self.receive_oid, self.send_oid]
            .into_iter()
            .filter(|oid| *oid != 0)
    }

    /// Types this type is built from: a domain's base type and a
    /// composite's attribute types
    pub fn component_types(&self) -> impl Iterator<Item = Oid> + '_ {
        std::iter::once(self.base_type_oid)
            .chain(self.attribute_type_oids.iter().copied())
            .filter(|oid| *oid != 0)
    }
}

/// A conversion between two encodings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub oid: Oid,
    pub schema: String,
    pub name: String,
    pub for_encoding: String,
    pub to_encoding: String,

    /// Qualified name of the conversion function
    pub conversion_function: String,
    pub conversion_function_oid: Oid,
    pub is_default: bool,
}

impl Conversion {
    pub fn qualified_name(&self) -> String {
        qualify(&self.schema, &self.name)
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::Conversion(self.qualified_name())
    }
}

/// `pg_cast.castcontext`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastContext {
    #[serde(rename = "a")]
    Assignment,
    #[serde(rename = "i")]
    Implicit,
    #[serde(rename = "e")]
    Explicit,
}

impl CastContext {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(Self::Assignment),
            "i" => Some(Self::Implicit),
            "e" => Some(Self::Explicit),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Assignment => "a",
            Self::Implicit => "i",
            Self::Explicit => "e",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cast {
    pub oid: Oid,
    pub source_type: String,
    pub target_type: String,
    pub source_type_oid: Oid,
    pub target_type_oid: Oid,

    /// Empty when the cast is declared WITHOUT FUNCTION
    pub function_schema: String,
    pub function_name: String,
    pub function_args: String,
    pub function_oid: Oid,
    pub context: CastContext,
}

impl Cast {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::Cast {
            source: self.source_type.clone(),
            target: self.target_type.clone(),
        }
    }

    pub fn has_function(&self) -> bool {
        self.function_oid != 0
    }
}

/// `pg_proc.provolatile`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Volatility {
    #[serde(rename = "i")]
    Immutable,
    #[serde(rename = "s")]
    Stable,
    #[serde(rename = "v")]
    Volatile,
}

impl Volatility {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "i" => Some(Self::Immutable),
            "s" => Some(Self::Stable),
            "v" => Some(Self::Volatile),
            _ => None,
        }
    }
}

/// `pg_proc.prodataaccess`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataAccess {
    #[serde(rename = "n")]
    NoSql,
    #[serde(rename = "c")]
    ContainsSql,
    #[serde(rename = "r")]
    ReadsSql,
    #[serde(rename = "m")]
    ModifiesSql,
}

impl DataAccess {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "n" => Some(Self::NoSql),
            "c" => Some(Self::ContainsSql),
            "r" => Some(Self::ReadsSql),
            "m" => Some(Self::ModifiesSql),
            _ => None,
        }
    }
}

/// A user-defined function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub oid: Oid,
    pub schema: String,
    pub name: String,
    pub returns_set: bool,

    /// Source text; empty for compiled languages
    pub body: String,

    /// Symbol inside `binary_path` for compiled languages
    pub link_symbol: String,

    /// Shared object path; empty unless the language links one
    pub binary_path: String,
    pub arguments: String,
    pub identity_arguments: String,
    pub result_type: String,
    pub argument_type_oids: Vec<Oid>,
    pub result_type_oid: Oid,
    pub volatility: Volatility,
    pub is_strict: bool,
    pub is_security_definer: bool,

    /// `SET name TO value` fragments
    pub config: String,
    pub cost: f64,
    pub num_rows: i64,
    pub data_access: DataAccess,
    pub language: String,

    /// Qualified names of the user objects this function references
    pub depends_upon: Vec<String>,
}

impl Function {
    /// Qualified name with identity arguments, unique across overloads
    pub fn signature(&self) -> String {
        format!("{}({})", qualify(&self.schema, &self.name), self.identity_arguments)
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::Function(self.signature())
    }

    pub fn is_sql(&self) -> bool {
        self.language.eq_ignore_ascii_case("sql")
    }
}

/// A user-defined aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub oid: Oid,
    pub schema: String,
    pub name: String,
    pub arguments: String,
    pub identity_arguments: String,
    pub argument_type_oids: Vec<Oid>,
    pub transition_function: Oid,

    /// Preliminary (combine) function, 0 when absent
    pub preliminary_function: Oid,
    pub final_function: Oid,
    pub sort_operator: Oid,
    pub transition_data_type: String,
    pub transition_type_oid: Oid,

    /// Initial condition as stored; `None` when absent
    pub initial_value: Option<String>,
    pub is_ordered: bool,
    pub depends_upon: Vec<String>,
}

impl Aggregate {
    pub fn signature(&self) -> String {
        format!("{}({})", qualify(&self.schema, &self.name), self.identity_arguments)
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::Aggregate(self.signature())
    }

    pub fn component_functions(&self) -> impl Iterator<Item = Oid> + '_ {
        [self.transition_function, self.preliminary_function, self.final_function]
            .into_iter()
            .filter(|oid| *oid != 0)
    }
}

/// Lookup entry for every function visible to the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub oid: Oid,
    pub schema: String,
    pub name: String,
    pub arguments: String,
    pub identity_arguments: String,

    /// Built into the engine rather than user-created
    pub is_internal: bool,
}

impl FunctionInfo {
    pub fn qualified_name(&self) -> String {
        qualify(&self.schema, &self.name)
    }

    pub fn signature(&self) -> String {
        format!("{}({})", self.qualified_name(), self.identity_arguments)
    }
}

/// Session-level settings captured alongside the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGucs {
    pub client_encoding: String,
    pub std_conforming_strings: String,
    pub default_with_oids: String,
}

impl Default for SessionGucs {
    fn default() -> Self {
        Self {
            client_encoding: "UTF8".to_string(),
            std_conforming_strings: "on".to_string(),
            default_with_oids: "off".to_string(),
        }
    }
}

/// Everything the catalog reader returns for one extraction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogContents {
    pub session_gucs: SessionGucs,

    /// `SET name TO value` strings sorted by setting name
    pub database_gucs: Vec<String>,
    pub resource_queues: Vec<ResourceQueue>,
    pub roles: Vec<Role>,
    pub role_members: Vec<RoleMember>,
    pub tablespaces: Vec<Tablespace>,
    pub languages: Vec<ProceduralLanguage>,

    /// Every non-array type, built-ins included
    pub types: Vec<TypeDefinition>,
    pub conversions: Vec<Conversion>,
    pub casts: Vec<Cast>,
    pub functions: Vec<Function>,
    pub aggregates: Vec<Aggregate>,

    /// Every visible function keyed by identifier, built-ins included
    pub function_info: BTreeMap<Oid, FunctionInfo>,
}
