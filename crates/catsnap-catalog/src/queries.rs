//! Catalog query text
//!
//! Every query starts with a `/* catsnap:<tag> */` marker so sessions can be
//! traced (and mocked) per query. Column aliases are the names the decoders
//! in `reader` read back. Identifiers are cast to `bigint` and single-letter
//! codes to `text` so every column maps onto a plain row value.

use catsnap_core::{CatalogVersion, Config, ObjectKind};

/// The catalog queries issued during one extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CatalogQuery {
    SessionGucs,
    DatabaseGucs,
    ResourceQueues,
    Roles,
    TimeConstraints,
    RoleMembers,
    Tablespaces,
    Languages,
    Types,
    Conversions,
    Casts,
    Functions,
    FunctionInfo,
    Aggregates,
    OidLookup,
}

impl CatalogQuery {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::SessionGucs => "catsnap:session_gucs",
            Self::DatabaseGucs => "catsnap:database_gucs",
            Self::ResourceQueues => "catsnap:resource_queues",
            Self::Roles => "catsnap:roles",
            Self::TimeConstraints => "catsnap:time_constraints",
            Self::RoleMembers => "catsnap:role_members",
            Self::Tablespaces => "catsnap:tablespaces",
            Self::Languages => "catsnap:languages",
            Self::Types => "catsnap:types",
            Self::Conversions => "catsnap:conversions",
            Self::Casts => "catsnap:casts",
            Self::Functions => "catsnap:functions",
            Self::FunctionInfo => "catsnap:function_info",
            Self::Aggregates => "catsnap:aggregates",
            Self::OidLookup => "catsnap:oid_lookup",
        }
    }

    /// Find the query a piece of SQL was generated from
    pub fn from_sql(sql: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|query| {
            sql.contains(&format!("/* {} */", query.tag()))
        })
    }

    pub const ALL: [CatalogQuery; 15] = [
        Self::SessionGucs,
        Self::DatabaseGucs,
        Self::ResourceQueues,
        Self::Roles,
        Self::TimeConstraints,
        Self::RoleMembers,
        Self::Tablespaces,
        Self::Languages,
        Self::Types,
        Self::Conversions,
        Self::Casts,
        Self::Functions,
        Self::FunctionInfo,
        Self::Aggregates,
        Self::OidLookup,
    ];

    /// Query text for the configured catalog version
    pub fn sql(&self, config: &Config) -> String {
        let body = match self {
            Self::SessionGucs => session_gucs(config.catalog_version),
            Self::DatabaseGucs => database_gucs(config.catalog_version).to_string(),
            Self::ResourceQueues => RESOURCE_QUEUES.to_string(),
            Self::Roles => ROLES.to_string(),
            Self::TimeConstraints => TIME_CONSTRAINTS.to_string(),
            Self::RoleMembers => ROLE_MEMBERS.to_string(),
            Self::Tablespaces => tablespaces(config.catalog_version).to_string(),
            Self::Languages => LANGUAGES.to_string(),
            Self::Types => TYPES.to_string(),
            Self::Conversions => conversions(config),
            Self::Casts => casts(config),
            Self::Functions => functions(config),
            Self::FunctionInfo => FUNCTION_INFO.to_string(),
            Self::Aggregates => aggregates(config),
            Self::OidLookup => String::new(),
        };

        tagged(*self, &body)
    }
}

fn tagged(query: CatalogQuery, body: &str) -> String {
    format!("/* {} */\n{}", query.tag(), body.trim())
}

/// Quote a string literal
fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn session_gucs(version: CatalogVersion) -> String {
    // default_with_oids is gone from newer servers; missing_ok needs 9.6+
    let default_with_oids = match version {
        CatalogVersion::Gpdb5 => "current_setting('default_with_oids')",
        CatalogVersion::Gpdb6 => "COALESCE(current_setting('default_with_oids', true), 'off')",
    };

    format!(
        r#"
SELECT
    current_setting('client_encoding') AS client_encoding,
    current_setting('standard_conforming_strings') AS std_conforming_strings,
    {} AS default_with_oids
"#,
        default_with_oids
    )
}

fn database_gucs(version: CatalogVersion) -> &'static str {
    match version {
        CatalogVersion::Gpdb5 => {
            r#"
SELECT unnest(d.datconfig)::text AS setting
FROM pg_database d
WHERE d.datname = current_database()
"#
        }
        CatalogVersion::Gpdb6 => {
            r#"
SELECT unnest(s.setconfig)::text AS setting
FROM pg_db_role_setting s
JOIN pg_database d ON d.oid = s.setdatabase
WHERE d.datname = current_database()
  AND s.setrole = 0
"#
        }
    }
}

const RESOURCE_QUEUES: &str = r#"
SELECT
    r.oid::bigint AS oid,
    r.rsqname::text AS name,
    r.rsqcountlimit::bigint AS active_statements,
    r.rsqcostlimit::float8 AS max_cost,
    r.rsqovercommit AS cost_overcommit,
    r.rsqignorecostlimit::float8 AS min_cost,
    priority.ressetting::text AS priority,
    memory.ressetting::text AS memory_limit
FROM pg_resqueue r
LEFT JOIN (
    SELECT c.resqueueid, c.ressetting
    FROM pg_resqueuecapability c
    JOIN pg_resourcetype t ON t.restypid = c.restypid
    WHERE t.resname = 'priority'
) priority ON priority.resqueueid = r.oid
LEFT JOIN (
    SELECT c.resqueueid, c.ressetting
    FROM pg_resqueuecapability c
    JOIN pg_resourcetype t ON t.restypid = c.restypid
    WHERE t.resname = 'memory_limit'
) memory ON memory.resqueueid = r.oid
ORDER BY r.rsqname, r.oid
"#;

const ROLES: &str = r#"
SELECT
    r.oid::bigint AS oid,
    r.rolname::text AS name,
    r.rolsuper AS super_user,
    r.rolinherit AS inherit,
    r.rolcreaterole AS create_role,
    r.rolcreatedb AS create_db,
    r.rolcanlogin AS can_login,
    r.rolconnlimit::bigint AS connection_limit,
    r.rolpassword::text AS password,
    CASE
        WHEN r.rolvaliduntil IS NULL THEN NULL
        WHEN r.rolvaliduntil = 'infinity'::timestamptz THEN 'infinity'
        ELSE timezone('UTC', r.rolvaliduntil)::text || '-00'
    END AS valid_until,
    q.rsqname::text AS res_queue,
    r.rolcreaterexthttp AS create_read_ext_http,
    r.rolcreaterextgpfd AS create_read_ext_gpfdist,
    r.rolcreatewextgpfd AS create_write_ext_gpfdist,
    r.rolcreaterexthdfs AS create_read_ext_hdfs,
    r.rolcreatewexthdfs AS create_write_ext_hdfs
FROM pg_authid r
LEFT JOIN pg_resqueue q ON q.oid = r.rolresqueue
WHERE r.rolname !~ '^pg_'
ORDER BY r.rolname, r.oid
"#;

// Windows have no sequence column, so physical position stands in for
// insertion order. A VACUUM FULL of the catalog can still reorder them.
// Grouping per role happens after the fetch.
const TIME_CONSTRAINTS: &str = r#"
SELECT
    c.authid::bigint AS role_oid,
    c.start_day::bigint AS start_day,
    c.start_time::text AS start_time,
    c.end_day::bigint AS end_day,
    c.end_time::text AS end_time
FROM pg_auth_time_constraint c
ORDER BY c.ctid
"#;

const ROLE_MEMBERS: &str = r#"
SELECT
    pg_get_userbyid(m.roleid)::text AS role,
    pg_get_userbyid(m.member)::text AS member,
    pg_get_userbyid(m.grantor)::text AS grantor,
    m.admin_option AS admin_option
FROM pg_auth_members m
WHERE pg_get_userbyid(m.roleid) !~ '^pg_'
  AND pg_get_userbyid(m.member) !~ '^pg_'
ORDER BY 1, 2, 3
"#;

fn tablespaces(version: CatalogVersion) -> &'static str {
    match version {
        CatalogVersion::Gpdb5 => {
            r#"
SELECT
    t.oid::bigint AS oid,
    t.spcname::text AS name,
    f.fsname::text AS location
FROM pg_tablespace t
JOIN pg_filespace f ON f.oid = t.spcfsoid
WHERE t.spcname NOT IN ('pg_default', 'pg_global')
ORDER BY t.spcname, t.oid
"#
        }
        CatalogVersion::Gpdb6 => {
            r#"
SELECT
    t.oid::bigint AS oid,
    t.spcname::text AS name,
    pg_tablespace_location(t.oid)::text AS location
FROM pg_tablespace t
WHERE t.spcname NOT IN ('pg_default', 'pg_global')
ORDER BY t.spcname, t.oid
"#
        }
    }
}

const LANGUAGES: &str = r#"
SELECT
    l.oid::bigint AS oid,
    l.lanname::text AS name,
    pg_get_userbyid(l.lanowner)::text AS owner,
    l.lanpltrusted AS trusted,
    l.lanispl AS procedural,
    l.lanplcallfoid::bigint AS handler_oid,
    l.laninline::bigint AS inline_oid,
    l.lanvalidator::bigint AS validator_oid
FROM pg_language l
WHERE l.lanispl
ORDER BY l.lanname, l.oid
"#;

// Array types are left out: references to them are a known gap.
const TYPES: &str = r#"
SELECT
    t.oid::bigint AS oid,
    n.nspname::text AS schema,
    t.typname::text AS name,
    t.typtype::text AS type_kind,
    t.typinput::oid::bigint AS input_oid,
    t.typoutput::oid::bigint AS output_oid,
    t.typreceive::oid::bigint AS receive_oid,
    t.typsend::oid::bigint AS send_oid,
    t.typbasetype::bigint AS base_type_oid,
    ARRAY(
        SELECT a.atttypid
        FROM pg_attribute a
        WHERE a.attrelid = t.typrelid AND a.attnum > 0 AND NOT a.attisdropped
        ORDER BY a.attnum
    )::oid[] AS attribute_type_oids,
    COALESCE(t.typrelid <> 0 AND c.relkind <> 'c', false) AS is_table_rowtype
FROM pg_type t
JOIN pg_namespace n ON n.oid = t.typnamespace
LEFT JOIN pg_class c ON c.oid = t.typrelid
WHERE NOT (t.typelem <> 0 AND t.typlen = -1)
ORDER BY n.nspname, t.typname, t.oid
"#;

fn conversions(config: &Config) -> String {
    format!(
        r#"
SELECT
    c.oid::bigint AS oid,
    n.nspname::text AS schema,
    c.conname::text AS name,
    pg_encoding_to_char(c.conforencoding)::text AS for_encoding,
    pg_encoding_to_char(c.contoencoding)::text AS to_encoding,
    fn.nspname::text || '.' || p.proname::text AS conversion_function,
    c.conproc::oid::bigint AS conversion_function_oid,
    c.condefault AS is_default
FROM pg_conversion c
JOIN pg_namespace n ON n.oid = c.connamespace
JOIN pg_proc p ON p.oid = c.conproc
JOIN pg_namespace fn ON fn.oid = p.pronamespace
WHERE {}
ORDER BY n.nspname, c.conname, c.oid
"#,
        config.user_schema_predicate("n.nspname")
    )
}

fn casts(config: &Config) -> String {
    format!(
        r#"
SELECT
    c.oid::bigint AS oid,
    sn.nspname::text || '.' || st.typname::text AS source_type,
    tn.nspname::text || '.' || tt.typname::text AS target_type,
    c.castsource::bigint AS source_type_oid,
    c.casttarget::bigint AS target_type_oid,
    COALESCE(fn.nspname::text, '') AS function_schema,
    COALESCE(p.proname::text, '') AS function_name,
    COALESCE(pg_get_function_arguments(p.oid), '') AS function_args,
    c.castfunc::bigint AS function_oid,
    c.castcontext::text AS context
FROM pg_cast c
JOIN pg_type st ON st.oid = c.castsource
JOIN pg_namespace sn ON sn.oid = st.typnamespace
JOIN pg_type tt ON tt.oid = c.casttarget
JOIN pg_namespace tn ON tn.oid = tt.typnamespace
LEFT JOIN pg_proc p ON p.oid = c.castfunc
LEFT JOIN pg_namespace fn ON fn.oid = p.pronamespace
WHERE ({}) OR ({}) OR (fn.nspname IS NOT NULL AND {})
ORDER BY 2, 3, 1
"#,
        config.user_schema_predicate("sn.nspname"),
        config.user_schema_predicate("tn.nspname"),
        config.user_schema_predicate("fn.nspname")
    )
}

fn functions(config: &Config) -> String {
    format!(
        r#"
SELECT
    p.oid::bigint AS oid,
    n.nspname::text AS schema,
    p.proname::text AS name,
    p.proretset AS returns_set,
    p.prosrc::text AS source,
    p.probin::text AS binary_path,
    pg_get_function_arguments(p.oid) AS arguments,
    pg_get_function_identity_arguments(p.oid) AS identity_arguments,
    pg_get_function_result(p.oid) AS result_type,
    COALESCE(p.proallargtypes, p.proargtypes::oid[]) AS argument_type_oids,
    p.prorettype::bigint AS result_type_oid,
    p.provolatile::text AS volatility,
    p.proisstrict AS is_strict,
    p.prosecdef AS is_security_definer,
    p.proconfig AS config,
    p.procost::float8 AS cost,
    p.prorows::bigint AS num_rows,
    p.prodataaccess::text AS data_access,
    l.lanname::text AS language
FROM pg_proc p
JOIN pg_namespace n ON n.oid = p.pronamespace
JOIN pg_language l ON l.oid = p.prolang
WHERE {} AND NOT p.proisagg
ORDER BY n.nspname, p.proname, p.oid
"#,
        config.user_schema_predicate("n.nspname")
    )
}

// Every function, built-ins included; schema decides internal vs user.
const FUNCTION_INFO: &str = r#"
SELECT
    p.oid::bigint AS oid,
    n.nspname::text AS schema,
    p.proname::text AS name,
    pg_get_function_arguments(p.oid) AS arguments,
    pg_get_function_identity_arguments(p.oid) AS identity_arguments
FROM pg_proc p
JOIN pg_namespace n ON n.oid = p.pronamespace
ORDER BY p.oid
"#;

fn aggregates(config: &Config) -> String {
    let (preliminary, ordered) = match config.catalog_version {
        CatalogVersion::Gpdb5 => ("a.aggprelimfn", "a.aggordered"),
        CatalogVersion::Gpdb6 => ("a.aggcombinefn", "(a.aggkind = 'o')"),
    };

    format!(
        r#"
SELECT
    p.oid::bigint AS oid,
    n.nspname::text AS schema,
    p.proname::text AS name,
    pg_get_function_arguments(p.oid) AS arguments,
    pg_get_function_identity_arguments(p.oid) AS identity_arguments,
    p.proargtypes::oid[] AS argument_type_oids,
    a.aggtransfn::oid::bigint AS transition_function,
    {}::oid::bigint AS preliminary_function,
    a.aggfinalfn::oid::bigint AS final_function,
    a.aggsortop::bigint AS sort_operator,
    format_type(a.aggtranstype, NULL) AS transition_data_type,
    a.aggtranstype::bigint AS transition_type_oid,
    a.agginitval::text AS initial_value,
    {} AS is_ordered
FROM pg_aggregate a
JOIN pg_proc p ON p.oid = a.aggfnoid
JOIN pg_namespace n ON n.oid = p.pronamespace
WHERE {}
ORDER BY n.nspname, p.proname, p.oid
"#,
        preliminary,
        ordered,
        config.user_schema_predicate("n.nspname")
    )
}

/// Identifier lookup for a named object, `None` for kinds without one name
pub fn oid_lookup(kind: ObjectKind, schema: &str, name: &str) -> Option<String> {
    let name = literal(name);
    let schema = literal(schema);

    let body = match kind {
        ObjectKind::Role => format!("SELECT oid::bigint AS oid FROM pg_authid WHERE rolname = {}", name),
        ObjectKind::ResourceQueue => {
            format!("SELECT oid::bigint AS oid FROM pg_resqueue WHERE rsqname = {}", name)
        }
        ObjectKind::Tablespace => {
            format!("SELECT oid::bigint AS oid FROM pg_tablespace WHERE spcname = {}", name)
        }
        ObjectKind::Language => {
            format!("SELECT oid::bigint AS oid FROM pg_language WHERE lanname = {}", name)
        }
        ObjectKind::Type => format!(
            "SELECT t.oid::bigint AS oid FROM pg_type t JOIN pg_namespace n ON n.oid = t.typnamespace \
             WHERE n.nspname = {} AND t.typname = {}",
            schema, name
        ),
        ObjectKind::Conversion => format!(
            "SELECT c.oid::bigint AS oid FROM pg_conversion c JOIN pg_namespace n ON n.oid = c.connamespace \
             WHERE n.nspname = {} AND c.conname = {}",
            schema, name
        ),
        ObjectKind::Function | ObjectKind::FunctionInfo | ObjectKind::Aggregate => format!(
            "SELECT p.oid::bigint AS oid FROM pg_proc p JOIN pg_namespace n ON n.oid = p.pronamespace \
             WHERE n.nspname = {} AND p.proname = {} ORDER BY p.oid LIMIT 1",
            schema, name
        ),
        ObjectKind::SessionSettings
        | ObjectKind::DatabaseSettings
        | ObjectKind::RoleMember
        | ObjectKind::Cast => return None,
    };

    Some(tagged(CatalogQuery::OidLookup, &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_query_is_tagged() {
        let config = Config::default();
        for query in CatalogQuery::ALL {
            if query == CatalogQuery::OidLookup {
                continue;
            }
            let sql = query.sql(&config);
            assert_eq!(CatalogQuery::from_sql(&sql), Some(query), "{}", sql);
        }
    }

    #[test]
    fn version_gated_queries_differ() {
        let gpdb5 = Config { catalog_version: CatalogVersion::Gpdb5, ..Config::default() };
        let gpdb6 = Config::default();

        assert!(CatalogQuery::Tablespaces.sql(&gpdb5).contains("pg_filespace"));
        assert!(CatalogQuery::Tablespaces.sql(&gpdb6).contains("pg_tablespace_location"));
        assert!(CatalogQuery::Aggregates.sql(&gpdb5).contains("aggprelimfn"));
        assert!(CatalogQuery::Aggregates.sql(&gpdb6).contains("aggkind = 'o'"));
        assert!(CatalogQuery::DatabaseGucs.sql(&gpdb5).contains("datconfig"));
        assert!(CatalogQuery::DatabaseGucs.sql(&gpdb6).contains("pg_db_role_setting"));
    }

    #[test]
    fn time_constraints_have_explicit_order() {
        let sql = CatalogQuery::TimeConstraints.sql(&Config::default());
        assert!(sql.contains("ORDER BY c.ctid"));
    }

    #[test]
    fn types_read_component_types() {
        let sql = CatalogQuery::Types.sql(&Config::default());
        assert!(sql.contains("t.typbasetype::bigint AS base_type_oid"));
        assert!(sql.contains("AS attribute_type_oids"));
    }

    #[test]
    fn user_schema_filter_applied() {
        let sql = CatalogQuery::Functions.sql(&Config::default());
        assert!(sql.contains("n.nspname NOT IN ("));
        assert!(sql.contains("NOT p.proisagg"));
    }

    #[test]
    fn oid_lookup_quotes_names() {
        let sql = oid_lookup(ObjectKind::Function, "public", "o'clock").unwrap();
        assert!(sql.contains("p.proname = 'o''clock'"));
        assert_eq!(CatalogQuery::from_sql(&sql), Some(CatalogQuery::OidLookup));
        assert!(oid_lookup(ObjectKind::Cast, "", "x").is_none());
    }
}
