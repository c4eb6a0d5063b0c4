//! Per-kind catalog readers
//!
//! Each `get_*` function issues the query for one object kind on the given
//! session and decodes every row into its record. Decoding is strict: a
//! null where the record needs a value, or a code outside the known set,
//! fails the whole read with a decode error naming the column and object.

use catsnap_core::{
    Aggregate, CastContext, Cast, Config, Conversion, DataAccess, Function, FunctionInfo,
    ObjectKind, Oid, ProceduralLanguage, QueuePriority, ResourceQueue, Role, RoleMember,
    SessionGucs, Tablespace, TimeConstraint, TypeDefinition, TypeKind, Volatility,
};
use chrono::NaiveTime;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::adapter::{CatalogError, CatalogRow, CatalogSession};
use crate::extract::ExtractError;
use crate::queries::CatalogQuery;

/// Languages whose source text is a link symbol rather than a body
const COMPILED_LANGUAGES: &[&str] = &["c", "internal"];

async fn fetch(
    session: &dyn CatalogSession,
    config: &Config,
    kind: ObjectKind,
    query: CatalogQuery,
) -> Result<Vec<CatalogRow>, ExtractError> {
    let rows = session
        .query(&query.sql(config))
        .await
        .map_err(|source| ExtractError::Read { kind, source })?;

    debug!(kind = %kind, session = session.name(), rows = rows.len(), "read catalog rows");
    Ok(rows)
}

fn decode_all<T>(
    rows: &[CatalogRow],
    kind: ObjectKind,
    decode: impl Fn(&CatalogRow) -> Result<T, CatalogError>,
) -> Result<Vec<T>, ExtractError> {
    rows.iter()
        .map(|row| decode(row))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ExtractError::Read { kind, source })
}

/// Read the row identifier, then decode the rest with it attached to errors
fn with_row_oid<T>(
    row: &CatalogRow,
    decode: impl FnOnce(Oid) -> Result<T, CatalogError>,
) -> Result<T, CatalogError> {
    let oid = row.oid("oid")?;
    decode(oid).map_err(|e| e.with_oid(oid))
}

/// Format a cost limit the way resource queue DDL spells it
fn format_cost(value: f64) -> String {
    format!("{:.2}", value)
}

/// Normalize a catalog time of day to `HH:MM:SS`
///
/// `24:00:00` is a legal end-of-day value that `NaiveTime` cannot hold.
pub fn normalize_time(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value == "24:00:00" || value == "24:00" {
        return Ok("24:00:00".to_string());
    }

    const FORMATS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f", "%H:%M", "%I:%M %p", "%I:%M:%S %p"];
    FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
        .map(|time| time.format("%H:%M:%S").to_string())
        .ok_or_else(|| format!("unrecognized time of day {:?}", value))
}

fn day_of_week(row: &CatalogRow, column: &str) -> Result<u8, CatalogError> {
    let day = row.int(column)?;
    u8::try_from(day)
        .ok()
        .filter(|day| *day <= 6)
        .ok_or_else(|| CatalogError::decode(column, format!("day {} outside 0-6", day)))
}

fn time_of_day(row: &CatalogRow, column: &str) -> Result<String, CatalogError> {
    normalize_time(&row.text(column)?).map_err(|message| CatalogError::decode(column, message))
}

/// Turn `name=value` entries into `SET name TO value`
fn set_statement(entry: &str, column: &str) -> Result<(String, String), CatalogError> {
    let (name, value) = entry
        .split_once('=')
        .ok_or_else(|| CatalogError::decode(column, format!("malformed setting {:?}", entry)))?;

    Ok((name.to_string(), format!("SET {} TO {}", name, value)))
}

pub fn decode_session_gucs(row: &CatalogRow) -> Result<SessionGucs, CatalogError> {
    Ok(SessionGucs {
        client_encoding: row.text("client_encoding")?,
        std_conforming_strings: row.text("std_conforming_strings")?,
        default_with_oids: row.opt_text("default_with_oids")?.unwrap_or_else(|| "off".to_string()),
    })
}

pub async fn get_session_gucs(
    session: &dyn CatalogSession,
    config: &Config,
) -> Result<SessionGucs, ExtractError> {
    let kind = ObjectKind::SessionSettings;
    let rows = fetch(session, config, kind, CatalogQuery::SessionGucs).await?;
    let row = rows.first().ok_or_else(|| ExtractError::Read {
        kind,
        source: CatalogError::Query("session settings query returned no rows".to_string()),
    })?;

    decode_session_gucs(row).map_err(|source| ExtractError::Read { kind, source })
}

/// Database-level overrides as `SET` statements sorted by setting name
pub fn decode_database_gucs(rows: &[CatalogRow]) -> Result<Vec<String>, CatalogError> {
    let mut settings = rows
        .iter()
        .map(|row| set_statement(&row.text("setting")?, "setting"))
        .collect::<Result<Vec<_>, _>>()?;

    settings.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(settings.into_iter().map(|(_, statement)| statement).collect())
}

pub async fn get_database_gucs(
    session: &dyn CatalogSession,
    config: &Config,
) -> Result<Vec<String>, ExtractError> {
    let kind = ObjectKind::DatabaseSettings;
    let rows = fetch(session, config, kind, CatalogQuery::DatabaseGucs).await?;
    decode_database_gucs(&rows).map_err(|source| ExtractError::Read { kind, source })
}

pub fn decode_resource_queue(row: &CatalogRow) -> Result<ResourceQueue, CatalogError> {
    with_row_oid(row, |oid| {
        let priority = match row.opt_text("priority")? {
            None => QueuePriority::default(),
            Some(setting) => QueuePriority::parse(&setting).ok_or_else(|| {
                CatalogError::decode("priority", format!("unknown priority {:?}", setting))
            })?,
        };

        Ok(ResourceQueue {
            oid,
            name: row.text("name")?,
            active_statements: row.int("active_statements")?,
            max_cost: format_cost(row.float("max_cost")?),
            cost_overcommit: row.bool("cost_overcommit")?,
            min_cost: format_cost(row.float("min_cost")?),
            priority,
            memory_limit: row.opt_text("memory_limit")?.unwrap_or_else(|| "-1".to_string()),
        })
    })
}

pub async fn get_resource_queues(
    session: &dyn CatalogSession,
    config: &Config,
) -> Result<Vec<ResourceQueue>, ExtractError> {
    let kind = ObjectKind::ResourceQueue;
    let rows = fetch(session, config, kind, CatalogQuery::ResourceQueues).await?;
    decode_all(&rows, kind, decode_resource_queue)
}

/// Role without its time constraints
pub fn decode_role(row: &CatalogRow) -> Result<Role, CatalogError> {
    with_row_oid(row, |oid| {
        Ok(Role {
            oid,
            name: row.text("name")?,
            super_user: row.bool("super_user")?,
            inherit: row.bool("inherit")?,
            create_role: row.bool("create_role")?,
            create_db: row.bool("create_db")?,
            can_login: row.bool("can_login")?,
            connection_limit: row.int("connection_limit")?,
            password: row.text_or_empty("password")?,
            valid_until: row.text_or_empty("valid_until")?,
            res_queue: row.text_or_empty("res_queue")?,
            create_read_ext_http: row.bool("create_read_ext_http")?,
            create_read_ext_gpfdist: row.bool("create_read_ext_gpfdist")?,
            create_write_ext_gpfdist: row.bool("create_write_ext_gpfdist")?,
            create_read_ext_hdfs: row.bool("create_read_ext_hdfs")?,
            create_write_ext_hdfs: row.bool("create_write_ext_hdfs")?,
            time_constraints: Vec::new(),
        })
    })
}

/// Decode one constraint row, returning the owning role's identifier
pub fn decode_time_constraint(row: &CatalogRow) -> Result<(Oid, TimeConstraint), CatalogError> {
    let role_oid = row.oid("role_oid")?;
    let constraint = TimeConstraint {
        start_day: day_of_week(row, "start_day")?,
        start_time: time_of_day(row, "start_time")?,
        end_day: day_of_week(row, "end_day")?,
        end_time: time_of_day(row, "end_time")?,
    };

    Ok((role_oid, constraint))
}

pub async fn get_roles(
    session: &dyn CatalogSession,
    config: &Config,
) -> Result<Vec<Role>, ExtractError> {
    let kind = ObjectKind::Role;
    let role_rows = fetch(session, config, kind, CatalogQuery::Roles).await?;
    let constraint_rows = fetch(session, config, kind, CatalogQuery::TimeConstraints).await?;

    let mut roles = decode_all(&role_rows, kind, decode_role)?;

    // Grouping keeps the fetched order within each role
    let mut constraints: HashMap<Oid, Vec<TimeConstraint>> = HashMap::new();
    for (role_oid, constraint) in decode_all(&constraint_rows, kind, decode_time_constraint)? {
        constraints.entry(role_oid).or_default().push(constraint);
    }

    for role in &mut roles {
        if let Some(windows) = constraints.remove(&role.oid) {
            role.time_constraints = windows;
        }
    }

    Ok(roles)
}

pub fn decode_role_member(row: &CatalogRow) -> Result<RoleMember, CatalogError> {
    Ok(RoleMember {
        role: row.text("role")?,
        member: row.text("member")?,
        grantor: row.text_or_empty("grantor")?,
        admin_option: row.bool("admin_option")?,
    })
}

pub async fn get_role_members(
    session: &dyn CatalogSession,
    config: &Config,
) -> Result<Vec<RoleMember>, ExtractError> {
    let kind = ObjectKind::RoleMember;
    let rows = fetch(session, config, kind, CatalogQuery::RoleMembers).await?;
    decode_all(&rows, kind, decode_role_member)
}

pub fn decode_tablespace(row: &CatalogRow) -> Result<Tablespace, CatalogError> {
    with_row_oid(row, |oid| {
        Ok(Tablespace {
            oid,
            name: row.text("name")?,
            location: row.text("location")?,
        })
    })
}

pub async fn get_tablespaces(
    session: &dyn CatalogSession,
    config: &Config,
) -> Result<Vec<Tablespace>, ExtractError> {
    let kind = ObjectKind::Tablespace;
    let rows = fetch(session, config, kind, CatalogQuery::Tablespaces).await?;
    decode_all(&rows, kind, decode_tablespace)
}

pub fn decode_language(row: &CatalogRow) -> Result<ProceduralLanguage, CatalogError> {
    with_row_oid(row, |oid| {
        Ok(ProceduralLanguage {
            oid,
            name: row.text("name")?,
            owner: row.text_or_empty("owner")?,
            trusted: row.bool("trusted")?,
            procedural: row.bool("procedural")?,
            handler_oid: row.oid("handler_oid")?,
            inline_oid: row.oid("inline_oid")?,
            validator_oid: row.oid("validator_oid")?,
        })
    })
}

pub async fn get_procedural_languages(
    session: &dyn CatalogSession,
    config: &Config,
) -> Result<Vec<ProceduralLanguage>, ExtractError> {
    let kind = ObjectKind::Language;
    let rows = fetch(session, config, kind, CatalogQuery::Languages).await?;
    decode_all(&rows, kind, decode_language)
}

pub fn decode_type(row: &CatalogRow, config: &Config) -> Result<TypeDefinition, CatalogError> {
    with_row_oid(row, |oid| {
        let code = row.text("type_kind")?;
        let type_kind = TypeKind::from_code(&code)
            .ok_or_else(|| CatalogError::decode("type_kind", format!("unknown type kind {:?}", code)))?;
        let schema = row.text("schema")?;

        Ok(TypeDefinition {
            oid,
            is_builtin: config.is_system_schema(&schema),
            schema,
            name: row.text("name")?,
            type_kind,
            input_oid: row.oid("input_oid")?,
            output_oid: row.oid("output_oid")?,
            receive_oid: row.oid("receive_oid")?,
            send_oid: row.oid("send_oid")?,
            base_type_oid: row.oid("base_type_oid")?,
            attribute_type_oids: row.oid_list("attribute_type_oids")?,
            is_table_rowtype: row.bool("is_table_rowtype")?,
        })
    })
}

/// Every non-array type, built-ins included
pub async fn get_types(
    session: &dyn CatalogSession,
    config: &Config,
) -> Result<Vec<TypeDefinition>, ExtractError> {
    let kind = ObjectKind::Type;
    let rows = fetch(session, config, kind, CatalogQuery::Types).await?;
    decode_all(&rows, kind, |row| decode_type(row, config))
}

pub fn decode_conversion(row: &CatalogRow) -> Result<Conversion, CatalogError> {
    with_row_oid(row, |oid| {
        Ok(Conversion {
            oid,
            schema: row.text("schema")?,
            name: row.text("name")?,
            for_encoding: row.text("for_encoding")?,
            to_encoding: row.text("to_encoding")?,
            conversion_function: row.text("conversion_function")?,
            conversion_function_oid: row.oid("conversion_function_oid")?,
            is_default: row.bool("is_default")?,
        })
    })
}

pub async fn get_conversions(
    session: &dyn CatalogSession,
    config: &Config,
) -> Result<Vec<Conversion>, ExtractError> {
    let kind = ObjectKind::Conversion;
    let rows = fetch(session, config, kind, CatalogQuery::Conversions).await?;
    decode_all(&rows, kind, decode_conversion)
}

pub fn decode_cast(row: &CatalogRow) -> Result<Cast, CatalogError> {
    with_row_oid(row, |oid| {
        let code = row.text("context")?;
        let context = CastContext::from_code(&code)
            .ok_or_else(|| CatalogError::decode("context", format!("unknown cast context {:?}", code)))?;

        Ok(Cast {
            oid,
            source_type: row.text("source_type")?,
            target_type: row.text("target_type")?,
            source_type_oid: row.oid("source_type_oid")?,
            target_type_oid: row.oid("target_type_oid")?,
            function_schema: row.text_or_empty("function_schema")?,
            function_name: row.text_or_empty("function_name")?,
            function_args: row.text_or_empty("function_args")?,
            function_oid: row.oid("function_oid")?,
            context,
        })
    })
}

pub async fn get_casts(
    session: &dyn CatalogSession,
    config: &Config,
) -> Result<Vec<Cast>, ExtractError> {
    let kind = ObjectKind::Cast;
    let rows = fetch(session, config, kind, CatalogQuery::Casts).await?;
    decode_all(&rows, kind, decode_cast)
}

pub fn decode_function(row: &CatalogRow) -> Result<Function, CatalogError> {
    with_row_oid(row, |oid| {
        let language = row.text("language")?;
        let source = row.text_or_empty("source")?;
        let compiled = COMPILED_LANGUAGES.contains(&language.as_str());
        let (body, link_symbol) = if compiled {
            (String::new(), source)
        } else {
            (source, String::new())
        };

        // Older catalogs store "-" for "no shared object"
        let binary_path = match row.text_or_empty("binary_path")? {
            path if path == "-" => String::new(),
            path => path,
        };

        let volatility_code = row.text("volatility")?;
        let volatility = Volatility::from_code(&volatility_code).ok_or_else(|| {
            CatalogError::decode("volatility", format!("unknown volatility {:?}", volatility_code))
        })?;

        let access_code = row.text("data_access")?;
        let data_access = DataAccess::from_code(&access_code).ok_or_else(|| {
            CatalogError::decode("data_access", format!("unknown data access {:?}", access_code))
        })?;

        let config = row
            .text_list("config")?
            .iter()
            .map(|entry| set_statement(entry, "config").map(|(_, statement)| statement))
            .collect::<Result<Vec<_>, _>>()?
            .join(" ");

        let returns_set = row.bool("returns_set")?;
        let num_rows = if returns_set { row.opt_int("num_rows")?.unwrap_or(0) } else { 0 };

        Ok(Function {
            oid,
            schema: row.text("schema")?,
            name: row.text("name")?,
            returns_set,
            body,
            link_symbol,
            binary_path,
            arguments: row.text_or_empty("arguments")?,
            identity_arguments: row.text_or_empty("identity_arguments")?,
            result_type: row.text("result_type")?,
            argument_type_oids: row.oid_list("argument_type_oids")?,
            result_type_oid: row.oid("result_type_oid")?,
            volatility,
            is_strict: row.bool("is_strict")?,
            is_security_definer: row.bool("is_security_definer")?,
            config,
            cost: row.float("cost")?,
            num_rows,
            data_access,
            language,
            depends_upon: Vec::new(),
        })
    })
}

/// User-defined functions, aggregates excluded
pub async fn get_functions(
    session: &dyn CatalogSession,
    config: &Config,
) -> Result<Vec<Function>, ExtractError> {
    let kind = ObjectKind::Function;
    let rows = fetch(session, config, kind, CatalogQuery::Functions).await?;
    decode_all(&rows, kind, decode_function)
}

pub fn decode_function_info(row: &CatalogRow, config: &Config) -> Result<FunctionInfo, CatalogError> {
    with_row_oid(row, |oid| {
        let schema = row.text("schema")?;
        let name = row.text("name")?;

        Ok(FunctionInfo {
            oid,
            is_internal: config.is_system_schema(&schema),
            schema,
            name,
            arguments: row.text_or_empty("arguments")?,
            identity_arguments: row.text_or_empty("identity_arguments")?,
        })
    })
}

/// Every visible function keyed by identifier
pub async fn get_function_oid_to_info_map(
    session: &dyn CatalogSession,
    config: &Config,
) -> Result<BTreeMap<Oid, FunctionInfo>, ExtractError> {
    let kind = ObjectKind::FunctionInfo;
    let rows = fetch(session, config, kind, CatalogQuery::FunctionInfo).await?;
    let infos = decode_all(&rows, kind, |row| decode_function_info(row, config))?;

    Ok(infos.into_iter().map(|info| (info.oid, info)).collect())
}

pub fn decode_aggregate(row: &CatalogRow) -> Result<Aggregate, CatalogError> {
    with_row_oid(row, |oid| {
        Ok(Aggregate {
            oid,
            schema: row.text("schema")?,
            name: row.text("name")?,
            arguments: row.text_or_empty("arguments")?,
            identity_arguments: row.text_or_empty("identity_arguments")?,
            argument_type_oids: row.oid_list("argument_type_oids")?,
            transition_function: row.oid("transition_function")?,
            preliminary_function: row.oid("preliminary_function")?,
            final_function: row.oid("final_function")?,
            sort_operator: row.oid("sort_operator")?,
            transition_data_type: row.text("transition_data_type")?,
            transition_type_oid: row.oid("transition_type_oid")?,
            initial_value: row.opt_text("initial_value")?,
            is_ordered: row.bool("is_ordered")?,
            depends_upon: Vec::new(),
        })
    })
}

pub async fn get_aggregates(
    session: &dyn CatalogSession,
    config: &Config,
) -> Result<Vec<Aggregate>, ExtractError> {
    let kind = ObjectKind::Aggregate;
    let rows = fetch(session, config, kind, CatalogQuery::Aggregates).await?;
    decode_all(&rows, kind, decode_aggregate)
}
