//! Test fixtures for catalog reader integration tests
//!
//! Canned catalog rows shaped exactly like the query results of a small
//! cluster: one resource queue, two roles (one with login-deny windows), a
//! membership grant, a tablespace, plpgsql, a composite type with a function
//! taking it, a cast, a conversion and an aggregate.

#![allow(dead_code)]

use catsnap_catalog::{CatalogQuery, CatalogRow, MockSession};

pub fn session_gucs_row() -> CatalogRow {
    CatalogRow::new()
        .with("client_encoding", "UTF8")
        .with("std_conforming_strings", "on")
        .with("default_with_oids", "off")
}

pub fn database_gucs_rows() -> Vec<CatalogRow> {
    vec![
        CatalogRow::new().with("setting", "search_path=public, pg_catalog"),
        CatalogRow::new().with("setting", "default_with_oids=true"),
    ]
}

/// `CREATE RESOURCE QUEUE statementsQueue WITH (ACTIVE_STATEMENTS=7)`
pub fn resource_queue_row() -> CatalogRow {
    CatalogRow::new()
        .with("oid", 16390u32)
        .with("name", "statementsQueue")
        .with("active_statements", 7i64)
        .with("max_cost", -1.0)
        .with("cost_overcommit", false)
        .with("min_cost", 0.0)
        .with("priority", Option::<String>::None)
        .with("memory_limit", Option::<String>::None)
}

fn role_row(oid: u32, name: &str) -> CatalogRow {
    CatalogRow::new()
        .with("oid", oid)
        .with("name", name)
}

/// `CREATE ROLE role1 SUPERUSER NOINHERIT`
pub fn superuser_role_row() -> CatalogRow {
    role_row(16400, "role1")
        .with("super_user", true)
        .with("inherit", false)
        .with("create_role", false)
        .with("create_db", false)
        .with("can_login", false)
        .with("connection_limit", -1i64)
        .with("password", Option::<String>::None)
        .with("valid_until", Option::<String>::None)
        .with("res_queue", "pg_default")
        .with("create_read_ext_http", false)
        .with("create_read_ext_gpfdist", false)
        .with("create_write_ext_gpfdist", false)
        .with("create_read_ext_hdfs", false)
        .with("create_write_ext_hdfs", false)
}

/// Login role assigned to `statementsQueue`, with two deny windows
pub fn login_role_row() -> CatalogRow {
    role_row(16401, "testrole")
        .with("super_user", false)
        .with("inherit", true)
        .with("create_role", true)
        .with("create_db", true)
        .with("can_login", true)
        .with("connection_limit", 4i64)
        .with("password", "md5a8b2c77dfeba4705f29c094592eb3369")
        .with("valid_until", "2099-01-01 08:00:00-00")
        .with("res_queue", "statementsQueue")
        .with("create_read_ext_http", true)
        .with("create_read_ext_gpfdist", true)
        .with("create_write_ext_gpfdist", true)
        .with("create_read_ext_hdfs", true)
        .with("create_write_ext_hdfs", true)
}

pub fn time_constraint_rows() -> Vec<CatalogRow> {
    vec![
        CatalogRow::new()
            .with("role_oid", 16401u32)
            .with("start_day", 0i64)
            .with("start_time", "1:30 PM")
            .with("end_day", 3i64)
            .with("end_time", "14:30:00"),
        CatalogRow::new()
            .with("role_oid", 16401u32)
            .with("start_day", 5i64)
            .with("start_time", "00:00:00")
            .with("end_day", 5i64)
            .with("end_time", "24:00:00"),
    ]
}

pub fn role_member_row() -> CatalogRow {
    CatalogRow::new()
        .with("role", "usergroup")
        .with("member", "testuser")
        .with("grantor", "testrole")
        .with("admin_option", true)
}

pub fn tablespace_row() -> CatalogRow {
    CatalogRow::new()
        .with("oid", 16410u32)
        .with("name", "test_tablespace")
        .with("location", "test_dir")
}

pub fn language_row() -> CatalogRow {
    CatalogRow::new()
        .with("oid", 16420u32)
        .with("name", "plpythonu")
        .with("owner", "gpadmin")
        .with("trusted", false)
        .with("procedural", true)
        .with("handler_oid", 16421u32)
        .with("inline_oid", 16422u32)
        .with("validator_oid", 0u32)
}

fn type_row(oid: u32, schema: &str, name: &str, kind: &str) -> CatalogRow {
    CatalogRow::new()
        .with("oid", oid)
        .with("schema", schema)
        .with("name", name)
        .with("type_kind", kind)
}

pub fn type_rows() -> Vec<CatalogRow> {
    vec![
        type_row(16430, "public", "composite_ints", "c")
            .with("input_oid", 2290u32)
            .with("output_oid", 2291u32)
            .with("receive_oid", 2402u32)
            .with("send_oid", 2403u32)
            .with("base_type_oid", 0u32)
            .with("attribute_type_oids", vec![23u32, 23u32])
            .with("is_table_rowtype", false),
        type_row(23, "pg_catalog", "int4", "b")
            .with("input_oid", 42u32)
            .with("output_oid", 43u32)
            .with("receive_oid", 2406u32)
            .with("send_oid", 2407u32)
            .with("base_type_oid", 0u32)
            .with("attribute_type_oids", Vec::<u32>::new())
            .with("is_table_rowtype", false),
        type_row(25, "pg_catalog", "text", "b")
            .with("input_oid", 46u32)
            .with("output_oid", 47u32)
            .with("receive_oid", 2414u32)
            .with("send_oid", 2415u32)
            .with("base_type_oid", 0u32)
            .with("attribute_type_oids", Vec::<u32>::new())
            .with("is_table_rowtype", false),
    ]
}

/// `CREATE FUNCTION public.add(integer, integer) ... SET search_path TO pg_temp`
pub fn add_function_row() -> CatalogRow {
    CatalogRow::new()
        .with("oid", 16440u32)
        .with("schema", "public")
        .with("name", "add")
        .with("returns_set", false)
        .with("source", "SELECT $1 + $2")
        .with("binary_path", Option::<String>::None)
        .with("arguments", "integer, integer")
        .with("identity_arguments", "integer, integer")
        .with("result_type", "integer")
        .with("argument_type_oids", vec![23u32, 23u32])
        .with("result_type_oid", 23u32)
        .with("volatility", "v")
        .with("is_strict", false)
        .with("is_security_definer", false)
        .with("config", vec!["search_path=pg_temp".to_string()])
        .with("cost", 100.0)
        .with("num_rows", 0i64)
        .with("data_access", "c")
        .with("language", "sql")
}

/// `CREATE FUNCTION public.add(composite_ints) RETURNS integer`
pub fn composite_function_row() -> CatalogRow {
    CatalogRow::new()
        .with("oid", 16441u32)
        .with("schema", "public")
        .with("name", "add")
        .with("returns_set", false)
        .with("source", "SELECT ($1.one + $1.two)")
        .with("binary_path", Option::<String>::None)
        .with("arguments", "composite_ints")
        .with("identity_arguments", "composite_ints")
        .with("result_type", "integer")
        .with("argument_type_oids", vec![16430u32])
        .with("result_type_oid", 23u32)
        .with("volatility", "v")
        .with("is_strict", true)
        .with("is_security_definer", false)
        .with("config", Option::<Vec<String>>::None)
        .with("cost", 100.0)
        .with("num_rows", 0i64)
        .with("data_access", "c")
        .with("language", "sql")
}

pub fn casttoint_function_row() -> CatalogRow {
    CatalogRow::new()
        .with("oid", 16442u32)
        .with("schema", "public")
        .with("name", "casttoint")
        .with("returns_set", false)
        .with("source", "SELECT cast($1 as integer)")
        .with("binary_path", Option::<String>::None)
        .with("arguments", "text")
        .with("identity_arguments", "text")
        .with("result_type", "integer")
        .with("argument_type_oids", vec![25u32])
        .with("result_type_oid", 23u32)
        .with("volatility", "i")
        .with("is_strict", true)
        .with("is_security_definer", false)
        .with("config", Option::<Vec<String>>::None)
        .with("cost", 100.0)
        .with("num_rows", 0i64)
        .with("data_access", "c")
        .with("language", "sql")
}

fn info_row(oid: u32, schema: &str, name: &str, arguments: &str) -> CatalogRow {
    CatalogRow::new()
        .with("oid", oid)
        .with("schema", schema)
        .with("name", name)
        .with("arguments", arguments)
        .with("identity_arguments", arguments)
}

pub fn function_info_rows() -> Vec<CatalogRow> {
    vec![
        info_row(1242, "pg_catalog", "boolin", "cstring"),
        info_row(16440, "public", "add", "integer, integer"),
        info_row(16441, "public", "add", "composite_ints"),
        info_row(16442, "public", "casttoint", "text"),
        info_row(16443, "public", "mysfunc_accum", "numeric, numeric, numeric"),
        info_row(16444, "public", "mypre_accum", "numeric, numeric"),
        info_row(16450, "public", "agg_prefunc", "numeric, numeric"),
        info_row(16460, "pg_catalog", "latin1_to_mic", "integer, integer, cstring, internal, integer"),
    ]
}

pub fn cast_row() -> CatalogRow {
    CatalogRow::new()
        .with("oid", 16470u32)
        .with("source_type", "pg_catalog.text")
        .with("target_type", "pg_catalog.int4")
        .with("source_type_oid", 25u32)
        .with("target_type_oid", 23u32)
        .with("function_schema", "public")
        .with("function_name", "casttoint")
        .with("function_args", "text")
        .with("function_oid", 16442u32)
        .with("context", "a")
}

pub fn conversion_row() -> CatalogRow {
    CatalogRow::new()
        .with("oid", 16480u32)
        .with("schema", "public")
        .with("name", "testconv")
        .with("for_encoding", "LATIN1")
        .with("to_encoding", "MULE_INTERNAL")
        .with("conversion_function", "pg_catalog.latin1_to_mic")
        .with("conversion_function_oid", 16460u32)
        .with("is_default", false)
}

pub fn aggregate_row() -> CatalogRow {
    CatalogRow::new()
        .with("oid", 16450u32)
        .with("schema", "public")
        .with("name", "agg_prefunc")
        .with("arguments", "numeric, numeric")
        .with("identity_arguments", "numeric, numeric")
        .with("argument_type_oids", vec![1700u32, 1700u32])
        .with("transition_function", 16443u32)
        .with("preliminary_function", 16444u32)
        .with("final_function", 0u32)
        .with("sort_operator", 0u32)
        .with("transition_data_type", "numeric")
        .with("transition_type_oid", 1700u32)
        .with("initial_value", "0")
        .with("is_ordered", false)
}

/// A mock session loaded with every fixture above
pub async fn sample_catalog() -> MockSession {
    let session = MockSession::new();

    session.add_rows(CatalogQuery::SessionGucs, vec![session_gucs_row()]).await;
    session.add_rows(CatalogQuery::DatabaseGucs, database_gucs_rows()).await;
    session.add_rows(CatalogQuery::ResourceQueues, vec![resource_queue_row()]).await;
    session
        .add_rows(CatalogQuery::Roles, vec![superuser_role_row(), login_role_row()])
        .await;
    session.add_rows(CatalogQuery::TimeConstraints, time_constraint_rows()).await;
    session.add_rows(CatalogQuery::RoleMembers, vec![role_member_row()]).await;
    session.add_rows(CatalogQuery::Tablespaces, vec![tablespace_row()]).await;
    session.add_rows(CatalogQuery::Languages, vec![language_row()]).await;
    session.add_rows(CatalogQuery::Types, type_rows()).await;
    session.add_rows(CatalogQuery::Conversions, vec![conversion_row()]).await;
    session.add_rows(CatalogQuery::Casts, vec![cast_row()]).await;
    session
        .add_rows(
            CatalogQuery::Functions,
            vec![add_function_row(), composite_function_row(), casttoint_function_row()],
        )
        .await;
    session.add_rows(CatalogQuery::FunctionInfo, function_info_rows()).await;
    session.add_rows(CatalogQuery::Aggregates, vec![aggregate_row()]).await;

    session
}
