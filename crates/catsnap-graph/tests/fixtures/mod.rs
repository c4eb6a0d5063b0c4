//! Test fixtures for snapshot assembly tests
//!
//! A small warehouse catalog: a queue with a role assigned to it, a group
//! grant, a composite type used by a SQL function, a base type whose I/O
//! functions take and return it, a domain and a composite over an enum that
//! sorts after both, a chain of SQL functions calling each
//! other, a cast through a user function and an aggregate.

#![allow(dead_code)]

use catsnap_catalog::{CatalogQuery, CatalogRow, MockSession};

fn role_row(oid: u32, name: &str, res_queue: &str) -> CatalogRow {
    CatalogRow::new()
        .with("oid", oid)
        .with("name", name)
        .with("super_user", false)
        .with("inherit", true)
        .with("create_role", false)
        .with("create_db", false)
        .with("can_login", true)
        .with("connection_limit", -1i64)
        .with("password", Option::<String>::None)
        .with("valid_until", Option::<String>::None)
        .with("res_queue", res_queue)
        .with("create_read_ext_http", false)
        .with("create_read_ext_gpfdist", false)
        .with("create_write_ext_gpfdist", false)
        .with("create_read_ext_hdfs", false)
        .with("create_write_ext_hdfs", false)
}

fn type_row(
    oid: u32,
    schema: &str,
    name: &str,
    kind: &str,
    io: [u32; 4],
    base: u32,
    attrs: Vec<u32>,
    rowtype: bool,
) -> CatalogRow {
    CatalogRow::new()
        .with("oid", oid)
        .with("schema", schema)
        .with("name", name)
        .with("type_kind", kind)
        .with("input_oid", io[0])
        .with("output_oid", io[1])
        .with("receive_oid", io[2])
        .with("send_oid", io[3])
        .with("base_type_oid", base)
        .with("attribute_type_oids", attrs)
        .with("is_table_rowtype", rowtype)
}

fn function_row(
    oid: u32,
    name: &str,
    args: &str,
    arg_oids: Vec<u32>,
    result_oid: u32,
    language: &str,
    source: &str,
) -> CatalogRow {
    CatalogRow::new()
        .with("oid", oid)
        .with("schema", "public")
        .with("name", name)
        .with("returns_set", false)
        .with("source", source)
        .with("binary_path", if language == "c" { "$libdir/basetype" } else { "-" })
        .with("arguments", args)
        .with("identity_arguments", args)
        .with("result_type", "")
        .with("argument_type_oids", arg_oids)
        .with("result_type_oid", result_oid)
        .with("volatility", "i")
        .with("is_strict", true)
        .with("is_security_definer", false)
        .with("config", Option::<Vec<String>>::None)
        .with("cost", 1.0)
        .with("num_rows", 0i64)
        .with("data_access", "c")
        .with("language", language)
}

fn info_row(oid: u32, schema: &str, name: &str, arguments: &str) -> CatalogRow {
    CatalogRow::new()
        .with("oid", oid)
        .with("schema", schema)
        .with("name", name)
        .with("arguments", arguments)
        .with("identity_arguments", arguments)
}

pub fn type_rows() -> Vec<CatalogRow> {
    let composite_io = [2290, 2291, 2402, 2403];
    vec![
        type_row(2275, "pg_catalog", "cstring", "p", [2292, 2293, 2500, 2501], 0, vec![], false),
        type_row(23, "pg_catalog", "int4", "b", [42, 43, 2406, 2407], 0, vec![], false),
        type_row(25, "pg_catalog", "text", "b", [46, 47, 2414, 2415], 0, vec![], false),
        type_row(16436, "public", "a_dom", "d", [0, 0, 0, 0], 16433, vec![], false),
        type_row(16431, "public", "base_type", "b", [16441, 16442, 0, 0], 0, vec![], false),
        type_row(16430, "public", "composite_ints", "c", composite_io, 0, vec![23, 23], false),
        type_row(16437, "public", "labelled", "c", composite_io, 0, vec![16433, 23], false),
        type_row(16435, "public", "orders", "c", composite_io, 0, vec![23], true),
        type_row(16433, "public", "z_enum", "e", [3504, 3505, 3532, 3533], 0, vec![], false),
    ]
}

pub fn function_rows() -> Vec<CatalogRow> {
    vec![
        function_row(16440, "add", "composite_ints", vec![16430], 23, "sql", "SELECT ($1.one + $1.two)"),
        function_row(16441, "base_fn_in", "cstring", vec![2275], 16431, "c", "boolin"),
        function_row(16442, "base_fn_out", "base_type", vec![16431], 2275, "c", "boolout"),
        function_row(16443, "double", "integer", vec![23], 23, "sql", "SELECT $1 * 2"),
        function_row(16444, "quad", "integer", vec![23], 23, "sql", "SELECT double(double($1))"),
        function_row(16445, "casttoint", "text", vec![25], 23, "sql", "SELECT cast($1 as integer)"),
        function_row(16446, "sum_accum", "integer, integer", vec![23, 23], 23, "sql", "SELECT $1 + $2"),
    ]
}

pub fn function_info_rows() -> Vec<CatalogRow> {
    vec![
        info_row(1242, "pg_catalog", "boolin", "cstring"),
        info_row(16421, "pg_catalog", "plpython_call_handler", ""),
        info_row(16460, "pg_catalog", "latin1_to_mic", "integer, integer, cstring, internal, integer"),
        info_row(16440, "public", "add", "composite_ints"),
        info_row(16441, "public", "base_fn_in", "cstring"),
        info_row(16442, "public", "base_fn_out", "base_type"),
        info_row(16443, "public", "double", "integer"),
        info_row(16444, "public", "quad", "integer"),
        info_row(16445, "public", "casttoint", "text"),
        info_row(16446, "public", "sum_accum", "integer, integer"),
        info_row(16450, "public", "agg_sum", "integer"),
    ]
}

pub fn aggregate_row() -> CatalogRow {
    CatalogRow::new()
        .with("oid", 16450u32)
        .with("schema", "public")
        .with("name", "agg_sum")
        .with("arguments", "integer")
        .with("identity_arguments", "integer")
        .with("argument_type_oids", vec![23u32])
        .with("transition_function", 16446u32)
        .with("preliminary_function", 0u32)
        .with("final_function", 0u32)
        .with("sort_operator", 0u32)
        .with("transition_data_type", "integer")
        .with("transition_type_oid", 23u32)
        .with("initial_value", Option::<String>::None)
        .with("is_ordered", false)
}

/// A mock session loaded with the warehouse catalog
pub async fn warehouse_catalog() -> MockSession {
    let session = MockSession::new();

    session
        .add_rows(
            CatalogQuery::SessionGucs,
            vec![CatalogRow::new()
                .with("client_encoding", "UTF8")
                .with("std_conforming_strings", "on")
                .with("default_with_oids", "off")],
        )
        .await;
    session
        .add_rows(
            CatalogQuery::DatabaseGucs,
            vec![CatalogRow::new().with("setting", "search_path=public")],
        )
        .await;
    session
        .add_rows(
            CatalogQuery::ResourceQueues,
            vec![CatalogRow::new()
                .with("oid", 16390u32)
                .with("name", "etl_queue")
                .with("active_statements", 5i64)
                .with("max_cost", -1.0)
                .with("cost_overcommit", false)
                .with("min_cost", 0.0)
                .with("priority", "high")
                .with("memory_limit", "2GB")],
        )
        .await;
    session
        .add_rows(
            CatalogQuery::Roles,
            vec![
                role_row(16400, "etl_user", "etl_queue"),
                role_row(16401, "analysts", "pg_default"),
            ],
        )
        .await;
    session
        .add_rows(
            CatalogQuery::RoleMembers,
            vec![CatalogRow::new()
                .with("role", "analysts")
                .with("member", "etl_user")
                .with("grantor", "gpadmin")
                .with("admin_option", false)],
        )
        .await;
    session
        .add_rows(
            CatalogQuery::Tablespaces,
            vec![CatalogRow::new()
                .with("oid", 16410u32)
                .with("name", "fast")
                .with("location", "fast_filespace")],
        )
        .await;
    session
        .add_rows(
            CatalogQuery::Languages,
            vec![CatalogRow::new()
                .with("oid", 16420u32)
                .with("name", "plpythonu")
                .with("owner", "gpadmin")
                .with("trusted", false)
                .with("procedural", true)
                .with("handler_oid", 16421u32)
                .with("inline_oid", 0u32)
                .with("validator_oid", 0u32)],
        )
        .await;
    session.add_rows(CatalogQuery::Types, type_rows()).await;
    session
        .add_rows(
            CatalogQuery::Conversions,
            vec![CatalogRow::new()
                .with("oid", 16480u32)
                .with("schema", "public")
                .with("name", "testconv")
                .with("for_encoding", "LATIN1")
                .with("to_encoding", "MULE_INTERNAL")
                .with("conversion_function", "pg_catalog.latin1_to_mic")
                .with("conversion_function_oid", 16460u32)
                .with("is_default", false)],
        )
        .await;
    session
        .add_rows(
            CatalogQuery::Casts,
            vec![CatalogRow::new()
                .with("oid", 16470u32)
                .with("source_type", "pg_catalog.text")
                .with("target_type", "pg_catalog.int4")
                .with("source_type_oid", 25u32)
                .with("target_type_oid", 23u32)
                .with("function_schema", "public")
                .with("function_name", "casttoint")
                .with("function_args", "text")
                .with("function_oid", 16445u32)
                .with("context", "a")],
        )
        .await;
    session.add_rows(CatalogQuery::Functions, function_rows()).await;
    session.add_rows(CatalogQuery::FunctionInfo, function_info_rows()).await;
    session.add_rows(CatalogQuery::Aggregates, vec![aggregate_row()]).await;

    session
}
