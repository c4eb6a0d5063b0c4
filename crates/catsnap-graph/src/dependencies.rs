//! Dependency extraction for functions and aggregates
//!
//! Fills `depends_upon` with the qualified names of the extracted objects a
//! routine references: its argument and result types, and for SQL-language
//! functions the functions called and the types cast to in the body. Aggregates depend on
//! their argument and transition types and their component functions.
//!
//! References that cannot be resolved, or resolve to built-in objects, are
//! dropped. Bodies in other languages are not scanned.

use catsnap_core::{Aggregate, CatalogContents, Config, Function, ObjectKey, Oid};
use rayon::prelude::*;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Word};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::resolver::{CatalogObjectRef, NameResolver};

/// Populate `depends_upon` on every function and aggregate in `contents`
pub fn extract_dependencies(contents: &mut CatalogContents, resolver: &NameResolver, config: &Config) {
    contents.functions.par_iter_mut().for_each(|function| {
        function.depends_upon = function_dependencies(function, resolver, config);
    });

    contents.aggregates.par_iter_mut().for_each(|aggregate| {
        aggregate.depends_upon = aggregate_dependencies(aggregate, resolver);
    });

    let edges: usize = contents.functions.iter().map(|f| f.depends_upon.len()).sum::<usize>()
        + contents.aggregates.iter().map(|a| a.depends_upon.len()).sum::<usize>();
    info!(
        functions = contents.functions.len(),
        aggregates = contents.aggregates.len(),
        edges,
        "extracted dependencies"
    );
}

fn function_dependencies(function: &Function, resolver: &NameResolver, config: &Config) -> Vec<String> {
    let key = function.key();
    let mut deps = DependencyList::new(&key, resolver);

    for oid in &function.argument_type_oids {
        deps.add_oid(*oid);
    }
    deps.add_oid(function.result_type_oid);

    if function.is_sql() {
        for reference in body_references(&function.body) {
            let found = match &reference {
                Reference::Type { schema, name } => {
                    resolver.lookup_type(schema.as_deref(), name, &config.search_path)
                }
                Reference::Function { schema, name } => {
                    resolver.lookup_function(schema.as_deref(), name, &config.search_path)
                }
            };
            if let Some(object) = found {
                deps.add(object);
            }
        }
    }

    deps.into_names()
}

fn aggregate_dependencies(aggregate: &Aggregate, resolver: &NameResolver) -> Vec<String> {
    let key = aggregate.key();
    let mut deps = DependencyList::new(&key, resolver);

    for oid in &aggregate.argument_type_oids {
        deps.add_oid(*oid);
    }
    deps.add_oid(aggregate.transition_type_oid);
    for oid in aggregate.component_functions() {
        deps.add_oid(oid);
    }

    deps.into_names()
}

/// Ordered, duplicate-free dependency names for one routine
struct DependencyList<'a> {
    owner: &'a ObjectKey,
    resolver: &'a NameResolver,
    names: Vec<String>,
    seen: HashSet<String>,
}

impl<'a> DependencyList<'a> {
    fn new(owner: &'a ObjectKey, resolver: &'a NameResolver) -> Self {
        Self {
            owner,
            resolver,
            names: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn add_oid(&mut self, oid: Oid) {
        match self.resolver.resolve(oid) {
            Ok(Some(object)) => self.add(object),
            Ok(None) => {}
            Err(err) => debug!(object = %self.owner, error = %err, "dropped reference"),
        }
    }

    fn add(&mut self, object: &CatalogObjectRef) {
        if &object.key == self.owner {
            return;
        }
        if let Some(name) = object.dependency_name() {
            if self.seen.insert(name.to_string()) {
                self.names.push(name.to_string());
            }
        }
    }

    fn into_names(self) -> Vec<String> {
        self.names
    }
}

/// A type or function named in a SQL body
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reference {
    Type { schema: Option<String>, name: String },
    Function { schema: Option<String>, name: String },
}

/// Types and functions a SQL body refers to, in order of appearance
///
/// A name followed by `(` is a function call. A name after `::`, or after
/// `AS` directly inside `CAST(`, is a type. Any other name (columns, tables,
/// aliases, output names) is ignored. `a.b` is a qualified name; a word
/// following a period that does not start a qualified name (`$1.field`,
/// `t.a.b`) is a field access and is skipped. Unquoted identifiers are
/// folded to lower case.
fn body_references(body: &str) -> Vec<Reference> {
    let dialect = PostgreSqlDialect {};
    let tokens = match Tokenizer::new(&dialect, body).tokenize() {
        Ok(tokens) => tokens,
        Err(err) => {
            debug!(error = %err, "could not tokenize function body");
            return Vec::new();
        }
    };

    let tokens: Vec<Token> = tokens
        .into_iter()
        .filter(|token| !matches!(token, Token::Whitespace(_)))
        .collect();

    let mut references = Vec::new();
    // One entry per open parenthesis: whether it opened a CAST
    let mut parens: Vec<bool> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let previous = i.checked_sub(1).and_then(|p| tokens.get(p));

        let word = match &tokens[i] {
            Token::Word(word) => word,
            Token::LParen => {
                parens.push(matches!(previous, Some(Token::Word(w)) if w.keyword == Keyword::CAST));
                i += 1;
                continue;
            }
            Token::RParen => {
                parens.pop();
                i += 1;
                continue;
            }
            _ => {
                i += 1;
                continue;
            }
        };

        if previous == Some(&Token::Period) {
            i += 1;
            continue;
        }

        let (schema, name, end) = match (tokens.get(i + 1), tokens.get(i + 2)) {
            (Some(Token::Period), Some(Token::Word(next))) => (Some(identifier(word)), identifier(next), i + 3),
            _ => (None, identifier(word), i + 1),
        };

        let after_as = matches!(previous, Some(Token::Word(w)) if w.keyword == Keyword::AS);
        let type_position = previous == Some(&Token::DoubleColon) || (after_as && parens.last() == Some(&true));

        if type_position {
            references.push(Reference::Type { schema, name });
        } else if !after_as && tokens.get(end) == Some(&Token::LParen) {
            references.push(Reference::Function { schema, name });
        }

        i = end;
    }

    references
}

fn identifier(word: &Word) -> String {
    if word.quote_style.is_some() {
        word.value.clone()
    } else {
        word.value.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catsnap_core::{DataAccess, FunctionInfo, TypeDefinition, TypeKind, Volatility};
    use pretty_assertions::assert_eq;

    fn ty(oid: Oid, schema: &str, name: &str) -> TypeDefinition {
        TypeDefinition {
            oid,
            schema: schema.to_string(),
            name: name.to_string(),
            type_kind: TypeKind::Composite,
            input_oid: 0,
            output_oid: 0,
            receive_oid: 0,
            send_oid: 0,
            base_type_oid: 0,
            attribute_type_oids: Vec::new(),
            is_table_rowtype: false,
            is_builtin: schema == "pg_catalog",
        }
    }

    fn function(oid: Oid, name: &str, args: &str, arg_oids: Vec<Oid>, result: Oid, body: &str) -> Function {
        Function {
            oid,
            schema: "public".to_string(),
            name: name.to_string(),
            returns_set: false,
            body: body.to_string(),
            link_symbol: String::new(),
            binary_path: String::new(),
            arguments: args.to_string(),
            identity_arguments: args.to_string(),
            result_type: String::new(),
            argument_type_oids: arg_oids,
            result_type_oid: result,
            volatility: Volatility::Volatile,
            is_strict: false,
            is_security_definer: false,
            config: String::new(),
            cost: 100.0,
            num_rows: 0,
            data_access: DataAccess::ContainsSql,
            language: "sql".to_string(),
            depends_upon: Vec::new(),
        }
    }

    fn catalog(functions: Vec<Function>) -> CatalogContents {
        let mut contents = CatalogContents::default();
        contents.types = vec![
            ty(23, "pg_catalog", "int4"),
            ty(16430, "public", "composite_ints"),
            ty(16431, "public", "pair"),
        ];
        for f in &functions {
            contents.function_info.insert(
                f.oid,
                FunctionInfo {
                    oid: f.oid,
                    schema: "public".to_string(),
                    name: f.name.clone(),
                    arguments: f.arguments.clone(),
                    identity_arguments: f.identity_arguments.clone(),
                    is_internal: false,
                },
            );
        }
        contents.function_info.insert(
            1242,
            FunctionInfo {
                oid: 1242,
                schema: "pg_catalog".to_string(),
                name: "abs".to_string(),
                arguments: "integer".to_string(),
                identity_arguments: "integer".to_string(),
                is_internal: true,
            },
        );
        contents.functions = functions;
        contents
    }

    fn run(mut contents: CatalogContents) -> CatalogContents {
        let resolver = NameResolver::build(&contents);
        extract_dependencies(&mut contents, &resolver, &Config::default());
        contents
    }

    #[test]
    fn composite_argument_is_the_only_dependency() {
        let contents = run(catalog(vec![function(
            16441,
            "add",
            "composite_ints",
            vec![16430],
            23,
            "SELECT ($1.one + $1.two)",
        )]));

        assert_eq!(contents.functions[0].depends_upon, vec!["public.composite_ints".to_string()]);
    }

    #[test]
    fn composite_return_type_counts() {
        let contents = run(catalog(vec![function(
            16442,
            "make_ints",
            "",
            vec![],
            16430,
            "SELECT NULL",
        )]));

        assert_eq!(contents.functions[0].depends_upon, vec!["public.composite_ints".to_string()]);
    }

    #[test]
    fn body_references_in_discovery_order() {
        let contents = run(catalog(vec![
            function(16450, "double", "integer", vec![23], 23, "SELECT $1 * 2"),
            function(
                16451,
                "quad",
                "integer",
                vec![23],
                23,
                "SELECT double(double($1)) + abs(1), NULL::public.pair, NULL::\"pair\"",
            ),
        ]));

        assert!(contents.functions[0].depends_upon.is_empty());
        assert_eq!(
            contents.functions[1].depends_upon,
            vec!["public.double(integer)".to_string(), "public.pair".to_string()]
        );
    }

    #[test]
    fn self_reference_is_excluded() {
        let contents = run(catalog(vec![function(
            16460,
            "fact",
            "integer",
            vec![23],
            23,
            "SELECT CASE WHEN $1 <= 1 THEN 1 ELSE $1 * fact($1 - 1) END",
        )]));

        assert!(contents.functions[0].depends_upon.is_empty());
    }

    #[test]
    fn other_languages_are_not_scanned() {
        let mut plpgsql = function(16470, "wrap", "", vec![], 23, "BEGIN RETURN NULL::pair; END");
        plpgsql.language = "plpgsql".to_string();

        let contents = run(catalog(vec![plpgsql]));
        assert!(contents.functions[0].depends_upon.is_empty());
    }

    #[test]
    fn unknown_type_identifiers_are_dropped() {
        // 1007 is an array type, which the type reader never returns
        let contents = run(catalog(vec![function(16480, "sum_all", "integer[]", vec![1007], 23, "SELECT 1")]));
        assert!(contents.functions[0].depends_upon.is_empty());
    }

    #[test]
    fn columns_and_aliases_are_not_references() {
        let contents = run(catalog(vec![
            function(16450, "double", "integer", vec![23], 23, "SELECT $1 * 2"),
            function(16452, "report", "", vec![], 23, "SELECT double FROM metrics AS pair"),
        ]));

        assert!(contents.functions[1].depends_upon.is_empty());
    }

    #[test]
    fn cast_target_is_a_type_reference() {
        let contents = run(catalog(vec![function(
            16453,
            "to_pair",
            "",
            vec![],
            23,
            "SELECT CAST((SELECT a AS composite_ints FROM t) AS pair)",
        )]));

        assert_eq!(contents.functions[0].depends_upon, vec!["public.pair".to_string()]);
    }

    #[test]
    fn only_calls_and_type_positions_are_scanned() {
        let references = body_references("SELECT t.pair, public.Pair(1), \"Mixed\".x::\"Pair\" FROM t AS f(a)");
        assert_eq!(
            references,
            vec![
                Reference::Function {
                    schema: Some("public".to_string()),
                    name: "pair".to_string(),
                },
                Reference::Type {
                    schema: None,
                    name: "Pair".to_string(),
                },
            ]
        );
    }
}
