//! Compiles a clause tree into a query string for one of the supported dialects.
//!
//! The walk is shared: clauses are visited depth-first, each one is prefixed
//! with its effective combinator and wrapped in the parentheses its position
//! calls for. Dialects only decide the statement head and how a single
//! predicate is rendered.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::cql_dialect::CqlEmitter;
use crate::depth::{left_parentheses, right_parentheses};
use crate::error::QueryBuilderError;
use crate::filter_expr::FilterExpressionEmitter;
use crate::group::ClauseTree;
use crate::sql_dialect::SqlEmitter;
use crate::timestamp::{resolve_value, EffectiveValue, TimeContext};
use crate::types::{DataType, Operator};

/// Target query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// OData-style `$filter` expression.
    FilterExpression,
    /// Document-database SQL over the entity container `c`.
    Sql,
    /// Cassandra query language.
    Cql,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dialect::FilterExpression => "filter",
            Dialect::Sql => "sql",
            Dialect::Cql => "cql",
        })
    }
}

impl FromStr for Dialect {
    type Err = QueryBuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "filter" | "odata" => Ok(Dialect::FilterExpression),
            "sql" => Ok(Dialect::Sql),
            "cql" => Ok(Dialect::Cql),
            _ => Err(QueryBuilderError::unknown_name("dialect", s)),
        }
    }
}

/// Inputs a compilation needs besides the tree itself.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub time: TimeContext,
    /// Projection for the SQL and CQL heads; empty means `*`.
    pub selected_columns: Vec<String>,
    pub keyspace: Option<String>,
    pub table: Option<String>,
}

impl CompileOptions {
    pub fn new(time: TimeContext) -> Self {
        Self {
            time,
            selected_columns: Vec::new(),
            keyspace: None,
            table: None,
        }
    }
}

/// A clause reduced to what an emitter prints.
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseFragment<'a> {
    pub field: &'a str,
    pub data_type: DataType,
    pub operator: Operator,
    pub value: EffectiveValue,
}

/// Per-dialect rendering.
pub trait DialectEmitter {
    /// Statement head (`SELECT ... FROM ...`); `None` for bare filter expressions.
    fn select_clause(&self, options: &CompileOptions) -> Option<String>;

    /// One predicate, without combinator or parentheses.
    fn predicate(&self, fragment: &ClauseFragment<'_>) -> String;
}

/// Walk the tree with the given emitter.
pub fn emit(tree: &ClauseTree, emitter: &dyn DialectEmitter, options: &CompileOptions) -> String {
    let mut query = String::new();
    let head = emitter.select_clause(options);
    let clauses = tree.flatten();

    if let Some(head) = &head {
        query.push_str(head);
        if !clauses.is_empty() {
            query.push_str(" WHERE");
        }
    }

    for (position, id) in clauses.iter().enumerate() {
        let Some(clause) = tree.clause(*id) else {
            continue;
        };
        let fragment = ClauseFragment {
            field: clause.field(),
            data_type: clause.data_type(),
            operator: clause.operator(),
            value: resolve_value(clause.value(), &options.time),
        };

        query.push(' ');
        let combinator = clause.effective_combinator(position == 0);
        if position > 0 {
            query.push_str(combinator.as_lower());
            query.push(' ');
        }
        query.push_str(&"(".repeat(left_parentheses(tree, *id)));
        query.push_str(&emitter.predicate(&fragment));
        query.push_str(&")".repeat(right_parentheses(tree, *id)));
    }

    query.trim().to_string()
}

/// Compile the tree into `dialect`.
pub fn compile(
    tree: &ClauseTree,
    dialect: Dialect,
    options: &CompileOptions,
) -> Result<String, QueryBuilderError> {
    let query = match dialect {
        Dialect::FilterExpression => emit(tree, &FilterExpressionEmitter, options),
        Dialect::Sql => emit(tree, &SqlEmitter, options),
        Dialect::Cql => {
            let emitter = CqlEmitter::from_options(options)?;
            emit(tree, &emitter, options)
        }
    };
    debug!(%dialect, clauses = tree.len(), "compiled query");
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Clause;
    use crate::types::{Combinator, EdmType};
    use chrono::{FixedOffset, TimeZone, Utc};

    /// Renders `field op value` so the walk can be checked on its own.
    struct PlainEmitter;

    impl DialectEmitter for PlainEmitter {
        fn select_clause(&self, _options: &CompileOptions) -> Option<String> {
            None
        }

        fn predicate(&self, fragment: &ClauseFragment<'_>) -> String {
            format!(
                "{}{}{}",
                fragment.field,
                fragment.operator.symbol(),
                fragment.value.text()
            )
        }
    }

    fn options() -> CompileOptions {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        CompileOptions::new(TimeContext::fixed(now, FixedOffset::east_opt(0).unwrap()))
    }

    fn string_clause(combinator: Combinator, field: &str, value: &str) -> Clause {
        Clause::literal(
            combinator,
            field,
            DataType::Edm(EdmType::String),
            Operator::Equal,
            value,
        )
    }

    #[test]
    fn test_emit_joins_with_effective_combinators() {
        let mut tree = ClauseTree::new();
        let root = tree.root();
        tree.insert_before(root, string_clause(Combinator::Or, "a", "1"), None);
        tree.insert_before(root, string_clause(Combinator::Or, "b", "2"), None);
        tree.insert_before(root, string_clause(Combinator::None, "c", "3"), None);

        assert_eq!(emit(&tree, &PlainEmitter, &options()), "a=1 or b=2 and c=3");
    }

    #[test]
    fn test_emit_wraps_groups_in_parentheses() {
        let mut tree = ClauseTree::new();
        let root = tree.root();
        let ids: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|f| tree.insert_before(root, string_clause(Combinator::And, f, "x"), None))
            .collect();
        for id in &ids[1..] {
            tree.clause_mut(*id).unwrap().set_selected(true);
        }
        assert!(tree.group_selected(root));

        assert_eq!(
            emit(&tree, &PlainEmitter, &options()),
            "a=x and (b=x and c=x)"
        );
    }

    #[test]
    fn test_empty_tree() {
        let tree = ClauseTree::new();
        assert_eq!(emit(&tree, &PlainEmitter, &options()), "");
        assert_eq!(
            compile(&tree, Dialect::Sql, &options()).unwrap(),
            "SELECT * FROM c"
        );
    }

    #[test]
    fn test_cql_requires_table_reference() {
        let tree = ClauseTree::new();
        assert_eq!(
            compile(&tree, Dialect::Cql, &options()),
            Err(QueryBuilderError::MissingTableReference)
        );
    }

    #[test]
    fn test_dialect_names() {
        assert_eq!("OData".parse::<Dialect>().unwrap(), Dialect::FilterExpression);
        assert_eq!("cql".parse::<Dialect>().unwrap(), Dialect::Cql);
        assert!("gremlin".parse::<Dialect>().is_err());
        assert_eq!(Dialect::Sql.to_string(), "sql");
    }
}
