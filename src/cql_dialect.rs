//! CQL rendering for column-store tables.

use sea_query::{Asterisk, Expr, Iden, PostgresQueryBuilder, Query};

use crate::compiler::{ClauseFragment, CompileOptions, DialectEmitter};
use crate::error::QueryBuilderError;
use crate::types::DataType;

/// Keyspace or table name. Quoted with `"`, embedded quotes doubled,
/// which CQL shares with PostgreSQL.
#[derive(Debug, Clone)]
struct CqlName(String);

impl Iden for CqlName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        let _ = s.write_str(&self.0);
    }
}

#[derive(Debug, Clone)]
pub struct CqlEmitter {
    keyspace: String,
    table: String,
}

impl CqlEmitter {
    pub fn new(keyspace: &str, table: &str) -> Self {
        Self {
            keyspace: keyspace.to_string(),
            table: table.to_string(),
        }
    }

    /// Both the keyspace and the table are required.
    pub fn from_options(options: &CompileOptions) -> Result<Self, QueryBuilderError> {
        match (&options.keyspace, &options.table) {
            (Some(keyspace), Some(table)) => Ok(Self::new(keyspace, table)),
            _ => Err(QueryBuilderError::MissingTableReference),
        }
    }

    /// `SELECT <columns|*> FROM "keyspace"."table"`
    ///
    /// Columns stay bare, the same as in the WHERE predicates.
    pub fn select_head(&self, columns: &[String]) -> String {
        let mut select = Query::select();
        if columns.is_empty() {
            select.column(Asterisk);
        } else {
            for column in columns {
                select.expr(Expr::cust(column.clone()));
            }
        }
        select
            .from((CqlName(self.keyspace.clone()), CqlName(self.table.clone())))
            .to_string(PostgresQueryBuilder)
    }
}

impl DialectEmitter for CqlEmitter {
    fn select_clause(&self, options: &CompileOptions) -> Option<String> {
        Some(self.select_head(&options.selected_columns))
    }

    fn predicate(&self, fragment: &ClauseFragment<'_>) -> String {
        let text = fragment.value.text();
        let literal = match fragment.data_type {
            DataType::Cql(cql) if cql.is_text_like() => format!("'{}'", text),
            _ => text,
        };
        format!("{} {} {}", fragment.field, fragment.operator.symbol(), literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::EffectiveValue;
    use crate::types::{CqlType, Operator};

    fn fragment(data_type: CqlType, value: &str) -> ClauseFragment<'static> {
        ClauseFragment {
            field: "col",
            data_type: DataType::Cql(data_type),
            operator: Operator::NotEqualTo,
            value: EffectiveValue::Literal(value.to_string()),
        }
    }

    #[test]
    fn test_select_head_quotes_table_reference() {
        let emitter = CqlEmitter::new("store", "My\"Table");
        assert_eq!(emitter.select_head(&[]), r#"SELECT * FROM "store"."My""Table""#);
        assert_eq!(
            emitter.select_head(&["userid".to_string(), "total".to_string()]),
            r#"SELECT userid, total FROM "store"."My""Table""#
        );
    }

    #[test]
    fn test_mixed_case_columns_match_predicates() {
        let emitter = CqlEmitter::new("store", "orders");
        let head = emitter.select_head(&["userId".to_string()]);
        assert_eq!(head, r#"SELECT userId FROM "store"."orders""#);

        let mut frag = fragment(CqlType::Text, "u1");
        frag.field = "userId";
        assert_eq!(emitter.predicate(&frag), "userId <> 'u1'");
    }

    #[test]
    fn test_text_like_types_are_quoted() {
        let emitter = CqlEmitter::new("ks", "t");
        for cql in [CqlType::Text, CqlType::Ascii, CqlType::Varchar, CqlType::Inet] {
            assert_eq!(emitter.predicate(&fragment(cql, "v")), "col <> 'v'");
        }
        for cql in [CqlType::Int, CqlType::Uuid, CqlType::Boolean, CqlType::Decimal] {
            assert_eq!(emitter.predicate(&fragment(cql, "v")), "col <> v");
        }
    }
}
