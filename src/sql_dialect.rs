//! Document-database SQL rendering over the entity container `c`.
//!
//! Entities are stored with the partition key under `$pk`, the row key as
//! `id` and the timestamp as `_ts`; every other property is an object whose
//! `$v` member holds the value. Int64 and DateTime values are stored as
//! zero-padded strings so that they compare correctly as text.

use tracing::warn;

use crate::compiler::{ClauseFragment, CompileOptions, DialectEmitter};
use crate::timestamp::{ticks_with_padding, unix_seconds};
use crate::types::{DataType, EdmType, PARTITION_KEY, ROW_KEY, TIMESTAMP};

const PARTITION_KEY_PATH: &str = r#"c["$pk"]"#;
const ROW_KEY_PATH: &str = "c.id";
const TIMESTAMP_PATH: &str = "c._ts";

/// Left-pad a 64-bit integer literal with zeros to 20 characters.
/// Longer input is kept whole.
pub fn pad_long_with_zeros(value: &str) -> String {
    format!("{:0>20}", value)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlEmitter;

impl SqlEmitter {
    fn projection(column: &str) -> String {
        match column {
            PARTITION_KEY => PARTITION_KEY_PATH.to_string(),
            ROW_KEY => r#"c["id"]"#.to_string(),
            TIMESTAMP => TIMESTAMP_PATH.to_string(),
            other => format!("c.{}", other),
        }
    }

    fn property_literal(&self, fragment: &ClauseFragment<'_>) -> String {
        let text = fragment.value.text();
        match fragment.data_type {
            DataType::Edm(EdmType::DateTime) => match fragment.value.instant() {
                Some(instant) => match ticks_with_padding(instant) {
                    Some(ticks) => format!("'{}'", ticks),
                    None => {
                        warn!(
                            field = fragment.field,
                            value = %text,
                            "DateTime value is out of tick range, emitting it as text"
                        );
                        format!("'{}'", text)
                    }
                },
                None => {
                    warn!(
                        field = fragment.field,
                        value = %text,
                        "DateTime value is not a date, emitting it as text"
                    );
                    format!("'{}'", text)
                }
            },
            DataType::Edm(EdmType::Int64) => format!("'{}'", pad_long_with_zeros(&text)),
            DataType::Edm(EdmType::String | EdmType::Guid | EdmType::Binary) => {
                format!("'{}'", text)
            }
            DataType::Edm(_) => text,
            DataType::Cql(cql) => {
                warn!(
                    field = fragment.field,
                    data_type = cql.as_str(),
                    "column-store type in a SQL query, emitting bare value"
                );
                text
            }
        }
    }

    fn timestamp_literal(&self, fragment: &ClauseFragment<'_>) -> String {
        match fragment.value.instant() {
            Some(instant) => unix_seconds(instant).to_string(),
            None => {
                let text = fragment.value.text();
                warn!(value = %text, "timestamp value is not a date, emitting it as text");
                format!("'{}'", text)
            }
        }
    }
}

impl DialectEmitter for SqlEmitter {
    fn select_clause(&self, options: &CompileOptions) -> Option<String> {
        if options.selected_columns.is_empty() {
            return Some("SELECT * FROM c".to_string());
        }
        let columns: Vec<String> = options
            .selected_columns
            .iter()
            .map(|column| Self::projection(column))
            .collect();
        Some(format!("SELECT {} FROM c", columns.join(", ")))
    }

    fn predicate(&self, fragment: &ClauseFragment<'_>) -> String {
        let op = fragment.operator.symbol();
        let text = fragment.value.text();
        match fragment.field {
            PARTITION_KEY => format!("{} {} '{}'", PARTITION_KEY_PATH, op, text),
            ROW_KEY => format!("{} {} '{}'", ROW_KEY_PATH, op, text),
            TIMESTAMP => format!("{} {} {}", TIMESTAMP_PATH, op, self.timestamp_literal(fragment)),
            field => format!(r#"c.{}["$v"] {} {}"#, field, op, self.property_literal(fragment)),
        }
    }
}
