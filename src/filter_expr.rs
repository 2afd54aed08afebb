//! Filter-expression (OData `$filter`) rendering.

use tracing::warn;

use crate::compiler::{ClauseFragment, CompileOptions, DialectEmitter};
use crate::timestamp::{format_instant, EffectiveValue};
use crate::types::{DataType, EdmType};

/// Renders `field op literal` with the two-letter comparison tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterExpressionEmitter;

impl FilterExpressionEmitter {
    fn literal(&self, fragment: &ClauseFragment<'_>) -> String {
        let edm = match fragment.data_type {
            DataType::Edm(edm) => edm,
            DataType::Cql(cql) => {
                warn!(
                    field = fragment.field,
                    data_type = cql.as_str(),
                    "column-store type in a filter expression, emitting bare value"
                );
                return fragment.value.text();
            }
        };

        match edm {
            EdmType::DateTime => date_time_literal(&fragment.value),
            EdmType::String => format!("'{}'", fragment.value.text()),
            EdmType::Guid => format!("guid'{}'", fragment.value.text()),
            EdmType::Binary => format!("binary'{}'", fragment.value.text()),
            EdmType::Boolean | EdmType::Double | EdmType::Int32 | EdmType::Int64 => {
                fragment.value.text()
            }
        }
    }
}

/// Every DateTime value is printed as `datetime'…'`. Literal text that is
/// already written that way passes through.
fn date_time_literal(value: &EffectiveValue) -> String {
    match value {
        EffectiveValue::Literal(text) if text.starts_with("datetime'") => text.clone(),
        EffectiveValue::Literal(text) => match value.instant() {
            Some(instant) => format!("datetime'{}'", format_instant(instant)),
            None => {
                warn!(value = %text, "DateTime value is not a date, wrapping it as is");
                format!("datetime'{}'", text)
            }
        },
        EffectiveValue::Instant(instant) => format!("datetime'{}'", format_instant(*instant)),
        EffectiveValue::Unparsed { text, is_local: true } => format!("datetime'{}'", text),
        EffectiveValue::Unparsed { text, is_local: false } => format!("datetime'{}Z'", text),
    }
}

impl DialectEmitter for FilterExpressionEmitter {
    fn select_clause(&self, _options: &CompileOptions) -> Option<String> {
        None
    }

    fn predicate(&self, fragment: &ClauseFragment<'_>) -> String {
        format!(
            "{} {} {}",
            fragment.field,
            fragment.operator.filter_token(),
            self.literal(fragment)
        )
    }
}
