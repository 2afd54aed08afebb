//! A single filter predicate and the derived state that drives its editing.

use serde::Serialize;

use crate::config::TableSchema;
use crate::types::{
    is_reserved_field, ApiKind, Combinator, DataType, Operator, TimePreset, PARTITION_KEY, ROW_KEY,
    TIMESTAMP,
};

/// What a clause compares against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum ValueMode {
    /// Plain text typed by the user.
    Literal(String),
    /// A rolling or calendar window ending now.
    TimePreset(TimePreset),
    /// An absolute start time, entered either in local time or UTC.
    CustomRange { start: String, is_local: bool },
}

impl ValueMode {
    pub fn empty() -> Self {
        ValueMode::Literal(String::new())
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueMode::Literal(_) => "literal",
            ValueMode::TimePreset(_) => "time preset",
            ValueMode::CustomRange { .. } => "custom range",
        }
    }
}

/// Editing state derived from a clause's value mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClauseState {
    Value,
    TimestampPreset,
    CustomRangeTimestamp,
    /// "Last N units". Reserved: no transition produces it.
    CustomLastTimestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    combinator: Combinator,
    field: String,
    data_type: DataType,
    operator: Operator,
    value: ValueMode,
    selected: bool,
}

impl Clause {
    /// A blank clause joined with `And`, typed with the API's string type.
    pub fn new(api: ApiKind) -> Self {
        Self {
            combinator: Combinator::And,
            field: String::new(),
            data_type: DataType::string_for(api),
            operator: Operator::Equal,
            value: ValueMode::empty(),
            selected: false,
        }
    }

    /// A literal predicate, bypassing the field-driven transitions.
    pub fn literal(
        combinator: Combinator,
        field: &str,
        data_type: DataType,
        operator: Operator,
        value: &str,
    ) -> Self {
        Self {
            combinator,
            field: field.to_string(),
            data_type,
            operator,
            value: ValueMode::Literal(value.to_string()),
            selected: false,
        }
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &ValueMode {
        &self.value
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn state(&self) -> ClauseState {
        match self.value {
            ValueMode::Literal(_) => ClauseState::Value,
            ValueMode::TimePreset(_) => ClauseState::TimestampPreset,
            ValueMode::CustomRange { .. } => ClauseState::CustomRangeTimestamp,
        }
    }

    /// The joiner actually emitted: none for the leading clause of the tree,
    /// `And` when nothing was chosen elsewhere.
    pub fn effective_combinator(&self, is_leading: bool) -> Combinator {
        match (is_leading, self.combinator) {
            (true, _) => Combinator::None,
            (false, Combinator::None) => Combinator::And,
            (false, chosen) => chosen,
        }
    }

    /// Choose the field; reserved fields pin type, operator and value mode.
    pub fn set_field(&mut self, field: &str, api: ApiKind, schema: &TableSchema) {
        self.field = field.to_string();
        match field {
            TIMESTAMP => self.enter_timestamp_preset(),
            PARTITION_KEY | ROW_KEY => {
                self.reset_to_value();
                self.data_type = DataType::string_for(api);
            }
            _ => {
                self.reset_to_value();
                self.data_type = schema
                    .data_type_of(field, api)
                    .unwrap_or_else(|| DataType::string_for(api));
            }
        }
    }

    /// Choose the type; DateTime switches to preset editing, anything else to plain values.
    pub fn set_data_type(&mut self, data_type: DataType) {
        self.data_type = data_type;
        if data_type.is_date_time() {
            self.enter_timestamp_preset();
        } else {
            self.reset_to_value();
        }
    }

    pub fn set_operator(&mut self, operator: Operator) {
        self.operator = operator;
    }

    pub(crate) fn set_combinator(&mut self, combinator: Combinator) {
        self.combinator = combinator;
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Only DateTime clauses may hold a non-literal value.
    pub fn accepts_value(&self, value: &ValueMode) -> bool {
        matches!(value, ValueMode::Literal(_)) || self.data_type.is_date_time()
    }

    /// Store `value` if [`Clause::accepts_value`] allows it; returns whether it was stored.
    pub fn set_value(&mut self, value: ValueMode) -> bool {
        if !self.accepts_value(&value) {
            return false;
        }
        self.value = value;
        true
    }

    pub fn is_operator_editable(&self, api: ApiKind, schema: &TableSchema) -> bool {
        matches!(
            self.state(),
            ClauseState::Value | ClauseState::CustomRangeTimestamp
        ) && (api != ApiKind::Cassandra || !schema.is_partition_key(&self.field))
    }

    pub fn is_value_editable(&self, api: ApiKind, schema: &TableSchema) -> bool {
        self.is_operator_editable(api, schema)
    }

    pub fn is_type_editable(&self, api: ApiKind) -> bool {
        !is_reserved_field(&self.field) && api != ApiKind::Cassandra
    }

    fn enter_timestamp_preset(&mut self) {
        self.data_type = DataType::DATE_TIME;
        self.operator = Operator::GreaterThanOrEqualTo;
        self.value = ValueMode::TimePreset(TimePreset::default());
    }

    fn reset_to_value(&mut self) {
        self.operator = Operator::Equal;
        self.value = ValueMode::empty();
    }
}
