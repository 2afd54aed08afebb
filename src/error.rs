//! Error types for the query builder.

use thiserror::Error;

use crate::group::NodeId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryBuilderError {
    #[error("no clause with id {0}")]
    UnknownClause(NodeId),

    #[error("{mode} values are only allowed on DateTime clauses, clause {id} is {data_type}")]
    ValueModeRequiresDateTime {
        id: NodeId,
        mode: &'static str,
        data_type: String,
    },

    #[error("the CQL dialect needs both a keyspace and a table name")]
    MissingTableReference,

    #[error("unknown {kind}: '{value}'")]
    UnknownName { kind: &'static str, value: String },
}

impl QueryBuilderError {
    pub(crate) fn unknown_name(kind: &'static str, value: &str) -> Self {
        Self::UnknownName {
            kind,
            value: value.to_string(),
        }
    }
}
