//! Clause-tree query builder for table-style data stores.
//!
//! A [`QueryBuilder`] holds a tree of filter clauses and nested groups and
//! compiles it into an OData-style filter expression, a document-database
//! SQL query or a CQL query.

pub mod builder;
pub mod clause;
pub mod command;
pub mod compiler;
pub mod config;
pub mod cql_dialect;
pub mod depth;
pub mod error;
pub mod filter_expr;
pub mod group;
pub mod lexer;
pub mod parser;
pub mod sql_dialect;
pub mod timestamp;
pub mod token;
pub mod types;

pub use builder::{ClauseView, QueryBuilder};
pub use clause::{Clause, ClauseState, ValueMode};
pub use compiler::{compile, CompileOptions, Dialect};
pub use config::{BuilderConfig, ConfigError, TableSchema};
pub use error::QueryBuilderError;
pub use group::{ClauseTree, NodeId};
pub use types::{ApiKind, Combinator, DataType, Operator, TimePreset};
