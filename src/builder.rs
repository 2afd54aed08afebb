//! The query builder facade: one clause tree plus the table it is built for.
//!
//! Clauses are addressed by [`NodeId`]; positions used by `add_clause` are
//! indices into the flattened clause list as shown to the user.

use serde::Serialize;
use tracing::{debug, warn};

use crate::clause::{Clause, ClauseState, ValueMode};
use crate::compiler::{compile, CompileOptions, Dialect};
use crate::config::{BuilderConfig, TableSchema};
use crate::depth::{group_markers, GroupMarker};
use crate::error::QueryBuilderError;
use crate::group::{ClauseTree, NodeId};
use crate::timestamp::TimeContext;
use crate::types::{ApiKind, Combinator, DataType, Operator, PARTITION_KEY, ROW_KEY};

/// A clause row as presented to an editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseView {
    pub id: NodeId,
    pub combinator: Combinator,
    pub field: String,
    pub data_type: DataType,
    pub operator: Operator,
    pub value: ValueMode,
    pub state: ClauseState,
    pub selected: bool,
    pub group_depth: usize,
    /// The leading clause has no combinator to choose, and neither does any
    /// clause of a Cassandra table.
    pub can_change_combinator: bool,
    pub operator_editable: bool,
    pub value_editable: bool,
    pub type_editable: bool,
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    tree: ClauseTree,
    config: BuilderConfig,
}

impl QueryBuilder {
    pub fn new(api: ApiKind) -> Self {
        Self::from_config(BuilderConfig {
            api,
            ..Default::default()
        })
    }

    pub fn from_config(config: BuilderConfig) -> Self {
        Self {
            tree: ClauseTree::new(),
            config,
        }
    }

    pub fn api(&self) -> ApiKind {
        self.config.api
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn tree(&self) -> &ClauseTree {
        &self.tree
    }

    /// Replace the column information used for type inference and editability.
    pub fn set_schema(&mut self, schema: TableSchema) {
        self.config.schema = schema;
    }

    /// Insert a new clause before the clause at `position` (in the group that
    /// clause belongs to), or append it to the root when `position` is past
    /// the end. The new clause is joined with `And`.
    pub fn add_clause(&mut self, position: usize, field: Option<&str>) -> NodeId {
        let anchor = self.tree.flatten().get(position).copied();
        let mut clause = Clause::new(self.config.api);
        if let Some(field) = field {
            clause.set_field(field, self.config.api, &self.config.schema);
        }
        let id = self.tree.insert_before(self.tree.root(), clause, anchor);
        debug!(%id, position, "clause added");
        id
    }

    /// Remove a clause; stale ids are ignored.
    pub fn delete_clause(&mut self, id: NodeId) {
        if self.tree.clause(id).is_some() {
            self.tree.delete(id);
            debug!(%id, "clause deleted");
        }
    }

    /// Drop every clause and start over with one blank clause.
    pub fn clear(&mut self) {
        self.tree.remove_all();
        self.add_clause(0, None);
    }

    pub fn set_clause_field(&mut self, id: NodeId, field: &str) -> Result<(), QueryBuilderError> {
        let api = self.config.api;
        let clause = Self::clause_in(&mut self.tree, id)?;
        clause.set_field(field, api, &self.config.schema);
        Ok(())
    }

    pub fn set_clause_type(&mut self, id: NodeId, data_type: DataType) -> Result<(), QueryBuilderError> {
        Self::clause_in(&mut self.tree, id)?.set_data_type(data_type);
        Ok(())
    }

    pub fn set_clause_operator(&mut self, id: NodeId, operator: Operator) -> Result<(), QueryBuilderError> {
        Self::clause_in(&mut self.tree, id)?.set_operator(operator);
        Ok(())
    }

    /// Preset and custom range values are only accepted on DateTime clauses.
    pub fn set_clause_value(&mut self, id: NodeId, value: ValueMode) -> Result<(), QueryBuilderError> {
        let clause = Self::clause_in(&mut self.tree, id)?;
        let mode = value.name();
        if clause.set_value(value) {
            Ok(())
        } else {
            Err(QueryBuilderError::ValueModeRequiresDateTime {
                id,
                mode,
                data_type: clause.data_type().to_string(),
            })
        }
    }

    /// Has no visible effect on the leading clause, which never emits one.
    /// CQL has no `or`, so Cassandra tables only keep `And`.
    pub fn set_clause_combinator(&mut self, id: NodeId, combinator: Combinator) -> Result<(), QueryBuilderError> {
        let combinator = match (self.config.api, combinator) {
            (ApiKind::Cassandra, Combinator::Or) => {
                warn!(%id, "or is not available for cassandra tables, using and");
                Combinator::And
            }
            (_, combinator) => combinator,
        };
        Self::clause_in(&mut self.tree, id)?.set_combinator(combinator);
        Ok(())
    }

    /// Mark or unmark a clause for grouping; stale ids are ignored.
    pub fn toggle_selection(&mut self, id: NodeId, selected: bool) {
        if let Some(clause) = self.tree.clause_mut(id) {
            clause.set_selected(selected);
        }
    }

    /// Group the selected run of root-level items.
    pub fn group_selected(&mut self) -> bool {
        let root = self.tree.root();
        self.tree.group_selected(root)
    }

    pub fn can_group_selected(&self) -> bool {
        self.tree.can_group_selected(self.tree.root())
    }

    /// Dissolve a group into its parent; accepts a group id or the id of a
    /// clause, in which case the clause's own group is dissolved.
    pub fn ungroup(&mut self, id: NodeId) {
        let group = if self.tree.is_group(id) {
            Some(id)
        } else {
            self.tree.parent(id)
        };
        if let Some(group) = group {
            self.tree.ungroup(group);
        }
    }

    /// Clause rows in display order.
    pub fn flatten(&self) -> Vec<ClauseView> {
        let api = self.config.api;
        let schema = &self.config.schema;
        self.tree
            .flatten()
            .into_iter()
            .enumerate()
            .filter_map(|(position, id)| {
                let clause = self.tree.clause(id)?;
                Some(ClauseView {
                    id,
                    combinator: clause.effective_combinator(position == 0),
                    field: clause.field().to_string(),
                    data_type: clause.data_type(),
                    operator: clause.operator(),
                    value: clause.value().clone(),
                    state: clause.state(),
                    selected: clause.is_selected(),
                    group_depth: self.tree.clause_depth(id),
                    can_change_combinator: position > 0 && api != ApiKind::Cassandra,
                    operator_editable: clause.is_operator_editable(api, schema),
                    value_editable: clause.is_value_editable(api, schema),
                    type_editable: clause.is_type_editable(api),
                })
            })
            .collect()
    }

    /// Bracket column for one clause row.
    pub fn group_markers(&self, id: NodeId) -> Result<Vec<GroupMarker>, QueryBuilderError> {
        if self.tree.clause(id).is_none() {
            return Err(QueryBuilderError::UnknownClause(id));
        }
        Ok(group_markers(&self.tree, id))
    }

    /// Replace the tree with `PartitionKey = pk and RowKey = rk`.
    pub fn set_example(&mut self, partition_key: &str, row_key: &str) {
        self.tree.remove_all();
        let string = DataType::string_for(self.config.api);
        let root = self.tree.root();
        for (field, value) in [(PARTITION_KEY, partition_key), (ROW_KEY, row_key)] {
            let clause = Clause::literal(Combinator::And, field, string, Operator::Equal, value);
            self.tree.insert_before(root, clause, None);
        }
    }

    /// Turn a DateTime clause into `>= start` and add a sibling `< end`
    /// right after it. Returns the id of the new clause.
    pub fn add_custom_range(
        &mut self,
        id: NodeId,
        start: &str,
        end: &str,
        is_local: bool,
    ) -> Result<NodeId, QueryBuilderError> {
        let clause = Self::clause_in(&mut self.tree, id)?;
        if !clause.data_type().is_date_time() {
            return Err(QueryBuilderError::ValueModeRequiresDateTime {
                id,
                mode: "custom range",
                data_type: clause.data_type().to_string(),
            });
        }
        clause.set_operator(Operator::GreaterThanOrEqualTo);
        clause.set_value(ValueMode::CustomRange {
            start: start.to_string(),
            is_local,
        });

        let mut upper = Clause::literal(
            Combinator::And,
            clause.field(),
            DataType::DATE_TIME,
            Operator::LessThan,
            "",
        );
        upper.set_value(ValueMode::CustomRange {
            start: end.to_string(),
            is_local,
        });
        Ok(self.tree.insert_after(id, upper))
    }

    /// Compile against the system clock.
    pub fn compile(&self, dialect: Dialect, selected_columns: &[String]) -> Result<String, QueryBuilderError> {
        let mut options = CompileOptions::new(TimeContext::system());
        options.selected_columns = selected_columns.to_vec();
        self.compile_with(dialect, options)
    }

    /// Compile with an explicit clock; keyspace and table default to the config.
    pub fn compile_with(&self, dialect: Dialect, mut options: CompileOptions) -> Result<String, QueryBuilderError> {
        if options.keyspace.is_none() {
            options.keyspace = self.config.keyspace.clone();
        }
        if options.table.is_none() {
            options.table = self.config.table.clone();
        }
        compile(&self.tree, dialect, &options)
    }

    fn clause_in(tree: &mut ClauseTree, id: NodeId) -> Result<&mut Clause, QueryBuilderError> {
        tree.clause_mut(id).ok_or(QueryBuilderError::UnknownClause(id))
    }
}
