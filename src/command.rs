//! 交互命令及其执行
//!
//! 每一行输入解析为一个 [`Command`], 再作用到 [`QueryBuilder`] 上。

use std::fmt::Write;

use crate::builder::{ClauseView, QueryBuilder};
use crate::clause::ValueMode;
use crate::compiler::Dialect;
use crate::depth::GroupMarker;
use crate::error::QueryBuilderError;
use crate::group::NodeId;
use crate::types::{ApiKind, Combinator, DataType, Operator, TimePreset};

pub const HELP: &str = "\
命令:
  add [位置] [字段]              在指定位置插入子句 (默认追加到末尾)
  del <#id>                      删除子句
  field <#id> <字段>             设置字段
  type <#id> <类型>              设置数据类型
  op <#id> <= | > | >= | < | <= | <>>
  value <#id> <值>               设置值, 含空格时用双引号
  preset <#id> <预设>            时间预设, 例如 \"last 7 days\"
  range <#id> <开始> <结束> [local|utc]
  and <#id> | or <#id>           设置连接词
  select <#id>... | unselect <#id>...
  group                          将选中的相邻子句编为一组
  ungroup <#id>                  解散分组 (可传组内任一子句)
  list                           列出全部子句
  compile [filter|sql|cql] [列...]
  example <分区键> <行键>
  clear | help | quit";

/// 一条解析后的交互命令
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// 插入子句; 没有位置时追加到末尾
    Add {
        position: Option<usize>,
        field: Option<String>,
    },
    Delete(NodeId),
    Field(NodeId, String),
    /// 类型名按当前 API 的类型族解析, 所以保留原始文本
    Type(NodeId, String),
    Operator(NodeId, Operator),
    Value(NodeId, String),
    Preset(NodeId, TimePreset),
    Range {
        id: NodeId,
        start: String,
        end: String,
        is_local: bool,
    },
    Combinator(NodeId, Combinator),
    Select(Vec<NodeId>),
    Unselect(Vec<NodeId>),
    Group,
    Ungroup(NodeId),
    List,
    /// 没有指定方言时按 API 选择默认方言
    Compile {
        dialect: Option<Dialect>,
        columns: Vec<String>,
    },
    Example {
        partition_key: String,
        row_key: String,
    },
    Clear,
    Help,
    Quit,
}

/// 命令执行的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Output(String),
    Quit,
}

impl Command {
    pub fn execute(self, builder: &mut QueryBuilder) -> Result<Outcome, QueryBuilderError> {
        let message = match self {
            Command::Add { position, field } => {
                let position = position.unwrap_or_else(|| builder.tree().len());
                let id = builder.add_clause(position, field.as_deref());
                format!("已添加子句 {}", id)
            }
            Command::Delete(id) => {
                builder.delete_clause(id);
                format!("已删除 {}", id)
            }
            Command::Field(id, field) => {
                builder.set_clause_field(id, &field)?;
                render_rows(builder)
            }
            Command::Type(id, name) => {
                let data_type = DataType::parse(&name, builder.api())
                    .ok_or_else(|| QueryBuilderError::unknown_name("type", &name))?;
                builder.set_clause_type(id, data_type)?;
                render_rows(builder)
            }
            Command::Operator(id, operator) => {
                builder.set_clause_operator(id, operator)?;
                render_rows(builder)
            }
            Command::Value(id, value) => {
                builder.set_clause_value(id, ValueMode::Literal(value))?;
                render_rows(builder)
            }
            Command::Preset(id, preset) => {
                builder.set_clause_value(id, ValueMode::TimePreset(preset))?;
                render_rows(builder)
            }
            Command::Range {
                id,
                start,
                end,
                is_local,
            } => {
                let upper = builder.add_custom_range(id, &start, &end, is_local)?;
                format!("已添加上界子句 {}\n{}", upper, render_rows(builder))
            }
            Command::Combinator(id, combinator) => {
                builder.set_clause_combinator(id, combinator)?;
                render_rows(builder)
            }
            Command::Select(ids) => {
                ids.into_iter().for_each(|id| builder.toggle_selection(id, true));
                render_rows(builder)
            }
            Command::Unselect(ids) => {
                ids.into_iter().for_each(|id| builder.toggle_selection(id, false));
                render_rows(builder)
            }
            Command::Group => {
                if builder.group_selected() {
                    render_rows(builder)
                } else {
                    "无法分组: 需要至少两个相邻的选中项".to_string()
                }
            }
            Command::Ungroup(id) => {
                builder.ungroup(id);
                render_rows(builder)
            }
            Command::List => render_rows(builder),
            Command::Compile { dialect, columns } => {
                let dialect = dialect.unwrap_or(match builder.api() {
                    ApiKind::Tables => Dialect::FilterExpression,
                    ApiKind::Cassandra => Dialect::Cql,
                });
                builder.compile(dialect, &columns)?
            }
            Command::Example {
                partition_key,
                row_key,
            } => {
                builder.set_example(&partition_key, &row_key);
                render_rows(builder)
            }
            Command::Clear => {
                builder.clear();
                render_rows(builder)
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Output(message))
    }
}

/// 每个子句一行, 左侧画出分组括号
pub fn render_rows(builder: &QueryBuilder) -> String {
    let rows = builder.flatten();
    if rows.is_empty() {
        return "(空)".to_string();
    }

    let mut out = String::new();
    for row in &rows {
        let markers = builder.group_markers(row.id).unwrap_or_default();
        let _ = writeln!(out, "{}{}", bracket_column(&markers), describe(row));
    }
    out.trim_end().to_string()
}

fn bracket_column(markers: &[GroupMarker]) -> String {
    markers
        .iter()
        .map(|marker| match marker {
            GroupMarker { group: None, .. } => "  ",
            GroupMarker {
                show_left_border: false,
                ..
            } => "─ ",
            GroupMarker {
                is_first_in_group: true,
                ..
            } => "┌ ",
            GroupMarker {
                show_bottom_border: true,
                ..
            } => "└ ",
            _ => "│ ",
        })
        .collect()
}

fn describe(row: &ClauseView) -> String {
    let value = match &row.value {
        ValueMode::Literal(text) => format!("\"{}\"", text),
        ValueMode::TimePreset(preset) => preset.label().to_string(),
        ValueMode::CustomRange { start, is_local } => {
            format!("{} ({})", start, if *is_local { "local" } else { "utc" })
        }
    };
    let field = if row.field.is_empty() { "?" } else { row.field.as_str() };
    format!(
        "{:>4} {}{:<3} {} {} {} : {}",
        row.id.to_string(),
        if row.selected { '*' } else { ' ' },
        row.combinator.as_lower(),
        field,
        row.operator.symbol(),
        value,
        row.data_type
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuilderConfig;

    fn run(builder: &mut QueryBuilder, command: Command) -> String {
        match command.execute(builder).unwrap() {
            Outcome::Output(text) => text,
            Outcome::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn test_build_and_compile() {
        let mut builder = QueryBuilder::from_config(BuilderConfig::sample(ApiKind::Tables));
        run(
            &mut builder,
            Command::Example {
                partition_key: "foo".to_string(),
                row_key: "bar".to_string(),
            },
        );
        let query = run(
            &mut builder,
            Command::Compile {
                dialect: None,
                columns: vec![],
            },
        );
        assert_eq!(query, "PartitionKey eq 'foo' and RowKey eq 'bar'");
    }

    #[test]
    fn test_unknown_type_name() {
        let mut builder = QueryBuilder::new(ApiKind::Cassandra);
        let id = builder.add_clause(0, None);
        let err = Command::Type(id, "Int64".to_string())
            .execute(&mut builder)
            .unwrap_err();
        assert_eq!(err, QueryBuilderError::unknown_name("type", "Int64"));
    }

    #[test]
    fn test_group_refusal_is_reported() {
        let mut builder = QueryBuilder::new(ApiKind::Tables);
        builder.add_clause(0, None);
        let text = run(&mut builder, Command::Group);
        assert!(text.starts_with("无法分组"));
    }

    #[test]
    fn test_render_rows_draws_brackets() {
        let mut builder = QueryBuilder::from_config(BuilderConfig::sample(ApiKind::Tables));
        let a = builder.add_clause(0, Some("Name"));
        let b = builder.add_clause(1, Some("Count"));
        builder.add_clause(2, Some("Price"));
        run(&mut builder, Command::Select(vec![a, b]));
        run(&mut builder, Command::Group);

        let text = render_rows(&builder);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("┌ "));
        assert!(lines[1].starts_with("└ "));
        assert!(lines[2].starts_with("  "));
        assert!(lines[1].contains("and Count = \"\" : Int64"));
    }

    #[test]
    fn test_quit() {
        let mut builder = QueryBuilder::new(ApiKind::Tables);
        assert_eq!(Command::Quit.execute(&mut builder).unwrap(), Outcome::Quit);
    }
}
