//! 查询构建器使用的基础词汇：数据类型、运算符、连接符、时间预设

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::QueryBuilderError;

/// 分区键字段名
pub const PARTITION_KEY: &str = "PartitionKey";
/// 行键字段名
pub const ROW_KEY: &str = "RowKey";
/// 时间戳字段名
pub const TIMESTAMP: &str = "Timestamp";

/// 是否为保留字段（分区键、行键、时间戳）
pub fn is_reserved_field(field: &str) -> bool {
    field == PARTITION_KEY || field == ROW_KEY || field == TIMESTAMP
}

/// 树实例使用的 API 类型, 决定可用的数据类型族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKind {
    #[default]
    Tables,
    Cassandra,
}

/// 表存储的基础类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdmType {
    String,
    Boolean,
    Binary,
    DateTime,
    Double,
    Guid,
    Int32,
    Int64,
}

impl EdmType {
    pub const ALL: [EdmType; 8] = [
        EdmType::String,
        EdmType::Boolean,
        EdmType::Binary,
        EdmType::DateTime,
        EdmType::Double,
        EdmType::Guid,
        EdmType::Int32,
        EdmType::Int64,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdmType::String => "String",
            EdmType::Boolean => "Boolean",
            EdmType::Binary => "Binary",
            EdmType::DateTime => "DateTime",
            EdmType::Double => "Double",
            EdmType::Guid => "Guid",
            EdmType::Int32 => "Int32",
            EdmType::Int64 => "Int64",
        }
    }
}

/// 列存储（CQL）类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CqlType {
    Text,
    Ascii,
    Bigint,
    Blob,
    Boolean,
    Decimal,
    Double,
    Float,
    Int,
    Uuid,
    Varchar,
    Varint,
    Inet,
    Smallint,
    Tinyint,
}

impl CqlType {
    pub const ALL: [CqlType; 15] = [
        CqlType::Text,
        CqlType::Ascii,
        CqlType::Bigint,
        CqlType::Blob,
        CqlType::Boolean,
        CqlType::Decimal,
        CqlType::Double,
        CqlType::Float,
        CqlType::Int,
        CqlType::Uuid,
        CqlType::Varchar,
        CqlType::Varint,
        CqlType::Inet,
        CqlType::Smallint,
        CqlType::Tinyint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CqlType::Text => "Text",
            CqlType::Ascii => "Ascii",
            CqlType::Bigint => "Bigint",
            CqlType::Blob => "Blob",
            CqlType::Boolean => "Boolean",
            CqlType::Decimal => "Decimal",
            CqlType::Double => "Double",
            CqlType::Float => "Float",
            CqlType::Int => "Int",
            CqlType::Uuid => "Uuid",
            CqlType::Varchar => "Varchar",
            CqlType::Varint => "Varint",
            CqlType::Inet => "Inet",
            CqlType::Smallint => "Smallint",
            CqlType::Tinyint => "Tinyint",
        }
    }

    /// 在 CQL 中需要用单引号包围的文本类类型
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            CqlType::Text | CqlType::Inet | CqlType::Ascii | CqlType::Varchar
        )
    }
}

/// 子句的数据类型, 同一棵树只会使用其中一个类型族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Edm(EdmType),
    Cql(CqlType),
}

impl DataType {
    pub const DATE_TIME: DataType = DataType::Edm(EdmType::DateTime);

    /// 按 API 类型解析类型名（大小写不敏感）
    pub fn parse(name: &str, api: ApiKind) -> Option<DataType> {
        match api {
            ApiKind::Tables => EdmType::ALL
                .iter()
                .find(|t| t.as_str().eq_ignore_ascii_case(name))
                .map(|t| DataType::Edm(*t)),
            ApiKind::Cassandra => CqlType::ALL
                .iter()
                .find(|t| t.as_str().eq_ignore_ascii_case(name))
                .map(|t| DataType::Cql(*t)),
        }
    }

    /// 该 API 的默认字符串类型
    pub fn string_for(api: ApiKind) -> DataType {
        match api {
            ApiKind::Tables => DataType::Edm(EdmType::String),
            ApiKind::Cassandra => DataType::Cql(CqlType::Text),
        }
    }

    /// 该 API 下可供选择的全部类型
    pub fn options(api: ApiKind) -> Vec<DataType> {
        match api {
            ApiKind::Tables => EdmType::ALL.iter().map(|t| DataType::Edm(*t)).collect(),
            ApiKind::Cassandra => CqlType::ALL.iter().map(|t| DataType::Cql(*t)).collect(),
        }
    }

    pub fn is_date_time(&self) -> bool {
        *self == DataType::DATE_TIME
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Edm(t) => t.as_str(),
            DataType::Cql(t) => t.as_str(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Operator {
    #[default]
    Equal, // =
    GreaterThan,          // >
    GreaterThanOrEqualTo, // >=
    LessThan,             // <
    LessThanOrEqualTo,    // <=
    NotEqualTo,           // <>
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Equal,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqualTo,
        Operator::LessThan,
        Operator::LessThanOrEqualTo,
        Operator::NotEqualTo,
    ];

    /// SQL 与 CQL 中使用的符号
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqualTo => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqualTo => "<=",
            Operator::NotEqualTo => "<>",
        }
    }

    /// 过滤表达式（OData 风格）中使用的单词
    pub fn filter_token(&self) -> &'static str {
        match self {
            Operator::Equal => "eq",
            Operator::GreaterThan => "gt",
            Operator::GreaterThanOrEqualTo => "ge",
            Operator::LessThan => "lt",
            Operator::LessThanOrEqualTo => "le",
            Operator::NotEqualTo => "ne",
        }
    }
}

impl FromStr for Operator {
    type Err = QueryBuilderError;

    /// 接受符号（`>=`）或过滤表达式单词（`ge`）, `==` 与 `!=` 也可以
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.to_ascii_lowercase().as_str() {
            "=" | "==" | "eq" => Operator::Equal,
            ">" | "gt" => Operator::GreaterThan,
            ">=" | "ge" => Operator::GreaterThanOrEqualTo,
            "<" | "lt" => Operator::LessThan,
            "<=" | "le" => Operator::LessThanOrEqualTo,
            "<>" | "!=" | "ne" => Operator::NotEqualTo,
            _ => return Err(QueryBuilderError::unknown_name("operator", s)),
        };
        Ok(op)
    }
}

/// 与前一个兄弟节点的布尔连接符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Combinator {
    #[default]
    None,
    And,
    Or,
}

impl Combinator {
    pub fn as_lower(&self) -> &'static str {
        match self {
            Combinator::None => "",
            Combinator::And => "and",
            Combinator::Or => "or",
        }
    }
}

impl FromStr for Combinator {
    type Err = QueryBuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Combinator::And),
            "or" => Ok(Combinator::Or),
            "" | "none" => Ok(Combinator::None),
            _ => Err(QueryBuilderError::unknown_name("combinator", s)),
        }
    }
}

/// 相对时间预设
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum TimePreset {
    #[default]
    LastHour,
    Last24Hours,
    Last7Days,
    Last31Days,
    Last365Days,
    CurrentMonth,
    CurrentYear,
}

impl TimePreset {
    pub const ALL: [TimePreset; 7] = [
        TimePreset::LastHour,
        TimePreset::Last24Hours,
        TimePreset::Last7Days,
        TimePreset::Last31Days,
        TimePreset::Last365Days,
        TimePreset::CurrentMonth,
        TimePreset::CurrentYear,
    ];

    /// 界面上显示的名称
    pub fn label(&self) -> &'static str {
        match self {
            TimePreset::LastHour => "Last hour",
            TimePreset::Last24Hours => "Last 24 hours",
            TimePreset::Last7Days => "Last 7 days",
            TimePreset::Last31Days => "Last 31 days",
            TimePreset::Last365Days => "Last 365 days",
            TimePreset::CurrentMonth => "Current month",
            TimePreset::CurrentYear => "Current year",
        }
    }
}

impl FromStr for TimePreset {
    type Err = QueryBuilderError;

    /// 接受完整名称（"Last 24 hours"）或紧凑写法（"last24hours", "current-month"）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        TimePreset::ALL
            .iter()
            .find(|p| {
                let label: String = p
                    .label()
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase();
                label == compact
            })
            .copied()
            .ok_or_else(|| QueryBuilderError::unknown_name("time preset", s))
    }
}
