//! 配置模块，负责加载查询构建器的JSON配置文件
//!
//! 配置中的 `schema` 部分由数据浏览组件提供：可用列名、推断出的类型名，
//! 以及列存储 API 的分区键/聚簇键。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::{ApiKind, DataType};

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {}", .0.display())]
    NotFound(PathBuf),

    #[error("无法读取配置文件 {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("无法解析JSON配置文件 {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 单个列的描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    /// 类型名, 例如 "Int64" 或 "varchar"; 按当前 API 的类型族解析
    #[serde(rename = "type")]
    pub type_name: String,
}

/// 数据浏览组件提供的表结构信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
    #[serde(default)]
    pub partition_keys: Vec<String>,
    #[serde(default)]
    pub clustering_keys: Vec<String>,
}

impl TableSchema {
    /// 查找列推断出的类型; 类型名不属于当前类型族时返回 None
    pub fn data_type_of(&self, field: &str, api: ApiKind) -> Option<DataType> {
        self.columns
            .iter()
            .find(|c| c.name == field)
            .and_then(|c| DataType::parse(&c.type_name, api))
    }

    pub fn is_partition_key(&self, field: &str) -> bool {
        self.partition_keys.iter().any(|k| k == field)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// 查询构建器配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    #[serde(default)]
    pub api: ApiKind,
    /// CQL 方言的键空间名
    #[serde(default)]
    pub keyspace: Option<String>,
    /// CQL 方言的表名
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub schema: TableSchema,
}

impl BuilderConfig {
    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ConfigError::NotFound(path_ref.to_path_buf()));
        }

        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path_ref.to_path_buf(),
            source,
        })
    }

    /// 创建示例配置（用于测试或fallback）
    pub fn sample(api: ApiKind) -> Self {
        let column = |name: &str, type_name: &str| ColumnSchema {
            name: name.to_string(),
            type_name: type_name.to_string(),
        };
        match api {
            ApiKind::Tables => Self {
                api,
                keyspace: None,
                table: None,
                schema: TableSchema {
                    columns: vec![
                        column("PartitionKey", "String"),
                        column("RowKey", "String"),
                        column("Timestamp", "DateTime"),
                        column("Name", "String"),
                        column("Count", "Int64"),
                        column("Price", "Double"),
                    ],
                    partition_keys: vec![],
                    clustering_keys: vec![],
                },
            },
            ApiKind::Cassandra => Self {
                api,
                keyspace: Some("store".to_string()),
                table: Some("orders".to_string()),
                schema: TableSchema {
                    columns: vec![
                        column("userid", "Text"),
                        column("orderid", "Uuid"),
                        column("total", "Decimal"),
                        column("quantity", "Int"),
                    ],
                    partition_keys: vec!["userid".to_string()],
                    clustering_keys: vec!["orderid".to_string()],
                },
            },
        }
    }
}
