use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

use table_query_builder::command::{render_rows, Outcome};
use table_query_builder::parser::parse_line;
use table_query_builder::{ApiKind, BuilderConfig, QueryBuilder};

const DEFAULT_CONFIG_PATH: &str = "query_builder.json";
const ENV_LOG: &str = "QUERY_BUILDER_LOG";

fn init_logging() {
    let filter = std::env::var(ENV_LOG)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn,table_query_builder=info".to_string());

    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_ansi(true)
        .compact()
        .with_env_filter(filter)
        .init();
}

/// 加载配置, 失败时使用示例配置
fn load_config(path: &str) -> BuilderConfig {
    println!("\n[配置信息]:");
    match BuilderConfig::from_json_file(path) {
        Ok(config) => {
            println!("✅ 使用JSON配置文件: {}", path);
            println!("✅ API: {:?}, 共 {} 列", config.api, config.schema.columns.len());
            for column in &config.schema.columns {
                println!("  {} : {}", column.name, column.type_name);
            }
            config
        }
        Err(e) => {
            println!("⚠️ 无法加载JSON配置文件 ({}), 使用示例配置", e);
            BuilderConfig::sample(ApiKind::Tables)
        }
    }
}

fn main() -> Result<()> {
    init_logging();
    println!("--- 表查询构建器 ---");

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let mut builder = QueryBuilder::from_config(load_config(&path));
    builder.clear();
    println!("\n输入 help 查看命令\n{}", render_rows(&builder));

    let config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<(), DefaultHistory> =
        Editor::with_config(config).context("无法创建行编辑器")?;

    loop {
        match rl.readline("query> ") {
            Ok(line) => match parse_line(&line) {
                Ok(None) => {}
                Ok(Some(command)) => match command.execute(&mut builder) {
                    Ok(Outcome::Output(text)) => println!("{}", text),
                    Ok(Outcome::Quit) => break,
                    Err(e) => println!("✗ {}", e),
                },
                Err(e) => {
                    println!("✗ 解析失败: {}", e.message);
                    if let Some(span) = e.span {
                        println!("  位置 {}-{}", span.start, span.end);
                    }
                }
            },
            // Ctrl-C 只放弃当前行
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("读取输入失败"),
        }
    }

    Ok(())
}
