//! 交互命令的语法分析器
//!
//! ## 解析流程
//!
//! ```text
//! parse()
//!   ├─ 空行 → None
//!   └─ 第一个单词为命令名 (大小写不敏感)
//!        ├─ 需要子句 id 的命令 → expect_id()   "#3" 或 "3"
//!        ├─ op      → expect_operator()         "=", ">=", "ge", "!=" ...
//!        ├─ preset  → 剩余单词拼接后解析为时间预设
//!        ├─ range   → 开始, 结束, 可选 local|utc
//!        └─ compile → 可选方言, 其余为投影列
//! ```
//!
//! 多余的参数会报错, 并标出其位置。

use thiserror::Error;

use crate::command::Command;
use crate::compiler::Dialect;
use crate::group::NodeId;
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};
use crate::types::{Combinator, Operator, TimePreset};

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Option<Span>,
}

impl ParseError {
    fn new(message: String, span: Option<Span>) -> Self {
        Self { message, span }
    }

    fn at_position(message: String, span: Span) -> Self {
        Self {
            message,
            span: Some(span),
        }
    }
}

/// 对一行输入分词并解析
pub fn parse_line(input: &str) -> Result<Option<Command>, ParseError> {
    let tokens: Vec<Token> = Lexer::new(input).collect();
    Parser::new(&tokens).parse()
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// 返回当前 token，不推进位置
    fn peek(&self) -> Option<&'a Token<'a>> {
        self.tokens.get(self.position)
    }

    /// 返回当前 token 并推进位置
    fn advance(&mut self) -> Option<&'a Token<'a>> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    /// 取下一个参数的文本; 未闭合的字符串视为错误
    fn expect_text(&mut self, what: &str) -> Result<&'a str, ParseError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Unterminated(_),
                span,
            }) => Err(ParseError::at_position(
                "Unterminated string, missing closing quote".to_string(),
                *span,
            )),
            Some(token) => Ok(token.text()),
            None => Err(ParseError::new(
                format!("Expected {}, but reached end of input", what),
                None,
            )),
        }
    }

    fn optional_text(&mut self) -> Result<Option<&'a str>, ParseError> {
        if self.peek().is_none() {
            return Ok(None);
        }
        self.expect_text("argument").map(Some)
    }

    fn expect_id(&mut self) -> Result<NodeId, ParseError> {
        let span = self.peek().map(|t| t.span);
        let text = self.expect_text("clause id")?;
        text.parse::<NodeId>()
            .map_err(|_| self.error_at(format!("Invalid clause id: '{}'", text), span))
    }

    fn expect_operator(&mut self) -> Result<Operator, ParseError> {
        let span = self.peek().map(|t| t.span);
        let text = self.expect_text("operator")?;
        text.parse::<Operator>()
            .map_err(|_| self.error_at(format!("Unknown operator: '{}'", text), span))
    }

    /// 剩余的全部参数
    fn rest(&mut self) -> Result<Vec<&'a str>, ParseError> {
        let mut items = Vec::new();
        while let Some(text) = self.optional_text()? {
            items.push(text);
        }
        Ok(items)
    }

    fn rest_ids(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut ids = vec![self.expect_id()?];
        while self.peek().is_some() {
            ids.push(self.expect_id()?);
        }
        Ok(ids)
    }

    fn error_at(&self, message: String, span: Option<Span>) -> ParseError {
        ParseError::new(message, span)
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match self.peek() {
            Some(token) => Err(ParseError::at_position(
                format!("Unexpected argument: '{}'", token.text()),
                token.span,
            )),
            None => Ok(()),
        }
    }

    pub fn parse(&mut self) -> Result<Option<Command>, ParseError> {
        let Some(head) = self.advance() else {
            return Ok(None);
        };
        let name = head.text().to_ascii_lowercase();

        let command = match name.as_str() {
            "add" => {
                let mut position = None;
                let mut field = self.optional_text()?;
                if let Some(index) = field.and_then(|f| f.parse::<usize>().ok()) {
                    position = Some(index);
                    field = self.optional_text()?;
                }
                Command::Add {
                    position,
                    field: field.map(str::to_string),
                }
            }
            "del" | "delete" => Command::Delete(self.expect_id()?),
            "field" => {
                let id = self.expect_id()?;
                Command::Field(id, self.expect_text("field name")?.to_string())
            }
            "type" => {
                let id = self.expect_id()?;
                Command::Type(id, self.expect_text("type name")?.to_string())
            }
            "op" => {
                let id = self.expect_id()?;
                Command::Operator(id, self.expect_operator()?)
            }
            "value" => {
                let id = self.expect_id()?;
                // 省略值表示清空
                let value = self.optional_text()?.unwrap_or_default();
                Command::Value(id, value.to_string())
            }
            "preset" => {
                let id = self.expect_id()?;
                let span = self.peek().map(|t| t.span);
                let words = self.rest()?;
                if words.is_empty() {
                    return Err(ParseError::new(
                        "Expected time preset, but reached end of input".to_string(),
                        None,
                    ));
                }
                let text = words.join(" ");
                let preset = text
                    .parse::<TimePreset>()
                    .map_err(|_| self.error_at(format!("Unknown time preset: '{}'", text), span))?;
                Command::Preset(id, preset)
            }
            "range" => {
                let id = self.expect_id()?;
                let start = self.expect_text("range start")?.to_string();
                let end = self.expect_text("range end")?.to_string();
                let span = self.peek().map(|t| t.span);
                let is_local = match self.optional_text()? {
                    None | Some("local") => true,
                    Some("utc") => false,
                    Some(other) => {
                        return Err(self.error_at(
                            format!("Expected 'local' or 'utc', found '{}'", other),
                            span,
                        ))
                    }
                };
                Command::Range {
                    id,
                    start,
                    end,
                    is_local,
                }
            }
            "and" => Command::Combinator(self.expect_id()?, Combinator::And),
            "or" => Command::Combinator(self.expect_id()?, Combinator::Or),
            "select" => Command::Select(self.rest_ids()?),
            "unselect" => Command::Unselect(self.rest_ids()?),
            "group" => Command::Group,
            "ungroup" => Command::Ungroup(self.expect_id()?),
            "list" | "ls" => Command::List,
            "compile" => {
                let mut columns = self.rest()?;
                let dialect = match columns.first().map(|c| c.parse::<Dialect>()) {
                    Some(Ok(dialect)) => {
                        columns.remove(0);
                        Some(dialect)
                    }
                    _ => None,
                };
                Command::Compile {
                    dialect,
                    columns: columns.into_iter().map(str::to_string).collect(),
                }
            }
            "example" => Command::Example {
                partition_key: self.expect_text("partition key")?.to_string(),
                row_key: self.expect_text("row key")?.to_string(),
            },
            "clear" => Command::Clear,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => {
                return Err(ParseError::at_position(
                    format!("Unknown command: '{}'", head.text()),
                    head.span,
                ))
            }
        };

        self.expect_end()?;
        Ok(Some(command))
    }
}
