//! 交互命令行的词法分析器
//!
//! 输入按空白切分为单词; 双引号包围的部分作为一个整体, 可以包含空格。

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// 读取双引号包围的字符串
    /// 注意：开始的引号已经被调用者消费
    fn read_quoted(&mut self, start: usize) -> Token<'a> {
        let content_start = self.position;
        while let Some(c) = self.peek() {
            if c == '"' {
                break;
            }
            self.bump();
        }
        let content = &self.input[content_start..self.position];

        // 缺少结束引号
        if self.bump().is_none() {
            return Token {
                kind: TokenKind::Unterminated(content),
                span: Span::new(start, self.position),
            };
        }
        Token {
            kind: TokenKind::Quoted(content),
            span: Span::new(start, self.position),
        }
    }

    /// 读取单词, 直到空白或引号
    fn read_word(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '"' {
                break;
            }
            self.bump();
        }
        Token {
            kind: TokenKind::Word(&self.input[start..self.position]),
            span: Span::new(start, self.position),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        match self.peek()? {
            '"' => {
                self.bump();
                Some(self.read_quoted(start))
            }
            _ => Some(self.read_word(start)),
        }
    }
}
