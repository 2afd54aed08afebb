//! Tokens of the interactive command line.

/// A token is one word of a command line, with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

impl<'a> Token<'a> {
    /// Text of the token, without quotes.
    pub fn text(&self) -> &'a str {
        match self.kind {
            TokenKind::Word(s) | TokenKind::Quoted(s) | TokenKind::Unterminated(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    /// A run of non-blank characters, e.g. `add`, `#3`, `>=`.
    Word(&'a str),
    /// Contents of a `"..."` string.
    Quoted(&'a str),
    /// A string whose closing quote is missing.
    Unterminated(&'a str),
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
