//! Token types for the SQL lexer.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Position;
use crate::stream::TokenStream;

/// The kind of token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// A run of whitespace.
    Whitespace,
    /// `-- ...`, `# ...` or `/* ... */`.
    Comment,
    /// Reserved word, or a multi-word keyword such as `GROUP BY`.
    Keyword,
    /// Bare or quoted identifier.
    Identifier,
    /// Data type name (e.g. `INTEGER`, `DOUBLE PRECISION`).
    DataType,
    /// MySQL user variable (`@name`).
    Variable,
    /// Symbolic operator (e.g. `+`, `<=`, `::`).
    Operator,
    /// `,`, `;`, `.`, and unstructured brackets.
    Punctuation,
    /// String literal (e.g. `'hello'`, `$$body$$`).
    StringLiteral,
    /// Numeric literal (e.g. `42`, `3.14`, `1e10`).
    NumberLiteral,
    /// Hexadecimal literal (`X'1F'`, `0x1F`).
    HexLiteral,
    /// Bit-string literal (`B'101'`, `0b101`).
    BitLiteral,
    /// Bind variable (`$1`, `?`).
    BindVariable,
    /// `( ... )` sub-stream.
    ParenBlock,
    /// `[ ... ]` sub-stream.
    BracketBlock,
    /// `{ ... }` sub-stream.
    BraceBlock,
}

impl TokenKind {
    /// Returns the snake_case name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Whitespace => "whitespace",
            Self::Comment => "comment",
            Self::Keyword => "keyword",
            Self::Identifier => "identifier",
            Self::DataType => "data_type",
            Self::Variable => "variable",
            Self::Operator => "operator",
            Self::Punctuation => "punctuation",
            Self::StringLiteral => "string_literal",
            Self::NumberLiteral => "number_literal",
            Self::HexLiteral => "hex_literal",
            Self::BitLiteral => "bit_literal",
            Self::BindVariable => "bind_variable",
            Self::ParenBlock => "paren_block",
            Self::BracketBlock => "bracket_block",
            Self::BraceBlock => "brace_block",
        }
    }

    /// Returns true for whitespace and comments.
    #[must_use]
    pub const fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::Comment)
    }

    /// Returns true for block tokens.
    #[must_use]
    pub const fn is_block(self) -> bool {
        matches!(self, Self::ParenBlock | Self::BracketBlock | Self::BraceBlock)
    }

    /// Returns true for kinds whose values compare case-insensitively.
    #[must_use]
    pub const fn is_word(self) -> bool {
        matches!(self, Self::Keyword | Self::DataType | Self::Operator)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three nestable bracket pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// `( )`
    Paren,
    /// `[ ]`
    Bracket,
    /// `{ }`
    Brace,
}

impl BlockKind {
    /// Returns the block kind opened by `c`.
    #[must_use]
    pub const fn from_open(c: char) -> Option<Self> {
        match c {
            '(' => Some(Self::Paren),
            '[' => Some(Self::Bracket),
            '{' => Some(Self::Brace),
            _ => None,
        }
    }

    /// Returns the block kind closed by `c`.
    #[must_use]
    pub const fn from_close(c: char) -> Option<Self> {
        match c {
            ')' => Some(Self::Paren),
            ']' => Some(Self::Bracket),
            '}' => Some(Self::Brace),
            _ => None,
        }
    }

    /// Returns the opening symbol.
    #[must_use]
    pub const fn open(self) -> char {
        match self {
            Self::Paren => '(',
            Self::Bracket => '[',
            Self::Brace => '{',
        }
    }

    /// Returns the closing symbol.
    #[must_use]
    pub const fn close(self) -> char {
        match self {
            Self::Paren => ')',
            Self::Bracket => ']',
            Self::Brace => '}',
        }
    }

    /// Returns the token kind carrying a block of this kind.
    #[must_use]
    pub const fn token_kind(self) -> TokenKind {
        match self {
            Self::Paren => TokenKind::ParenBlock,
            Self::Bracket => TokenKind::BracketBlock,
            Self::Brace => TokenKind::BraceBlock,
        }
    }

    /// Returns the block kind of a block token kind.
    #[must_use]
    pub const fn from_token_kind(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::ParenBlock => Some(Self::Paren),
            TokenKind::BracketBlock => Some(Self::Bracket),
            TokenKind::BraceBlock => Some(Self::Brace),
            _ => None,
        }
    }
}

/// Operator associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Associativity {
    /// `a - b - c` is `(a - b) - c`.
    Left,
    /// `a := b := c` is `a := (b := c)`.
    Right,
}

/// The kind of value an operator produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    /// Comparisons, logical and pattern operators.
    Boolean,
    /// Arithmetic and bitwise operators.
    Numeric,
    /// String concatenation.
    Text,
    /// JSON navigation.
    Json,
    /// Casts, assignment and anything type-dependent.
    Any,
}

/// Classification attached to operator tokens during finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorInfo {
    /// Binding strength; higher binds tighter.
    pub precedence: u8,
    /// Associativity for chains of equal precedence.
    pub associativity: Associativity,
    /// Result kind of the operator.
    pub result: ResultKind,
    /// Whether the operator can appear between two operands.
    pub binary: bool,
    /// Whether the operator can prefix a single operand.
    pub unary: bool,
}

/// A token with its position in the source text.
#[derive(Clone)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// Normalized value: unquoted contents for literals and quoted
    /// identifiers, uppercase for keywords, the symbol for operators.
    pub value: String,
    /// Line of the first character.
    pub line: u32,
    /// Column of the first character.
    pub column: u32,
    /// Whether whitespace or a comment preceded the token.
    pub space_before: bool,
    /// Delimiter of a quoted literal or identifier (`'`, `"`, `` ` ``, `$tag$`).
    pub delimiter: Option<String>,
    /// Literal prefix (`E`, `N`, `X`, `B`, `0x`, `0b`, `_utf8mb4`).
    pub modifier: Option<String>,
    /// Operator classification.
    pub operator: Option<OperatorInfo>,
    pub(crate) block: Option<TokenStream>,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(kind: TokenKind, value: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            value: value.into(),
            line: position.line,
            column: position.column,
            space_before: false,
            delimiter: None,
            modifier: None,
            operator: None,
            block: None,
        }
    }

    /// Sets the delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Sets the modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifier = Some(modifier.into());
        self
    }

    /// Creates a block token whose value is `stream`.
    #[must_use]
    pub fn block(kind: BlockKind, stream: TokenStream, position: Position) -> Self {
        let mut token = Self::new(kind.token_kind(), kind.open().to_string(), position);
        token.block = Some(stream);
        token
    }

    /// Returns the token position.
    #[must_use]
    pub const fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Returns the nested stream of a block token.
    #[must_use]
    pub const fn stream(&self) -> Option<&TokenStream> {
        self.block.as_ref()
    }

    /// Returns true if this token has `kind` and, when given, `value`.
    ///
    /// Keyword, data type and operator values compare case-insensitively.
    #[must_use]
    pub fn is(&self, kind: TokenKind, value: Option<&str>) -> bool {
        if self.kind != kind {
            return false;
        }
        match value {
            None => true,
            Some(v) if kind.is_word() => self.value.eq_ignore_ascii_case(v),
            Some(v) => self.value == v,
        }
    }

    /// Returns true if this is a quoted identifier.
    #[must_use]
    pub fn is_quoted(&self) -> bool {
        self.kind == TokenKind::Identifier && self.delimiter.is_some()
    }

    /// Returns true if the token can act as a binary operator.
    #[must_use]
    pub fn is_binary_operator(&self) -> bool {
        self.operator.is_some_and(|op| op.binary)
    }

    /// Returns true if this keyword begins a statement.
    #[must_use]
    pub fn starts_statement(&self) -> bool {
        self.kind == TokenKind::Keyword && super::tables::is_statement_name(&self.value)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.value == other.value
            && self.line == other.line
            && self.column == other.column
            && self.space_before == other.space_before
            && self.delimiter == other.delimiter
            && self.modifier == other.modifier
            && self.operator == other.operator
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Token");
        s.field("kind", &self.kind)
            .field("value", &self.value)
            .field("line", &self.line)
            .field("column", &self.column);
        if let Some(delimiter) = &self.delimiter {
            s.field("delimiter", delimiter);
        }
        if let Some(modifier) = &self.modifier {
            s.field("modifier", modifier);
        }
        if let Some(op) = &self.operator {
            s.field("precedence", &op.precedence);
        }
        s.finish_non_exhaustive()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_case_insensitive_for_keywords() {
        let select = Token::new(TokenKind::Keyword, "SELECT", Position::default());
        assert!(select.is(TokenKind::Keyword, Some("select")));
        assert!(select.is(TokenKind::Keyword, None));
        assert!(!select.is(TokenKind::Identifier, None));
    }

    #[test]
    fn test_token_is_exact_for_identifiers() {
        let ident = Token::new(TokenKind::Identifier, "Users", Position::default());
        assert!(ident.is(TokenKind::Identifier, Some("Users")));
        assert!(!ident.is(TokenKind::Identifier, Some("users")));
    }

    #[test]
    fn test_block_kind_pairs() {
        for c in ['(', '[', '{'] {
            let kind = BlockKind::from_open(c).unwrap();
            assert_eq!(kind.open(), c);
            assert_eq!(BlockKind::from_close(kind.close()), Some(kind));
            assert_eq!(BlockKind::from_token_kind(kind.token_kind()), Some(kind));
        }
        assert_eq!(BlockKind::from_open(')'), None);
    }

    #[test]
    fn test_token_kind_trivia() {
        assert!(TokenKind::Whitespace.is_trivia());
        assert!(TokenKind::Comment.is_trivia());
        assert!(!TokenKind::Keyword.is_trivia());
        assert!(TokenKind::ParenBlock.is_block());
    }

    #[test]
    fn test_quoted_identifier() {
        let quoted =
            Token::new(TokenKind::Identifier, "Order", Position::default()).with_delimiter("\"");
        assert!(quoted.is_quoted());
    }
}
