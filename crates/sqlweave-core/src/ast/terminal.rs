//! Leaf values of the syntax tree.

use serde::{Deserialize, Serialize};

use crate::lexer::{Position, Token, TokenKind};

/// The AST copy of a matched token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminal {
    /// Kind of the source token.
    pub kind: TokenKind,
    /// Normalized value (unquoted contents, uppercase keywords).
    pub value: String,
    /// Whether the source was a quoted identifier.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub quoted: bool,
    /// Literal prefix or variable sigil (`E`, `N`, `0x`, `@@`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
    /// Source line, `0` when built from data.
    #[serde(default)]
    pub line: u32,
    /// Source column, `0` when built from data.
    #[serde(default)]
    pub column: u32,
}

impl Terminal {
    /// Creates a terminal without a source position.
    #[must_use]
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            quoted: false,
            modifier: None,
            line: 0,
            column: 0,
        }
    }

    /// Copies a token.
    #[must_use]
    pub fn from_token(token: &Token) -> Self {
        Self {
            kind: token.kind,
            value: token.value.clone(),
            quoted: token.is_quoted(),
            modifier: token.modifier.clone(),
            line: token.line,
            column: token.column,
        }
    }

    /// Marks the terminal as quoted.
    #[must_use]
    pub const fn quoted(mut self, quoted: bool) -> Self {
        self.quoted = quoted;
        self
    }

    /// Sets the modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: Option<String>) -> Self {
        self.modifier = modifier;
        self
    }

    /// Returns the source position, if the terminal came from SQL text.
    #[must_use]
    pub const fn position(&self) -> Option<Position> {
        if self.line == 0 {
            None
        } else {
            Some(Position::new(self.line, self.column))
        }
    }

    /// Compares value, quoting and modifier; ignores kind and position.
    ///
    /// Two parses of the same construct (or a parse and a JSON read) agree
    /// on these even when positions differ or a rule accepts more than one
    /// token kind.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.value == other.value && self.quoted == other.quoted && self.modifier == other.modifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_token_copies_quoting() {
        let token = Token::new(TokenKind::Identifier, "Order", Position::new(1, 8)).with_delimiter("\"");
        let terminal = Terminal::from_token(&token);
        assert!(terminal.quoted);
        assert_eq!(terminal.position(), Some(Position::new(1, 8)));
    }

    #[test]
    fn test_string_literal_is_not_marked_quoted() {
        let token = Token::new(TokenKind::StringLiteral, "x", Position::default()).with_delimiter("'");
        assert!(!Terminal::from_token(&token).quoted);
    }

    #[test]
    fn test_same_as_ignores_position_and_kind() {
        let a = Terminal {
            line: 3,
            column: 9,
            ..Terminal::new(TokenKind::DataType, "TIME")
        };
        let b = Terminal::new(TokenKind::Identifier, "TIME");
        assert!(a.same_as(&b));
        assert!(!a.same_as(&b.clone().quoted(true)));
    }
}
