//! Error types for tokenizing, stream handling, parsing and rendering.

use crate::ast::NodeId;
use crate::grammar::{GrammarError, ParseError, SerializeError};
use crate::lexer::Position;

/// Lexical errors. Always fatal; the tokenizer never recovers from them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    /// A character that cannot start any token.
    #[error("unexpected character '{character}' at {position}")]
    UnexpectedCharacter {
        /// The offending character.
        character: char,
        /// Where it appeared.
        position: Position,
    },

    /// A string, identifier, comment or dollar-quoted body that never closes.
    #[error("unterminated {what} starting at {position}")]
    Unterminated {
        /// What was left open.
        what: &'static str,
        /// Where it started.
        position: Position,
    },

    /// A malformed literal (bad digit, repeated decimal point, ...).
    #[error("invalid {what} at {position}: {message}")]
    InvalidLiteral {
        /// The literal category.
        what: &'static str,
        /// What is wrong with it.
        message: String,
        /// Where the literal starts.
        position: Position,
    },

    /// A closing bracket that does not match the innermost open one.
    #[error("unexpected '{symbol}' at {position}")]
    UnbalancedClose {
        /// The closing symbol.
        symbol: char,
        /// Where it appeared.
        position: Position,
    },

    /// Input ended while a bracket was still open.
    #[error("unclosed '{symbol}' opened at {position}")]
    Unclosed {
        /// The opening symbol.
        symbol: char,
        /// Where it was opened.
        position: Position,
    },
}

/// Misuse of a [`TokenStream`](crate::stream::TokenStream). Programmer errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// A mutating operation on a block stream whose token is only peeked.
    #[error("token stream is locked: its block token has only been peeked")]
    Locked,

    /// `restore` or `commit` with an index outside the recorded history.
    #[error("invalid savepoint {index}: valid range is {min}..={max}")]
    InvalidSavepoint {
        /// The requested index.
        index: usize,
        /// Oldest restorable position.
        min: usize,
        /// Current position.
        max: usize,
    },
}

/// Errors that can occur in the SQL front end.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Tokenizer failure.
    #[error(transparent)]
    Lex(#[from] LexError),

    /// Token stream misuse.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Asserted grammar failure.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Malformed grammar declaration.
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// A tree that cannot be rendered.
    #[error(transparent)]
    Serialize(#[from] SerializeError),

    /// Adoption of a node that already has a parent.
    #[error("node {node} already belongs to {parent}; release it before adopting it elsewhere")]
    Ownership {
        /// The node being adopted.
        node: NodeId,
        /// Its current parent.
        parent: NodeId,
    },

    /// Adoption that would make a node its own ancestor.
    #[error("node {node} cannot be adopted by {parent}, which it contains")]
    Cycle {
        /// The node being adopted.
        node: NodeId,
        /// The would-be parent.
        parent: NodeId,
    },

    /// The input did not match the requested node type.
    #[error("no {expected} found {found}")]
    NoMatch {
        /// The requested node type(s).
        expected: String,
        /// Description of where matching stopped.
        found: String,
    },

    /// Structured tree (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for SQL front end operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_error_display() {
        let err = LexError::Unterminated {
            what: "string literal",
            position: Position::new(2, 5),
        };
        assert_eq!(
            err.to_string(),
            "unterminated string literal starting at line 2, column 5"
        );
    }

    #[test]
    fn test_stream_error_display() {
        let err = StreamError::InvalidSavepoint {
            index: 9,
            min: 0,
            max: 3,
        };
        assert_eq!(err.to_string(), "invalid savepoint 9: valid range is 0..=3");
    }

    #[test]
    fn test_error_from_lex_error() {
        let err: Error = LexError::UnexpectedCharacter {
            character: '\u{1}',
            position: Position::default(),
        }
        .into();
        assert!(matches!(err, Error::Lex(_)));
    }
}
