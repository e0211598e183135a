//! Grammar, parse and render errors.

use std::fmt;

use crate::dialect::Dialect;
use crate::lexer::{Position, Token, TokenKind};

/// An asserted grammar failure.
///
/// Ordinary mismatches never surface as errors; they make the engine
/// backtrack. A `ParseError` is raised only where a rule is marked
/// `assert` (or the assert policy selects its rule path), or when
/// [`TokenStream::expect`](crate::stream::TokenStream::expect) fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The error message.
    pub message: String,
    /// Node type being parsed.
    pub node: Option<&'static str>,
    /// Path of the failing rule inside the node's grammar.
    pub rule_path: Option<String>,
    /// Active dialect.
    pub dialect: Option<Dialect>,
    /// What the rule expected.
    pub expected: Option<String>,
    /// Kind of the offending token.
    pub found: Option<TokenKind>,
    /// Value of the offending token.
    pub found_value: Option<String>,
    /// Position of the offending token; `None` at end of input.
    pub position: Option<Position>,
}

impl ParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            node: None,
            rule_path: None,
            dialect: None,
            expected: None,
            found: None,
            found_value: None,
            position: None,
        }
    }

    /// Creates an "unexpected token" error.
    #[must_use]
    pub fn unexpected(expected: impl Into<String>, found: &Token) -> Self {
        let expected: String = expected.into();
        Self {
            message: format!("Unexpected {found}: expected {expected}"),
            expected: Some(expected),
            found: Some(found.kind),
            found_value: Some(found.value.clone()),
            position: Some(found.position()),
            ..Self::new(String::new())
        }
    }

    /// Creates an "unexpected end of input" error.
    #[must_use]
    pub fn unexpected_eof(expected: impl Into<String>) -> Self {
        let expected: String = expected.into();
        Self {
            message: format!("Unexpected end of input: expected {expected}"),
            expected: Some(expected),
            ..Self::new(String::new())
        }
    }

    /// Attaches the node type, rule path and dialect.
    #[must_use]
    pub fn in_rule(mut self, node: &'static str, rule_path: &str, dialect: Dialect) -> Self {
        self.node = Some(node);
        self.rule_path = Some(rule_path.to_string());
        self.dialect = Some(dialect);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(path) = &self.rule_path {
            write!(f, " in {path}")?;
        }
        if let Some(dialect) = self.dialect {
            write!(f, " ({dialect})")?;
        }
        if let Some(position) = self.position {
            write!(f, " at {position}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// A malformed grammar declaration, found when a node type's rule tree is
/// compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    /// A rule or lookup names a type that is not registered.
    #[error("unknown node type '{tag}'")]
    UnknownType {
        /// The missing tag.
        tag: String,
    },

    /// `as` on a composite rule other than an alternatives list of plain
    /// token rules.
    #[error("{path}: only token alternatives can be named")]
    NamedComposite {
        /// Rule path.
        path: String,
    },

    /// `arity` or `separator` on a rule that is not a node rule.
    #[error("{path}: arity and separators apply to node rules only")]
    ArityOnNonNode {
        /// Rule path.
        path: String,
    },

    /// `separator` without `arity`.
    #[error("{path}: separator without arity")]
    SeparatorWithoutArity {
        /// Rule path.
        path: String,
    },

    /// A token rule that neither has a name nor a fixed value, so it can
    /// be neither stored nor rendered.
    #[error("{path}: token rule needs a name or a fixed value")]
    FieldlessToken {
        /// Rule path.
        path: String,
    },

    /// A node rule without a field name.
    #[error("{path}: node rule needs a name")]
    UnnamedNode {
        /// Rule path.
        path: String,
    },

    /// An empty sequence, alternatives list or token kind list.
    #[error("{path}: empty {what}")]
    Empty {
        /// Rule path.
        path: String,
        /// What is empty.
        what: &'static str,
    },

    /// A condition on a field that is not declared before it.
    #[error("{path}: condition depends on '{field}', which is not declared earlier")]
    UnknownDependency {
        /// Rule path.
        path: String,
        /// The referenced field.
        field: String,
    },

    /// A precedence-climbing shape whose node lacks the named fields.
    #[error("{path}: climbing node '{node}' has no field '{field}'")]
    BadClimb {
        /// Rule path.
        path: String,
        /// The climbing node type.
        node: String,
        /// The missing field.
        field: String,
    },

    /// A field name used twice within one alternative.
    #[error("{node}: field '{field}' declared twice in one alternative")]
    DuplicateField {
        /// Node type.
        node: String,
        /// The repeated field.
        field: String,
    },
}

/// A tree that cannot be rendered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializeError {
    /// A required field is absent.
    #[error("{node} is missing required field '{field}'")]
    MissingField {
        /// Node type.
        node: String,
        /// The field.
        field: String,
    },

    /// None of the node's alternatives fits the fields it has.
    #[error("no {dialect} rendering of {node} fits its fields [{fields}]")]
    NoAlternative {
        /// Node type.
        node: String,
        /// Target dialect.
        dialect: Dialect,
        /// The fields present on the node.
        fields: String,
    },

    /// A numbered bind variable out of sequence in a dialect whose binds
    /// are positional.
    #[error("bind variable ${index} is parameter {position}; {dialect} binds are positional")]
    BindOrder {
        /// Number the bind variable was written with.
        index: usize,
        /// Its position among the statement's bind variables.
        position: usize,
        /// Target dialect.
        dialect: Dialect,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_token_display() {
        let token = Token::new(TokenKind::Keyword, "FROM", Position::new(1, 8));
        let err = ParseError::unexpected("expression", &token).in_rule(
            "SelectStmt",
            "SelectStmt/2",
            Dialect::Postgres,
        );
        assert_eq!(
            err.to_string(),
            "Unexpected keyword 'FROM': expected expression in SelectStmt/2 (postgres) at line 1, column 8"
        );
        assert_eq!(err.node, Some("SelectStmt"));
    }

    #[test]
    fn test_unexpected_eof_display() {
        let err = ParseError::unexpected_eof("identifier");
        assert_eq!(
            err.to_string(),
            "Unexpected end of input: expected identifier"
        );
    }

    #[test]
    fn test_grammar_error_display() {
        let err = GrammarError::UnknownDependency {
            path: String::from("SelectStmt/7"),
            field: String::from("limit"),
        };
        assert!(err.to_string().contains("'limit'"));
    }
}
