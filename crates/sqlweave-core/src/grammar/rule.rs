//! Declarative grammar rules.
//!
//! A node type's grammar is a tree of [`Rule`]s built with the functions in
//! this module and refined with chained attribute setters:
//!
//! ```rust
//! use sqlweave_core::grammar::rule::{kw, node, seq};
//!
//! let where_clause = seq([kw("WHERE"), node(["BinaryExpr", "ColumnRef"]).named("where").assert()])
//!     .optional()
//!     .newline();
//! # let _ = where_clause;
//! ```
//!
//! The same tree drives token parsing, structural (JSON) reading and SQL
//! rendering.

use crate::dialect::Dialect;
use crate::lexer::{BlockKind, TokenKind};

/// A grammar rule with its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub(crate) kind: RuleKind,
    pub(crate) attrs: Attrs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RuleKind {
    /// One token of one of `kinds`, restricted to `values` when non-empty.
    Token {
        kinds: Vec<TokenKind>,
        values: Vec<&'static str>,
    },
    /// One node of the first matching type; with `climb`, an expression
    /// parsed by precedence climbing.
    Node {
        types: Vec<&'static str>,
        climb: Option<Climb>,
    },
    Sequence(Vec<Rule>),
    Alternatives(Vec<Rule>),
    Block {
        kind: BlockKind,
        inner: Box<Rule>,
    },
}

/// Shape of the node built by precedence climbing: its type tag and the
/// names of its left operand, operator and right operand fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Climb {
    /// Binary node type tag.
    pub node: &'static str,
    /// Left operand field.
    pub left: &'static str,
    /// Operator field.
    pub operator: &'static str,
    /// Right operand field.
    pub right: &'static str,
}

/// Repetition bounds of a variadic field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Minimum number of items.
    pub min: usize,
    /// Maximum number of items, unbounded when `None`.
    pub max: Option<usize>,
}

/// Duplicate policy for variadic fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Singletons {
    /// Duplicates allowed.
    #[default]
    None,
    /// At most one item per node type.
    ByType,
    /// No two structurally equal items.
    ByValue,
}

/// Condition on previously matched fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// The field must be set.
    Present(&'static str),
    /// The field must be unset.
    Absent(&'static str),
}

impl Condition {
    /// Returns the field the condition depends on.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::Present(field) | Self::Absent(field) => field,
        }
    }

    /// Evaluates the condition given a field-presence test.
    pub fn holds(self, has: impl Fn(&str) -> bool) -> bool {
        match self {
            Self::Present(field) => has(field),
            Self::Absent(field) => !has(field),
        }
    }
}

/// Rule attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Attrs {
    pub name: Option<&'static str>,
    pub arity: Option<Arity>,
    pub optional: bool,
    pub assert: bool,
    pub dialect: Option<Dialect>,
    pub separator: Option<&'static str>,
    pub singletons: Singletons,
    pub when: Option<Condition>,
    pub tight: bool,
    pub newline: bool,
    pub indent: bool,
    pub optional_parens: bool,
    pub min_precedence: Option<u8>,
}

impl Rule {
    fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            attrs: Attrs::default(),
        }
    }

    /// Stores the match in the field `name` (`as`).
    #[must_use]
    pub const fn named(mut self, name: &'static str) -> Self {
        self.attrs.name = Some(name);
        self
    }

    /// Makes the rule optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.attrs.optional = true;
        self
    }

    /// Turns a mismatch of this rule into a [`ParseError`](super::ParseError).
    #[must_use]
    pub const fn assert(mut self) -> Self {
        self.attrs.assert = true;
        self
    }

    /// Restricts the rule to one dialect.
    #[must_use]
    pub const fn dialect(mut self, dialect: Dialect) -> Self {
        self.attrs.dialect = Some(dialect);
        self
    }

    /// Repeats the node rule between `min` and `max` times.
    #[must_use]
    pub const fn arity(mut self, min: usize, max: Option<usize>) -> Self {
        self.attrs.arity = Some(Arity { min, max });
        self
    }

    /// Separates repeated items with the punctuation `separator`.
    #[must_use]
    pub const fn separator(mut self, separator: &'static str) -> Self {
        self.attrs.separator = Some(separator);
        self
    }

    /// One or more items separated by `separator`.
    #[must_use]
    pub const fn many(self, separator: &'static str) -> Self {
        self.arity(1, None).separator(separator)
    }

    /// Sets the duplicate policy of a variadic field.
    #[must_use]
    pub const fn singletons(mut self, singletons: Singletons) -> Self {
        self.attrs.singletons = singletons;
        self
    }

    /// Applies the rule only when `condition` holds.
    #[must_use]
    pub const fn when(mut self, condition: Condition) -> Self {
        self.attrs.when = Some(condition);
        self
    }

    /// Renders without a space before the rule.
    #[must_use]
    pub const fn tight(mut self) -> Self {
        self.attrs.tight = true;
        self
    }

    /// Starts a new line before the rule when pretty-printing.
    #[must_use]
    pub const fn newline(mut self) -> Self {
        self.attrs.newline = true;
        self
    }

    /// Indents the rule's lines when pretty-printing.
    #[must_use]
    pub const fn indent(mut self) -> Self {
        self.attrs.indent = true;
        self
    }

    /// Lets the renderer drop the brackets of this block rule.
    #[must_use]
    pub const fn optional_parens(mut self) -> Self {
        self.attrs.optional_parens = true;
        self
    }

    /// Minimum operator precedence of a climbing expression operand.
    #[must_use]
    pub const fn min_precedence(mut self, precedence: u8) -> Self {
        self.attrs.min_precedence = Some(precedence);
        self
    }
}

/// Matches the rules in order.
pub fn seq(rules: impl Into<Vec<Rule>>) -> Rule {
    Rule::new(RuleKind::Sequence(rules.into()))
}

/// Matches the first rule that succeeds.
pub fn alt(rules: impl Into<Vec<Rule>>) -> Rule {
    Rule::new(RuleKind::Alternatives(rules.into()))
}

/// Matches one token of one of `kinds`, any value.
pub fn tok(kinds: impl Into<Vec<TokenKind>>) -> Rule {
    Rule::new(RuleKind::Token {
        kinds: kinds.into(),
        values: Vec::new(),
    })
}

/// Matches one token of `kind` with one of `values`.
pub fn tok_values(kind: TokenKind, values: impl Into<Vec<&'static str>>) -> Rule {
    Rule::new(RuleKind::Token {
        kinds: vec![kind],
        values: values.into(),
    })
}

/// Matches a keyword, including compound keywords such as `GROUP BY`.
#[must_use]
pub fn kw(keyword: &'static str) -> Rule {
    tok_values(TokenKind::Keyword, [keyword])
}

/// Matches a punctuation token.
#[must_use]
pub fn punct(symbol: &'static str) -> Rule {
    tok_values(TokenKind::Punctuation, [symbol])
}

/// Matches an operator token.
#[must_use]
pub fn op(symbol: &'static str) -> Rule {
    tok_values(TokenKind::Operator, [symbol])
}

/// Matches a node of the first type in `types` that parses.
pub fn node(types: impl Into<Vec<&'static str>>) -> Rule {
    Rule::new(RuleKind::Node {
        types: types.into(),
        climb: None,
    })
}

/// Matches an expression over `types`, combining operands with binary
/// operators into `climb.node` nodes by precedence climbing.
pub fn expr(types: impl Into<Vec<&'static str>>, climb: Climb) -> Rule {
    Rule::new(RuleKind::Node {
        types: types.into(),
        climb: Some(climb),
    })
}

/// Matches a block token of `kind` whose contents match `inner` exactly.
#[must_use]
pub fn block(kind: BlockKind, inner: Rule) -> Rule {
    Rule::new(RuleKind::Block {
        kind,
        inner: Box::new(inner),
    })
}

/// `( inner )`
#[must_use]
pub fn paren(inner: Rule) -> Rule {
    block(BlockKind::Paren, inner)
}

/// `[ inner ]`
#[must_use]
pub fn bracket(inner: Rule) -> Rule {
    block(BlockKind::Bracket, inner)
}

/// `{ inner }`
#[must_use]
pub fn brace(inner: Rule) -> Rule {
    block(BlockKind::Brace, inner)
}
