//! Token-driven recursive descent over compiled schemas.
//!
//! The [`Parser`] walks a node type's [`CompiledRule`] tree against a
//! [`TokenStream`]. Every rule takes a savepoint first; a rule that does not
//! match restores the stream, drops the nodes it built and reports `false`,
//! so the enclosing alternatives can try their next branch. Only asserted
//! rules turn a mismatch into a [`ParseError`].
//!
//! Binary expressions are parsed by precedence climbing: after an operand,
//! each binary operator whose precedence is at least the current minimum
//! combines with a right operand parsed at a raised minimum (left
//! associative) or the same minimum (right associative).

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::ast::{Ast, FieldValue, NodeId, Terminal};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::lexer::{Associativity, BlockKind, Token, TokenKind};
use crate::stream::TokenStream;

use super::error::{GrammarError, ParseError};
use super::registry::Registry;
use super::rule::{Climb, Singletons};
use super::schema::{CompiledKind, CompiledRule};

type Fields = Vec<(&'static str, FieldValue)>;

/// Predicate over rule paths selecting additional asserted rules.
pub type AssertPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Parser configuration.
#[derive(Clone, Default)]
pub struct ParseOptions {
    assert_when: Option<AssertPredicate>,
}

impl ParseOptions {
    /// Creates the default options: only rules declared `assert` assert.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also asserts every rule whose path satisfies `predicate`.
    #[must_use]
    pub fn assert_when(mut self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.assert_when = Some(Arc::new(predicate));
        self
    }

    fn asserts(&self, rule: &CompiledRule) -> bool {
        rule.attrs.assert
            || self
                .assert_when
                .as_ref()
                .is_some_and(|predicate| predicate(&rule.path))
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("assert_when", &self.assert_when.is_some())
            .finish()
    }
}

/// Builds syntax trees from token streams.
///
/// # Example
///
/// ```rust
/// use sqlweave_core::dialect::Dialect;
/// use sqlweave_core::grammar::{default_registry, Parser};
/// use sqlweave_core::lexer::Tokenizer;
///
/// let stream = Tokenizer::new("SELECT id FROM users", Dialect::Postgres).into_stream();
/// let mut parser = Parser::new(default_registry(), Dialect::Postgres);
/// let id = parser.parse_node("SelectStmt", &stream).unwrap().unwrap();
/// assert_eq!(parser.ast()[id].tag(), "SelectStmt");
/// ```
pub struct Parser<'r> {
    registry: &'r Registry,
    dialect: Dialect,
    options: ParseOptions,
    ast: Ast,
}

impl<'r> Parser<'r> {
    /// Creates a parser building into a fresh arena.
    #[must_use]
    pub const fn new(registry: &'r Registry, dialect: Dialect) -> Self {
        Self {
            registry,
            dialect,
            options: ParseOptions {
                assert_when: None,
            },
            ast: Ast::new(dialect),
        }
    }

    /// Replaces the parser options.
    #[must_use]
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the active dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Returns the arena built so far.
    #[must_use]
    pub const fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Consumes the parser and returns its arena.
    #[must_use]
    pub fn into_ast(self) -> Ast {
        self.ast
    }

    /// Drops every node created after `mark`.
    pub(crate) fn truncate(&mut self, mark: usize) {
        self.ast.truncate(mark);
    }

    /// Parses a node of type `tag` through its registered syntax.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::UnknownType`] for unregistered tags, and
    /// lexical, stream or asserted parse errors.
    pub fn parse_node(&mut self, tag: &str, stream: &TokenStream) -> Result<Option<NodeId>> {
        let registry = self.registry;
        let Some(syntax) = registry.syntax(tag) else {
            return Err(GrammarError::UnknownType {
                tag: tag.to_string(),
            }
            .into());
        };
        syntax.parse(self, stream)
    }

    /// Parses the first of `types` that matches.
    ///
    /// # Errors
    ///
    /// See [`parse_node`](Self::parse_node).
    pub fn parse_any(&mut self, types: &[&'static str], stream: &TokenStream) -> Result<Option<NodeId>> {
        for tag in types {
            if let Some(id) = self.parse_node(tag, stream)? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// Parses a node of type `tag` by interpreting its compiled rule.
    ///
    /// # Errors
    ///
    /// See [`parse_node`](Self::parse_node).
    pub fn parse_type(&mut self, tag: &str, stream: &TokenStream) -> Result<Option<NodeId>> {
        let compiled = self.registry.compiled(tag, self.dialect)?;
        let Some(root) = &compiled.root else {
            return Ok(None);
        };
        let start = stream.savepoint()?;
        let mark = self.ast.mark();
        let mut fields = Vec::new();
        if !self.match_rule(root, stream, &mut fields, compiled.tag)? {
            stream.restore(start)?;
            self.ast.truncate(mark);
            return Ok(None);
        }
        let id = self.ast.build(compiled.tag, fields)?;
        Ok(Some(id))
    }

    /// Parses `operand (operator operand)*` by precedence climbing,
    /// combining operands into `climb.node` nodes. Only binary operators
    /// with a precedence of at least `min_precedence` are taken.
    ///
    /// # Errors
    ///
    /// See [`parse_node`](Self::parse_node).
    pub fn parse_climbing(
        &mut self,
        operands: &[&'static str],
        climb: Climb,
        min_precedence: u8,
        stream: &TokenStream,
    ) -> Result<Option<NodeId>> {
        let Some(mut left) = self.parse_any(operands, stream)? else {
            return Ok(None);
        };
        loop {
            let Some(operator) = peek_significant(stream)? else {
                break;
            };
            let Some(info) = operator.operator.filter(|info| info.binary) else {
                break;
            };
            if info.precedence < min_precedence {
                break;
            }
            let next_min = match info.associativity {
                Associativity::Left => info.precedence.saturating_add(1),
                Associativity::Right => info.precedence,
            };

            let before = stream.savepoint()?;
            let mark = self.ast.mark();
            skip_trivia(stream)?;
            stream.next()?;
            let Some(right) = self.parse_climbing(operands, climb, next_min, stream)? else {
                trace!(operator = %operator.value, "no right operand, backtracking");
                stream.restore(before)?;
                self.ast.truncate(mark);
                break;
            };
            left = self.ast.build(
                climb.node,
                vec![
                    (climb.left, FieldValue::Node(left)),
                    (climb.operator, FieldValue::Terminal(Terminal::from_token(&operator))),
                    (climb.right, FieldValue::Node(right)),
                ],
            )?;
        }
        Ok(Some(left))
    }

    fn match_rule(
        &mut self,
        rule: &CompiledRule,
        stream: &TokenStream,
        fields: &mut Fields,
        tag: &'static str,
    ) -> Result<bool> {
        if let Some(condition) = rule.attrs.when {
            if !condition.holds(|name| fields.iter().any(|(field, _)| *field == name)) {
                return Ok(true);
            }
        }

        let start = stream.savepoint()?;
        let mark = self.ast.mark();
        let len = fields.len();
        let matched = match &rule.kind {
            CompiledKind::Token { kinds, values } => {
                match_token(kinds, values, rule.attrs.name, stream, fields)?
            }
            CompiledKind::Alternatives(branches) if rule.is_named() => {
                let mut matched = false;
                for branch in branches {
                    if let CompiledKind::Token { kinds, values } = &branch.kind {
                        if match_token(kinds, values, rule.attrs.name, stream, fields)? {
                            matched = true;
                            break;
                        }
                    }
                }
                matched
            }
            CompiledKind::Node { types, climb } => {
                self.match_node(rule, types, *climb, stream, fields)?
            }
            CompiledKind::Sequence(children) => {
                let mut matched = true;
                for child in children {
                    if !self.match_rule(child, stream, fields, tag)? {
                        matched = false;
                        break;
                    }
                }
                matched
            }
            CompiledKind::Alternatives(branches) => {
                let mut matched = false;
                for branch in branches {
                    if self.match_rule(branch, stream, fields, tag)? {
                        matched = true;
                        break;
                    }
                }
                matched
            }
            CompiledKind::Block { kind, inner } => {
                self.match_block(*kind, inner, stream, fields, tag)?
            }
        };
        if matched {
            return Ok(true);
        }

        if !rule.attrs.optional && self.options.asserts(rule) {
            return Err(self.assert_failure(rule, stream, tag)?.into());
        }
        if stream.position() != start {
            trace!(node = tag, rule = %rule.path, "backtracking");
        }
        stream.restore(start)?;
        self.ast.truncate(mark);
        fields.truncate(len);
        Ok(rule.attrs.optional)
    }

    fn match_node(
        &mut self,
        rule: &CompiledRule,
        types: &[&'static str],
        climb: Option<Climb>,
        stream: &TokenStream,
        fields: &mut Fields,
    ) -> Result<bool> {
        let Some(name) = rule.attrs.name else {
            return Ok(false);
        };
        let min = rule.attrs.min_precedence.unwrap_or(0);
        let Some(arity) = rule.attrs.arity else {
            return Ok(match self.operand(types, climb, min, stream)? {
                Some(id) => {
                    fields.push((name, FieldValue::Node(id)));
                    true
                }
                None => false,
            });
        };

        let mut items: Vec<NodeId> = Vec::new();
        while arity.max.map_or(true, |max| items.len() < max) {
            let before = stream.savepoint()?;
            let mark = self.ast.mark();
            if !items.is_empty() {
                if let Some(separator) = rule.attrs.separator {
                    if !eat_separator(separator, stream)? {
                        break;
                    }
                }
            }
            let item = self.operand(types, climb, min, stream)?;
            match item {
                Some(id) if !self.repeats(rule.attrs.singletons, &items, id) => items.push(id),
                _ => {
                    stream.restore(before)?;
                    self.ast.truncate(mark);
                    break;
                }
            }
        }
        if items.len() < arity.min {
            return Ok(false);
        }
        fields.push((name, FieldValue::List(items)));
        Ok(true)
    }

    fn operand(
        &mut self,
        types: &[&'static str],
        climb: Option<Climb>,
        min: u8,
        stream: &TokenStream,
    ) -> Result<Option<NodeId>> {
        match climb {
            Some(climb) => self.parse_climbing(types, climb, min, stream),
            None => self.parse_any(types, stream),
        }
    }

    /// Returns true if `id` duplicates an item under `policy`.
    fn repeats(&self, policy: Singletons, items: &[NodeId], id: NodeId) -> bool {
        match policy {
            Singletons::None => false,
            Singletons::ByType => items
                .iter()
                .any(|item| self.ast[*item].tag() == self.ast[id].tag()),
            Singletons::ByValue => items
                .iter()
                .any(|item| self.ast.structural_eq(*item, &self.ast, id)),
        }
    }

    fn match_block(
        &mut self,
        kind: BlockKind,
        inner: &CompiledRule,
        stream: &TokenStream,
        fields: &mut Fields,
        tag: &'static str,
    ) -> Result<bool> {
        skip_trivia(stream)?;
        let Some(token) = stream.peek(0)? else {
            return Ok(false);
        };
        if token.kind != kind.token_kind() {
            return Ok(false);
        }
        stream.next()?;
        let Some(block) = token.stream().cloned() else {
            return Ok(false);
        };
        let start = block.savepoint()?;
        if self.match_rule(inner, &block, fields, tag)? {
            skip_trivia(&block)?;
            if block.is_exhausted()? {
                return Ok(true);
            }
        }
        block.restore(start)?;
        Ok(false)
    }

    fn assert_failure(
        &self,
        rule: &CompiledRule,
        stream: &TokenStream,
        tag: &'static str,
    ) -> Result<ParseError> {
        let expected = describe(rule);
        let err = match peek_significant(stream)? {
            Some(found) => ParseError::unexpected(expected, &found),
            None => ParseError::unexpected_eof(expected),
        }
        .in_rule(tag, &rule.path, self.dialect);
        debug!(node = tag, rule = %rule.path, error = %err, "asserted rule failed");
        Ok(err)
    }
}

impl fmt::Debug for Parser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("dialect", &self.dialect)
            .field("options", &self.options)
            .field("nodes", &self.ast.len())
            .finish_non_exhaustive()
    }
}

fn match_token(
    kinds: &[TokenKind],
    values: &[&'static str],
    name: Option<&'static str>,
    stream: &TokenStream,
    fields: &mut Fields,
) -> Result<bool> {
    skip_trivia(stream)?;
    let Some(token) = stream.peek(0)? else {
        return Ok(false);
    };
    if !kinds.contains(&token.kind) {
        return Ok(false);
    }
    if !values.is_empty() && !values.iter().any(|v| token.is(token.kind, Some(v))) {
        return Ok(false);
    }
    stream.next()?;
    if let Some(name) = name {
        fields.push((name, FieldValue::Terminal(Terminal::from_token(&token))));
    }
    Ok(true)
}

fn eat_separator(separator: &str, stream: &TokenStream) -> Result<bool> {
    skip_trivia(stream)?;
    let matches = stream.peek(0)?.is_some_and(|token| {
        matches!(
            token.kind,
            TokenKind::Punctuation | TokenKind::Operator | TokenKind::Keyword
        ) && token.value.eq_ignore_ascii_case(separator)
    });
    if matches {
        stream.next()?;
    }
    Ok(matches)
}

/// Consumes whitespace and comment tokens.
pub(crate) fn skip_trivia(stream: &TokenStream) -> Result<()> {
    while stream.peek(0)?.is_some_and(|token| token.kind.is_trivia()) {
        stream.next()?;
    }
    Ok(())
}

/// Returns the next token that is not whitespace or a comment.
pub(crate) fn peek_significant(stream: &TokenStream) -> Result<Option<Token>> {
    let mut n = 0;
    loop {
        match stream.peek(n)? {
            Some(token) if token.kind.is_trivia() => n += 1,
            other => return Ok(other),
        }
    }
}

fn describe(rule: &CompiledRule) -> String {
    match &rule.kind {
        CompiledKind::Token { kinds, values } if values.is_empty() => kinds
            .iter()
            .map(|kind| kind.to_string())
            .collect::<Vec<_>>()
            .join(" or "),
        CompiledKind::Token { values, .. } => values
            .iter()
            .map(|value| format!("'{value}'"))
            .collect::<Vec<_>>()
            .join(" or "),
        CompiledKind::Node { types, .. } => types.join(" or "),
        CompiledKind::Sequence(children) => children.first().map(describe).unwrap_or_default(),
        CompiledKind::Alternatives(branches) => branches
            .iter()
            .map(describe)
            .collect::<Vec<_>>()
            .join(" or "),
        CompiledKind::Block { kind, .. } => format!("'{}'", kind.open()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::grammar::registry::default_registry;
    use crate::grammar::rule::{alt, kw, node, paren, punct, seq, tok, Condition};
    use crate::grammar::sql::{BINARY, OPERANDS};
    use crate::lexer::Tokenizer;

    fn tokens(sql: &str, dialect: Dialect) -> TokenStream {
        Tokenizer::new(sql, dialect).into_stream()
    }

    fn expression(sql: &str, dialect: Dialect) -> (Ast, NodeId) {
        let stream = tokens(sql, dialect);
        let mut parser = Parser::new(default_registry(), dialect);
        let id = parser
            .parse_climbing(OPERANDS, BINARY, 0, &stream)
            .unwrap()
            .unwrap();
        assert!(stream.is_exhausted().unwrap());
        (parser.into_ast(), id)
    }

    fn operator(ast: &Ast, id: NodeId) -> &str {
        &ast.terminal(id, "operator").unwrap().value
    }

    fn column(ast: &Ast, id: NodeId) -> &str {
        &ast.terminal(id, "name").unwrap().value
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let (ast, root) = expression("a + b * c", Dialect::Postgres);
        assert_eq!(operator(&ast, root), "+");
        let left = ast.child(root, "left").unwrap();
        assert_eq!(column(&ast, left), "a");
        let right = ast.child(root, "right").unwrap();
        assert_eq!(ast[right].tag(), "BinaryExpr");
        assert_eq!(operator(&ast, right), "*");
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let (ast, root) = expression("a - b - c", Dialect::Postgres);
        let left = ast.child(root, "left").unwrap();
        assert_eq!(ast[left].tag(), "BinaryExpr");
        assert_eq!(column(&ast, ast.child(left, "left").unwrap()), "a");
        assert_eq!(column(&ast, ast.child(root, "right").unwrap()), "c");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let (ast, root) = expression("@a := @b := 1", Dialect::Mysql);
        assert_eq!(operator(&ast, root), ":=");
        let right = ast.child(root, "right").unwrap();
        assert_eq!(ast[right].tag(), "BinaryExpr");
        assert_eq!(ast[ast.child(root, "left").unwrap()].tag(), "UserVariable");
    }

    #[test]
    fn test_logical_precedence() {
        let (ast, root) = expression("NOT a = 1 AND b OR c", Dialect::Postgres);
        assert_eq!(operator(&ast, root), "OR");
        let and = ast.child(root, "left").unwrap();
        assert_eq!(operator(&ast, and), "AND");
        let not = ast.child(and, "left").unwrap();
        assert_eq!(ast[not].tag(), "NotExpr");
        let operand = ast.child(not, "operand").unwrap();
        assert_eq!(operator(&ast, operand), "=");
    }

    #[test]
    fn test_climbing_backtracks_dangling_operator() {
        let stream = tokens("a + FROM", Dialect::Postgres);
        let mut parser = Parser::new(default_registry(), Dialect::Postgres);
        let id = parser
            .parse_climbing(OPERANDS, BINARY, 0, &stream)
            .unwrap()
            .unwrap();
        assert_eq!(parser.ast()[id].tag(), "ColumnRef");
        assert_eq!(parser.ast().len(), 1);
        assert!(stream.matches(0, TokenKind::Operator, Some("+")).unwrap());
    }

    #[test]
    fn test_climbing_node_requires_operator() {
        let stream = tokens("a", Dialect::Postgres);
        let mut parser = Parser::new(default_registry(), Dialect::Postgres);
        assert!(parser.parse_node("BinaryExpr", &stream).unwrap().is_none());
        assert_eq!(stream.position(), 0);
        assert!(parser.ast().is_empty());
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.declare("Name", tok([TokenKind::Identifier]).named("name"));
        registry.declare("Number", tok([TokenKind::NumberLiteral]).named("value"));
        registry
    }

    #[test]
    fn test_alternatives_backtrack_consumed_tokens() {
        let mut registry = registry();
        registry.declare(
            "Call",
            alt([
                seq([node(["Name"]).named("name"), punct("."), node(["Name"]).named("member")]),
                seq([node(["Name"]).named("name"), paren(node(["Number"]).named("arg"))]),
            ]),
        );
        let stream = tokens("f(1)", Dialect::Postgres);
        let mut parser = Parser::new(&registry, Dialect::Postgres);
        let id = parser.parse_node("Call", &stream).unwrap().unwrap();
        let ast = parser.ast();
        assert_eq!(ast[id].field_names(), vec!["name", "arg"]);
        // The first branch's Name node was dropped with its branch.
        assert_eq!(ast.len(), 3);
    }

    #[test]
    fn test_block_must_be_exhausted() {
        let mut registry = registry();
        registry.declare("Paren", paren(node(["Name"]).named("inner")));
        let stream = tokens("(a b)", Dialect::Postgres);
        let mut parser = Parser::new(&registry, Dialect::Postgres);
        assert!(parser.parse_node("Paren", &stream).unwrap().is_none());
        assert_eq!(stream.position(), 0);

        let stream = tokens("(a)", Dialect::Postgres);
        let id = parser.parse_node("Paren", &stream).unwrap().unwrap();
        assert!(parser.ast()[id].has("inner"));
    }

    #[test]
    fn test_arity_and_separator() {
        let mut registry = registry();
        registry.declare(
            "Pair",
            paren(node(["Number"]).named("items").arity(2, Some(2)).separator(",")),
        );
        let mut parser = Parser::new(&registry, Dialect::Postgres);
        for (sql, ok) in [("(1, 2)", true), ("(1)", false), ("(1, 2, 3)", false)] {
            let stream = tokens(sql, Dialect::Postgres);
            assert_eq!(parser.parse_node("Pair", &stream).unwrap().is_some(), ok, "{sql}");
        }
    }

    #[test]
    fn test_singletons_by_value_end_the_list() {
        let mut registry = registry();
        registry.declare(
            "Names",
            node(["Name"])
                .named("names")
                .many(",")
                .singletons(Singletons::ByValue),
        );
        let stream = tokens("a, b, a", Dialect::Postgres);
        let mut parser = Parser::new(&registry, Dialect::Postgres);
        let id = parser.parse_node("Names", &stream).unwrap().unwrap();
        assert_eq!(parser.ast().children(id, "names").len(), 2);
        assert!(stream.matches(0, TokenKind::Punctuation, Some(",")).unwrap());
    }

    #[test]
    fn test_condition_skips_rule() {
        let mut registry = registry();
        registry.declare(
            "Limit",
            seq([
                seq([kw("LIMIT"), node(["Number"]).named("limit")]).optional(),
                seq([kw("OFFSET"), node(["Number"]).named("offset")])
                    .optional()
                    .when(Condition::Present("limit")),
            ]),
        );
        let mut parser = Parser::new(&registry, Dialect::Mysql);
        let stream = tokens("LIMIT 1 OFFSET 2", Dialect::Mysql);
        let id = parser.parse_node("Limit", &stream).unwrap().unwrap();
        assert!(parser.ast()[id].has("offset"));

        let stream = tokens("OFFSET 2", Dialect::Mysql);
        let id = parser.parse_node("Limit", &stream).unwrap().unwrap();
        assert!(!parser.ast()[id].has("offset"));
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn test_assert_reports_rule_path() {
        let mut registry = registry();
        registry.declare("Select", seq([kw("SELECT"), node(["Name"]).named("column").assert()]));
        let stream = tokens("SELECT 42", Dialect::Postgres);
        let mut parser = Parser::new(&registry, Dialect::Postgres);
        let err = parser.parse_node("Select", &stream).unwrap_err();
        let Error::Parse(err) = err else {
            panic!("expected a parse error, got {err:?}");
        };
        assert_eq!(err.node, Some("Select"));
        assert_eq!(err.rule_path.as_deref(), Some("Select/1"));
        assert_eq!(err.found, Some(TokenKind::NumberLiteral));
        assert_eq!(err.position.map(|p| p.column), Some(8));
    }

    #[test]
    fn test_assert_predicate() {
        let mut registry = registry();
        registry.declare("Select", seq([kw("SELECT"), node(["Name"]).named("column")]));
        let stream = tokens("SELECT 42", Dialect::Postgres);
        let mut parser = Parser::new(&registry, Dialect::Postgres);
        assert!(parser.parse_node("Select", &stream).unwrap().is_none());

        let mut parser = Parser::new(&registry, Dialect::Postgres)
            .with_options(ParseOptions::new().assert_when(|path| path == "Select/1"));
        assert!(matches!(
            parser.parse_node("Select", &stream),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_optional_rule_is_not_asserted() {
        let mut registry = registry();
        registry.declare(
            "Select",
            seq([kw("SELECT"), node(["Name"]).named("column").optional().assert()]),
        );
        let stream = tokens("SELECT", Dialect::Postgres);
        let mut parser = Parser::new(&registry, Dialect::Postgres);
        assert!(parser.parse_node("Select", &stream).unwrap().is_some());
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let registry = registry();
        let stream = tokens("a", Dialect::Postgres);
        let mut parser = Parser::new(&registry, Dialect::Postgres);
        assert!(matches!(
            parser.parse_node("Nope", &stream),
            Err(Error::Grammar(GrammarError::UnknownType { .. }))
        ));
    }
}
