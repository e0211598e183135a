//! SQL rendering.
//!
//! The [`Serializer`] walks a node's compiled rule in the target dialect and
//! writes the fields the node holds. Alternatives are chosen by the fields
//! present; binary expressions get parentheses wherever operator precedence
//! would otherwise regroup them on re-parse.

use tracing::trace;

use crate::ast::{Ast, FieldValue, Node, NodeId, Terminal};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::lexer::tables::{self, precedence};
use crate::lexer::{Associativity, TokenKind};

use super::error::{GrammarError, SerializeError};
use super::registry::Registry;
use super::rule::Climb;
use super::schema::{CompiledKind, CompiledRule};

/// Letter case of rendered keywords, data types and word operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeywordCase {
    /// `SELECT`
    #[default]
    Upper,
    /// `select`
    Lower,
}

/// Layout options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Break clauses onto lines and wrap long lists.
    pub pretty: bool,
    /// Spaces per indentation level.
    pub indent_width: usize,
    /// Width past which a list is broken one item per line.
    pub line_width: usize,
    /// Drop redundant parentheses.
    pub minimal_parens: bool,
    /// Keyword letter case.
    pub keyword_case: KeywordCase,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent_width: 4,
            line_width: 80,
            minimal_parens: false,
            keyword_case: KeywordCase::Upper,
        }
    }
}

impl FormatOptions {
    /// Single-line output.
    #[must_use]
    pub fn compact() -> Self {
        Self::default()
    }

    /// Multi-line output.
    #[must_use]
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            ..Self::default()
        }
    }

    /// Sets the line width.
    #[must_use]
    pub const fn line_width(mut self, width: usize) -> Self {
        self.line_width = width;
        self
    }

    /// Sets the indentation width.
    #[must_use]
    pub const fn indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    /// Drops redundant parentheses when `on`.
    #[must_use]
    pub const fn minimal_parens(mut self, on: bool) -> Self {
        self.minimal_parens = on;
        self
    }

    /// Sets the keyword case.
    #[must_use]
    pub const fn keyword_case(mut self, case: KeywordCase) -> Self {
        self.keyword_case = case;
        self
    }
}

/// Output buffer with automatic spacing.
#[derive(Debug, Default)]
struct Writer {
    out: String,
    line_start: usize,
    indent: usize,
    fresh_line: bool,
    tight: bool,
}

impl Writer {
    fn column(&self) -> usize {
        self.out.len() - self.line_start
    }

    fn newline(&mut self) {
        if self.out.is_empty() || self.fresh_line {
            return;
        }
        self.out.push('\n');
        self.line_start = self.out.len();
        self.fresh_line = true;
    }

    fn token(&mut self, text: &str, indent_width: usize) {
        if self.fresh_line {
            self.out.push_str(&" ".repeat(self.indent * indent_width));
            self.fresh_line = false;
        } else if needs_space(&self.out, text, self.tight) {
            self.out.push(' ');
        }
        self.tight = false;
        self.out.push_str(text);
    }
}

/// Decides whether a space separates `next` from the text written so far.
fn needs_space(prev: &str, next: &str, tight: bool) -> bool {
    let (Some(last), Some(first)) = (prev.chars().last(), next.chars().next()) else {
        return false;
    };
    // `--` and `/*` would start comments.
    if (last == '-' && first == '-') || (last == '/' && first == '*') {
        return true;
    }
    if tight {
        return false;
    }
    // A number such as `.5` is spaced like any other operand.
    let fraction = first == '.' && next[1..].starts_with(|c: char| c.is_ascii_digit());
    if !fraction && (matches!(first, ',' | ';' | ')' | ']' | '}' | '.') || next.starts_with("::"))
    {
        return false;
    }
    !(matches!(last, '(' | '[' | '{' | '.') || prev.ends_with("::"))
}

/// Rendering context of the node being written.
#[derive(Debug, Clone, Copy)]
struct Frame {
    id: NodeId,
    /// Lowest operator precedence that may appear unparenthesized.
    min: u8,
    /// Precedence of the operator written right after this node, `0` if
    /// none.
    trailing: u8,
    climb: Option<(Climb, u8, Associativity)>,
    /// Inside a dropped optional block: pass `min` and `trailing` through.
    passthrough: bool,
}

/// Renders syntax trees as SQL text.
///
/// # Example
///
/// ```rust
/// use sqlweave_core::dialect::Dialect;
/// use sqlweave_core::grammar::{default_registry, Parser, Serializer};
/// use sqlweave_core::lexer::Tokenizer;
///
/// let stream = Tokenizer::new("select id from users where id=$1", Dialect::Postgres).into_stream();
/// let mut parser = Parser::new(default_registry(), Dialect::Postgres);
/// let id = parser.parse_node("SelectStmt", &stream).unwrap().unwrap();
///
/// let mut serializer = Serializer::new(default_registry(), Dialect::Mysql);
/// let sql = serializer.serialize(parser.ast(), id).unwrap();
/// assert_eq!(sql, "SELECT id FROM users WHERE id = ?");
/// ```
#[derive(Debug)]
pub struct Serializer<'r> {
    registry: &'r Registry,
    dialect: Dialect,
    options: FormatOptions,
    binds: usize,
    flat: usize,
}

impl<'r> Serializer<'r> {
    /// Creates a serializer for `dialect` with default options.
    #[must_use]
    pub fn new(registry: &'r Registry, dialect: Dialect) -> Self {
        Self {
            registry,
            dialect,
            options: FormatOptions::default(),
            binds: 0,
            flat: 0,
        }
    }

    /// Replaces the layout options.
    #[must_use]
    pub fn with_options(mut self, options: FormatOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the target dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Renders the subtree at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::MissingField`] when a required field is
    /// absent, [`SerializeError::NoAlternative`] when no rendering of a
    /// node fits its fields in the target dialect,
    /// [`SerializeError::BindOrder`] for numbered binds out of sequence in
    /// a positional dialect, and [`GrammarError::UnknownType`] for
    /// unregistered node types.
    pub fn serialize(&mut self, ast: &Ast, id: NodeId) -> Result<String> {
        self.binds = 0;
        let mut writer = Writer::default();
        self.render_node(ast, &mut writer, id, 0, 0)?;
        Ok(writer.out)
    }

    const fn pretty(&self) -> bool {
        self.options.pretty && self.flat == 0
    }

    fn emit(&self, w: &mut Writer, text: &str, tight: bool) {
        if tight {
            w.tight = true;
        }
        w.token(text, self.options.indent_width);
    }

    fn render_node(
        &mut self,
        ast: &Ast,
        w: &mut Writer,
        id: NodeId,
        min: u8,
        trailing: u8,
    ) -> Result<()> {
        let node = &ast[id];
        let tag = node.tag();
        let Some(syntax) = self.registry.syntax(tag) else {
            return Err(GrammarError::UnknownType {
                tag: tag.to_string(),
            }
            .into());
        };
        let compiled = self.registry.compiled(tag, self.dialect)?;
        let Some(root) = &compiled.root else {
            return Err(self.no_alternative(node).into());
        };

        let climb = syntax.climb().map(|climb| {
            let (prec, assoc) = self.operator_info(ast, node.field(climb.operator));
            (climb, prec, assoc)
        });
        let wrap = match climb {
            Some((_, prec, _)) => prec < min,
            None => prefix_binding(root).is_some_and(|binding| trailing > binding),
        };
        if wrap {
            trace!(node = tag, min, trailing, "parenthesizing");
            self.emit(w, "(", false);
        }
        let frame = Frame {
            id,
            min: if wrap { 0 } else { min },
            trailing: if wrap { 0 } else { trailing },
            climb,
            passthrough: false,
        };
        self.render_rule(ast, w, root, frame)?;
        if wrap {
            self.emit(w, ")", false);
        }
        Ok(())
    }

    fn render_rule(&mut self, ast: &Ast, w: &mut Writer, rule: &CompiledRule, frame: Frame) -> Result<()> {
        let node = &ast[frame.id];
        if let Some(condition) = rule.attrs.when {
            if !condition.holds(|name| node.has(name)) {
                return Ok(());
            }
        }
        if rule.attrs.optional && !present(rule, node) {
            return Ok(());
        }

        let pretty = self.pretty();
        let list = rule.attrs.arity.is_some();
        if pretty && rule.attrs.newline && !list {
            w.newline();
        }
        if pretty && rule.attrs.indent {
            w.indent += 1;
        }
        let result = self.render_kind(ast, w, rule, frame);
        if pretty && rule.attrs.indent {
            w.indent -= 1;
        }
        result
    }

    fn render_kind(&mut self, ast: &Ast, w: &mut Writer, rule: &CompiledRule, frame: Frame) -> Result<()> {
        let node = &ast[frame.id];
        match &rule.kind {
            CompiledKind::Token { kinds, values } => match rule.attrs.name {
                Some(name) => self.render_terminal_field(w, node, name, rule),
                None => {
                    if let (Some(kind), Some(value)) = (kinds.first(), values.first()) {
                        let text = self.fixed_token(*kind, value);
                        self.emit(w, &text, rule.attrs.tight);
                    }
                    Ok(())
                }
            },
            CompiledKind::Alternatives(_) if rule.is_named() => match rule.attrs.name {
                Some(name) => self.render_terminal_field(w, node, name, rule),
                None => Ok(()),
            },
            CompiledKind::Node { .. } => self.render_child(ast, w, rule, frame),
            CompiledKind::Sequence(children) => {
                for child in children {
                    self.render_rule(ast, w, child, frame)?;
                }
                Ok(())
            }
            CompiledKind::Alternatives(branches) => {
                let present: Vec<&str> = rule
                    .fields()
                    .iter()
                    .copied()
                    .filter(|name| node.has(name))
                    .collect();
                let branch = branches.iter().find(|branch| {
                    present.iter().all(|name| branch.fields().contains(name)) && fits(branch, node)
                });
                match branch {
                    Some(branch) => self.render_rule(ast, w, branch, frame),
                    None => Err(self.no_alternative(node).into()),
                }
            }
            CompiledKind::Block { kind, inner } => {
                if rule.attrs.optional_parens {
                    if !inner.fields().iter().any(|name| node.has(name)) {
                        return Ok(());
                    }
                    if self.options.minimal_parens {
                        let frame = Frame {
                            passthrough: true,
                            ..frame
                        };
                        return self.render_rule(ast, w, inner, frame);
                    }
                }
                self.emit(w, &kind.open().to_string(), rule.attrs.tight);
                let frame = Frame {
                    min: 0,
                    trailing: 0,
                    passthrough: false,
                    ..frame
                };
                self.render_rule(ast, w, inner, frame)?;
                self.emit(w, &kind.close().to_string(), false);
                Ok(())
            }
        }
    }

    fn render_child(&mut self, ast: &Ast, w: &mut Writer, rule: &CompiledRule, frame: Frame) -> Result<()> {
        let node = &ast[frame.id];
        let Some(name) = rule.attrs.name else {
            return Ok(());
        };
        match node.field(name) {
            Some(FieldValue::Node(child)) => {
                let (min, trailing) = child_context(rule, name, frame);
                if rule.attrs.tight {
                    w.tight = true;
                }
                self.render_node(ast, w, *child, min, trailing)
            }
            Some(FieldValue::List(items)) => self.render_list(ast, w, rule, items),
            _ => Err(missing(node, name).into()),
        }
    }

    fn render_list(&mut self, ast: &Ast, w: &mut Writer, rule: &CompiledRule, items: &[NodeId]) -> Result<()> {
        let pretty = self.pretty();
        let newline_each = pretty && rule.attrs.newline;
        let break_lines = pretty
            && !newline_each
            && items.len() > 1
            && w.column() + self.flat_width(ast, rule, items)? > self.options.line_width;
        if break_lines {
            w.indent += 1;
        }
        let mut result = Ok(());
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                if let Some(separator) = rule.attrs.separator {
                    self.emit(w, separator, false);
                }
            }
            if newline_each || break_lines {
                w.newline();
            } else if i == 0 && rule.attrs.tight {
                w.tight = true;
            }
            result = self.render_node(ast, w, *item, 0, 0);
            if result.is_err() {
                break;
            }
        }
        if break_lines {
            w.indent -= 1;
        }
        result
    }

    /// Width of a list written on one line. Bind numbering is unaffected.
    fn flat_width(&mut self, ast: &Ast, rule: &CompiledRule, items: &[NodeId]) -> Result<usize> {
        let binds = self.binds;
        self.flat += 1;
        let mut scratch = Writer::default();
        let mut result = Ok(());
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                if let Some(separator) = rule.attrs.separator {
                    self.emit(&mut scratch, separator, false);
                }
            }
            result = self.render_node(ast, &mut scratch, *item, 0, 0);
            if result.is_err() {
                break;
            }
        }
        self.flat -= 1;
        self.binds = binds;
        result.map(|()| scratch.out.len())
    }

    fn render_terminal_field(
        &mut self,
        w: &mut Writer,
        node: &Node,
        name: &'static str,
        rule: &CompiledRule,
    ) -> Result<()> {
        match node.field(name) {
            Some(FieldValue::Terminal(terminal)) => {
                let text = self.terminal(terminal)?;
                self.emit(w, &text, rule.attrs.tight);
                Ok(())
            }
            _ => Err(missing(node, name).into()),
        }
    }

    fn fixed_token(&self, kind: TokenKind, value: &str) -> String {
        match kind {
            TokenKind::Keyword | TokenKind::DataType => self.keyword(value),
            TokenKind::Operator if value.chars().any(char::is_alphabetic) => self.keyword(value),
            _ => value.to_string(),
        }
    }

    fn keyword(&self, value: &str) -> String {
        match self.options.keyword_case {
            KeywordCase::Upper => value.to_uppercase(),
            KeywordCase::Lower => value.to_lowercase(),
        }
    }

    fn terminal(&mut self, terminal: &Terminal) -> Result<String> {
        let rules = self.dialect.rules();
        let value = terminal.value.as_str();
        let text = match terminal.kind {
            TokenKind::Identifier => {
                if terminal.quoted || needs_quotes(self.dialect, value) {
                    rules.quote_identifier(value)
                } else {
                    value.to_string()
                }
            }
            TokenKind::StringLiteral => self.string_literal(terminal),
            TokenKind::HexLiteral => rules.hex_literal(value, terminal.modifier.as_deref()),
            TokenKind::BitLiteral => rules.bit_literal(value, terminal.modifier.as_deref()),
            TokenKind::BindVariable => {
                self.binds += 1;
                let index = value.parse::<usize>().unwrap_or(self.binds);
                // Positional binds cannot express `$2` before `$1`.
                if !rules.numbered_binds() && index != self.binds {
                    return Err(SerializeError::BindOrder {
                        index,
                        position: self.binds,
                        dialect: self.dialect,
                    }
                    .into());
                }
                rules.bind_variable(index)
            }
            TokenKind::Variable => {
                format!("{}{value}", terminal.modifier.as_deref().unwrap_or("@"))
            }
            kind => self.fixed_token(kind, value),
        };
        Ok(text)
    }

    fn string_literal(&self, terminal: &Terminal) -> String {
        let body = self.dialect.rules().quote_string(&terminal.value);
        match (terminal.modifier.as_deref(), self.dialect) {
            (Some("N"), _) if body.starts_with('\'') => format!("N{body}"),
            (Some(charset), Dialect::Mysql) if charset.starts_with('_') => format!("{charset}{body}"),
            (Some("E"), Dialect::Postgres) if body.starts_with('\'') => {
                let escaped = terminal.value.replace('\\', "\\\\").replace('\'', "\\'");
                format!("E'{escaped}'")
            }
            _ => body,
        }
    }

    /// Precedence and associativity of a binary node's operator, looked up
    /// in the target dialect first.
    fn operator_info(&self, ast: &Ast, operator: Option<&FieldValue>) -> (u8, Associativity) {
        let info = operator
            .and_then(FieldValue::as_terminal)
            .and_then(|terminal| {
                let symbol = terminal.value.to_uppercase();
                tables::operator(self.dialect, &symbol)
                    .or_else(|| tables::operator(ast.dialect(), &symbol))
            })
            .filter(|info| info.binary);
        info.map_or((precedence::OTHER, Associativity::Left), |info| {
            (info.precedence, info.associativity)
        })
    }

    fn no_alternative(&self, node: &Node) -> SerializeError {
        SerializeError::NoAlternative {
            node: node.tag().to_string(),
            dialect: self.dialect,
            fields: node.field_names().join(", "),
        }
    }
}

fn missing(node: &Node, field: &str) -> SerializeError {
    SerializeError::MissingField {
        node: node.tag().to_string(),
        field: field.to_string(),
    }
}

/// Precedence bounds for the child stored in `name`.
fn child_context(rule: &CompiledRule, name: &str, frame: Frame) -> (u8, u8) {
    if let Some((climb, prec, assoc)) = frame.climb {
        let raised = prec.saturating_add(1);
        if name == climb.left {
            return match assoc {
                Associativity::Left => (prec, prec),
                Associativity::Right => (raised, prec),
            };
        }
        if name == climb.right {
            return match assoc {
                Associativity::Left => (raised, frame.trailing),
                Associativity::Right => (prec, frame.trailing),
            };
        }
    }
    if frame.passthrough {
        return (frame.min, frame.trailing);
    }
    rule.attrs
        .min_precedence
        .map_or((0, 0), |min| (min, frame.trailing))
}

/// Binding strength of a prefix node: one below the threshold of its
/// trailing operand.
fn prefix_binding(root: &CompiledRule) -> Option<u8> {
    let CompiledKind::Sequence(children) = &root.kind else {
        return None;
    };
    let last = children.last()?;
    match last.kind {
        CompiledKind::Node { .. } if last.attrs.arity.is_none() => {
            last.attrs.min_precedence.map(|min| min.saturating_sub(1))
        }
        _ => None,
    }
}

/// True if an optional rule has something to render.
fn present(rule: &CompiledRule, node: &Node) -> bool {
    rule.fields().is_empty() || rule.fields().iter().any(|name| node.has(name))
}

/// True if `rule` can be rendered from the fields of `node`.
fn fits(rule: &CompiledRule, node: &Node) -> bool {
    if let Some(condition) = rule.attrs.when {
        if !condition.holds(|name| node.has(name)) {
            return true;
        }
    }
    if rule.attrs.optional && !present(rule, node) {
        return true;
    }
    match &rule.kind {
        CompiledKind::Token { .. } | CompiledKind::Alternatives(_) if rule.is_named() => {
            rule.attrs.name.is_some_and(|name| node.has(name))
        }
        CompiledKind::Token { .. } => true,
        CompiledKind::Node { .. } => rule.attrs.name.is_some_and(|name| node.has(name)),
        CompiledKind::Sequence(children) => children.iter().all(|child| fits(child, node)),
        CompiledKind::Alternatives(branches) => branches.iter().any(|branch| fits(branch, node)),
        CompiledKind::Block { inner, .. } => fits(inner, node),
    }
}

/// True if an identifier must be quoted to survive re-tokenizing.
fn needs_quotes(dialect: Dialect, value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    if !(first.is_alphabetic() || first == '_') {
        return true;
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        return true;
    }
    let upper = value.to_uppercase();
    tables::is_keyword(dialect, &upper) || tables::is_data_type(dialect, &upper)
}
