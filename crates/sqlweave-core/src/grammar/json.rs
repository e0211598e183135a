//! Structured tree (JSON) mode.
//!
//! A node is written as an object whose `nodeName` is its type tag,
//! followed by its fields in declaration order. Terminals are plain strings,
//! or `{"value", "quoted", "modifier"}` objects when they carry quoting or a
//! literal prefix. Reading matches an object against the alternative field
//! schemas of its type; the first alternative whose shape fits wins.

use serde_json::{Map, Value};
use tracing::debug;

use crate::ast::{Ast, FieldValue, NodeId, Terminal};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::lexer::{tables, TokenKind};

use super::error::{GrammarError, ParseError};
use super::registry::Registry;
use super::rule::Singletons;
use super::schema::{AltSchema, FieldKind, FieldSchema};

/// Key holding the type tag of a node object.
pub const NODE_NAME: &str = "nodeName";

/// Writes the subtree at `id` as a structured tree.
#[must_use]
pub fn to_json(ast: &Ast, id: NodeId) -> Value {
    let node = &ast[id];
    let mut object = Map::new();
    object.insert(NODE_NAME.to_string(), Value::String(node.tag().to_string()));
    for (name, value) in node.fields() {
        let value = match value {
            FieldValue::Terminal(terminal) => terminal_to_json(terminal),
            FieldValue::Node(child) => to_json(ast, *child),
            FieldValue::List(items) => {
                Value::Array(items.iter().map(|item| to_json(ast, *item)).collect())
            }
        };
        object.insert(name.to_string(), value);
    }
    Value::Object(object)
}

fn terminal_to_json(terminal: &Terminal) -> Value {
    if !terminal.quoted && terminal.modifier.is_none() {
        return Value::String(terminal.value.clone());
    }
    let mut object = Map::new();
    object.insert("value".to_string(), Value::String(terminal.value.clone()));
    if terminal.quoted {
        object.insert("quoted".to_string(), Value::Bool(true));
    }
    if let Some(modifier) = &terminal.modifier {
        object.insert("modifier".to_string(), Value::String(modifier.clone()));
    }
    Value::Object(object)
}

/// Builds syntax trees from structured trees.
pub struct JsonReader<'r> {
    registry: &'r Registry,
    dialect: Dialect,
    strict: bool,
    ast: Ast,
}

impl<'r> JsonReader<'r> {
    /// Creates a reader building into a fresh arena for `dialect`.
    #[must_use]
    pub const fn new(registry: &'r Registry, dialect: Dialect) -> Self {
        Self {
            registry,
            dialect,
            strict: false,
            ast: Ast::new(dialect),
        }
    }

    /// Reports a tree that matches no alternative as a [`ParseError`]
    /// naming the node type, instead of as a mismatch.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Returns the arena built so far.
    #[must_use]
    pub const fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Consumes the reader and returns its arena.
    #[must_use]
    pub fn into_ast(self) -> Ast {
        self.ast
    }

    /// Reads a node through the registered syntax named by its `nodeName`,
    /// which must be one of `types`.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::UnknownType`] for unregistered tags and, in
    /// strict mode, a [`ParseError`] for trees that match no alternative.
    pub fn read_any(&mut self, types: &[&'static str], tree: &Value) -> Result<Option<NodeId>> {
        let Some(tag) = tree.get(NODE_NAME).and_then(Value::as_str) else {
            return Ok(None);
        };
        if !types.contains(&tag) {
            return Ok(None);
        }
        let registry = self.registry;
        let Some(syntax) = registry.syntax(tag) else {
            return Err(GrammarError::UnknownType {
                tag: tag.to_string(),
            }
            .into());
        };
        syntax.from_tree(self, tree)
    }

    /// Reads a node of type `tag` by matching its alternative schemas.
    ///
    /// # Errors
    ///
    /// See [`read_any`](Self::read_any).
    pub fn read_type(&mut self, tag: &str, tree: &Value) -> Result<Option<NodeId>> {
        let Some(object) = tree.as_object() else {
            return Ok(None);
        };
        if object.get(NODE_NAME).and_then(Value::as_str) != Some(tag) {
            return Ok(None);
        }
        let compiled = self.registry.compiled(tag, self.dialect)?;
        for alt in &compiled.alternatives {
            let mark = self.ast.mark();
            if let Some(fields) = self.read_alternative(alt, object)? {
                return Ok(Some(self.ast.build(compiled.tag, fields)?));
            }
            self.ast.truncate(mark);
        }
        if self.strict {
            let err = ParseError::new(format!(
                "{tag} object with fields [{}] matches no {} shape",
                object
                    .keys()
                    .filter(|key| *key != NODE_NAME)
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                self.dialect
            ))
            .in_rule(compiled.tag, compiled.tag, self.dialect);
            debug!(node = compiled.tag, error = %err, "structured tree rejected");
            return Err(err.into());
        }
        Ok(None)
    }

    fn read_alternative(
        &mut self,
        alt: &AltSchema,
        object: &Map<String, Value>,
    ) -> Result<Option<Vec<(&'static str, FieldValue)>>> {
        if object
            .keys()
            .any(|key| key != NODE_NAME && alt.field(key).is_none())
        {
            return Ok(None);
        }
        let mut fields = Vec::with_capacity(alt.fields.len());
        for schema in &alt.fields {
            let applies = schema
                .condition
                .map_or(true, |condition| condition.holds(|name| object.contains_key(name)));
            let Some(value) = object.get(schema.name) else {
                if schema.optional || !applies {
                    continue;
                }
                return Ok(None);
            };
            if !applies {
                return Ok(None);
            }
            let Some(field) = self.read_field(schema, value)? else {
                return Ok(None);
            };
            fields.push((schema.name, field));
        }
        Ok(Some(fields))
    }

    fn read_field(&mut self, schema: &FieldSchema, value: &Value) -> Result<Option<FieldValue>> {
        match &schema.kind {
            FieldKind::Terminal { kinds, values } => {
                Ok(self.read_terminal(kinds, values, value).map(FieldValue::Terminal))
            }
            FieldKind::Node { types } => {
                Ok(self.read_any(types, value)?.map(FieldValue::Node))
            }
            FieldKind::List {
                types,
                arity,
                singletons,
            } => {
                let Some(items) = value.as_array() else {
                    return Ok(None);
                };
                if items.len() < arity.min || arity.max.is_some_and(|max| items.len() > max) {
                    return Ok(None);
                }
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    let Some(id) = self.read_any(types, item)? else {
                        return Ok(None);
                    };
                    let repeated = match singletons {
                        Singletons::None => false,
                        Singletons::ByType => {
                            ids.iter().any(|other| self.ast[*other].tag() == self.ast[id].tag())
                        }
                        Singletons::ByValue => ids
                            .iter()
                            .any(|other| self.ast.structural_eq(*other, &self.ast, id)),
                    };
                    if repeated {
                        return Ok(None);
                    }
                    ids.push(id);
                }
                Ok(Some(FieldValue::List(ids)))
            }
        }
    }

    fn read_terminal(
        &self,
        kinds: &[TokenKind],
        values: &[&'static str],
        value: &Value,
    ) -> Option<Terminal> {
        let (text, quoted, modifier) = match value {
            Value::String(text) => (text.clone(), false, None),
            Value::Object(object) => {
                let text = object.get("value")?.as_str()?.to_string();
                let quoted = match object.get("quoted") {
                    None => false,
                    Some(flag) => flag.as_bool()?,
                };
                let modifier = match object.get("modifier") {
                    None => None,
                    Some(modifier) => Some(modifier.as_str()?.to_string()),
                };
                if object
                    .keys()
                    .any(|key| !matches!(key.as_str(), "value" | "quoted" | "modifier"))
                {
                    return None;
                }
                (text, quoted, modifier)
            }
            _ => return None,
        };
        let kind = self.infer_kind(kinds, &text, quoted)?;
        if !values.is_empty() {
            let accepted = values.iter().any(|v| {
                if kind.is_word() {
                    v.eq_ignore_ascii_case(&text)
                } else {
                    *v == text
                }
            });
            if !accepted {
                return None;
            }
        }
        Some(
            Terminal::new(kind, text)
                .quoted(quoted)
                .with_modifier(modifier),
        )
    }

    /// Picks the token kind a terminal value would have been lexed as.
    ///
    /// Operator fields only take operators the dialect defines, so a tree
    /// using another dialect's operator does not match.
    fn infer_kind(&self, kinds: &[TokenKind], text: &str, quoted: bool) -> Option<TokenKind> {
        if quoted {
            return kinds.contains(&TokenKind::Identifier).then_some(TokenKind::Identifier);
        }
        let upper = text.to_uppercase();
        let classified = tables::classify_word(self.dialect, &upper);
        if kinds.contains(&classified) {
            return Some(classified);
        }
        if kinds.contains(&TokenKind::Operator) {
            if tables::operator(self.dialect, &upper).is_none() {
                debug!(operator = text, dialect = %self.dialect, "operator unknown to dialect");
                return None;
            }
            return Some(TokenKind::Operator);
        }
        kinds.first().copied()
    }
}

impl std::fmt::Debug for JsonReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonReader")
            .field("dialect", &self.dialect)
            .field("strict", &self.strict)
            .field("nodes", &self.ast.len())
            .finish_non_exhaustive()
    }
}
