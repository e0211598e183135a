//! Node type registry.
//!
//! Grammar rules refer to node types by tag; the [`Registry`] resolves the
//! tags lazily when a rule is compiled or matched, so types may refer to
//! each other in any order, recursively included.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::ast::NodeId;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::stream::TokenStream;

use super::error::GrammarError;
use super::json::JsonReader;
use super::parser::Parser;
use super::rule::{Climb, Rule};
use super::schema::{self, CompiledType};

/// The capabilities of a registered node type.
///
/// Most types only declare a [`rule`](Self::rule); the default `parse` and
/// `from_tree` interpret it. Types override them to parse in a way the rule
/// cannot express.
pub trait NodeSyntax: Send + Sync {
    /// Returns the type tag.
    fn type_tag(&self) -> &'static str;

    /// Returns the declarative grammar of the type.
    fn rule(&self) -> Rule;

    /// Returns the climbing shape if nodes of this type are built by
    /// precedence climbing.
    fn climb(&self) -> Option<Climb> {
        None
    }

    /// Parses a node of this type from `stream`.
    ///
    /// # Errors
    ///
    /// Returns lexical, stream or asserted parse errors. A mismatch is
    /// `Ok(None)`.
    fn parse(&self, parser: &mut Parser<'_>, stream: &TokenStream) -> Result<Option<NodeId>> {
        parser.parse_type(self.type_tag(), stream)
    }

    /// Reads a node of this type from a structured tree.
    ///
    /// # Errors
    ///
    /// Returns grammar or asserted parse errors. A mismatch is `Ok(None)`.
    fn from_tree(&self, reader: &mut JsonReader<'_>, tree: &Value) -> Result<Option<NodeId>> {
        reader.read_type(self.type_tag(), tree)
    }
}

/// A node type defined by its rule alone.
#[derive(Debug, Clone)]
pub struct DeclaredNode {
    tag: &'static str,
    rule: Rule,
}

impl DeclaredNode {
    /// Creates a declared node type.
    #[must_use]
    pub const fn new(tag: &'static str, rule: Rule) -> Self {
        Self { tag, rule }
    }
}

impl NodeSyntax for DeclaredNode {
    fn type_tag(&self) -> &'static str {
        self.tag
    }

    fn rule(&self) -> Rule {
        self.rule.clone()
    }
}

/// A binary node type built by precedence climbing over `operands`.
///
/// Its rule describes the node's shape for rendering and structural reads;
/// token parsing climbs instead, which keeps left-recursive shapes such as
/// `left operator right` usable.
#[derive(Debug, Clone)]
pub struct ClimbingNode {
    operands: Vec<&'static str>,
    climb: Climb,
    rule: Rule,
}

impl ClimbingNode {
    /// Creates a climbing node type. The type tag is `climb.node`.
    pub fn new(operands: impl Into<Vec<&'static str>>, climb: Climb, rule: Rule) -> Self {
        Self {
            operands: operands.into(),
            climb,
            rule,
        }
    }
}

impl NodeSyntax for ClimbingNode {
    fn type_tag(&self) -> &'static str {
        self.climb.node
    }

    fn rule(&self) -> Rule {
        self.rule.clone()
    }

    fn climb(&self) -> Option<Climb> {
        Some(self.climb)
    }

    /// Climbs from precedence zero and keeps the result only if at least
    /// one operator was combined.
    fn parse(&self, parser: &mut Parser<'_>, stream: &TokenStream) -> Result<Option<NodeId>> {
        let start = stream.savepoint()?;
        let mark = parser.ast().mark();
        let parsed = parser.parse_climbing(&self.operands, self.climb, 0, stream)?;
        match parsed {
            Some(id) if parser.ast()[id].tag() == self.climb.node => Ok(Some(id)),
            _ => {
                stream.restore(start)?;
                parser.truncate(mark);
                Ok(None)
            }
        }
    }
}

type SchemaCache = HashMap<(&'static str, Dialect), Arc<CompiledType>>;

/// Type tag to [`NodeSyntax`] table with a per-dialect schema cache.
///
/// Compiled schemas are written at most once per (type, dialect); a
/// concurrent recompilation produces an identical value.
#[derive(Default)]
pub struct Registry {
    types: HashMap<&'static str, Arc<dyn NodeSyntax>>,
    cache: RwLock<SchemaCache>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node type, replacing any type with the same tag.
    pub fn register(&mut self, syntax: impl NodeSyntax + 'static) -> &mut Self {
        let tag = syntax.type_tag();
        self.types.insert(tag, Arc::new(syntax));
        self.cache
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(cached, _), _| *cached != tag);
        self
    }

    /// Registers a node type defined by `rule`.
    pub fn declare(&mut self, tag: &'static str, rule: Rule) -> &mut Self {
        self.register(DeclaredNode::new(tag, rule))
    }

    /// Returns the node type registered as `tag`.
    #[must_use]
    pub fn syntax(&self, tag: &str) -> Option<&dyn NodeSyntax> {
        self.types.get(tag).map(|syntax| syntax.as_ref())
    }

    /// Returns true if `tag` is registered.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.types.contains_key(tag)
    }

    /// Returns the registered tags, sorted.
    #[must_use]
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<&'static str> = self.types.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    /// Returns the compiled schema of `tag` in `dialect`, compiling it on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::UnknownType`] for unregistered tags and any
    /// validation error of the type's rule.
    pub fn compiled(&self, tag: &str, dialect: Dialect) -> Result<Arc<CompiledType>> {
        let Some((tag, syntax)) = self.types.get_key_value(tag) else {
            return Err(GrammarError::UnknownType {
                tag: tag.to_string(),
            }
            .into());
        };
        let tag: &'static str = *tag;
        let key = (tag, dialect);
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(compiled) = cache.get(&key) {
                return Ok(Arc::clone(compiled));
            }
        }

        let compiled = Arc::new(schema::compile(tag, &syntax.rule(), dialect, self)?);
        debug!(
            node = tag,
            %dialect,
            alternatives = compiled.alternatives.len(),
            "compiled grammar schema"
        );
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(key).or_insert(compiled)))
    }

    /// Compiles every registered type in every dialect.
    ///
    /// # Errors
    ///
    /// Returns the first grammar error found.
    pub fn validate(&self) -> Result<()> {
        for tag in self.tags() {
            for dialect in Dialect::ALL {
                self.compiled(tag, dialect)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.tags())
            .finish_non_exhaustive()
    }
}

/// Returns the registry holding the built-in SQL grammar.
pub fn default_registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = Registry::new();
        super::sql::register(&mut registry);
        registry
    })
}
