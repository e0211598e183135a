//! Grammar schema compilation.
//!
//! A node type's [`Rule`] tree is compiled once per dialect into a
//! [`CompiledType`]: the dialect-filtered rule tree, annotated with rule
//! paths and field sets, plus the ordered list of alternative field
//! schemas the structural reader matches against.

use crate::dialect::Dialect;
use crate::lexer::TokenKind;

use super::error::GrammarError;
use super::registry::Registry;
use super::rule::{Arity, Attrs, Climb, Condition, Rule, RuleKind, Singletons};

/// A dialect-filtered rule with its path and the fields it sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    pub(crate) kind: CompiledKind,
    pub(crate) attrs: Attrs,
    pub(crate) path: String,
    pub(crate) fields: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CompiledKind {
    Token {
        kinds: Vec<TokenKind>,
        values: Vec<&'static str>,
    },
    Node {
        types: Vec<&'static str>,
        climb: Option<Climb>,
    },
    Sequence(Vec<CompiledRule>),
    Alternatives(Vec<CompiledRule>),
    Block {
        kind: crate::lexer::BlockKind,
        inner: Box<CompiledRule>,
    },
}

impl CompiledRule {
    /// Returns the rule path, e.g. `SelectStmt/3/1`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the names of the fields set anywhere in this rule.
    #[must_use]
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    /// Returns true if this rule stores a field of its own.
    #[must_use]
    pub const fn is_named(&self) -> bool {
        self.attrs.name.is_some()
    }

    /// Node types a node rule accepts, the climbing node included.
    pub(crate) fn node_types(&self) -> Vec<&'static str> {
        match &self.kind {
            CompiledKind::Node { types, climb } => {
                let mut all = types.clone();
                if let Some(climb) = climb {
                    if !all.contains(&climb.node) {
                        all.push(climb.node);
                    }
                }
                all
            }
            _ => Vec::new(),
        }
    }
}

/// How a field is matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A token of one of `kinds`, restricted to `values` when non-empty.
    Terminal {
        /// Accepted token kinds.
        kinds: Vec<TokenKind>,
        /// Accepted values.
        values: Vec<&'static str>,
    },
    /// A single node of one of `types`.
    Node {
        /// Accepted node types.
        types: Vec<&'static str>,
    },
    /// A list of nodes of `types`.
    List {
        /// Accepted node types.
        types: Vec<&'static str>,
        /// Accepted item count.
        arity: Arity,
        /// Duplicate policy.
        singletons: Singletons,
    },
}

/// One field of an alternative schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// Field name.
    pub name: &'static str,
    /// Path of the rule that sets the field.
    pub rule_path: String,
    /// How the field is matched.
    pub kind: FieldKind,
    /// Whether the field may be absent.
    pub optional: bool,
    /// Condition on earlier fields under which the field applies.
    pub condition: Option<Condition>,
    /// Fields that must be evaluated before this one.
    pub dependencies: Vec<&'static str>,
}

/// One alternative shape of a node type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AltSchema {
    /// Fields in declaration order.
    pub fields: Vec<FieldSchema>,
}

impl AltSchema {
    /// Returns the schema of `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Iterates the fields that must be present.
    pub fn required(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields
            .iter()
            .filter(|f| !f.optional && f.condition.is_none())
    }

    fn key(&self) -> Vec<(&'static str, &str)> {
        self.fields
            .iter()
            .map(|f| (f.name, f.rule_path.as_str()))
            .collect()
    }
}

/// The compiled grammar of one node type in one dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledType {
    /// Node type tag.
    pub tag: &'static str,
    /// Dialect the grammar was filtered for.
    pub dialect: Dialect,
    /// Root rule; `None` when the type does not exist in the dialect.
    pub root: Option<CompiledRule>,
    /// Alternative field schemas; the first that matches wins.
    pub alternatives: Vec<AltSchema>,
}

/// Compiles `rule` as the grammar of `tag` in `dialect`.
///
/// # Errors
///
/// Returns a [`GrammarError`] describing the first malformed rule.
pub fn compile(
    tag: &'static str,
    rule: &Rule,
    dialect: Dialect,
    registry: &Registry,
) -> Result<CompiledType, GrammarError> {
    validate(rule, tag, registry)?;
    let mut seen = Vec::new();
    let root = filter(rule, dialect, tag.to_string(), &mut seen)?;

    let mut alternatives: Vec<AltSchema> = Vec::new();
    if let Some(root) = &root {
        for fields in expand(root, false, None) {
            let alt = AltSchema { fields };
            check_duplicates(tag, &alt)?;
            if !alternatives.iter().any(|known| known.key() == alt.key()) {
                alternatives.push(alt);
            }
        }
    }

    Ok(CompiledType {
        tag,
        dialect,
        root,
        alternatives,
    })
}

fn child_path(path: &str, index: usize) -> String {
    format!("{path}/{index}")
}

/// Checks the raw rule tree, before dialect filtering.
fn validate(rule: &Rule, path: &str, registry: &Registry) -> Result<(), GrammarError> {
    let attrs = &rule.attrs;
    let error_path = || path.to_string();
    let is_node = matches!(rule.kind, RuleKind::Node { .. });
    if !is_node && attrs.arity.is_some() {
        return Err(GrammarError::ArityOnNonNode { path: error_path() });
    }
    if attrs.separator.is_some() {
        if !is_node {
            return Err(GrammarError::ArityOnNonNode { path: error_path() });
        }
        if attrs.arity.is_none() {
            return Err(GrammarError::SeparatorWithoutArity { path: error_path() });
        }
    }

    match &rule.kind {
        RuleKind::Token { kinds, values } => {
            if kinds.is_empty() {
                return Err(GrammarError::Empty {
                    path: error_path(),
                    what: "token kind list",
                });
            }
            if attrs.name.is_none() && values.len() != 1 {
                return Err(GrammarError::FieldlessToken { path: error_path() });
            }
        }
        RuleKind::Node { types, climb } => {
            if types.is_empty() {
                return Err(GrammarError::Empty {
                    path: error_path(),
                    what: "node type list",
                });
            }
            if attrs.name.is_none() {
                return Err(GrammarError::UnnamedNode { path: error_path() });
            }
            for tag in types {
                if !registry.contains(tag) {
                    return Err(GrammarError::UnknownType {
                        tag: (*tag).to_string(),
                    });
                }
            }
            if let Some(climb) = climb {
                validate_climb(climb, path, registry)?;
            }
        }
        RuleKind::Sequence(rules) => {
            if rules.is_empty() {
                return Err(GrammarError::Empty {
                    path: error_path(),
                    what: "sequence",
                });
            }
            if attrs.name.is_some() {
                return Err(GrammarError::NamedComposite { path: error_path() });
            }
            for (i, child) in rules.iter().enumerate() {
                validate(child, &child_path(path, i), registry)?;
            }
        }
        RuleKind::Alternatives(rules) => {
            if rules.is_empty() {
                return Err(GrammarError::Empty {
                    path: error_path(),
                    what: "alternatives",
                });
            }
            if attrs.name.is_some() {
                let plain_tokens = rules.iter().all(|r| {
                    matches!(r.kind, RuleKind::Token { .. })
                        && r.attrs.name.is_none()
                        && !r.attrs.optional
                });
                if !plain_tokens {
                    return Err(GrammarError::NamedComposite { path: error_path() });
                }
                for (i, child) in rules.iter().enumerate() {
                    if let RuleKind::Token { kinds, .. } = &child.kind {
                        if kinds.is_empty() {
                            return Err(GrammarError::Empty {
                                path: child_path(path, i),
                                what: "token kind list",
                            });
                        }
                    }
                }
            } else {
                for (i, child) in rules.iter().enumerate() {
                    validate(child, &child_path(path, i), registry)?;
                }
            }
        }
        RuleKind::Block { inner, .. } => {
            if attrs.name.is_some() {
                return Err(GrammarError::NamedComposite { path: error_path() });
            }
            validate(inner, &child_path(path, 0), registry)?;
        }
    }
    Ok(())
}

fn validate_climb(climb: &Climb, path: &str, registry: &Registry) -> Result<(), GrammarError> {
    let Some(syntax) = registry.syntax(climb.node) else {
        return Err(GrammarError::UnknownType {
            tag: climb.node.to_string(),
        });
    };
    let mut names = Vec::new();
    collect_names(&syntax.rule(), &mut names);
    for field in [climb.left, climb.operator, climb.right] {
        if !names.contains(&field) {
            return Err(GrammarError::BadClimb {
                path: path.to_string(),
                node: climb.node.to_string(),
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

fn collect_names(rule: &Rule, names: &mut Vec<&'static str>) {
    if let Some(name) = rule.attrs.name {
        names.push(name);
    }
    match &rule.kind {
        RuleKind::Sequence(rules) | RuleKind::Alternatives(rules) => {
            for child in rules {
                collect_names(child, names);
            }
        }
        RuleKind::Block { inner, .. } => collect_names(inner, names),
        RuleKind::Token { .. } | RuleKind::Node { .. } => {}
    }
}

/// Drops rules of other dialects and annotates paths and field sets.
///
/// Composites left without children disappear with them. `seen` collects
/// field names in declaration order for the condition check.
fn filter(
    rule: &Rule,
    dialect: Dialect,
    path: String,
    seen: &mut Vec<&'static str>,
) -> Result<Option<CompiledRule>, GrammarError> {
    if rule.attrs.dialect.is_some_and(|d| d != dialect) {
        return Ok(None);
    }
    if let Some(condition) = rule.attrs.when {
        if !seen.contains(&condition.field()) {
            return Err(GrammarError::UnknownDependency {
                path,
                field: condition.field().to_string(),
            });
        }
    }

    let mut fields = Vec::new();
    let kind = match &rule.kind {
        RuleKind::Token { kinds, values } => CompiledKind::Token {
            kinds: kinds.clone(),
            values: values.clone(),
        },
        RuleKind::Node { types, climb } => CompiledKind::Node {
            types: types.clone(),
            climb: *climb,
        },
        RuleKind::Sequence(rules) | RuleKind::Alternatives(rules) => {
            let named_tokens = rule.attrs.name.is_some();
            let mut children = Vec::new();
            for (i, child) in rules.iter().enumerate() {
                let compiled = if named_tokens {
                    filter_plain(child, dialect, child_path(&path, i))
                } else {
                    filter(child, dialect, child_path(&path, i), seen)?
                };
                if let Some(compiled) = compiled {
                    for name in &compiled.fields {
                        if !fields.contains(name) {
                            fields.push(*name);
                        }
                    }
                    children.push(compiled);
                }
            }
            if children.is_empty() {
                return Ok(None);
            }
            if matches!(rule.kind, RuleKind::Sequence(_)) {
                CompiledKind::Sequence(children)
            } else {
                CompiledKind::Alternatives(children)
            }
        }
        RuleKind::Block { kind, inner } => {
            let Some(inner) = filter(inner, dialect, child_path(&path, 0), seen)? else {
                return Ok(None);
            };
            fields.extend(inner.fields.iter().copied());
            CompiledKind::Block {
                kind: *kind,
                inner: Box::new(inner),
            }
        }
    };

    if let Some(name) = rule.attrs.name {
        fields = vec![name];
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    Ok(Some(CompiledRule {
        kind,
        attrs: rule.attrs.clone(),
        path,
        fields,
    }))
}

/// Filters a branch of a named token alternative; it sets no field itself.
fn filter_plain(rule: &Rule, dialect: Dialect, path: String) -> Option<CompiledRule> {
    if rule.attrs.dialect.is_some_and(|d| d != dialect) {
        return None;
    }
    let RuleKind::Token { kinds, values } = &rule.kind else {
        return None;
    };
    Some(CompiledRule {
        kind: CompiledKind::Token {
            kinds: kinds.clone(),
            values: values.clone(),
        },
        attrs: rule.attrs.clone(),
        path,
        fields: Vec::new(),
    })
}

/// Fans a rule out into the field lists of its alternatives.
fn expand(
    rule: &CompiledRule,
    optional: bool,
    condition: Option<Condition>,
) -> Vec<Vec<FieldSchema>> {
    let optional = optional || rule.attrs.optional;
    let condition = rule.attrs.when.or(condition);
    let field = |kind: FieldKind| -> Vec<Vec<FieldSchema>> {
        let Some(name) = rule.attrs.name else {
            return vec![Vec::new()];
        };
        vec![vec![FieldSchema {
            name,
            rule_path: rule.path.clone(),
            kind,
            optional,
            condition,
            dependencies: condition.map(|c| vec![c.field()]).unwrap_or_default(),
        }]]
    };

    match &rule.kind {
        CompiledKind::Token { kinds, values } => field(FieldKind::Terminal {
            kinds: kinds.clone(),
            values: values.clone(),
        }),
        CompiledKind::Node { .. } => {
            let types = rule.node_types();
            match rule.attrs.arity {
                Some(arity) => field(FieldKind::List {
                    types,
                    arity,
                    singletons: rule.attrs.singletons,
                }),
                None => field(FieldKind::Node { types }),
            }
        }
        CompiledKind::Alternatives(branches) if rule.is_named() => {
            let mut kinds = Vec::new();
            let mut values = Vec::new();
            let mut any_value = false;
            for branch in branches {
                if let CompiledKind::Token {
                    kinds: k,
                    values: v,
                } = &branch.kind
                {
                    for kind in k {
                        if !kinds.contains(kind) {
                            kinds.push(*kind);
                        }
                    }
                    any_value |= v.is_empty();
                    values.extend(v.iter().copied());
                }
            }
            if any_value {
                values.clear();
            }
            field(FieldKind::Terminal { kinds, values })
        }
        CompiledKind::Alternatives(branches) => branches
            .iter()
            .flat_map(|branch| expand(branch, optional, condition))
            .collect(),
        CompiledKind::Sequence(children) => {
            let mut product: Vec<Vec<FieldSchema>> = vec![Vec::new()];
            for child in children {
                let options = expand(child, optional, condition);
                product = product
                    .iter()
                    .flat_map(|prefix| {
                        options.iter().map(move |option| {
                            let mut fields = prefix.clone();
                            fields.extend(option.iter().cloned());
                            fields
                        })
                    })
                    .collect();
            }
            product
        }
        CompiledKind::Block { inner, .. } => expand(inner, optional, condition),
    }
}

fn check_duplicates(tag: &str, alt: &AltSchema) -> Result<(), GrammarError> {
    for (i, field) in alt.fields.iter().enumerate() {
        if alt.fields[..i].iter().any(|f| f.name == field.name) {
            return Err(GrammarError::DuplicateField {
                node: tag.to_string(),
                field: field.name.to_string(),
            });
        }
    }
    Ok(())
}
