//! Node and field types.

use std::fmt;

use super::Terminal;

/// Index of a node in an [`Ast`](super::Ast) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The value of a named field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A matched token.
    Terminal(Terminal),
    /// A single child node.
    Node(NodeId),
    /// A variadic list of child nodes.
    List(Vec<NodeId>),
}

impl FieldValue {
    /// Returns the terminal, if this is one.
    #[must_use]
    pub const fn as_terminal(&self) -> Option<&Terminal> {
        match self {
            Self::Terminal(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the child node, if this is one.
    #[must_use]
    pub const fn as_node(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the child nodes of a list (or the single child).
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        match self {
            Self::Node(id) => std::slice::from_ref(id),
            Self::List(ids) => ids,
            Self::Terminal(_) => &[],
        }
    }
}

/// A syntax tree node.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) tag: &'static str,
    pub(crate) fields: Vec<(&'static str, FieldValue)>,
    pub(crate) parent: Option<NodeId>,
}

impl Node {
    /// Returns the node type tag.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        self.tag
    }

    /// Returns the owning node.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the value of `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Returns true if `name` is set.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Iterates the fields in the order they were set.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    /// Returns the field names in the order they were set.
    #[must_use]
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }
}
