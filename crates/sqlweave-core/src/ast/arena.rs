//! The node arena.

use std::ops::Index;

use super::{FieldValue, Node, NodeId, Terminal};
use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// Arena holding every node of one or more syntax trees.
///
/// Children reference their parent by index; a node that already has a
/// parent cannot be adopted by another one until it is
/// [released](Self::release).
#[derive(Debug, Clone)]
pub struct Ast {
    dialect: Dialect,
    nodes: Vec<Node>,
}

impl Ast {
    /// Creates an empty arena for trees of `dialect`.
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            nodes: Vec::new(),
        }
    }

    /// Returns the dialect the trees were built for.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the arena holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node `id`, if it exists.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Creates a node from its fields and adopts every child in them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ownership`] if a child already has a parent; the
    /// arena is left unchanged.
    pub fn build(
        &mut self,
        tag: &'static str,
        fields: Vec<(&'static str, FieldValue)>,
    ) -> Result<NodeId> {
        for (_, value) in &fields {
            for child in value.nodes() {
                self.check_orphan(*child)?;
            }
        }
        let id = NodeId(self.nodes.len());
        for (_, value) in &fields {
            for child in value.nodes() {
                self.nodes[child.0].parent = Some(id);
            }
        }
        self.nodes.push(Node {
            tag,
            fields,
            parent: None,
        });
        Ok(id)
    }

    /// Sets a terminal field.
    pub fn set_terminal(&mut self, id: NodeId, name: &'static str, terminal: Terminal) {
        self.set_field(id, name, FieldValue::Terminal(terminal));
    }

    /// Makes `child` the value of `parent.name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ownership`] if `child` already has a parent and
    /// [`Error::Cycle`] if `child` is `parent` or one of its ancestors.
    pub fn adopt(&mut self, parent: NodeId, name: &'static str, child: NodeId) -> Result<()> {
        self.check_attachable(parent, child)?;
        self.release_field(parent, name);
        self.nodes[child.0].parent = Some(parent);
        self.set_field(parent, name, FieldValue::Node(child));
        Ok(())
    }

    /// Appends `child` to the list field `parent.name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ownership`] if `child` already has a parent and
    /// [`Error::Cycle`] if `child` is `parent` or one of its ancestors.
    pub fn push_child(&mut self, parent: NodeId, name: &'static str, child: NodeId) -> Result<()> {
        self.check_attachable(parent, child)?;
        self.nodes[child.0].parent = Some(parent);
        let node = &mut self.nodes[parent.0];
        match node.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, FieldValue::List(items))) => items.push(child),
            Some((_, value)) => *value = FieldValue::List(vec![child]),
            None => node.fields.push((name, FieldValue::List(vec![child]))),
        }
        Ok(())
    }

    /// Detaches `child` from its parent and returns the former parent.
    pub fn release(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get_mut(child.0)?.parent.take()?;
        let fields = &mut self.nodes[parent.0].fields;
        fields.retain_mut(|(_, value)| match value {
            FieldValue::Node(id) => *id != child,
            FieldValue::List(items) => {
                items.retain(|id| *id != child);
                true
            }
            FieldValue::Terminal(_) => true,
        });
        Some(parent)
    }

    /// Removes a field, releasing any children it held.
    pub fn remove_field(&mut self, id: NodeId, name: &str) -> Option<FieldValue> {
        let node = &mut self.nodes[id.0];
        let at = node.fields.iter().position(|(field, _)| *field == name)?;
        let (_, value) = node.fields.remove(at);
        for child in value.nodes() {
            self.nodes[child.0].parent = None;
        }
        Some(value)
    }

    fn release_field(&mut self, id: NodeId, name: &str) {
        self.remove_field(id, name);
    }

    fn set_field(&mut self, id: NodeId, name: &'static str, value: FieldValue) {
        let node = &mut self.nodes[id.0];
        match node.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => *slot = value,
            None => node.fields.push((name, value)),
        }
    }

    fn check_orphan(&self, child: NodeId) -> Result<()> {
        match self.nodes[child.0].parent {
            Some(parent) => Err(Error::Ownership {
                node: child,
                parent,
            }),
            None => Ok(()),
        }
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_orphan(child)?;
        let mut ancestor = Some(parent);
        while let Some(id) = ancestor {
            if id == child {
                return Err(Error::Cycle {
                    node: child,
                    parent,
                });
            }
            ancestor = self.nodes[id.0].parent;
        }
        Ok(())
    }

    /// Returns the value of `id.name`.
    #[must_use]
    pub fn field(&self, id: NodeId, name: &str) -> Option<&FieldValue> {
        self.nodes[id.0].field(name)
    }

    /// Returns the terminal in `id.name`.
    #[must_use]
    pub fn terminal(&self, id: NodeId, name: &str) -> Option<&Terminal> {
        self.field(id, name).and_then(FieldValue::as_terminal)
    }

    /// Returns the single child in `id.name`.
    #[must_use]
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.field(id, name).and_then(FieldValue::as_node)
    }

    /// Returns the children in `id.name`.
    #[must_use]
    pub fn children(&self, id: NodeId, name: &str) -> &[NodeId] {
        self.field(id, name).map_or(&[], FieldValue::nodes)
    }

    /// Iterates the nodes without a parent, oldest first.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(i, _)| NodeId(i))
    }

    /// Returns `id` and all of its descendants in pre-order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            let node = &self.nodes[next.0];
            for (_, value) in node.fields.iter().rev() {
                stack.extend(value.nodes().iter().rev());
            }
        }
        out
    }

    /// Compares two subtrees by type tags, field names and terminal
    /// contents; positions are ignored.
    #[must_use]
    pub fn structural_eq(&self, a: NodeId, other: &Self, b: NodeId) -> bool {
        let (left, right) = (&self.nodes[a.0], &other.nodes[b.0]);
        if left.tag != right.tag || left.fields.len() != right.fields.len() {
            return false;
        }
        left.fields.iter().all(|(name, value)| {
            let Some(theirs) = right.field(name) else {
                return false;
            };
            match (value, theirs) {
                (FieldValue::Terminal(x), FieldValue::Terminal(y)) => x.same_as(y),
                (FieldValue::Node(x), FieldValue::Node(y)) => self.structural_eq(*x, other, *y),
                (FieldValue::List(xs), FieldValue::List(ys)) => {
                    xs.len() == ys.len()
                        && xs
                            .iter()
                            .zip(ys)
                            .all(|(x, y)| self.structural_eq(*x, other, *y))
                }
                _ => false,
            }
        })
    }

    /// Copies the subtree at `id` into `target` and returns the new root,
    /// which has no parent.
    pub fn copy_into(&self, id: NodeId, target: &mut Self) -> NodeId {
        let node = &self.nodes[id.0];
        let fields = node
            .fields
            .iter()
            .map(|(name, value)| {
                let copied = match value {
                    FieldValue::Terminal(t) => FieldValue::Terminal(t.clone()),
                    FieldValue::Node(child) => FieldValue::Node(self.copy_into(*child, target)),
                    FieldValue::List(items) => FieldValue::List(
                        items.iter().map(|c| self.copy_into(*c, target)).collect(),
                    ),
                };
                (*name, copied)
            })
            .collect();
        target.push_owned(node.tag, fields)
    }

    /// Deep-clones the subtree at `id` inside this arena.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let mut scratch = Self::new(self.dialect);
        let root = self.copy_into(id, &mut scratch);
        let offset = self.nodes.len();
        for mut node in scratch.nodes {
            node.parent = node.parent.map(|p| NodeId(p.0 + offset));
            for (_, value) in &mut node.fields {
                match value {
                    FieldValue::Node(child) => child.0 += offset,
                    FieldValue::List(items) => items.iter_mut().for_each(|c| c.0 += offset),
                    FieldValue::Terminal(_) => {}
                }
            }
            self.nodes.push(node);
        }
        NodeId(root.0 + offset)
    }

    /// Pushes a node whose children are freshly created orphans.
    fn push_owned(&mut self, tag: &'static str, fields: Vec<(&'static str, FieldValue)>) -> NodeId {
        let id = NodeId(self.nodes.len());
        for (_, value) in &fields {
            for child in value.nodes() {
                self.nodes[child.0].parent = Some(id);
            }
        }
        self.nodes.push(Node {
            tag,
            fields,
            parent: None,
        });
        id
    }

    pub(crate) fn mark(&self) -> usize {
        self.nodes.len()
    }

    /// Drops every node created after `mark`.
    pub(crate) fn truncate(&mut self, mark: usize) {
        if mark >= self.nodes.len() {
            return;
        }
        self.nodes.truncate(mark);
        for node in &mut self.nodes {
            if node.parent.is_some_and(|p| p.0 >= mark) {
                node.parent = None;
            }
        }
    }
}

impl Index<NodeId> for Ast {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}
