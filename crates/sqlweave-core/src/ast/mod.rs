//! Syntax tree storage.
//!
//! Nodes live in an [`Ast`] arena and refer to each other by [`NodeId`].
//! Every node carries a type tag and named fields in declaration order;
//! a field holds a [`Terminal`], one child, or a list of children.

mod arena;
mod node;
mod terminal;

pub use arena::Ast;
pub use node::{FieldValue, Node, NodeId};
pub use terminal::Terminal;
