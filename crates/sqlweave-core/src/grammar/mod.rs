//! Grammar engine.
//!
//! Node types declare their syntax as [`rule`] trees. A [`Registry`] maps
//! type tags to those declarations and caches their compiled
//! [`schema`]s per dialect. Three consumers share the compiled schemas:
//!
//! - the [`Parser`], which matches token streams with backtracking and
//!   precedence climbing,
//! - the [`JsonReader`] and [`to_json`], which map syntax trees to and from
//!   structured trees,
//! - the [`Serializer`], which renders SQL text.
//!
//! [`sql`] holds the built-in grammar served by [`default_registry`].

mod error;
pub mod json;
pub mod parser;
pub mod registry;
pub mod rule;
pub mod schema;
pub mod serializer;
pub mod sql;

pub use error::{GrammarError, ParseError, SerializeError};
pub use json::{to_json, JsonReader};
pub use parser::{AssertPredicate, ParseOptions, Parser};
pub use registry::{default_registry, ClimbingNode, DeclaredNode, NodeSyntax, Registry};
pub use rule::{Arity, Climb, Condition, Rule, Singletons};
pub use schema::{AltSchema, CompiledRule, CompiledType, FieldKind, FieldSchema};
pub use serializer::{FormatOptions, KeywordCase, Serializer};
