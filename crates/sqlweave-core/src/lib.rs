//! # sqlweave-core
//!
//! A dual-dialect (PostgreSQL/MySQL) SQL front end.
//!
//! This crate provides:
//! - An incremental tokenizer that accepts input in arbitrary chunks,
//!   synchronously or from an async stream
//! - A backtrackable token stream with savepoints
//! - A grammar engine: declarative per-node rules compiled into schemas
//!   that drive parsing (with precedence climbing), structured tree (JSON)
//!   reading and writing, and SQL rendering
//!
//! ## Parsing and rendering
//!
//! ```rust
//! use sqlweave_core::{parse, Dialect};
//!
//! let tree = parse("select id, name from users where id = $1;", Dialect::Postgres).unwrap();
//! assert_eq!(tree.to_sql().unwrap(), "SELECT id, name FROM users WHERE id = $1;");
//! ```
//!
//! ## Converting between dialects
//!
//! ```rust
//! use sqlweave_core::{parse, to_dialect, Dialect};
//!
//! let tree = parse(r#"SELECT "Order" FROM t WHERE a = $1"#, Dialect::Postgres).unwrap();
//! let mysql = to_dialect(&tree, Dialect::Mysql).unwrap();
//! assert_eq!(mysql.to_sql().unwrap(), "SELECT `Order` FROM t WHERE a = ?");
//! ```
//!
//! ## Structured trees
//!
//! ```rust
//! use sqlweave_core::{from_json, parse_as, Dialect};
//!
//! let tree = parse_as("1 + 2", Dialect::Mysql, &["BinaryExpr"]).unwrap();
//! let json = tree.to_json();
//! assert_eq!(json["nodeName"], "BinaryExpr");
//! assert_eq!(json["operator"], "+");
//!
//! let back = from_json(&json, &["BinaryExpr"], Dialect::Mysql).unwrap();
//! assert!(back.structural_eq(&tree));
//! ```

pub mod ast;
pub mod dialect;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod stream;

use futures::Stream;
use serde_json::Value;

pub use ast::{Ast, FieldValue, Node, NodeId, Terminal};
pub use dialect::Dialect;
pub use error::{Error, LexError, Result, StreamError};
pub use grammar::{
    default_registry, FormatOptions, GrammarError, KeywordCase, ParseError, ParseOptions, Registry,
    SerializeError,
};
pub use lexer::{AsyncTokenizer, Token, TokenKind, Tokenizer, TokenizerOptions};
pub use stream::TokenStream;

use grammar::parser::skip_trivia;
use grammar::{JsonReader, Parser, Serializer};

/// Node type parsed by [`parse`]: a `;`-separated statement list.
pub const SCRIPT: &str = "Script";

/// A syntax tree and its root node.
#[derive(Debug, Clone)]
pub struct Tree {
    ast: Ast,
    root: NodeId,
}

impl Tree {
    /// Wraps an arena and the node to treat as root.
    #[must_use]
    pub const fn new(ast: Ast, root: NodeId) -> Self {
        Self { ast, root }
    }

    /// Returns the arena.
    #[must_use]
    pub const fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Returns the root node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the root node's type tag.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        self.ast[self.root].tag()
    }

    /// Returns the dialect the tree was built for.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.ast.dialect()
    }

    /// Splits the tree into its arena and root.
    #[must_use]
    pub fn into_parts(self) -> (Ast, NodeId) {
        (self.ast, self.root)
    }

    /// Renders the tree as compact SQL in its own dialect.
    ///
    /// # Errors
    ///
    /// See [`Serializer::serialize`].
    pub fn to_sql(&self) -> Result<String> {
        self.to_sql_with(self.dialect(), &FormatOptions::default())
    }

    /// Renders the tree in `dialect` with `options`.
    ///
    /// # Errors
    ///
    /// See [`Serializer::serialize`].
    pub fn to_sql_with(&self, dialect: Dialect, options: &FormatOptions) -> Result<String> {
        Serializer::new(default_registry(), dialect)
            .with_options(options.clone())
            .serialize(&self.ast, self.root)
    }

    /// Writes the tree as a structured tree.
    #[must_use]
    pub fn to_json(&self) -> Value {
        grammar::to_json(&self.ast, self.root)
    }

    /// Compares two trees, ignoring source positions.
    #[must_use]
    pub fn structural_eq(&self, other: &Self) -> bool {
        self.ast.structural_eq(self.root, &other.ast, other.root)
    }
}

/// Parses a `;`-separated list of statements.
///
/// # Errors
///
/// Returns lexical errors, asserted [`ParseError`]s, and
/// [`Error::NoMatch`] when the input is not a statement list.
pub fn parse(sql: &str, dialect: Dialect) -> Result<Tree> {
    parse_as(sql, dialect, &[SCRIPT])
}

/// Parses the whole of `sql` as one node of the first matching type in
/// `types`.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_as(sql: &str, dialect: Dialect, types: &[&'static str]) -> Result<Tree> {
    let stream = Tokenizer::new(sql, dialect).into_stream();
    parse_stream(&stream, default_registry(), dialect, types, ParseOptions::default())
}

/// Parses input delivered in chunks. Chunks may split tokens anywhere.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_chunks<I, S>(chunks: I, dialect: Dialect, types: &[&'static str]) -> Result<Tree>
where
    I: IntoIterator<Item = S>,
    I::IntoIter: 'static,
    S: Into<String> + 'static,
{
    let stream = Tokenizer::from_chunks(chunks, dialect, TokenizerOptions::for_dialect(dialect))
        .into_stream();
    parse_stream(&stream, default_registry(), dialect, types, ParseOptions::default())
}

/// Parses input arriving from an asynchronous chunk source.
///
/// Chunks are lexed as they arrive and never joined into one string, but
/// parsing starts only once the source is exhausted: the future resolves
/// after the last chunk. Use [`AsyncTokenizer::into_tokens`] to consume
/// tokens while input is still arriving.
///
/// # Errors
///
/// See [`parse`].
pub async fn parse_async<S>(chunks: S, dialect: Dialect, types: &[&'static str]) -> Result<Tree>
where
    S: Stream<Item = String> + Unpin,
{
    let stream = AsyncTokenizer::new(chunks, dialect, TokenizerOptions::for_dialect(dialect))
        .into_token_stream()
        .await?;
    parse_stream(&stream, default_registry(), dialect, types, ParseOptions::default())
}

/// Parses a token stream with an explicit registry and options. The whole
/// stream must be consumed; on success its history is committed.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_stream(
    stream: &TokenStream,
    registry: &Registry,
    dialect: Dialect,
    types: &[&'static str],
    options: ParseOptions,
) -> Result<Tree> {
    let start = stream.savepoint()?;
    let mut parser = Parser::new(registry, dialect).with_options(options);
    let root = parser.parse_any(types, stream)?;
    skip_trivia(stream)?;
    match root {
        Some(root) if stream.is_exhausted()? => {
            stream.commit(start)?;
            Ok(Tree::new(parser.into_ast(), root))
        }
        _ => {
            let found = match stream.peek(0)? {
                Some(token) => format!("before {token} at {}", token.position()),
                None => String::from("at end of input"),
            };
            Err(Error::NoMatch {
                expected: types.join(" or "),
                found,
            })
        }
    }
}

/// Reads a structured tree as a node of one of `types`.
///
/// # Errors
///
/// Returns [`Error::NoMatch`] when the tree matches none of the types'
/// schemas in `dialect`.
pub fn from_json(tree: &Value, types: &[&'static str], dialect: Dialect) -> Result<Tree> {
    let mut reader = JsonReader::new(default_registry(), dialect);
    match reader.read_any(types, tree)? {
        Some(root) => Ok(Tree::new(reader.into_ast(), root)),
        None => Err(Error::NoMatch {
            expected: types.join(" or "),
            found: format!(
                "in structured tree of {}",
                tree.get(grammar::json::NODE_NAME)
                    .and_then(Value::as_str)
                    .unwrap_or("unknown type")
            ),
        }),
    }
}

/// Parses JSON text and reads it with [`from_json`].
///
/// # Errors
///
/// Returns [`Error::Json`] for malformed JSON, otherwise see [`from_json`].
pub fn from_json_str(json: &str, types: &[&'static str], dialect: Dialect) -> Result<Tree> {
    let value: Value = serde_json::from_str(json)?;
    from_json(&value, types, dialect)
}

/// Rebuilds `tree` under the grammar of `dialect`.
///
/// # Errors
///
/// Returns [`Error::NoMatch`] when some node has no form in `dialect`.
pub fn to_dialect(tree: &Tree, dialect: Dialect) -> Result<Tree> {
    from_json(&tree.to_json(), &[tree.tag()], dialect)
}

/// Tokenizes `sql` into flat tokens: brackets are punctuation and trivia is
/// dropped.
///
/// # Errors
///
/// Returns the first lexical error.
pub fn tokenize(sql: &str, dialect: Dialect) -> Result<Vec<Token>> {
    Tokenizer::with_options(
        sql,
        dialect,
        TokenizerOptions::for_dialect(dialect).structured(false),
    )
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reports_leftover_input() {
        let err = parse_as("a b c", Dialect::Postgres, &["ColumnRef"]).unwrap_err();
        let Error::NoMatch { expected, found } = err else {
            panic!("expected NoMatch, got {err:?}");
        };
        assert_eq!(expected, "ColumnRef");
        assert!(found.starts_with("before"), "{found}");
    }

    #[test]
    fn test_parse_empty_input() {
        let err = parse("", Dialect::Postgres).unwrap_err();
        assert!(matches!(err, Error::NoMatch { ref found, .. } if found == "at end of input"));
    }

    #[test]
    fn test_tokenize_is_flat() {
        let tokens = tokenize("SELECT f(a)", Dialect::Postgres).unwrap();
        let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, ["SELECT", "f", "(", "a", ")"]);
    }

    #[test]
    fn test_tree_accessors() {
        let tree = parse("SELECT 1", Dialect::Mysql).unwrap();
        assert_eq!(tree.tag(), SCRIPT);
        assert_eq!(tree.dialect(), Dialect::Mysql);
        let (ast, root) = tree.into_parts();
        assert_eq!(ast.children(root, "statements").len(), 1);
    }

    #[test]
    fn test_from_json_str_rejects_bad_json() {
        let err = from_json_str("{", &[SCRIPT], Dialect::Postgres).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
