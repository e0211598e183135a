//! SQL lexer.
//!
//! [`Scanner`] is the I/O-free state machine; [`Tokenizer`] and
//! [`AsyncTokenizer`] drive it from synchronous or asynchronous chunk
//! sources.

mod scanner;
mod span;
pub mod tables;
mod token;
mod tokenizer;

pub use scanner::{Event, Scanner, TokenizerOptions};
pub use span::Position;
pub use token::{Associativity, BlockKind, OperatorInfo, ResultKind, Token, TokenKind};
pub use tokenizer::{AsyncTokenizer, Tokenizer};
