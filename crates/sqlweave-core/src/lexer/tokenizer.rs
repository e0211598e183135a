//! Tokenizer drivers.
//!
//! The [`Scanner`] does the lexing; this module feeds it. [`Tokenizer`]
//! pulls chunks from a synchronous iterator, [`AsyncTokenizer`] awaits them
//! from a `futures::Stream`. In structured mode a bracketed region becomes a
//! single block token whose value is a [`TokenStream`] sharing the parent's
//! scanner, filled lazily as the parser descends into it.

use std::cell::RefCell;
use std::rc::Rc;

use futures::{Stream, StreamExt};
use tracing::trace;

use super::scanner::{Event, Scanner, TokenizerOptions};
use super::{BlockKind, Position, Token, TokenKind};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::stream::{TokenProducer, TokenStream};

type Chunks = Box<dyn Iterator<Item = String>>;

struct Driver {
    scanner: Scanner,
    chunks: Chunks,
}

impl Driver {
    /// Next scanner event, feeding chunks until one is decided.
    fn pull(&mut self) -> Result<Event> {
        loop {
            match self.scanner.next_event()? {
                Event::NeedMore => match self.chunks.next() {
                    Some(chunk) => self.scanner.feed(&chunk),
                    None => self.scanner.close(),
                },
                event => return Ok(event),
            }
        }
    }
}

/// Produces the tokens of one nesting level.
struct LexProducer {
    driver: Rc<RefCell<Driver>>,
    depth: usize,
    open_child: Option<TokenStream>,
    finished: bool,
}

impl LexProducer {
    fn new(driver: Rc<RefCell<Driver>>, depth: usize) -> Self {
        Self {
            driver,
            depth,
            open_child: None,
            finished: false,
        }
    }
}

impl TokenProducer for LexProducer {
    fn produce(&mut self) -> Result<Option<Token>> {
        if self.finished {
            return Ok(None);
        }
        // The shared scanner is positioned after the previous block token;
        // its contents have to be claimed by the block before we move on.
        if let Some(child) = self.open_child.take() {
            child.fill()?;
        }
        let event = self.driver.borrow_mut().pull();
        match event {
            Ok(Event::Token(token)) => Ok(Some(token)),
            Ok(Event::Open {
                kind,
                position,
                space_before,
            }) => {
                trace!(block = %kind.open(), %position, depth = self.depth + 1, "opening block");
                let child = TokenStream::new(Self::new(Rc::clone(&self.driver), self.depth + 1));
                self.open_child = Some(child.clone());
                let mut token = Token::block(kind, child, position);
                token.space_before = space_before;
                Ok(Some(token))
            }
            Ok(Event::Close { .. } | Event::End | Event::NeedMore) => {
                self.finished = true;
                Ok(None)
            }
            Err(err) => {
                self.finished = true;
                Err(err)
            }
        }
    }
}

/// Synchronous tokenizer over a string or an iterator of chunks.
///
/// Iterating yields the top-level tokens; block tokens expose their
/// contents through [`Token::stream`]. Iteration stops after the first
/// error.
///
/// # Example
///
/// ```rust
/// use sqlweave_core::dialect::Dialect;
/// use sqlweave_core::lexer::{TokenKind, Tokenizer};
///
/// let kinds: Vec<TokenKind> = Tokenizer::new("SELECT id FROM users", Dialect::Postgres)
///     .map(|t| t.unwrap().kind)
///     .collect();
/// assert_eq!(kinds[0], TokenKind::Keyword);
/// assert_eq!(kinds[1], TokenKind::Identifier);
/// ```
pub struct Tokenizer {
    producer: LexProducer,
}

impl Tokenizer {
    /// Tokenizes `sql` with the dialect's default options.
    #[must_use]
    pub fn new(sql: &str, dialect: Dialect) -> Self {
        Self::with_options(sql, dialect, TokenizerOptions::for_dialect(dialect))
    }

    /// Tokenizes `sql` with explicit options.
    #[must_use]
    pub fn with_options(sql: &str, dialect: Dialect, options: TokenizerOptions) -> Self {
        Self::from_chunks(std::iter::once(sql.to_string()), dialect, options)
    }

    /// Tokenizes input arriving as a sequence of chunks.
    ///
    /// Chunk boundaries may fall anywhere, including inside a token.
    pub fn from_chunks<I, S>(chunks: I, dialect: Dialect, options: TokenizerOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: 'static,
        S: Into<String> + 'static,
    {
        let driver = Driver {
            scanner: Scanner::new(dialect, options),
            chunks: Box::new(chunks.into_iter().map(Into::into)),
        };
        Self {
            producer: LexProducer::new(Rc::new(RefCell::new(driver)), 0),
        }
    }

    /// Returns a backtrackable stream over the tokens.
    #[must_use]
    pub fn into_stream(self) -> TokenStream {
        TokenStream::new(self.producer)
    }
}

impl Iterator for Tokenizer {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.producer.produce().transpose()
    }
}

/// Tokenizer over an asynchronous stream of chunks.
///
/// The scanner is driven in place; whenever it needs more input the
/// tokenizer awaits the next chunk.
pub struct AsyncTokenizer<S> {
    scanner: Scanner,
    chunks: S,
}

impl<S> AsyncTokenizer<S>
where
    S: Stream<Item = String> + Unpin,
{
    /// Creates a tokenizer reading from `chunks`.
    pub fn new(chunks: S, dialect: Dialect, options: TokenizerOptions) -> Self {
        Self {
            scanner: Scanner::new(dialect, options),
            chunks,
        }
    }

    async fn pull(&mut self) -> Result<Event> {
        loop {
            match self.scanner.next_event()? {
                Event::NeedMore => match self.chunks.next().await {
                    Some(chunk) => self.scanner.feed(&chunk),
                    None => self.scanner.close(),
                },
                event => return Ok(event),
            }
        }
    }

    /// Returns the next token with brackets as punctuation.
    ///
    /// # Errors
    ///
    /// Returns lexical errors.
    pub async fn next_token(&mut self) -> Result<Option<Token>> {
        let token = match self.pull().await? {
            Event::Token(token) => token,
            Event::Open {
                kind,
                position,
                space_before,
            } => {
                let mut token = Token::new(TokenKind::Punctuation, kind.open().to_string(), position);
                token.space_before = space_before;
                token
            }
            Event::Close { kind, position } => {
                Token::new(TokenKind::Punctuation, kind.close().to_string(), position)
            }
            Event::End | Event::NeedMore => return Ok(None),
        };
        Ok(Some(token))
    }

    /// Reads the whole input and returns a stream with nested blocks.
    ///
    /// The chunk source is drained before this returns; the tokens, not
    /// the text, are buffered. [`into_tokens`](Self::into_tokens) yields
    /// each token as soon as its chunk has arrived.
    ///
    /// # Errors
    ///
    /// Returns lexical errors.
    pub async fn into_token_stream(mut self) -> Result<TokenStream> {
        let mut levels: Vec<Level> = vec![Level::default()];
        loop {
            match self.pull().await? {
                Event::Token(token) => push_token(&mut levels, token),
                Event::Open {
                    kind,
                    position,
                    space_before,
                } => levels.push(Level {
                    tokens: Vec::new(),
                    opened: Some((kind, position, space_before)),
                }),
                Event::Close { .. } => {
                    if let Some(Level {
                        tokens,
                        opened: Some((kind, position, space_before)),
                    }) = levels.pop()
                    {
                        let mut block =
                            Token::block(kind, TokenStream::from_tokens(tokens), position);
                        block.space_before = space_before;
                        push_token(&mut levels, block);
                    }
                }
                Event::End | Event::NeedMore => break,
            }
        }
        let tokens = levels.pop().map(|level| level.tokens).unwrap_or_default();
        Ok(TokenStream::from_tokens(tokens))
    }

    /// Converts the tokenizer into a stream of flat tokens.
    pub fn into_tokens(self) -> impl Stream<Item = Result<Token>> {
        futures::stream::unfold(Some(self), |state| async move {
            let mut tokenizer = state?;
            match tokenizer.next_token().await {
                Ok(Some(token)) => Some((Ok(token), Some(tokenizer))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }
}

#[derive(Default)]
struct Level {
    tokens: Vec<Token>,
    opened: Option<(BlockKind, Position, bool)>,
}

fn push_token(levels: &mut [Level], token: Token) {
    if let Some(level) = levels.last_mut() {
        level.tokens.push(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::stream;

    fn values(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.value.as_str()).collect()
    }

    #[test]
    fn test_iterator_yields_top_level_tokens() {
        let tokens: Vec<Token> = Tokenizer::new("SELECT f(a) FROM t", Dialect::Postgres)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(values(&tokens), vec!["SELECT", "f", "(", "FROM", "t"]);
        assert_eq!(tokens[2].kind, TokenKind::ParenBlock);
        assert!(!tokens[2].space_before);
    }

    #[test]
    fn test_block_contents_are_claimed_before_moving_on() {
        let tokens: Vec<Token> = Tokenizer::new("(a, b) c", Dialect::Postgres)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(tokens.len(), 2);
        let inner = tokens[0].stream().unwrap().collect_tokens().unwrap();
        assert_eq!(values(&inner), vec!["a", ",", "b"]);
    }

    #[test]
    fn test_nested_blocks() {
        let stream = Tokenizer::new("((A))", Dialect::Postgres).into_stream();
        let outer = stream.collect_tokens().unwrap();
        assert_eq!(outer.len(), 1);
        let middle = outer[0].stream().unwrap().collect_tokens().unwrap();
        assert_eq!(middle.len(), 1);
        assert_eq!(middle[0].kind, TokenKind::ParenBlock);
        let inner = middle[0].stream().unwrap().collect_tokens().unwrap();
        assert_eq!(inner.len(), 1);
        assert!(inner[0].is(TokenKind::Identifier, Some("A")));
    }

    #[test]
    fn test_unstructured_mode_emits_punctuation() {
        let options = TokenizerOptions::for_dialect(Dialect::Postgres).structured(false);
        let tokens: Vec<Token> = Tokenizer::with_options("(1)", Dialect::Postgres, options)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(values(&tokens), vec!["(", "1", ")"]);
        assert!(tokens.iter().all(|t| !t.kind.is_block()));
    }

    #[test]
    fn test_chunks_match_whole_input() {
        let whole: Vec<Token> = Tokenizer::new("SELECT id FROM users;", Dialect::Mysql)
            .collect::<Result<_>>()
            .unwrap();
        let chunked: Vec<Token> = Tokenizer::from_chunks(
            vec!["SEL", "ECT i", "d FROM users;"],
            Dialect::Mysql,
            TokenizerOptions::for_dialect(Dialect::Mysql),
        )
        .collect::<Result<_>>()
        .unwrap();
        assert_eq!(whole, chunked);
    }

    #[test]
    fn test_iteration_stops_after_error() {
        let mut tokenizer = Tokenizer::new("a 'open", Dialect::Postgres);
        assert!(tokenizer.next().unwrap().is_ok());
        assert!(tokenizer.next().unwrap().is_err());
        assert!(tokenizer.next().is_none());
    }

    #[test]
    fn test_async_next_token() {
        let chunks = stream::iter(vec![String::from("SELECT ("), String::from("1)")]);
        let mut tokenizer = AsyncTokenizer::new(
            chunks,
            Dialect::Postgres,
            TokenizerOptions::for_dialect(Dialect::Postgres),
        );
        let mut seen = Vec::new();
        block_on(async {
            while let Some(token) = tokenizer.next_token().await.unwrap() {
                seen.push(token.value);
            }
        });
        assert_eq!(seen, vec!["SELECT", "(", "1", ")"]);
    }

    #[test]
    fn test_async_into_token_stream_nests_blocks() {
        let chunks = stream::iter(vec![String::from("f(["), String::from("x])")]);
        let tokenizer = AsyncTokenizer::new(
            chunks,
            Dialect::Postgres,
            TokenizerOptions::for_dialect(Dialect::Postgres),
        );
        let stream = block_on(tokenizer.into_token_stream()).unwrap();
        let top = stream.collect_tokens().unwrap();
        assert_eq!(top.len(), 2);
        let paren = top[1].stream().unwrap().collect_tokens().unwrap();
        assert_eq!(paren[0].kind, TokenKind::BracketBlock);
    }

    #[test]
    fn test_async_into_tokens_stream() {
        let chunks = stream::iter(vec![String::from("a +"), String::from(" b")]);
        let tokenizer = AsyncTokenizer::new(
            chunks,
            Dialect::Mysql,
            TokenizerOptions::for_dialect(Dialect::Mysql),
        );
        let tokens: Vec<Result<Token>> = block_on(tokenizer.into_tokens().collect());
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_async_chunks_are_pulled_on_demand() {
        let pulled = std::cell::Cell::new(0);
        let counter = &pulled;
        let chunks = move || {
            stream::iter(vec![String::from("a + "), String::from("b"), String::from(" c")])
                .inspect(move |_| counter.set(counter.get() + 1))
        };
        let options = TokenizerOptions::for_dialect(Dialect::Mysql);

        let mut tokenizer = AsyncTokenizer::new(chunks(), Dialect::Mysql, options);
        let first = block_on(tokenizer.next_token()).unwrap().unwrap();
        assert_eq!(first.value, "a");
        assert_eq!(pulled.get(), 1);

        pulled.set(0);
        let tokenizer = AsyncTokenizer::new(chunks(), Dialect::Mysql, options);
        block_on(tokenizer.into_token_stream()).unwrap();
        assert_eq!(pulled.get(), 3);
    }
}
