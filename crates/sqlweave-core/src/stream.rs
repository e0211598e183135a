//! Backtrackable token cursor.
//!
//! A [`TokenStream`] pulls tokens from a [`TokenProducer`] (the tokenizer, or
//! a pre-built token vector) and lets the parser look ahead, consume, and
//! rewind to recorded savepoints.
//!
//! Positions are absolute: the number of tokens consumed since the stream
//! started, committed ones included.
//!
//! Block tokens carry their own `TokenStream`. While a block token is only
//! visible through `peek`, its stream is *locked*: it can be inspected but
//! not advanced. Consuming the block token with `next` unlocks it; restoring
//! the parent to a position before the block rewinds the block's stream to
//! its start and locks it again.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::error::{Result, StreamError};
use crate::grammar::ParseError;
use crate::lexer::{Token, TokenKind};

/// Source of tokens for a [`TokenStream`].
pub trait TokenProducer {
    /// Returns the next token, or `None` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns lexical errors raised while producing.
    fn produce(&mut self) -> Result<Option<Token>>;
}

/// Producer over a pre-built token vector.
#[derive(Debug)]
pub struct VecProducer {
    tokens: std::vec::IntoIter<Token>,
}

impl VecProducer {
    /// Creates a producer yielding `tokens` in order.
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
        }
    }
}

impl TokenProducer for VecProducer {
    fn produce(&mut self) -> Result<Option<Token>> {
        Ok(self.tokens.next())
    }
}

struct StreamState {
    producer: Box<dyn TokenProducer>,
    started: bool,
    done: bool,
    locked: bool,
    root_savepoint: Option<usize>,
    history: Vec<Token>,
    peek_queue: VecDeque<Token>,
    current: Option<Token>,
    discarded: usize,
}

impl StreamState {
    fn position(&self) -> usize {
        self.discarded + self.history.len() + usize::from(self.current.is_some())
    }

    /// Pulls from the producer until the peek queue holds `n + 1` tokens or
    /// the producer is exhausted.
    fn fill_to(&mut self, n: usize) -> Result<()> {
        while self.peek_queue.len() <= n && !self.done {
            match self.producer.produce()? {
                Some(token) => {
                    if let Some(block) = token.stream() {
                        block.set_locked(true);
                    }
                    self.peek_queue.push_back(token);
                }
                None => self.done = true,
            }
        }
        Ok(())
    }

    fn check_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(StreamError::Locked.into());
        }
        Ok(())
    }

    /// Returns the oldest restorable position. The token current at that
    /// position must still be in the history.
    fn min_position(&self) -> usize {
        if self.discarded == 0 {
            0
        } else {
            self.discarded + 1
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let (min, max) = (self.min_position(), self.position());
        if index < min || index > max {
            return Err(StreamError::InvalidSavepoint { index, min, max }.into());
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<Option<Token>> {
        self.fill_to(0)?;
        let Some(token) = self.peek_queue.pop_front() else {
            if let Some(previous) = self.current.take() {
                self.history.push(previous);
                self.started = true;
            }
            return Ok(None);
        };
        if let Some(block) = token.stream() {
            block.set_locked(false);
        }
        if let Some(previous) = self.current.replace(token.clone()) {
            self.history.push(previous);
        }
        self.started = true;
        Ok(Some(token))
    }

    fn rewind_to(&mut self, index: usize) {
        while self.position() > index {
            let token = match self.current.take() {
                Some(token) => token,
                None => match self.history.pop() {
                    Some(token) => token,
                    None => break,
                },
            };
            if let Some(block) = token.stream() {
                block.rewind();
                block.set_locked(true);
            }
            self.peek_queue.push_front(token);
            if self.position() > index {
                self.current = self.history.pop();
            }
        }
        if self.current.is_none() && self.position() > self.discarded {
            self.current = self.history.pop();
        }
    }
}

/// A peekable, backtrackable cursor over a token producer.
///
/// `TokenStream` is a cheap handle: clones share the same cursor. Block
/// tokens hold handles to their sub-streams.
#[derive(Clone)]
pub struct TokenStream {
    state: Rc<RefCell<StreamState>>,
}

impl TokenStream {
    /// Creates a stream over `producer`.
    pub fn new(producer: impl TokenProducer + 'static) -> Self {
        Self {
            state: Rc::new(RefCell::new(StreamState {
                producer: Box::new(producer),
                started: false,
                done: false,
                locked: false,
                root_savepoint: None,
                history: Vec::new(),
                peek_queue: VecDeque::new(),
                current: None,
                discarded: 0,
            })),
        }
    }

    /// Creates a stream over pre-built tokens.
    #[must_use]
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self::new(VecProducer::new(tokens))
    }

    /// Returns the most recently consumed token.
    #[must_use]
    pub fn current(&self) -> Option<Token> {
        self.state.borrow().current.clone()
    }

    /// Consumes and returns the next token.
    ///
    /// # Errors
    ///
    /// Fails when the stream is locked or the producer fails.
    pub fn next(&self) -> Result<Option<Token>> {
        let mut state = self.state.borrow_mut();
        state.check_unlocked()?;
        state.advance()
    }

    /// Returns the token `n` positions ahead (`0` is the next token)
    /// without consuming anything.
    ///
    /// # Errors
    ///
    /// Fails when the producer fails.
    pub fn peek(&self, n: usize) -> Result<Option<Token>> {
        let mut state = self.state.borrow_mut();
        state.fill_to(n)?;
        Ok(state.peek_queue.get(n).cloned())
    }

    /// Tests the token `offset` positions ahead against `kind` and, when
    /// given, `value`.
    ///
    /// # Errors
    ///
    /// Fails when the producer fails.
    pub fn matches(&self, offset: usize, kind: TokenKind, value: Option<&str>) -> Result<bool> {
        Ok(self
            .peek(offset)?
            .is_some_and(|token| token.is(kind, value)))
    }

    /// Consumes the next token if it matches.
    ///
    /// # Errors
    ///
    /// Fails when the stream is locked or the producer fails.
    pub fn eat(&self, kind: TokenKind, value: Option<&str>) -> Result<Option<Token>> {
        if self.matches(0, kind, value)? {
            self.next()
        } else {
            Ok(None)
        }
    }

    /// Consumes the next token, which must match.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the next token does not match.
    pub fn expect(&self, kind: TokenKind, value: Option<&str>) -> Result<Token> {
        if let Some(token) = self.eat(kind, value)? {
            return Ok(token);
        }
        let expected = match value {
            Some(v) => format!("{kind} '{v}'"),
            None => kind.to_string(),
        };
        let err = match self.peek(0)? {
            Some(found) => ParseError::unexpected(expected, &found),
            None => ParseError::unexpected_eof(expected),
        };
        Err(err.into())
    }

    /// Records the current position as a restore target.
    ///
    /// The first savepoint taken while none is active becomes the root
    /// savepoint.
    ///
    /// # Errors
    ///
    /// Fails when the stream is locked.
    pub fn savepoint(&self) -> Result<usize> {
        let mut state = self.state.borrow_mut();
        state.check_unlocked()?;
        let position = state.position();
        if state.root_savepoint.is_none() {
            state.root_savepoint = Some(position);
        }
        Ok(position)
    }

    /// Moves consumed tokens back into the peek queue until the stream is
    /// at `index` again.
    ///
    /// # Errors
    ///
    /// Fails when the stream is locked or `index` is outside the recorded
    /// history.
    pub fn restore(&self, index: usize) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check_unlocked()?;
        state.check_index(index)?;
        if state.position() != index {
            trace!(from = state.position(), to = index, "restoring token stream");
        }
        state.rewind_to(index);
        Ok(())
    }

    /// Commits the savepoint at `index`.
    ///
    /// Committing the root savepoint discards the history before it; the
    /// positions before `index` can no longer be restored. The token current
    /// at `index` is kept so that `index` itself stays restorable.
    ///
    /// # Errors
    ///
    /// Fails when the stream is locked or `index` is outside the recorded
    /// history.
    pub fn commit(&self, index: usize) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check_unlocked()?;
        state.check_index(index)?;
        if state.root_savepoint == Some(index) {
            let drop = (index - state.discarded)
                .saturating_sub(1)
                .min(state.history.len());
            state.history.drain(..drop);
            state.discarded += drop;
            state.root_savepoint = None;
        }
        Ok(())
    }

    /// Returns the number of tokens consumed so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.state.borrow().position()
    }

    /// Returns true while the stream belongs to a block token that has only
    /// been peeked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state.borrow().locked
    }

    /// Returns true once `next` has been called.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state.borrow().started
    }

    /// Returns true when no tokens remain.
    ///
    /// # Errors
    ///
    /// Fails when the producer fails.
    pub fn is_exhausted(&self) -> Result<bool> {
        Ok(self.peek(0)?.is_none())
    }

    /// Consumes every remaining token.
    ///
    /// # Errors
    ///
    /// Fails when the stream is locked or the producer fails.
    pub fn collect_tokens(&self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Pulls every remaining token from the producer into the peek queue.
    pub(crate) fn fill(&self) -> Result<()> {
        self.state.borrow_mut().fill_to(usize::MAX)
    }

    pub(crate) fn set_locked(&self, locked: bool) {
        self.state.borrow_mut().locked = locked;
    }

    /// Restores to the oldest retained position, regardless of locking.
    fn rewind(&self) {
        let mut state = self.state.borrow_mut();
        let start = state.discarded;
        state.rewind_to(start);
    }
}

impl fmt::Debug for TokenStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("TokenStream")
                .field("position", &state.position())
                .field("buffered", &state.peek_queue.len())
                .field("locked", &state.locked)
                .field("done", &state.done)
                .finish_non_exhaustive(),
            Err(_) => f.write_str("TokenStream { <in use> }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{BlockKind, Position};

    fn ident(value: &str) -> Token {
        Token::new(TokenKind::Identifier, value, Position::default())
    }

    fn stream(values: &[&str]) -> TokenStream {
        TokenStream::from_tokens(values.iter().map(|v| ident(v)).collect())
    }

    fn value(token: Option<Token>) -> Option<String> {
        token.map(|t| t.value)
    }

    #[test]
    fn test_next_and_current() {
        let s = stream(&["a", "b"]);
        assert_eq!(s.current(), None);
        assert_eq!(value(s.next().unwrap()), Some(String::from("a")));
        assert_eq!(value(s.current()), Some(String::from("a")));
        assert_eq!(value(s.next().unwrap()), Some(String::from("b")));
        assert_eq!(s.next().unwrap(), None);
        assert_eq!(s.position(), 2);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let s = stream(&["a", "b", "c"]);
        assert_eq!(value(s.peek(2).unwrap()), Some(String::from("c")));
        assert_eq!(value(s.peek(0).unwrap()), Some(String::from("a")));
        assert_eq!(s.position(), 0);
        assert_eq!(s.peek(5).unwrap(), None);
    }

    #[test]
    fn test_matches_eat_expect() {
        let s = stream(&["a", "b"]);
        assert!(s.matches(1, TokenKind::Identifier, Some("b")).unwrap());
        assert!(!s.matches(0, TokenKind::Keyword, None).unwrap());
        assert_eq!(s.eat(TokenKind::Keyword, None).unwrap(), None);
        assert!(s.eat(TokenKind::Identifier, Some("a")).unwrap().is_some());
        let err = s.expect(TokenKind::Identifier, Some("x")).unwrap_err();
        assert!(err.to_string().contains("identifier 'x'"));
        assert!(s.expect(TokenKind::Identifier, None).is_ok());
    }

    #[test]
    fn test_savepoint_restore_replays_tokens() {
        let s = stream(&["a", "b", "c", "d"]);
        s.next().unwrap();
        let sp = s.savepoint().unwrap();
        let at_savepoint = s.current();
        let after: Vec<_> = (0..3).map(|_| s.next().unwrap()).collect();
        s.restore(sp).unwrap();
        assert_eq!(s.current(), at_savepoint);
        assert_eq!(s.position(), sp);
        let replay: Vec<_> = (0..3).map(|_| s.next().unwrap()).collect();
        assert_eq!(after, replay);
    }

    #[test]
    fn test_restore_to_start() {
        let s = stream(&["a", "b"]);
        let sp = s.savepoint().unwrap();
        s.next().unwrap();
        s.next().unwrap();
        s.restore(sp).unwrap();
        assert_eq!(s.current(), None);
        assert_eq!(value(s.next().unwrap()), Some(String::from("a")));
    }

    #[test]
    fn test_restore_after_exhaustion() {
        let s = stream(&["a", "b"]);
        let sp = s.savepoint().unwrap();
        s.collect_tokens().unwrap();
        assert_eq!(s.next().unwrap(), None);
        s.restore(sp).unwrap();
        assert_eq!(s.collect_tokens().unwrap().len(), 2);
    }

    #[test]
    fn test_restore_rejects_future_index() {
        let s = stream(&["a"]);
        let err = s.restore(3).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Stream(StreamError::InvalidSavepoint { index: 3, .. })
        ));
    }

    #[test]
    fn test_commit_root_discards_history() {
        let s = stream(&["a", "b", "c"]);
        let root = s.savepoint().unwrap();
        s.next().unwrap();
        let inner = s.savepoint().unwrap();
        s.next().unwrap();
        // Committing a nested savepoint keeps history.
        s.commit(inner).unwrap();
        s.restore(root).unwrap();
        s.next().unwrap();
        s.next().unwrap();
        s.commit(root).unwrap();
        // With the root gone, the next savepoint becomes the new root.
        let sp = s.savepoint().unwrap();
        assert_eq!(sp, 2);
        s.next().unwrap();
        s.commit(sp).unwrap();
        assert!(s.restore(0).is_err());
        assert!(s.restore(1).is_err());
        assert!(s.restore(2).is_ok());
    }

    #[test]
    fn test_restore_committed_root_keeps_current() {
        let s = stream(&["a", "b", "c", "d"]);
        s.next().unwrap();
        s.next().unwrap();
        let sp = s.savepoint().unwrap();
        s.next().unwrap();
        s.commit(sp).unwrap();
        s.restore(sp).unwrap();
        assert_eq!(s.position(), sp);
        assert_eq!(value(s.current()), Some(String::from("b")));
        assert_eq!(value(s.next().unwrap()), Some(String::from("c")));
        assert_eq!(value(s.next().unwrap()), Some(String::from("d")));
    }

    #[test]
    fn test_locked_stream_rejects_mutation() {
        let inner = stream(&["x"]);
        inner.set_locked(true);
        assert!(matches!(
            inner.next().unwrap_err(),
            crate::Error::Stream(StreamError::Locked)
        ));
        assert!(inner.savepoint().is_err());
        assert!(inner.restore(0).is_err());
        assert!(inner.commit(0).is_err());
        // Inspection is allowed.
        assert!(inner.matches(0, TokenKind::Identifier, Some("x")).unwrap());
    }

    #[test]
    fn test_block_locking_lifecycle() {
        let inner = stream(&["x", "y"]);
        let block = Token::block(BlockKind::Paren, inner.clone(), Position::default());
        let outer = TokenStream::from_tokens(vec![block, ident("z")]);

        let sp = outer.savepoint().unwrap();
        let peeked = outer.peek(0).unwrap().unwrap();
        assert!(peeked.stream().unwrap().is_locked());

        let consumed = outer.next().unwrap().unwrap();
        let sub = consumed.stream().unwrap();
        assert!(!sub.is_locked());
        sub.savepoint().unwrap();
        sub.next().unwrap();
        sub.next().unwrap();
        assert_eq!(sub.position(), 2);

        outer.restore(sp).unwrap();
        assert!(inner.is_locked());
        assert_eq!(inner.position(), 0);

        let again = outer.next().unwrap().unwrap();
        let sub = again.stream().unwrap();
        assert!(!sub.is_locked());
        assert_eq!(value(sub.next().unwrap()), Some(String::from("x")));
    }
}
