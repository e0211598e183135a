//! The lexer state machine.
//!
//! [`Scanner`] owns the character buffer, cursor, line/column and nesting
//! state of one tokenizer run. It performs no I/O: callers push chunks with
//! [`Scanner::feed`], mark the end of input with [`Scanner::close`], and pull
//! [`Event`]s. Whenever a decision needs a character that has not arrived
//! yet, the scanner answers [`Event::NeedMore`] without consuming anything
//! and rescans the pending lexeme from its start after the next chunk.

use std::collections::VecDeque;

use tracing::trace;

use super::tables;
use super::{BlockKind, Position, Token, TokenKind};
use crate::dialect::Dialect;
use crate::error::LexError;

const COMPACT_THRESHOLD: usize = 4096;

/// Tokenizer option flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizerOptions {
    /// Emit whitespace tokens.
    pub emit_whitespace: bool,
    /// Emit comment tokens.
    pub emit_comments: bool,
    /// MySQL only: `"` delimits identifiers instead of strings.
    pub ansi_quotes: bool,
    /// Backslash escapes in plain string literals.
    pub backslash_escapes: bool,
    /// Expose bracketed regions as block tokens with nested streams.
    pub structured: bool,
}

impl TokenizerOptions {
    /// Default options for `dialect`: structured, no trivia, dialect escapes.
    #[must_use]
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self {
            emit_whitespace: false,
            emit_comments: false,
            ansi_quotes: false,
            backslash_escapes: dialect.rules().backslash_escapes(),
            structured: true,
        }
    }

    /// Sets whitespace emission.
    #[must_use]
    pub const fn emit_whitespace(mut self, on: bool) -> Self {
        self.emit_whitespace = on;
        self
    }

    /// Sets comment emission.
    #[must_use]
    pub const fn emit_comments(mut self, on: bool) -> Self {
        self.emit_comments = on;
        self
    }

    /// Sets ANSI quoting.
    #[must_use]
    pub const fn ansi_quotes(mut self, on: bool) -> Self {
        self.ansi_quotes = on;
        self
    }

    /// Sets backslash escaping.
    #[must_use]
    pub const fn backslash_escapes(mut self, on: bool) -> Self {
        self.backslash_escapes = on;
        self
    }

    /// Sets structured block mode.
    #[must_use]
    pub const fn structured(mut self, on: bool) -> Self {
        self.structured = on;
        self
    }
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self::for_dialect(Dialect::Postgres)
    }
}

/// Output of the scanner.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A finalized token.
    Token(Token),
    /// A bracket opened in structured mode.
    Open {
        /// Which bracket.
        kind: BlockKind,
        /// Position of the opening symbol.
        position: Position,
        /// Whether whitespace preceded it.
        space_before: bool,
    },
    /// The innermost open bracket closed in structured mode.
    Close {
        /// Which bracket.
        kind: BlockKind,
        /// Position of the closing symbol.
        position: Position,
    },
    /// More input is required before the next event can be decided.
    NeedMore,
    /// Input is exhausted and fully validated.
    End,
}

enum Raw {
    Token(Token),
    Open(BlockKind, Position),
    Close(BlockKind, Position),
}

enum Stop {
    Suspend,
    Fail(LexError),
}

impl From<LexError> for Stop {
    fn from(err: LexError) -> Self {
        Self::Fail(err)
    }
}

type Scan<T> = std::result::Result<T, Stop>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escapes {
    None,
    Mysql,
    Postgres,
}

/// Lexer state for one tokenizer run.
#[derive(Debug)]
pub struct Scanner {
    dialect: Dialect,
    options: TokenizerOptions,
    buffer: Vec<char>,
    cursor: usize,
    position: Position,
    prev: Option<char>,
    nesting: Vec<(BlockKind, Position)>,
    closed: bool,
    finished: bool,
    space_pending: bool,
    words: Vec<Token>,
    ready: VecDeque<Event>,
}

impl Scanner {
    /// Creates a scanner with an empty buffer.
    #[must_use]
    pub fn new(dialect: Dialect, options: TokenizerOptions) -> Self {
        Self {
            dialect,
            options,
            buffer: Vec::new(),
            cursor: 0,
            position: Position::default(),
            prev: None,
            nesting: Vec::new(),
            closed: false,
            finished: false,
            space_pending: false,
            words: Vec::new(),
            ready: VecDeque::new(),
        }
    }

    /// Returns the dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> TokenizerOptions {
        self.options
    }

    /// Appends a chunk of input.
    pub fn feed(&mut self, chunk: &str) {
        self.buffer.extend(chunk.chars());
    }

    /// Marks the end of input.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns the current nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nesting.len()
    }

    /// Returns the position of the next unconsumed character.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Produces the next event.
    ///
    /// # Errors
    ///
    /// Returns a [`LexError`] for malformed input; the scanner must not be
    /// used afterwards.
    pub fn next_event(&mut self) -> Result<Event, LexError> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Ok(event);
            }
            if self.finished {
                return Ok(Event::End);
            }
            self.compact();
            match self.scan() {
                Ok(Some(raw)) => self.stage(raw),
                Ok(None) => self.finish()?,
                Err(Stop::Suspend) => {
                    trace!(
                        dialect = %self.dialect,
                        pending = self.buffer.len() - self.cursor,
                        words = self.words.len(),
                        "scanner needs more input"
                    );
                    return Ok(Event::NeedMore);
                }
                Err(Stop::Fail(err)) => return Err(err),
            }
        }
    }

    fn finish(&mut self) -> Result<(), LexError> {
        self.flush_words();
        if let Some((kind, position)) = self.nesting.last() {
            return Err(LexError::Unclosed {
                symbol: kind.open(),
                position: *position,
            });
        }
        self.finished = true;
        self.ready.push_back(Event::End);
        Ok(())
    }

    fn compact(&mut self) {
        if self.cursor > 0 && (self.cursor == self.buffer.len() || self.cursor >= COMPACT_THRESHOLD)
        {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }
    }

    // ------------------------------------------------------------------
    // Character access
    // ------------------------------------------------------------------

    /// Character at absolute buffer index `index`; suspends when the index
    /// is past the buffered input and more may arrive.
    fn at(&self, index: usize) -> Scan<Option<char>> {
        match self.buffer.get(index) {
            Some(&c) => Ok(Some(c)),
            None if self.closed => Ok(None),
            None => Err(Stop::Suspend),
        }
    }

    fn text(&self, from: usize, to: usize) -> String {
        self.buffer[from..to].iter().collect()
    }

    /// Consumes up to `end` and returns the position of the first consumed
    /// character.
    fn consume(&mut self, end: usize) -> Position {
        let start = self.position;
        for &c in &self.buffer[self.cursor..end] {
            self.position = self.position.advance(c);
        }
        if end > self.cursor {
            self.prev = Some(self.buffer[end - 1]);
        }
        self.cursor = end;
        start
    }

    // ------------------------------------------------------------------
    // Raw lexemes
    // ------------------------------------------------------------------

    fn scan(&mut self) -> Scan<Option<Raw>> {
        let start = self.cursor;
        let Some(c) = self.at(start)? else {
            return Ok(None);
        };
        let mysql = self.dialect == Dialect::Mysql;
        let raw = match c {
            c if c.is_whitespace() => self.scan_whitespace(start)?,
            '-' if self.at(start + 1)? == Some('-') && self.dashes_start_comment(start)? => {
                self.scan_line_comment(start)?
            }
            '#' if mysql => self.scan_line_comment(start)?,
            '/' if self.at(start + 1)? == Some('*') => self.scan_block_comment(start)?,
            '\'' => self.scan_string(start, None)?,
            '"' if !mysql || self.options.ansi_quotes => self.scan_quoted_identifier(start, '"')?,
            '"' => self.scan_string(start, None)?,
            '`' if mysql => self.scan_quoted_identifier(start, '`')?,
            '$' if self.dialect.rules().dollar_quoting() => self.scan_dollar(start)?,
            '?' if mysql => self.simple(start, 1, TokenKind::BindVariable),
            '@' if mysql => self.scan_variable(start)?,
            '0' if mysql && matches!(self.at(start + 1)?, Some('x' | 'b')) => {
                self.scan_prefixed_number(start)?
            }
            c if c.is_ascii_digit() => self.scan_number(start)?,
            '.' if self.dot_starts_number(start)? => self.scan_number(start)?,
            ',' | ';' | '.' => self.simple(start, 1, TokenKind::Punctuation),
            '(' => self.open_block(start, BlockKind::Paren),
            '[' => self.open_block(start, BlockKind::Bracket),
            '{' => self.open_block(start, BlockKind::Brace),
            ')' => self.close_block(start, BlockKind::Paren)?,
            ']' => self.close_block(start, BlockKind::Bracket)?,
            '}' => self.close_block(start, BlockKind::Brace)?,
            c if c.is_alphabetic() || c == '_' => self.scan_word(start)?,
            c if tables::is_operator_char(self.dialect, c) => self.scan_operator(start)?,
            character => {
                return Err(LexError::UnexpectedCharacter {
                    character,
                    position: self.position,
                }
                .into())
            }
        };
        Ok(Some(raw))
    }

    fn simple(&mut self, start: usize, len: usize, kind: TokenKind) -> Raw {
        let value = self.text(start, start + len);
        let position = self.consume(start + len);
        Raw::Token(Token::new(kind, value, position))
    }

    fn scan_whitespace(&mut self, start: usize) -> Scan<Raw> {
        let mut end = start;
        while let Some(c) = self.at(end)? {
            if !c.is_whitespace() {
                break;
            }
            end += 1;
        }
        Ok(self.simple(start, end - start, TokenKind::Whitespace))
    }

    /// MySQL only treats `--` as a comment when whitespace follows.
    fn dashes_start_comment(&self, start: usize) -> Scan<bool> {
        if self.dialect == Dialect::Postgres {
            return Ok(true);
        }
        Ok(match self.at(start + 2)? {
            None => true,
            Some(c) => c.is_whitespace() || c.is_control(),
        })
    }

    fn scan_line_comment(&mut self, start: usize) -> Scan<Raw> {
        let mut end = start;
        while let Some(c) = self.at(end)? {
            if c == '\n' {
                break;
            }
            end += 1;
        }
        Ok(self.simple(start, end - start, TokenKind::Comment))
    }

    fn scan_block_comment(&mut self, start: usize) -> Scan<Raw> {
        let nested = self.dialect.rules().nested_comments();
        let mut depth = 0usize;
        let mut i = start;
        loop {
            let Some(c) = self.at(i)? else {
                return Err(LexError::Unterminated {
                    what: "block comment",
                    position: self.position,
                }
                .into());
            };
            if c == '/' && (depth == 0 || nested) && self.at(i + 1)? == Some('*') {
                depth += 1;
                i += 2;
            } else if c == '*' && self.at(i + 1)? == Some('/') {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    break;
                }
            } else {
                i += 1;
            }
        }
        Ok(self.simple(start, i - start, TokenKind::Comment))
    }

    fn string_escapes(&self, modifier: Option<&str>) -> Escapes {
        if modifier == Some("E") {
            return Escapes::Postgres;
        }
        if !self.options.backslash_escapes {
            return Escapes::None;
        }
        match self.dialect {
            Dialect::Postgres => Escapes::Postgres,
            Dialect::Mysql => Escapes::Mysql,
        }
    }

    /// Scans the quoted body opened at `quote_at`; returns the unescaped
    /// value and the index just past the closing delimiter.
    fn scan_quoted(
        &self,
        quote_at: usize,
        quote: char,
        escapes: Escapes,
        what: &'static str,
    ) -> Scan<(String, usize)> {
        let unterminated = || LexError::Unterminated {
            what,
            position: self.position,
        };
        let mut value = String::new();
        let mut i = quote_at + 1;
        loop {
            let Some(c) = self.at(i)? else {
                return Err(unterminated().into());
            };
            if c == quote {
                if self.at(i + 1)? == Some(quote) {
                    value.push(quote);
                    i += 2;
                    continue;
                }
                return Ok((value, i + 1));
            }
            if c == '\\' && escapes != Escapes::None {
                let Some(escaped) = self.at(i + 1)? else {
                    return Err(unterminated().into());
                };
                i += 2;
                if escapes == Escapes::Mysql {
                    push_mysql_escape(&mut value, escaped);
                } else {
                    i = self.push_postgres_escape(&mut value, escaped, i)?;
                }
                continue;
            }
            value.push(c);
            i += 1;
        }
    }

    /// Decodes a Postgres escape whose letter was `escaped`; `i` indexes the
    /// character after it. Returns the index after the whole escape.
    fn push_postgres_escape(&self, value: &mut String, escaped: char, i: usize) -> Scan<usize> {
        let simple = match escaped {
            'b' => Some('\u{8}'),
            'f' => Some('\u{c}'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            _ => None,
        };
        if let Some(c) = simple {
            value.push(c);
            return Ok(i);
        }
        let (radix, max, first) = match escaped {
            'x' => (16, 2, None),
            'u' => (16, 4, None),
            'U' => (16, 8, None),
            '0'..='7' => (8, 2, Some(escaped)),
            other => {
                value.push(other);
                return Ok(i);
            }
        };
        let mut digits = first.map(String::from).unwrap_or_default();
        let mut j = i;
        while j - i < max {
            match self.at(j)? {
                Some(d) if d.is_digit(radix) => {
                    digits.push(d);
                    j += 1;
                }
                _ => break,
            }
        }
        if digits.is_empty() {
            value.push(escaped);
            return Ok(j);
        }
        if matches!(escaped, 'u' | 'U') && j - i != max {
            return Err(LexError::InvalidLiteral {
                what: "string literal",
                message: format!("\\{escaped} escape needs {max} hex digits"),
                position: self.position,
            }
            .into());
        }
        let decoded = u32::from_str_radix(&digits, radix)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| LexError::InvalidLiteral {
                what: "string literal",
                message: format!("invalid escape value \\{escaped}{digits}"),
                position: self.position,
            })?;
        value.push(decoded);
        Ok(j)
    }

    fn scan_string(&mut self, quote_at: usize, modifier: Option<String>) -> Scan<Raw> {
        let quote = self.buffer[quote_at];
        let escapes = self.string_escapes(modifier.as_deref());
        let (value, end) = self.scan_quoted(quote_at, quote, escapes, "string literal")?;
        let position = self.consume(end);
        let mut token =
            Token::new(TokenKind::StringLiteral, value, position).with_delimiter(quote.to_string());
        token.modifier = modifier;
        Ok(Raw::Token(token))
    }

    fn scan_quoted_identifier(&mut self, start: usize, quote: char) -> Scan<Raw> {
        let (value, end) = self.scan_quoted(start, quote, Escapes::None, "quoted identifier")?;
        if value.is_empty() {
            return Err(LexError::InvalidLiteral {
                what: "quoted identifier",
                message: String::from("zero-length delimited identifier"),
                position: self.position,
            }
            .into());
        }
        let position = self.consume(end);
        Ok(Raw::Token(
            Token::new(TokenKind::Identifier, value, position).with_delimiter(quote.to_string()),
        ))
    }

    /// `X'..'` and `B'..'` literals.
    fn scan_quoted_digits(&mut self, quote_at: usize, kind: TokenKind, marker: &str) -> Scan<Raw> {
        let what = if kind == TokenKind::HexLiteral {
            "hex literal"
        } else {
            "bit literal"
        };
        let (digits, end) = self.scan_quoted(quote_at, '\'', Escapes::None, what)?;
        self.check_digits(kind, &digits, what)?;
        let position = self.consume(end);
        Ok(Raw::Token(
            Token::new(kind, digits, position)
                .with_delimiter("'")
                .with_modifier(marker),
        ))
    }

    fn check_digits(&self, kind: TokenKind, digits: &str, what: &'static str) -> Result<(), LexError> {
        let valid: fn(char) -> bool = if kind == TokenKind::HexLiteral {
            |c| c.is_ascii_hexdigit()
        } else {
            |c| c == '0' || c == '1'
        };
        if let Some(bad) = digits.chars().find(|c| !valid(*c)) {
            return Err(LexError::InvalidLiteral {
                what,
                message: format!("invalid digit '{bad}'"),
                position: self.position,
            });
        }
        Ok(())
    }

    /// Postgres `$`: bind variable, dollar-quoted string, or bare operator.
    fn scan_dollar(&mut self, start: usize) -> Scan<Raw> {
        match self.at(start + 1)? {
            Some(c) if c.is_ascii_digit() => {
                let mut end = start + 1;
                while matches!(self.at(end)?, Some(d) if d.is_ascii_digit()) {
                    end += 1;
                }
                let value = self.text(start + 1, end);
                let position = self.consume(end);
                Ok(Raw::Token(Token::new(TokenKind::BindVariable, value, position)))
            }
            Some('$') => self.scan_dollar_body(start, start + 2),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let mut end = start + 1;
                while let Some(c) = self.at(end)? {
                    if c.is_alphanumeric() || c == '_' {
                        end += 1;
                    } else {
                        break;
                    }
                }
                if self.at(end)? == Some('$') {
                    self.scan_dollar_body(start, end + 1)
                } else {
                    Ok(self.simple(start, 1, TokenKind::Operator))
                }
            }
            _ => Ok(self.simple(start, 1, TokenKind::Operator)),
        }
    }

    fn scan_dollar_body(&mut self, start: usize, body_start: usize) -> Scan<Raw> {
        let tag = &self.buffer[start..body_start];
        let mut i = body_start;
        loop {
            if i + tag.len() > self.buffer.len() {
                if self.closed {
                    return Err(LexError::Unterminated {
                        what: "dollar-quoted string",
                        position: self.position,
                    }
                    .into());
                }
                return Err(Stop::Suspend);
            }
            if self.buffer[i..i + tag.len()] == *tag {
                break;
            }
            i += 1;
        }
        let delimiter = self.text(start, body_start);
        let value = self.text(body_start, i);
        let position = self.consume(i + (body_start - start));
        Ok(Raw::Token(
            Token::new(TokenKind::StringLiteral, value, position).with_delimiter(delimiter),
        ))
    }

    /// MySQL `@name`, `@@name`, `@'quoted'`.
    fn scan_variable(&mut self, start: usize) -> Scan<Raw> {
        let mut i = start + 1;
        if self.at(i)? == Some('@') {
            i += 1;
        }
        let modifier = self.text(start, i);
        match self.at(i)? {
            Some(quote @ ('\'' | '"' | '`')) => {
                let (value, end) = self.scan_quoted(i, quote, Escapes::None, "variable name")?;
                let position = self.consume(end);
                Ok(Raw::Token(
                    Token::new(TokenKind::Variable, value, position)
                        .with_delimiter(quote.to_string())
                        .with_modifier(modifier),
                ))
            }
            Some(c) if c.is_alphanumeric() || matches!(c, '_' | '$') => {
                let mut end = i;
                while let Some(c) = self.at(end)? {
                    if c.is_alphanumeric() || matches!(c, '_' | '$' | '.') {
                        end += 1;
                    } else {
                        break;
                    }
                }
                let value = self.text(i, end);
                let position = self.consume(end);
                Ok(Raw::Token(
                    Token::new(TokenKind::Variable, value, position).with_modifier(modifier),
                ))
            }
            _ => Err(LexError::UnexpectedCharacter {
                character: '@',
                position: self.position,
            }
            .into()),
        }
    }

    fn dot_starts_number(&self, start: usize) -> Scan<bool> {
        let follows_name = self
            .prev
            .is_some_and(|p| p.is_alphanumeric() || matches!(p, '_' | '"' | '`' | ')' | ']'));
        Ok(!follows_name && matches!(self.at(start + 1)?, Some(c) if c.is_ascii_digit()))
    }

    fn scan_number(&mut self, start: usize) -> Scan<Raw> {
        let invalid = |message: &str| LexError::InvalidLiteral {
            what: "number",
            message: message.to_string(),
            position: self.position,
        };
        let mut i = start;
        while matches!(self.at(i)?, Some(c) if c.is_ascii_digit()) {
            i += 1;
        }
        if self.at(i)? == Some('.') {
            i += 1;
            while matches!(self.at(i)?, Some(c) if c.is_ascii_digit()) {
                i += 1;
            }
            if self.at(i)? == Some('.') {
                return Err(invalid("multiple decimal points").into());
            }
        }
        if matches!(self.at(i)?, Some('e' | 'E')) {
            let mut j = i + 1;
            if matches!(self.at(j)?, Some('+' | '-')) {
                j += 1;
            }
            if !matches!(self.at(j)?, Some(c) if c.is_ascii_digit()) {
                return Err(invalid("exponent has no digits").into());
            }
            while matches!(self.at(j)?, Some(c) if c.is_ascii_digit()) {
                j += 1;
            }
            i = j;
        }
        Ok(self.simple(start, i - start, TokenKind::NumberLiteral))
    }

    /// MySQL `0x1F` and `0b101`.
    fn scan_prefixed_number(&mut self, start: usize) -> Scan<Raw> {
        let hex = self.buffer[start + 1] == 'x';
        let (kind, what, marker) = if hex {
            (TokenKind::HexLiteral, "hex literal", "0x")
        } else {
            (TokenKind::BitLiteral, "bit literal", "0b")
        };
        let mut end = start + 2;
        while matches!(self.at(end)?, Some(c) if c.is_alphanumeric() || c == '_') {
            end += 1;
        }
        let digits = self.text(start + 2, end);
        if digits.is_empty() {
            return Err(LexError::InvalidLiteral {
                what,
                message: String::from("missing digits"),
                position: self.position,
            }
            .into());
        }
        self.check_digits(kind, &digits, what)?;
        let position = self.consume(end);
        Ok(Raw::Token(Token::new(kind, digits, position).with_modifier(marker)))
    }

    fn scan_word(&mut self, start: usize) -> Scan<Raw> {
        let mut end = start + 1;
        while let Some(c) = self.at(end)? {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                end += 1;
            } else {
                break;
            }
        }
        let word = self.text(start, end);
        if self.at(end)? == Some('\'') {
            if let Some(raw) = self.scan_prefixed_literal(end, &word)? {
                return Ok(raw);
            }
        }
        let upper = word.to_uppercase();
        let kind = tables::classify_word(self.dialect, &upper);
        let value = if kind == TokenKind::Identifier { word } else { upper };
        let position = self.consume(end);
        Ok(Raw::Token(Token::new(kind, value, position)))
    }

    fn scan_prefixed_literal(&mut self, quote_at: usize, word: &str) -> Scan<Option<Raw>> {
        let raw = match word.to_ascii_uppercase().as_str() {
            "E" if self.dialect == Dialect::Postgres => {
                self.scan_string(quote_at, Some(String::from("E")))?
            }
            "N" => self.scan_string(quote_at, Some(String::from("N")))?,
            "X" => self.scan_quoted_digits(quote_at, TokenKind::HexLiteral, "X")?,
            "B" => self.scan_quoted_digits(quote_at, TokenKind::BitLiteral, "B")?,
            _ if self.dialect == Dialect::Mysql && word.len() > 1 && word.starts_with('_') => {
                self.scan_string(quote_at, Some(word.to_string()))?
            }
            _ => return Ok(None),
        };
        Ok(Some(raw))
    }

    fn scan_operator(&mut self, start: usize) -> Scan<Raw> {
        let mut end = start;
        while matches!(self.at(end)?, Some(c) if tables::is_operator_char(self.dialect, c)) {
            end += 1;
        }
        let run = self.text(start, end);
        let Some(symbol) = tables::symbol_operators(self.dialect)
            .iter()
            .filter(|op| run.starts_with(**op))
            .max_by_key(|op| op.len())
        else {
            return Err(LexError::UnexpectedCharacter {
                character: self.buffer[start],
                position: self.position,
            }
            .into());
        };
        let mut token = match self.simple(start, symbol.chars().count(), TokenKind::Operator) {
            Raw::Token(token) => token,
            other => return Ok(other),
        };
        token.operator = tables::operator(self.dialect, symbol);
        Ok(Raw::Token(token))
    }

    fn open_block(&mut self, start: usize, kind: BlockKind) -> Raw {
        if !self.options.structured {
            let raw = self.simple(start, 1, TokenKind::Punctuation);
            self.nesting.push((kind, self.token_position(&raw)));
            return raw;
        }
        let position = self.consume(start + 1);
        self.nesting.push((kind, position));
        Raw::Open(kind, position)
    }

    fn close_block(&mut self, start: usize, kind: BlockKind) -> Scan<Raw> {
        if !matches!(self.nesting.last(), Some((open, _)) if *open == kind) {
            return Err(LexError::UnbalancedClose {
                symbol: kind.close(),
                position: self.position,
            }
            .into());
        }
        self.nesting.pop();
        if self.options.structured {
            let position = self.consume(start + 1);
            Ok(Raw::Close(kind, position))
        } else {
            Ok(self.simple(start, 1, TokenKind::Punctuation))
        }
    }

    fn token_position(&self, raw: &Raw) -> Position {
        match raw {
            Raw::Token(token) => token.position(),
            Raw::Open(_, position) | Raw::Close(_, position) => *position,
        }
    }

    // ------------------------------------------------------------------
    // Finalization: trivia, compounds, classification
    // ------------------------------------------------------------------

    fn stage(&mut self, raw: Raw) {
        match raw {
            Raw::Token(token) => self.stage_token(token),
            Raw::Open(kind, position) => {
                self.flush_words();
                let space_before = std::mem::take(&mut self.space_pending);
                self.ready.push_back(Event::Open {
                    kind,
                    position,
                    space_before,
                });
            }
            Raw::Close(kind, position) => {
                self.flush_words();
                self.space_pending = false;
                self.ready.push_back(Event::Close { kind, position });
            }
        }
    }

    fn stage_token(&mut self, mut token: Token) {
        match token.kind {
            TokenKind::Whitespace => {
                self.space_pending = true;
                if self.options.emit_whitespace {
                    self.restage(token);
                }
            }
            TokenKind::Comment => {
                self.flush_words();
                self.space_pending = true;
                if self.options.emit_comments {
                    self.ready.push_back(Event::Token(token));
                }
            }
            _ => {
                token.space_before = std::mem::take(&mut self.space_pending);
                if is_compound_candidate(&token) {
                    self.stage_word(token);
                } else {
                    self.flush_words();
                    self.push_final(token);
                }
            }
        }
    }

    /// Re-enters a token released from the multi-word buffer.
    fn restage(&mut self, token: Token) {
        if token.kind.is_trivia() {
            if self.words.is_empty() {
                self.ready.push_back(Event::Token(token));
            } else {
                self.words.push(token);
            }
        } else {
            self.stage_word(token);
        }
    }

    fn stage_word(&mut self, token: Token) {
        let upper = token.value.to_uppercase();
        if self.words.is_empty() {
            if tables::compound(self.dialect, &upper).prefix {
                self.words.push(token);
            } else {
                self.push_final(token);
            }
            return;
        }
        let phrase = format!("{} {upper}", self.buffered_phrase());
        let found = tables::compound(self.dialect, &phrase);
        if found.complete.is_some() || found.prefix {
            self.words.push(token);
            if !found.prefix {
                self.resolve_words();
            }
            return;
        }
        self.resolve_words();
        self.stage_word(token);
    }

    fn buffered_phrase(&self) -> String {
        self.words
            .iter()
            .filter(|t| !t.kind.is_trivia())
            .map(|t| t.value.to_uppercase())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Emits the longest complete compound at the head of the multi-word
    /// buffer (or its first word alone) and re-stages the remainder.
    fn resolve_words(&mut self) {
        let pending = std::mem::take(&mut self.words);
        let word_at: Vec<usize> = pending
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.kind.is_trivia())
            .map(|(i, _)| i)
            .collect();
        if word_at.is_empty() {
            self.ready.extend(pending.into_iter().map(Event::Token));
            return;
        }

        let mut best = 1;
        let mut best_kind = None;
        let mut phrase = String::new();
        for (n, &i) in word_at.iter().enumerate() {
            if n > 0 {
                phrase.push(' ');
            }
            phrase.push_str(&pending[i].value.to_uppercase());
            if n > 0 {
                if let Some(kind) = tables::compound(self.dialect, &phrase).complete {
                    best = n + 1;
                    best_kind = Some(kind);
                }
            }
        }

        let mut rest = pending.into_iter();
        let head: Vec<Token> = rest
            .by_ref()
            .take(word_at[best - 1] + 1)
            .filter(|t| !t.kind.is_trivia())
            .collect();
        match best_kind {
            Some(kind) => self.push_compound(head, kind),
            None => {
                for token in head {
                    self.push_final(token);
                }
            }
        }
        for token in rest {
            self.restage(token);
        }
    }

    fn flush_words(&mut self) {
        while !self.words.is_empty() {
            self.resolve_words();
        }
    }

    fn push_compound(&mut self, words: Vec<Token>, kind: TokenKind) {
        let phrase = words
            .iter()
            .map(|t| t.value.to_uppercase())
            .collect::<Vec<_>>()
            .join(" ");
        let Some(first) = words.first() else {
            return;
        };
        let mut token = Token::new(kind, phrase, first.position());
        token.space_before = first.space_before;
        token.operator = tables::operator(self.dialect, &token.value);
        self.ready.push_back(Event::Token(token));
    }

    fn push_final(&mut self, mut token: Token) {
        if token.kind == TokenKind::Keyword {
            token.operator = tables::operator(self.dialect, &token.value);
        }
        self.ready.push_back(Event::Token(token));
    }
}

fn is_compound_candidate(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Keyword | TokenKind::Identifier | TokenKind::DataType
    ) && token.delimiter.is_none()
}

fn push_mysql_escape(value: &mut String, escaped: char) {
    match escaped {
        '0' => value.push('\0'),
        'b' => value.push('\u{8}'),
        'n' => value.push('\n'),
        'r' => value.push('\r'),
        't' => value.push('\t'),
        'Z' => value.push('\u{1a}'),
        '%' | '_' => {
            value.push('\\');
            value.push(escaped);
        }
        other => value.push(other),
    }
}
