//! Error reporting: asserted rules, lexical failures and leftover input.

mod common;
use common::*;

use sqlweave_core::grammar::{default_registry, ParseOptions, Parser};
use sqlweave_core::lexer::Position;
use sqlweave_core::{parse_stream, Dialect, Error, LexError, TokenKind, Tokenizer};

fn parse_error(sql: &str) -> sqlweave_core::ParseError {
    match parse_err(sql, Dialect::Postgres) {
        Error::Parse(err) => err,
        other => panic!("expected a parse error for {sql}, got {other:?}"),
    }
}

#[test]
fn missing_select_list() {
    let err = parse_error("SELECT FROM t");
    assert_eq!(err.node, Some("SelectStmt"));
    assert_eq!(err.found, Some(TokenKind::Keyword));
    assert_eq!(err.found_value.as_deref(), Some("FROM"));
    assert_eq!(err.position, Some(Position::new(1, 8)));
    assert_eq!(err.dialect, Some(Dialect::Postgres));
    assert!(err.to_string().contains("line 1, column 8"), "{err}");
}

#[test]
fn missing_clause_body_at_end_of_input() {
    let err = parse_error("SELECT a FROM t WHERE");
    assert_eq!(err.node, Some("SelectStmt"));
    assert!(err.position.is_none());
    assert!(err.message.starts_with("Unexpected end of input"), "{}", err.message);
}

#[test]
fn missing_clause_body_reports_position() {
    let err = parse_error("SELECT a\nFROM t\nWHERE ORDER BY a");
    assert_eq!(err.found_value.as_deref(), Some("ORDER BY"));
    assert_eq!(err.position, Some(Position::new(3, 7)));
}

#[test]
fn unterminated_string() {
    let err = parse_err("SELECT 'abc", Dialect::Postgres);
    assert!(
        matches!(err, Error::Lex(LexError::Unterminated { what, .. }) if what.contains("string")),
        "{err:?}"
    );
}

#[test]
fn unclosed_paren() {
    let err = parse_err("SELECT (a + b", Dialect::Mysql);
    assert!(
        matches!(
            err,
            Error::Lex(LexError::Unclosed { symbol: '(', position }) if position == Position::new(1, 8)
        ),
        "{err:?}"
    );
}

#[test]
fn unbalanced_close() {
    let err = parse_err("SELECT a)", Dialect::Postgres);
    assert!(
        matches!(err, Error::Lex(LexError::UnbalancedClose { symbol: ')', .. })),
        "{err:?}"
    );
}

#[test]
fn unexpected_character() {
    let err = parse_err("SELECT a \u{a4} b", Dialect::Postgres);
    assert!(
        matches!(err, Error::Lex(LexError::UnexpectedCharacter { .. })),
        "{err:?}"
    );
}

#[test]
fn leftover_input_is_no_match() {
    let err = parse_err("SELECT a FROM t garbage here", Dialect::Postgres);
    let Error::NoMatch { expected, found } = err else {
        panic!("expected NoMatch, got {err:?}");
    };
    assert_eq!(expected, "Script");
    assert!(found.contains("line 1, column 25"), "{found}");
}

#[test]
fn assert_policy_turns_mismatch_into_error() {
    let sql = "SELECT a AS FROM t";
    assert!(matches!(parse_err(sql, Dialect::Postgres), Error::NoMatch { .. }));

    // The alias name after `AS`.
    let stream = Tokenizer::new(sql, Dialect::Postgres).into_stream();
    let options = ParseOptions::default().assert_when(|path| path == "SelectItem/1/1");
    let err = parse_stream(&stream, default_registry(), Dialect::Postgres, &["Script"], options)
        .unwrap_err();
    let Error::Parse(err) = err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert_eq!(err.node, Some("SelectItem"));
    assert_eq!(err.rule_path.as_deref(), Some("SelectItem/1/1"));
    assert_eq!(err.found_value.as_deref(), Some("FROM"));
}

#[test]
fn unknown_node_type() {
    let stream = Tokenizer::new("a", Dialect::Postgres).into_stream();
    let mut parser = Parser::new(default_registry(), Dialect::Postgres);
    let err = parser.parse_node("NoSuchNode", &stream).unwrap_err();
    assert!(
        matches!(err, Error::Grammar(sqlweave_core::GrammarError::UnknownType { ref tag }) if tag == "NoSuchNode"),
        "{err:?}"
    );
}
