//! Chunked and asynchronous input: results never depend on where the
//! input is split.

mod common;
use common::*;

use futures::executor::block_on;
use futures::stream::{self, StreamExt};
use sqlweave_core::{
    parse_async, parse_chunks, AsyncTokenizer, Dialect, Token, TokenKind, Tokenizer,
    TokenizerOptions, SCRIPT,
};

type Summary = Vec<(TokenKind, String, u32, u32)>;

fn summarize(tokens: impl IntoIterator<Item = Token>) -> Summary {
    tokens
        .into_iter()
        .map(|t| (t.kind, t.value, t.line, t.column))
        .collect()
}

fn flat_tokens(chunks: Vec<String>, dialect: Dialect) -> Summary {
    let options = TokenizerOptions::for_dialect(dialect).structured(false);
    let tokens: Vec<Token> = Tokenizer::from_chunks(chunks, dialect, options)
        .collect::<Result<_, _>>()
        .expect("tokenize");
    summarize(tokens)
}

/// Every way of cutting `sql` in two.
fn two_way_splits(sql: &str) -> impl Iterator<Item = Vec<String>> + '_ {
    sql.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(sql.len()))
        .map(move |i| vec![sql[..i].to_string(), sql[i..].to_string()])
}

fn one_char_chunks(sql: &str) -> Vec<String> {
    sql.chars().map(String::from).collect()
}

#[test]
fn split_keyword_and_identifier() {
    let chunks = ["SEL", "ECT i", "d FROM users;"];
    let tree = parse_chunks(chunks, Dialect::Postgres, &[SCRIPT]).unwrap();
    assert!(tree.structural_eq(&parse("SELECT id FROM users;")));

    let tokens = flat_tokens(chunks.map(String::from).to_vec(), Dialect::Postgres);
    let values: Vec<&str> = tokens.iter().map(|t| t.1.as_str()).collect();
    assert_eq!(values, ["SELECT", "id", "FROM", "users", ";"]);
}

#[test]
fn every_split_point_gives_the_same_tokens() {
    let inputs = [
        (Dialect::Postgres, "SELECT a.b, 'it''s', $1, x::INT FROM t WHERE c >= 1.5e3"),
        (Dialect::Postgres, "SELECT E'a\\nb', $tag$ body $tag$ -- note\n/* c */ FROM t"),
        (Dialect::Mysql, "SELECT `a``b`, 'x\\'y', 0x1F, @v := 2 FROM t ORDER BY a"),
        (Dialect::Postgres, "SELECT a FROM t WHERE b IS NOT NULL GROUP BY a"),
    ];
    for (dialect, sql) in inputs {
        let whole = flat_tokens(vec![sql.to_string()], dialect);
        for chunks in two_way_splits(sql) {
            let split = flat_tokens(chunks.clone(), dialect);
            assert_eq!(split, whole, "split {chunks:?}");
        }
        assert_eq!(flat_tokens(one_char_chunks(sql), dialect), whole);
    }
}

#[test]
fn compound_keyword_split_across_chunks() {
    let tokens = flat_tokens(
        vec![String::from("SELECT a FROM t ORDER"), String::from(" BY a")],
        Dialect::Postgres,
    );
    assert!(tokens
        .iter()
        .any(|(kind, value, ..)| *kind == TokenKind::Keyword && value == "ORDER BY"));
}

#[test]
fn chunked_parse_matches_whole_parse() {
    let sql = "SELECT (a + 1) * 2, f(x, 'y') FROM t WHERE a IN (1, 2); SELECT 3";
    let whole = parse(sql);
    for chunks in two_way_splits(sql) {
        let tree = parse_chunks(chunks.clone(), Dialect::Postgres, &[SCRIPT])
            .unwrap_or_else(|e| panic!("split {chunks:?}: {e}"));
        assert!(tree.structural_eq(&whole), "split {chunks:?}");
    }
}

#[test]
fn empty_chunks_are_ignored() {
    let chunks = ["", "SELECT", "", " 1", ""];
    let tree = parse_chunks(chunks, Dialect::Mysql, &[SCRIPT]).unwrap();
    assert!(tree.structural_eq(&parse_in("SELECT 1", Dialect::Mysql)));
}

#[test]
fn async_parse_matches_sync_parse() {
    let chunks: Vec<String> = ["SEL", "ECT i", "d FROM users;"]
        .into_iter()
        .map(String::from)
        .collect();
    let tree = block_on(parse_async(stream::iter(chunks), Dialect::Postgres, &[SCRIPT])).unwrap();
    assert!(tree.structural_eq(&parse("SELECT id FROM users;")));
}

#[test]
fn async_flat_tokens() {
    let sql = "SELECT f(a), 'it''s' FROM t";
    let dialect = Dialect::Postgres;
    let tokenizer = AsyncTokenizer::new(
        stream::iter(one_char_chunks(sql)),
        dialect,
        TokenizerOptions::for_dialect(dialect),
    );
    let tokens: Vec<Token> = block_on(tokenizer.into_tokens().collect::<Vec<_>>())
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(summarize(tokens), flat_tokens(vec![sql.to_string()], dialect));
}

#[test]
fn async_lex_error_surfaces() {
    let chunks = vec![String::from("SELECT 'open")];
    let err = block_on(parse_async(stream::iter(chunks), Dialect::Postgres, &[SCRIPT])).unwrap_err();
    assert!(matches!(err, sqlweave_core::Error::Lex(_)), "{err:?}");
}

#[test]
fn literals_split_mid_escape() {
    let cases = [
        ("SELECT 'it''s a test'", "it's a test"),
        ("SELECT E'hello\\nworld'", "hello\nworld"),
        ("SELECT $$abc$$", "abc"),
    ];
    for (sql, expected) in cases {
        for chunks in two_way_splits(sql) {
            let tree = parse_chunks(chunks.clone(), Dialect::Postgres, &[SCRIPT]).unwrap();
            let value = &tree
                .ast()
                .terminal(column_expr(&tree, 0), "value")
                .unwrap()
                .value;
            assert_eq!(value, expected, "split {chunks:?}");
        }
    }
}
