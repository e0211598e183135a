//! Tests for literal values, bind variables and identifier quoting.

mod common;
use common::*;

use sqlweave_core::{Dialect, TokenKind};

fn literal(tree: &sqlweave_core::Tree, index: usize) -> (String, Option<String>) {
    let ast = tree.ast();
    let id = column_expr(tree, index);
    let terminal = ast.terminal(id, "value").expect("literal value");
    (terminal.value.clone(), terminal.modifier.clone())
}

#[test]
fn doubled_quote_escape() {
    let tree = parse("SELECT 'it''s a test'");
    assert_eq!(literal(&tree, 0).0, "it's a test");
    round_trip("SELECT 'it''s a test'");
}

#[test]
fn postgres_escape_string() {
    let tree = parse(r"SELECT E'hello\nworld'");
    assert_eq!(
        literal(&tree, 0),
        (String::from("hello\nworld"), Some(String::from("E")))
    );
    round_trip(r"SELECT E'hello\nworld', E'tab\there', E'quote\'s'");
}

#[test]
fn postgres_dollar_quoting() {
    let tree = parse("SELECT $$abc$$, $tag$it's $$ raw$tag$");
    assert_eq!(literal(&tree, 0).0, "abc");
    assert_eq!(literal(&tree, 1).0, "it's $$ raw");
    assert_eq!(tree.to_sql().unwrap(), "SELECT 'abc', 'it''s $$ raw'");
}

#[test]
fn mysql_backslash_escapes() {
    let tree = parse_in(r"SELECT 'a\'b', 'c\\d', 'e\nf'", Dialect::Mysql);
    assert_eq!(literal(&tree, 0).0, "a'b");
    assert_eq!(literal(&tree, 1).0, r"c\d");
    assert_eq!(literal(&tree, 2).0, "e\nf");
    round_trip_in(r"SELECT 'a\'b', 'c\\d', 'e\nf'", Dialect::Mysql);
}

#[test]
fn postgres_plain_strings_keep_backslashes() {
    let tree = parse(r"SELECT 'c:\dir'");
    assert_eq!(literal(&tree, 0).0, r"c:\dir");
}

#[test]
fn numbers() {
    let tree = parse("SELECT 42, 1.5, .5, 5., 1e10, 2.5E-3");
    let values: Vec<String> = (0..6).map(|i| literal(&tree, i).0).collect();
    assert_eq!(values, ["42", "1.5", ".5", "5.", "1e10", "2.5E-3"]);
    round_trip("SELECT 42, 1.5, .5, 1e10, 2.5E-3");
}

#[test]
fn hex_and_bit_literals() {
    let tree = parse("SELECT X'1F', B'101'");
    assert_eq!(literal(&tree, 0).0, "1F");
    assert_eq!(literal(&tree, 1).0, "101");
    round_trip("SELECT X'1F', B'101'");

    let tree = parse_in("SELECT 0x1F, 0b101", Dialect::Mysql);
    assert_eq!(literal(&tree, 0), (String::from("1F"), Some(String::from("0x"))));
    assert_eq!(tree.to_sql().unwrap(), "SELECT 0x1F, 0b101");
    assert_eq!(
        tree.to_sql_with(Dialect::Postgres, &sqlweave_core::FormatOptions::default())
            .unwrap(),
        "SELECT X'1F', B'101'"
    );
}

#[test]
fn mysql_string_introducers() {
    let tree = parse_in("SELECT _utf8mb4'x', N'y'", Dialect::Mysql);
    assert_eq!(literal(&tree, 0).1.as_deref(), Some("_utf8mb4"));
    assert_eq!(literal(&tree, 1).1.as_deref(), Some("N"));
    round_trip_in("SELECT _utf8mb4'x', N'y'", Dialect::Mysql);
}

#[test]
fn booleans_and_null() {
    assert_eq!(expr("TRUE"), "TRUE");
    assert_eq!(expr("null"), "NULL");
    round_trip("SELECT TRUE, FALSE, NULL");
}

#[test]
fn bind_variables() {
    let tree = parse("SELECT $1, $2");
    assert_eq!(literal(&tree, 1).0, "2");
    let tree = parse_in("SELECT ?, ?", Dialect::Mysql);
    let ast = tree.ast();
    let bind = ast.terminal(column_expr(&tree, 0), "value").unwrap();
    assert_eq!(bind.kind, TokenKind::BindVariable);
    round_trip_in("SELECT a FROM t WHERE a = ? AND b = ?", Dialect::Mysql);
}

#[test]
fn quoted_identifiers() {
    let tree = parse(r#"SELECT "Order", "we""ird" FROM "my table""#);
    let ast = tree.ast();
    let order = ast.terminal(column_expr(&tree, 0), "name").unwrap();
    assert!(order.quoted);
    assert_eq!(order.value, "Order");
    assert_eq!(ast.terminal(column_expr(&tree, 1), "name").unwrap().value, "we\"ird");
    round_trip(r#"SELECT "Order", "we""ird" FROM "my table""#);
    round_trip_in("SELECT `Order`, `we``ird` FROM `my table`", Dialect::Mysql);
}
