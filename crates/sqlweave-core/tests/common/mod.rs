#![allow(dead_code)]

use sqlweave_core::{parse_as, Dialect, Error, NodeId, Tree, SCRIPT};

pub fn parse_in(sql: &str, dialect: Dialect) -> Tree {
    parse_as(sql, dialect, &[SCRIPT])
        .unwrap_or_else(|e| panic!("Failed to parse ({dialect}): {sql}\nError: {e:?}"))
}

pub fn parse(sql: &str) -> Tree {
    parse_in(sql, Dialect::Postgres)
}

pub fn parse_err(sql: &str, dialect: Dialect) -> Error {
    match parse_as(sql, dialect, &[SCRIPT]) {
        Ok(tree) => panic!("Expected error for: {sql}\nGot: {:?}", tree.to_json()),
        Err(err) => err,
    }
}

/// Returns the first statement of a parsed script.
pub fn statement(tree: &Tree) -> NodeId {
    tree.ast().children(tree.root(), "statements")[0]
}

/// Returns the expression of the `index`-th select item of the first
/// statement.
pub fn column_expr(tree: &Tree, index: usize) -> NodeId {
    let ast = tree.ast();
    let item = ast.children(statement(tree), "columns")[index];
    ast.child(item, "expr").expect("select item without expression")
}

/// Parses `SELECT <sql>` and returns its expression as an S-expression.
pub fn expr_in(sql: &str, dialect: Dialect) -> String {
    let tree = parse_in(&format!("SELECT {sql}"), dialect);
    sexpr(&tree, column_expr(&tree, 0))
}

pub fn expr(sql: &str) -> String {
    expr_in(sql, Dialect::Postgres)
}

/// Compact rendering of an expression's grouping: `(op left right)`,
/// `[inner]` for parentheses.
pub fn sexpr(tree: &Tree, id: NodeId) -> String {
    let ast = tree.ast();
    let text = |field: &str| {
        ast.terminal(id, field)
            .map(|t| t.value.clone())
            .unwrap_or_default()
    };
    let child = |field: &str| {
        ast.child(id, field)
            .map(|c| sexpr(tree, c))
            .unwrap_or_default()
    };
    match ast[id].tag() {
        "BinaryExpr" => format!("({} {} {})", text("operator"), child("left"), child("right")),
        "NotExpr" => format!("(NOT {})", child("operand")),
        "NegateExpr" => format!("({} {})", text("operator"), child("operand")),
        "ParenExpr" => format!("[{}]", child("expr")),
        "Tuple" => {
            let items: Vec<String> = ast
                .children(id, "items")
                .iter()
                .map(|item| sexpr(tree, *item))
                .collect();
            format!("<{}>", items.join(" "))
        }
        "ColumnRef" => text("name"),
        "NumberLiteral" | "BooleanLiteral" | "BindVariable" => text("value"),
        "StringLiteral" => format!("'{}'", text("value")),
        "NullLiteral" => String::from("NULL"),
        "UserVariable" => format!("@{}", text("name")),
        other => other.to_string(),
    }
}

/// Verifies that rendering is a fixed point: the rendered SQL re-parses
/// to a structurally equal tree that renders to the same text.
pub fn round_trip_in(sql: &str, dialect: Dialect) {
    let first = parse_in(sql, dialect);
    let rendered1 = first
        .to_sql()
        .unwrap_or_else(|e| panic!("Failed to render: {sql}\nError: {e:?}"));
    let second = parse_in(&rendered1, dialect);
    let rendered2 = second.to_sql().expect("re-render");
    assert!(
        first.structural_eq(&second),
        "Round-trip changed the tree.\n  Input:    {sql}\n  Rendered: {rendered1}"
    );
    assert_eq!(
        rendered1, rendered2,
        "Round-trip failed.\n  Input:    {sql}\n  First:    {rendered1}\n  Second:   {rendered2}"
    );
}

pub fn round_trip(sql: &str) {
    round_trip_in(sql, Dialect::Postgres);
}
