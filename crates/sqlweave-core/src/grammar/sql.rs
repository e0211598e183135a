//! Built-in SQL grammar.
//!
//! A compact grammar over literals, names, expressions and `SELECT`
//! statements. It is what [`default_registry`](super::default_registry)
//! holds and what the crate-level `parse` functions use; larger grammars
//! register their own types next to or instead of these.

use crate::dialect::Dialect;
use crate::lexer::tables::precedence;
use crate::lexer::TokenKind;

use super::registry::{ClimbingNode, Registry};
use super::rule::{alt, expr, kw, node, op, paren, punct, seq, tok, tok_values, Climb, Condition, Rule};

/// Operand types of an expression, in the order they are tried.
pub const OPERANDS: &[&str] = &[
    "NotExpr",
    "NegateExpr",
    "ExistsExpr",
    "CastExpr",
    "FunctionCall",
    "Subquery",
    "ParenExpr",
    "Tuple",
    "StringLiteral",
    "NumberLiteral",
    "HexLiteral",
    "BitLiteral",
    "BooleanLiteral",
    "NullLiteral",
    "BindVariable",
    "UserVariable",
    "AllColumns",
    "ColumnRef",
];

/// Shape of binary expressions.
pub const BINARY: Climb = Climb {
    node: "BinaryExpr",
    left: "left",
    operator: "operator",
    right: "right",
};

/// Node types a statement list may hold.
pub const STATEMENTS: &[&str] = &["SelectStmt"];

fn expression() -> Rule {
    expr(OPERANDS, BINARY)
}

/// `[AS] alias`
fn alias() -> Rule {
    seq([
        kw("AS").named("as_keyword").optional(),
        tok([TokenKind::Identifier]).named("alias"),
    ])
    .optional()
}

/// `table.` prefix of a column reference.
fn qualifier() -> Rule {
    seq([tok([TokenKind::Identifier]).named("table"), punct(".")]).optional()
}

/// Registers the built-in node types.
pub fn register(registry: &mut Registry) {
    literals(registry);
    names(registry);
    expressions(registry);
    statements(registry);
}

fn literals(registry: &mut Registry) {
    registry
        .declare("StringLiteral", tok([TokenKind::StringLiteral]).named("value"))
        .declare("NumberLiteral", tok([TokenKind::NumberLiteral]).named("value"))
        .declare("HexLiteral", tok([TokenKind::HexLiteral]).named("value"))
        .declare("BitLiteral", tok([TokenKind::BitLiteral]).named("value"))
        .declare(
            "BooleanLiteral",
            alt([kw("TRUE"), kw("FALSE")]).named("value"),
        )
        .declare("NullLiteral", kw("NULL"))
        .declare("BindVariable", tok([TokenKind::BindVariable]).named("value"))
        .declare(
            "UserVariable",
            tok([TokenKind::Variable])
                .named("name")
                .dialect(Dialect::Mysql),
        );
}

fn names(registry: &mut Registry) {
    registry
        .declare("AllColumns", seq([qualifier(), op("*")]))
        .declare(
            "ColumnRef",
            seq([
                qualifier(),
                tok([TokenKind::Identifier, TokenKind::DataType]).named("name"),
            ]),
        )
        .declare(
            "TableRef",
            alt([
                seq([
                    seq([tok([TokenKind::Identifier]).named("schema"), punct(".")]).optional(),
                    tok([TokenKind::Identifier]).named("name"),
                    alias(),
                ]),
                seq([node(["Subquery"]).named("subquery"), alias()]),
            ]),
        )
        .declare(
            "DataTypeRef",
            seq([
                tok([TokenKind::DataType, TokenKind::Identifier]).named("name"),
                paren(node(["NumberLiteral"]).named("args").many(","))
                    .optional()
                    .tight(),
            ]),
        );
}

fn expressions(registry: &mut Registry) {
    registry
        .declare(
            "ParenExpr",
            paren(expression().named("expr")).optional_parens(),
        )
        .declare(
            "Tuple",
            paren(expression().named("items").arity(2, None).separator(",")),
        )
        .declare("Subquery", paren(node(["SelectStmt"]).named("query")))
        .declare(
            "ExistsExpr",
            seq([kw("EXISTS"), node(["Subquery"]).named("query")]),
        )
        .declare(
            "FunctionCall",
            seq([
                alt([
                    tok([TokenKind::Identifier, TokenKind::DataType]),
                    tok_values(TokenKind::Keyword, ["LEFT", "RIGHT"]),
                ])
                .named("name"),
                paren(seq([
                    kw("DISTINCT").named("distinct").optional(),
                    expression()
                        .named("args")
                        .arity(0, None)
                        .separator(","),
                ]))
                .tight(),
            ]),
        )
        .declare(
            "CastExpr",
            seq([
                kw("CAST"),
                paren(seq([
                    expression().named("expr"),
                    kw("AS"),
                    node(["DataTypeRef"]).named("data_type"),
                ]))
                .tight(),
            ]),
        )
        .declare(
            "NotExpr",
            seq([
                kw("NOT"),
                expression()
                    .named("operand")
                    .min_precedence(precedence::IS),
            ]),
        )
        .declare(
            "NegateExpr",
            seq([
                tok_values(TokenKind::Operator, ["-", "+", "~", "!"]).named("operator"),
                expression()
                    .named("operand")
                    .min_precedence(precedence::UNARY)
                    .tight(),
            ]),
        )
        .register(ClimbingNode::new(
            OPERANDS,
            BINARY,
            seq([
                expression().named("left"),
                tok([TokenKind::Operator, TokenKind::Keyword]).named("operator"),
                expression().named("right"),
            ]),
        ));
}

fn statements(registry: &mut Registry) {
    let clause = |keyword: &'static str, body: Rule| seq([kw(keyword), body.assert()]).optional().newline();

    registry
        .declare("SelectItem", seq([expression().named("expr"), alias()]))
        .declare(
            "OrderItem",
            seq([
                expression().named("expr"),
                alt([kw("ASC"), kw("DESC")]).named("direction").optional(),
            ]),
        )
        .declare(
            "SelectStmt",
            seq([
                kw("SELECT"),
                kw("DISTINCT").named("distinct").optional(),
                node(["SelectItem"]).named("columns").many(",").assert(),
                clause("FROM", node(["TableRef"]).named("from").many(",")),
                clause("WHERE", expression().named("where")),
                clause("GROUP BY", expression().named("group_by").many(",")),
                clause("HAVING", expression().named("having")),
                clause("ORDER BY", node(["OrderItem"]).named("order_by").many(",")),
                clause("LIMIT", node(["NumberLiteral", "BindVariable"]).named("limit")),
                clause("OFFSET", node(["NumberLiteral", "BindVariable"]).named("offset"))
                    .dialect(Dialect::Postgres),
                clause("OFFSET", node(["NumberLiteral", "BindVariable"]).named("offset"))
                    .dialect(Dialect::Mysql)
                    .when(Condition::Present("limit")),
            ]),
        )
        .declare(
            "Script",
            seq([
                node(STATEMENTS).named("statements").many(";").newline(),
                punct(";").named("terminator").optional(),
            ]),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, NodeId};
    use crate::error::Error;
    use crate::grammar::registry::default_registry;
    use crate::grammar::Parser;
    use crate::lexer::Tokenizer;

    fn parse(sql: &str, dialect: Dialect, tag: &str) -> Option<(Ast, NodeId)> {
        let stream = Tokenizer::new(sql, dialect).into_stream();
        let mut parser = Parser::new(default_registry(), dialect);
        let id = parser.parse_node(tag, &stream).unwrap()?;
        stream.is_exhausted().unwrap().then(|| (parser.into_ast(), id))
    }

    fn select(sql: &str) -> (Ast, NodeId) {
        parse(sql, Dialect::Postgres, "SelectStmt").unwrap()
    }

    #[test]
    fn test_select_clauses() {
        let (ast, id) = select(
            "SELECT DISTINCT a, b AS total FROM users u WHERE a > 1 \
             GROUP BY a HAVING count(*) > 2 ORDER BY a DESC, b LIMIT 10 OFFSET 5",
        );
        assert_eq!(
            ast[id].field_names(),
            vec!["distinct", "columns", "from", "where", "group_by", "having", "order_by", "limit", "offset"]
        );
        let columns = ast.children(id, "columns");
        assert_eq!(ast.terminal(columns[1], "alias").unwrap().value, "total");
        let from = ast.children(id, "from")[0];
        assert_eq!(ast.terminal(from, "alias").unwrap().value, "u");
        assert!(ast.terminal(from, "as_keyword").is_none());
        let order = ast.children(id, "order_by");
        assert_eq!(ast.terminal(order[0], "direction").unwrap().value, "DESC");
        assert!(ast.terminal(order[1], "direction").is_none());
    }

    #[test]
    fn test_qualified_names() {
        let (ast, id) = select("SELECT u.*, u.id FROM public.users AS u");
        let columns = ast.children(id, "columns");
        let all = ast.child(columns[0], "expr").unwrap();
        assert_eq!(ast[all].tag(), "AllColumns");
        assert_eq!(ast.terminal(all, "table").unwrap().value, "u");
        let column = ast.child(columns[1], "expr").unwrap();
        assert_eq!(ast[column].tag(), "ColumnRef");
        let table = ast.children(id, "from")[0];
        assert_eq!(ast.terminal(table, "schema").unwrap().value, "public");
        assert_eq!(ast.terminal(table, "as_keyword").unwrap().value, "AS");
    }

    #[test]
    fn test_operand_kinds() {
        let (ast, id) = select(
            "SELECT 'x', 1.5, X'FF', B'101', TRUE, NULL, $1, (a), (1, 2), (SELECT 1), \
             EXISTS (SELECT 1), CAST(a AS VARCHAR(10)), coalesce(a, 1), -a, NOT a",
        );
        let tags: Vec<&str> = ast
            .children(id, "columns")
            .iter()
            .map(|item| ast[ast.child(*item, "expr").unwrap()].tag())
            .collect();
        assert_eq!(
            tags,
            vec![
                "StringLiteral",
                "NumberLiteral",
                "HexLiteral",
                "BitLiteral",
                "BooleanLiteral",
                "NullLiteral",
                "BindVariable",
                "ParenExpr",
                "Tuple",
                "Subquery",
                "ExistsExpr",
                "CastExpr",
                "FunctionCall",
                "NegateExpr",
                "NotExpr",
            ]
        );
    }

    #[test]
    fn test_function_call_arguments() {
        let (ast, id) = select("SELECT count(DISTINCT id), now(), left(name, 3)");
        let calls: Vec<NodeId> = ast
            .children(id, "columns")
            .iter()
            .map(|item| ast.child(*item, "expr").unwrap())
            .collect();
        assert!(ast.terminal(calls[0], "distinct").is_some());
        assert!(ast.children(calls[1], "args").is_empty());
        assert_eq!(ast.terminal(calls[2], "name").unwrap().value, "LEFT");
        assert_eq!(ast.children(calls[2], "args").len(), 2);
    }

    #[test]
    fn test_in_list_and_null_checks() {
        let (ast, id) = select("SELECT a FROM t WHERE a IN (1, 2) AND b IS NOT NULL AND c NOT IN (SELECT d FROM e)");
        let and = ast.child(id, "where").unwrap();
        assert_eq!(ast.terminal(and, "operator").unwrap().value, "AND");
        let not_in = ast.child(and, "right").unwrap();
        assert_eq!(ast.terminal(not_in, "operator").unwrap().value, "NOT IN");
        assert_eq!(ast[ast.child(not_in, "right").unwrap()].tag(), "Subquery");
    }

    #[test]
    fn test_mysql_offset_requires_limit() {
        assert!(parse("SELECT a FROM t LIMIT 1 OFFSET 2", Dialect::Mysql, "SelectStmt").is_some());
        assert!(parse("SELECT a FROM t OFFSET 2", Dialect::Mysql, "SelectStmt").is_none());
        assert!(parse("SELECT a FROM t OFFSET 2", Dialect::Postgres, "SelectStmt").is_some());
    }

    #[test]
    fn test_user_variables_are_mysql_only() {
        assert!(parse("SELECT @total", Dialect::Mysql, "SelectStmt").is_some());
        let compiled = default_registry()
            .compiled("UserVariable", Dialect::Postgres)
            .unwrap();
        assert!(compiled.root.is_none());
    }

    #[test]
    fn test_missing_clause_body_is_asserted() {
        let stream = Tokenizer::new("SELECT a FROM t WHERE", Dialect::Postgres).into_stream();
        let mut parser = Parser::new(default_registry(), Dialect::Postgres);
        let err = parser.parse_node("SelectStmt", &stream).unwrap_err();
        let Error::Parse(err) = err else {
            panic!("expected a parse error, got {err:?}");
        };
        assert_eq!(err.node, Some("SelectStmt"));
        assert!(err.position.is_none());
    }

    #[test]
    fn test_script_statements() {
        let (ast, id) = parse("SELECT 1; SELECT 2;", Dialect::Postgres, "Script").unwrap();
        assert_eq!(ast.children(id, "statements").len(), 2);
        assert_eq!(ast.terminal(id, "terminator").unwrap().value, ";");
    }
}
