//! Token classification tables.
//!
//! Per-dialect keyword, data type, operator and compound (multi-word)
//! tables consulted by the scanner when it finalizes a token. Lookups take
//! uppercase words; callers normalize first.

use super::token::{Associativity, OperatorInfo, ResultKind, TokenKind};
use crate::dialect::Dialect;

/// Operator precedence levels. Higher binds tighter.
pub mod precedence {
    /// MySQL `:=`.
    pub const ASSIGN: u8 = 1;
    /// `OR` (and MySQL `||`).
    pub const OR: u8 = 2;
    /// MySQL `XOR`.
    pub const XOR: u8 = 3;
    /// `AND` (and MySQL `&&`).
    pub const AND: u8 = 4;
    /// Prefix `NOT`.
    pub const NOT: u8 = 5;
    /// `IS`, `IS NOT`, `IS [NOT] DISTINCT FROM`.
    pub const IS: u8 = 6;
    /// `=`, `<>`, `<`, ...
    pub const COMPARISON: u8 = 7;
    /// `LIKE`, `IN`, `SIMILAR TO`, `REGEXP`, ...
    pub const PATTERN: u8 = 8;
    /// Every other symbolic operator (`||`, `->`, `@>`, `|`, ...).
    pub const OTHER: u8 = 9;
    /// MySQL `&`.
    pub const BIT_AND: u8 = 10;
    /// MySQL `<<`, `>>`.
    pub const SHIFT: u8 = 11;
    /// `+`, `-`.
    pub const ADDITIVE: u8 = 12;
    /// `*`, `/`, `%`, `DIV`, `MOD`.
    pub const MULTIPLICATIVE: u8 = 13;
    /// Postgres `^`, MySQL bitwise `^`.
    pub const EXPONENT: u8 = 14;
    /// Prefix `-`, `+`, `~`, `!`, `@`.
    pub const UNARY: u8 = 15;
    /// Postgres `::`.
    pub const CAST: u8 = 16;
}

const fn binary(precedence: u8, result: ResultKind) -> OperatorInfo {
    OperatorInfo {
        precedence,
        associativity: Associativity::Left,
        result,
        binary: true,
        unary: false,
    }
}

const fn both(precedence: u8, result: ResultKind) -> OperatorInfo {
    OperatorInfo {
        precedence,
        associativity: Associativity::Left,
        result,
        binary: true,
        unary: true,
    }
}

const fn prefix(precedence: u8, result: ResultKind) -> OperatorInfo {
    OperatorInfo {
        precedence,
        associativity: Associativity::Right,
        result,
        binary: false,
        unary: true,
    }
}

/// Returns true if `word` is a reserved keyword in `dialect`.
#[must_use]
pub fn is_keyword(dialect: Dialect, word: &str) -> bool {
    let common = matches!(
        word,
        "ALL"
            | "AND"
            | "ANY"
            | "AS"
            | "ASC"
            | "BETWEEN"
            | "BY"
            | "CASE"
            | "CAST"
            | "CHECK"
            | "COLLATE"
            | "CONSTRAINT"
            | "CREATE"
            | "CROSS"
            | "DEFAULT"
            | "DELETE"
            | "DESC"
            | "DISTINCT"
            | "DROP"
            | "ELSE"
            | "END"
            | "EXCEPT"
            | "EXISTS"
            | "FALSE"
            | "FOR"
            | "FOREIGN"
            | "FROM"
            | "FULL"
            | "GROUP"
            | "HAVING"
            | "IN"
            | "INNER"
            | "INSERT"
            | "INTERSECT"
            | "INTO"
            | "IS"
            | "JOIN"
            | "LEFT"
            | "LIKE"
            | "LIMIT"
            | "NATURAL"
            | "NOT"
            | "NULL"
            | "OFFSET"
            | "ON"
            | "OR"
            | "ORDER"
            | "OUTER"
            | "PRIMARY"
            | "REFERENCES"
            | "RIGHT"
            | "SELECT"
            | "SET"
            | "SOME"
            | "TABLE"
            | "THEN"
            | "TRUE"
            | "UNION"
            | "UNIQUE"
            | "UPDATE"
            | "USING"
            | "VALUES"
            | "WHEN"
            | "WHERE"
            | "WITH"
    );
    common
        || match dialect {
            Dialect::Postgres => matches!(
                word,
                "ARRAY" | "ILIKE" | "LATERAL" | "RETURNING" | "SIMILAR" | "WINDOW"
            ),
            Dialect::Mysql => matches!(
                word,
                "DIV" | "MOD" | "XOR" | "REGEXP" | "RLIKE" | "IGNORE" | "REPLACE" | "STRAIGHT_JOIN"
            ),
        }
}

/// Returns true if `word` names a data type in `dialect`.
#[must_use]
pub fn is_data_type(dialect: Dialect, word: &str) -> bool {
    let common = matches!(
        word,
        "BIGINT"
            | "BOOLEAN"
            | "BOOL"
            | "CHAR"
            | "CHARACTER"
            | "DATE"
            | "DECIMAL"
            | "DOUBLE"
            | "FLOAT"
            | "INT"
            | "INTEGER"
            | "JSON"
            | "NUMERIC"
            | "REAL"
            | "SMALLINT"
            | "TEXT"
            | "TIME"
            | "TIMESTAMP"
            | "VARCHAR"
    );
    common
        || match dialect {
            Dialect::Postgres => matches!(
                word,
                "BIGSERIAL" | "BYTEA" | "INTERVAL" | "JSONB" | "SERIAL" | "UUID" | "TIMESTAMPTZ"
            ),
            Dialect::Mysql => matches!(
                word,
                "BINARY"
                    | "BLOB"
                    | "DATETIME"
                    | "ENUM"
                    | "LONGTEXT"
                    | "MEDIUMINT"
                    | "MEDIUMTEXT"
                    | "TINYINT"
                    | "VARBINARY"
            ),
        }
}

/// Returns true if `word` is the first keyword of a statement.
#[must_use]
pub fn is_statement_name(word: &str) -> bool {
    matches!(
        word,
        "ALTER"
            | "BEGIN"
            | "COMMIT"
            | "CREATE"
            | "DELETE"
            | "DROP"
            | "EXPLAIN"
            | "INSERT"
            | "ROLLBACK"
            | "SELECT"
            | "SET"
            | "SHOW"
            | "TRUNCATE"
            | "UPDATE"
            | "WITH"
    )
}

/// Symbolic operators of `dialect`, used for longest-match scanning.
#[must_use]
pub const fn symbol_operators(dialect: Dialect) -> &'static [&'static str] {
    match dialect {
        Dialect::Postgres => &[
            "+", "-", "*", "/", "%", "^", "=", "<>", "!=", "<", ">", "<=", ">=", "||", "->",
            "->>", "#>", "#>>", "@>", "<@", "&&", "~", "~*", "!~", "!~*", "|", "&", "#", "<<",
            ">>", "::", "@",
        ],
        Dialect::Mysql => &[
            "+", "-", "*", "/", "%", "^", "=", "<>", "!=", "<", ">", "<=", ">=", "<=>", "||",
            "&&", "|", "&", "<<", ">>", "~", "!", "->", "->>", ":=",
        ],
    }
}

/// Returns true if `c` can start or continue a symbolic operator.
#[must_use]
pub const fn is_operator_char(dialect: Dialect, c: char) -> bool {
    match dialect {
        Dialect::Postgres => matches!(
            c,
            '+' | '-' | '*' | '/' | '<' | '>' | '=' | '~' | '!' | '@' | '#' | '%' | '^' | '&'
                | '|' | ':'
        ),
        Dialect::Mysql => matches!(
            c,
            '+' | '-' | '*' | '/' | '<' | '>' | '=' | '~' | '!' | '%' | '^' | '&' | '|' | ':'
        ),
    }
}

/// Returns the operator classification of a symbol or keyword in `dialect`.
#[must_use]
pub fn operator(dialect: Dialect, symbol: &str) -> Option<OperatorInfo> {
    use precedence::*;
    use ResultKind::{Any, Boolean, Json, Numeric, Text};

    let common = match symbol {
        "OR" => Some(binary(OR, Boolean)),
        "AND" => Some(binary(AND, Boolean)),
        "NOT" => Some(prefix(NOT, Boolean)),
        "IS" | "IS NOT" => Some(binary(IS, Boolean)),
        "=" | "<>" | "!=" | "<" | ">" | "<=" | ">=" => Some(binary(COMPARISON, Boolean)),
        "LIKE" | "NOT LIKE" | "IN" | "NOT IN" => Some(binary(PATTERN, Boolean)),
        "+" | "-" => Some(both(ADDITIVE, Numeric)),
        "*" | "/" | "%" => Some(binary(MULTIPLICATIVE, Numeric)),
        _ => None,
    };
    if common.is_some() {
        return common;
    }
    match dialect {
        Dialect::Postgres => match symbol {
            "IS DISTINCT FROM" | "IS NOT DISTINCT FROM" => Some(binary(IS, Boolean)),
            "ILIKE" | "NOT ILIKE" | "SIMILAR TO" | "NOT SIMILAR TO" => {
                Some(binary(PATTERN, Boolean))
            }
            "||" => Some(binary(OTHER, Text)),
            "->" | "->>" | "#>" | "#>>" => Some(binary(OTHER, Json)),
            "@>" | "<@" | "&&" | "~*" | "!~" | "!~*" => Some(binary(OTHER, Boolean)),
            "~" => Some(both(OTHER, Any)),
            "|" | "&" | "#" | "<<" | ">>" => Some(binary(OTHER, Numeric)),
            "^" => Some(binary(EXPONENT, Numeric)),
            "@" => Some(prefix(UNARY, Numeric)),
            "::" => Some(binary(CAST, Any)),
            _ => None,
        },
        Dialect::Mysql => match symbol {
            ":=" => Some(OperatorInfo {
                associativity: Associativity::Right,
                ..binary(ASSIGN, Any)
            }),
            "||" => Some(binary(OR, Boolean)),
            "XOR" => Some(binary(XOR, Boolean)),
            "&&" => Some(binary(AND, Boolean)),
            "!" => Some(prefix(UNARY, Boolean)),
            "<=>" => Some(binary(COMPARISON, Boolean)),
            "REGEXP" | "RLIKE" | "NOT REGEXP" | "NOT RLIKE" => Some(binary(PATTERN, Boolean)),
            "|" => Some(binary(OTHER, Numeric)),
            "&" => Some(binary(BIT_AND, Numeric)),
            "<<" | ">>" => Some(binary(SHIFT, Numeric)),
            "DIV" | "MOD" => Some(binary(MULTIPLICATIVE, Numeric)),
            "^" => Some(binary(EXPONENT, Numeric)),
            "~" => Some(prefix(UNARY, Numeric)),
            "->" | "->>" => Some(binary(OTHER, Json)),
            _ => None,
        },
    }
}

/// Multi-word keywords, operators and data types of `dialect`.
#[must_use]
pub const fn compounds(dialect: Dialect) -> &'static [(&'static str, TokenKind)] {
    match dialect {
        Dialect::Postgres => &[
            ("GROUP BY", TokenKind::Keyword),
            ("ORDER BY", TokenKind::Keyword),
            ("PARTITION BY", TokenKind::Keyword),
            ("UNION ALL", TokenKind::Keyword),
            ("INNER JOIN", TokenKind::Keyword),
            ("LEFT JOIN", TokenKind::Keyword),
            ("LEFT OUTER JOIN", TokenKind::Keyword),
            ("RIGHT JOIN", TokenKind::Keyword),
            ("RIGHT OUTER JOIN", TokenKind::Keyword),
            ("FULL JOIN", TokenKind::Keyword),
            ("FULL OUTER JOIN", TokenKind::Keyword),
            ("CROSS JOIN", TokenKind::Keyword),
            ("NATURAL JOIN", TokenKind::Keyword),
            ("PRIMARY KEY", TokenKind::Keyword),
            ("FOREIGN KEY", TokenKind::Keyword),
            ("ON CONFLICT", TokenKind::Keyword),
            ("NOT BETWEEN", TokenKind::Keyword),
            ("IS NOT", TokenKind::Operator),
            ("IS DISTINCT FROM", TokenKind::Operator),
            ("IS NOT DISTINCT FROM", TokenKind::Operator),
            ("NOT LIKE", TokenKind::Operator),
            ("NOT ILIKE", TokenKind::Operator),
            ("NOT IN", TokenKind::Operator),
            ("SIMILAR TO", TokenKind::Operator),
            ("NOT SIMILAR TO", TokenKind::Operator),
            ("DOUBLE PRECISION", TokenKind::DataType),
            ("CHARACTER VARYING", TokenKind::DataType),
            ("TIMESTAMP WITH TIME ZONE", TokenKind::DataType),
            ("TIMESTAMP WITHOUT TIME ZONE", TokenKind::DataType),
            ("TIME WITH TIME ZONE", TokenKind::DataType),
        ],
        Dialect::Mysql => &[
            ("GROUP BY", TokenKind::Keyword),
            ("ORDER BY", TokenKind::Keyword),
            ("PARTITION BY", TokenKind::Keyword),
            ("UNION ALL", TokenKind::Keyword),
            ("INNER JOIN", TokenKind::Keyword),
            ("LEFT JOIN", TokenKind::Keyword),
            ("LEFT OUTER JOIN", TokenKind::Keyword),
            ("RIGHT JOIN", TokenKind::Keyword),
            ("RIGHT OUTER JOIN", TokenKind::Keyword),
            ("CROSS JOIN", TokenKind::Keyword),
            ("NATURAL JOIN", TokenKind::Keyword),
            ("PRIMARY KEY", TokenKind::Keyword),
            ("FOREIGN KEY", TokenKind::Keyword),
            ("ON DUPLICATE KEY UPDATE", TokenKind::Keyword),
            ("NOT BETWEEN", TokenKind::Keyword),
            ("IS NOT", TokenKind::Operator),
            ("NOT LIKE", TokenKind::Operator),
            ("NOT IN", TokenKind::Operator),
            ("NOT REGEXP", TokenKind::Operator),
            ("NOT RLIKE", TokenKind::Operator),
            ("DOUBLE PRECISION", TokenKind::DataType),
        ],
    }
}

/// Result of looking a word sequence up in the compound table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompoundMatch {
    /// Kind of the compound if the phrase is complete.
    pub complete: Option<TokenKind>,
    /// Whether some longer compound starts with the phrase.
    pub prefix: bool,
}

/// Looks up an uppercase, single-space separated phrase.
#[must_use]
pub fn compound(dialect: Dialect, phrase: &str) -> CompoundMatch {
    let mut result = CompoundMatch::default();
    for (words, kind) in compounds(dialect) {
        if *words == phrase {
            result.complete = Some(*kind);
        } else if words.len() > phrase.len()
            && words.starts_with(phrase)
            && words.as_bytes()[phrase.len()] == b' '
        {
            result.prefix = true;
        }
    }
    result
}

/// Classifies a bare word: keyword, data type or identifier.
#[must_use]
pub fn classify_word(dialect: Dialect, upper: &str) -> TokenKind {
    if is_keyword(dialect, upper) {
        TokenKind::Keyword
    } else if is_data_type(dialect, upper) {
        TokenKind::DataType
    } else {
        TokenKind::Identifier
    }
}
