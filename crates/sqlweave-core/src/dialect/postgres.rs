//! PostgreSQL dialect.

use super::SqlDialect;

/// PostgreSQL lexical and rendering rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn identifier_quote(&self) -> char {
        '"'
    }

    fn backslash_escapes(&self) -> bool {
        false
    }

    fn dollar_quoting(&self) -> bool {
        true
    }

    fn nested_comments(&self) -> bool {
        true
    }

    fn bind_variable(&self, index: usize) -> String {
        format!("${index}")
    }

    /// Plain strings double the quote; strings holding control characters
    /// switch to the `E'...'` escape form.
    fn quote_string(&self, value: &str) -> String {
        if !value.chars().any(char::is_control) {
            return format!("'{}'", value.replace('\'', "''"));
        }
        let mut out = String::from("E'");
        for c in value.chars() {
            match c {
                '\'' => out.push_str("\\'"),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\u{8}' => out.push_str("\\b"),
                '\u{c}' => out.push_str("\\f"),
                c if c.is_control() => {
                    out.push_str(&format!("\\u{:04X}", c as u32));
                }
                c => out.push(c),
            }
        }
        out.push('\'');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_dialect() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.name(), "postgres");
        assert_eq!(dialect.identifier_quote(), '"');
        assert_eq!(dialect.bind_variable(3), "$3");
        assert!(dialect.numbered_binds());
        assert!(dialect.dollar_quoting());
        assert!(!dialect.backslash_escapes());
    }

    #[test]
    fn test_postgres_quote_string() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.quote_string("it's"), "'it''s'");
        assert_eq!(dialect.quote_string("a\\b"), "'a\\b'");
        assert_eq!(dialect.quote_string("line\nbreak"), "E'line\\nbreak'");
        assert_eq!(dialect.quote_string("bell\u{7}"), "E'bell\\u0007'");
        assert_eq!(dialect.quote_string("\u{1}'"), "E'\\u0001\\''");
    }

    #[test]
    fn test_postgres_literals() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.hex_literal("FF", Some("0x")), "X'FF'");
        assert_eq!(dialect.bit_literal("101", None), "B'101'");
    }
}
