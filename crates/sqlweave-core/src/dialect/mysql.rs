//! MySQL dialect.

use super::SqlDialect;

/// MySQL lexical and rendering rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SqlDialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn identifier_quote(&self) -> char {
        '`'
    }

    fn backslash_escapes(&self) -> bool {
        true
    }

    fn bind_variable(&self, _index: usize) -> String {
        String::from("?")
    }

    fn numbered_binds(&self) -> bool {
        false
    }

    fn hex_literal(&self, digits: &str, modifier: Option<&str>) -> String {
        if modifier == Some("0x") {
            format!("0x{digits}")
        } else {
            format!("X'{digits}'")
        }
    }

    fn bit_literal(&self, digits: &str, modifier: Option<&str>) -> String {
        if modifier == Some("0b") {
            format!("0b{digits}")
        } else {
            format!("B'{digits}'")
        }
    }

    fn quote_string(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for c in value.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                '\0' => out.push_str("\\0"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\u{8}' => out.push_str("\\b"),
                '\u{1a}' => out.push_str("\\Z"),
                c => out.push(c),
            }
        }
        out.push('\'');
        out
    }
}
