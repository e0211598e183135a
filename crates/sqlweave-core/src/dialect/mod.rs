//! SQL Dialect support.
//!
//! PostgreSQL and MySQL disagree on quoting, escaping, bind variable
//! notation and literal syntax. [`Dialect`] is the value threaded through
//! every tokenizer, parser and serializer call; [`SqlDialect`] carries the
//! rendering behavior for each variant.

mod mysql;
mod postgres;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;

/// The supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL.
    Postgres,
    /// MySQL.
    Mysql,
}

impl Dialect {
    /// Every supported dialect.
    pub const ALL: [Self; 2] = [Self::Postgres, Self::Mysql];

    /// Returns the lowercase dialect name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
        }
    }

    /// Returns the rendering rules for this dialect.
    #[must_use]
    pub fn rules(self) -> &'static dyn SqlDialect {
        match self {
            Self::Postgres => &PostgresDialect,
            Self::Mysql => &MysqlDialect,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" => Ok(Self::Mysql),
            other => Err(format!("unknown dialect '{other}' (expected postgres or mysql)")),
        }
    }
}

/// Trait for SQL dialect-specific lexical and rendering behavior.
pub trait SqlDialect: Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn identifier_quote(&self) -> char;

    /// Returns whether backslash escapes are active in plain string literals.
    fn backslash_escapes(&self) -> bool;

    /// Returns whether `$tag$ ... $tag$` strings are recognized.
    fn dollar_quoting(&self) -> bool {
        false
    }

    /// Returns whether `/* */` comments nest.
    fn nested_comments(&self) -> bool {
        false
    }

    /// Renders the `index`-th (1-based) bind variable.
    fn bind_variable(&self, index: usize) -> String;

    /// Returns whether rendered bind variables carry their number. When they
    /// do not, binds are matched to parameters by position.
    fn numbered_binds(&self) -> bool {
        true
    }

    /// Renders a hexadecimal literal. `modifier` is the notation the literal
    /// was written in (`X` or `0x`).
    fn hex_literal(&self, digits: &str, modifier: Option<&str>) -> String {
        let _ = modifier;
        format!("X'{digits}'")
    }

    /// Renders a bit-string literal. `modifier` is the notation the literal
    /// was written in (`B` or `0b`).
    fn bit_literal(&self, digits: &str, modifier: Option<&str>) -> String {
        let _ = modifier;
        format!("B'{digits}'")
    }

    /// Renders a string literal with the dialect's escaping rules.
    fn quote_string(&self, value: &str) -> String;

    /// Quotes an identifier, doubling any embedded quote character.
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        let doubled: String = [quote, quote].iter().collect();
        format!("{quote}{}{quote}", name.replace(quote, &doubled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("postgres".parse::<Dialect>(), Ok(Dialect::Postgres));
        assert_eq!("PostgreSQL".parse::<Dialect>(), Ok(Dialect::Postgres));
        assert_eq!("mysql".parse::<Dialect>(), Ok(Dialect::Mysql));
        assert!("sqlite".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_dialect_serde_name() {
        let json = serde_json::to_string(&Dialect::Mysql).unwrap();
        assert_eq!(json, "\"mysql\"");
    }

    #[test]
    fn test_quote_identifier_doubles_quote() {
        assert_eq!(Dialect::Postgres.rules().quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(Dialect::Mysql.rules().quote_identifier("a`b"), "`a``b`");
    }
}
