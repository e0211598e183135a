//! Source location tracking for tokens, AST terminals and diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A line/column position in the source text. Both are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number.
    pub line: u32,
    /// Column number, counted in characters.
    pub column: u32,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Returns the position after consuming `c`.
    #[must_use]
    pub const fn advance(self, c: char) -> Self {
        if c == '\n' {
            Self::new(self.line + 1, 1)
        } else {
            Self::new(self.line, self.column + 1)
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_default() {
        assert_eq!(Position::default(), Position::new(1, 1));
    }

    #[test]
    fn test_position_advance() {
        let pos = Position::default().advance('a').advance('b');
        assert_eq!(pos, Position::new(1, 3));
        let pos = pos.advance('\n');
        assert_eq!(pos, Position::new(2, 1));
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new(3, 7).to_string(), "line 3, column 7");
    }

    #[test]
    fn test_position_ordering() {
        assert!(Position::new(1, 9) < Position::new(2, 1));
        assert!(Position::new(2, 1) < Position::new(2, 2));
    }
}
