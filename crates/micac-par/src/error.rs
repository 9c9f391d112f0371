//! Error types for parsing.

use thiserror::Error;

/// Error type for syntax errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The current token did not match what the grammar requires
    #[error("expected {expected} but found '{found}' at row {line}, column {column}")]
    SyntaxError {
        expected: String,
        found: String,
        line: u32,
        column: u32,
    },

    /// Input ended while a production was still open
    #[error("expected {expected} but found end of input")]
    UnexpectedEof { expected: String },
}

/// Result type alias for parsing.
pub type Result<T> = std::result::Result<T, ParseError>;
