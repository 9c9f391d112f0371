//! Error types for tokenization.

use micac_regex::RegexError;
use thiserror::Error;

/// Error type for tokenization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// No pattern matched at the current position
    #[error("invalid character '{ch}' at row {line}, column {column}")]
    InvalidCharacter { ch: char, line: u32, column: u32 },

    /// A configured pattern failed to compile
    #[error(transparent)]
    Regex(#[from] RegexError),
}

/// Result type alias for tokenization.
pub type Result<T> = std::result::Result<T, LexError>;
