//! Error types for regex compilation.

use thiserror::Error;

/// Error type for malformed regex patterns.
///
/// All variants are construction-time failures; matching itself cannot
/// fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegexError {
    /// Escape sequence outside the supported set
    #[error("malformed regex: unknown escape sequence '\\{0}'")]
    UnknownEscape(char),

    /// Unclosed group or character class
    #[error("malformed regex: unmatched '{0}'")]
    Unmatched(char),

    /// Character range with no start, or running backwards
    #[error("malformed regex: invalid character range")]
    InvalidRange,

    /// Pattern ended in the middle of a construct
    #[error("malformed regex: unexpected end of pattern")]
    UnexpectedEnd,

    /// Leftover input after a complete regex, e.g. a stray ')'
    #[error("malformed regex: unexpected '{0}'")]
    UnexpectedChar(char),
}

/// Result type alias for regex compilation.
pub type Result<T> = std::result::Result<T, RegexError>;
