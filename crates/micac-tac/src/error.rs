//! Error types for TAC generation and optimization.

use micac_util::Span;
use thiserror::Error;

/// Error type for TAC generation and optimization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TacError {
    /// Integer literal outside the 32-bit signed range
    #[error("integer constant out of 32-bit range: {text} ({span})")]
    IntegerOverflow { text: String, span: Span },

    /// Division by a constant zero discovered during folding
    #[error("division by zero in constant expression")]
    DivByZero,

    /// A node reached lowering without its semantic annotations
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for TAC operations.
pub type Result<T> = std::result::Result<T, TacError>;
