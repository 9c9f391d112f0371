//! Error types for x86 code generation.

use thiserror::Error;

/// Error type for backend failures.
///
/// Anything that goes wrong past TAC generation is a compiler bug, not a
/// user error, so the variants here describe broken invariants.
#[derive(Debug, Error)]
pub enum GenError {
    /// Broken backend invariant - indicates a bug
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for code generation.
pub type Result<T> = std::result::Result<T, GenError>;
