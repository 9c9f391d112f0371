//! Error types for semantic analysis.

use micac_util::Span;
use thiserror::Error;

/// Error type for semantic analysis failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemError {
    /// Name already bound in the same scope
    #[error("'{name}' already defined in this scope ({span})")]
    Redefined { name: String, span: Span },

    /// Name not bound anywhere on the scope chain
    #[error("'{name}' is not defined ({span})")]
    Undefined { name: String, span: Span },

    /// Operand, assignment, condition, argument, or return type violation
    #[error("type error: {detail} ({span})")]
    TypeMismatch { detail: String, span: Span },

    /// Call with the wrong number of arguments
    #[error("function '{name}' expects {expected} arguments, got {found} ({span})")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    /// Function definition outside the global scope
    #[error("nested functions are not allowed; '{name}' must be defined at the top level ({span})")]
    NestedFunction { name: String, span: Span },

    /// `return` at top level
    #[error("'return' outside of a function ({span})")]
    ReturnOutsideFunction { span: Span },
}

/// Result type alias for semantic analysis.
pub type Result<T> = std::result::Result<T, SemError>;
