//! Driver-level error aggregation.

use std::path::PathBuf;

use micac_gen::{GenError, ToolError};
use micac_lex::LexError;
use micac_par::ParseError;
use micac_sem::SemError;
use micac_tac::TacError;
use thiserror::Error;

/// Any failure the pipeline or its orchestration can produce.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Sem(#[from] SemError),

    #[error(transparent)]
    Tac(#[from] TacError),

    #[error(transparent)]
    Gen(#[from] GenError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("cannot access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("input file '{}' is empty", path.display())]
    EmptyInput { path: PathBuf },
}

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, CompileError>;
