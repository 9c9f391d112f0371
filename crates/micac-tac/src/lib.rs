//! micac-tac - Three-Address Code
//!
//! The compiler's IR: typed operands (`Const`, `Var`, `Temp`), one
//! instruction variant per opcode, lowering from the annotated AST, and
//! the block-local optimizer (constant folding and constant propagation
//! run to a fixed point per block).

pub mod error;
pub mod lower;
pub mod opt;
pub mod tac;

pub use error::TacError;
pub use lower::{generate, TacGenerator};
pub use opt::{leaders, optimize};
pub use tac::{BinOp, Const, Instr, Label, Operand, TacProgram, Temp, Var};
