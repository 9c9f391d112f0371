//! micac-util - Core Utilities and Foundation Types
//!
//! Foundation types shared by every compiler phase:
//!
//! - [`Span`] - source coordinates carried by tokens, AST nodes, and errors
//! - [`Symbol`] - interned identifier strings with O(1) comparison
//! - [`Idx`] / [`IndexVec`] - typed indices over arenas (scope tree, NFA
//!   states), preventing accidental mixing of different ID spaces

pub mod index_vec;
pub mod span;
pub mod symbol;

pub use index_vec::{Idx, IndexVec};
pub use span::Span;
pub use symbol::Symbol;
