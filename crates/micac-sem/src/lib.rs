//! micac-sem - Semantic Analysis
//!
//! Builds the scope tree, hoists function signatures, checks types, and
//! annotates the AST in place with `ty`, `storage`, and `scope_id`. This
//! is the only phase that writes into the AST; everything downstream
//! reads the annotations it leaves behind.

pub mod analysis;
pub mod error;
pub mod scope;

pub use analysis::{analyze, SemanticAnalyzer};
pub use error::SemError;
pub use scope::{ParamSig, ScopeId, ScopeTree, SymbolKind};
