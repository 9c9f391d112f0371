//! micac-regex - Regex Engine for Tokenizer Patterns
//!
//! A small regex engine backing the tokenizer: patterns are parsed into an
//! AST, compiled to an NFA with ε-transitions via Thompson construction,
//! and executed by subset simulation. The only query the tokenizer needs
//! is the longest accepting prefix of the remaining input.
//!
//! Supported surface: concatenation, `|`, `*`, `+`, `?`, grouping
//! `(...)`, character classes `[a-z0-9]` with ranges, and the escapes
//! `\( \) \\ \+ \* \? \| \[ \]`.

pub mod error;
pub mod nfa;
pub mod parser;

pub use error::RegexError;
pub use nfa::{Nfa, RegexEngine};
pub use parser::{parse, RegexAst};
