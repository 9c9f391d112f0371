//! micac-lex - Tokenizer
//!
//! Pattern-driven tokenization. The tokenizer owns an ordered list of
//! skip patterns (matched but never emitted) and a priority-sorted list
//! of token patterns; at each position the longest match across all
//! patterns wins, with ties broken toward higher declared priority.
//!
//! [`language_tokenizer`] builds the tokenizer configured for the source
//! language.

pub mod error;
pub mod language;
pub mod token;
pub mod tokenizer;

pub use error::LexError;
pub use language::language_tokenizer;
pub use token::{Token, TokenKind};
pub use tokenizer::Tokenizer;
