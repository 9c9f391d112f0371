//! Token pattern table for the source language.

use crate::error::Result;
use crate::token::TokenKind;
use crate::tokenizer::Tokenizer;

/// Build the tokenizer configured for the source language.
///
/// Priorities: BOOLEAN and SIGNED_NUMBER outrank everything (6), keywords
/// and type names outrank identifiers (5 vs 4), bare numbers sit below
/// identifiers (3), and the punctuation classes bring up the rear. A
/// keyword prefix of a longer identifier still lexes as the identifier
/// because length wins before priority.
pub fn language_tokenizer() -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::new();

    tokenizer.add_skip_pattern("( |\t|\n)+")?;

    tokenizer.add_pattern(TokenKind::Keyword, "(while|print|var|if|do|return)", 5)?;
    tokenizer.add_pattern(TokenKind::Type, "(int|bool)", 5)?;
    tokenizer.add_pattern(TokenKind::Boolean, "(true|false)", 6)?;
    tokenizer.add_pattern(TokenKind::Identifier, "[A-Za-z][A-Za-z0-9_]*", 4)?;
    tokenizer.add_pattern(TokenKind::SignedNumber, "-[0-9]+", 6)?;
    tokenizer.add_pattern(TokenKind::Number, "[0-9]+", 3)?;
    tokenizer.add_pattern(TokenKind::Symbol, "(;|\\(|\\)|=|}|{|,)", 2)?;
    tokenizer.add_pattern(TokenKind::Operator, "(\\+|-|\\*|/)", 1)?;
    tokenizer.add_pattern(TokenKind::ConditionalOperator, "(<|>|==|<=|>=|!=)", 1)?;
    tokenizer.add_pattern(TokenKind::LogicalOperator, "(&|\\|)", 1)?;

    Ok(tokenizer)
}
