//! Pattern-driven tokenizer.
//!
//! The matcher keeps its patterns sorted by descending priority. A scan
//! step probes every pattern with `find_longest_match` and keeps the
//! strictly longest match, so equal-length candidates resolve to the
//! pattern declared with the higher priority (first in the sorted list).

use micac_regex::RegexEngine;

use crate::error::{LexError, Result};
use crate::token::{Token, TokenKind};

struct TokenPattern {
    kind: TokenKind,
    priority: i32,
    engine: RegexEngine,
}

/// Priority-ordered set of token patterns.
pub struct TokenMatcher {
    patterns: Vec<TokenPattern>,
}

impl TokenMatcher {
    fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    fn add_pattern(&mut self, kind: TokenKind, regex: &str, priority: i32) -> Result<()> {
        let engine = RegexEngine::new(regex)?;
        self.patterns.push(TokenPattern {
            kind,
            priority,
            engine,
        });
        // Stable sort: equal priorities keep declaration order.
        self.patterns.sort_by_key(|p| -p.priority);
        Ok(())
    }

    /// Longest match over all patterns; priority breaks length ties.
    fn matches(&self, text: &str) -> Option<(TokenKind, usize)> {
        let mut best: Option<(TokenKind, usize)> = None;
        for pattern in &self.patterns {
            if let Some(len) = pattern.engine.find_longest_match(text) {
                if best.map_or(true, |(_, best_len)| len > best_len) {
                    best = Some((pattern.kind, len));
                }
            }
        }
        best
    }
}

/// Tokenizer: skip patterns plus a [`TokenMatcher`], with row/column
/// bookkeeping.
pub struct Tokenizer {
    matcher: TokenMatcher,
    skip_patterns: Vec<RegexEngine>,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            matcher: TokenMatcher::new(),
            skip_patterns: Vec::new(),
        }
    }

    /// Register a token pattern.
    pub fn add_pattern(&mut self, kind: TokenKind, regex: &str, priority: i32) -> Result<()> {
        self.matcher.add_pattern(kind, regex, priority)
    }

    /// Register a pattern that is consumed but never emitted.
    pub fn add_skip_pattern(&mut self, regex: &str) -> Result<()> {
        self.skip_patterns.push(RegexEngine::new(regex)?);
        Ok(())
    }

    /// Tokenize the whole input.
    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut pos = 0;
        let mut line: u32 = 1;
        let mut column: u32 = 1;

        while pos < input.len() {
            let rest = &input[pos..];

            let mut skipped = false;
            for skip in &self.skip_patterns {
                if let Some(len) = skip.find_longest_match(rest) {
                    for ch in rest[..len].chars() {
                        match ch {
                            '\n' => {
                                line += 1;
                                column = 1;
                            }
                            '\t' => column += 4,
                            _ => column += 1,
                        }
                    }
                    pos += len;
                    skipped = true;
                    break;
                }
            }
            if skipped {
                continue;
            }

            match self.matcher.matches(rest) {
                Some((kind, len)) => {
                    let lexeme = &rest[..len];
                    tokens.push(Token {
                        kind,
                        lexeme: lexeme.to_string(),
                        line,
                        column,
                    });
                    column += lexeme.chars().count() as u32;
                    pos += len;
                }
                None => {
                    let ch = rest.chars().next().unwrap_or('\0');
                    return Err(LexError::InvalidCharacter { ch, line, column });
                }
            }
        }

        Ok(tokens)
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_tokenizer() -> Tokenizer {
        let mut t = Tokenizer::new();
        t.add_skip_pattern("( |\t|\n)+").unwrap();
        t.add_pattern(TokenKind::Identifier, "[a-z]+", 4).unwrap();
        t.add_pattern(TokenKind::Number, "[0-9]+", 3).unwrap();
        t.add_pattern(TokenKind::Symbol, "(;|=)", 2).unwrap();
        t
    }

    #[test]
    fn test_basic_stream() {
        let tokens = simple_tokenizer().tokenize("abc = 42;").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Symbol,
                TokenKind::Number,
                TokenKind::Symbol,
            ]
        );
        assert_eq!(tokens[0].lexeme, "abc");
        assert_eq!(tokens[2].lexeme, "42");
    }

    #[test]
    fn test_row_column_tracking() {
        let tokens = simple_tokenizer().tokenize("ab\n\tcd").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        // Tab advances the column by 4.
        assert_eq!((tokens[1].line, tokens[1].column), (2, 5));
    }

    #[test]
    fn test_invalid_character() {
        let err = simple_tokenizer().tokenize("ab $").unwrap_err();
        assert_eq!(
            err,
            LexError::InvalidCharacter {
                ch: '$',
                line: 1,
                column: 4
            }
        );
    }

    #[test]
    fn test_priority_breaks_ties() {
        let mut t = Tokenizer::new();
        t.add_pattern(TokenKind::Identifier, "[a-z]+", 1).unwrap();
        t.add_pattern(TokenKind::Keyword, "var", 5).unwrap();
        let tokens = t.tokenize("var").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
    }

    #[test]
    fn test_longest_match_beats_priority() {
        let mut t = Tokenizer::new();
        t.add_pattern(TokenKind::Keyword, "var", 5).unwrap();
        t.add_pattern(TokenKind::Identifier, "[a-z]+", 1).unwrap();
        let tokens = t.tokenize("variable").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "variable");
    }
}
