//! Token cursor.
//!
//! One-token lookahead over the token stream: `peek(0)` and `peek(1)` are
//! all the grammar ever needs (the identifier-vs-call ambiguity resolves
//! on the token after the identifier).

use micac_lex::{Token, TokenKind};

use crate::error::{ParseError, Result};

pub struct TokenCursor {
    tokens: Vec<Token>,
    position: usize,
}

impl TokenCursor {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Token at `offset` from the current position, if any.
    pub fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset)
    }

    /// Lexeme of the current token, or `""` past the end.
    pub fn peek_lexeme(&self) -> &str {
        self.peek(0).map_or("", |t| t.lexeme.as_str())
    }

    /// True when every token has been consumed.
    pub fn at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Consume the current token unconditionally.
    pub fn consume(&mut self, expected: &str) -> Result<Token> {
        let token = self
            .tokens
            .get(self.position)
            .cloned()
            .ok_or_else(|| ParseError::UnexpectedEof {
                expected: expected.to_string(),
            })?;
        self.position += 1;
        Ok(token)
    }

    /// Consume a token that must have this exact lexeme.
    pub fn consume_value(&mut self, value: &str) -> Result<Token> {
        let token = self.consume(&format!("'{value}'"))?;
        if token.lexeme != value {
            return Err(self.mismatch(&format!("'{value}'"), &token));
        }
        Ok(token)
    }

    /// Consume a token that must have this kind.
    pub fn consume_kind(&mut self, kind: TokenKind) -> Result<Token> {
        let token = self.consume(&kind.to_string())?;
        if token.kind != kind {
            return Err(self.mismatch(&kind.to_string(), &token));
        }
        Ok(token)
    }

    fn mismatch(&self, expected: &str, found: &Token) -> ParseError {
        ParseError::SyntaxError {
            expected: expected.to_string(),
            found: found.lexeme.clone(),
            line: found.line,
            column: found.column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use micac_lex::language_tokenizer;

    fn cursor(source: &str) -> TokenCursor {
        TokenCursor::new(language_tokenizer().unwrap().tokenize(source).unwrap())
    }

    #[test]
    fn test_peek_does_not_advance() {
        let c = cursor("var int x");
        assert_eq!(c.peek(0).unwrap().lexeme, "var");
        assert_eq!(c.peek(1).unwrap().lexeme, "int");
        assert_eq!(c.peek(0).unwrap().lexeme, "var");
    }

    #[test]
    fn test_consume_value_mismatch() {
        let mut c = cursor("var");
        let err = c.consume_value(";").unwrap_err();
        assert!(matches!(err, ParseError::SyntaxError { .. }));
    }

    #[test]
    fn test_consume_past_end() {
        let mut c = cursor("");
        assert!(matches!(
            c.consume_value(";"),
            Err(ParseError::UnexpectedEof { .. })
        ));
    }
}
