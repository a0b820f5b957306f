//! A cursor over lexed tokens.
//!
//! [`TokenStream`] exposes the small set of operations tag parsers are
//! written against: looking at the current token, peeking one ahead, and
//! conditionally or unconditionally consuming. Every `expect_*` failure is a
//! `TemplateSyntaxError` carrying the offending token's line.

use jdj_core::error::{JdjError, JdjResult};

use crate::lexer::{describe_kind, Operator, Token, TokenKind};

/// A forward-only cursor over a token list terminated by [`TokenKind::Eof`].
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    /// Wraps a token list. An `Eof` token is appended if missing.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
            let lineno = tokens.last().map_or(1, |t| t.lineno);
            tokens.push(Token::new(TokenKind::Eof, lineno));
        }
        Self { tokens, pos: 0 }
    }

    /// The token under the cursor.
    pub fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// The token after the current one (`Eof` at the end).
    pub fn look(&self) -> &Token {
        let idx = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// Returns `true` once the cursor sits on `Eof`.
    pub fn is_eof(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    /// Returns the current token and advances. Stays on `Eof`.
    pub fn next_token(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Consumes the current token if it is the name `value`.
    pub fn next_if_name(&mut self, value: &str) -> Option<Token> {
        self.current().is_name(value).then(|| self.next_token())
    }

    /// Consumes the current token if it is any name.
    pub fn next_if_any_name(&mut self) -> Option<Token> {
        matches!(self.current().kind, TokenKind::Name(_)).then(|| self.next_token())
    }

    /// Consumes the current token if it is the operator `op`.
    pub fn next_if_operator(&mut self, op: Operator) -> Option<Token> {
        self.current().is_operator(op).then(|| self.next_token())
    }

    /// Like [`next_if_name`](Self::next_if_name) but only reports success.
    pub fn skip_if_name(&mut self, value: &str) -> bool {
        self.next_if_name(value).is_some()
    }

    /// Like [`next_if_operator`](Self::next_if_operator) but only reports success.
    pub fn skip_if_operator(&mut self, op: Operator) -> bool {
        self.next_if_operator(op).is_some()
    }

    /// Consumes the name `value` or fails.
    pub fn expect_name(&mut self, value: &str) -> JdjResult<Token> {
        self.next_if_name(value)
            .ok_or_else(|| self.unexpected(&format!("'{value}'")))
    }

    /// Consumes any name and returns its text, or fails.
    pub fn expect_any_name(&mut self) -> JdjResult<(String, usize)> {
        if let TokenKind::Name(name) = &self.current().kind {
            let name = name.clone();
            let lineno = self.next_token().lineno;
            return Ok((name, lineno));
        }
        Err(self.unexpected("name"))
    }

    /// Consumes a string literal and returns its value, or fails.
    pub fn expect_string(&mut self) -> JdjResult<(String, usize)> {
        if let TokenKind::String(value) = &self.current().kind {
            let value = value.clone();
            let lineno = self.next_token().lineno;
            return Ok((value, lineno));
        }
        Err(self.unexpected("string"))
    }

    /// Consumes the operator `op` or fails.
    pub fn expect_operator(&mut self, op: Operator) -> JdjResult<Token> {
        self.next_if_operator(op)
            .ok_or_else(|| self.unexpected(&format!("'{}'", op.as_str())))
    }

    /// Consumes a payload-free token of the given kind (`BlockEnd`,
    /// `VariableEnd`, ...) or fails.
    pub fn expect_kind(&mut self, kind: &TokenKind) -> JdjResult<Token> {
        if &self.current().kind == kind {
            return Ok(self.next_token());
        }
        Err(self.unexpected(describe_kind(kind)))
    }

    /// Builds the standard "expected X, got Y" error for the current token.
    pub fn unexpected(&self, expected: &str) -> JdjError {
        let token = self.current();
        let message = if token.kind == TokenKind::Eof {
            format!("unexpected end of template, expected {expected}")
        } else {
            format!("expected token {expected}, got '{}'", token.describe())
        };
        JdjError::syntax(message, token.lineno)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn stream(source: &str) -> TokenStream {
        TokenStream::new(tokenize(source).unwrap())
    }

    #[test]
    fn test_current_and_look() {
        let s = stream("{% url 'a' %}");
        assert_eq!(s.current().kind, TokenKind::BlockBegin);
        assert!(s.look().is_name("url"));
    }

    #[test]
    fn test_next_token_stops_at_eof() {
        let mut s = stream("x");
        s.next_token();
        assert!(s.is_eof());
        s.next_token();
        assert!(s.is_eof());
    }

    #[test]
    fn test_conditional_consumption() {
        let mut s = stream("{% as x = 1 %}");
        s.next_token();
        assert!(!s.skip_if_name("with"));
        assert!(s.skip_if_name("as"));
        assert_eq!(s.expect_any_name().unwrap().0, "x");
        assert!(s.skip_if_operator(Operator::Assign));
        assert_eq!(s.current().kind, TokenKind::Integer(1));
    }

    #[test]
    fn test_expect_string() {
        let mut s = stream("{% 'hello' %}");
        s.next_token();
        assert_eq!(s.expect_string().unwrap().0, "hello");
        assert!(s.expect_kind(&TokenKind::BlockEnd).is_ok());
    }

    #[test]
    fn test_expect_failure_message() {
        let mut s = stream("{% 42 %}");
        s.next_token();
        let err = s.expect_any_name().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Template syntax error (line 1): expected token name, got 'integer'"
        );
    }

    #[test]
    fn test_expect_at_eof() {
        let mut s = stream("");
        let err = s.expect_kind(&TokenKind::BlockEnd).unwrap_err();
        assert!(err
            .to_string()
            .contains("unexpected end of template, expected end of statement block"));
    }

    #[test]
    fn test_missing_eof_is_appended() {
        let s = TokenStream::new(vec![]);
        assert!(s.is_eof());
    }
}
