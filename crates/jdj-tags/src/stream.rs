//! The tag lexer adapter.
//!
//! [`TagStream`] wraps the host parser while one tag is being parsed. It is
//! opened on the tag name and offers the few operations every tag grammar is
//! written in: keyword checks, expressions, values, identifiers, string
//! literals and the end-of-tag check. All failures are
//! `TemplateSyntaxError`s pointing at the offending token.

use jdj_core::error::{JdjError, JdjResult};
use jdj_template::expr::Expr;
use jdj_template::lexer::{Operator, Token, TokenKind};
use jdj_template::stream::TokenStream;
use jdj_template::Parser;

/// Cursor over the tokens of one tag, positioned after the tag name.
pub struct TagStream<'p, 'env> {
    parser: &'p mut Parser<'env>,
    tag: String,
    lineno: usize,
}

impl<'p, 'env> TagStream<'p, 'env> {
    /// Consumes the tag name under the cursor and opens the tag.
    ///
    /// # Errors
    ///
    /// Fails if the current token is not a name.
    pub fn open(parser: &'p mut Parser<'env>) -> JdjResult<Self> {
        let (tag, lineno) = parser.stream().expect_any_name()?;
        Ok(Self {
            parser,
            tag,
            lineno,
        })
    }

    /// The tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Line of the tag name.
    pub const fn lineno(&self) -> usize {
        self.lineno
    }

    /// The token under the cursor.
    pub fn current(&self) -> &Token {
        self.parser.stream_ref().current()
    }

    /// The token after the current one.
    pub fn look(&self) -> &Token {
        self.parser.stream_ref().look()
    }

    /// Raw access to the host token stream.
    pub fn stream(&mut self) -> &mut TokenStream {
        self.parser.stream()
    }

    /// Returns the keyword from `keywords` the cursor sits on, without
    /// consuming it.
    pub fn peek_keyword(&self, keywords: &[&'static str]) -> Option<&'static str> {
        let current = self.current();
        keywords.iter().copied().find(|kw| current.is_name(kw))
    }

    /// Consumes and returns the keyword from `keywords` the cursor sits on.
    pub fn take_keyword(&mut self, keywords: &[&'static str]) -> Option<&'static str> {
        let keyword = self.peek_keyword(keywords)?;
        self.stream().next_token();
        Some(keyword)
    }

    /// Parses a host expression.
    ///
    /// # Errors
    ///
    /// Propagates the host parser's syntax errors.
    pub fn consume_expression(&mut self) -> JdjResult<Expr> {
        self.parser.parse_expression()
    }

    /// Parses one argument value: a string literal is taken on its own,
    /// anything else is parsed as an expression.
    ///
    /// The host parser joins adjacent string literals into one constant, so
    /// `'a' 'b'` would otherwise become a single argument.
    ///
    /// # Errors
    ///
    /// Propagates the host parser's syntax errors.
    pub fn consume_value(&mut self) -> JdjResult<Expr> {
        if let TokenKind::String(value) = &self.current().kind {
            let value = value.clone();
            self.stream().next_token();
            return Ok(Expr::constant(value));
        }
        self.consume_expression()
    }

    /// Consumes a name and returns it.
    ///
    /// # Errors
    ///
    /// Fails if the cursor is not on a name.
    pub fn consume_identifier(&mut self) -> JdjResult<String> {
        self.stream().expect_any_name().map(|(name, _)| name)
    }

    /// Consumes a string literal and returns its value.
    ///
    /// # Errors
    ///
    /// Fails if the cursor is not on a string literal.
    pub fn consume_string(&mut self) -> JdjResult<String> {
        self.stream().expect_string().map(|(value, _)| value)
    }

    /// Consumes `=`.
    ///
    /// # Errors
    ///
    /// Fails if the cursor is not on `=`.
    pub fn expect_assign(&mut self) -> JdjResult<()> {
        self.stream().expect_operator(Operator::Assign).map(drop)
    }

    /// Returns `true` if the cursor sits on a name followed by `=`.
    pub fn at_assignment(&self) -> bool {
        matches!(self.current().kind, TokenKind::Name(_)) && self.look().is_operator(Operator::Assign)
    }

    /// Returns `true` if the cursor sits on the closing `%}`.
    pub fn at_end(&self) -> bool {
        self.current().kind == TokenKind::BlockEnd
    }

    /// Checks that nothing but the closing `%}` remains. The delimiter itself
    /// is left for the host parser.
    ///
    /// # Errors
    ///
    /// Fails if another token precedes the closing delimiter.
    pub fn expect_end_of_tag(&self) -> JdjResult<()> {
        if self.at_end() {
            return Ok(());
        }
        Err(self
            .parser
            .stream_ref()
            .unexpected("end of statement block"))
    }

    /// Builds a syntax error at `lineno`, or at the current token's line.
    pub fn fail(&self, message: impl Into<String>, lineno: Option<usize>) -> JdjError {
        self.parser.fail(message, lineno)
    }

    /// Builds the error for a word that is none of `keywords`.
    pub fn unexpected_keyword(&self, keywords: &[&str]) -> JdjError {
        self.fail(format!("expected {}", quote_list(keywords)), None)
    }
}

/// Quotes `names` as `'a', 'b' or 'c'`.
pub fn quote_list(names: &[&str]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
    match quoted.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {last}", rest.join(", ")),
        _ => quoted.concat(),
    }
}

#[cfg(test)]
mod tests {
    use jdj_template::context::ContextValue;
    use jdj_template::lexer::tokenize;
    use jdj_template::Environment;

    use super::*;

    fn with_stream<T>(source: &str, f: impl FnOnce(&mut TagStream<'_, '_>) -> T) -> T {
        let env = Environment::new();
        let mut parser = Parser::new(&env, tokenize(source).unwrap());
        parser.stream().next_token();
        let mut stream = TagStream::open(&mut parser).unwrap();
        f(&mut stream)
    }

    #[test]
    fn test_open_records_tag() {
        with_stream("{% url 'home' %}", |s| {
            assert_eq!(s.tag(), "url");
            assert_eq!(s.lineno(), 1);
            assert_eq!(s.current().kind, TokenKind::String("home".into()));
        });
    }

    #[test]
    fn test_keywords() {
        with_stream("{% trans as x %}", |s| {
            assert_eq!(s.peek_keyword(&["noop", "as"]), Some("as"));
            assert!(s.current().is_name("as"));
            assert_eq!(s.take_keyword(&["noop"]), None);
            assert_eq!(s.take_keyword(&["as"]), Some("as"));
            assert_eq!(s.consume_identifier().unwrap(), "x");
            assert!(s.at_end());
            assert!(s.expect_end_of_tag().is_ok());
        });
    }

    #[test]
    fn test_consume_value_keeps_strings_apart() {
        with_stream("{% url 'a' 'b' c.d %}", |s| {
            assert_eq!(s.consume_value().unwrap().as_const_str(), Some("a"));
            assert_eq!(s.consume_value().unwrap().as_const_str(), Some("b"));
            assert!(matches!(s.consume_value().unwrap(), Expr::Getattr(_, ref attr) if attr == "d"));
            assert!(s.at_end());
        });
    }

    #[test]
    fn test_consume_expression_joins_strings() {
        with_stream("{% trans 'a' 'b' %}", |s| {
            assert_eq!(s.consume_expression().unwrap().as_const_str(), Some("ab"));
        });
    }

    #[test]
    fn test_assignment_detection() {
        with_stream("{% url 'v' kw=1 %}", |s| {
            s.consume_value().unwrap();
            assert!(s.at_assignment());
            assert_eq!(s.consume_identifier().unwrap(), "kw");
            s.expect_assign().unwrap();
            assert!(matches!(
                s.consume_value().unwrap(),
                Expr::Const(ContextValue::Integer(1))
            ));
        });
    }

    #[test]
    fn test_end_of_tag_error() {
        let err = with_stream("{% csrf_token 42 %}", |s| s.expect_end_of_tag().unwrap_err());
        assert_eq!(
            err.to_string(),
            "Template syntax error (line 1): expected token end of statement block, got 'integer'"
        );
    }

    #[test]
    fn test_consume_string_error() {
        let err = with_stream("{% now fmt %}", |s| s.consume_string().unwrap_err());
        assert!(err.to_string().contains("expected token string, got 'fmt'"));
    }

    #[test]
    fn test_unexpected_keyword() {
        let err = with_stream("{% trans 'x' foo %}", |s| {
            s.unexpected_keyword(&["noop", "context", "as"])
        });
        assert_eq!(
            err.to_string(),
            "Template syntax error (line 1): expected 'noop', 'context' or 'as'"
        );
    }

    #[test]
    fn test_quote_list() {
        assert_eq!(quote_list(&["as"]), "'as'");
        assert_eq!(quote_list(&["a", "b"]), "'a' or 'b'");
    }
}
