//! Template parser.
//!
//! Turns the token stream into a tree of [`Node`]s. The parser handles the
//! built-in statements (`if`, `for`, `set`) itself and hands every other tag
//! to the extension registered for it in the [`Environment`].
//!
//! Expressions follow the usual Jinja precedence, loosest first: `or`,
//! `and`, `not`, comparisons, `+`/`-`, `~`, unary `-`, then primaries with
//! their postfix operators (`.attr`, `[key]`, calls) and filters.

use jdj_core::error::{JdjError, JdjResult};

use crate::context::ContextValue;
use crate::environment::Environment;
use crate::expr::{BinaryOp, Expr};
use crate::lexer::{Operator, Token, TokenKind};
use crate::nodes::Node;
use crate::stream::TokenStream;

/// Recursive-descent parser over one template's tokens.
pub struct Parser<'env> {
    env: &'env Environment,
    stream: TokenStream,
    end_token_stack: Vec<&'static [&'static str]>,
}

impl<'env> Parser<'env> {
    /// Creates a parser for `tokens` compiled against `env`.
    pub fn new(env: &'env Environment, tokens: Vec<Token>) -> Self {
        Self {
            env,
            stream: TokenStream::new(tokens),
            end_token_stack: Vec::new(),
        }
    }

    /// The environment the template is compiled for.
    pub const fn env(&self) -> &'env Environment {
        self.env
    }

    /// The underlying token stream.
    pub fn stream(&mut self) -> &mut TokenStream {
        &mut self.stream
    }

    /// Read-only view of the token stream.
    pub const fn stream_ref(&self) -> &TokenStream {
        &self.stream
    }

    /// Builds a syntax error at `lineno`, or at the current token's line.
    pub fn fail(&self, message: impl Into<String>, lineno: Option<usize>) -> JdjError {
        JdjError::syntax(message, lineno.unwrap_or_else(|| self.stream.current().lineno))
    }

    /// Parses the whole template.
    ///
    /// # Errors
    ///
    /// Returns the first `TemplateSyntaxError` encountered.
    pub fn parse(mut self) -> JdjResult<Vec<Node>> {
        self.subparse(None)
    }

    /// Parses nodes until one of `end_tokens` opens a block (the cursor is
    /// left on that tag name) or, without end tokens, until end of template.
    ///
    /// # Errors
    ///
    /// Fails on syntax errors and on end of template while end tokens are
    /// pending.
    pub fn subparse(&mut self, end_tokens: Option<&'static [&'static str]>) -> JdjResult<Vec<Node>> {
        let mut body = Vec::new();
        if let Some(tokens) = end_tokens {
            self.end_token_stack.push(tokens);
        }

        let result = loop {
            let token = self.stream.current().clone();
            match token.kind {
                TokenKind::Data(text) => {
                    self.stream.next_token();
                    body.push(Node::Text(text));
                }
                TokenKind::VariableBegin => {
                    self.stream.next_token();
                    let expr = self.parse_expression()?;
                    self.stream.expect_kind(&TokenKind::VariableEnd)?;
                    body.push(Node::Output(vec![expr]));
                }
                TokenKind::BlockBegin => {
                    self.stream.next_token();
                    if let Some(tokens) = end_tokens {
                        if tokens.iter().any(|t| self.stream.current().is_name(t)) {
                            break Ok(body);
                        }
                    }
                    let node = self.parse_statement()?;
                    self.stream.expect_kind(&TokenKind::BlockEnd)?;
                    body.push(node);
                }
                TokenKind::Eof => {
                    break match end_tokens {
                        None => Ok(body),
                        Some(tokens) => Err(self.fail(
                            format!("unexpected end of template, expected {}", quote_list(tokens)),
                            None,
                        )),
                    };
                }
                _ => break Err(self.fail(format!("unexpected '{}'", token.describe()), None)),
            }
        };

        if end_tokens.is_some() {
            self.end_token_stack.pop();
        }
        result
    }

    fn parse_statement(&mut self) -> JdjResult<Node> {
        let token = self.stream.current().clone();
        let TokenKind::Name(tag) = &token.kind else {
            return Err(self.fail("tag name expected", None));
        };

        match tag.as_str() {
            "if" => self.parse_if(),
            "for" => self.parse_for(),
            "set" => self.parse_set(),
            _ => {
                if let Some(ext) = self.env.extension_for(tag) {
                    tracing::trace!(tag = %tag, extension = ext.name(), "dispatching tag");
                    return ext.parse(self);
                }
                Err(self.unknown_tag(tag, token.lineno))
            }
        }
    }

    fn unknown_tag(&self, tag: &str, lineno: usize) -> JdjError {
        let mut message = format!("encountered unknown tag '{tag}'");
        if let Some(expected) = self.end_token_stack.last() {
            message.push_str(&format!(", expected {}", quote_list(expected)));
        }
        JdjError::syntax(message, lineno)
    }

    fn parse_if(&mut self) -> JdjResult<Node> {
        self.stream.expect_name("if")?;
        let mut branches = Vec::new();
        let mut else_body = Vec::new();
        let mut condition = self.parse_expression()?;
        loop {
            self.stream.expect_kind(&TokenKind::BlockEnd)?;
            let body = self.subparse(Some(&["elif", "else", "endif"]))?;
            branches.push((condition, body));
            if self.stream.skip_if_name("elif") {
                condition = self.parse_expression()?;
                continue;
            }
            if self.stream.skip_if_name("else") {
                self.stream.expect_kind(&TokenKind::BlockEnd)?;
                else_body = self.subparse(Some(&["endif"]))?;
            }
            self.stream.expect_name("endif")?;
            break;
        }
        Ok(Node::If {
            branches,
            else_body,
        })
    }

    fn parse_for(&mut self) -> JdjResult<Node> {
        self.stream.expect_name("for")?;
        let (target, _) = self.stream.expect_any_name()?;
        self.stream.expect_name("in")?;
        let iter = self.parse_expression()?;
        self.stream.expect_kind(&TokenKind::BlockEnd)?;
        let body = self.subparse(Some(&["endfor", "else"]))?;
        let mut else_body = Vec::new();
        if self.stream.skip_if_name("else") {
            self.stream.expect_kind(&TokenKind::BlockEnd)?;
            else_body = self.subparse(Some(&["endfor"]))?;
        }
        self.stream.expect_name("endfor")?;
        Ok(Node::For {
            target,
            iter,
            body,
            else_body,
        })
    }

    fn parse_set(&mut self) -> JdjResult<Node> {
        self.stream.expect_name("set")?;
        let (target, _) = self.stream.expect_any_name()?;
        self.stream.expect_operator(Operator::Assign)?;
        let value = self.parse_expression()?;
        Ok(Node::Assign { target, value })
    }

    // ── Expressions ──────────────────────────────────────────────────

    /// Parses one expression at the cursor.
    ///
    /// # Errors
    ///
    /// Returns a `TemplateSyntaxError` when no expression can be parsed.
    pub fn parse_expression(&mut self) -> JdjResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> JdjResult<Expr> {
        let mut left = self.parse_and()?;
        while self.stream.skip_if_name("or") {
            let right = self.parse_and()?;
            left = Expr::Binary(Box::new(left), BinaryOp::Or, Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> JdjResult<Expr> {
        let mut left = self.parse_not()?;
        while self.stream.skip_if_name("and") {
            let right = self.parse_not()?;
            left = Expr::Binary(Box::new(left), BinaryOp::And, Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> JdjResult<Expr> {
        if self.stream.skip_if_name("not") {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> JdjResult<Expr> {
        let mut left = self.parse_math()?;
        loop {
            let op = match self.stream.current().kind {
                TokenKind::Operator(Operator::Eq) => BinaryOp::Eq,
                TokenKind::Operator(Operator::Ne) => BinaryOp::Ne,
                TokenKind::Operator(Operator::Lt) => BinaryOp::Lt,
                TokenKind::Operator(Operator::Le) => BinaryOp::Le,
                TokenKind::Operator(Operator::Gt) => BinaryOp::Gt,
                TokenKind::Operator(Operator::Ge) => BinaryOp::Ge,
                _ => return Ok(left),
            };
            self.stream.next_token();
            let right = self.parse_math()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
    }

    fn parse_math(&mut self) -> JdjResult<Expr> {
        let mut left = self.parse_concat()?;
        loop {
            let op = match self.stream.current().kind {
                TokenKind::Operator(Operator::Add) => BinaryOp::Add,
                TokenKind::Operator(Operator::Sub) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.stream.next_token();
            let right = self.parse_concat()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
    }

    fn parse_concat(&mut self) -> JdjResult<Expr> {
        let mut left = self.parse_unary()?;
        while self.stream.skip_if_operator(Operator::Tilde) {
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), BinaryOp::Concat, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> JdjResult<Expr> {
        if self.stream.skip_if_operator(Operator::Sub) {
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        let primary = self.parse_primary()?;
        let expr = self.parse_postfix(primary)?;
        self.parse_filters(expr)
    }

    fn parse_primary(&mut self) -> JdjResult<Expr> {
        let token = self.stream.next_token();
        let expr = match token.kind {
            TokenKind::Name(name) => match name.as_str() {
                "true" | "True" => Expr::constant(true),
                "false" | "False" => Expr::constant(false),
                "none" | "None" => Expr::Const(ContextValue::None),
                _ => Expr::Name(name),
            },
            TokenKind::String(mut value) => {
                // Adjacent string literals concatenate.
                while let TokenKind::String(next) = &self.stream.current().kind {
                    value.push_str(next);
                    self.stream.next_token();
                }
                Expr::constant(value)
            }
            TokenKind::Integer(i) => Expr::constant(i),
            TokenKind::Float(f) => Expr::constant(f),
            TokenKind::Operator(Operator::LParen) => {
                let inner = self.parse_expression()?;
                self.stream.expect_operator(Operator::RParen)?;
                inner
            }
            TokenKind::Operator(Operator::LBracket) => {
                let mut items = Vec::new();
                while !self.stream.current().is_operator(Operator::RBracket) {
                    if !items.is_empty() {
                        self.stream.expect_operator(Operator::Comma)?;
                        if self.stream.current().is_operator(Operator::RBracket) {
                            break;
                        }
                    }
                    items.push(self.parse_expression()?);
                }
                self.stream.expect_operator(Operator::RBracket)?;
                Expr::List(items)
            }
            TokenKind::Eof => {
                return Err(JdjError::syntax(
                    "unexpected end of template, expected an expression",
                    token.lineno,
                ))
            }
            _ => {
                return Err(JdjError::syntax(
                    format!("unexpected '{}'", token.describe()),
                    token.lineno,
                ))
            }
        };
        Ok(expr)
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> JdjResult<Expr> {
        loop {
            if self.stream.skip_if_operator(Operator::Dot) {
                let token = self.stream.next_token();
                let attr = match token.kind {
                    TokenKind::Name(name) => name,
                    TokenKind::Integer(i) => i.to_string(),
                    _ => {
                        return Err(JdjError::syntax(
                            format!("expected name or number, got '{}'", token.describe()),
                            token.lineno,
                        ))
                    }
                };
                expr = Expr::Getattr(Box::new(expr), attr);
            } else if self.stream.skip_if_operator(Operator::LBracket) {
                let key = self.parse_expression()?;
                self.stream.expect_operator(Operator::RBracket)?;
                expr = Expr::Getitem(Box::new(expr), Box::new(key));
            } else if self.stream.current().is_operator(Operator::LParen) {
                let (args, kwargs) = self.parse_call_args()?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                    kwargs,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_filters(&mut self, mut expr: Expr) -> JdjResult<Expr> {
        while self.stream.skip_if_operator(Operator::Pipe) {
            let (name, _) = self.stream.expect_any_name()?;
            let args = if self.stream.current().is_operator(Operator::LParen) {
                self.parse_call_args()?.0
            } else {
                Vec::new()
            };
            expr = Expr::Filter {
                expr: Box::new(expr),
                name,
                args,
            };
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> JdjResult<(Vec<Expr>, Vec<(String, Expr)>)> {
        self.stream.expect_operator(Operator::LParen)?;
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();
        while !self.stream.current().is_operator(Operator::RParen) {
            if !args.is_empty() || !kwargs.is_empty() {
                self.stream.expect_operator(Operator::Comma)?;
                if self.stream.current().is_operator(Operator::RParen) {
                    break;
                }
            }
            let is_keyword = matches!(self.stream.current().kind, TokenKind::Name(_))
                && self.stream.look().is_operator(Operator::Assign);
            if is_keyword {
                let (key, lineno) = self.stream.expect_any_name()?;
                self.stream.next_token();
                if kwargs.iter().any(|(k, _)| *k == key) {
                    return Err(JdjError::syntax(
                        format!("keyword argument '{key}' repeated"),
                        lineno,
                    ));
                }
                kwargs.push((key, self.parse_expression()?));
            } else {
                if !kwargs.is_empty() {
                    return Err(self.fail("positional argument follows keyword argument", None));
                }
                args.push(self.parse_expression()?);
            }
        }
        self.stream.expect_operator(Operator::RParen)?;
        Ok((args, kwargs))
    }
}

fn quote_list(names: &[&str]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
    match quoted.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {last}", rest.join(", ")),
        _ => quoted.join(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> JdjResult<Vec<Node>> {
        let env = Environment::new();
        Parser::new(&env, tokenize(source)?).parse()
    }

    #[test]
    fn test_text_and_output() {
        let nodes = parse("Hi {{ name }}!").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[1], Node::Output(exprs) if matches!(&exprs[0], Expr::Name(n) if n == "name")));
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        let nodes = parse("{{ 'a' 'b' }}").unwrap();
        let Node::Output(exprs) = &nodes[0] else {
            panic!("expected output");
        };
        assert_eq!(exprs[0].as_const_str(), Some("ab"));
    }

    #[test]
    fn test_filter_with_args() {
        let nodes = parse("{{ items|join(', ')|upper }}").unwrap();
        let Node::Output(exprs) = &nodes[0] else {
            panic!("expected output");
        };
        let Expr::Filter { name, expr, .. } = &exprs[0] else {
            panic!("expected filter");
        };
        assert_eq!(name, "upper");
        assert!(matches!(expr.as_ref(), Expr::Filter { name, args, .. } if name == "join" && args.len() == 1));
    }

    #[test]
    fn test_call_with_kwargs() {
        let nodes = parse("{{ f(1, x=2) }}").unwrap();
        let Node::Output(exprs) = &nodes[0] else {
            panic!("expected output");
        };
        let Expr::Call { args, kwargs, .. } = &exprs[0] else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 1);
        assert_eq!(kwargs[0].0, "x");
    }

    #[test]
    fn test_positional_after_keyword() {
        let err = parse("{{ f(x=2, 1) }}").unwrap_err();
        assert!(err.to_string().contains("positional argument follows keyword argument"));
    }

    #[test]
    fn test_if_elif_else_structure() {
        let nodes = parse("{% if a %}1{% elif b %}2{% else %}3{% endif %}").unwrap();
        let Node::If { branches, else_body } = &nodes[0] else {
            panic!("expected if");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(else_body.len(), 1);
    }

    #[test]
    fn test_unknown_tag() {
        let err = parse("{% frobnicate %}").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Template syntax error (line 1): encountered unknown tag 'frobnicate'"
        );
    }

    #[test]
    fn test_unknown_tag_inside_block_mentions_end_tokens() {
        let err = parse("{% for x in y %}{% frobnicate %}").unwrap_err();
        assert!(err.to_string().contains("expected 'endfor' or 'else'"));
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse("{% if a %}\nx").unwrap_err();
        assert!(err
            .to_string()
            .contains("unexpected end of template, expected 'elif', 'else' or 'endif'"));
    }

    #[test]
    fn test_unexpected_token_in_expression() {
        let err = parse("{{ ) }}").unwrap_err();
        assert!(err.to_string().contains("unexpected ')'"));
    }

    #[test]
    fn test_missing_block_end() {
        let err = parse("{% set x = 1 2 %}").unwrap_err();
        assert!(err
            .to_string()
            .contains("expected token end of statement block, got 'integer'"));
    }

    #[test]
    fn test_quote_list() {
        assert_eq!(quote_list(&["a"]), "'a'");
        assert_eq!(quote_list(&["a", "b"]), "'a' or 'b'");
        assert_eq!(quote_list(&["a", "b", "c"]), "'a', 'b' or 'c'");
    }
}
