//! Template lexer (tokenizer).
//!
//! Converts raw template source into a flat list of positioned [`Token`]s.
//! Text outside of tags becomes [`TokenKind::Data`]; the inside of `{{ }}` and
//! `{% %}` is split into names, literals and operators framed by begin/end
//! tokens; `{# #}` comments are dropped. A trailing [`TokenKind::Eof`] is
//! always appended.
//!
//! A `-` directly inside a delimiter (`{%-`, `-%}`, `{{-`, `-}}`) strips the
//! whitespace of the adjacent text.

use std::fmt;

use jdj_core::error::{JdjError, JdjResult};

/// An operator or punctuation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Assign,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `|`
    Pipe,
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `~`
    Tilde,
    /// `+`
    Add,
    /// `-`
    Sub,
}

impl Operator {
    /// Returns the source spelling of the operator.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Pipe => "|",
            Self::Dot => ".",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Tilde => "~",
            Self::Add => "+",
            Self::Sub => "-",
        }
    }
}

// Two-character operators first so `==` is not read as `=` `=`.
const OPERATORS: &[(&str, Operator)] = &[
    ("==", Operator::Eq),
    ("!=", Operator::Ne),
    ("<=", Operator::Le),
    (">=", Operator::Ge),
    ("=", Operator::Assign),
    ("<", Operator::Lt),
    (">", Operator::Gt),
    ("|", Operator::Pipe),
    (".", Operator::Dot),
    (",", Operator::Comma),
    (":", Operator::Colon),
    ("(", Operator::LParen),
    (")", Operator::RParen),
    ("[", Operator::LBracket),
    ("]", Operator::RBracket),
    ("~", Operator::Tilde),
    ("+", Operator::Add),
    ("-", Operator::Sub),
];

/// The kind (and payload) of a lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Literal template text between tags.
    Data(String),
    /// `{%`
    BlockBegin,
    /// `%}`
    BlockEnd,
    /// `{{`
    VariableBegin,
    /// `}}`
    VariableEnd,
    /// An identifier or keyword inside a tag.
    Name(String),
    /// A quoted string literal, with escapes resolved.
    String(String),
    /// An integer literal.
    Integer(i64),
    /// A float literal.
    Float(f64),
    /// An operator or punctuation mark.
    Operator(Operator),
    /// End of the template.
    Eof,
}

/// A token together with the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What was lexed.
    pub kind: TokenKind,
    /// 1-based source line.
    pub lineno: usize,
}

impl Token {
    /// Creates a token.
    pub const fn new(kind: TokenKind, lineno: usize) -> Self {
        Self { kind, lineno }
    }

    /// Returns `true` if this is the name `value`.
    pub fn is_name(&self, value: &str) -> bool {
        matches!(&self.kind, TokenKind::Name(n) if n == value)
    }

    /// Returns `true` if this is the operator `op`.
    pub fn is_operator(&self, op: Operator) -> bool {
        self.kind == TokenKind::Operator(op)
    }

    /// Describes the token the way syntax errors refer to it.
    ///
    /// Names are described by their value, operators by their spelling, and
    /// everything else by its kind (`integer`, `string`, `end of statement
    /// block`, ...).
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Name(name) => name.clone(),
            TokenKind::Operator(op) => op.as_str().to_string(),
            other => describe_kind(other).to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Describes a token kind without its payload.
pub const fn describe_kind(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::Data(_) => "template data / text",
        TokenKind::BlockBegin => "begin of statement block",
        TokenKind::BlockEnd => "end of statement block",
        TokenKind::VariableBegin => "begin of print statement",
        TokenKind::VariableEnd => "end of print statement",
        TokenKind::Name(_) => "name",
        TokenKind::String(_) => "string",
        TokenKind::Integer(_) => "integer",
        TokenKind::Float(_) => "float",
        TokenKind::Operator(_) => "operator",
        TokenKind::Eof => "end of template",
    }
}

/// Tokenizes a template source string.
///
/// # Errors
///
/// Returns a `TemplateSyntaxError` for unclosed tags, comments or strings, and
/// for characters that cannot start a token inside a tag.
///
/// # Examples
///
/// ```
/// use jdj_template::lexer::{tokenize, TokenKind};
///
/// let tokens = tokenize("Hi {{ name }}").unwrap();
/// assert_eq!(tokens[0].kind, TokenKind::Data("Hi ".into()));
/// assert_eq!(tokens[2].kind, TokenKind::Name("name".into()));
/// ```
pub fn tokenize(source: &str) -> JdjResult<Vec<Token>> {
    Lexer::new(source).run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagType {
    Variable, // {{
    Block,    // {%
    Comment,  // {#
}

struct Lexer<'s> {
    source: &'s str,
    pos: usize,
    lineno: usize,
    tokens: Vec<Token>,
    lstrip_next: bool,
}

impl<'s> Lexer<'s> {
    const fn new(source: &'s str) -> Self {
        Self {
            source,
            pos: 0,
            lineno: 1,
            tokens: Vec::new(),
            lstrip_next: false,
        }
    }

    fn rest(&self) -> &'s str {
        &self.source[self.pos..]
    }

    fn advance(&mut self, n: usize) {
        let consumed = &self.source[self.pos..self.pos + n];
        self.lineno += consumed.matches('\n').count();
        self.pos += n;
    }

    fn run(mut self) -> JdjResult<Vec<Token>> {
        while !self.rest().is_empty() {
            match find_next_open(self.rest()) {
                None => {
                    let text = self.rest();
                    self.push_data(text, false);
                    self.advance(text.len());
                }
                Some((offset, tag_type)) => {
                    let text = &self.rest()[..offset];
                    let strip_before = self.rest()[offset + 2..].starts_with('-');
                    self.push_data(text, strip_before);
                    self.advance(offset);
                    self.lex_tag(tag_type)?;
                }
            }
        }
        self.tokens.push(Token::new(TokenKind::Eof, self.lineno));
        Ok(self.tokens)
    }

    fn push_data(&mut self, text: &str, rstrip: bool) {
        let mut text = text;
        if std::mem::take(&mut self.lstrip_next) {
            text = text.trim_start();
        }
        if rstrip {
            text = text.trim_end();
        }
        if !text.is_empty() {
            self.tokens
                .push(Token::new(TokenKind::Data(text.to_string()), self.lineno));
        }
    }

    fn lex_tag(&mut self, tag_type: TagType) -> JdjResult<()> {
        let start_line = self.lineno;
        self.advance(2);
        if self.rest().starts_with('-') {
            self.advance(1);
        }

        if tag_type == TagType::Comment {
            let Some(end) = self.rest().find("#}") else {
                return Err(JdjError::syntax("unclosed comment", start_line));
            };
            self.lstrip_next = self.rest()[..end].ends_with('-');
            self.advance(end + 2);
            return Ok(());
        }

        let (begin, end, closer) = if tag_type == TagType::Block {
            (TokenKind::BlockBegin, TokenKind::BlockEnd, "%}")
        } else {
            (TokenKind::VariableBegin, TokenKind::VariableEnd, "}}")
        };
        self.tokens.push(Token::new(begin, start_line));

        loop {
            let trimmed = self.rest().trim_start();
            let skipped = self.rest().len() - trimmed.len();
            self.advance(skipped);

            let rest = self.rest();
            if rest.is_empty() {
                return Err(JdjError::syntax(
                    format!("unexpected end of template, expected '{closer}'"),
                    start_line,
                ));
            }
            if rest.starts_with(closer) {
                self.tokens.push(Token::new(end, self.lineno));
                self.advance(2);
                return Ok(());
            }
            if rest.starts_with('-') && rest[1..].starts_with(closer) {
                self.tokens.push(Token::new(end, self.lineno));
                self.advance(3);
                self.lstrip_next = true;
                return Ok(());
            }
            self.lex_inner_token(rest)?;
        }
    }

    fn lex_inner_token(&mut self, rest: &'s str) -> JdjResult<()> {
        let lineno = self.lineno;
        let first = rest.chars().next().unwrap_or('\0');

        if first == '\'' || first == '"' {
            let (value, len) = lex_string(rest, first)
                .ok_or_else(|| JdjError::syntax("unterminated string literal", lineno))?;
            self.tokens.push(Token::new(TokenKind::String(value), lineno));
            self.advance(len);
            return Ok(());
        }

        if first.is_ascii_digit() {
            let len = rest
                .char_indices()
                .find(|(_, c)| !(c.is_ascii_digit() || *c == '.' || *c == '_'))
                .map_or(rest.len(), |(i, _)| i);
            let literal = rest[..len].replace('_', "");
            // A trailing dot belongs to an attribute lookup, not the number.
            let literal = literal.trim_end_matches('.');
            let kind = if literal.contains('.') {
                TokenKind::Float(literal.parse().map_err(|_| {
                    JdjError::syntax(format!("invalid number literal '{literal}'"), lineno)
                })?)
            } else {
                TokenKind::Integer(literal.parse().map_err(|_| {
                    JdjError::syntax(format!("invalid number literal '{literal}'"), lineno)
                })?)
            };
            let consumed = rest[..len].trim_end_matches('.').len();
            self.tokens.push(Token::new(kind, lineno));
            self.advance(consumed);
            return Ok(());
        }

        if first.is_alphabetic() || first == '_' {
            let len = rest
                .char_indices()
                .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
                .map_or(rest.len(), |(i, _)| i);
            self.tokens
                .push(Token::new(TokenKind::Name(rest[..len].to_string()), lineno));
            self.advance(len);
            return Ok(());
        }

        for (spelling, op) in OPERATORS {
            if rest.starts_with(spelling) {
                self.tokens.push(Token::new(TokenKind::Operator(*op), lineno));
                self.advance(spelling.len());
                return Ok(());
            }
        }

        Err(JdjError::syntax(format!("unexpected char '{first}'"), lineno))
    }
}

/// Finds the next template tag opening in the source.
fn find_next_open(s: &str) -> Option<(usize, TagType)> {
    let mut best: Option<(usize, TagType)> = None;

    for (tag_str, tag_type) in [
        ("{{", TagType::Variable),
        ("{%", TagType::Block),
        ("{#", TagType::Comment),
    ] {
        if let Some(pos) = s.find(tag_str) {
            match best {
                Some((best_pos, _)) if pos >= best_pos => {}
                _ => best = Some((pos, tag_type)),
            }
        }
    }

    best
}

/// Reads a quoted string starting at `s[0]`, returning its value and byte length.
fn lex_string(s: &str, quote: char) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut chars = s.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        if c == quote {
            return Some((value, i + c.len_utf8()));
        }
        if c == '\\' {
            let (_, escaped) = chars.next()?;
            match escaped {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                other => value.push(other),
            }
        } else {
            value.push(c);
        }
    }
    None
}
