//! `{% blocktrans [with a=x ...] [trimmed] [context <string>]
//! [count n=x] [asvar <name>] %}...[{% plural %}...]{% endblocktrans %}`
//!
//! The body becomes a gettext message id: text is kept (with `%` doubled),
//! and each `{{ name }}` becomes a `%(name)s` placeholder. Only plain names
//! are allowed inside the body. Options may come in any order, each at most
//! once.

use std::fmt::Write;
use std::sync::OnceLock;

use jdj_core::error::JdjResult;
use jdj_template::lexer::TokenKind;
use regex::Regex;

use super::mark_once;
use crate::call::{CallNode, TagKind, TransBody};
use crate::stream::TagStream;

const OPTIONS: &[&str] = &["with", "trimmed", "context", "count", "asvar"];

pub fn parse(stream: &mut TagStream<'_, '_>) -> JdjResult<CallNode> {
    let mut call = CallNode::new(TagKind::BlockTrans, stream.lineno());
    parse_options(stream, &mut call)?;
    stream.stream().expect_kind(&TokenKind::BlockEnd)?;

    let mut body = parse_body(stream, &call)?;
    if call.count.is_some() && body.plural.is_none() {
        return Err(stream.fail("plural form not found", Some(call.lineno)));
    }
    if call.trimmed {
        body.singular = trim_whitespace(&body.singular);
        body.plural = body.plural.as_deref().map(trim_whitespace);
    }
    call.body = Some(body);

    stream.expect_end_of_tag()?;
    Ok(call)
}

fn parse_options(stream: &mut TagStream<'_, '_>, call: &mut CallNode) -> JdjResult<()> {
    let mut seen = Vec::new();
    while !stream.at_end() {
        let lineno = stream.current().lineno;
        let Some(option) = stream.take_keyword(OPTIONS) else {
            return Err(stream.unexpected_keyword(OPTIONS));
        };
        mark_once(stream, &mut seen, option, lineno)?;
        match option {
            "with" => loop {
                let lineno = stream.current().lineno;
                let name = stream.consume_identifier()?;
                stream.expect_assign()?;
                let value = stream.consume_expression()?;
                reject_rebinding(stream, call, &name, lineno)?;
                call.kwargs.push((name, value));
                if !stream.at_assignment() {
                    break;
                }
            },
            "trimmed" => call.trimmed = true,
            "context" => call.context = Some(stream.consume_string()?),
            "count" => {
                let lineno = stream.current().lineno;
                let name = stream.consume_identifier()?;
                stream.expect_assign()?;
                let value = stream.consume_expression()?;
                reject_rebinding(stream, call, &name, lineno)?;
                call.count = Some((name, value));
            }
            _ => call.target = Some(stream.consume_identifier()?),
        }
    }
    Ok(())
}

fn reject_rebinding(
    stream: &TagStream<'_, '_>,
    call: &CallNode,
    name: &str,
    lineno: usize,
) -> JdjResult<()> {
    let counted = call.count.as_ref().is_some_and(|(count, _)| count == name);
    if call.has_kwarg(name) || counted {
        return Err(stream.fail(format!("variable '{name}' bound more than once"), Some(lineno)));
    }
    Ok(())
}

/// Collects the body up to `{% endblocktrans %}`, leaving the cursor on the
/// closing `%}` of the end tag.
fn parse_body(stream: &mut TagStream<'_, '_>, call: &CallNode) -> JdjResult<TransBody> {
    let count_name = call.count.as_ref().map(|(name, _)| name.as_str());
    let mut body = TransBody::default();
    let mut current = String::new();

    loop {
        let token = stream.stream().next_token();
        match token.kind {
            TokenKind::Data(text) => current.push_str(&text.replace('%', "%%")),
            TokenKind::VariableBegin => {
                let name = stream.consume_identifier()?;
                stream.stream().expect_kind(&TokenKind::VariableEnd)?;
                let bound = call.has_kwarg(&name) || count_name == Some(name.as_str());
                if !bound && !body.context_vars.contains(&name) {
                    body.context_vars.push(name.clone());
                }
                let _ = write!(current, "%({name})s");
            }
            TokenKind::BlockBegin => {
                if body.plural.is_none() && stream.stream().skip_if_name("plural") {
                    if count_name.is_none() {
                        return Err(stream.fail("used plural without specifying count", Some(token.lineno)));
                    }
                    stream.stream().expect_kind(&TokenKind::BlockEnd)?;
                    body.plural = Some(String::new());
                    body.singular = std::mem::take(&mut current);
                } else {
                    stream.stream().expect_name("endblocktrans")?;
                    break;
                }
            }
            TokenKind::Eof => {
                return Err(stream.fail(
                    "unexpected end of template, expected endblocktrans tag",
                    Some(token.lineno),
                ))
            }
            _ => {
                return Err(stream.fail(format!("unexpected '{}'", token.describe()), Some(token.lineno)))
            }
        }
    }

    if body.plural.is_some() {
        body.plural = Some(current);
    } else {
        body.singular = current;
    }
    Ok(body)
}

/// Strips the message and replaces every whitespace run that contains a line
/// break with a single space.
pub fn trim_whitespace(message: &str) -> String {
    static LINE_BREAKS: OnceLock<Regex> = OnceLock::new();
    let re = LINE_BREAKS.get_or_init(|| Regex::new(r"\s*\n\s*").expect("valid regex"));
    re.replace_all(message.trim(), " ").into_owned()
}
