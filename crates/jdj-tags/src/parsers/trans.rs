//! `{% trans <message> [noop] [context <string>] [as <name>] %}`
//!
//! The modifiers may follow the message in any order, each at most once.
//! `noop` and `context` exclude each other.

use jdj_core::error::{JdjError, JdjResult};
use jdj_template::lexer::TokenKind;

use super::{mark_once, require_argument};
use crate::call::{CallNode, TagKind};
use crate::stream::TagStream;

const MODIFIERS: &[&str] = &["noop", "context", "as"];

pub fn parse(stream: &mut TagStream<'_, '_>) -> JdjResult<CallNode> {
    let mut call = CallNode::new(TagKind::Trans, stream.lineno());
    require_argument(stream, "message", MODIFIERS)?;
    call.args.push(stream.consume_expression()?);

    let mut seen = Vec::new();
    while matches!(stream.current().kind, TokenKind::Name(_)) {
        let lineno = stream.current().lineno;
        let Some(modifier) = stream.take_keyword(MODIFIERS) else {
            return Err(stream.unexpected_keyword(MODIFIERS));
        };
        mark_once(stream, &mut seen, modifier, lineno)?;
        match modifier {
            "noop" => {
                if call.context.is_some() {
                    return Err(no_context(stream, lineno));
                }
                call.noop = true;
            }
            "context" => {
                if call.noop {
                    return Err(no_context(stream, lineno));
                }
                call.context = Some(stream.consume_string()?);
            }
            _ => call.target = Some(stream.consume_identifier()?),
        }
    }

    stream.expect_end_of_tag()?;
    Ok(call)
}

fn no_context(stream: &TagStream<'_, '_>, lineno: usize) -> JdjError {
    stream.fail("noop translation can't have context", Some(lineno))
}
