//! One grammar per tag.
//!
//! Each parser receives a [`TagStream`] opened on its tag and returns the
//! [`CallNode`](crate::call::CallNode) for that occurrence. Parsers leave the
//! closing `%}` to the host parser.

pub mod blocktrans;
pub mod csrf;
pub mod now;
pub mod static_tag;
pub mod trans;
pub mod url;

use jdj_core::error::JdjResult;

use crate::stream::TagStream;

/// Parses an optional trailing `as <identifier>`.
pub(crate) fn parse_target(stream: &mut TagStream<'_, '_>) -> JdjResult<Option<String>> {
    if stream.take_keyword(&["as"]).is_none() {
        return Ok(None);
    }
    stream.consume_identifier().map(Some)
}

/// Fails unless an argument follows: the cursor must be on neither the
/// closing `%}` nor one of the tag's `keywords`.
pub(crate) fn require_argument(
    stream: &TagStream<'_, '_>,
    what: &str,
    keywords: &[&'static str],
) -> JdjResult<()> {
    if stream.at_end() || stream.peek_keyword(keywords).is_some() {
        return Err(stream.fail(format!("'{}' tag requires a {what}", stream.tag()), None));
    }
    Ok(())
}

/// Records `keyword` in `seen`, failing if it was already given.
pub(crate) fn mark_once(
    stream: &TagStream<'_, '_>,
    seen: &mut Vec<&'static str>,
    keyword: &'static str,
    lineno: usize,
) -> JdjResult<()> {
    if seen.contains(&keyword) {
        return Err(stream.fail(format!("'{keyword}' given more than once"), Some(lineno)));
    }
    seen.push(keyword);
    Ok(())
}
