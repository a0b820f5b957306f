//! `{% static <path> [as <name>] %}`

use jdj_core::error::JdjResult;

use super::{parse_target, require_argument};
use crate::call::{CallNode, TagKind};
use crate::stream::TagStream;

pub fn parse(stream: &mut TagStream<'_, '_>) -> JdjResult<CallNode> {
    let mut call = CallNode::new(TagKind::Static, stream.lineno());
    require_argument(stream, "path", &["as"])?;
    call.args.push(stream.consume_expression()?);
    call.target = parse_target(stream)?;
    stream.expect_end_of_tag()?;
    Ok(call)
}
