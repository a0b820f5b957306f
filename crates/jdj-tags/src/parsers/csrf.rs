//! `{% csrf_token %}`

use jdj_core::error::JdjResult;
use jdj_template::expr::Expr;

use crate::call::{CallNode, TagKind};
use crate::stream::TagStream;

/// Takes no arguments; the token is read from the `csrf_token` variable.
pub fn parse(stream: &mut TagStream<'_, '_>) -> JdjResult<CallNode> {
    stream.expect_end_of_tag()?;
    let mut call = CallNode::new(TagKind::CsrfToken, stream.lineno());
    call.args.push(Expr::Name("csrf_token".to_string()));
    Ok(call)
}
