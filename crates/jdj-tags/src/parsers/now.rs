//! `{% now <format> [as <name>] %}`

use jdj_core::error::JdjResult;
use jdj_template::expr::Expr;

use super::parse_target;
use crate::call::{CallNode, TagKind};
use crate::stream::TagStream;

/// The format must be a string literal in Django date format syntax.
pub fn parse(stream: &mut TagStream<'_, '_>) -> JdjResult<CallNode> {
    let mut call = CallNode::new(TagKind::Now, stream.lineno());
    call.args.push(Expr::constant(stream.consume_string()?));
    call.target = parse_target(stream)?;
    stream.expect_end_of_tag()?;
    Ok(call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::testing::parse_tag;

    #[test]
    fn test_format_and_target() {
        let call = parse_tag("{% now 'Y-m-d' as today %}").unwrap();
        assert_eq!(call.args[0].as_const_str(), Some("Y-m-d"));
        assert_eq!(call.target.as_deref(), Some("today"));

        let call = parse_tag(r#"{% now "jS F Y H:i" %}"#).unwrap();
        assert!(call.target.is_none());
    }

    #[test]
    fn test_format_must_be_literal() {
        let err = parse_tag("{% now fmt %}").unwrap_err();
        assert!(err.to_string().contains("expected token string, got 'fmt'"));
    }

    #[test]
    fn test_trailing_tokens() {
        let err = parse_tag("{% now 'Y' 'm' %}").unwrap_err();
        assert!(err.to_string().contains("got 'string'"));
    }
}
