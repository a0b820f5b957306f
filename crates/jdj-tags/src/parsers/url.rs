//! `{% url <view> [arg ...|key=value ...] [as <name>] %}`
//!
//! Arguments are either all positional or all keyword; the first argument
//! decides. String literals are taken one at a time, so
//! `{% url 'view' 'a' 'b' %}` passes two arguments.

use jdj_core::error::JdjResult;
use jdj_template::lexer::TokenKind;

use super::require_argument;
use crate::call::{CallNode, TagKind};
use crate::stream::TagStream;

const MIXED: &str = "url arguments must be all positional or all keyword";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Positional,
    Keyword,
}

pub fn parse(stream: &mut TagStream<'_, '_>) -> JdjResult<CallNode> {
    let mut call = CallNode::new(TagKind::Url, stream.lineno());
    require_argument(stream, "view name", &["as"])?;
    call.args.push(stream.consume_value()?);

    let mut chosen = None;
    while !stream.at_end() {
        if stream.take_keyword(&["as"]).is_some() {
            call.target = Some(stream.consume_identifier()?);
            break;
        }
        let lineno = stream.current().lineno;
        let mode = *chosen.get_or_insert(if stream.at_assignment() {
            Mode::Keyword
        } else {
            Mode::Positional
        });

        match mode {
            Mode::Positional => {
                if stream.at_assignment() {
                    return Err(stream.fail(MIXED, Some(lineno)));
                }
                call.args.push(stream.consume_value()?);
            }
            Mode::Keyword => {
                if !matches!(stream.current().kind, TokenKind::Name(_)) {
                    let got = stream.current().describe();
                    return Err(stream.fail(
                        format!("got '{got}', expected name for keyword argument"),
                        Some(lineno),
                    ));
                }
                if !stream.at_assignment() {
                    return Err(stream.fail(MIXED, Some(lineno)));
                }
                let key = stream.consume_identifier()?;
                stream.expect_assign()?;
                if call.has_kwarg(&key) {
                    return Err(stream.fail(format!("keyword argument '{key}' repeated"), Some(lineno)));
                }
                let value = stream.consume_value()?;
                call.kwargs.push((key, value));
            }
        }
    }

    stream.expect_end_of_tag()?;
    Ok(call)
}

#[cfg(test)]
mod tests {
    use jdj_template::expr::Expr;

    use super::*;
    use crate::parsers::testing::parse_tag;

    #[test]
    fn test_view_only() {
        let call = parse_tag("{% url 'my_view' %}").unwrap();
        assert_eq!(call.args.len(), 1);
        assert_eq!(call.args[0].as_const_str(), Some("my_view"));
        assert!(call.kwargs.is_empty());
    }

    #[test]
    fn test_positional_strings_stay_separate() {
        let call = parse_tag("{% url 'my_view' 'foo' 'bar' %}").unwrap();
        let values: Vec<_> = call.args.iter().map(Expr::as_const_str).collect();
        assert_eq!(values, [Some("my_view"), Some("foo"), Some("bar")]);
    }

    #[test]
    fn test_positional_expressions() {
        let call = parse_tag("{% url 'my_view' arg1 foo.bar 'x' as u %}").unwrap();
        assert_eq!(call.args.len(), 4);
        assert!(matches!(&call.args[1], Expr::Name(n) if n == "arg1"));
        assert!(matches!(&call.args[2], Expr::Getattr(_, a) if a == "bar"));
        assert_eq!(call.target.as_deref(), Some("u"));
    }

    #[test]
    fn test_keyword_arguments() {
        let call = parse_tag("{% url 'my_view' kw1=arg1 kw2='bar' as u %}").unwrap();
        assert_eq!(call.args.len(), 1);
        let keys: Vec<&str> = call.kwargs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["kw1", "kw2"]);
        assert_eq!(call.kwarg("kw2").and_then(Expr::as_const_str), Some("bar"));
        assert_eq!(call.target.as_deref(), Some("u"));
    }

    #[test]
    fn test_expression_view_name() {
        let call = parse_tag("{% url view_name pk %}").unwrap();
        assert!(matches!(&call.args[0], Expr::Name(n) if n == "view_name"));
        assert_eq!(call.args.len(), 2);
    }

    #[test]
    fn test_keyword_mode_rejects_non_names() {
        let err = parse_tag("{% url 'my_view' kw1='foo' 123 %}").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Template syntax error (line 1): got 'integer', expected name for keyword argument"
        );
    }

    #[test]
    fn test_mixing_rejected() {
        for source in [
            "{% url 'my_view' a x=b %}",
            "{% url 'my_view' x=b a %}",
        ] {
            let err = parse_tag(source).unwrap_err();
            assert!(err.to_string().contains(MIXED), "{source}: {err}");
        }
    }

    #[test]
    fn test_repeated_keyword() {
        let err = parse_tag("{% url 'v' a=1 a=2 %}").unwrap_err();
        assert!(err.to_string().contains("keyword argument 'a' repeated"));
    }

    #[test]
    fn test_missing_view_name() {
        for source in ["{% url %}", "{% url as u %}"] {
            let err = parse_tag(source).unwrap_err();
            assert!(err.to_string().contains("'url' tag requires a view name"), "{source}: {err}");
        }
    }
}
