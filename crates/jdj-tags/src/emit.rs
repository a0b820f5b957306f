//! The render-call emitter.
//!
//! [`emit`] turns a [`CallNode`] into a host [`Node`]. Argument expressions
//! are moved into an [`Expr::Invoke`] of a [`Function`] that captures the
//! [`Runtime`]; the host evaluates them at render time and the function calls
//! the delegate. A call with a target becomes [`Node::Assign`], otherwise
//! [`Node::Output`].

use std::collections::HashMap;
use std::sync::Arc;

use jdj_core::error::{JdjError, JdjResult};
use jdj_template::context::escape_html;
use jdj_template::{Arguments, ContextValue, Expr, Function, Node, State};

use crate::call::{CallNode, TagKind, TransBody};
use crate::runtime::{render_csrf_field, Runtime};

/// Converts a parsed tag into an executable node.
pub fn emit(call: CallNode, runtime: &Arc<Runtime>) -> Node {
    tracing::debug!(tag = %call.kind, line = call.lineno, "emitting tag");
    let CallNode {
        kind,
        args,
        kwargs,
        noop,
        context,
        count,
        body,
        target,
        ..
    } = call;

    let value = match kind {
        TagKind::CsrfToken => Expr::MarkSafe(Box::new(invoke(csrf_function(), args, Vec::new()))),
        TagKind::Trans => match (noop, context) {
            (true, _) => args.into_iter().next().unwrap_or(Expr::Const(ContextValue::None)),
            (false, Some(context)) => {
                let mut args = args;
                args.insert(0, Expr::constant(context));
                invoke(pgettext_function("pgettext", runtime), args, Vec::new())
            }
            (false, None) => invoke(gettext_function("gettext", runtime), args, Vec::new()),
        },
        TagKind::BlockTrans => {
            let message = BlockTransMessage {
                body: body.unwrap_or_default(),
                context,
                count_name: count.as_ref().map(|(name, _)| name.clone()),
            };
            let mut bindings = kwargs;
            if let Some((name, expr)) = count {
                bindings.push((name, expr));
            }
            bindings.extend(
                message
                    .body
                    .context_vars
                    .iter()
                    .map(|name| (name.clone(), Expr::Name(name.clone()))),
            );
            Expr::MarkSafe(Box::new(invoke(blocktrans_function(message, runtime), Vec::new(), bindings)))
        }
        TagKind::Now => invoke(now_function(runtime), args, Vec::new()),
        TagKind::Static => invoke(static_function(runtime), args, Vec::new()),
        TagKind::Url => invoke(url_function(runtime), args, kwargs),
    };

    match target {
        Some(target) => Node::Assign { target, value },
        None => Node::Output(vec![value]),
    }
}

const fn invoke(func: Function, args: Vec<Expr>, kwargs: Vec<(String, Expr)>) -> Expr {
    Expr::Invoke { func, args, kwargs }
}

// ── Delegate functions ───────────────────────────────────────────────

fn csrf_function() -> Function {
    Function::new("csrf_token", |_, args: Arguments| {
        let token = args.args.into_iter().next().unwrap_or(ContextValue::None);
        Ok(ContextValue::from(render_csrf_field(&token)))
    })
}

/// `gettext(message)` bound to the runtime's translator.
pub fn gettext_function(name: &'static str, runtime: &Arc<Runtime>) -> Function {
    let runtime = Arc::clone(runtime);
    Function::new(name, move |state, args: Arguments| {
        let message = args.require_str(name, 0)?;
        Ok(ContextValue::from(runtime.translator().gettext(&message, state.locale())))
    })
}

/// `pgettext(context, message)` bound to the runtime's translator.
pub fn pgettext_function(name: &'static str, runtime: &Arc<Runtime>) -> Function {
    let runtime = Arc::clone(runtime);
    Function::new(name, move |state, args: Arguments| {
        let context = args.require_str(name, 0)?;
        let message = args.require_str(name, 1)?;
        Ok(ContextValue::from(
            runtime
                .translator()
                .pgettext(&context, &message, state.locale()),
        ))
    })
}

fn now_function(runtime: &Arc<Runtime>) -> Function {
    let runtime = Arc::clone(runtime);
    Function::new("now", move |state, args: Arguments| {
        let format = args.require_str("now", 0)?;
        let now = runtime.now(state.locale());
        Ok(ContextValue::from(
            runtime.localizer().date_format(&now, &format, state.locale()),
        ))
    })
}

fn static_function(runtime: &Arc<Runtime>) -> Function {
    let runtime = Arc::clone(runtime);
    Function::new("static", move |_, args: Arguments| {
        let path = args.require_str("static", 0)?;
        Ok(ContextValue::from(runtime.statics().resolve(&path)))
    })
}

fn url_function(runtime: &Arc<Runtime>) -> Function {
    let runtime = Arc::clone(runtime);
    Function::new("url", move |_, args: Arguments| {
        let name = args.require_str("url", 0)?;
        tracing::debug!(view = %name, "reversing url");
        runtime
            .urls()
            .reverse(&name, &args.args[1..], &args.kwargs)
            .map(ContextValue::from)
            .map_err(|err| {
                tracing::warn!(view = %name, error = %err, "url reversal failed");
                err
            })
    })
}

// ── blocktrans ───────────────────────────────────────────────────────

struct BlockTransMessage {
    body: TransBody,
    context: Option<String>,
    count_name: Option<String>,
}

fn blocktrans_function(message: BlockTransMessage, runtime: &Arc<Runtime>) -> Function {
    let runtime = Arc::clone(runtime);
    Function::new("blocktrans", move |state, args: Arguments| {
        render_blocktrans(&message, &runtime, state, args).map(ContextValue::SafeString)
    })
}

fn render_blocktrans(
    message: &BlockTransMessage,
    runtime: &Runtime,
    state: &State<'_>,
    args: Arguments,
) -> JdjResult<String> {
    let locale = state.locale();
    let translator = runtime.translator();
    let singular = message.body.singular.as_str();
    let context = message.context.as_deref();

    let translated = match (&message.body.plural, &message.count_name) {
        (Some(plural), Some(count_name)) => {
            let raw = args
                .kwargs
                .iter()
                .rev()
                .find(|(key, _)| key == count_name)
                .map(|(_, value)| value);
            let count = count_value(raw)?;
            match context {
                Some(context) => translator.npgettext(context, singular, plural, count, locale),
                None => translator.ngettext(singular, plural, count, locale),
            }
        }
        _ => match context {
            Some(context) => translator.pgettext(context, singular, locale),
            None => translator.gettext(singular, locale),
        },
    };

    let values: HashMap<String, ContextValue> = args
        .kwargs
        .into_iter()
        .map(|(key, value)| (key, state.finalize(value)))
        .collect();
    interpolate(&translated, &values, state.env().auto_escape())
}

/// Reads the count binding as a number. Booleans count as 0 and 1.
#[allow(clippy::cast_precision_loss)]
fn count_value(value: Option<&ContextValue>) -> JdjResult<f64> {
    match value {
        Some(ContextValue::Integer(i)) => Ok(*i as f64),
        Some(ContextValue::Float(f)) if f.is_finite() => Ok(*f),
        Some(ContextValue::Bool(b)) => Ok(f64::from(u8::from(*b))),
        other => Err(JdjError::render(format!(
            "blocktrans count must be a number, got '{}'",
            other.map_or("none", ContextValue::type_name)
        ))),
    }
}

/// Substitutes `%(name)s` placeholders and unescapes `%%`.
///
/// # Errors
///
/// Returns a `RenderError` for a placeholder without a value and for any
/// other `%` sequence.
pub fn interpolate(
    message: &str,
    values: &HashMap<String, ContextValue>,
    escape: bool,
) -> JdjResult<String> {
    let malformed = || JdjError::render(format!("malformed placeholder in message '{message}'"));
    let mut out = String::with_capacity(message.len());
    let mut rest = message;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];
        if let Some(after) = rest.strip_prefix('%') {
            out.push('%');
            rest = after;
            continue;
        }
        let (name, after) = rest
            .strip_prefix('(')
            .and_then(|spec| spec.split_once(')'))
            .ok_or_else(malformed)?;
        rest = after.strip_prefix('s').ok_or_else(malformed)?;

        let value = values.get(name).ok_or_else(|| {
            JdjError::render(format!("message references unknown variable '{name}'"))
        })?;
        let text = value.to_display_string();
        if escape && !value.is_safe() {
            out.push_str(&escape_html(&text));
        } else {
            out.push_str(&text);
        }
    }

    out.push_str(rest);
    Ok(out)
}
