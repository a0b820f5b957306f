//! Executable template nodes and the render loop.

use std::collections::HashMap;

use jdj_core::error::JdjResult;

use crate::context::{escape_html, Context, ContextValue};
use crate::environment::Environment;
use crate::expr::Expr;
use crate::function::State;

/// One node of a compiled template.
#[derive(Debug, Clone)]
pub enum Node {
    /// Literal template text, emitted verbatim.
    Text(String),
    /// Evaluate each expression, finalize, escape if needed, and emit.
    Output(Vec<Expr>),
    /// Bind the value of an expression in the current scope.
    Assign {
        /// Variable name.
        target: String,
        /// Value expression.
        value: Expr,
    },
    /// `{% if %}` / `{% elif %}` / `{% else %}`.
    If {
        /// Condition and body pairs, tested in order.
        branches: Vec<(Expr, Vec<Node>)>,
        /// Rendered when no branch matched.
        else_body: Vec<Node>,
    },
    /// `{% for x in items %}` with optional `{% else %}`.
    For {
        /// Loop variable.
        target: String,
        /// Iterated expression.
        iter: Expr,
        /// Loop body.
        body: Vec<Node>,
        /// Rendered when the iterable is empty.
        else_body: Vec<Node>,
    },
}

/// Renders `nodes` into `out`.
///
/// # Errors
///
/// Stops at the first failing expression and returns its error.
pub fn render_nodes(
    nodes: &[Node],
    env: &Environment,
    ctx: &mut Context,
    out: &mut String,
) -> JdjResult<()> {
    for node in nodes {
        render_node(node, env, ctx, out)?;
    }
    Ok(())
}

fn render_node(node: &Node, env: &Environment, ctx: &mut Context, out: &mut String) -> JdjResult<()> {
    match node {
        Node::Text(text) => out.push_str(text),
        Node::Output(exprs) => {
            for expr in exprs {
                let value = expr.eval(&State::new(env, ctx))?;
                let value = env.finalize(value, ctx.locale());
                if env.auto_escape() && !value.is_safe() {
                    out.push_str(&escape_html(&value.to_display_string()));
                } else {
                    out.push_str(&value.to_display_string());
                }
            }
        }
        Node::Assign { target, value } => {
            let value = value.eval(&State::new(env, ctx))?;
            ctx.set(target.clone(), value);
        }
        Node::If { branches, else_body } => {
            for (condition, body) in branches {
                if condition.eval(&State::new(env, ctx))?.is_truthy() {
                    return render_nodes(body, env, ctx, out);
                }
            }
            render_nodes(else_body, env, ctx, out)?;
        }
        Node::For {
            target,
            iter,
            body,
            else_body,
        } => {
            let items = iterable(iter.eval(&State::new(env, ctx))?);
            if items.is_empty() {
                return render_nodes(else_body, env, ctx, out);
            }
            let length = items.len();
            ctx.push();
            let result = items.into_iter().enumerate().try_for_each(|(idx, item)| {
                ctx.set(target.clone(), item);
                ctx.set("loop", loop_info(idx, length));
                render_nodes(body, env, ctx, out)
            });
            ctx.pop();
            result?;
        }
    }
    Ok(())
}

fn iterable(value: ContextValue) -> Vec<ContextValue> {
    match value {
        ContextValue::List(items) => items,
        ContextValue::Dict(map) => {
            let mut keys: Vec<String> = map.into_keys().collect();
            keys.sort();
            keys.into_iter().map(ContextValue::String).collect()
        }
        ContextValue::String(s) | ContextValue::SafeString(s) => s
            .chars()
            .map(|c| ContextValue::String(c.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

fn loop_info(idx: usize, length: usize) -> ContextValue {
    let mut info = HashMap::new();
    info.insert("index".to_string(), ContextValue::from(idx + 1));
    info.insert("index0".to_string(), ContextValue::from(idx));
    info.insert("first".to_string(), ContextValue::Bool(idx == 0));
    info.insert("last".to_string(), ContextValue::Bool(idx + 1 == length));
    info.insert("length".to_string(), ContextValue::from(length));
    ContextValue::Dict(info)
}
