//! Expression AST and its evaluator.
//!
//! Expressions are built by the parser (or by extensions, which may bind a
//! [`Function`] directly through [`Expr::Invoke`]) and evaluated against the
//! render [`State`] each time the template renders.

use std::cmp::Ordering;

use jdj_core::error::{JdjError, JdjResult};

use crate::context::ContextValue;
use crate::function::{Arguments, Function, State};

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `~` (string concatenation)
    Concat,
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
    /// `and`
    And,
    /// `or`
    Or,
}

/// An expression node.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A literal value.
    Const(ContextValue),
    /// A variable lookup (context first, then environment globals).
    Name(String),
    /// `expr.attr`
    Getattr(Box<Expr>, String),
    /// `expr[key]`
    Getitem(Box<Expr>, Box<Expr>),
    /// `expr|name(args)`
    Filter {
        /// The filtered value.
        expr: Box<Expr>,
        /// Registered filter name.
        name: String,
        /// Filter arguments.
        args: Vec<Expr>,
    },
    /// A call of a callable template value: `func(args, key=value)`.
    Call {
        /// Expression producing the callable.
        func: Box<Expr>,
        /// Positional arguments.
        args: Vec<Expr>,
        /// Keyword arguments, in call order.
        kwargs: Vec<(String, Expr)>,
    },
    /// A call of a function bound at compile time.
    Invoke {
        /// The bound function.
        func: Function,
        /// Positional arguments.
        args: Vec<Expr>,
        /// Keyword arguments, in call order.
        kwargs: Vec<(String, Expr)>,
    },
    /// Marks the result safe from autoescaping.
    MarkSafe(Box<Expr>),
    /// `[a, b, c]`
    List(Vec<Expr>),
    /// `not expr`
    Not(Box<Expr>),
    /// `-expr`
    Neg(Box<Expr>),
    /// `left <op> right`
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
}

impl Expr {
    /// Convenience constructor for a constant.
    pub fn constant(value: impl Into<ContextValue>) -> Self {
        Self::Const(value.into())
    }

    /// Returns the constant string if this is a string literal.
    pub fn as_const_str(&self) -> Option<&str> {
        match self {
            Self::Const(value) => value.as_str(),
            _ => None,
        }
    }

    /// Evaluates the expression.
    ///
    /// Undefined names and missing attributes evaluate to `None`.
    ///
    /// # Errors
    ///
    /// Returns a `RenderError` for unknown filters, calls of non-callables and
    /// invalid operands; errors raised by called functions propagate
    /// unchanged.
    pub fn eval(&self, state: &State<'_>) -> JdjResult<ContextValue> {
        match self {
            Self::Const(value) => Ok(value.clone()),
            Self::Name(name) => Ok(lookup_name(state, name)),
            Self::Getattr(base, attr) => {
                let base = base.eval(state)?;
                Ok(base.resolve_path(attr).cloned().unwrap_or(ContextValue::None))
            }
            Self::Getitem(base, key) => {
                let base = base.eval(state)?;
                let key = key.eval(state)?;
                Ok(get_item(&base, &key))
            }
            Self::Filter { expr, name, args } => {
                let value = expr.eval(state)?;
                let args = eval_all(args, state)?;
                state.env().filters().apply(name, &value, &args)
            }
            Self::Call { func, args, kwargs } => match func.eval(state)? {
                ContextValue::Function(function) => {
                    function.call(state, eval_arguments(args, kwargs, state)?)
                }
                other => Err(JdjError::render(format!(
                    "'{}' object is not callable",
                    other.type_name()
                ))),
            },
            Self::Invoke { func, args, kwargs } => {
                func.call(state, eval_arguments(args, kwargs, state)?)
            }
            Self::MarkSafe(inner) => Ok(inner.eval(state)?.mark_safe()),
            Self::List(items) => Ok(ContextValue::List(eval_all(items, state)?)),
            Self::Not(inner) => Ok(ContextValue::Bool(!inner.eval(state)?.is_truthy())),
            Self::Neg(inner) => match inner.eval(state)? {
                ContextValue::Integer(i) => Ok(ContextValue::Integer(-i)),
                ContextValue::Float(f) => Ok(ContextValue::Float(-f)),
                other => Err(JdjError::render(format!(
                    "bad operand type for unary -: '{}'",
                    other.type_name()
                ))),
            },
            Self::Binary(left, op, right) => eval_binary(state, left, *op, right),
        }
    }
}

fn lookup_name(state: &State<'_>, name: &str) -> ContextValue {
    state
        .context()
        .get(name)
        .or_else(|| state.env().global(name))
        .cloned()
        .unwrap_or(ContextValue::None)
}

fn get_item(base: &ContextValue, key: &ContextValue) -> ContextValue {
    let found = match (base, key) {
        (ContextValue::List(list), ContextValue::Integer(idx)) => {
            let len = i64::try_from(list.len()).unwrap_or(i64::MAX);
            let idx = if *idx < 0 { len + idx } else { *idx };
            usize::try_from(idx).ok().and_then(|i| list.get(i))
        }
        (ContextValue::Dict(map), key) => map.get(&key.to_display_string()),
        _ => None,
    };
    found.cloned().unwrap_or(ContextValue::None)
}

fn eval_all(exprs: &[Expr], state: &State<'_>) -> JdjResult<Vec<ContextValue>> {
    exprs.iter().map(|e| e.eval(state)).collect()
}

fn eval_arguments(
    args: &[Expr],
    kwargs: &[(String, Expr)],
    state: &State<'_>,
) -> JdjResult<Arguments> {
    Ok(Arguments {
        args: eval_all(args, state)?,
        kwargs: kwargs
            .iter()
            .map(|(k, e)| Ok((k.clone(), e.eval(state)?)))
            .collect::<JdjResult<_>>()?,
    })
}

fn eval_binary(
    state: &State<'_>,
    left: &Expr,
    op: BinaryOp,
    right: &Expr,
) -> JdjResult<ContextValue> {
    let l = left.eval(state)?;
    // `and` / `or` short-circuit and return one of their operands.
    let r = match op {
        BinaryOp::And if !l.is_truthy() => return Ok(l),
        BinaryOp::Or if l.is_truthy() => return Ok(l),
        BinaryOp::And | BinaryOp::Or => return right.eval(state),
        _ => right.eval(state)?,
    };
    let value = match op {
        BinaryOp::Concat => {
            ContextValue::String(format!("{}{}", l.to_display_string(), r.to_display_string()))
        }
        BinaryOp::Eq => ContextValue::Bool(l == r),
        BinaryOp::Ne => ContextValue::Bool(l != r),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&l, &r).ok_or_else(|| {
                JdjError::render(format!(
                    "cannot compare '{}' with '{}'",
                    l.type_name(),
                    r.type_name()
                ))
            })?;
            ContextValue::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
        _ => arithmetic(&l, op, &r)?,
    };
    Ok(value)
}

fn arithmetic(l: &ContextValue, op: BinaryOp, r: &ContextValue) -> JdjResult<ContextValue> {
    let overflow = || JdjError::render("integer overflow");
    match (l, r) {
        (ContextValue::Integer(a), ContextValue::Integer(b)) => {
            let result = if op == BinaryOp::Add {
                a.checked_add(*b)
            } else {
                a.checked_sub(*b)
            };
            result.map(ContextValue::Integer).ok_or_else(overflow)
        }
        _ if op == BinaryOp::Add && l.as_str().is_some() && r.as_str().is_some() => Ok(
            ContextValue::String(format!("{}{}", l.to_display_string(), r.to_display_string())),
        ),
        _ if l.is_number() && r.is_number() => {
            let (a, b) = (l.as_float().unwrap_or(0.0), r.as_float().unwrap_or(0.0));
            Ok(ContextValue::Float(if op == BinaryOp::Add { a + b } else { a - b }))
        }
        _ => Err(JdjError::render(format!(
            "unsupported operand types for {}: '{}' and '{}'",
            if op == BinaryOp::Add { "+" } else { "-" },
            l.type_name(),
            r.type_name()
        ))),
    }
}

fn compare(l: &ContextValue, r: &ContextValue) -> Option<Ordering> {
    match (l, r) {
        _ if l.is_number() && r.is_number() => l.as_float()?.partial_cmp(&r.as_float()?),
        (ContextValue::DateTime(a), ContextValue::DateTime(b)) => Some(a.cmp(b)),
        _ => Some(l.as_str()?.cmp(r.as_str()?)),
    }
}
