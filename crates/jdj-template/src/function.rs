//! Callables exposed to templates.
//!
//! A [`Function`] is a named, shareable closure invoked with the render
//! [`State`] and evaluated [`Arguments`]. Template globals such as `gettext`
//! and the delegates bound by tag extensions are both functions.

use std::fmt;
use std::sync::Arc;

use jdj_core::error::{JdjError, JdjResult};
use jdj_core::locale::LocaleContext;

use crate::context::{Context, ContextValue};
use crate::environment::Environment;

type Callable = dyn Fn(&State<'_>, Arguments) -> JdjResult<ContextValue> + Send + Sync;

/// A named callable value.
#[derive(Clone)]
pub struct Function {
    name: Arc<str>,
    func: Arc<Callable>,
}

impl Function {
    /// Wraps a closure under `name`.
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&State<'_>, Arguments) -> JdjResult<ContextValue> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// The name used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the function.
    ///
    /// # Errors
    ///
    /// Propagates whatever the wrapped closure returns.
    pub fn call(&self, state: &State<'_>, args: Arguments) -> JdjResult<ContextValue> {
        (self.func)(state, args)
    }

    /// Returns `true` if both handles wrap the same closure.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish()
    }
}

/// What a function sees of the render in progress.
#[derive(Clone, Copy)]
pub struct State<'a> {
    env: &'a Environment,
    context: &'a Context,
}

impl<'a> State<'a> {
    /// Creates a state view.
    pub const fn new(env: &'a Environment, context: &'a Context) -> Self {
        Self { env, context }
    }

    /// The environment rendering the template.
    pub const fn env(&self) -> &'a Environment {
        self.env
    }

    /// The variables visible at the call site.
    pub const fn context(&self) -> &'a Context {
        self.context
    }

    /// The render locale.
    pub const fn locale(&self) -> &'a LocaleContext {
        self.context.locale()
    }

    /// Runs `value` through the environment's finalizers.
    pub fn finalize(&self, value: ContextValue) -> ContextValue {
        self.env.finalize(value, self.context.locale())
    }
}

impl fmt::Debug for State<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("locale", self.context.locale())
            .finish_non_exhaustive()
    }
}

/// Evaluated call arguments: positional values and ordered keyword values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    /// Positional values, in call order.
    pub args: Vec<ContextValue>,
    /// Keyword values, in call order; names are unique.
    pub kwargs: Vec<(String, ContextValue)>,
}

impl Arguments {
    /// Positional-only arguments.
    pub const fn positional(args: Vec<ContextValue>) -> Self {
        Self {
            args,
            kwargs: Vec::new(),
        }
    }

    /// Looks up a keyword argument.
    pub fn kwarg(&self, name: &str) -> Option<&ContextValue> {
        self.kwargs.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Returns positional argument `idx` or fails naming `func`.
    ///
    /// # Errors
    ///
    /// Returns a `RenderError` if fewer than `idx + 1` positional arguments
    /// were passed.
    pub fn require(&self, func: &str, idx: usize) -> JdjResult<&ContextValue> {
        self.args.get(idx).ok_or_else(|| {
            JdjError::render(format!(
                "{func}() takes at least {} positional argument(s), {} given",
                idx + 1,
                self.args.len()
            ))
        })
    }

    /// Returns positional argument `idx` as a string or fails naming `func`.
    ///
    /// # Errors
    ///
    /// Returns a `RenderError` if the argument is missing.
    pub fn require_str(&self, func: &str, idx: usize) -> JdjResult<String> {
        self.require(func, idx).map(ContextValue::to_display_string)
    }
}
