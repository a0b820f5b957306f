//! Extension points of the environment.
//!
//! An [`Extension`] claims a set of tag names. When the parser meets
//! `{% name ... %}` for a claimed name it hands itself to the extension with
//! the cursor on the tag name; the extension consumes its arguments and
//! returns a [`Node`]. The parser then expects the closing `%}`.
//!
//! A [`Finalizer`] post-processes every value an output expression produces,
//! before it is escaped and converted to text.

use jdj_core::error::JdjResult;
use jdj_core::locale::LocaleContext;

use crate::context::ContextValue;
use crate::environment::Environment;
use crate::nodes::Node;
use crate::parser::Parser;

/// A tag extension registered with an [`Environment`].
pub trait Extension: Send + Sync {
    /// A short name used in logs.
    fn name(&self) -> &str;

    /// The tag names this extension parses.
    fn tags(&self) -> &'static [&'static str];

    /// Called once when the extension is added. Extensions install globals,
    /// filters or finalizers here.
    fn install(&self, _env: &mut Environment) {}

    /// Parses one tag occurrence. The stream's current token is the tag name.
    ///
    /// # Errors
    ///
    /// Returns a `TemplateSyntaxError` for malformed tags.
    fn parse(&self, parser: &mut Parser<'_>) -> JdjResult<Node>;
}

/// A hook applied to every output value.
pub trait Finalizer: Send + Sync {
    /// Transforms `value` for output under `locale`.
    fn finalize(&self, value: ContextValue, locale: &LocaleContext) -> ContextValue;
}
