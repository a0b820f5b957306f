//! The template environment: compilation, caching, and rendering.
//!
//! An [`Environment`] holds everything templates are compiled and rendered
//! against: registered extensions and the tags they claim, template globals,
//! the output finalizer chain, the filter registry, the autoescape switch,
//! and a cache of named templates.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use jdj_core::error::{JdjError, JdjResult};
use jdj_core::locale::LocaleContext;
use jdj_core::logging::render_span;
use jdj_core::settings::Settings;

use crate::context::{Context, ContextValue};
use crate::extension::{Extension, Finalizer};
use crate::filters::{Filter, FilterRegistry};
use crate::function::Function;
use crate::lexer;
use crate::nodes::{render_nodes, Node};
use crate::parser::Parser;

/// A compiled template, independent of any environment borrow.
#[derive(Debug)]
pub struct CompiledTemplate {
    name: String,
    nodes: Vec<Node>,
}

impl CompiledTemplate {
    /// The template name (`<string>` for inline sources).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The top-level nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// A compiled template bound to the environment that compiled it.
#[derive(Debug, Clone)]
pub struct Template<'env> {
    env: &'env Environment,
    compiled: Arc<CompiledTemplate>,
}

impl Template<'_> {
    /// The template name.
    pub fn name(&self) -> &str {
        self.compiled.name()
    }

    /// Renders the template with `ctx`.
    ///
    /// Assignments made by the template (`set`, `as` targets) are left in
    /// `ctx`.
    ///
    /// # Errors
    ///
    /// Returns the first render-time error, e.g. a failed URL reversal.
    pub fn render(&self, ctx: &mut Context) -> JdjResult<String> {
        let span = render_span(self.name());
        let _guard = span.enter();
        let mut out = String::new();
        render_nodes(&self.compiled.nodes, self.env, ctx, &mut out)?;
        Ok(out)
    }

    /// Renders with an empty context under `locale`.
    ///
    /// # Errors
    ///
    /// See [`render`](Self::render).
    pub fn render_with_locale(&self, locale: LocaleContext) -> JdjResult<String> {
        self.render(&mut Context::with_locale(locale))
    }
}

/// The template environment.
///
/// # Examples
///
/// ```
/// use jdj_template::context::{Context, ContextValue};
/// use jdj_template::environment::Environment;
///
/// let env = Environment::new();
/// env.add_template("hello.html", "Hello {{ name }}!");
///
/// let mut ctx = Context::new();
/// ctx.set("name", ContextValue::from("World"));
///
/// let result = env.get_template("hello.html").unwrap().render(&mut ctx).unwrap();
/// assert_eq!(result, "Hello World!");
/// ```
pub struct Environment {
    extensions: Vec<Arc<dyn Extension>>,
    tags: HashMap<String, Arc<dyn Extension>>,
    globals: HashMap<String, ContextValue>,
    finalizers: Vec<Arc<dyn Finalizer>>,
    filters: FilterRegistry,
    auto_escape: bool,
    sources: RwLock<HashMap<String, String>>,
    cache: RwLock<HashMap<String, Arc<CompiledTemplate>>>,
}

impl Environment {
    /// Creates an environment with the built-in filters, no extensions and
    /// autoescape off.
    pub fn new() -> Self {
        Self {
            extensions: Vec::new(),
            tags: HashMap::new(),
            globals: HashMap::new(),
            finalizers: Vec::new(),
            filters: FilterRegistry::with_builtins(),
            auto_escape: false,
            sources: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an environment configured from `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut env = Self::new();
        env.auto_escape = settings.auto_escape;
        env
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Registers an extension: calls its `install` hook, then claims its
    /// tags. A later extension claiming the same tag wins.
    pub fn add_extension(&mut self, extension: impl Extension + 'static) {
        let extension: Arc<dyn Extension> = Arc::new(extension);
        extension.install(self);
        for tag in extension.tags() {
            self.tags.insert((*tag).to_string(), Arc::clone(&extension));
        }
        tracing::debug!(
            extension = extension.name(),
            tags = ?extension.tags(),
            "registered extension"
        );
        self.extensions.push(extension);
    }

    /// Builder form of [`add_extension`](Self::add_extension).
    #[must_use]
    pub fn with_extension(mut self, extension: impl Extension + 'static) -> Self {
        self.add_extension(extension);
        self
    }

    /// Names of the registered extensions, in registration order.
    pub fn extension_names(&self) -> Vec<&str> {
        self.extensions.iter().map(|e| e.name()).collect()
    }

    /// The extension claiming `tag`, if any.
    pub fn extension_for(&self, tag: &str) -> Option<&Arc<dyn Extension>> {
        self.tags.get(tag)
    }

    /// Sets a template global.
    pub fn add_global(&mut self, name: impl Into<String>, value: impl Into<ContextValue>) {
        self.globals.insert(name.into(), value.into());
    }

    /// Registers a global function.
    pub fn add_function(&mut self, function: Function) {
        self.globals
            .insert(function.name().to_string(), ContextValue::Function(function));
    }

    /// Looks up a template global.
    pub fn global(&self, name: &str) -> Option<&ContextValue> {
        self.globals.get(name)
    }

    /// Appends a finalizer; finalizers run in registration order.
    pub fn add_finalizer(&mut self, finalizer: impl Finalizer + 'static) {
        self.finalizers.push(Arc::new(finalizer));
    }

    /// Number of installed finalizers.
    pub fn finalizer_count(&self) -> usize {
        self.finalizers.len()
    }

    /// Runs `value` through every finalizer in order.
    pub fn finalize(&self, value: ContextValue, locale: &LocaleContext) -> ContextValue {
        self.finalizers
            .iter()
            .fold(value, |value, f| f.finalize(value, locale))
    }

    /// Registers a filter.
    pub fn add_filter(&mut self, filter: Box<dyn Filter>) {
        self.filters.register(filter);
    }

    /// The filter registry.
    pub const fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// Whether output is HTML-escaped.
    pub const fn auto_escape(&self) -> bool {
        self.auto_escape
    }

    /// Turns HTML autoescaping on or off.
    pub fn set_auto_escape(&mut self, enabled: bool) {
        self.auto_escape = enabled;
    }

    // ── Templates ────────────────────────────────────────────────────

    /// Compiles an inline template source.
    ///
    /// # Errors
    ///
    /// Returns a `TemplateSyntaxError` for malformed sources.
    pub fn from_string(&self, source: &str) -> JdjResult<Template<'_>> {
        let compiled = self.compile("<string>", source)?;
        Ok(Template {
            env: self,
            compiled: Arc::new(compiled),
        })
    }

    /// Registers a named template source, dropping any cached compilation.
    pub fn add_template(&self, name: &str, source: &str) {
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), source.to_string());
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    /// Returns the named template, compiling it on first use.
    ///
    /// # Errors
    ///
    /// Returns `TemplateDoesNotExist` for unknown names and any compile
    /// error of the source.
    pub fn get_template(&self, name: &str) -> JdjResult<Template<'_>> {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        if let Some(compiled) = cached {
            return Ok(Template {
                env: self,
                compiled,
            });
        }

        let source = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| {
                JdjError::TemplateDoesNotExist(format!("Template '{name}' could not be found"))
            })?;
        let compiled = Arc::new(self.compile(name, &source)?);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::clone(&compiled));
        Ok(Template {
            env: self,
            compiled,
        })
    }

    fn compile(&self, name: &str, source: &str) -> JdjResult<CompiledTemplate> {
        let tokens = lexer::tokenize(source)?;
        let nodes = Parser::new(self, tokens).parse()?;
        tracing::debug!(template = name, nodes = nodes.len(), "compiled template");
        Ok(CompiledTemplate {
            name: name.to_string(),
            nodes,
        })
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.tags.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("Environment")
            .field("extensions", &self.extension_names())
            .field("tags", &tags)
            .field("finalizers", &self.finalizers.len())
            .field("auto_escape", &self.auto_escape)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::function::Arguments;

    fn render(env: &Environment, source: &str, ctx: &mut Context) -> String {
        env.from_string(source).unwrap().render(ctx).unwrap()
    }

    struct Shout;
    impl Extension for Shout {
        fn name(&self) -> &str {
            "shout"
        }
        fn tags(&self) -> &'static [&'static str] {
            &["shout"]
        }
        fn install(&self, env: &mut Environment) {
            env.add_global("volume", 11i64);
        }
        fn parse(&self, parser: &mut Parser<'_>) -> JdjResult<Node> {
            parser.stream().expect_name("shout")?;
            let value = parser.parse_expression()?;
            Ok(Node::Output(vec![Expr::Filter {
                expr: Box::new(value),
                name: "upper".into(),
                args: vec![],
            }]))
        }
    }

    struct Brackets;
    impl Finalizer for Brackets {
        fn finalize(&self, value: ContextValue, _locale: &LocaleContext) -> ContextValue {
            ContextValue::String(format!("[{value}]"))
        }
    }

    #[test]
    fn test_basic_render() {
        let env = Environment::new();
        let mut ctx = Context::from_pairs([("name", "World")]);
        assert_eq!(render(&env, "Hello {{ name }}!", &mut ctx), "Hello World!");
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let env = Environment::new();
        assert_eq!(render(&env, "[{{ nope }}]", &mut Context::new()), "[]");
    }

    #[test]
    fn test_extension_tag_and_install() {
        let env = Environment::new().with_extension(Shout);
        let mut ctx = Context::from_pairs([("who", "bob")]);
        assert_eq!(render(&env, "{% shout who %} {{ volume }}", &mut ctx), "BOB 11");
        assert_eq!(env.extension_names(), vec!["shout"]);
        assert!(env.extension_for("shout").is_some());
    }

    #[test]
    fn test_finalizer_runs_on_output_only() {
        let mut env = Environment::new();
        env.add_finalizer(Brackets);
        env.add_finalizer(Brackets);
        assert_eq!(env.finalizer_count(), 2);
        assert_eq!(render(&env, "a{{ 1 }}b", &mut Context::new()), "a[[1]]b");
    }

    #[test]
    fn test_auto_escape() {
        let mut env = Environment::new();
        let mut ctx = Context::from_pairs([("html", "<b>")]);
        assert_eq!(render(&env, "{{ html }}", &mut ctx), "<b>");
        env.set_auto_escape(true);
        assert_eq!(render(&env, "{{ html }}", &mut ctx), "&lt;b&gt;");
        assert_eq!(render(&env, "{{ html|safe }}", &mut ctx), "<b>");
    }

    #[test]
    fn test_from_settings_auto_escape() {
        let mut settings = Settings::default();
        settings.auto_escape = true;
        assert!(Environment::from_settings(&settings).auto_escape());
        assert!(!Environment::new().auto_escape());
    }

    #[test]
    fn test_global_function() {
        let mut env = Environment::new();
        env.add_function(Function::new("double", |_, args: Arguments| {
            let n = args.require("double", 0)?.as_integer().unwrap_or(0);
            Ok(ContextValue::Integer(n * 2))
        }));
        assert_eq!(render(&env, "{{ double(21) }}", &mut Context::new()), "42");
    }

    #[test]
    fn test_set_and_for() {
        let env = Environment::new();
        let mut ctx = Context::from_pairs([("items", vec!["a", "b", "c"])]);
        let out = render(
            &env,
            "{% set sep = '-' %}{% for i in items %}{{ i }}{% if not loop.last %}{{ sep }}{% endif %}{% endfor %}",
            &mut ctx,
        );
        assert_eq!(out, "a-b-c");
    }

    #[test]
    fn test_named_template_cache() {
        let env = Environment::new();
        env.add_template("a.html", "one");
        assert_eq!(
            env.get_template("a.html").unwrap().render(&mut Context::new()).unwrap(),
            "one"
        );
        env.add_template("a.html", "two");
        assert_eq!(
            env.get_template("a.html").unwrap().render(&mut Context::new()).unwrap(),
            "two"
        );
    }

    #[test]
    fn test_missing_template() {
        let env = Environment::new();
        let err = env.get_template("nope.html").unwrap_err();
        assert!(matches!(err, JdjError::TemplateDoesNotExist(_)));
    }

    #[test]
    fn test_compile_error_has_line() {
        let env = Environment::new();
        let err = env.from_string("a\n\n{% bogus %}").unwrap_err();
        assert_eq!(err.lineno(), Some(3));
    }

    #[test]
    fn test_templates_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Environment>();
        assert_send_sync::<CompiledTemplate>();
    }
}
