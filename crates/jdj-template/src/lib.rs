//! # jdj-template
//!
//! A small Jinja-style template engine that the jdj tag extensions plug
//! into. It provides exactly the surface those extensions need: a positioned
//! lexer, a token stream with Jinja's cursor operations, an expression parser,
//! executable nodes, a render loop with output finalizers, filters, template
//! globals, and a registry of tag extensions.
//!
//! ## Modules
//!
//! - [`lexer`] - Tokenizes template source into positioned tokens
//! - [`stream`] - Cursor over tokens used by statement and tag parsers
//! - [`parser`] - Builds nodes and expressions; dispatches extension tags
//! - [`expr`] - Expression AST and evaluation
//! - [`nodes`] - Executable nodes and the render loop
//! - [`context`] - Template values and the scoped render context
//! - [`function`] - Callables exposed to templates
//! - [`filters`] - Built-in filters and the filter registry
//! - [`extension`] - The `Extension` and `Finalizer` traits
//! - [`environment`] - Compilation, caching, and rendering
//!
//! ## Quick Start
//!
//! ```
//! use jdj_template::{Context, ContextValue, Environment};
//!
//! let env = Environment::new();
//! let template = env.from_string("Hello {{ name|upper }}!").unwrap();
//!
//! let mut ctx = Context::new();
//! ctx.set("name", ContextValue::from("world"));
//! assert_eq!(template.render(&mut ctx).unwrap(), "Hello WORLD!");
//! ```

pub mod context;
pub mod environment;
pub mod expr;
pub mod extension;
pub mod filters;
pub mod function;
pub mod lexer;
pub mod nodes;
pub mod parser;
pub mod stream;

pub use context::{Context, ContextValue};
pub use environment::{CompiledTemplate, Environment, Template};
pub use expr::Expr;
pub use extension::{Extension, Finalizer};
pub use function::{Arguments, Function, State};
pub use nodes::Node;
pub use parser::Parser;
