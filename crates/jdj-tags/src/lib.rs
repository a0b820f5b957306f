//! # jdj-tags
//!
//! Django's `csrf_token`, `trans`, `blocktrans`, `now`, `static` and `url`
//! template tags, plus output localization, as extensions of the jdj template
//! engine.
//!
//! Tags are parsed into [`call::CallNode`]s through the [`stream::TagStream`]
//! adapter, then emitted as host nodes that call the delegates of a
//! [`runtime::Runtime`] at render time. Translation catalogs, URL routing,
//! static storage and locale formatting are never implemented here; they are
//! injected.
//!
//! ## Modules
//!
//! - [`stream`] - Tag lexer adapter over the host token stream
//! - [`call`] - Tag kinds and the parsed call node
//! - [`parsers`] - One grammar per tag
//! - [`emit`] - Turns call nodes into executable nodes
//! - [`runtime`] - Delegate traits, defaults and the `Runtime` bundle
//! - [`l10n`] - Output finalizers for time zones and localization
//! - [`dateformat`] - Django date format strings
//! - [`extension`] - Extension bundles registered with the environment
//!
//! ## Quick Start
//!
//! ```
//! use jdj_tags::extension::{Bundle, TagExtension};
//! use jdj_tags::runtime::Runtime;
//! use jdj_template::{Context, Environment};
//!
//! let env = Environment::new().with_extension(TagExtension::new(Bundle::Compat, Runtime::new()));
//! let template = env
//!     .from_string("{% trans 'Hello' as hi %}{{ hi }}, {% static 'logo.png' %}")
//!     .unwrap();
//! assert_eq!(template.render(&mut Context::new()).unwrap(), "Hello, /static/logo.png");
//! ```

pub mod call;
pub mod dateformat;
pub mod emit;
pub mod extension;
pub mod l10n;
pub mod parsers;
pub mod runtime;
pub mod stream;

pub use call::{CallNode, TagKind};
pub use extension::{Bundle, TagExtension};
pub use runtime::Runtime;
