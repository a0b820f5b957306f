//! # jdj
//!
//! Django's template tags for a Jinja-style template engine.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on `jdj`
//! for everything, or on individual crates for finer-grained control.
//!
//! ## Quick Start
//!
//! ```
//! use jdj::prelude::*;
//!
//! let runtime = Runtime::new().with_statics(StaticPrefix::new("/assets/"));
//! let env = Environment::new().with_extension(TagExtension::new(Bundle::Compat, runtime));
//!
//! let out = env
//!     .from_string("{% static 'app.css' %} {% trans 'Save' %}")
//!     .unwrap()
//!     .render(&mut Context::new())
//!     .unwrap();
//! assert_eq!(out, "/assets/app.css Save");
//! ```

/// Errors, settings, locale state and logging setup.
pub use jdj_core as core;

/// The host template engine: lexer, parser, extensions, rendering.
pub use jdj_template as template;

/// The Django tag extensions and their delegate runtime.
#[cfg(feature = "tags")]
pub use jdj_tags as tags;

/// Recording fakes and environment builders for tests.
#[cfg(feature = "test-util")]
pub use jdj_test as test;

// Third-party re-exports
pub use chrono;
pub use serde_json;
pub use tracing;
pub use tracing_subscriber;

/// Commonly used types.
pub mod prelude {
    pub use jdj_core::error::{JdjError, JdjResult};
    pub use jdj_core::locale::LocaleContext;
    pub use jdj_core::settings::Settings;
    pub use jdj_template::{Context, ContextValue, Environment, Extension, Finalizer};

    #[cfg(feature = "tags")]
    pub use jdj_tags::runtime::{
        Clock, Localizer, StaticPrefix, StaticResolver, Translator, UrlReverser,
    };
    #[cfg(feature = "tags")]
    pub use jdj_tags::{Bundle, Runtime, TagExtension};
}
