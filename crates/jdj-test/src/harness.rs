//! Environment builders for tag tests.
//!
//! [`TestRuntime`] keeps a handle on every fake so a test can render through
//! a real [`Environment`] and then assert on what the delegates saw.
//!
//! ```
//! use jdj_tags::Bundle;
//! use jdj_test::harness::environment;
//! use jdj_test::recording::TranslationCall;
//!
//! let (env, fakes) = environment(Bundle::I18n);
//! let out = jdj_test::harness::render(&env, "{% trans 'Hi' %}", []).unwrap();
//! assert_eq!(out, "Hi - translated");
//! fakes.translator.log().assert_called_with(&TranslationCall::gettext("Hi"));
//! ```

use std::sync::Arc;

use jdj_core::error::JdjResult;
use jdj_core::locale::LocaleContext;
use jdj_tags::{Bundle, Runtime, TagExtension};
use jdj_template::{Context, ContextValue, Environment};

use crate::fakes::{DecimalLocalizer, FixedClock, PrefixStatic, RecordingTranslator, RecordingUrls};

/// Every fake delegate, sharing logs with the runtime built from it.
#[derive(Debug, Clone, Default)]
pub struct TestRuntime {
    pub translator: RecordingTranslator,
    pub urls: RecordingUrls,
    pub statics: PrefixStatic,
    pub localizer: DecimalLocalizer,
    pub clock: FixedClock,
}

impl TestRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the URL fake, e.g. with one that has missing routes.
    #[must_use]
    pub fn with_urls(mut self, urls: RecordingUrls) -> Self {
        self.urls = urls;
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub const fn with_clock(mut self, clock: FixedClock) -> Self {
        self.clock = clock;
        self
    }

    /// A runtime over clones of the fakes.
    pub fn runtime(&self) -> Runtime {
        Runtime::new()
            .with_translator(self.translator.clone())
            .with_urls(self.urls.clone())
            .with_statics(self.statics.clone())
            .with_localizer(self.localizer.clone())
            .with_clock(self.clock)
    }

    /// An environment with `bundles` registered over one shared runtime.
    pub fn environment(&self, bundles: &[Bundle]) -> Environment {
        let runtime = Arc::new(self.runtime());
        let mut env = Environment::new();
        for bundle in bundles {
            env.add_extension(TagExtension::shared(*bundle, Arc::clone(&runtime)));
        }
        env
    }
}

/// A fresh set of fakes.
pub fn runtime() -> TestRuntime {
    TestRuntime::new()
}

/// An environment with one bundle over fresh fakes.
pub fn environment(bundle: Bundle) -> (Environment, TestRuntime) {
    let fakes = TestRuntime::new();
    (fakes.environment(&[bundle]), fakes)
}

/// Compiles and renders `source` with the given variables.
///
/// # Errors
///
/// Returns compile and render errors unchanged.
pub fn render<'a, I>(env: &Environment, source: &str, vars: I) -> JdjResult<String>
where
    I: IntoIterator<Item = (&'a str, ContextValue)>,
{
    let mut ctx = Context::from_pairs(vars);
    env.from_string(source)?.render(&mut ctx)
}

/// Like [`render`] under `locale`.
///
/// # Errors
///
/// Returns compile and render errors unchanged.
pub fn render_in<'a, I>(
    env: &Environment,
    source: &str,
    vars: I,
    locale: LocaleContext,
) -> JdjResult<String>
where
    I: IntoIterator<Item = (&'a str, ContextValue)>,
{
    let mut ctx = Context::from_pairs(vars).locale_context(locale);
    env.from_string(source)?.render(&mut ctx)
}

/// A locale for `language` in UTC with localization on.
pub fn locale(language: &str) -> LocaleContext {
    LocaleContext::new(language)
}
