//! Runtime delegate bindings.
//!
//! The tags never translate, reverse URLs, resolve static files or format
//! values themselves; they call the delegates bundled in a [`Runtime`]. A
//! runtime is built once, before templates are compiled, and shared by every
//! tag extension registered with an environment. Each delegate is a
//! `Send + Sync` trait object so compiled templates can render on many
//! threads at once.
//!
//! The defaults are deliberately plain: identity translation with the English
//! plural rule, no URL table, a `STATIC_URL` prefix join, numbers printed
//! as-is with datetimes in Django's default format, and the system clock.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use jdj_core::error::{JdjError, JdjResult};
use jdj_core::locale::LocaleContext;
use jdj_core::settings::Settings;
use jdj_template::ContextValue;

use crate::dateformat;

/// Message catalog lookups.
pub trait Translator: Send + Sync {
    /// Translates `message`.
    fn gettext(&self, message: &str, locale: &LocaleContext) -> String;

    /// Translates `message` disambiguated by `context`.
    fn pgettext(&self, context: &str, message: &str, locale: &LocaleContext) -> String;

    /// Selects and translates the form of a message for `count`.
    ///
    /// `count` may be fractional; plural rules decide how such counts read.
    fn ngettext(&self, singular: &str, plural: &str, count: f64, locale: &LocaleContext)
        -> String;

    /// [`ngettext`](Self::ngettext) with a disambiguating context.
    fn npgettext(
        &self,
        context: &str,
        singular: &str,
        plural: &str,
        count: f64,
        locale: &LocaleContext,
    ) -> String;
}

/// Reverses view names into URLs.
pub trait UrlReverser: Send + Sync {
    /// Builds the URL for `name` with either positional or keyword arguments.
    ///
    /// # Errors
    ///
    /// Returns [`JdjError::NoReverseMatch`] when no route matches.
    fn reverse(
        &self,
        name: &str,
        args: &[ContextValue],
        kwargs: &[(String, ContextValue)],
    ) -> JdjResult<String>;
}

/// Maps a static file path to its public URL.
pub trait StaticResolver: Send + Sync {
    /// Resolves `path`.
    fn resolve(&self, path: &str) -> String;
}

/// Locale-aware formatting.
pub trait Localizer: Send + Sync {
    /// Formats a number or datetime for `locale`; `None` leaves the value
    /// untouched.
    fn localize(&self, value: &ContextValue, locale: &LocaleContext) -> Option<String>;

    /// Formats `value` with a Django date format string.
    fn date_format(
        &self,
        value: &DateTime<FixedOffset>,
        format: &str,
        locale: &LocaleContext,
    ) -> String;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

// ── Defaults ─────────────────────────────────────────────────────────

/// The English plural rule: only exactly one is singular.
#[allow(clippy::float_cmp)]
pub fn is_singular(count: f64) -> bool {
    count == 1.0
}

/// Returns messages untranslated, choosing forms with the English rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn gettext(&self, message: &str, _locale: &LocaleContext) -> String {
        message.to_string()
    }

    fn pgettext(&self, _context: &str, message: &str, _locale: &LocaleContext) -> String {
        message.to_string()
    }

    fn ngettext(&self, singular: &str, plural: &str, count: f64, _locale: &LocaleContext) -> String {
        if is_singular(count) { singular } else { plural }.to_string()
    }

    fn npgettext(
        &self,
        _context: &str,
        singular: &str,
        plural: &str,
        count: f64,
        locale: &LocaleContext,
    ) -> String {
        self.ngettext(singular, plural, count, locale)
    }
}

/// A reverser with no routes: every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUrls;

impl UrlReverser for NoUrls {
    fn reverse(
        &self,
        name: &str,
        _args: &[ContextValue],
        _kwargs: &[(String, ContextValue)],
    ) -> JdjResult<String> {
        Err(JdjError::NoReverseMatch(name.to_string()))
    }
}

/// Joins paths onto a fixed URL prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPrefix {
    prefix: String,
}

impl StaticPrefix {
    /// Creates a resolver for `prefix` (e.g. `/static/`).
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for StaticPrefix {
    fn default() -> Self {
        Self::new("/static/")
    }
}

impl StaticResolver for StaticPrefix {
    fn resolve(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.prefix.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Prints numbers unchanged and datetimes in [`dateformat::DATETIME_FORMAT`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainLocalizer;

impl Localizer for PlainLocalizer {
    fn localize(&self, value: &ContextValue, locale: &LocaleContext) -> Option<String> {
        match value {
            ContextValue::Integer(_) | ContextValue::Float(_) => Some(value.to_display_string()),
            ContextValue::DateTime(dt) => {
                Some(self.date_format(dt, dateformat::DATETIME_FORMAT, locale))
            }
            _ => None,
        }
    }

    fn date_format(
        &self,
        value: &DateTime<FixedOffset>,
        format: &str,
        _locale: &LocaleContext,
    ) -> String {
        dateformat::format(value, format)
    }
}

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ── Runtime ──────────────────────────────────────────────────────────

/// The delegates the tags call at render time.
///
/// # Examples
///
/// ```
/// use jdj_tags::runtime::{Runtime, StaticPrefix};
///
/// let runtime = Runtime::new().with_statics(StaticPrefix::new("https://cdn.example/"));
/// assert_eq!(runtime.statics().resolve("app.css"), "https://cdn.example/app.css");
/// ```
#[derive(Clone)]
pub struct Runtime {
    translator: Arc<dyn Translator>,
    urls: Arc<dyn UrlReverser>,
    statics: Arc<dyn StaticResolver>,
    localizer: Arc<dyn Localizer>,
    clock: Arc<dyn Clock>,
}

impl Runtime {
    /// A runtime made of the default delegates.
    pub fn new() -> Self {
        Self {
            translator: Arc::new(IdentityTranslator),
            urls: Arc::new(NoUrls),
            statics: Arc::new(StaticPrefix::default()),
            localizer: Arc::new(PlainLocalizer),
            clock: Arc::new(SystemClock),
        }
    }

    /// Default delegates with the static prefix taken from `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new().with_statics(StaticPrefix::new(settings.static_url.clone()))
    }

    /// Replaces the translator.
    #[must_use]
    pub fn with_translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translator = Arc::new(translator);
        self
    }

    /// Replaces the URL reverser.
    #[must_use]
    pub fn with_urls(mut self, urls: impl UrlReverser + 'static) -> Self {
        self.urls = Arc::new(urls);
        self
    }

    /// Replaces the static file resolver.
    #[must_use]
    pub fn with_statics(mut self, statics: impl StaticResolver + 'static) -> Self {
        self.statics = Arc::new(statics);
        self
    }

    /// Replaces the localizer.
    #[must_use]
    pub fn with_localizer(mut self, localizer: impl Localizer + 'static) -> Self {
        self.localizer = Arc::new(localizer);
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The translator.
    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    /// The URL reverser.
    pub fn urls(&self) -> &dyn UrlReverser {
        self.urls.as_ref()
    }

    /// The static file resolver.
    pub fn statics(&self) -> &dyn StaticResolver {
        self.statics.as_ref()
    }

    /// The localizer.
    pub fn localizer(&self) -> &dyn Localizer {
        self.localizer.as_ref()
    }

    /// A shared handle to the localizer, for the output finalizers.
    pub fn shared_localizer(&self) -> Arc<dyn Localizer> {
        Arc::clone(&self.localizer)
    }

    /// The clock.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The current time as seen by `{% now %}`: in the active time zone when
    /// `use_tz` is on, otherwise in the server's local time.
    pub fn now(&self, locale: &LocaleContext) -> DateTime<FixedOffset> {
        let now = self.clock.now();
        if locale.use_tz() {
            now.with_timezone(&locale.timezone())
        } else {
            now.with_timezone(&chrono::Local).into()
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

/// Renders the hidden CSRF form field for `token`.
///
/// Missing, empty and `NOTPROVIDED` tokens render nothing.
pub fn render_csrf_field(token: &ContextValue) -> String {
    let token = token.to_display_string();
    if token.is_empty() || token == "NOTPROVIDED" {
        return String::new();
    }
    format!(r#"<input type="hidden" name="csrfmiddlewaretoken" value="{token}" />"#)
}
