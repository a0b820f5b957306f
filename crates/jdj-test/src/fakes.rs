//! Fake delegates with predictable output.
//!
//! | Fake | Output |
//! |---|---|
//! | [`RecordingTranslator`] | `"{message} - translated"`, `"{message} - alt translated"` with a context |
//! | [`RecordingUrls`] | `"Url for: {name}"` |
//! | [`PrefixStatic`] | `"Static: {path}"` |
//! | [`DecimalLocalizer`] | numbers with the language's decimal separator |
//! | [`FixedClock`] | a fixed instant |

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use jdj_core::error::{JdjError, JdjResult};
use jdj_core::locale::LocaleContext;
use jdj_tags::dateformat;
use jdj_tags::runtime::{is_singular, Clock, Localizer, StaticResolver, Translator, UrlReverser};
use jdj_template::ContextValue;

use crate::recording::{CallLog, TranslationCall, UrlCall};

/// Marks translations and records every lookup.
#[derive(Debug, Clone, Default)]
pub struct RecordingTranslator {
    log: CallLog<TranslationCall>,
}

impl RecordingTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared call log.
    pub const fn log(&self) -> &CallLog<TranslationCall> {
        &self.log
    }
}

fn choose<'a>(singular: &'a str, plural: &'a str, count: f64) -> &'a str {
    if is_singular(count) {
        singular
    } else {
        plural
    }
}

impl Translator for RecordingTranslator {
    fn gettext(&self, message: &str, _locale: &LocaleContext) -> String {
        self.log.record(TranslationCall::gettext(message));
        format!("{message} - translated")
    }

    fn pgettext(&self, context: &str, message: &str, _locale: &LocaleContext) -> String {
        self.log.record(TranslationCall::pgettext(context, message));
        format!("{message} - alt translated")
    }

    fn ngettext(&self, singular: &str, plural: &str, count: f64, _locale: &LocaleContext) -> String {
        self.log
            .record(TranslationCall::ngettext(singular, plural, count));
        format!("{} - translated", choose(singular, plural, count))
    }

    fn npgettext(
        &self,
        context: &str,
        singular: &str,
        plural: &str,
        count: f64,
        _locale: &LocaleContext,
    ) -> String {
        self.log.record(TranslationCall::Npgettext {
            context: context.to_string(),
            singular: singular.to_string(),
            plural: plural.to_string(),
            count,
        });
        format!("{} - alt translated", choose(singular, plural, count))
    }
}

/// Reverses every view to `"Url for: {name}"` unless marked missing.
#[derive(Debug, Clone, Default)]
pub struct RecordingUrls {
    log: CallLog<UrlCall>,
    missing: Vec<String>,
}

impl RecordingUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes reversing `name` fail with `NoReverseMatch`.
    #[must_use]
    pub fn without(mut self, name: &str) -> Self {
        self.missing.push(name.to_string());
        self
    }

    /// The shared call log.
    pub const fn log(&self) -> &CallLog<UrlCall> {
        &self.log
    }
}

impl UrlReverser for RecordingUrls {
    fn reverse(
        &self,
        name: &str,
        args: &[ContextValue],
        kwargs: &[(String, ContextValue)],
    ) -> JdjResult<String> {
        self.log.record(UrlCall {
            name: name.to_string(),
            args: args.to_vec(),
            kwargs: kwargs.to_vec(),
        });
        if self.missing.iter().any(|m| m == name) {
            return Err(JdjError::NoReverseMatch(name.to_string()));
        }
        Ok(format!("Url for: {name}"))
    }
}

/// Prefixes static paths with a fixed string and records them.
#[derive(Debug, Clone)]
pub struct PrefixStatic {
    prefix: String,
    log: CallLog<String>,
}

impl PrefixStatic {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            log: CallLog::new(),
        }
    }

    /// The shared log of resolved paths.
    pub const fn log(&self) -> &CallLog<String> {
        &self.log
    }
}

impl Default for PrefixStatic {
    fn default() -> Self {
        Self::new("Static: ")
    }
}

impl StaticResolver for PrefixStatic {
    fn resolve(&self, path: &str) -> String {
        self.log.record(path.to_string());
        format!("{}{path}", self.prefix)
    }
}

/// Formats numbers with a comma decimal separator for languages that use
/// one, and datetimes in Django's default format.
#[derive(Debug, Clone, Default)]
pub struct DecimalLocalizer {
    log: CallLog<ContextValue>,
}

const COMMA_LANGUAGES: &[&str] = &["de", "es", "fr", "it", "nl", "pl", "pt", "ru"];

impl DecimalLocalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared log of localized values.
    pub const fn log(&self) -> &CallLog<ContextValue> {
        &self.log
    }

    /// The decimal separator used for `locale`.
    pub fn separator(locale: &LocaleContext) -> char {
        if COMMA_LANGUAGES.contains(&locale.base_language()) {
            ','
        } else {
            '.'
        }
    }
}

impl Localizer for DecimalLocalizer {
    fn localize(&self, value: &ContextValue, locale: &LocaleContext) -> Option<String> {
        self.log.record(value.clone());
        match value {
            ContextValue::Integer(_) | ContextValue::Float(_) => Some(
                value
                    .to_display_string()
                    .replace('.', &Self::separator(locale).to_string()),
            ),
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

/// A clock stopped at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// 2000-10-01 14:10:12 UTC.
    pub fn default_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 10, 1, 14, 10, 12)
            .single()
            .unwrap_or_default()
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self(Self::default_instant())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
