//! The render-time locale context.
//!
//! A [`LocaleContext`] captures the collaborating framework's per-request
//! locale state: the active language, the active time zone, and the
//! `USE_L10N` / `USE_TZ` switches. It is handed to each render explicitly and
//! is never mutated by the template layer.
//!
//! ```
//! use jdj_core::locale::LocaleContext;
//!
//! let locale = LocaleContext::new("de").with_offset_seconds(3600);
//! assert_eq!(locale.language(), "de");
//! assert_eq!(locale.timezone().local_minus_utc(), 3600);
//! ```

use chrono::{DateTime, FixedOffset};

use crate::error::{JdjError, JdjResult};
use crate::settings::Settings;

/// Active language, time zone and localization switches for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleContext {
    language: String,
    timezone: FixedOffset,
    use_l10n: bool,
    use_tz: bool,
}

impl LocaleContext {
    /// Creates a context for `language` in UTC with localization and time
    /// zone support enabled.
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            timezone: utc(),
            use_l10n: true,
            use_tz: true,
        }
    }

    /// Builds the context described by `settings`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if `settings.time_zone` is not a
    /// recognised time zone string.
    pub fn from_settings(settings: &Settings) -> JdjResult<Self> {
        Ok(Self {
            language: settings.language_code.clone(),
            timezone: parse_time_zone(&settings.time_zone)?,
            use_l10n: settings.use_l10n,
            use_tz: settings.use_tz,
        })
    }

    /// Sets the active time zone.
    #[must_use]
    pub const fn with_timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = timezone;
        self
    }

    /// Sets the active time zone as seconds east of UTC.
    ///
    /// Out-of-range offsets fall back to UTC.
    #[must_use]
    pub fn with_offset_seconds(mut self, offset_seconds: i32) -> Self {
        self.timezone = FixedOffset::east_opt(offset_seconds).unwrap_or_else(utc);
        self
    }

    /// Enables or disables localization of output values.
    #[must_use]
    pub const fn with_l10n(mut self, enabled: bool) -> Self {
        self.use_l10n = enabled;
        self
    }

    /// Enables or disables time zone conversion of output datetimes.
    #[must_use]
    pub const fn with_tz(mut self, enabled: bool) -> Self {
        self.use_tz = enabled;
        self
    }

    /// Returns the active language code, e.g. `"de"` or `"en-us"`.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Returns the primary subtag of the language code (`"pt-br"` → `"pt"`).
    pub fn base_language(&self) -> &str {
        self.language
            .split(['-', '_'])
            .next()
            .unwrap_or(&self.language)
    }

    /// Returns the active time zone.
    pub const fn timezone(&self) -> FixedOffset {
        self.timezone
    }

    /// Returns whether `USE_L10N` is on.
    pub const fn use_l10n(&self) -> bool {
        self.use_l10n
    }

    /// Returns whether `USE_TZ` is on.
    pub const fn use_tz(&self) -> bool {
        self.use_tz
    }

    /// Converts `dt` to the active time zone.
    pub fn localtime(&self, dt: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        dt.with_timezone(&self.timezone)
    }
}

impl Default for LocaleContext {
    fn default() -> Self {
        Self::new("en-us")
    }
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero is a valid UTC offset")
}

/// Parses a time zone setting into a fixed offset.
///
/// Accepts `UTC`, `GMT`, `Z`, and signed offsets in the forms `+HH:MM`,
/// `+HHMM`, or `+HH`.
///
/// # Errors
///
/// Returns a `ConfigurationError` for anything else.
pub fn parse_time_zone(value: &str) -> JdjResult<FixedOffset> {
    let value = value.trim();
    if matches!(value.to_ascii_uppercase().as_str(), "UTC" | "GMT" | "Z") {
        return Ok(utc());
    }

    let invalid = || JdjError::ConfigurationError(format!("Invalid time zone: '{value}'"));

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().map_err(|_| invalid())?, 0),
        4 => (
            digits[..2].parse::<i32>().map_err(|_| invalid())?,
            digits[2..].parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };
    if minutes >= 60 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};

    use super::*;

    #[test]
    fn test_default_locale() {
        let locale = LocaleContext::default();
        assert_eq!(locale.language(), "en-us");
        assert_eq!(locale.base_language(), "en");
        assert_eq!(locale.timezone().local_minus_utc(), 0);
        assert!(locale.use_l10n());
        assert!(locale.use_tz());
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::default();
        settings.language_code = "de-at".to_string();
        settings.time_zone = "+02:00".to_string();
        settings.use_tz = false;

        let locale = LocaleContext::from_settings(&settings).unwrap();
        assert_eq!(locale.base_language(), "de");
        assert_eq!(locale.timezone().local_minus_utc(), 7200);
        assert!(!locale.use_tz());
    }

    #[test]
    fn test_from_settings_invalid_timezone() {
        let mut settings = Settings::default();
        settings.time_zone = "Mars/Olympus".to_string();
        assert!(LocaleContext::from_settings(&settings).is_err());
    }

    #[test]
    fn test_parse_time_zone_forms() {
        assert_eq!(parse_time_zone("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_time_zone("z").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_time_zone("+05:30").unwrap().local_minus_utc(), 19800);
        assert_eq!(parse_time_zone("-0300").unwrap().local_minus_utc(), -10800);
        assert_eq!(parse_time_zone("+01").unwrap().local_minus_utc(), 3600);
        assert!(parse_time_zone("+1:5").is_err());
        assert!(parse_time_zone("+01:75").is_err());
        assert!(parse_time_zone("0100").is_err());
    }

    #[test]
    fn test_localtime() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let dt = utc.with_ymd_and_hms(2000, 10, 1, 14, 10, 12).unwrap();
        let locale = LocaleContext::new("de").with_offset_seconds(-3 * 3600);
        let local = locale.localtime(&dt);
        assert_eq!(local.hour(), 11);
        assert_eq!(local.offset().local_minus_utc(), -10800);
    }
}
