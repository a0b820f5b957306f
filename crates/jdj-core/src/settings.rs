//! Settings read by the tag layer.
//!
//! [`Settings`] holds the handful of collaborating-framework values the tags
//! depend on: the active language and time zone, the `USE_L10N` / `USE_TZ`
//! switches, the static-file URL prefix, and engine/logging options. Nothing
//! here is global; callers build a [`Settings`] (by hand or through
//! [`settings_loader`](crate::settings_loader)) and derive a
//! [`LocaleContext`](crate::locale::LocaleContext) from it for each render.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The complete set of jdj settings.
///
/// # Examples
///
/// ```
/// use jdj_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.use_l10n);
/// assert_eq!(settings.language_code, "en-us");
/// assert_eq!(settings.static_url, "/static/");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled.
    pub debug: bool,

    // ── Internationalization ─────────────────────────────────────────

    /// The default language code (e.g. "en-us").
    pub language_code: String,
    /// The default time zone: `UTC`, `Z`, or a fixed offset such as `+01:00`.
    pub time_zone: String,
    /// Whether output values are localized (`USE_L10N`).
    pub use_l10n: bool,
    /// Whether datetimes are converted to the active time zone (`USE_TZ`).
    pub use_tz: bool,

    // ── Static files ─────────────────────────────────────────────────

    /// URL prefix for static files.
    pub static_url: String,

    // ── Templates ────────────────────────────────────────────────────

    /// Whether output expressions are HTML-escaped by default.
    pub auto_escape: bool,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level (e.g. "info", "debug", "warn").
    pub log_level: String,

    // ── Escape hatch ─────────────────────────────────────────────────

    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,

            language_code: "en-us".to_string(),
            time_zone: "UTC".to_string(),
            use_l10n: true,
            use_tz: true,

            static_url: "/static/".to_string(),

            auto_escape: false,

            log_level: "info".to_string(),

            extra: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert!(s.debug);
        assert_eq!(s.language_code, "en-us");
        assert_eq!(s.time_zone, "UTC");
        assert!(s.use_l10n);
        assert!(s.use_tz);
        assert_eq!(s.static_url, "/static/");
        assert!(!s.auto_escape);
        assert_eq!(s.log_level, "info");
        assert!(s.extra.is_empty());
    }

    #[test]
    fn test_settings_roundtrip_through_json() {
        let mut s = Settings::default();
        s.use_l10n = false;
        s.language_code = "de".to_string();
        let json = serde_json::to_value(&s).unwrap();
        let back: Settings = serde_json::from_value(json).unwrap();
        assert!(!back.use_l10n);
        assert_eq!(back.language_code, "de");
    }
}
