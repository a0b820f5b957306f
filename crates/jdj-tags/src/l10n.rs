//! Localization of output values.
//!
//! Two finalizers run on every value an output expression produces:
//! [`LocalTime`] moves datetimes into the active time zone when `use_tz` is
//! on, then [`Localize`] hands numbers and datetimes to the
//! [`Localizer`] when `use_l10n` is on. Everything else passes through
//! untouched.

use std::sync::Arc;

use jdj_core::locale::LocaleContext;
use jdj_template::{ContextValue, Finalizer};

use crate::runtime::Localizer;

/// Converts datetimes to the active time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTime;

impl Finalizer for LocalTime {
    fn finalize(&self, value: ContextValue, locale: &LocaleContext) -> ContextValue {
        match value {
            ContextValue::DateTime(dt) if locale.use_tz() => {
                ContextValue::DateTime(locale.localtime(&dt))
            }
            other => other,
        }
    }
}

/// Formats numbers and datetimes for the active language.
#[derive(Clone)]
pub struct Localize {
    localizer: Arc<dyn Localizer>,
}

impl Localize {
    pub fn new(localizer: Arc<dyn Localizer>) -> Self {
        Self { localizer }
    }
}

impl Finalizer for Localize {
    fn finalize(&self, value: ContextValue, locale: &LocaleContext) -> ContextValue {
        let localizable = value.is_number() || value.as_datetime().is_some();
        if !(locale.use_l10n() && localizable) {
            return value;
        }
        self.localizer
            .localize(&value, locale)
            .map_or(value, ContextValue::String)
    }
}

impl std::fmt::Debug for Localize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Localize").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::*;
    use crate::runtime::PlainLocalizer;

    struct Comma;

    impl Localizer for Comma {
        fn localize(&self, value: &ContextValue, _locale: &LocaleContext) -> Option<String> {
            Some(value.to_display_string().replace('.', ","))
        }

        fn date_format(
            &self,
            value: &chrono::DateTime<FixedOffset>,
            _format: &str,
            _locale: &LocaleContext,
        ) -> String {
            value.to_rfc3339()
        }
    }

    fn utc_noon() -> ContextValue {
        ContextValue::DateTime(
            FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2000, 10, 1, 12, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_local_time_converts_when_enabled() {
        let locale = LocaleContext::new("en").with_offset_seconds(-3 * 3600);
        let ContextValue::DateTime(dt) = LocalTime.finalize(utc_noon(), &locale) else {
            panic!("expected datetime");
        };
        assert_eq!(dt.offset().local_minus_utc(), -3 * 3600);
        assert_eq!(dt.format("%H:%M").to_string(), "09:00");

        let off = locale.with_tz(false);
        assert_eq!(LocalTime.finalize(utc_noon(), &off), utc_noon());
    }

    #[test]
    fn test_localize_numbers_only() {
        let localize = Localize::new(Arc::new(Comma));
        let locale = LocaleContext::new("de");
        assert_eq!(
            localize.finalize(ContextValue::Float(1.23), &locale),
            ContextValue::from("1,23")
        );
        assert_eq!(
            localize.finalize(ContextValue::from("1.23"), &locale),
            ContextValue::from("1.23")
        );
        assert_eq!(localize.finalize(ContextValue::Bool(true), &locale), ContextValue::Bool(true));
    }

    #[test]
    fn test_localize_respects_switch() {
        let localize = Localize::new(Arc::new(Comma));
        let locale = LocaleContext::new("de").with_l10n(false);
        assert_eq!(
            localize.finalize(ContextValue::Float(1.23), &locale),
            ContextValue::Float(1.23)
        );
    }

    #[test]
    fn test_localize_datetime() {
        let localize = Localize::new(Arc::new(PlainLocalizer));
        let out = localize.finalize(utc_noon(), &LocaleContext::new("en"));
        assert_eq!(out, ContextValue::from("Oct. 1, 2000, noon"));
    }
}
