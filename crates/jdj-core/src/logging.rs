//! Logging integration for jdj.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and for creating per-render spans.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The log level is read from `settings.log_level` (e.g. "debug", "info",
/// "warn", "error"). In debug mode a pretty, human-readable format is used; in
/// production a structured JSON format is used. Installing a second subscriber
/// is silently ignored.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for rendering one template.
///
/// Delegate calls made while the span is entered are logged with the
/// template name attached.
///
/// # Examples
///
/// ```
/// use jdj_core::logging::render_span;
///
/// let span = render_span("index.html");
/// let _guard = span.enter();
/// tracing::debug!("rendering");
/// ```
pub fn render_span(template_name: &str) -> tracing::Span {
    tracing::debug_span!("render", template = template_name)
}
