//! Core error types for jdj.
//!
//! [`JdjError`] covers both halves of a template's life: compile-time syntax
//! errors, which always carry the offending line, and render-time errors
//! raised by the engine or surfaced unmodified from a runtime delegate.

use thiserror::Error;

/// The primary error type for jdj.
///
/// Parse failures are fatal to compiling the whole template. Render failures
/// abort only the render that raised them.
#[derive(Error, Debug)]
pub enum JdjError {
    // ── Compilation ──────────────────────────────────────────────────

    /// A template contains invalid syntax.
    ///
    /// Raised for unexpected tokens, missing required arguments, duplicate
    /// keywords, unmatched block terminators, and mixing positional with
    /// keyword arguments on `{% url %}`.
    #[error("Template syntax error (line {lineno}): {message}")]
    TemplateSyntaxError {
        /// Human-readable description of the problem.
        message: String,
        /// 1-based line number of the offending token.
        lineno: usize,
    },

    /// The requested template was never registered with the environment.
    #[error("Template does not exist: {0}")]
    TemplateDoesNotExist(String),

    // ── Rendering ────────────────────────────────────────────────────

    /// A URL could not be reversed for the given view name and arguments.
    #[error("Reverse for '{0}' not found")]
    NoReverseMatch(String),

    /// Evaluating an expression or a delegate call failed at render time.
    #[error("Render error: {0}")]
    RenderError(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl JdjError {
    /// Creates a [`JdjError::TemplateSyntaxError`].
    pub fn syntax(message: impl Into<String>, lineno: usize) -> Self {
        Self::TemplateSyntaxError {
            message: message.into(),
            lineno,
        }
    }

    /// Creates a [`JdjError::RenderError`].
    pub fn render(message: impl Into<String>) -> Self {
        Self::RenderError(message.into())
    }

    /// Returns `true` for errors raised while compiling a template.
    pub const fn is_syntax_error(&self) -> bool {
        matches!(self, Self::TemplateSyntaxError { .. })
    }

    /// Returns the source line of a syntax error, if this is one.
    pub const fn lineno(&self) -> Option<usize> {
        match self {
            Self::TemplateSyntaxError { lineno, .. } => Some(*lineno),
            _ => None,
        }
    }
}

/// A convenience type alias for `Result<T, JdjError>`.
pub type JdjResult<T> = Result<T, JdjError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = JdjError::syntax("expected 'noop', 'context' or 'as'", 3);
        assert_eq!(
            err.to_string(),
            "Template syntax error (line 3): expected 'noop', 'context' or 'as'"
        );
        assert!(err.is_syntax_error());
        assert_eq!(err.lineno(), Some(3));
    }

    #[test]
    fn test_no_reverse_match_display() {
        let err = JdjError::NoReverseMatch("my_view".into());
        assert_eq!(err.to_string(), "Reverse for 'my_view' not found");
        assert!(!err.is_syntax_error());
        assert_eq!(err.lineno(), None);
    }

    #[test]
    fn test_render_error_display() {
        let err = JdjError::render("Unknown filter: 'nope'");
        assert_eq!(err.to_string(), "Render error: Unknown filter: 'nope'");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: JdjError = io_err.into();
        assert!(err.to_string().contains("file missing"));
    }
}
