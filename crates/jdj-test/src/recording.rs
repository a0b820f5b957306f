//! Shared call logs.
//!
//! A [`CallLog`] records what a fake delegate was asked to do. Clones share
//! the same log, so a test keeps one handle while the runtime owns another.

use std::fmt;
use std::sync::{Arc, Mutex};

use jdj_template::ContextValue;

/// One translator call.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationCall {
    /// `gettext(message)`
    Gettext {
        /// Message id.
        message: String,
    },
    /// `pgettext(context, message)`
    Pgettext {
        /// Disambiguating context.
        context: String,
        /// Message id.
        message: String,
    },
    /// `ngettext(singular, plural, count)`
    Ngettext {
        /// Singular message id.
        singular: String,
        /// Plural message id.
        plural: String,
        /// Count selecting the form.
        count: f64,
    },
    /// `npgettext(context, singular, plural, count)`
    Npgettext {
        /// Disambiguating context.
        context: String,
        /// Singular message id.
        singular: String,
        /// Plural message id.
        plural: String,
        /// Count selecting the form.
        count: f64,
    },
}

impl TranslationCall {
    /// Shorthand for [`TranslationCall::Gettext`].
    pub fn gettext(message: &str) -> Self {
        Self::Gettext {
            message: message.to_string(),
        }
    }

    /// Shorthand for [`TranslationCall::Pgettext`].
    pub fn pgettext(context: &str, message: &str) -> Self {
        Self::Pgettext {
            context: context.to_string(),
            message: message.to_string(),
        }
    }

    /// Shorthand for [`TranslationCall::Ngettext`].
    pub fn ngettext(singular: &str, plural: &str, count: impl Into<f64>) -> Self {
        Self::Ngettext {
            singular: singular.to_string(),
            plural: plural.to_string(),
            count: count.into(),
        }
    }
}

/// One URL reversal.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlCall {
    /// View name.
    pub name: String,
    /// Positional arguments.
    pub args: Vec<ContextValue>,
    /// Keyword arguments, in call order.
    pub kwargs: Vec<(String, ContextValue)>,
}

impl UrlCall {
    /// Builds an expected call from string arguments.
    pub fn new(name: &str, args: &[&str], kwargs: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            args: args.iter().map(|a| ContextValue::from(*a)).collect(),
            kwargs: kwargs
                .iter()
                .map(|(k, v)| ((*k).to_string(), ContextValue::from(*v)))
                .collect(),
        }
    }
}

/// A thread-safe, shareable list of recorded calls.
pub struct CallLog<T> {
    calls: Arc<Mutex<Vec<T>>>,
}

impl<T> CallLog<T> {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Appends a call.
    pub fn record(&self, call: T) {
        self.calls.lock().expect("CallLog lock poisoned").push(call);
    }

    /// Number of recorded calls.
    pub fn len(&self) -> usize {
        self.calls.lock().expect("CallLog lock poisoned").len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every recorded call.
    pub fn clear(&self) {
        self.calls.lock().expect("CallLog lock poisoned").clear();
    }
}

impl<T: Clone> CallLog<T> {
    /// All recorded calls, oldest first.
    pub fn calls(&self) -> Vec<T> {
        self.calls.lock().expect("CallLog lock poisoned").clone()
    }

    /// The most recent call.
    pub fn last(&self) -> Option<T> {
        self.calls.lock().expect("CallLog lock poisoned").last().cloned()
    }
}

impl<T: Clone + PartialEq + fmt::Debug> CallLog<T> {
    /// Asserts that the most recent call equals `expected`.
    ///
    /// # Panics
    ///
    /// Panics if nothing was recorded or the last call differs.
    pub fn assert_called_with(&self, expected: &T) {
        let last = self.last();
        assert_eq!(
            last.as_ref(),
            Some(expected),
            "Expected last call {expected:?}, recorded: {:?}",
            self.calls()
        );
    }
}

impl<T> Clone for CallLog<T> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<T> Default for CallLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for CallLog<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallLog").field("calls", &self.calls).finish()
    }
}
