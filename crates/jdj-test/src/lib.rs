//! # jdj-test
//!
//! Testing utilities for jdj. Provides fake delegates with predictable
//! output that record every call, a fixed clock, and builders that register
//! tag bundles over those fakes.
//!
//! ## Modules
//!
//! - [`recording`] - Shared call logs and the recorded call types
//! - [`fakes`] - Translator, URL reverser, static resolver, localizer and clock fakes
//! - [`harness`] - `TestRuntime`, environment builders and render helpers

pub mod fakes;
pub mod harness;
pub mod recording;

pub use fakes::{DecimalLocalizer, FixedClock, PrefixStatic, RecordingTranslator, RecordingUrls};
pub use harness::{environment, locale, render, render_in, runtime, TestRuntime};
pub use recording::{CallLog, TranslationCall, UrlCall};
