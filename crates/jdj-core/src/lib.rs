//! # jdj-core
//!
//! Core types shared by every jdj crate. This crate has no template-engine
//! dependencies and provides the foundation for the host engine and the tag
//! extensions.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and result alias
//! - [`settings`] - Configuration values read by the tag layer
//! - [`settings_loader`] - Loading settings from TOML, JSON, and the environment
//! - [`locale`] - The read-only locale context passed into every render
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod locale;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{JdjError, JdjResult};
pub use locale::LocaleContext;
pub use settings::Settings;
