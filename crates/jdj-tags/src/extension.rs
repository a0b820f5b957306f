//! Extension bundles.
//!
//! A [`Bundle`] names one tag family; [`TagExtension`] registers it with an
//! [`Environment`]. `Compat` carries every tag, the translation globals and
//! the localization finalizers at once.
//!
//! ```
//! use jdj_tags::extension::{Bundle, TagExtension};
//! use jdj_tags::runtime::{Runtime, StaticPrefix};
//! use jdj_template::{Context, Environment};
//!
//! let runtime = Runtime::new().with_statics(StaticPrefix::new("/assets/"));
//! let env = Environment::new().with_extension(TagExtension::new(Bundle::Static, runtime));
//!
//! let out = env
//!     .from_string("{% static 'app.js' %}")
//!     .unwrap()
//!     .render(&mut Context::new())
//!     .unwrap();
//! assert_eq!(out, "/assets/app.js");
//! ```

use std::fmt;
use std::sync::Arc;

use jdj_core::error::JdjResult;
use jdj_template::{Environment, Extension, Node, Parser};

use crate::call::TagKind;
use crate::emit::{emit, gettext_function, pgettext_function};
use crate::l10n::{LocalTime, Localize};
use crate::runtime::Runtime;
use crate::stream::TagStream;

/// A family of tags registered together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bundle {
    /// `csrf_token`
    Csrf,
    /// `trans`, `blocktrans` and the `_`, `gettext`, `pgettext` globals.
    I18n,
    /// Output localization; no tags.
    L10n,
    /// `now`
    Now,
    /// `static`
    Static,
    /// `url`
    Url,
    /// Everything above.
    Compat,
}

impl Bundle {
    /// Every bundle.
    pub const ALL: [Self; 7] = [
        Self::Csrf,
        Self::I18n,
        Self::L10n,
        Self::Now,
        Self::Static,
        Self::Url,
        Self::Compat,
    ];

    /// The name used in logs and configuration.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Csrf => "csrf",
            Self::I18n => "i18n",
            Self::L10n => "l10n",
            Self::Now => "now",
            Self::Static => "static",
            Self::Url => "url",
            Self::Compat => "compat",
        }
    }

    /// Looks a bundle up by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// The tag names this bundle claims.
    pub const fn tags(self) -> &'static [&'static str] {
        match self {
            Self::Csrf => &["csrf_token"],
            Self::I18n => &["trans", "blocktrans"],
            Self::L10n => &[],
            Self::Now => &["now"],
            Self::Static => &["static"],
            Self::Url => &["url"],
            Self::Compat => &["csrf_token", "trans", "blocktrans", "now", "static", "url"],
        }
    }

    /// Returns `true` if this bundle parses `kind`.
    pub fn owns(self, kind: TagKind) -> bool {
        self.tags().contains(&kind.name())
    }

    const fn installs_globals(self) -> bool {
        matches!(self, Self::I18n | Self::Compat)
    }

    const fn installs_finalizers(self) -> bool {
        matches!(self, Self::L10n | Self::Compat)
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A bundle bound to the runtime its tags call into.
#[derive(Debug, Clone)]
pub struct TagExtension {
    bundle: Bundle,
    runtime: Arc<Runtime>,
}

impl TagExtension {
    /// Creates the extension for `bundle`.
    pub fn new(bundle: Bundle, runtime: Runtime) -> Self {
        Self::shared(bundle, Arc::new(runtime))
    }

    /// Creates the extension for `bundle` over a runtime shared with other
    /// extensions.
    pub const fn shared(bundle: Bundle, runtime: Arc<Runtime>) -> Self {
        Self { bundle, runtime }
    }

    /// The bundle.
    pub const fn bundle(&self) -> Bundle {
        self.bundle
    }

    /// The runtime.
    pub const fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }
}

impl Extension for TagExtension {
    fn name(&self) -> &str {
        self.bundle.name()
    }

    fn tags(&self) -> &'static [&'static str] {
        self.bundle.tags()
    }

    fn install(&self, env: &mut Environment) {
        if self.bundle.installs_globals() {
            env.add_function(gettext_function("_", &self.runtime));
            env.add_function(gettext_function("gettext", &self.runtime));
            env.add_function(pgettext_function("pgettext", &self.runtime));
        }
        if self.bundle.installs_finalizers() {
            env.add_finalizer(LocalTime);
            env.add_finalizer(Localize::new(self.runtime.shared_localizer()));
            tracing::debug!(
                bundle = %self.bundle,
                finalizers = env.finalizer_count(),
                "installed localization finalizers"
            );
        }
    }

    fn parse(&self, parser: &mut Parser<'_>) -> JdjResult<Node> {
        let mut stream = TagStream::open(parser)?;
        let kind = TagKind::from_name(stream.tag()).filter(|kind| self.bundle.owns(*kind));
        let Some(kind) = kind else {
            return Err(stream.fail(
                format!("got unexpected tag '{}'", stream.tag()),
                Some(stream.lineno()),
            ));
        };
        let call = kind.parse(&mut stream)?;
        Ok(emit(call, &self.runtime))
    }
}
