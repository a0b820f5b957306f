//! The intermediate form of a parsed tag.
//!
//! Every tag occurrence is parsed into a [`CallNode`] describing which
//! delegate to call and with which argument expressions. The emitter turns it
//! into a host node; nothing keeps a call node after compilation.

use std::fmt;

use jdj_core::error::JdjResult;
use jdj_template::expr::Expr;

use crate::parsers;
use crate::stream::TagStream;

/// The closed set of supported tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// `{% csrf_token %}`
    CsrfToken,
    /// `{% trans %}`
    Trans,
    /// `{% blocktrans %}...{% endblocktrans %}`
    BlockTrans,
    /// `{% now %}`
    Now,
    /// `{% static %}`
    Static,
    /// `{% url %}`
    Url,
}

impl TagKind {
    /// Every tag, in a stable order.
    pub const ALL: [Self; 6] = [
        Self::CsrfToken,
        Self::Trans,
        Self::BlockTrans,
        Self::Now,
        Self::Static,
        Self::Url,
    ];

    /// Looks a tag up by the name used in templates.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// The name used in templates.
    pub const fn name(self) -> &'static str {
        match self {
            Self::CsrfToken => "csrf_token",
            Self::Trans => "trans",
            Self::BlockTrans => "blocktrans",
            Self::Now => "now",
            Self::Static => "static",
            Self::Url => "url",
        }
    }

    /// Runs this tag's grammar over an opened tag stream.
    ///
    /// # Errors
    ///
    /// Returns a `TemplateSyntaxError` for malformed tags.
    pub fn parse(self, stream: &mut TagStream<'_, '_>) -> JdjResult<CallNode> {
        match self {
            Self::CsrfToken => parsers::csrf::parse(stream),
            Self::Trans => parsers::trans::parse(stream),
            Self::BlockTrans => parsers::blocktrans::parse(stream),
            Self::Now => parsers::now::parse(stream),
            Self::Static => parsers::static_tag::parse(stream),
            Self::Url => parsers::url::parse(stream),
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The message ids collected from a `blocktrans` body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransBody {
    /// The singular (or only) message id, with `%(name)s` placeholders.
    pub singular: String,
    /// The plural message id, present when the body has `{% plural %}`.
    pub plural: Option<String>,
    /// Names used in the body that are neither `with` bindings nor the count
    /// variable, in first-use order. They are read from the template context.
    pub context_vars: Vec<String>,
}

/// One parsed tag occurrence.
#[derive(Debug, Clone)]
pub struct CallNode {
    pub kind: TagKind,
    pub lineno: usize,
    /// Positional argument expressions, in source order.
    pub args: Vec<Expr>,
    /// Keyword argument expressions, in source order, keys unique. For
    /// `blocktrans` these are the `with` bindings.
    pub kwargs: Vec<(String, Expr)>,
    pub noop: bool,
    pub trimmed: bool,
    pub context: Option<String>,
    /// `count name=expr`
    pub count: Option<(String, Expr)>,
    pub body: Option<TransBody>,
    /// The `as`/`asvar` variable; `None` renders inline.
    pub target: Option<String>,
}

impl CallNode {
    /// An empty call for `kind` at `lineno`.
    pub const fn new(kind: TagKind, lineno: usize) -> Self {
        Self {
            kind,
            lineno,
            args: Vec::new(),
            kwargs: Vec::new(),
            noop: false,
            trimmed: false,
            context: None,
            count: None,
            body: None,
            target: None,
        }
    }

    /// Looks up a keyword argument.
    pub fn kwarg(&self, name: &str) -> Option<&Expr> {
        self.kwargs.iter().find(|(k, _)| k == name).map(|(_, e)| e)
    }

    /// Returns `true` if a keyword argument `name` was given.
    pub fn has_kwarg(&self, name: &str) -> bool {
        self.kwarg(name).is_some()
    }
}
