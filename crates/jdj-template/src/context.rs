//! Template context for variable resolution and rendering.
//!
//! Provides [`Context`] for holding template variables in a stack-based scope
//! together with the render's [`LocaleContext`], and [`ContextValue`] for
//! representing dynamic template values.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use jdj_core::locale::LocaleContext;

use crate::function::Function;

/// Represents a dynamic value in a template context.
///
/// Covers strings, numbers, booleans, lists, dictionaries, timezone-aware
/// datetimes, callables and `None`.
#[derive(Debug, Clone)]
pub enum ContextValue {
    /// A plain string; escaped on output when autoescape is on.
    String(String),
    /// A 64-bit integer.
    Integer(i64),
    /// A 64-bit floating point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// An ordered list of values.
    List(Vec<ContextValue>),
    /// A key-value mapping.
    Dict(HashMap<String, ContextValue>),
    /// A timezone-aware datetime.
    DateTime(DateTime<FixedOffset>),
    /// A callable exposed to templates (globals, bound tag delegates).
    Function(Function),
    /// The absence of a value.
    None,
    /// A string marked as safe; auto-escaping will not be applied.
    SafeString(String),
}

impl ContextValue {
    /// Returns `true` if this value is considered "truthy".
    ///
    /// `None`, `false`, zero, and empty strings/lists/dicts are falsy;
    /// everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) | Self::SafeString(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Dict(d) => !d.is_empty(),
            Self::DateTime(_) | Self::Function(_) => true,
        }
    }

    /// Converts this value to a display string (without HTML escaping).
    pub fn to_display_string(&self) -> String {
        match self {
            Self::String(s) | Self::SafeString(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => {
                if f.fract() == 0.0 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Self::Bool(b) => bool_str(*b).to_string(),
            Self::List(_) | Self::Dict(_) => self.to_repr(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%:z").to_string(),
            Self::Function(func) => format!("<function {}>", func.name()),
            Self::None => String::new(),
        }
    }

    fn to_repr(&self) -> String {
        match self {
            Self::String(s) | Self::SafeString(s) => format!("'{s}'"),
            Self::None => "None".to_string(),
            Self::List(items) => {
                let inner: Vec<String> = items.iter().map(Self::to_repr).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Dict(map) => {
                let mut inner: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("'{}': {}", k, v.to_repr()))
                    .collect();
                inner.sort();
                format!("{{{}}}", inner.join(", "))
            }
            other => other.to_display_string(),
        }
    }

    /// Returns `true` if this value is a safe string (auto-escaping bypassed).
    pub const fn is_safe(&self) -> bool {
        matches!(self, Self::SafeString(_))
    }

    /// Returns `true` for integers and floats (booleans are not numbers here).
    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }

    /// Marks a string value as safe, bypassing auto-escaping.
    ///
    /// Non-string values are converted to their display string first.
    #[must_use]
    pub fn mark_safe(self) -> Self {
        match self {
            Self::String(s) => Self::SafeString(s),
            Self::SafeString(_) => self,
            other => Self::SafeString(other.to_display_string()),
        }
    }

    /// Resolves one attribute or index segment (`user.name`, `items.0`).
    pub fn resolve_path(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Dict(map) => map.get(key),
            Self::List(list) => key.parse::<usize>().ok().and_then(|idx| list.get(idx)),
            _ => None,
        }
    }

    /// Returns the length of a list, string, or dict.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::String(s) | Self::SafeString(s) => Some(s.chars().count()),
            Self::List(l) => Some(l.len()),
            Self::Dict(d) => Some(d.len()),
            _ => None,
        }
    }

    /// Returns `true` if this is an empty collection or empty string.
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|l| l == 0)
    }

    /// Attempts to convert this value to an i64.
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) => Some(*f as i64),
            Self::String(s) | Self::SafeString(s) => s.trim().parse::<i64>().ok(),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Attempts to convert this value to an f64.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            Self::String(s) | Self::SafeString(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Returns the string contents if this is a String or `SafeString`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::SafeString(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the datetime if this is a `DateTime`.
    pub const fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Short type name used in render errors.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) | Self::SafeString(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::DateTime(_) => "datetime",
            Self::Function(_) => "function",
            Self::None => "none",
        }
    }
}

const fn bool_str(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl PartialEq for ContextValue {
    #[allow(clippy::cast_precision_loss)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a) | Self::SafeString(a), Self::String(b) | Self::SafeString(b)) => {
                a == b
            }
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                (*a as f64) == *b
            }
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::None, Self::None) => true,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

// -- From implementations --

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i32> for ContextValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<i64> for ContextValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<u32> for ContextValue {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<usize> for ContextValue {
    #[allow(clippy::cast_possible_wrap)]
    fn from(i: usize) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<f64> for ContextValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<DateTime<FixedOffset>> for ContextValue {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::DateTime(dt)
    }
}

impl From<DateTime<chrono::Utc>> for ContextValue {
    fn from(dt: DateTime<chrono::Utc>) -> Self {
        Self::DateTime(dt.into())
    }
}

impl From<Function> for ContextValue {
    fn from(f: Function) -> Self {
        Self::Function(f)
    }
}

impl<T: Into<Self>> From<Vec<T>> for ContextValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<HashMap<String, T>> for ContextValue {
    fn from(m: HashMap<String, T>) -> Self {
        Self::Dict(m.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for ContextValue {
    fn from(o: Option<T>) -> Self {
        o.map_or(Self::None, Into::into)
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::None),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(arr) => Self::List(arr.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(map) => {
                Self::Dict(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// A template context: a stack of variable scopes plus the render's locale.
///
/// Lookup searches from the top of the stack downward. `{% for %}` pushes a
/// scope; assignments (`{% set %}`, `as` targets) write to the top scope.
///
/// # Examples
///
/// ```
/// use jdj_template::context::{Context, ContextValue};
///
/// let mut ctx = Context::new();
/// ctx.set("name", ContextValue::from("Jinja"));
/// assert_eq!(ctx.get("name").unwrap().to_display_string(), "Jinja");
///
/// ctx.push();
/// ctx.set("name", ContextValue::from("Overridden"));
/// assert_eq!(ctx.get("name").unwrap().to_display_string(), "Overridden");
///
/// ctx.pop();
/// assert_eq!(ctx.get("name").unwrap().to_display_string(), "Jinja");
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    stack: Vec<HashMap<String, ContextValue>>,
    locale: LocaleContext,
}

impl Context {
    /// Creates an empty context with the default locale.
    pub fn new() -> Self {
        Self::with_locale(LocaleContext::default())
    }

    /// Creates an empty context rendering under `locale`.
    pub fn with_locale(locale: LocaleContext) -> Self {
        Self {
            stack: vec![HashMap::new()],
            locale,
        }
    }

    /// Builds a context from `(name, value)` pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<ContextValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut ctx = Self::new();
        for (k, v) in pairs {
            ctx.set(k, v.into());
        }
        ctx
    }

    /// Replaces the render locale.
    #[must_use]
    pub fn locale_context(mut self, locale: LocaleContext) -> Self {
        self.locale = locale;
        self
    }

    /// The render locale.
    pub const fn locale(&self) -> &LocaleContext {
        &self.locale
    }

    /// Pushes a new scope onto the context stack.
    pub fn push(&mut self) {
        self.stack.push(HashMap::new());
    }

    /// Pops the top scope. The last scope is never popped.
    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Sets a variable in the current (top) scope.
    pub fn set(&mut self, key: impl Into<String>, value: ContextValue) {
        if let Some(top) = self.stack.last_mut() {
            top.insert(key.into(), value);
        }
    }

    /// Looks up a variable by name, searching from the top scope downward.
    ///
    /// Supports dot-separated paths like `user.name` or `items.0.title`.
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        let mut parts = key.split('.');
        let root_key = parts.next()?;

        let mut current = self.stack.iter().rev().find_map(|scope| scope.get(root_key))?;
        for part in parts {
            current = current.resolve_path(part)?;
        }
        Some(current)
    }

    /// Returns `true` if `key` is bound in any scope.
    pub fn contains(&self, key: &str) -> bool {
        self.stack.iter().any(|scope| scope.contains_key(key))
    }

    /// Flattens all scopes into a single map, later scopes winning.
    pub fn flatten(&self) -> HashMap<String, ContextValue> {
        let mut result = HashMap::new();
        for scope in &self.stack {
            for (k, v) in scope {
                result.insert(k.clone(), v.clone());
            }
        }
        result
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Escapes HTML special characters in a string.
///
/// Replaces `&`, `<`, `>`, `"`, and `'` with their HTML entity equivalents.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_context_value_from_primitives() {
        assert_eq!(ContextValue::from("hello").to_display_string(), "hello");
        assert_eq!(ContextValue::from(42i32).to_display_string(), "42");
        assert_eq!(ContextValue::from(1.23f64).to_display_string(), "1.23");
        assert_eq!(ContextValue::from(true).to_display_string(), "True");
    }

    #[test]
    fn test_float_display_integer_valued() {
        assert_eq!(ContextValue::Float(3.0).to_display_string(), "3.0");
    }

    #[test]
    fn test_context_value_from_vec() {
        let v: ContextValue = vec![1i32, 2, 3].into();
        assert_eq!(v.to_display_string(), "[1, 2, 3]");
    }

    #[test]
    fn test_context_value_from_option() {
        let v: ContextValue = Some(42i32).into();
        assert_eq!(v, ContextValue::Integer(42));
        let v: ContextValue = Option::<i32>::None.into();
        assert!(matches!(v, ContextValue::None));
    }

    #[test]
    fn test_context_value_from_json() {
        let json = serde_json::json!({
            "name": "jdj",
            "version": 4,
            "ratio": 1.5,
            "tags": ["web"],
            "meta": null
        });
        let ContextValue::Dict(map) = ContextValue::from(json) else {
            panic!("Expected Dict");
        };
        assert_eq!(map["name"], ContextValue::from("jdj"));
        assert_eq!(map["version"], ContextValue::Integer(4));
        assert_eq!(map["ratio"], ContextValue::Float(1.5));
        assert!(matches!(map["meta"], ContextValue::None));
    }

    #[test]
    fn test_datetime_value() {
        let dt = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2000, 10, 1, 14, 10, 12)
            .unwrap();
        let v = ContextValue::from(dt);
        assert_eq!(v.to_display_string(), "2000-10-01 14:10:12+00:00");
        assert!(v.as_datetime().is_some());
        assert!(!v.is_number());
        assert!(v.is_truthy());
    }

    #[test]
    fn test_truthiness() {
        assert!(ContextValue::Integer(1).is_truthy());
        assert!(!ContextValue::Integer(0).is_truthy());
        assert!(!ContextValue::String(String::new()).is_truthy());
        assert!(!ContextValue::None.is_truthy());
        assert!(!ContextValue::List(vec![]).is_truthy());
    }

    #[test]
    fn test_equality_across_safe_and_numeric() {
        assert_eq!(ContextValue::from("a"), ContextValue::SafeString("a".into()));
        assert_eq!(ContextValue::Integer(2), ContextValue::Float(2.0));
        assert_ne!(ContextValue::Integer(1), ContextValue::from("1"));
    }

    #[test]
    fn test_mark_safe() {
        let v = ContextValue::from("<b>bold</b>");
        assert!(!v.is_safe());
        let v = v.mark_safe();
        assert!(v.is_safe());
        assert_eq!(v.to_display_string(), "<b>bold</b>");
        assert_eq!(
            ContextValue::Integer(3).mark_safe(),
            ContextValue::SafeString("3".into())
        );
    }

    #[test]
    fn test_as_integer_and_float() {
        assert_eq!(ContextValue::Float(3.7).as_integer(), Some(3));
        assert_eq!(ContextValue::from(" 10 ").as_integer(), Some(10));
        assert_eq!(ContextValue::None.as_integer(), None);
        assert_eq!(ContextValue::Integer(42).as_float(), Some(42.0));
    }

    #[test]
    fn test_len_counts_chars() {
        assert_eq!(ContextValue::from("héllo").len(), Some(5));
        assert_eq!(ContextValue::Integer(42).len(), None);
    }

    #[test]
    fn test_context_push_pop() {
        let mut ctx = Context::new();
        ctx.set("x", ContextValue::from(1i32));
        ctx.push();
        ctx.set("x", ContextValue::from(2i32));
        assert_eq!(ctx.get("x").unwrap().to_display_string(), "2");
        ctx.pop();
        assert_eq!(ctx.get("x").unwrap().to_display_string(), "1");
        ctx.pop();
        assert!(ctx.contains("x"));
    }

    #[test]
    fn test_context_dot_notation() {
        let mut user = HashMap::new();
        user.insert("name".to_string(), ContextValue::from("Alice"));
        let mut ctx = Context::new();
        ctx.set("user", ContextValue::Dict(user));
        ctx.set("items", ContextValue::from(vec!["first", "second"]));

        assert_eq!(ctx.get("user.name").unwrap().to_display_string(), "Alice");
        assert!(ctx.get("user.email").is_none());
        assert_eq!(ctx.get("items.1").unwrap().to_display_string(), "second");
        assert!(ctx.get("items.5").is_none());
    }

    #[test]
    fn test_from_pairs_and_locale() {
        let ctx = Context::from_pairs([("a", 1i32), ("b", 2i32)])
            .locale_context(LocaleContext::new("de"));
        assert_eq!(ctx.get("b"), Some(&ContextValue::Integer(2)));
        assert_eq!(ctx.locale().language(), "de");
    }

    #[test]
    fn test_flatten() {
        let mut ctx = Context::new();
        ctx.set("a", ContextValue::from(1i32));
        ctx.push();
        ctx.set("a", ContextValue::from(10i32));
        let flat = ctx.flatten();
        assert_eq!(flat["a"], ContextValue::Integer(10));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>bold</b>"), "&lt;b&gt;bold&lt;/b&gt;");
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("it's \"x\""), "it&#x27;s &quot;x&quot;");
    }
}
