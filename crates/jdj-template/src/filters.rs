//! Built-in template filters.
//!
//! Each filter is a type implementing [`Filter`], registered by name in a
//! [`FilterRegistry`]. Every environment owns a registry seeded with the
//! built-ins; applications may register more.

use std::collections::HashMap;

use jdj_core::error::{JdjError, JdjResult};

use crate::context::{escape_html, ContextValue};

/// A template filter function.
///
/// Takes a value and optional arguments, and returns a transformed value.
pub trait Filter: Send + Sync {
    /// Returns the filter name.
    fn name(&self) -> &'static str;

    /// Applies the filter to a value with the given arguments.
    fn apply(&self, value: &ContextValue, args: &[ContextValue]) -> JdjResult<ContextValue>;
}

/// A registry of available template filters.
pub struct FilterRegistry {
    filters: HashMap<String, Box<dyn Filter>>,
}

impl FilterRegistry {
    /// Creates a new empty filter registry.
    pub fn new() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Creates a registry holding every built-in filter.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        register_all(&mut r);
        r
    }

    /// Registers a filter, replacing any filter with the same name.
    pub fn register(&mut self, filter: Box<dyn Filter>) {
        self.filters.insert(filter.name().to_string(), filter);
    }

    /// Registers a filter under an additional name.
    pub fn register_as(&mut self, name: &str, filter: Box<dyn Filter>) {
        self.filters.insert(name.to_string(), filter);
    }

    /// Returns `true` if a filter is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Applies a named filter to a value.
    ///
    /// # Errors
    ///
    /// Returns a `RenderError` for unknown filters and whatever the filter
    /// itself returns.
    pub fn apply(
        &self,
        name: &str,
        value: &ContextValue,
        args: &[ContextValue],
    ) -> JdjResult<ContextValue> {
        let filter = self
            .filters
            .get(name)
            .ok_or_else(|| JdjError::render(format!("Unknown filter: '{name}'")))?;
        filter.apply(value, args)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FilterRegistry").field("filters", &names).finish()
    }
}

fn register_all(r: &mut FilterRegistry) {
    // String filters
    r.register(Box::new(LowerFilter));
    r.register(Box::new(UpperFilter));
    r.register(Box::new(TitleFilter));
    r.register(Box::new(CapfirstFilter));
    r.register(Box::new(EscapeFilter));
    r.register(Box::new(SafeFilter));

    // List filters
    r.register(Box::new(LengthFilter));
    r.register(Box::new(FirstFilter));
    r.register(Box::new(LastFilter));
    r.register(Box::new(JoinFilter));

    // Logic / numbers
    r.register(Box::new(DefaultFilter));
    r.register(Box::new(AddFilter));

    r.register_as("e", Box::new(EscapeFilter));
    r.register_as("d", Box::new(DefaultFilter));
    r.register_as("count", Box::new(LengthFilter));
}

struct LowerFilter;
impl Filter for LowerFilter {
    fn name(&self) -> &'static str {
        "lower"
    }
    fn apply(&self, value: &ContextValue, _args: &[ContextValue]) -> JdjResult<ContextValue> {
        Ok(ContextValue::String(value.to_display_string().to_lowercase()))
    }
}

struct UpperFilter;
impl Filter for UpperFilter {
    fn name(&self) -> &'static str {
        "upper"
    }
    fn apply(&self, value: &ContextValue, _args: &[ContextValue]) -> JdjResult<ContextValue> {
        Ok(ContextValue::String(value.to_display_string().to_uppercase()))
    }
}

struct TitleFilter;
impl Filter for TitleFilter {
    fn name(&self) -> &'static str {
        "title"
    }
    fn apply(&self, value: &ContextValue, _args: &[ContextValue]) -> JdjResult<ContextValue> {
        let s = value.to_display_string();
        let mut out = String::with_capacity(s.len());
        let mut at_word_start = true;
        for c in s.chars() {
            if c.is_alphanumeric() {
                if at_word_start {
                    out.extend(c.to_uppercase());
                } else {
                    out.extend(c.to_lowercase());
                }
                at_word_start = false;
            } else {
                out.push(c);
                at_word_start = true;
            }
        }
        Ok(ContextValue::String(out))
    }
}

struct CapfirstFilter;
impl Filter for CapfirstFilter {
    fn name(&self) -> &'static str {
        "capfirst"
    }
    fn apply(&self, value: &ContextValue, _args: &[ContextValue]) -> JdjResult<ContextValue> {
        let s = value.to_display_string();
        let mut chars = s.chars();
        let out = chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        });
        Ok(ContextValue::String(out))
    }
}

struct EscapeFilter;
impl Filter for EscapeFilter {
    fn name(&self) -> &'static str {
        "escape"
    }
    fn apply(&self, value: &ContextValue, _args: &[ContextValue]) -> JdjResult<ContextValue> {
        if value.is_safe() {
            return Ok(value.clone());
        }
        Ok(ContextValue::SafeString(escape_html(
            &value.to_display_string(),
        )))
    }
}

struct SafeFilter;
impl Filter for SafeFilter {
    fn name(&self) -> &'static str {
        "safe"
    }
    fn apply(&self, value: &ContextValue, _args: &[ContextValue]) -> JdjResult<ContextValue> {
        Ok(value.clone().mark_safe())
    }
}

struct LengthFilter;
impl Filter for LengthFilter {
    fn name(&self) -> &'static str {
        "length"
    }
    fn apply(&self, value: &ContextValue, _args: &[ContextValue]) -> JdjResult<ContextValue> {
        Ok(ContextValue::from(value.len().unwrap_or(0)))
    }
}

struct FirstFilter;
impl Filter for FirstFilter {
    fn name(&self) -> &'static str {
        "first"
    }
    fn apply(&self, value: &ContextValue, _args: &[ContextValue]) -> JdjResult<ContextValue> {
        Ok(match value {
            ContextValue::List(list) => list.first().cloned().unwrap_or(ContextValue::None),
            ContextValue::String(s) | ContextValue::SafeString(s) => s
                .chars()
                .next()
                .map_or(ContextValue::None, |c| ContextValue::String(c.to_string())),
            _ => ContextValue::None,
        })
    }
}

struct LastFilter;
impl Filter for LastFilter {
    fn name(&self) -> &'static str {
        "last"
    }
    fn apply(&self, value: &ContextValue, _args: &[ContextValue]) -> JdjResult<ContextValue> {
        Ok(match value {
            ContextValue::List(list) => list.last().cloned().unwrap_or(ContextValue::None),
            ContextValue::String(s) | ContextValue::SafeString(s) => s
                .chars()
                .last()
                .map_or(ContextValue::None, |c| ContextValue::String(c.to_string())),
            _ => ContextValue::None,
        })
    }
}

struct JoinFilter;
impl Filter for JoinFilter {
    fn name(&self) -> &'static str {
        "join"
    }
    fn apply(&self, value: &ContextValue, args: &[ContextValue]) -> JdjResult<ContextValue> {
        let separator = args
            .first()
            .map(ContextValue::to_display_string)
            .unwrap_or_default();
        match value {
            ContextValue::List(list) => {
                let joined = list
                    .iter()
                    .map(ContextValue::to_display_string)
                    .collect::<Vec<_>>()
                    .join(&separator);
                Ok(ContextValue::String(joined))
            }
            _ => Ok(value.clone()),
        }
    }
}

struct DefaultFilter;
impl Filter for DefaultFilter {
    fn name(&self) -> &'static str {
        "default"
    }
    fn apply(&self, value: &ContextValue, args: &[ContextValue]) -> JdjResult<ContextValue> {
        if value.is_truthy() {
            Ok(value.clone())
        } else {
            Ok(args.first().cloned().unwrap_or(ContextValue::None))
        }
    }
}

struct AddFilter;
impl Filter for AddFilter {
    fn name(&self) -> &'static str {
        "add"
    }
    fn apply(&self, value: &ContextValue, args: &[ContextValue]) -> JdjResult<ContextValue> {
        let arg = args.first().unwrap_or(&ContextValue::None);
        match (value, arg) {
            (ContextValue::Integer(a), ContextValue::Integer(b)) => a
                .checked_add(*b)
                .map(ContextValue::Integer)
                .ok_or_else(|| JdjError::render("integer overflow in 'add'")),
            _ => match (value.as_float(), arg.as_float()) {
                (Some(a), Some(b)) if value.is_number() || arg.is_number() => {
                    Ok(ContextValue::Float(a + b))
                }
                _ => Ok(ContextValue::String(format!(
                    "{}{}",
                    value.to_display_string(),
                    arg.to_display_string()
                ))),
            },
        }
    }
}
