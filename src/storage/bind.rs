//! Input sources accepted by `IssueRecordStore::bind`.

use serde_json::{Map, Value};

/// How a request input should filter a value before handing it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterHint {
    /// Command-style token: keeps `[A-Za-z0-9._-]`, applied to strings.
    Cmd,
    /// Structured value returned as-is (objects and arrays).
    Array,
}

/// A request-like object exposing filtered `get` access.
pub trait InputSource {
    fn get(&self, key: &str, default: Value, hint: FilterHint) -> Value;
}

/// What `bind` can merge into a record.
#[derive(Clone, Copy)]
pub enum BindSource<'a> {
    /// A key/value mapping of attributes. Must be a JSON object.
    Attributes(&'a Value),
    /// A request object; only `id` and `fields` are read from it.
    Request(&'a dyn InputSource),
}

impl<'a> From<&'a Value> for BindSource<'a> {
    fn from(value: &'a Value) -> Self {
        Self::Attributes(value)
    }
}

impl<'a> From<&'a dyn InputSource> for BindSource<'a> {
    fn from(input: &'a dyn InputSource) -> Self {
        Self::Request(input)
    }
}

/// Request input backed by decoded parameters (query string or form body).
#[derive(Debug, Clone, Default)]
pub struct RequestInput {
    params: Map<String, Value>,
}

impl RequestInput {
    #[must_use]
    pub const fn new(params: Map<String, Value>) -> Self {
        Self { params }
    }

    /// Build from a JSON value; non-objects yield an empty input.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(params) => Self { params },
            _ => Self::default(),
        }
    }
}

impl InputSource for RequestInput {
    fn get(&self, key: &str, default: Value, hint: FilterHint) -> Value {
        let Some(value) = self.params.get(key) else {
            return default;
        };

        match hint {
            FilterHint::Cmd => match value {
                Value::String(s) => Value::String(
                    s.chars()
                        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
                        .collect(),
                ),
                Value::Array(_) | Value::Object(_) => default,
                other => other.clone(),
            },
            FilterHint::Array => match value {
                Value::Object(_) | Value::Array(_) => value.clone(),
                Value::Null => default,
                other => Value::Array(vec![other.clone()]),
            },
        }
    }
}
