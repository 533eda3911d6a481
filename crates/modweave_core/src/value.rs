//! HCL literal formatting.
//!
//! Configuration values arrive as YAML and leave as HCL. [`HclValue`] is the
//! closed set of shapes we know how to render, and [`format_value`] turns one
//! into HCL source text.
//!
//! Strings that start with a reference prefix (`var.`, `local.`, `data.`,
//! `module.`) are live expressions and are emitted without quotes. Everything
//! else that is a string gets double quotes. Embedded quotes are not escaped,
//! so callers must not pass strings containing `"`.

use indexmap::IndexMap;
use serde_yaml::Value;
use tracing::warn;

/// Prefixes that mark a string as an HCL expression reference.
pub const REFERENCE_PREFIXES: &[&str] = &["var.", "local.", "data.", "module."];

/// A configuration value that can be rendered as an HCL literal.
#[derive(Debug, Clone, PartialEq)]
pub enum HclValue {
    Null,
    Bool(bool),
    Integer(i64),
    /// Integers beyond `i64::MAX`.
    Unsigned(u64),
    Float(f64),
    String(String),
    List(Vec<HclValue>),
    Map(IndexMap<String, HclValue>),
}

impl HclValue {
    /// Convert a parsed YAML value.
    ///
    /// Mapping keys that are not strings are stringified. Tagged values are
    /// unwrapped.
    pub fn from_yaml(value: &Value) -> Self {
        match value {
            Value::Null => HclValue::Null,
            Value::Bool(b) => HclValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    HclValue::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    HclValue::Unsigned(u)
                } else {
                    HclValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => HclValue::String(s.clone()),
            Value::Sequence(items) => HclValue::List(items.iter().map(Self::from_yaml).collect()),
            Value::Mapping(map) => HclValue::Map(
                map.iter()
                    .map(|(k, v)| (yaml_key(k), Self::from_yaml(v)))
                    .collect(),
            ),
            Value::Tagged(tagged) => Self::from_yaml(&tagged.value),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HclValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Plain text form without quoting, used where a value is embedded in a
    /// quoted attribute regardless of its type.
    pub fn to_plain_string(&self) -> String {
        match self {
            HclValue::String(s) => s.clone(),
            other => format_value(other),
        }
    }
}

impl From<&str> for HclValue {
    fn from(s: &str) -> Self {
        HclValue::String(s.to_string())
    }
}

impl From<String> for HclValue {
    fn from(s: String) -> Self {
        HclValue::String(s)
    }
}

impl From<bool> for HclValue {
    fn from(b: bool) -> Self {
        HclValue::Bool(b)
    }
}

impl From<i64> for HclValue {
    fn from(i: i64) -> Self {
        HclValue::Integer(i)
    }
}

impl From<f64> for HclValue {
    fn from(f: f64) -> Self {
        HclValue::Float(f)
    }
}

/// Whether a string starts with one of the reference prefixes.
pub fn is_reference(s: &str) -> bool {
    REFERENCE_PREFIXES.iter().any(|prefix| s.starts_with(prefix))
}

/// Render a value as an HCL literal.
pub fn format_value(value: &HclValue) -> String {
    match value {
        HclValue::Null => "null".to_string(),
        HclValue::Bool(b) => b.to_string(),
        HclValue::Integer(i) => i.to_string(),
        HclValue::Unsigned(u) => u.to_string(),
        HclValue::Float(f) if f.is_finite() => f.to_string(),
        HclValue::Float(f) => {
            warn!("HCL has no literal for {}, emitting it as a string", f);
            format!("\"{}\"", f)
        }
        HclValue::String(s) if is_reference(s) => s.clone(),
        HclValue::String(s) => format!("\"{}\"", s),
        HclValue::List(items) => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        HclValue::Map(entries) => {
            let items: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{} = {}", k, format_value(v)))
                .collect();
            format!("{{\n  {}\n}}", items.join("\n  "))
        }
    }
}

/// Stringify a YAML mapping key.
pub(crate) fn yaml_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => format_value(&HclValue::from_yaml(other)),
    }
}

/// Convert a YAML mapping into an ordered map of HCL values.
///
/// Anything other than a mapping yields an empty map.
pub(crate) fn yaml_to_map(value: Option<&Value>) -> IndexMap<String, HclValue> {
    match value {
        Some(Value::Mapping(map)) => map
            .iter()
            .map(|(k, v)| (yaml_key(k), HclValue::from_yaml(v)))
            .collect(),
        _ => IndexMap::new(),
    }
}
