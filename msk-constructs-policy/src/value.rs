//! String values that may only be known once the template is deployed.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A string that is either known at construction time or deferred to a
/// template intrinsic (`Ref`, `Fn::GetAtt`, `Fn::Join`, ...).
///
/// Deserializes from a JSON string or a JSON object; numbers, booleans,
/// arrays and `null` are rejected. Deferred values are carried verbatim into
/// the emitted template and are never inspected by the builders beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringValue {
    /// A value known at construction time
    Literal(String),
    /// A placeholder resolved during deployment
    Deferred(Map<String, Value>),
}

impl StringValue {
    /// Create a literal value
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Wrap an intrinsic object as a deferred value
    pub fn deferred(intrinsic: Map<String, Value>) -> Self {
        Self::Deferred(intrinsic)
    }

    /// `{function: argument}`, e.g. `intrinsic("Fn::Join", json!(["", [...]]))`
    pub fn intrinsic(function: &str, argument: Value) -> Self {
        let mut intrinsic = Map::new();
        intrinsic.insert(function.to_string(), argument);
        Self::Deferred(intrinsic)
    }

    /// `{"Ref": logical_id}`
    pub fn reference(logical_id: &str) -> Self {
        Self::intrinsic("Ref", Value::String(logical_id.to_string()))
    }

    /// `{"Fn::GetAtt": [logical_id, attribute]}`
    pub fn get_att(logical_id: &str, attribute: &str) -> Self {
        Self::intrinsic("Fn::GetAtt", json!([logical_id, attribute]))
    }

    /// Whether the value is a placeholder that cannot be inspected yet
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// The literal string, if the value is known
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Deferred(_) => None,
        }
    }

    /// Render the value as it appears in a template
    pub fn to_json(&self) -> Value {
        match self {
            Self::Literal(value) => Value::String(value.clone()),
            Self::Deferred(intrinsic) => Value::Object(intrinsic.clone()),
        }
    }
}

impl fmt::Display for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.write_str(value),
            Self::Deferred(_) => write!(f, "${{Token[{}]}}", self.to_json()),
        }
    }
}

impl From<&str> for StringValue {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<String> for StringValue {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl From<&String> for StringValue {
    fn from(value: &String) -> Self {
        Self::Literal(value.clone())
    }
}

impl From<&StringValue> for StringValue {
    fn from(value: &StringValue) -> Self {
        value.clone()
    }
}

/// Collapse a list of values the way policy fields are emitted:
/// empty lists disappear, singletons become scalars, anything longer stays a list.
pub(crate) fn normalize_values(values: &[StringValue]) -> Option<Value> {
    match values {
        [] => None,
        [single] => Some(single.to_json()),
        many => Some(Value::Array(many.iter().map(StringValue::to_json).collect())),
    }
}

/// Drop repeated entries while keeping first-seen order
pub(crate) fn unique_values(values: &[StringValue]) -> Vec<StringValue> {
    let mut seen: Vec<StringValue> = Vec::with_capacity(values.len());
    for value in values {
        if !seen.contains(value) {
            seen.push(value.clone());
        }
    }
    seen
}
