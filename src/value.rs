//! Values produced by data getters.
//!
//! A getter result is either "nothing" ([`BindValue::Undefined`]), a JSON value,
//! or a list of nodes (for `#append` bindings). Truthiness and string coercion
//! follow the loose rules binding authors expect from templating: `0`, `""`,
//! `false`, `null` and undefined are falsy; numbers print without a trailing
//! `.0` when integral.

use serde_json::Value;

use crate::dom::Node;

#[derive(Clone, Debug, Default)]
pub enum BindValue {
    /// No value: text and attribute bindings leave their target unchanged.
    #[default]
    Undefined,
    Value(Value),
    Nodes(Vec<Node>),
}

impl BindValue {
    pub fn null() -> Self {
        BindValue::Value(Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, BindValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, BindValue::Value(Value::Null))
    }

    /// Undefined or null
    pub fn is_nullish(&self) -> bool {
        self.is_undefined() || self.is_null()
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            BindValue::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            BindValue::Undefined => false,
            BindValue::Value(value) => is_truthy(value),
            BindValue::Nodes(_) => true,
        }
    }

    /// Default string representation (`undefined` for [`BindValue::Undefined`]).
    pub fn to_display_string(&self) -> String {
        match self {
            BindValue::Undefined => "undefined".to_string(),
            BindValue::Value(value) => display_value(value),
            BindValue::Nodes(nodes) => nodes
                .iter()
                .map(Node::text_content)
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// String used when a value is spliced into a templated string: absent
    /// values (undefined or null) contribute nothing.
    pub fn to_template_string(&self) -> String {
        if self.is_nullish() {
            String::new()
        } else {
            self.to_display_string()
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            BindValue::Undefined => f64::NAN,
            BindValue::Value(value) => to_number(value),
            BindValue::Nodes(_) => f64::NAN,
        }
    }

    /// Class tokens carried by the value: a string (split on whitespace) or an
    /// array of strings. Anything else yields no tokens.
    pub fn class_tokens(&self) -> Vec<String> {
        match self.as_value() {
            Some(Value::String(s)) => s.split_ascii_whitespace().map(str::to_string).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .flat_map(str::split_ascii_whitespace)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Nodes for an append binding: a node list, or nothing.
    pub fn into_nodes(self) -> Vec<Node> {
        match self {
            BindValue::Nodes(nodes) => nodes,
            _ => Vec::new(),
        }
    }

    /// JSON form, used for in-memory property assignment. Nodes have no JSON
    /// form and map to their text.
    pub fn into_json(self) -> Option<Value> {
        match self {
            BindValue::Undefined => None,
            BindValue::Value(value) => Some(value),
            nodes @ BindValue::Nodes(_) => Some(Value::String(nodes.to_display_string())),
        }
    }

    pub fn loose_eq(&self, other: &BindValue) -> bool {
        match (self, other) {
            (BindValue::Undefined, BindValue::Undefined) => true,
            (BindValue::Undefined, b) | (b, BindValue::Undefined) => b.is_null(),
            (BindValue::Value(Value::Number(a)), BindValue::Value(Value::Number(b))) => {
                a.as_f64() == b.as_f64()
            }
            (BindValue::Value(a), BindValue::Value(b)) => a == b,
            (BindValue::Nodes(a), BindValue::Nodes(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.ptr_eq(y))
            }
            _ => false,
        }
    }
}

impl PartialEq for BindValue {
    fn eq(&self, other: &Self) -> bool {
        self.loose_eq(other) && self.is_undefined() == other.is_undefined()
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format_number(f),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display_value(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

pub fn format_number(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let sign = if f > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if f.fract() == 0.0 && f.abs() < 1e21 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Wrap an f64 result as a JSON number; non-finite results become null.
pub fn number_value(f: f64) -> BindValue {
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        return BindValue::Value(Value::from(f as i64));
    }
    serde_json::Number::from_f64(f)
        .map(|n| BindValue::Value(Value::Number(n)))
        .unwrap_or_else(BindValue::null)
}

impl From<Value> for BindValue {
    fn from(value: Value) -> Self {
        BindValue::Value(value)
    }
}

impl From<&Value> for BindValue {
    fn from(value: &Value) -> Self {
        BindValue::Value(value.clone())
    }
}

impl From<&str> for BindValue {
    fn from(value: &str) -> Self {
        BindValue::Value(Value::String(value.to_string()))
    }
}

impl From<String> for BindValue {
    fn from(value: String) -> Self {
        BindValue::Value(Value::String(value))
    }
}

impl From<bool> for BindValue {
    fn from(value: bool) -> Self {
        BindValue::Value(Value::Bool(value))
    }
}

impl From<i64> for BindValue {
    fn from(value: i64) -> Self {
        BindValue::Value(Value::from(value))
    }
}

impl From<f64> for BindValue {
    fn from(value: f64) -> Self {
        number_value(value)
    }
}

impl From<Node> for BindValue {
    fn from(node: Node) -> Self {
        BindValue::Nodes(vec![node])
    }
}

impl From<Vec<Node>> for BindValue {
    fn from(nodes: Vec<Node>) -> Self {
        BindValue::Nodes(nodes)
    }
}

impl<T: Into<BindValue>> From<Option<T>> for BindValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(BindValue::Undefined, Into::into)
    }
}
