//! Expression compiler: binding instructions → data getters.
//!
//! String instructions are classified once, at construction:
//!
//! - `.name()` resolves to a scope method, `.name` to a scope property. An
//!   unknown name is a construction error.
//! - A string containing `{...}` placeholders is split into literal and
//!   placeholder segments whose values are concatenated.
//! - Otherwise the whole string is one placeholder.
//!
//! A placeholder is a `$expression` (see [`crate::eval`]), a `this.` path on the
//! scope, or a dot-separated path on the data. Placeholders that fail at bind
//! time degrade to an empty string.

use regex::Regex;
use serde_json::Value;

use crate::binding_spec::Instruction;
use crate::error::{BinderError, Result};
use crate::eval::{lookup_path, member, EvalError, Expr};
use crate::options::BindOptions;
use crate::scope::{BindFn, Scope};
use crate::value::BindValue;

lazy_static::lazy_static! {
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"\{([^}]+)\}").unwrap();
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Expression { source: String, expr: Expr },
    ScopePath { source: String, path: Vec<String> },
    DataPath { source: String, path: Vec<String> },
}

impl Segment {
    fn parse(text: &str, selector: &str) -> Result<Segment> {
        let text = text.trim();
        if let Some(expression) = text.strip_prefix('$') {
            let expr = Expr::parse(expression).map_err(|e| BinderError::InvalidExpression {
                selector: selector.to_string(),
                expression: text.to_string(),
                reason: e.to_string(),
            })?;
            return Ok(Segment::Expression {
                source: text.to_string(),
                expr,
            });
        }
        if let Some(path) = text.strip_prefix("this.") {
            return Ok(Segment::ScopePath {
                source: text.to_string(),
                path: split_path(path),
            });
        }
        Ok(Segment::DataPath {
            source: text.to_string(),
            path: split_path(text),
        })
    }

    fn evaluate(&self, data: &Value, scope: &Scope) -> std::result::Result<BindValue, EvalError> {
        match self {
            Segment::Literal(text) => Ok(BindValue::from(text.as_str())),
            Segment::Expression { expr, .. } => expr.evaluate(data, scope),
            Segment::ScopePath { path, .. } => {
                let (first, rest) = match path.split_first() {
                    Some(split) => split,
                    None => return Ok(BindValue::Undefined),
                };
                let mut current: BindValue = scope.property(first).into();
                for segment in rest {
                    current = member(&current, segment)?;
                }
                Ok(current)
            }
            Segment::DataPath { path, .. } => lookup_path(data, path.as_slice()),
        }
    }

    fn source(&self) -> &str {
        match self {
            Segment::Literal(text) => text,
            Segment::Expression { source, .. }
            | Segment::ScopePath { source, .. }
            | Segment::DataPath { source, .. } => source,
        }
    }

    /// The object a failing segment was reading from, for diagnostics.
    fn failed_against(&self, data: &Value, scope: &Scope) -> Value {
        match self {
            Segment::ScopePath { .. } => scope.properties(),
            _ => data.clone(),
        }
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(|s| s.trim().to_string()).collect()
}

#[derive(Clone)]
enum GetterKind {
    Function(BindFn),
    ScopeProperty(String),
    /// No placeholders: the raw value of one expression or path.
    Single(Segment),
    /// Placeholders: the concatenated string of all segments.
    Template(Vec<Segment>),
}

/// A compiled `(data) -> value` getter with its scope bound in.
#[derive(Clone)]
pub struct DataGetter {
    source: String,
    kind: GetterKind,
    scope: Scope,
    bind_warnings: bool,
}

impl DataGetter {
    pub fn compile(
        instruction: &Instruction,
        selector: &str,
        scope: &Scope,
        options: &BindOptions,
    ) -> Result<DataGetter> {
        let (source, kind) = match instruction {
            Instruction::Function(getter) => ("<function>".to_string(), GetterKind::Function(getter.clone())),
            Instruction::Text(text) => (text.clone(), compile_text(text, selector, scope)?),
            Instruction::Handler(_) | Instruction::Nested(_) => {
                return Err(BinderError::InvalidInstruction {
                    selector: selector.to_string(),
                })
            }
        };
        Ok(DataGetter {
            source,
            kind,
            scope: scope.clone(),
            bind_warnings: options.bind_warnings,
        })
    }

    /// Instruction text the getter was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn get(&self, data: &Value) -> BindValue {
        match &self.kind {
            GetterKind::Function(getter) => getter(data, &self.scope),
            GetterKind::ScopeProperty(name) => self.scope.property(name).into(),
            GetterKind::Single(segment) => self
                .evaluate_segment(segment, data)
                .unwrap_or_else(|| BindValue::from("")),
            GetterKind::Template(segments) => {
                let mut out = String::new();
                for segment in segments {
                    if let Some(value) = self.evaluate_segment(segment, data) {
                        out.push_str(&value.to_template_string());
                    }
                }
                BindValue::from(out)
            }
        }
    }

    /// `None` when the segment failed and degrades to empty.
    fn evaluate_segment(&self, segment: &Segment, data: &Value) -> Option<BindValue> {
        match segment.evaluate(data, &self.scope) {
            Ok(value) => Some(value),
            Err(err) => {
                if self.bind_warnings {
                    tracing::warn!(
                        "Binding instruction expression '{}' failed to retrieve value from {}: {}",
                        segment.source(),
                        segment.failed_against(data, &self.scope),
                        err
                    );
                }
                None
            }
        }
    }
}

impl std::fmt::Debug for DataGetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataGetter")
            .field("source", &self.source)
            .finish()
    }
}

fn compile_text(text: &str, selector: &str, scope: &Scope) -> Result<GetterKind> {
    if let Some(name) = text.strip_prefix('.') {
        if let Some(method) = name.strip_suffix("()") {
            return scope
                .method(method)
                .map(GetterKind::Function)
                .ok_or_else(|| BinderError::UnknownScopeMethod {
                    selector: selector.to_string(),
                    name: method.to_string(),
                });
        }
        if scope.has_property(name) {
            return Ok(GetterKind::ScopeProperty(name.to_string()));
        }
        return Err(BinderError::UnknownScopeProperty {
            selector: selector.to_string(),
            name: name.to_string(),
        });
    }

    if !PLACEHOLDER_RE.is_match(text) {
        return Ok(GetterKind::Single(Segment::parse(text, selector)?));
    }

    let mut segments = Vec::new();
    let mut last_end = 0;
    for captures in PLACEHOLDER_RE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if whole.start() > last_end {
            segments.push(Segment::Literal(text[last_end..whole.start()].to_string()));
        }
        segments.push(Segment::parse(inner.as_str(), selector)?);
        last_end = whole.end();
    }
    if last_end < text.len() {
        segments.push(Segment::Literal(text[last_end..].to_string()));
    }
    Ok(GetterKind::Template(segments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn getter(text: &str) -> DataGetter {
        DataGetter::compile(
            &Instruction::Text(text.to_string()),
            "td",
            &Scope::new(),
            &BindOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_single_path_returns_raw_value() {
        let value = getter("address.zip").get(&json!({"address": {"zip": 90210}}));
        assert_eq!(value, BindValue::from(90210i64));
    }

    #[test]
    fn test_template_segments() {
        let g = getter("Hello {name}!");
        assert_eq!(g.get(&json!({"name": "Ada"})), BindValue::from("Hello Ada!"));
        assert_eq!(g.source(), "Hello {name}!");
    }
}
