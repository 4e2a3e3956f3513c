//! Binding specifications: ordered selector → instruction mappings.

use serde_json::{Map, Value};
use std::rc::Rc;

use crate::error::{BinderError, Result};
use crate::operation::{EventContext, EventHandler};
use crate::scope::{BindFn, Scope};
use crate::value::BindValue;

/// What a binding leaf does with its selected node(s).
#[derive(Clone)]
pub enum Instruction {
    /// Property path, templated string (`{...}` placeholders), `$expression`,
    /// `this.` path, or a `.method()` / `.property` scope shortcut.
    Text(String),
    /// Data getter `(data, scope) -> value`.
    Function(BindFn),
    /// Event handler, for `@event.*` leaves.
    Handler(EventHandler),
    /// Descendant bindings; child keys are appended to the parent selector.
    Nested(BindingSpec),
}

impl Instruction {
    /// Whether the instruction is callable: a function, a handler, or a
    /// `.method()` shortcut.
    pub fn is_function(&self) -> bool {
        match self {
            Instruction::Function(_) | Instruction::Handler(_) => true,
            Instruction::Text(text) => method_shortcut(text).is_some(),
            Instruction::Nested(_) => false,
        }
    }
}

impl std::fmt::Debug for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Instruction::Function(_) => f.write_str("Function(..)"),
            Instruction::Handler(_) => f.write_str("Handler(..)"),
            Instruction::Nested(spec) => f.debug_tuple("Nested").field(spec).finish(),
        }
    }
}

/// `.name()` → `Some("name")`
pub(crate) fn method_shortcut(text: &str) -> Option<&str> {
    text.strip_prefix('.')?.strip_suffix("()")
}

/// Ordered mapping from selector fragments to instructions. Order is kept so
/// that bindings apply in the order they were declared.
#[derive(Clone, Debug, Default)]
pub struct BindingSpec {
    entries: Vec<(String, Instruction)>,
}

impl BindingSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf, replacing any earlier instruction under the same key.
    pub fn insert(mut self, selector: &str, instruction: Instruction) -> Self {
        if let Some(entry) = self.entries.iter_mut().find(|(key, _)| key == selector) {
            entry.1 = instruction;
        } else {
            self.entries.push((selector.to_string(), instruction));
        }
        self
    }

    pub fn text(self, selector: &str, instruction: &str) -> Self {
        self.insert(selector, Instruction::Text(instruction.to_string()))
    }

    pub fn function<F>(self, selector: &str, getter: F) -> Self
    where
        F: Fn(&Value, &Scope) -> BindValue + 'static,
    {
        self.insert(selector, Instruction::Function(Rc::new(getter)))
    }

    pub fn handler<F>(self, selector: &str, handler: F) -> Self
    where
        F: Fn(&EventContext) + 'static,
    {
        self.insert(selector, Instruction::Handler(Rc::new(handler)))
    }

    pub fn nest(self, selector: &str, spec: BindingSpec) -> Self {
        self.insert(selector, Instruction::Nested(spec))
    }

    pub fn entries(&self) -> &[(String, Instruction)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a string-only specification from a JSON object. Nested objects
    /// become nested specs; any other non-string leaf is rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| BinderError::InvalidSpec {
            reason: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(BinderError::InvalidSpec {
                reason: "binding specification must be a JSON object".to_string(),
            });
        };
        let mut spec = BindingSpec::new();
        for (key, leaf) in map {
            spec = match leaf {
                Value::String(text) => spec.text(key, text),
                Value::Object(_) => spec.nest(key, Self::from_value(leaf)?),
                other => {
                    return Err(BinderError::InvalidSpec {
                        reason: format!(
                            "instruction for selector '{}' must be a string or object, found {}",
                            key, other
                        ),
                    })
                }
            };
        }
        Ok(spec)
    }

    /// The scope used when a binder is given none: the specification itself.
    ///
    /// String leaves become properties and nested specs become nested objects,
    /// keyed by their selector fragment. Top-level function and handler
    /// leaves become methods and handlers of the same name.
    pub fn to_scope(&self) -> Scope {
        let scope = Scope::from_value(self.properties());
        for (key, instruction) in &self.entries {
            match instruction {
                Instruction::Function(getter) => scope.set_method(key, getter.clone()),
                Instruction::Handler(handler) => scope.set_handler(key, handler.clone()),
                _ => {}
            }
        }
        scope
    }

    fn properties(&self) -> Value {
        let mut map = Map::new();
        for (key, instruction) in &self.entries {
            match instruction {
                Instruction::Text(text) => {
                    map.insert(key.clone(), Value::String(text.clone()));
                }
                Instruction::Nested(spec) => {
                    map.insert(key.clone(), spec.properties());
                }
                _ => {}
            }
        }
        Value::Object(map)
    }
}
