//! The function scope that instructions are evaluated against.
//!
//! A scope is the explicit stand-in for an implicit `this`: function
//! instructions receive it as a parameter, `this.` paths read its properties,
//! and `.name()` / `.name` shortcuts resolve against it at construction.

use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::operation::EventHandler;
use crate::value::BindValue;

/// A function instruction or scope method: `(data, scope) -> value`.
pub type BindFn = Rc<dyn Fn(&Value, &Scope) -> BindValue>;

#[derive(Default)]
struct ScopeInner {
    properties: RefCell<Map<String, Value>>,
    methods: RefCell<HashMap<String, BindFn>>,
    handlers: RefCell<HashMap<String, EventHandler>>,
}

/// Shared handle; clones refer to the same scope, so property updates made
/// between binds are seen by every compiled getter.
#[derive(Clone, Default)]
pub struct Scope(Rc<ScopeInner>);

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope whose properties are the fields of a JSON object. Non-object
    /// values give an empty scope.
    pub fn from_value(value: Value) -> Self {
        let scope = Self::new();
        if let Value::Object(map) = value {
            *scope.0.properties.borrow_mut() = map;
        }
        scope
    }

    pub fn with_property(self, name: &str, value: Value) -> Self {
        self.set_property(name, value);
        self
    }

    pub fn with_method<F>(self, name: &str, method: F) -> Self
    where
        F: Fn(&Value, &Scope) -> BindValue + 'static,
    {
        self.set_method(name, Rc::new(method));
        self
    }

    pub fn with_handler<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&crate::operation::EventContext) + 'static,
    {
        self.set_handler(name, Rc::new(handler));
        self
    }

    pub fn set_property(&self, name: &str, value: Value) {
        self.0
            .properties
            .borrow_mut()
            .insert(name.to_string(), value);
    }

    pub fn set_method(&self, name: &str, method: BindFn) {
        self.0.methods.borrow_mut().insert(name.to_string(), method);
    }

    pub fn set_handler(&self, name: &str, handler: EventHandler) {
        self.0.handlers.borrow_mut().insert(name.to_string(), handler);
    }

    pub fn property(&self, name: &str) -> Option<Value> {
        self.0.properties.borrow().get(name).cloned()
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.0.properties.borrow().contains_key(name)
    }

    pub fn method(&self, name: &str) -> Option<BindFn> {
        self.0.methods.borrow().get(name).cloned()
    }

    pub fn handler(&self, name: &str) -> Option<EventHandler> {
        self.0.handlers.borrow().get(name).cloned()
    }

    /// Snapshot of all properties as a JSON object.
    pub fn properties(&self) -> Value {
        Value::Object(self.0.properties.borrow().clone())
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<String> = self.0.methods.borrow().keys().cloned().collect();
        methods.sort();
        let mut handlers: Vec<String> = self.0.handlers.borrow().keys().cloned().collect();
        handlers.sort();
        f.debug_struct("Scope")
            .field("properties", &self.properties())
            .field("methods", &methods)
            .field("handlers", &handlers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clones_share_properties() {
        let scope = Scope::from_value(json!({"selected": 1}));
        let other = scope.clone();
        other.set_property("selected", json!(2));
        assert_eq!(scope.property("selected"), Some(json!(2)));
        assert!(scope.ptr_eq(&other));
    }

    #[test]
    fn test_methods_receive_data_and_scope() {
        let scope = Scope::new()
            .with_property("prefix", json!("#"))
            .with_method("label", |data: &Value, scope: &Scope| {
                let prefix = scope.property("prefix").unwrap_or(Value::Null);
                BindValue::from(format!("{}{}", prefix.as_str().unwrap_or(""), data["id"]))
            });
        let label = scope.method("label").unwrap();
        assert_eq!(label(&json!({"id": 7}), &scope), BindValue::from("#7"));
        assert!(scope.method("missing").is_none());
    }
}
