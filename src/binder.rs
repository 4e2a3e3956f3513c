//! Runtime: the public binder surface.
//!
//! Cookie-cutter cycle:
//! `reset(template) → bind(template) → clone → set bound data → post-clone
//! bindings → attach events → after-bind callback`.
//!
//! Rebind cycle (existing instance):
//! `rebind resets → rebind bindings → post-clone bindings → set bound data →
//! after-bind callback`. Listeners are never attached twice.
//!
//! In-place cycle (bind and rebind alike):
//! `reset(template) → bind(template) → set bound data → after-bind callback`.
//! Events are attached once, at construction.

use serde_json::Value;
use std::rc::Rc;

use crate::binding_spec::BindingSpec;
use crate::compile::{BindingFactory, CompiledBindings};
use crate::dom::Node;
use crate::error::{BinderError, Result};
use crate::operation::fire_after_bind;
use crate::options::{binding_defaults, BindMode, BindOptions};
use crate::scope::Scope;

/// Template argument accepted by a binder.
#[derive(Debug, Clone)]
pub enum Template {
    /// Markup; the first element it contains becomes the template.
    Markup(String),
    /// An element, or a `<template>` element whose first element child is used.
    Node(Node),
}

impl From<&str> for Template {
    fn from(markup: &str) -> Self {
        Template::Markup(markup.to_string())
    }
}

impl From<String> for Template {
    fn from(markup: String) -> Self {
        Template::Markup(markup)
    }
}

impl From<Node> for Template {
    fn from(node: Node) -> Self {
        Template::Node(node)
    }
}

impl From<&Node> for Template {
    fn from(node: &Node) -> Self {
        Template::Node(node.clone())
    }
}

pub struct BinderBuilder {
    template: Template,
    spec: BindingSpec,
    scope: Option<Scope>,
    mode: BindMode,
    options: Option<BindOptions>,
}

impl BinderBuilder {
    /// Scope for function instructions, `this.` paths and `.name` shortcuts.
    /// Defaults to a scope derived from the binding specification.
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn mode(mut self, mode: BindMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn in_place(self) -> Self {
        self.mode(BindMode::InPlace)
    }

    /// Explicit options replace the process defaults entirely.
    pub fn options(mut self, options: BindOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn build(self) -> Result<Binder> {
        let options = self.options.unwrap_or_else(binding_defaults);
        let scope = self.scope.unwrap_or_else(|| self.spec.to_scope());
        let (template, reset_root) = prepare_template(self.template, self.mode)?;

        let compiled = BindingFactory::new(self.mode, &scope, options, &template, &reset_root)
            .compile(&self.spec)?;

        if self.mode == BindMode::InPlace {
            for event in &compiled.events {
                event.attach(&template, options.bind_warnings);
            }
        }

        tracing::debug!(
            mode = ?self.mode,
            operations = compiled.operations.len(),
            post_clone = compiled.post_clone.len(),
            events = compiled.events.len(),
            resets = compiled.resets.len(),
            after_bind = compiled.after_bind.is_some(),
            "binder compiled"
        );

        Ok(Binder {
            mode: self.mode,
            template,
            reset_root,
            scope,
            options,
            compiled,
        })
    }
}

/// Work out the live template and its pristine reset root.
fn prepare_template(template: Template, mode: BindMode) -> Result<(Node, Node)> {
    match mode {
        BindMode::InPlace => {
            let Template::Node(node) = template else {
                return Err(BinderError::InvalidTemplate {
                    reason: "in-place binder template must be an existing element".to_string(),
                });
            };
            if !node.is_element() {
                return Err(BinderError::InvalidTemplate {
                    reason: "in-place binder template must be an existing element".to_string(),
                });
            }
            let reset_root = node.deep_clone();
            Ok((node, reset_root))
        }
        BindMode::CookieCutter => {
            let source = match template {
                Template::Markup(markup) => Node::parse(&markup).ok_or_else(|| BinderError::InvalidTemplate {
                    reason: "template markup contains no element".to_string(),
                })?,
                Template::Node(node) if node.tag_name() == Some("template") => {
                    node.first_element_child().ok_or_else(|| BinderError::InvalidTemplate {
                        reason: "<template> element has no element content".to_string(),
                    })?
                }
                Template::Node(node) if node.is_element() => node,
                Template::Node(_) => {
                    return Err(BinderError::InvalidTemplate {
                        reason: "template must be markup or an element".to_string(),
                    })
                }
            };
            let reset_root = source.deep_clone();
            let template = reset_root.deep_clone();
            Ok((template, reset_root))
        }
    }
}

/// A compiled template/binding pair.
pub struct Binder {
    mode: BindMode,
    template: Node,
    reset_root: Node,
    scope: Scope,
    options: BindOptions,
    compiled: CompiledBindings,
}

impl Binder {
    /// Cookie-cutter binder with the default scope and process default options.
    pub fn new(template: impl Into<Template>, spec: BindingSpec) -> Result<Binder> {
        Self::builder(template, spec).build()
    }

    /// In-place binder over an existing element.
    pub fn in_place(template: &Node, spec: BindingSpec) -> Result<Binder> {
        Self::builder(template, spec).in_place().build()
    }

    pub fn builder(template: impl Into<Template>, spec: BindingSpec) -> BinderBuilder {
        BinderBuilder {
            template: template.into(),
            spec,
            scope: None,
            mode: BindMode::default(),
            options: None,
        }
    }

    /// Bind `data`. Cookie-cutter binders return a new instance; in-place
    /// binders return the template itself.
    pub fn bind(&self, data: impl Into<Rc<Value>>) -> Node {
        let data = data.into();
        match self.mode {
            BindMode::InPlace => self.bind_in_place(data),
            BindMode::CookieCutter => self.cut(data),
        }
    }

    /// Re-bind an existing instance without cloning. In-place binders ignore
    /// `node` and behave exactly like [`Binder::bind`].
    pub fn rebind(&self, data: impl Into<Rc<Value>>, node: &Node) -> Node {
        let data = data.into();
        match self.mode {
            BindMode::InPlace => self.bind_in_place(data),
            BindMode::CookieCutter => self.rebind_instance(data, node),
        }
    }

    /// Re-apply bindings to `node` with the data it already carries.
    ///
    /// In-place binders keep their data on the template, so `node` is ignored
    /// there; [`Binder::bind_stored`] is the form that takes no node.
    pub fn refresh(&self, node: &Node) -> Node {
        match self.mode {
            BindMode::InPlace => self.bind_stored(),
            BindMode::CookieCutter => {
                let data = node.bound_data().unwrap_or_else(|| Rc::new(Value::Null));
                self.rebind_instance(data, node)
            }
        }
    }

    /// Bind again with the data of the last bind, or `null` if there was none.
    ///
    /// For a cookie-cutter binder this cuts a fresh instance from the data the
    /// template last saw; an in-place binder rebinds the template itself.
    pub fn bind_stored(&self) -> Node {
        let data = self.template.bound_data().unwrap_or_else(|| Rc::new(Value::Null));
        self.bind(data)
    }

    /// Data a node was last bound with. In-place binders ignore `node`.
    pub fn bound_data(&self, node: Option<&Node>) -> Option<Rc<Value>> {
        match self.mode {
            BindMode::InPlace => self.template.bound_data(),
            BindMode::CookieCutter => node.and_then(Node::bound_data),
        }
    }

    pub fn mode(&self) -> BindMode {
        self.mode
    }

    pub fn is_in_place(&self) -> bool {
        self.mode == BindMode::InPlace
    }

    /// The live working template.
    pub fn template(&self) -> &Node {
        &self.template
    }

    /// The pristine snapshot resets read from. Never bound or mutated.
    pub fn reset_root(&self) -> &Node {
        &self.reset_root
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn options(&self) -> BindOptions {
        self.options
    }

    fn cut(&self, data: Rc<Value>) -> Node {
        self.compiled.resets.reset();
        for operation in &self.compiled.operations {
            operation.bind(&data);
        }
        self.template.set_bound_data(data.clone());
        let node = self.template.deep_clone();
        node.set_bound_data(data.clone());
        for operation in &self.compiled.post_clone {
            operation.bind_into(&data, &node);
        }
        for event in &self.compiled.events {
            event.attach(&node, self.options.bind_warnings);
        }
        self.after_bind(&node);
        node
    }

    fn rebind_instance(&self, data: Rc<Value>, node: &Node) -> Node {
        self.compiled.resets.rebind_reset(node);
        for operation in self.compiled.operations.iter().filter(|op| op.rebind) {
            operation.bind_into(&data, node);
        }
        for operation in self.compiled.post_clone.iter().filter(|op| op.rebind) {
            operation.bind_into(&data, node);
        }
        node.set_bound_data(data);
        self.after_bind(node);
        node.clone()
    }

    fn bind_in_place(&self, data: Rc<Value>) -> Node {
        self.compiled.resets.reset();
        for operation in &self.compiled.operations {
            operation.bind(&data);
        }
        self.template.set_bound_data(data);
        self.after_bind(&self.template);
        self.template.clone()
    }

    fn after_bind(&self, node: &Node) {
        if let Some(handler) = &self.compiled.after_bind {
            fire_after_bind(handler, node, &self.scope);
        }
    }
}

impl std::fmt::Debug for Binder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binder")
            .field("mode", &self.mode)
            .field("template", &self.template)
            .field("options", &self.options)
            .field("compiled", &self.compiled)
            .finish()
    }
}
