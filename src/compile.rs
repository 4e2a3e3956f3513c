//! Binding factory: compiles a [`BindingSpec`] into operations.
//!
//! Nested specs are flattened by joining parent and child keys with a space.
//! Each leaf key is normalized (`!`, `>`, grouping), classified by its `@token`
//! or `#suffix`, checked against the reset root, and turned into a
//! [`BindingOperation`], an [`EventBinding`] or the after-bind callback.
//! Leaves that mutate class, style or a removable attribute also register a
//! reset.

use crate::binding_spec::{method_shortcut, BindingSpec, Instruction};
use crate::dom::{dataset_attribute, Node};
use crate::error::{BinderError, Result};
use crate::expression::DataGetter;
use crate::operation::{BindingOperation, EventBinding, EventHandler, OperationKind, BOUND_EVENT};
use crate::options::{BindMode, BindOptions};
use crate::reset::ResetManager;
use crate::resolve::{classify, normalize, Target, TargetSelector};
use crate::scope::Scope;

/// Everything a binder runs per cycle.
#[derive(Default)]
pub struct CompiledBindings {
    /// Cloneable operations, applied to the live template.
    pub operations: Vec<BindingOperation>,
    /// Operations whose effect does not survive cloning; applied to each
    /// clone after it is made.
    pub post_clone: Vec<BindingOperation>,
    pub events: Vec<EventBinding>,
    pub after_bind: Option<EventHandler>,
    pub resets: ResetManager,
}

impl std::fmt::Debug for CompiledBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledBindings")
            .field("operations", &self.operations)
            .field("post_clone", &self.post_clone)
            .field("events", &self.events)
            .field("after_bind", &self.after_bind.is_some())
            .field("resets", &self.resets)
            .finish()
    }
}

pub struct BindingFactory<'a> {
    mode: BindMode,
    scope: &'a Scope,
    options: BindOptions,
    template: &'a Node,
    reset_root: &'a Node,
    compiled: CompiledBindings,
}

impl<'a> BindingFactory<'a> {
    pub fn new(
        mode: BindMode,
        scope: &'a Scope,
        options: BindOptions,
        template: &'a Node,
        reset_root: &'a Node,
    ) -> Self {
        Self {
            mode,
            scope,
            options,
            template,
            reset_root,
            compiled: CompiledBindings::default(),
        }
    }

    pub fn compile(mut self, spec: &BindingSpec) -> Result<CompiledBindings> {
        for (key, instruction) in spec.entries() {
            self.compile_entry(key, instruction, false)?;
        }
        Ok(self.compiled)
    }

    fn compile_entry(&mut self, key: &str, instruction: &Instruction, inherited_exempt: bool) -> Result<()> {
        let Instruction::Nested(children) = instruction else {
            return self.compile_leaf_key(key, instruction, inherited_exempt);
        };
        let (exempt, parent) = strip_exempt(key);
        let exempt = inherited_exempt || exempt;
        for (child_key, child) in children.entries() {
            let (child_exempt, child_key) = strip_exempt(child_key);
            let joined = format!("{} {}", parent, child_key);
            self.compile_entry(joined.trim(), child, exempt || child_exempt)?;
        }
        Ok(())
    }

    fn compile_leaf_key(&mut self, key: &str, instruction: &Instruction, inherited_exempt: bool) -> Result<()> {
        let normalized = normalize(key);
        let mut exempt = inherited_exempt || normalized.exempt;
        if exempt && self.mode == BindMode::InPlace {
            if self.options.compile_warnings {
                tracing::warn!(
                    "Binder constructor: Once only binding selector '!{}' ignored for in-place binders",
                    key.trim().trim_start_matches('!').trim()
                );
            }
            exempt = false;
        }
        for selector in &normalized.selectors {
            self.compile_leaf(selector, instruction, exempt)?;
        }
        Ok(())
    }

    fn compile_leaf(&mut self, selector: &str, instruction: &Instruction, exempt: bool) -> Result<()> {
        let classified = classify(selector)?;
        let element = TargetSelector::parse(&classified.selector)?;

        let kind = match classified.target {
            Target::Event(event_name) => return self.compile_event(selector, element, event_name, instruction),
            Target::Attribute(name) => OperationKind::AttributeSet(name),
            Target::Property(name) => OperationKind::PropertySet(name),
            Target::ClassAdd => OperationKind::ClassAdd,
            Target::ClassRemove => OperationKind::ClassRemove,
            Target::Dataset(key) => OperationKind::DatasetSet(key),
            Target::Style(property) => OperationKind::StyleSet(property),
            Target::AttributeRemove(name) => {
                if !instruction.is_function() && self.options.compile_warnings {
                    tracing::warn!(
                        "Binder constructor: Attribute remove '{}' - usually expects function as binding instruction",
                        selector
                    );
                }
                OperationKind::AttributeRemove(name)
            }
            Target::TextContent => OperationKind::TextContent,
            Target::InnerContent => OperationKind::InnerContent,
            Target::Append => {
                if !instruction.is_function() {
                    return Err(BinderError::AppendNotFunction {
                        selector: selector.to_string(),
                    });
                }
                OperationKind::AppendChildren
            }
        };

        let getter = DataGetter::compile(instruction, selector, self.scope, &self.options)?;
        let originals = element.resolve_required(self.reset_root)?;
        let targets = element.resolve_required(self.template)?;

        if let Some(attribute) = reset_attribute(&kind) {
            self.compiled
                .resets
                .register(&element, &attribute, self.template, self.reset_root, exempt);
        }

        let cloneable = !(matches!(kind, OperationKind::PropertySet(_)) && self.mode == BindMode::CookieCutter);
        let operation = BindingOperation {
            kind,
            selector: element,
            getter,
            targets: if cloneable { targets } else { Vec::new() },
            originals,
            cloneable,
            rebind: !exempt,
        };
        if cloneable {
            self.compiled.operations.push(operation);
        } else {
            self.compiled.post_clone.push(operation);
        }
        Ok(())
    }

    fn compile_event(
        &mut self,
        selector: &str,
        element: TargetSelector,
        event_name: String,
        instruction: &Instruction,
    ) -> Result<()> {
        let handler = self.event_handler(selector, instruction)?;
        if event_name == BOUND_EVENT {
            if self.compiled.after_bind.is_some() {
                return Err(BinderError::DuplicateBoundEvent {
                    selector: selector.to_string(),
                });
            }
            self.compiled.after_bind = Some(handler);
            return Ok(());
        }
        self.compiled.events.push(EventBinding {
            event_name,
            selector: element,
            handler,
            scope: self.scope.clone(),
        });
        Ok(())
    }

    fn event_handler(&self, selector: &str, instruction: &Instruction) -> Result<EventHandler> {
        match instruction {
            Instruction::Handler(handler) => Ok(handler.clone()),
            Instruction::Text(text) => match method_shortcut(text) {
                Some(name) => self.scope.handler(name).ok_or_else(|| BinderError::UnknownScopeMethod {
                    selector: selector.to_string(),
                    name: name.to_string(),
                }),
                None => Err(BinderError::EventNotFunction {
                    selector: selector.to_string(),
                }),
            },
            Instruction::Function(_) | Instruction::Nested(_) => Err(BinderError::EventNotFunction {
                selector: selector.to_string(),
            }),
        }
    }
}

fn strip_exempt(key: &str) -> (bool, &str) {
    let key = key.trim();
    match key.strip_prefix('!') {
        Some(rest) => (true, rest.trim()),
        None => (false, key),
    }
}

/// The attribute a leaf writes through, if an instance has to get it back from
/// the reset root before the leaf runs again.
fn reset_attribute(kind: &OperationKind) -> Option<String> {
    match kind {
        OperationKind::ClassAdd | OperationKind::ClassRemove => Some("class".to_string()),
        OperationKind::StyleSet(_) => Some("style".to_string()),
        OperationKind::AttributeSet(name) | OperationKind::AttributeRemove(name) => Some(name.clone()),
        OperationKind::DatasetSet(key) => Some(dataset_attribute(key)),
        _ => None,
    }
}
