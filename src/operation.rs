//! Compiled binding and event operations.

use serde_json::Value;
use std::rc::Rc;

use crate::dom::{Event, Node};
use crate::expression::DataGetter;
use crate::resolve::TargetSelector;
use crate::scope::Scope;
use crate::value::BindValue;

/// Name of the after-bind pseudo event.
pub const BOUND_EVENT: &str = "bound";

/// Arguments passed to an event handler.
pub struct EventContext<'a> {
    pub event: &'a Event,
    /// The instance the binder produced (or the in-place template).
    pub bound_node: Node,
    /// The node the listener is attached to.
    pub target_node: Node,
    /// Data the bound node currently carries, read at dispatch time.
    pub data: Rc<Value>,
    pub scope: Scope,
}

pub type EventHandler = Rc<dyn Fn(&EventContext<'_>)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    AttributeSet(String),
    PropertySet(String),
    ClassAdd,
    ClassRemove,
    DatasetSet(String),
    StyleSet(String),
    AttributeRemove(String),
    TextContent,
    InnerContent,
    AppendChildren,
}

/// One compiled binding: a getter, the selector it writes through, and the
/// template nodes that selector located at construction.
#[derive(Debug, Clone)]
pub struct BindingOperation {
    pub kind: OperationKind,
    pub selector: TargetSelector,
    pub getter: DataGetter,
    /// Live template nodes written by [`BindingOperation::bind`]. Empty for
    /// post-clone operations, which resolve against each clone instead.
    pub targets: Vec<Node>,
    /// Reset-root counterparts of the targets, by index.
    pub originals: Vec<Node>,
    /// `false` when the effect does not survive node cloning.
    pub cloneable: bool,
    /// `false` for rebind-exempt leaves.
    pub rebind: bool,
}

impl BindingOperation {
    /// Write onto the live template nodes.
    pub fn bind(&self, data: &Value) {
        for (index, node) in self.targets.iter().enumerate() {
            self.write(node, index, data);
        }
    }

    /// Write onto the nodes the selector locates under `root`: a fresh clone
    /// (post-clone pass) or an existing bound instance (rebind).
    pub fn bind_into(&self, data: &Value, root: &Node) {
        for (index, node) in self.selector.resolve(root).iter().enumerate() {
            self.write(node, index, data);
        }
    }

    fn write(&self, node: &Node, index: usize, data: &Value) {
        let value = self.getter.get(data);
        match &self.kind {
            OperationKind::AttributeSet(name) => {
                if let Some(text) = settable_text(&value) {
                    node.set_attribute(name, &text);
                }
            }
            OperationKind::PropertySet(name) => {
                match value.into_json() {
                    Some(json) => node.set_property(name, json),
                    None => node.remove_property(name),
                }
            }
            OperationKind::ClassAdd => {
                for token in value.class_tokens() {
                    node.add_class(&token);
                }
            }
            OperationKind::ClassRemove => {
                for token in value.class_tokens() {
                    node.remove_class(&token);
                }
            }
            OperationKind::DatasetSet(key) => {
                if let Some(text) = settable_text(&value) {
                    node.set_dataset(key, &text);
                }
            }
            OperationKind::StyleSet(property) => {
                if value.is_undefined() {
                    return;
                }
                let text = value.to_template_string();
                if text.is_empty() {
                    node.set_style_property(property, None);
                } else {
                    node.set_style_property(property, Some(&text));
                }
            }
            OperationKind::AttributeRemove(name) => {
                if value.is_truthy() {
                    node.remove_attribute(name);
                } else if let Some(original) = self
                    .originals
                    .get(index)
                    .or_else(|| self.originals.first())
                    .and_then(|original| original.attribute(name))
                {
                    node.set_attribute(name, &original);
                }
            }
            OperationKind::TextContent => {
                if let Some(text) = settable_text(&value) {
                    node.set_text_content(&text);
                }
            }
            OperationKind::InnerContent => {
                if let Some(markup) = settable_text(&value) {
                    node.set_inner_html(&markup);
                }
            }
            OperationKind::AppendChildren => {
                node.clear_children();
                for child in value.into_nodes() {
                    node.append_child(&child);
                }
            }
        }
    }
}

/// Undefined leaves the target unchanged; null writes an empty string.
fn settable_text(value: &BindValue) -> Option<String> {
    if value.is_undefined() {
        None
    } else {
        Some(value.to_template_string())
    }
}

/// A listener to attach to every bound instance.
#[derive(Clone)]
pub struct EventBinding {
    pub event_name: String,
    pub selector: TargetSelector,
    pub handler: EventHandler,
    pub scope: Scope,
}

impl EventBinding {
    /// Attach the listener to the nodes the selector locates in `bound`.
    ///
    /// Listeners hold weak references and re-read the bound data from the
    /// bound node on every dispatch, so a later rebind is observed.
    pub fn attach(&self, bound: &Node, bind_warnings: bool) {
        let targets = self.selector.resolve(bound);
        if targets.is_empty() && bind_warnings {
            tracing::warn!(
                "Event binding selector '{}' - could not find any node(s)",
                self.selector.as_str()
            );
        }
        for target in targets {
            let bound_ref = bound.downgrade();
            let target_ref = target.downgrade();
            let handler = self.handler.clone();
            let scope = self.scope.clone();
            target.add_event_listener(
                &self.event_name,
                Rc::new(move |event: &Event| {
                    let (Some(bound_node), Some(target_node)) = (bound_ref.upgrade(), target_ref.upgrade()) else {
                        return;
                    };
                    let data = bound_node
                        .bound_data()
                        .unwrap_or_else(|| Rc::new(Value::Null));
                    handler(&EventContext {
                        event,
                        bound_node,
                        target_node,
                        data,
                        scope: scope.clone(),
                    });
                }),
            );
        }
    }
}

impl std::fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBinding")
            .field("event_name", &self.event_name)
            .field("selector", &self.selector.as_str())
            .finish()
    }
}

/// Fire the after-bind callback with a synthetic `bound` event.
pub fn fire_after_bind(handler: &EventHandler, bound: &Node, scope: &Scope) {
    let event = Event::new(BOUND_EVENT, bound);
    let data = bound.bound_data().unwrap_or_else(|| Rc::new(Value::Null));
    handler(&EventContext {
        event: &event,
        bound_node: bound.clone(),
        target_node: bound.clone(),
        data,
        scope: scope.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding_spec::Instruction;
    use crate::options::BindOptions;
    use serde_json::json;
    use std::cell::RefCell;

    fn operation(kind: OperationKind, selector: &str, instruction: &str, root: &Node) -> BindingOperation {
        let selector = TargetSelector::parse(selector).unwrap();
        let getter = DataGetter::compile(
            &Instruction::Text(instruction.to_string()),
            selector.as_str(),
            &Scope::new(),
            &BindOptions::default(),
        )
        .unwrap();
        BindingOperation {
            kind,
            targets: selector.resolve(root),
            originals: Vec::new(),
            selector,
            getter,
            cloneable: true,
            rebind: true,
        }
    }

    #[test]
    fn test_text_undefined_leaves_and_null_clears() {
        let root = Node::parse("<p><span>keep</span></p>").unwrap();
        let op = operation(OperationKind::TextContent, "span", "name", &root);
        op.bind(&json!({}));
        assert_eq!(root.inner_html(), "<span>keep</span>");
        op.bind(&json!({"name": null}));
        assert_eq!(root.inner_html(), "<span></span>");
        op.bind(&json!({"name": "x"}));
        assert_eq!(root.inner_html(), "<span>x</span>");
    }

    #[test]
    fn test_undefined_property_is_removed() {
        let root = Node::parse("<p><input></p>").unwrap();
        let op = operation(OperationKind::PropertySet("value".to_string()), "input", "v", &root);
        let input = root.query_selector("input").unwrap().unwrap();
        op.bind(&json!({"v": "typed"}));
        assert_eq!(input.property("value"), Some(json!("typed")));
        op.bind(&json!({}));
        assert!(input.property("value").is_none());
        op.bind(&json!({"v": null}));
        assert_eq!(input.property("value"), Some(Value::Null));
    }

    #[test]
    fn test_bind_into_applies_to_every_match() {
        let root = Node::parse("<ul><li></li><li></li></ul>").unwrap();
        let op = operation(OperationKind::AttributeSet("title".to_string()), "li", "t", &root);
        op.bind_into(&json!({"t": "hi"}), &root);
        assert_eq!(root.inner_html(), r#"<li title="hi"></li><li title="hi"></li>"#);
    }

    #[test]
    fn test_listener_reads_current_bound_data() {
        let root = Node::parse("<div><button>go</button></div>").unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let binding = EventBinding {
            event_name: "click".to_string(),
            selector: TargetSelector::parse("button").unwrap(),
            handler: Rc::new(move |ctx: &EventContext<'_>| sink.borrow_mut().push(ctx.data["id"].clone())),
            scope: Scope::new(),
        };
        binding.attach(&root, false);
        let button = root.first_element_child().unwrap();

        root.set_bound_data(Rc::new(json!({"id": 1})));
        button.dispatch_event("click");
        root.set_bound_data(Rc::new(json!({"id": 2})));
        button.dispatch_event("click");

        assert_eq!(*seen.borrow(), vec![json!(1), json!(2)]);
    }
}
