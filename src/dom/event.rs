use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::node::Node;

/// Event listener registered on a node.
pub type Listener = Rc<dyn Fn(&Event)>;

/// A dispatched event. `target` is the node the event was dispatched at;
/// `current_target` is the node whose listeners are running.
pub struct Event {
    name: String,
    target: Node,
    current_target: RefCell<Option<Node>>,
    propagation_stopped: Cell<bool>,
    default_prevented: Cell<bool>,
}

impl Event {
    pub fn new(name: &str, target: &Node) -> Self {
        Self {
            name: name.to_string(),
            target: target.clone(),
            current_target: RefCell::new(None),
            propagation_stopped: Cell::new(false),
            default_prevented: Cell::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &Node {
        &self.target
    }

    pub fn current_target(&self) -> Option<Node> {
        self.current_target.borrow().clone()
    }

    pub(crate) fn set_current_target(&self, node: &Node) {
        *self.current_target.borrow_mut() = Some(node.clone());
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("target", &self.target.tag_name())
            .field("propagation_stopped", &self.propagation_stopped.get())
            .finish()
    }
}
