use selectors::OpaqueElement;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::event::{Event, Listener};
use super::parse::parse_fragment;
use super::selector::{SelectorError, SelectorList};
use super::serialize;
use super::style;

/// What a node is. Element tag names are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Fragment,
    Element(String),
    Text,
    Comment,
}

struct NodeInner {
    kind: NodeKind,
    /// Character data of text and comment nodes
    data: RefCell<String>,
    attributes: RefCell<Vec<(String, String)>>,
    children: RefCell<Vec<Node>>,
    parent: RefCell<Weak<NodeInner>>,
    properties: RefCell<HashMap<String, Value>>,
    bound_data: RefCell<Option<Rc<Value>>>,
    listeners: RefCell<Vec<(String, Listener)>>,
}

/// Shared handle to a node in a tree. Cloning the handle does not clone the node;
/// use [`Node::deep_clone`] for that.
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

/// Non-owning handle, used by event listeners so that a listener attached inside
/// a bound instance never keeps that instance alive.
#[derive(Clone)]
pub struct WeakNode(Weak<NodeInner>);

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }
}

impl Node {
    fn with_kind(kind: NodeKind, data: &str) -> Self {
        Node(Rc::new(NodeInner {
            kind,
            data: RefCell::new(data.to_string()),
            attributes: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
            properties: RefCell::new(HashMap::new()),
            bound_data: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
        }))
    }

    pub fn element(tag: &str) -> Self {
        Self::with_kind(NodeKind::Element(tag.to_ascii_lowercase()), "")
    }

    pub fn text(content: &str) -> Self {
        Self::with_kind(NodeKind::Text, content)
    }

    pub fn comment(content: &str) -> Self {
        Self::with_kind(NodeKind::Comment, content)
    }

    pub fn fragment() -> Self {
        Self::with_kind(NodeKind::Fragment, "")
    }

    /// Parse markup and return the first element it contains.
    pub fn parse(markup: &str) -> Option<Node> {
        parse_fragment(markup).into_iter().find(Node::is_element)
    }

    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    pub fn tag_name(&self) -> Option<&str> {
        match &self.0.kind {
            NodeKind::Element(tag) => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.0.kind, NodeKind::Element(_))
    }

    /// Identity handle for selector matching; equal for handles to the same node.
    pub(super) fn opaque_element(&self) -> OpaqueElement {
        OpaqueElement::new(&*self.0)
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TREE STRUCTURE
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    pub fn element_children(&self) -> Vec<Node> {
        self.0
            .children
            .borrow()
            .iter()
            .filter(|child| child.is_element())
            .cloned()
            .collect()
    }

    pub fn first_element_child(&self) -> Option<Node> {
        self.0
            .children
            .borrow()
            .iter()
            .find(|child| child.is_element())
            .cloned()
    }

    pub fn previous_element_sibling(&self) -> Option<Node> {
        self.previous_element_siblings().into_iter().next()
    }

    /// Element siblings before this node, nearest first.
    pub fn previous_element_siblings(&self) -> Vec<Node> {
        let Some(parent) = self.parent() else {
            return Vec::new();
        };
        let siblings = parent.element_children();
        match siblings.iter().position(|s| s.ptr_eq(self)) {
            Some(index) => siblings[..index].iter().rev().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn next_element_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let siblings = parent.element_children();
        let index = siblings.iter().position(|s| s.ptr_eq(self))?;
        siblings.get(index + 1).cloned()
    }

    /// All descendants in document order, excluding the node itself.
    pub fn descendants(&self) -> Vec<Node> {
        let mut out = Vec::new();
        fn walk(node: &Node, out: &mut Vec<Node>) {
            for child in node.0.children.borrow().iter() {
                out.push(child.clone());
                walk(child, out);
            }
        }
        walk(self, &mut out);
        out
    }

    fn is_inclusive_descendant_of(&self, other: &Node) -> bool {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node.ptr_eq(other) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Append `child`, moving it out of any previous parent. Appending a fragment
    /// moves the fragment's children instead. Appending an ancestor is ignored.
    pub fn append_child(&self, child: &Node) {
        if self.is_inclusive_descendant_of(child) {
            return;
        }
        if *child.kind() == NodeKind::Fragment {
            for grandchild in child.children() {
                self.append_child(&grandchild);
            }
            return;
        }
        child.detach();
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
    }

    /// Remove this node from its parent (if any).
    pub fn detach(&self) {
        let parent = self.0.parent.borrow().upgrade();
        if let Some(parent) = parent {
            parent
                .children
                .borrow_mut()
                .retain(|sibling| !Rc::ptr_eq(&sibling.0, &self.0));
        }
        *self.0.parent.borrow_mut() = Weak::new();
    }

    pub fn clear_children(&self) {
        let children = std::mem::take(&mut *self.0.children.borrow_mut());
        for child in children {
            *child.0.parent.borrow_mut() = Weak::new();
        }
    }

    /// Structural copy: kind, character data, attributes and descendants.
    pub fn deep_clone(&self) -> Node {
        let copy = Node::with_kind(self.0.kind.clone(), &self.0.data.borrow());
        *copy.0.attributes.borrow_mut() = self.0.attributes.borrow().clone();
        for child in self.children() {
            copy.append_child(&child.deep_clone());
        }
        copy
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ATTRIBUTES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn attributes(&self) -> Vec<(String, String)> {
        self.0.attributes.borrow().clone()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0
            .attributes
            .borrow()
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.0
            .attributes
            .borrow()
            .iter()
            .any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        if !self.is_element() {
            return;
        }
        let mut attributes = self.0.attributes.borrow_mut();
        match attributes
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name.to_ascii_lowercase(), value.to_string())),
        }
    }

    pub fn remove_attribute(&self, name: &str) {
        self.0
            .attributes
            .borrow_mut()
            .retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CLASS LIST / STYLE / DATASET
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn class_list(&self) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        if let Some(value) = self.attribute("class") {
            for token in value.split_ascii_whitespace() {
                if !tokens.iter().any(|t| t == token) {
                    tokens.push(token.to_string());
                }
            }
        }
        tokens
    }

    pub fn has_class(&self, token: &str) -> bool {
        self.class_list().iter().any(|t| t == token)
    }

    pub fn add_class(&self, token: &str) {
        if token.is_empty() {
            return;
        }
        let mut tokens = self.class_list();
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
        self.set_attribute("class", &tokens.join(" "));
    }

    pub fn remove_class(&self, token: &str) {
        if !self.has_attribute("class") {
            return;
        }
        let tokens: Vec<String> = self
            .class_list()
            .into_iter()
            .filter(|t| t != token)
            .collect();
        self.set_attribute("class", &tokens.join(" "));
    }

    /// Inline style text (the `style` attribute), empty when absent.
    pub fn style_text(&self) -> String {
        self.attribute("style").unwrap_or_default()
    }

    /// Read one inline style property; accepts `camelCase` or `kebab-case` names.
    pub fn style_property(&self, name: &str) -> Option<String> {
        let property = style::css_property_name(name);
        style::parse_declarations(&self.style_text())
            .into_iter()
            .find(|(n, _)| *n == property)
            .map(|(_, v)| v)
    }

    /// Set one inline style property; `None` or an empty value removes it.
    pub fn set_style_property(&self, name: &str, value: Option<&str>) {
        let property = style::css_property_name(name);
        let mut declarations = style::parse_declarations(&self.style_text());
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        match value {
            Some(value) => match declarations.iter_mut().find(|(n, _)| *n == property) {
                Some((_, existing)) => *existing = value.to_string(),
                None => declarations.push((property, value.to_string())),
            },
            None => declarations.retain(|(n, _)| *n != property),
        }
        if declarations.is_empty() && !self.has_attribute("style") {
            return;
        }
        self.set_attribute("style", &style::serialize_declarations(&declarations));
    }

    pub fn dataset(&self, key: &str) -> Option<String> {
        self.attribute(&style::dataset_attribute(key))
    }

    pub fn set_dataset(&self, key: &str, value: &str) {
        self.set_attribute(&style::dataset_attribute(key), value);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONTENT
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn character_data(&self) -> String {
        self.0.data.borrow().clone()
    }

    pub fn text_content(&self) -> String {
        match self.0.kind {
            NodeKind::Text | NodeKind::Comment => self.character_data(),
            NodeKind::Element(_) | NodeKind::Fragment => self
                .descendants()
                .iter()
                .filter(|n| *n.kind() == NodeKind::Text)
                .map(Node::character_data)
                .collect(),
        }
    }

    /// Replace all children with a single text node (none for empty text).
    pub fn set_text_content(&self, text: &str) {
        match self.0.kind {
            NodeKind::Text | NodeKind::Comment => *self.0.data.borrow_mut() = text.to_string(),
            NodeKind::Element(_) | NodeKind::Fragment => {
                self.clear_children();
                if !text.is_empty() {
                    self.append_child(&Node::text(text));
                }
            }
        }
    }

    pub fn inner_html(&self) -> String {
        serialize::inner_html(self)
    }

    pub fn outer_html(&self) -> String {
        serialize::outer_html(self)
    }

    pub fn set_inner_html(&self, markup: &str) {
        self.clear_children();
        for node in parse_fragment(markup) {
            self.append_child(&node);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // IN-MEMORY STATE (never cloned)
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn property(&self, name: &str) -> Option<Value> {
        self.0.properties.borrow().get(name).cloned()
    }

    pub fn set_property(&self, name: &str, value: Value) {
        self.0.properties.borrow_mut().insert(name.to_string(), value);
    }

    pub fn remove_property(&self, name: &str) {
        self.0.properties.borrow_mut().remove(name);
    }

    pub fn bound_data(&self) -> Option<Rc<Value>> {
        self.0.bound_data.borrow().clone()
    }

    pub fn set_bound_data(&self, data: Rc<Value>) {
        *self.0.bound_data.borrow_mut() = Some(data);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SELECTORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Descendant elements matching `selectors`, in document order. `:scope`
    /// refers to this node.
    pub fn query_selector_all(&self, selectors: &str) -> Result<Vec<Node>, SelectorError> {
        let list = SelectorList::parse(selectors)?;
        Ok(list.select_all(self))
    }

    pub fn query_selector(&self, selectors: &str) -> Result<Option<Node>, SelectorError> {
        Ok(self.query_selector_all(selectors)?.into_iter().next())
    }

    pub fn matches(&self, selectors: &str) -> Result<bool, SelectorError> {
        let list = SelectorList::parse(selectors)?;
        Ok(list.matches(self, self))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EVENTS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn add_event_listener(&self, event_name: &str, listener: Listener) {
        self.0
            .listeners
            .borrow_mut()
            .push((event_name.to_string(), listener));
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        self.0
            .listeners
            .borrow()
            .iter()
            .filter(|(name, _)| name == event_name)
            .count()
    }

    /// Dispatch a bubbling event at this node: listeners on the node run first,
    /// then those on each ancestor until propagation is stopped.
    pub fn dispatch_event(&self, event_name: &str) -> Event {
        let event = Event::new(event_name, self);
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if event.propagation_stopped() {
                break;
            }
            // Listeners may attach further listeners; iterate over a snapshot.
            let listeners: Vec<Listener> = node
                .0
                .listeners
                .borrow()
                .iter()
                .filter(|(name, _)| name == event_name)
                .map(|(_, listener)| listener.clone())
                .collect();
            event.set_current_target(&node);
            for listener in listeners {
                listener(&event);
            }
            current = node.parent();
        }
        event
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Node").field(&self.outer_html()).finish()
    }
}
