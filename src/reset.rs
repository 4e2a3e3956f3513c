//! Reset manager.
//!
//! Bindings that mutate rather than overwrite (class tokens, style
//! properties, conditional attribute removal) must start every cycle from the
//! pristine attribute value, and so must attribute and dataset writes, which
//! leave the target alone for an undefined value. A reset restores one attribute on the nodes one
//! selector locates, reading the original from the reset root. Resets are
//! keyed by `(selector, attribute)`, so many leaves touching the same
//! attribute share a single reset.

use std::collections::HashMap;

use crate::dom::Node;
use crate::resolve::TargetSelector;

#[derive(Debug, Clone)]
pub struct ResetOperation {
    pub selector: TargetSelector,
    pub attribute: String,
    /// Live template nodes, restored before each bind.
    targets: Vec<Node>,
    /// Reset-root nodes holding the pristine values, paired by index.
    originals: Vec<Node>,
    /// Whether the reset also runs before a rebind.
    pub rebind: bool,
}

impl ResetOperation {
    /// Restore the live template.
    pub fn reset(&self) {
        for (index, node) in self.targets.iter().enumerate() {
            restore_attribute(node, self.original(index), &self.attribute);
        }
    }

    /// Restore an existing bound instance.
    pub fn rebind_reset(&self, bound: &Node) {
        for (index, node) in self.selector.resolve(bound).iter().enumerate() {
            restore_attribute(node, self.original(index), &self.attribute);
        }
    }

    fn original(&self, index: usize) -> Option<&Node> {
        self.originals.get(index).or_else(|| self.originals.first())
    }
}

/// Whole-value replacement: `class` and `style` get the full original text,
/// and an attribute absent from the original is removed.
fn restore_attribute(node: &Node, original: Option<&Node>, attribute: &str) {
    match original.and_then(|original| original.attribute(attribute)) {
        Some(value) => node.set_attribute(attribute, &value),
        None => node.remove_attribute(attribute),
    }
}

#[derive(Debug, Default)]
pub struct ResetManager {
    resets: Vec<ResetOperation>,
    keys: HashMap<(String, String), usize>,
}

impl ResetManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reset for `attribute` on the nodes `selector` locates.
    /// Idempotent per `(selector, attribute)`; the reset runs on rebind unless
    /// every leaf that registered it is rebind-exempt.
    pub fn register(
        &mut self,
        selector: &TargetSelector,
        attribute: &str,
        template: &Node,
        reset_root: &Node,
        exempt: bool,
    ) {
        let key = (selector.as_str().to_string(), attribute.to_string());
        if let Some(&index) = self.keys.get(&key) {
            if !exempt {
                self.resets[index].rebind = true;
            }
            return;
        }
        self.keys.insert(key, self.resets.len());
        self.resets.push(ResetOperation {
            selector: selector.clone(),
            attribute: attribute.to_string(),
            targets: selector.resolve(template),
            originals: selector.resolve(reset_root),
            rebind: !exempt,
        });
    }

    pub fn reset(&self) {
        for reset in &self.resets {
            reset.reset();
        }
    }

    pub fn rebind_reset(&self, bound: &Node) {
        for reset in self.resets.iter().filter(|reset| reset.rebind) {
            reset.rebind_reset(bound);
        }
    }

    pub fn operations(&self) -> &[ResetOperation] {
        &self.resets
    }

    pub fn len(&self) -> usize {
        self.resets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent_per_key() {
        let template = Node::parse(r#"<div class="a"><span></span></div>"#).unwrap();
        let reset_root = template.deep_clone();
        let selector = TargetSelector::parse("span").unwrap();
        let mut manager = ResetManager::new();
        manager.register(&selector, "class", &template, &reset_root, true);
        manager.register(&selector, "class", &template, &reset_root, false);
        manager.register(&selector, "style", &template, &reset_root, false);
        assert_eq!(manager.len(), 2);
        assert!(manager.operations()[0].rebind);
    }

    #[test]
    fn test_reset_restores_or_removes() {
        let template = Node::parse(r#"<div class="a"><span></span></div>"#).unwrap();
        let reset_root = template.deep_clone();
        let mut manager = ResetManager::new();
        manager.register(&TargetSelector::parse("").unwrap(), "class", &template, &reset_root, false);
        manager.register(&TargetSelector::parse("span").unwrap(), "style", &template, &reset_root, false);

        template.add_class("b");
        template.first_element_child().unwrap().set_style_property("color", Some("red"));
        manager.reset();
        assert_eq!(template.outer_html(), r#"<div class="a"><span></span></div>"#);
    }
}
