//! Selector resolver.
//!
//! Turns a binding selector key into one or more [`BindingTarget`]s:
//!
//! ```text
//! !sel            rebind-exempt leaf
//! >sel            direct child of the bound root (`:scope > sel`)
//! (a, b) suffix   one selector per group member, suffix appended to each
//! a, b            independent selectors
//! sel@attr        attribute set          sel@attr.remove   conditional removal
//! sel@class.add   class list add         sel@class.remove  class list remove
//! sel@style.x     style property         sel@dataset.x     data-* entry
//! sel@pty.x       in-memory property     sel@event.x       event binding
//! sel#append      replace children       sel#innerHTML     markup content
//! sel / sel#textContent                  text content
//! ```
//!
//! The element part of a target is a [`TargetSelector`]: it is checked once at
//! construction and can then be resolved against the template, the reset root
//! or any bound instance.

use crate::dom::{Node, SelectorList};
use crate::error::{BinderError, Result};

const APPEND_SUFFIX: &str = "#append";
const INNER_HTML_SUFFIX: &str = "#innerHTML";
const TEXT_CONTENT_SUFFIX: &str = "#textContent";

/// What a binding writes on each selected node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Attribute(String),
    Property(String),
    ClassAdd,
    ClassRemove,
    Dataset(String),
    Style(String),
    /// `bound` is the after-bind callback, anything else a node event.
    Event(String),
    AttributeRemove(String),
    TextContent,
    InnerContent,
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTarget {
    /// Element selector; empty for the bound root itself.
    pub selector: String,
    pub target: Target,
}

/// A binding key after `!`, `>` and grouping have been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedKey {
    pub exempt: bool,
    pub selectors: Vec<String>,
}

/// Split a spec key into its member selectors.
///
/// Every comma in the key separates members, unless the key opens with a
/// `( … )` group, in which case only the group's commas do and the text after
/// `)` is appended to each member. Commas nested in a selector function are not
/// recognised: `li:not(.a, .b)` splits into `li:not(.a` and `.b)`, so write it
/// as `li:not(.a):not(.b)`.
pub fn normalize(key: &str) -> NormalizedKey {
    let mut fragment = key.trim();
    let exempt = match fragment.strip_prefix('!') {
        Some(rest) => {
            fragment = rest.trim();
            true
        }
        None => false,
    };

    let members: Vec<String> = if !fragment.contains(',') {
        vec![fragment.to_string()]
    } else if let (true, Some(close)) = (fragment.starts_with('('), fragment.rfind(')')) {
        let suffix = fragment[close + 1..].trim();
        fragment[1..close]
            .split(',')
            .map(|member| {
                let member = member.trim();
                if suffix.is_empty() {
                    member.to_string()
                } else if suffix.starts_with('@') || suffix.starts_with('#') {
                    format!("{}{}", member, suffix)
                } else {
                    format!("{} {}", member, suffix)
                }
            })
            .collect()
    } else {
        fragment.split(',').map(|m| m.trim().to_string()).collect()
    };

    NormalizedKey {
        exempt,
        selectors: members.iter().map(|m| scope_child(m)).collect(),
    }
}

/// `> li` → `:scope > li`
fn scope_child(selector: &str) -> String {
    let selector = selector.trim();
    if selector.starts_with('>') {
        format!(":scope {}", selector)
    } else {
        selector.to_string()
    }
}

/// `ul >` → `ul`
fn strip_end_child(selector: &str) -> String {
    let selector = selector.trim();
    selector
        .strip_suffix('>')
        .unwrap_or(selector)
        .trim()
        .to_string()
}

/// Classify one normalized selector by its `@token` or `#suffix`.
pub fn classify(selector: &str) -> Result<BindingTarget> {
    if selector.contains('@') {
        let parts: Vec<&str> = selector.split('@').collect();
        if parts.len() != 2 {
            return Err(BinderError::MultipleAttributeTokens {
                selector: selector.to_string(),
            });
        }
        let element = strip_end_child(parts[0]);
        let token = parts[1].trim();
        let token_parts: Vec<&str> = token.split('.').map(str::trim).collect();
        let target = match token_parts.as_slice() {
            [name] if name.is_empty() => {
                return Err(BinderError::InvalidSelector {
                    selector: selector.to_string(),
                    reason: "empty attribute name".to_string(),
                })
            }
            [name] => Target::Attribute(name.to_string()),
            [name, sub] => classify_sub_instruction(selector, name, sub)?,
            _ => {
                return Err(BinderError::MultipleSubInstructions {
                    selector: selector.to_string(),
                })
            }
        };
        return Ok(BindingTarget {
            selector: element,
            target,
        });
    }

    let (element, target) = if let Some(rest) = selector.strip_suffix(APPEND_SUFFIX) {
        (rest, Target::Append)
    } else if let Some(rest) = selector.strip_suffix(INNER_HTML_SUFFIX) {
        (rest, Target::InnerContent)
    } else if let Some(rest) = selector.strip_suffix(TEXT_CONTENT_SUFFIX) {
        (rest, Target::TextContent)
    } else {
        (selector, Target::TextContent)
    };
    Ok(BindingTarget {
        selector: strip_end_child(element),
        target,
    })
}

fn classify_sub_instruction(selector: &str, name: &str, sub: &str) -> Result<Target> {
    Ok(match name {
        "property" | "pty" => Target::Property(sub.to_string()),
        "class" => match sub {
            "add" => Target::ClassAdd,
            "remove" => Target::ClassRemove,
            _ => {
                return Err(BinderError::InvalidClassInstruction {
                    selector: selector.to_string(),
                })
            }
        },
        "dataset" => Target::Dataset(sub.to_string()),
        "style" => Target::Style(sub.to_string()),
        "event" => Target::Event(sub.to_string()),
        _ if sub == "remove" => Target::AttributeRemove(name.to_string()),
        _ => {
            return Err(BinderError::InvalidAttributeInstruction {
                selector: selector.to_string(),
            })
        }
    })
}

/// A checked element selector. The empty selector denotes the root itself.
#[derive(Debug, Clone)]
pub struct TargetSelector {
    text: String,
    list: Option<SelectorList>,
}

impl TargetSelector {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self {
                text: String::new(),
                list: None,
            });
        }
        let list = SelectorList::parse(text).map_err(|e| BinderError::InvalidSelector {
            selector: text.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            text: text.to_string(),
            list: Some(list),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_root(&self) -> bool {
        self.list.is_none()
    }

    /// Matching elements under `root` in document order, or `[root]` for the
    /// empty selector. `:scope` refers to `root`.
    pub fn resolve(&self, root: &Node) -> Vec<Node> {
        match &self.list {
            Some(list) => list.select_all(root),
            None => vec![root.clone()],
        }
    }

    /// Like [`TargetSelector::resolve`], but at least one node must match.
    pub fn resolve_required(&self, root: &Node) -> Result<Vec<Node>> {
        let nodes = self.resolve(root);
        if nodes.is_empty() {
            return Err(BinderError::UnresolvedSelector {
                selector: self.text.clone(),
            });
        }
        Ok(nodes)
    }
}
