//! CSS selector matching over [`Node`] trees
//!
//! Parsing and matching run on the `selectors` engine with scraper's selector
//! grammar; this module only adapts [`Node`] to [`selectors::Element`]. Tree
//! structural pseudo-classes (`:scope`, `:first-child`, `:nth-child()`, `:not()`)
//! are supported; state pseudo-classes such as `:hover` fail to parse.

use cssparser::ParserInput;
use scraper::error::SelectorErrorKind;
use scraper::selector::{CssLocalName, CssString, NonTSPseudoClass, Parser, PseudoElement, Simple};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::bloom::BloomFilter;
use selectors::matching::{
    self, ElementSelectorFlags, MatchingContext, MatchingForInvalidation, MatchingMode, NeedsSelectorFlags,
    QuirksMode, SelectorCaches,
};
use selectors::parser::ParseRelative;
use selectors::{Element, OpaqueElement, SelectorImpl};
use thiserror::Error;

use super::node::{Node, NodeKind};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

type NamespaceUrl = <Simple as SelectorImpl>::NamespaceUrl;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("{0}")]
    Syntax(String),
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(selectors::SelectorList<Simple>);

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        if input.trim().is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut parser_input = ParserInput::new(input);
        let mut parser = cssparser::Parser::new(&mut parser_input);
        selectors::SelectorList::parse(&Parser, &mut parser, ParseRelative::No)
            .map(SelectorList)
            .map_err(|err| SelectorError::Syntax(SelectorErrorKind::from(err).to_string()))
    }

    /// Does `node` match any selector in the list? `scope` is the `:scope` node.
    pub fn matches(&self, node: &Node, scope: &Node) -> bool {
        let mut caches = SelectorCaches::default();
        let mut context = scoped_context(&mut caches, scope);
        self.matches_in(node, &mut context)
    }

    /// Descendant elements of `root` matching the list, in document order.
    pub fn select_all(&self, root: &Node) -> Vec<Node> {
        let mut caches = SelectorCaches::default();
        let mut context = scoped_context(&mut caches, root);
        root.descendants()
            .into_iter()
            .filter(|node| self.matches_in(node, &mut context))
            .collect()
    }

    fn matches_in(&self, node: &Node, context: &mut MatchingContext<'_, Simple>) -> bool {
        node.is_element()
            && self
                .0
                .slice()
                .iter()
                .any(|selector| matching::matches_selector(selector, 0, None, node, context))
    }
}

fn scoped_context<'a>(caches: &'a mut SelectorCaches, scope: &Node) -> MatchingContext<'a, Simple> {
    let mut context = MatchingContext::new(
        MatchingMode::Normal,
        None,
        caches,
        QuirksMode::NoQuirks,
        NeedsSelectorFlags::No,
        MatchingForInvalidation::No,
    );
    context.scope_element = Some(scope.opaque_element());
    context
}

/// Never matches state pseudo-classes or pseudo-elements; the grammar rejects
/// them before matching.
impl Element for Node {
    type Impl = Simple;

    fn opaque(&self) -> OpaqueElement {
        self.opaque_element()
    }

    fn parent_element(&self) -> Option<Self> {
        self.parent().filter(Node::is_element)
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.previous_element_sibling()
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.next_element_sibling()
    }

    fn first_element_child(&self) -> Option<Self> {
        Node::first_element_child(self)
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, name: &CssLocalName) -> bool {
        self.tag_name() == Some(&*name.0)
    }

    fn has_namespace(&self, namespace: &<Simple as SelectorImpl>::BorrowedNamespaceUrl) -> bool {
        &**namespace == HTML_NAMESPACE
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.tag_name() == other.tag_name()
    }

    fn attr_matches(
        &self,
        namespace: &NamespaceConstraint<&NamespaceUrl>,
        local_name: &CssLocalName,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        // attributes are never namespaced
        let in_namespace = match namespace {
            NamespaceConstraint::Any => true,
            NamespaceConstraint::Specific(url) => url.is_empty(),
        };
        in_namespace
            && self
                .attributes()
                .iter()
                .any(|(name, value)| name.as_str() == &*local_name.0 && operation.eval_str(value))
    }

    fn match_non_ts_pseudo_class(&self, _pc: &NonTSPseudoClass, _context: &mut MatchingContext<Simple>) -> bool {
        false
    }

    fn match_pseudo_element(&self, _pe: &PseudoElement, _context: &mut MatchingContext<Simple>) -> bool {
        false
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        matches!(self.tag_name(), Some("a" | "area" | "link")) && self.has_attribute("href")
    }

    fn is_html_slot_element(&self) -> bool {
        self.tag_name() == Some("slot")
    }

    fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.attribute("id")
            .is_some_and(|own| case_sensitivity.eq(own.as_bytes(), id.0.as_bytes()))
    }

    fn has_class(&self, name: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.class_list()
            .iter()
            .any(|token| case_sensitivity.eq(token.as_bytes(), name.0.as_bytes()))
    }

    fn has_custom_state(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn imported_part(&self, _name: &CssLocalName) -> Option<CssLocalName> {
        None
    }

    fn is_part(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.children().iter().all(|child| match child.kind() {
            NodeKind::Element(_) => false,
            NodeKind::Text => child.text_content().is_empty(),
            NodeKind::Comment | NodeKind::Fragment => true,
        })
    }

    /// A template's top-level elements sit under a fragment, not an element.
    fn is_root(&self) -> bool {
        self.parent().map_or(true, |parent| !parent.is_element())
    }

    fn add_element_unique_hashes(&self, _filter: &mut BloomFilter) -> bool {
        false
    }
}
