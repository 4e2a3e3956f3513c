//! Markup parsing
//!
//! HTML5-compliant fragment parsing via html5ever into an `RcDom`, then
//! conversion of the `RcDom` handles into [`Node`] trees.

use html5ever::tendril::TendrilSink;
use html5ever::{parse_fragment as parse_html_fragment, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tendril::StrTendril;

use super::node::Node;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Parse a markup fragment into detached top-level nodes.
///
/// Parsing happens in a `<template>` context so that fragments such as
/// `<tr>…</tr>` or `<li>…</li>` are kept as written instead of being
/// re-parented by the body insertion rules.
pub fn parse_fragment(markup: &str) -> Vec<Node> {
    let context = QualName::new(
        None,
        Namespace::from(HTML_NAMESPACE),
        LocalName::from("template"),
    );
    let dom = parse_html_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
        .one(StrTendril::from_slice(markup));

    let mut nodes = Vec::new();
    for child in dom.document.children.borrow().iter() {
        // Fragment parsing wraps the result in a synthetic <html> root
        if let NodeData::Element { name, .. } = &child.data {
            if &*name.local == "html" {
                for grandchild in child.children.borrow().iter() {
                    nodes.extend(convert_handle(grandchild));
                }
                continue;
            }
        }
        nodes.extend(convert_handle(child));
    }
    nodes
}

/// Convert an RcDom handle to a Node. Doctypes and processing instructions
/// have no counterpart and are dropped.
fn convert_handle(handle: &Handle) -> Option<Node> {
    match &handle.data {
        NodeData::Document => {
            let fragment = Node::fragment();
            append_converted_children(&fragment, handle);
            Some(fragment)
        }
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let element = Node::element(&name.local);
            for attr in attrs.borrow().iter() {
                element.set_attribute(&attr.name.local, &attr.value);
            }
            append_converted_children(&element, handle);
            // <template> content lives in a separate document fragment
            if let Some(contents) = template_contents.borrow().as_ref() {
                append_converted_children(&element, contents);
            }
            Some(element)
        }
        NodeData::Text { contents } => Some(Node::text(&contents.borrow())),
        NodeData::Comment { contents } => Some(Node::comment(contents)),
        NodeData::Doctype { .. } => None,
        NodeData::ProcessingInstruction { .. } => None,
    }
}

fn append_converted_children(parent: &Node, handle: &Handle) {
    for child in handle.children.borrow().iter() {
        if let Some(node) = convert_handle(child) {
            parent.append_child(&node);
        }
    }
}
