use super::node::{Node, NodeKind};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text children are serialized verbatim
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

pub(crate) fn outer_html(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out, false);
    out
}

pub(crate) fn inner_html(node: &Node) -> String {
    let raw = node
        .tag_name()
        .map(|tag| RAW_TEXT_ELEMENTS.contains(&tag))
        .unwrap_or(false);
    let mut out = String::new();
    for child in node.children() {
        write_node(&child, &mut out, raw);
    }
    out
}

fn write_node(node: &Node, out: &mut String, raw_text: bool) {
    match node.kind() {
        NodeKind::Fragment => {
            for child in node.children() {
                write_node(&child, out, false);
            }
        }
        NodeKind::Element(tag) => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in node.attributes() {
                out.push(' ');
                out.push_str(&name);
                out.push_str("=\"");
                out.push_str(&escape_attribute(&value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            out.push_str(&inner_html(node));
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        NodeKind::Text => {
            let text = node.character_data();
            if raw_text {
                out.push_str(&text);
            } else {
                out.push_str(&escape_text(&text));
            }
        }
        NodeKind::Comment => {
            out.push_str("<!--");
            out.push_str(&node.character_data());
            out.push_str("-->");
        }
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}
