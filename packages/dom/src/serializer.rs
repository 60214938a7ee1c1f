//! HTML output for synthetic trees.
//!
//! [`annotate_sources`] writes the same text as [`to_html`] and stamps each
//! node (and each rule of an owned style sheet) with the byte range it
//! occupies, so later edits can be projected onto that text.

use crate::node::{Element, NodeKind, SyntheticNode};
use aerial_common::{SourceLocation, SourceRange};
use aerial_css::css_text;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, Copy)]
struct Span {
    outer: SourceRange,
    inner: Option<SourceRange>,
}

pub fn to_html(node: &SyntheticNode) -> String {
    let mut out = String::new();
    write_node(&mut out, node, false, &mut Vec::new());
    out
}

/// The opening tag of an element, attributes in order
pub fn open_tag(element: &Element) -> String {
    let mut out = String::new();
    write_open_tag(&mut out, element);
    out
}

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str())
}

/// Serialize and record provenance on every node of the subtree
pub fn annotate_sources(root: &mut SyntheticNode, uri: &str) -> String {
    let mut out = String::new();
    let mut spans = Vec::new();
    write_node(&mut out, root, false, &mut spans);

    let mut spans = spans.into_iter();
    stamp(root, uri, &mut spans);
    out
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

fn write_open_tag(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    for (name, value) in &element.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(value));
        out.push('"');
    }
    out.push('>');
}

// pre-order: a node's span is pushed before its children's
fn write_node(out: &mut String, node: &SyntheticNode, raw_text: bool, spans: &mut Vec<Span>) {
    let start = out.len();
    let slot = spans.len();
    spans.push(Span {
        outer: SourceRange::new(start, start),
        inner: None,
    });

    let inner = match &node.kind {
        NodeKind::Document { children } | NodeKind::DocumentFragment { children } => {
            for child in children {
                write_node(out, child, false, spans);
            }
            Some(SourceRange::new(start, out.len()))
        }
        NodeKind::Element(element) => {
            write_open_tag(out, element);
            let inner_start = out.len();
            if is_void_element(&element.name) && element.children.is_empty() {
                Some(SourceRange::new(inner_start, inner_start))
            } else {
                if let Some(sheet) = &element.sheet {
                    out.push_str(&css_text(sheet));
                }
                let raw = RAW_TEXT_ELEMENTS.contains(&element.name.to_ascii_lowercase().as_str());
                for child in &element.children {
                    write_node(out, child, raw, spans);
                }
                let inner_end = out.len();
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
                Some(SourceRange::new(inner_start, inner_end))
            }
        }
        NodeKind::Text { value } => {
            if raw_text {
                out.push_str(value);
            } else {
                out.push_str(&escape_text(value));
            }
            None
        }
        NodeKind::Comment { value } => {
            out.push_str("<!--");
            let inner_start = out.len();
            out.push_str(value);
            let inner_end = out.len();
            out.push_str("-->");
            Some(SourceRange::new(inner_start, inner_end))
        }
    };

    spans[slot] = Span {
        outer: SourceRange::new(start, out.len()),
        inner,
    };
}

fn stamp(node: &mut SyntheticNode, uri: &str, spans: &mut impl Iterator<Item = Span>) {
    let Some(span) = spans.next() else {
        return;
    };

    let mut location = SourceLocation::new(uri, span.outer.start, span.outer.end);
    location.inner = span.inner;
    node.source = Some(location);

    if let (NodeKind::Element(element), Some(inner)) = (&mut node.kind, span.inner) {
        if let Some(sheet) = &mut element.sheet {
            aerial_css::annotate_sources(sheet, uri, inner.start);
        }
    }
    if let Some(children) = node.children_mut() {
        for child in children {
            stamp(child, uri, spans);
        }
    }
}
