use crate::node::{Element, NodeKind, SyntheticNode};
use aerial_css::StyleSheet;

/// Visitor pattern for traversing synthetic trees immutably
///
/// This trait provides default implementations that walk the entire tree.
/// Override specific visit_* methods to perform custom actions on nodes.
pub trait Visitor: Sized {
    fn visit_node(&mut self, node: &SyntheticNode) {
        walk_node(self, node);
    }

    fn visit_element(&mut self, node: &SyntheticNode, element: &Element) {
        walk_element(self, node, element);
    }

    fn visit_text(&mut self, _node: &SyntheticNode, _value: &str) {
        // Leaf node, no children to walk
    }

    fn visit_comment(&mut self, _node: &SyntheticNode, _value: &str) {
        // Leaf node, no children to walk
    }

    fn visit_style_sheet(&mut self, _owner: &SyntheticNode, _sheet: &StyleSheet) {
        // Rules are not nodes
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, node: &SyntheticNode) {
    match &node.kind {
        NodeKind::Document { children } | NodeKind::DocumentFragment { children } => {
            for child in children {
                visitor.visit_node(child);
            }
        }
        NodeKind::Element(element) => visitor.visit_element(node, element),
        NodeKind::Text { value } => visitor.visit_text(node, value),
        NodeKind::Comment { value } => visitor.visit_comment(node, value),
    }
}

pub fn walk_element<V: Visitor>(visitor: &mut V, node: &SyntheticNode, element: &Element) {
    if let Some(sheet) = &element.sheet {
        visitor.visit_style_sheet(node, sheet);
    }
    for child in &element.children {
        visitor.visit_node(child);
    }
}
