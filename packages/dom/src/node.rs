//! # Synthetic Nodes
//!
//! Serializable parallel representation of a DOM tree. Parents own their
//! children exclusively; `parent` is a back-reference by identity, maintained
//! by the builders, [`SyntheticNode::link`] and the patch applier.

use crate::visitor::{walk_node, Visitor};
use aerial_common::{IdGenerator, SourceLocation, Transient, Uid};
use aerial_css::StyleSheet;
use aerial_diff::OrderedMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Document,
    DocumentFragment,
    Element,
    Text,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticNode {
    pub id: Uid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Uid>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    Document { children: Vec<SyntheticNode> },
    DocumentFragment { children: Vec<SyntheticNode> },
    Element(Element),
    Text { value: String },
    Comment { value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub attributes: OrderedMap<String, String>,
    #[serde(default)]
    pub children: Vec<SyntheticNode>,
    /// Sheet owned by a `<style>` element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<StyleSheet>,
    /// Filled by an external layout pass; never diffed or serialized
    #[serde(skip)]
    pub layout: Transient<Layout>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub bounding_rect: Rect,
    pub computed_style: IndexMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SyntheticNode {
    fn with_kind(ids: &mut dyn IdGenerator, kind: NodeKind) -> Self {
        Self {
            id: ids.next_id(),
            source: None,
            parent: None,
            kind,
        }
    }

    pub fn document(ids: &mut dyn IdGenerator) -> Self {
        Self::with_kind(ids, NodeKind::Document { children: Vec::new() })
    }

    pub fn fragment(ids: &mut dyn IdGenerator) -> Self {
        Self::with_kind(ids, NodeKind::DocumentFragment { children: Vec::new() })
    }

    pub fn element(ids: &mut dyn IdGenerator, name: impl Into<String>) -> Self {
        Self::with_kind(
            ids,
            NodeKind::Element(Element {
                name: name.into(),
                namespace: None,
                attributes: OrderedMap::new(),
                children: Vec::new(),
                sheet: None,
                layout: Transient::default(),
            }),
        )
    }

    pub fn text(ids: &mut dyn IdGenerator, value: impl Into<String>) -> Self {
        Self::with_kind(ids, NodeKind::Text { value: value.into() })
    }

    pub fn comment(ids: &mut dyn IdGenerator, value: impl Into<String>) -> Self {
        Self::with_kind(ids, NodeKind::Comment { value: value.into() })
    }

    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        if let NodeKind::Element(element) = &mut self.kind {
            element.namespace = Some(namespace.into());
        }
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let NodeKind::Element(element) = &mut self.kind {
            element.attributes.insert(name.into(), value.into());
        }
        self
    }

    pub fn with_child(mut self, mut child: SyntheticNode) -> Self {
        child.parent = Some(self.id.clone());
        if let Some(children) = self.children_mut() {
            children.push(child);
        }
        self
    }

    pub fn with_children(self, children: impl IntoIterator<Item = SyntheticNode>) -> Self {
        children.into_iter().fold(self, |node, child| node.with_child(child))
    }

    /// Attach a style sheet (elements only); the element becomes its owner
    pub fn with_style_sheet(mut self, sheet: StyleSheet) -> Self {
        let owner = self.id.clone();
        if let NodeKind::Element(element) = &mut self.kind {
            element.sheet = Some(sheet.with_owner(owner));
        }
        self
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Document { .. } => NodeType::Document,
            NodeKind::DocumentFragment { .. } => NodeType::DocumentFragment,
            NodeKind::Element(_) => NodeType::Element,
            NodeKind::Text { .. } => NodeType::Text,
            NodeKind::Comment { .. } => NodeType::Comment,
        }
    }

    pub fn node_name(&self) -> &str {
        match &self.kind {
            NodeKind::Document { .. } => "#document",
            NodeKind::DocumentFragment { .. } => "#document-fragment",
            NodeKind::Element(element) => &element.name,
            NodeKind::Text { .. } => "#text",
            NodeKind::Comment { .. } => "#comment",
        }
    }

    pub fn children(&self) -> Option<&Vec<SyntheticNode>> {
        match &self.kind {
            NodeKind::Document { children } | NodeKind::DocumentFragment { children } => {
                Some(children)
            }
            NodeKind::Element(element) => Some(&element.children),
            NodeKind::Text { .. } | NodeKind::Comment { .. } => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<SyntheticNode>> {
        match &mut self.kind {
            NodeKind::Document { children } | NodeKind::DocumentFragment { children } => {
                Some(children)
            }
            NodeKind::Element(element) => Some(&mut element.children),
            NodeKind::Text { .. } | NodeKind::Comment { .. } => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match &mut self.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// `nodeValue` of text and comment nodes
    pub fn value(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text { value } | NodeKind::Comment { value } => Some(value),
            _ => None,
        }
    }

    pub fn value_mut(&mut self) -> Option<&mut String> {
        match &mut self.kind {
            NodeKind::Text { value } | NodeKind::Comment { value } => Some(value),
            _ => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.as_element()
            .and_then(|element| element.attributes.get(name))
            .map(String::as_str)
    }

    pub fn find(&self, id: &Uid) -> Option<&SyntheticNode> {
        if self.id == *id {
            return Some(self);
        }
        self.children()?.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: &Uid) -> Option<&mut SyntheticNode> {
        if self.id == *id {
            return Some(self);
        }
        self.children_mut()?
            .iter_mut()
            .find_map(|child| child.find_mut(id))
    }

    /// Re-establish `parent` links and style sheet owners below this node
    pub fn link(&mut self) {
        let id = self.id.clone();
        if let NodeKind::Element(element) = &mut self.kind {
            if let Some(sheet) = &mut element.sheet {
                sheet.owner_node = Some(id.clone());
                sheet.link();
            }
        }
        if let Some(children) = self.children_mut() {
            for child in children {
                child.parent = Some(id.clone());
                child.link();
            }
        }
    }

    /// Assign fresh identities. `deep` covers every descendant and owned
    /// style sheet.
    pub fn regenerate_ids(&mut self, ids: &mut dyn IdGenerator, deep: bool) {
        self.id = ids.next_id();
        if deep {
            if let NodeKind::Element(element) = &mut self.kind {
                if let Some(sheet) = &mut element.sheet {
                    sheet.regenerate_ids(ids, true);
                }
            }
            if let Some(children) = self.children_mut() {
                for child in children {
                    child.regenerate_ids(ids, true);
                }
            }
        }
        self.link();
    }

    /// Every identity in the subtree: nodes, owned sheets and their rules
    pub fn uids(&self) -> Vec<Uid> {
        let mut collector = UidCollector::default();
        collector.visit_node(self);
        collector.uids
    }

    /// Concatenated text of every text node below this one
    pub fn text_content(&self) -> String {
        let mut collector = TextCollector::default();
        collector.visit_node(self);
        collector.text
    }

    /// Equal ignoring identities, provenance, back-references and layout
    pub fn same_structure(&self, other: &SyntheticNode) -> bool {
        match (&self.kind, &other.kind) {
            (NodeKind::Document { children: a }, NodeKind::Document { children: b })
            | (
                NodeKind::DocumentFragment { children: a },
                NodeKind::DocumentFragment { children: b },
            ) => same_children(a, b),
            (NodeKind::Element(a), NodeKind::Element(b)) => {
                let sheets_match = match (&a.sheet, &b.sheet) {
                    (Some(x), Some(y)) => x.same_structure(y),
                    (None, None) => true,
                    _ => false,
                };
                a.name == b.name
                    && a.namespace == b.namespace
                    && a.attributes == b.attributes
                    && sheets_match
                    && same_children(&a.children, &b.children)
            }
            (NodeKind::Text { value: a }, NodeKind::Text { value: b })
            | (NodeKind::Comment { value: a }, NodeKind::Comment { value: b }) => a == b,
            _ => false,
        }
    }
}

fn same_children(a: &[SyntheticNode], b: &[SyntheticNode]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_structure(y))
}

#[derive(Default)]
struct UidCollector {
    uids: Vec<Uid>,
}

impl Visitor for UidCollector {
    fn visit_node(&mut self, node: &SyntheticNode) {
        self.uids.push(node.id.clone());
        walk_node(self, node);
    }

    fn visit_style_sheet(&mut self, _owner: &SyntheticNode, sheet: &StyleSheet) {
        self.uids.push(sheet.uid.clone());
        self.uids.extend(sheet.flatten().into_keys().cloned());
    }
}

#[derive(Default)]
struct TextCollector {
    text: String,
}

impl Visitor for TextCollector {
    fn visit_text(&mut self, _node: &SyntheticNode, value: &str) {
        self.text.push_str(value);
    }
}
