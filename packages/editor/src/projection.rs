//! # Source Projection
//!
//! Routes a mutation batch back to the text it came from. The old tree must
//! carry provenance (see `aerial_dom::annotate_sources`); every mutation is
//! turned into byte-range replacements against the old text:
//!
//! - attribute changes rewrite the start tag of the element
//! - text changes rewrite the text (or the comment body)
//! - child list changes delete removed or moved children and write the
//!   inserted or moved ones before the next child that stayed in place
//! - declaration changes rewrite the body of the rule, rule list changes
//!   rewrite the body of the sheet or grouping rule
//!
//! Replacement text is rendered from the patched tree, so several mutations
//! on the same node collapse into one edit. Edits that land inside a range
//! another edit rewrites are dropped silently.

use crate::errors::{EditorError, EditorResult};
use aerial_common::{SequentialIds, SourceLocation, SourceRange, Uid};
use aerial_css::{css_text, rule_body, CssMutation, StyleSheet};
use aerial_diff::longest_increasing_subsequence;
use aerial_dom::{
    apply_mutations, diff_node, escape_text, open_tag, to_html, Mutation, NodeKind, PatchPolicy,
    SyntheticNode,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, instrument, warn};

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Replace `range` of the source text with `text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub range: SourceRange,
    pub text: String,
}

impl TextEdit {
    pub fn new(range: SourceRange, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::new(SourceRange::new(at, at), text)
    }

    pub fn delete(range: SourceRange) -> Self {
        Self::new(range, String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProjectionWarning {
    /// The node or rule a mutation touches has no recorded source
    #[serde(rename_all = "camelCase")]
    ProvenanceGap { target: Uid },

    /// The edit overlapped one already accepted and was dropped
    #[serde(rename_all = "camelCase")]
    Overlap { uri: String, range: SourceRange },
}

/// Non-overlapping text edits grouped by source uri, sorted by position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub edits: BTreeMap<String, Vec<TextEdit>>,
    pub warnings: Vec<ProjectionWarning>,
}

impl Projection {
    pub fn is_empty(&self) -> bool {
        self.edits.values().all(|edits| edits.is_empty())
    }

    pub fn edits_for(&self, uri: &str) -> &[TextEdit] {
        self.edits.get(uri).map(Vec::as_slice).unwrap_or_default()
    }

    /// Rewrite `source`, the text `uri` had when the old tree was annotated
    pub fn apply(&self, uri: &str, source: &str) -> EditorResult<String> {
        apply_text_edits(source, self.edits_for(uri))
    }
}

/// Apply non-overlapping edits to `source`
pub fn apply_text_edits(source: &str, edits: &[TextEdit]) -> EditorResult<String> {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by_key(|edit| (edit.range.start, edit.range.end));

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in sorted {
        let SourceRange { start, end } = edit.range;
        let out_of_bounds = EditorError::EditOutOfBounds {
            start,
            end,
            len: source.len(),
        };
        if start < cursor || end < start {
            return Err(out_of_bounds);
        }
        let (Some(kept), true) = (source.get(cursor..start), source.is_char_boundary(end)) else {
            return Err(out_of_bounds);
        };
        out.push_str(kept);
        out.push_str(&edit.text);
        cursor = end;
    }

    let rest = source.get(cursor..).ok_or(EditorError::EditOutOfBounds {
        start: cursor,
        end: source.len(),
        len: source.len(),
    })?;
    out.push_str(rest);
    Ok(out)
}

/// Diff `old` against `new` and project the result onto `old`'s sources
pub fn project_diff(old: &SyntheticNode, new: &SyntheticNode) -> EditorResult<Projection> {
    project_mutations(old, &diff_node(old, new))
}

/// Project `mutations`, computed against the annotated `old` tree, onto text
#[instrument(skip_all, fields(mutations = mutations.len()))]
pub fn project_mutations(old: &SyntheticNode, mutations: &[Mutation]) -> EditorResult<Projection> {
    let mut patched = old.clone();
    let mut ids = SequentialIds::from_seed("projection");
    apply_mutations(&mut patched, mutations, &mut ids, PatchPolicy::Abort)?;

    let mut projector = Projector::new(old, &patched);
    for mutation in mutations {
        projector.project(mutation);
    }
    projector.project_child_lists();

    let projection = projector.finish();
    debug!(
        files = projection.edits.len(),
        warnings = projection.warnings.len(),
        "projected mutations"
    );
    Ok(projection)
}

#[derive(Debug)]
struct Candidate {
    uri: String,
    edit: TextEdit,
    /// Rewrites everything inside its range
    structural: bool,
}

struct Projector<'a> {
    old: HashMap<&'a Uid, &'a SyntheticNode>,
    patched: HashMap<&'a Uid, PatchedNode<'a>>,
    dirty_parents: Vec<Uid>,
    candidates: Vec<Candidate>,
    warnings: Vec<ProjectionWarning>,
}

#[derive(Clone, Copy)]
struct PatchedNode<'a> {
    node: &'a SyntheticNode,
    raw_text: bool,
}

impl<'a> Projector<'a> {
    fn new(old: &'a SyntheticNode, patched: &'a SyntheticNode) -> Self {
        let mut old_nodes = HashMap::new();
        index_old(old, &mut old_nodes);
        let mut patched_nodes = HashMap::new();
        index_patched(patched, false, &mut patched_nodes);

        Self {
            old: old_nodes,
            patched: patched_nodes,
            dirty_parents: Vec::new(),
            candidates: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Both versions of a node that existed before the batch and still does.
    /// Nodes added by the batch are written out with their new parent, and
    /// removed ones are deleted with theirs, so neither needs edits here.
    fn both(&self, id: &Uid) -> Option<(&'a SyntheticNode, PatchedNode<'a>)> {
        Some((*self.old.get(id)?, *self.patched.get(id)?))
    }

    fn source_of<'s>(&mut self, id: &Uid, source: &'s Option<SourceLocation>) -> Option<&'s SourceLocation> {
        if source.is_none() {
            self.gap(id);
        }
        source.as_ref()
    }

    fn gap(&mut self, target: &Uid) {
        warn!(%target, "no source recorded, skipping");
        self.warnings.push(ProjectionWarning::ProvenanceGap {
            target: target.clone(),
        });
    }

    fn push(&mut self, uri: &str, edit: TextEdit, structural: bool) {
        self.candidates.push(Candidate {
            uri: uri.to_string(),
            edit,
            structural,
        });
    }

    fn project(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::InsertChild { parent, .. }
            | Mutation::RemoveChild { parent, .. }
            | Mutation::MoveChild { parent, .. } => {
                if !self.dirty_parents.contains(parent) {
                    self.dirty_parents.push(parent.clone());
                }
            }
            Mutation::SetAttribute { element, .. } => self.project_start_tag(element),
            Mutation::SetTextContent { node, .. } => self.project_text(node),
            Mutation::StyleSheet { element, mutation } => self.project_css(element, mutation),
        }
    }

    fn project_start_tag(&mut self, id: &Uid) {
        let Some((old, patched)) = self.both(id) else {
            return;
        };
        let Some(element) = patched.node.as_element() else {
            return;
        };
        if let Some(source) = self.source_of(id, &old.source) {
            let edit = TextEdit::new(source.head(), open_tag(element));
            self.push(&source.uri, edit, false);
        }
    }

    fn project_text(&mut self, id: &Uid) {
        let Some((old, patched)) = self.both(id) else {
            return;
        };
        let Some(source) = self.source_of(id, &old.source) else {
            return;
        };

        let edit = match &patched.node.kind {
            NodeKind::Text { value } if patched.raw_text => TextEdit::new(source.range(), value.clone()),
            NodeKind::Text { value } => TextEdit::new(source.range(), escape_text(value)),
            NodeKind::Comment { value } => match source.inner {
                Some(inner) => TextEdit::new(inner, value.clone()),
                None => return self.gap(id),
            },
            _ => return,
        };
        self.push(&source.uri, edit, false);
    }

    fn project_css(&mut self, element: &Uid, mutation: &CssMutation) {
        let Some((old, patched)) = self.both(element) else {
            return;
        };
        let (Some(old_sheet), Some(new_sheet)) = (
            old.as_element().and_then(|e| e.sheet.as_ref()),
            patched.node.as_element().and_then(|e| e.sheet.as_ref()),
        ) else {
            return;
        };

        match mutation {
            CssMutation::SetDeclaration { rule, .. } => self.project_rule_body(old_sheet, new_sheet, rule, false),
            CssMutation::InsertRule { parent, .. }
            | CssMutation::RemoveRule { parent, .. }
            | CssMutation::MoveRule { parent, .. } => {
                if *parent == old_sheet.uid {
                    if let Some(source) = self.source_of(parent, &old_sheet.source) {
                        let edit = TextEdit::new(source.range(), css_text(new_sheet));
                        self.push(&source.uri, edit, true);
                    }
                } else {
                    self.project_rule_body(old_sheet, new_sheet, parent, true);
                }
            }
        }
    }

    fn project_rule_body(&mut self, old_sheet: &StyleSheet, new_sheet: &StyleSheet, rule: &Uid, structural: bool) {
        let (Some(old_rule), Some(new_rule)) = (old_sheet.find_rule(rule), new_sheet.find_rule(rule)) else {
            return;
        };
        let Some(source) = self.source_of(rule, &old_rule.source) else {
            return;
        };
        match source.inner {
            Some(inner) => {
                let edit = TextEdit::new(inner, rule_body(new_rule));
                self.push(&source.uri, edit, structural);
            }
            None => self.gap(rule),
        }
    }

    fn project_child_lists(&mut self) {
        for parent in std::mem::take(&mut self.dirty_parents) {
            self.project_child_list(&parent);
        }
    }

    fn project_child_list(&mut self, id: &Uid) {
        let Some((old, patched)) = self.both(id) else {
            return;
        };
        let (Some(old_children), Some(new_children)) = (old.children(), patched.node.children()) else {
            return;
        };
        let Some(inner) = old.source.as_ref().and_then(|source| source.inner) else {
            return self.gap(id);
        };
        let uri = old.source.as_ref().map(|s| s.uri.clone()).unwrap_or_default();

        let mut old_ranges = HashMap::new();
        for child in old_children {
            match &child.source {
                Some(source) => {
                    old_ranges.insert(&child.id, (old_ranges.len(), source.range()));
                }
                None => return self.gap(&child.id),
            }
        }

        // children that kept their relative order stay where they are
        let survivors: Vec<usize> = new_children
            .iter()
            .filter_map(|child| old_ranges.get(&child.id).map(|(pos, _)| *pos))
            .collect();
        let keep = longest_increasing_subsequence(&survivors);
        let stationary: HashSet<usize> = survivors
            .iter()
            .zip(keep)
            .filter_map(|(pos, kept)| kept.then_some(*pos))
            .collect();

        for child in old_children {
            if let Some((pos, range)) = old_ranges.get(&child.id) {
                if !stationary.contains(pos) {
                    self.push(&uri, TextEdit::delete(*range), true);
                }
            }
        }

        let mut pending = String::new();
        for child in new_children {
            match old_ranges.get(&child.id) {
                Some((pos, range)) if stationary.contains(pos) => {
                    if !pending.is_empty() {
                        let edit = TextEdit::insert(range.start, std::mem::take(&mut pending));
                        self.push(&uri, edit, false);
                    }
                }
                _ => pending.push_str(&render_child(child, patched.node)),
            }
        }
        if !pending.is_empty() {
            self.push(&uri, TextEdit::insert(inner.end, pending), false);
        }
    }

    fn finish(self) -> Projection {
        let mut projection = Projection {
            edits: BTreeMap::new(),
            warnings: self.warnings,
        };

        let mut by_uri: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
        for candidate in self.candidates {
            let group = by_uri.entry(candidate.uri.clone()).or_default();
            let duplicate = group
                .iter()
                .any(|c| c.edit == candidate.edit && c.structural == candidate.structural);
            if !duplicate {
                group.push(candidate);
            }
        }

        for (uri, candidates) in by_uri {
            let mut accepted: Vec<TextEdit> = Vec::new();
            for (i, candidate) in candidates.iter().enumerate() {
                let covered = candidates
                    .iter()
                    .enumerate()
                    .any(|(j, other)| i != j && other.structural && covers(&other.edit.range, candidate));
                if covered {
                    continue;
                }
                if accepted.iter().any(|edit| conflicts(&edit.range, &candidate.edit.range)) {
                    warn!(%uri, start = candidate.edit.range.start, end = candidate.edit.range.end, "overlapping edit dropped");
                    projection.warnings.push(ProjectionWarning::Overlap {
                        uri: uri.clone(),
                        range: candidate.edit.range,
                    });
                    continue;
                }
                accepted.push(candidate.edit.clone());
            }

            accepted.sort_by_key(|edit| (edit.range.start, edit.range.end));
            if !accepted.is_empty() {
                projection.edits.insert(uri, accepted);
            }
        }

        projection
    }
}

/// `outer` rewrites the place `candidate` would write to
fn covers(outer: &SourceRange, candidate: &Candidate) -> bool {
    let inner = &candidate.edit.range;
    if outer.is_empty() {
        return false;
    }
    if inner.is_empty() {
        outer.start < inner.start && inner.start < outer.end
    } else if candidate.structural {
        outer.contains(inner) && outer != inner
    } else {
        outer.contains(inner)
    }
}

fn conflicts(a: &SourceRange, b: &SourceRange) -> bool {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => a.start == b.start,
        (true, false) => b.start < a.start && a.start < b.end,
        (false, true) => a.start < b.start && b.start < a.end,
        (false, false) => a.overlaps(b),
    }
}

fn render_child(child: &SyntheticNode, parent: &SyntheticNode) -> String {
    match (&child.kind, is_raw_text(parent)) {
        (NodeKind::Text { value }, true) => value.clone(),
        _ => to_html(child),
    }
}

fn is_raw_text(node: &SyntheticNode) -> bool {
    node.as_element()
        .is_some_and(|element| RAW_TEXT_ELEMENTS.contains(&element.name.to_ascii_lowercase().as_str()))
}

fn index_old<'a>(node: &'a SyntheticNode, out: &mut HashMap<&'a Uid, &'a SyntheticNode>) {
    out.insert(&node.id, node);
    for child in node.children().into_iter().flatten() {
        index_old(child, out);
    }
}

fn index_patched<'a>(node: &'a SyntheticNode, raw_text: bool, out: &mut HashMap<&'a Uid, PatchedNode<'a>>) {
    out.insert(&node.id, PatchedNode { node, raw_text });
    let raw = is_raw_text(node);
    for child in node.children().into_iter().flatten() {
        index_patched(child, raw, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerial_common::IdGenerator;
    use aerial_css::CssRule;
    use aerial_dom::annotate_sources;

    const URI: &str = "file:///index.html";

    fn project(old: &mut SyntheticNode, new: &SyntheticNode) -> (String, Projection) {
        let html = annotate_sources(old, URI);
        let projection = project_diff(old, new).unwrap();
        let text = projection.apply(URI, &html).unwrap();
        (text, projection)
    }

    fn list(ids: &mut dyn IdGenerator, items: &[&str]) -> SyntheticNode {
        let mut ul = SyntheticNode::element(ids, "ul");
        for item in items {
            let li = SyntheticNode::element(ids, "li").with_child(SyntheticNode::text(ids, *item));
            ul = ul.with_child(li);
        }
        ul
    }

    #[test]
    fn test_apply_text_edits() {
        let edits = vec![
            TextEdit::new(SourceRange::new(6, 11), "there"),
            TextEdit::insert(0, ">> "),
            TextEdit::delete(SourceRange::new(5, 6)),
        ];
        assert_eq!(apply_text_edits("hello world", &edits).unwrap(), ">> hellothere");
    }

    #[test]
    fn test_apply_text_edits_out_of_bounds() {
        let edits = vec![TextEdit::new(SourceRange::new(3, 40), "x")];
        assert!(matches!(
            apply_text_edits("short", &edits),
            Err(EditorError::EditOutOfBounds { start: 3, end: 40, len: 5 })
        ));
    }

    #[test]
    fn test_text_and_attribute_changes() {
        let mut ids = SequentialIds::from_seed("p");
        let page = |ids: &mut SequentialIds, title: &str, text: &str| {
            SyntheticNode::element(ids, "div")
                .with_attribute("title", title)
                .with_child(SyntheticNode::text(ids, text))
        };
        let mut old = page(&mut ids, "a", "one");
        let new = page(&mut ids, "b", "two & three");

        let (text, projection) = project(&mut old, &new);
        assert_eq!(text, "<div title=\"b\">two &amp; three</div>");
        assert_eq!(projection.edits_for(URI).len(), 2);
        assert!(projection.warnings.is_empty());
    }

    #[test]
    fn test_reordered_children_are_moved_in_text() {
        let mut ids = SequentialIds::from_seed("p");
        let mut old = list(&mut ids, &["a", "b", "c", "d"]);
        let new = list(&mut ids, &["d", "a", "x", "c"]);

        let (text, _) = project(&mut old, &new);
        assert_eq!(text, to_html(&new));
    }

    #[test]
    fn test_comment_change_keeps_delimiters() {
        let mut ids = SequentialIds::from_seed("p");
        let mut old = SyntheticNode::element(&mut ids, "p").with_child(SyntheticNode::comment(&mut ids, "old"));
        let new = SyntheticNode::element(&mut ids, "p").with_child(SyntheticNode::comment(&mut ids, "new"));

        let (text, projection) = project(&mut old, &new);
        assert_eq!(text, "<p><!--new--></p>");
        assert_eq!(projection.edits_for(URI)[0].text, "new");
    }

    #[test]
    fn test_style_sheet_changes() {
        let mut ids = SequentialIds::from_seed("p");
        let page = |ids: &mut SequentialIds, color: &str, extra: bool| {
            let mut sheet = StyleSheet::new(ids)
                .with_rule(CssRule::style(ids, "a").with_declaration("color", color))
                .with_rule(CssRule::media(ids, "screen").with_rule(CssRule::style(ids, "b")));
            if extra {
                sheet = sheet.with_rule(CssRule::style(ids, "i").with_declaration("margin", "0"));
            }
            SyntheticNode::element(ids, "style").with_style_sheet(sheet)
        };
        let mut old = page(&mut ids, "red", false);
        let new = page(&mut ids, "blue", true);

        let (text, _) = project(&mut old, &new);
        assert_eq!(
            text,
            "<style>a { color: blue; } @media screen { b { } } i { margin: 0; }</style>"
        );
    }

    #[test]
    fn test_declaration_change_is_one_edit() {
        let mut ids = SequentialIds::from_seed("p");
        let page = |ids: &mut SequentialIds, color: &str| {
            SyntheticNode::element(ids, "style").with_style_sheet(
                StyleSheet::new(ids).with_rule(
                    CssRule::media(ids, "print").with_rule(CssRule::style(ids, "a").with_declaration("color", color)),
                ),
            )
        };
        let mut old = page(&mut ids, "red");
        let new = page(&mut ids, "blue");

        let (text, projection) = project(&mut old, &new);
        assert_eq!(text, "<style>@media print { a { color: blue; } }</style>");
        assert_eq!(projection.edits_for(URI), &[TextEdit::new(SourceRange::new(25, 38), " color: blue; ")]);
    }

    #[test]
    fn test_missing_provenance_is_reported() {
        let mut ids = SequentialIds::from_seed("p");
        let old = SyntheticNode::element(&mut ids, "div").with_attribute("class", "a");
        let new = SyntheticNode::element(&mut ids, "div").with_attribute("class", "b");

        let projection = project_diff(&old, &new).unwrap();
        assert!(projection.is_empty());
        assert_eq!(
            projection.warnings,
            vec![ProjectionWarning::ProvenanceGap { target: old.id.clone() }]
        );
    }

    #[test]
    fn test_edits_inside_removed_nodes_are_dropped() {
        let mut ids = SequentialIds::from_seed("p");
        let mut old = list(&mut ids, &["a", "b"]);
        annotate_sources(&mut old, URI);
        let li = old.children().unwrap()[1].clone();
        let text = li.children().unwrap()[0].id.clone();

        let mutations = vec![
            Mutation::SetTextContent {
                node: text,
                value: "changed".into(),
            },
            Mutation::RemoveChild {
                parent: old.id.clone(),
                child: li.id.clone(),
                index: 1,
            },
        ];
        let projection = project_mutations(&old, &mutations).unwrap();
        assert_eq!(projection.edits_for(URI), &[TextEdit::delete(li.source.unwrap().range())]);
        assert!(projection.warnings.is_empty());
    }
}
