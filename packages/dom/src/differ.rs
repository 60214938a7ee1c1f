//! DOM diffing - compute the mutations that turn one synthetic tree into
//! another

use crate::mutation::Mutation;
use crate::node::{NodeKind, SyntheticNode};
use aerial_css::diff_style_sheet;
use aerial_diff::{diff_array, diff_map, ArrayOp, Score};
use tracing::{debug, instrument};

/// Diff two trees whose roots are the same logical node.
///
/// Mutations address `old`'s identities; inserted children are clones from
/// `new`. Children are paired with [`nodes_correspond`]; a child that has no
/// counterpart is removed or inserted, never updated across kinds.
#[instrument(skip_all, fields(old = %old.id, new = %new.id))]
pub fn diff_node(old: &SyntheticNode, new: &SyntheticNode) -> Vec<Mutation> {
    let mut mutations = Vec::new();
    diff_matched(old, new, &mut mutations);

    debug!(mutations = mutations.len(), "diffed node");
    mutations
}

/// Whether two nodes are the same logical node: elements by name and
/// namespace (and both or neither owning a style sheet), everything else by
/// node type.
pub fn nodes_correspond(old: &SyntheticNode, new: &SyntheticNode) -> Option<Score> {
    let same = match (&old.kind, &new.kind) {
        (NodeKind::Element(a), NodeKind::Element(b)) => {
            a.name == b.name && a.namespace == b.namespace && a.sheet.is_some() == b.sheet.is_some()
        }
        _ => old.node_type() == new.node_type(),
    };

    same.then_some(Score::EXACT)
}

fn diff_matched(old: &SyntheticNode, new: &SyntheticNode, mutations: &mut Vec<Mutation>) {
    match (&old.kind, &new.kind) {
        (NodeKind::Element(a), NodeKind::Element(b)) => {
            for change in diff_map(&a.attributes, &b.attributes) {
                let edit = change.to_edit();
                mutations.push(Mutation::SetAttribute {
                    element: old.id.clone(),
                    name: change.key().clone(),
                    value: edit.value,
                    index: edit.index,
                });
            }

            if let (Some(old_sheet), Some(new_sheet)) = (&a.sheet, &b.sheet) {
                mutations.extend(diff_style_sheet(old_sheet, new_sheet).into_iter().map(|mutation| {
                    Mutation::StyleSheet {
                        element: old.id.clone(),
                        mutation,
                    }
                }));
            }
        }
        (NodeKind::Text { value: a }, NodeKind::Text { value: b })
        | (NodeKind::Comment { value: a }, NodeKind::Comment { value: b }) => {
            if a != b {
                mutations.push(Mutation::SetTextContent {
                    node: old.id.clone(),
                    value: b.clone(),
                });
            }
        }
        _ => {}
    }

    if let (Some(old_children), Some(new_children)) = (old.children(), new.children()) {
        diff_children(old, old_children, new_children, mutations);
    }
}

fn diff_children(
    parent: &SyntheticNode,
    old: &[SyntheticNode],
    new: &[SyntheticNode],
    mutations: &mut Vec<Mutation>,
) {
    let diff = diff_array(old, new, nodes_correspond);

    for op in diff.iter() {
        match *op {
            ArrayOp::Delete { index, value } => mutations.push(Mutation::RemoveChild {
                parent: parent.id.clone(),
                child: value.id.clone(),
                index,
            }),
            ArrayOp::Move { from, to, value, .. } => mutations.push(Mutation::MoveChild {
                parent: parent.id.clone(),
                child: value.id.clone(),
                old_index: from,
                new_index: to,
            }),
            ArrayOp::Insert { index, value } => mutations.push(Mutation::InsertChild {
                parent: parent.id.clone(),
                index,
                child: value.clone(),
            }),
            ArrayOp::Update {
                old_value,
                new_value,
                ..
            } => diff_matched(old_value, new_value, mutations),
        }
    }
}
