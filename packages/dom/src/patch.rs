//! # Patch Applier
//!
//! Applies mutations to a live tree in emission order, resolving every
//! target against the current state of the tree.
//!
//! ## Policy
//!
//! - Attribute, text and declaration sets are no-ops when the value already
//!   matches (no inverse, no event)
//! - Index-based mutations fail with `IndexOutOfBounds` or `StaleTarget`
//!   instead of splicing anywhere else
//! - [`PatchPolicy`] decides whether a failure aborts the rest of the batch
//!   or is recorded and skipped

use crate::errors::{MutationError, MutationResult, PatchError};
use crate::index::NodeIndex;
use crate::mutation::Mutation;
use crate::node::SyntheticNode;
use aerial_common::{FreshIds, IdGenerator, Uid};
use aerial_css::{apply_css_mutation, CssMutation, CssRule};
use aerial_diff::EntryEdit;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::{debug, instrument, trace, warn};

/// What to do when a mutation in a batch fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatchPolicy {
    /// Stop at the first failure; earlier mutations stay applied
    #[default]
    Abort,
    /// Record the failure and carry on with the next mutation
    SkipAndContinue,
}

/// Outcome of a batch
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PatchReport {
    /// Mutations that changed the tree
    pub applied: usize,
    /// Mutations that were already satisfied
    pub unchanged: usize,
    /// Failures recorded under [`PatchPolicy::SkipAndContinue`]
    pub skipped: Vec<SkippedMutation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedMutation {
    pub index: usize,
    pub error: MutationError,
}

impl PatchReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Apply one mutation and return its inverse, or `None` if it was a no-op.
pub fn apply_mutation(
    root: &mut SyntheticNode,
    mutation: &Mutation,
    ids: &mut dyn IdGenerator,
) -> MutationResult<Option<Mutation>> {
    apply_mutation_indexed(root, mutation, ids, &mut NodeIndex::new())
}

/// [`apply_mutation`] resolving targets through a caller-owned index.
///
/// An inserted subtree keeps its identities unless one of its node ids is
/// already live in the tree; then the whole subtree is re-identified with
/// ids drawn from `ids`, skipping every identity live in the tree. Inserted
/// rules get the same treatment against the whole tree.
pub fn apply_mutation_indexed(
    root: &mut SyntheticNode,
    mutation: &Mutation,
    ids: &mut dyn IdGenerator,
    index: &mut NodeIndex,
) -> MutationResult<Option<Mutation>> {
    trace!(target_id = %mutation.target(), kind = mutation.kind_name(), "applying mutation");

    match mutation {
        Mutation::InsertChild {
            parent,
            index: at,
            child,
        } => {
            let len = children_of(index.get(root, parent), parent)?.len();
            if *at > len {
                return Err(MutationError::IndexOutOfBounds { index: *at, len });
            }

            let mut inserted = child.clone();
            let collides = node_ids(&inserted)
                .into_iter()
                .any(|id| index.contains(root, id));
            if collides {
                debug!(child = %child.id, "re-identifying inserted subtree");
                inserted.regenerate_ids(&mut FreshIds::new(ids, root.uids()), true);
            }
            inserted.parent = Some(parent.clone());
            inserted.link();

            let inverse = Mutation::RemoveChild {
                parent: parent.clone(),
                child: inserted.id.clone(),
                index: *at,
            };
            children_of_mut(index.get_mut(root, parent), parent)?.insert(*at, inserted);
            index.reindex_children(root, parent);
            Ok(Some(inverse))
        }

        Mutation::RemoveChild {
            parent,
            child,
            index: at,
        } => {
            let children = children_of_mut(index.get_mut(root, parent), parent)?;
            check_target(children, child, *at)?;
            let mut removed = children.remove(*at);
            removed.parent = None;
            index.forget(&removed);
            index.reindex_children(root, parent);

            Ok(Some(Mutation::InsertChild {
                parent: parent.clone(),
                index: *at,
                child: removed,
            }))
        }

        Mutation::MoveChild {
            parent,
            child,
            old_index,
            new_index,
        } => {
            let children = children_of_mut(index.get_mut(root, parent), parent)?;
            check_target(children, child, *old_index)?;
            if *new_index >= children.len() {
                return Err(MutationError::IndexOutOfBounds {
                    index: *new_index,
                    len: children.len() - 1,
                });
            }
            let moved = children.remove(*old_index);
            children.insert(*new_index, moved);
            index.reindex_children(root, parent);

            Ok(Some(Mutation::MoveChild {
                parent: parent.clone(),
                child: child.clone(),
                old_index: *new_index,
                new_index: *old_index,
            }))
        }

        Mutation::SetAttribute {
            element,
            name,
            value,
            index: at,
        } => {
            let attributes = &mut index
                .get_mut(root, element)
                .ok_or_else(|| MutationError::NodeNotFound(element.clone()))?
                .as_element_mut()
                .ok_or_else(|| MutationError::NotAnElement(element.clone()))?
                .attributes;

            let edit = EntryEdit {
                value: value.clone(),
                index: *at,
            };
            let undo = attributes
                .set_entry(name, &edit)
                .map_err(|err| MutationError::AttributeOutOfBounds {
                    index: err.index,
                    len: err.len,
                })?;
            Ok(undo.map(|undo| Mutation::SetAttribute {
                element: element.clone(),
                name: name.clone(),
                value: undo.value,
                index: undo.index,
            }))
        }

        Mutation::SetTextContent { node, value } => {
            let current = index
                .get_mut(root, node)
                .ok_or_else(|| MutationError::NodeNotFound(node.clone()))?
                .value_mut()
                .ok_or_else(|| MutationError::NotAValueNode(node.clone()))?;

            if current == value {
                return Ok(None);
            }
            let previous = std::mem::replace(current, value.clone());
            Ok(Some(Mutation::SetTextContent {
                node: node.clone(),
                value: previous,
            }))
        }

        Mutation::StyleSheet {
            element,
            mutation: css,
        } => {
            // rule ids live in the same space as node ids
            let css = match css {
                CssMutation::InsertRule {
                    parent: sheet_parent,
                    index: at,
                    rule,
                } => {
                    let live: HashSet<Uid> = root.uids().into_iter().collect();
                    let mut rule = rule.clone();
                    if rule_uids(&rule).into_iter().any(|uid| live.contains(uid)) {
                        debug!(rule = %rule.uid, "re-identifying inserted rule");
                        rule.regenerate_ids(&mut FreshIds::new(ids, live), true);
                    }
                    Cow::Owned(CssMutation::InsertRule {
                        parent: sheet_parent.clone(),
                        index: *at,
                        rule,
                    })
                }
                other => Cow::Borrowed(other),
            };

            let sheet = index
                .get_mut(root, element)
                .ok_or_else(|| MutationError::NodeNotFound(element.clone()))?
                .as_element_mut()
                .ok_or_else(|| MutationError::NotAnElement(element.clone()))?
                .sheet
                .as_mut()
                .ok_or_else(|| MutationError::NoStyleSheet(element.clone()))?;

            let inverse = apply_css_mutation(sheet, &css, ids)?;
            Ok(inverse.map(|mutation| Mutation::StyleSheet {
                element: element.clone(),
                mutation,
            }))
        }
    }
}

/// Apply a batch in order under `policy`.
#[instrument(skip_all, fields(mutations = mutations.len(), ?policy))]
pub fn apply_mutations(
    root: &mut SyntheticNode,
    mutations: &[Mutation],
    ids: &mut dyn IdGenerator,
    policy: PatchPolicy,
) -> Result<PatchReport, PatchError> {
    apply_mutations_with(root, mutations, ids, policy, &mut NodeIndex::new(), |_, _| {})
}

/// [`apply_mutations`] with a caller-owned index; `on_applied` receives each
/// mutation that changed the tree together with its inverse.
pub fn apply_mutations_with<F>(
    root: &mut SyntheticNode,
    mutations: &[Mutation],
    ids: &mut dyn IdGenerator,
    policy: PatchPolicy,
    index: &mut NodeIndex,
    mut on_applied: F,
) -> Result<PatchReport, PatchError>
where
    F: FnMut(&Mutation, Mutation),
{
    let mut report = PatchReport::default();

    for (i, mutation) in mutations.iter().enumerate() {
        match apply_mutation_indexed(root, mutation, ids, index) {
            Ok(Some(inverse)) => {
                report.applied += 1;
                on_applied(mutation, inverse);
            }
            Ok(None) => report.unchanged += 1,
            Err(error) => match policy {
                PatchPolicy::Abort => {
                    return Err(PatchError {
                        index: i,
                        applied: report.applied,
                        source: error,
                    });
                }
                PatchPolicy::SkipAndContinue => {
                    warn!(index = i, %error, "skipping mutation");
                    report.skipped.push(SkippedMutation { index: i, error });
                }
            },
        }
    }

    debug!(
        applied = report.applied,
        unchanged = report.unchanged,
        skipped = report.skipped.len(),
        "applied mutations"
    );
    Ok(report)
}

fn children_of<'a>(node: Option<&'a SyntheticNode>, id: &Uid) -> MutationResult<&'a Vec<SyntheticNode>> {
    node.ok_or_else(|| MutationError::NodeNotFound(id.clone()))?
        .children()
        .ok_or_else(|| MutationError::NotAParent(id.clone()))
}

fn children_of_mut<'a>(
    node: Option<&'a mut SyntheticNode>,
    id: &Uid,
) -> MutationResult<&'a mut Vec<SyntheticNode>> {
    node.ok_or_else(|| MutationError::NodeNotFound(id.clone()))?
        .children_mut()
        .ok_or_else(|| MutationError::NotAParent(id.clone()))
}

fn check_target(children: &[SyntheticNode], expected: &Uid, index: usize) -> MutationResult<()> {
    let found = children.get(index).ok_or(MutationError::IndexOutOfBounds {
        index,
        len: children.len(),
    })?;

    if found.id != *expected {
        return Err(MutationError::StaleTarget {
            expected: expected.clone(),
            index,
            found: found.id.clone(),
        });
    }
    Ok(())
}

fn rule_uids(rule: &CssRule) -> Vec<&Uid> {
    let mut uids = vec![&rule.uid];
    if let Some(children) = rule.rules() {
        uids.extend(children.iter().flat_map(rule_uids));
    }
    uids
}

fn node_ids(node: &SyntheticNode) -> Vec<&Uid> {
    let mut ids = vec![&node.id];
    if let Some(children) = node.children() {
        ids.extend(children.iter().flat_map(node_ids));
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::diff_node;
    use aerial_common::SequentialIds;

    fn list(ids: &mut SequentialIds) -> SyntheticNode {
        SyntheticNode::element(ids, "ul")
            .with_child(SyntheticNode::element(ids, "li").with_child(SyntheticNode::text(ids, "a")))
            .with_child(SyntheticNode::element(ids, "li").with_child(SyntheticNode::text(ids, "b")))
    }

    #[test]
    fn test_insert_links_parent() {
        let mut ids = SequentialIds::from_seed("t");
        let mut root = list(&mut ids);
        let child = SyntheticNode::element(&mut ids, "li");
        let insert = Mutation::InsertChild {
            parent: root.id.clone(),
            index: 2,
            child: child.clone(),
        };

        let inverse = apply_mutation(&mut root, &insert, &mut ids).unwrap().unwrap();
        let inserted = &root.children().unwrap()[2];
        assert_eq!(inserted.id, child.id);
        assert_eq!(inserted.parent.as_ref(), Some(&root.id));

        apply_mutation(&mut root, &inverse, &mut ids).unwrap();
        assert_eq!(root.children().unwrap().len(), 2);
    }

    #[test]
    fn test_colliding_insert_is_reidentified() {
        let mut ids = SequentialIds::from_seed("t");
        let mut root = list(&mut ids);
        let copy = root.children().unwrap()[0].clone();
        let insert = Mutation::InsertChild {
            parent: root.id.clone(),
            index: 0,
            child: copy.clone(),
        };

        apply_mutation(&mut root, &insert, &mut ids).unwrap();
        let inserted = &root.children().unwrap()[0];
        assert_ne!(inserted.id, copy.id);
        assert_ne!(inserted.children().unwrap()[0].id, copy.children().unwrap()[0].id);
        assert!(inserted.same_structure(&copy));
    }

    #[test]
    fn test_out_of_bounds_never_clamps() {
        let mut ids = SequentialIds::from_seed("t");
        let mut root = list(&mut ids);
        let before = root.clone();
        let first = root.children().unwrap()[0].id.clone();

        let err = apply_mutation(
            &mut root,
            &Mutation::MoveChild {
                parent: before.id.clone(),
                child: first,
                old_index: 0,
                new_index: 2,
            },
            &mut ids,
        )
        .unwrap_err();

        assert_eq!(err, MutationError::IndexOutOfBounds { index: 2, len: 1 });
        assert_eq!(root, before);
    }

    #[test]
    fn test_stale_remove() {
        let mut ids = SequentialIds::from_seed("t");
        let mut root = list(&mut ids);
        let second = root.children().unwrap()[1].id.clone();
        let parent = root.id.clone();

        let err = apply_mutation(
            &mut root,
            &Mutation::RemoveChild {
                parent,
                child: second.clone(),
                index: 0,
            },
            &mut ids,
        )
        .unwrap_err();
        assert!(matches!(err, MutationError::StaleTarget { expected, index: 0, .. } if expected == second));
    }

    #[test]
    fn test_sets_are_idempotent() {
        let mut ids = SequentialIds::from_seed("t");
        let mut root = list(&mut ids);
        let text = root.children().unwrap()[0].children().unwrap()[0].id.clone();
        let set_text = Mutation::SetTextContent {
            node: text,
            value: "z".into(),
        };
        let set_attr = Mutation::SetAttribute {
            element: root.id.clone(),
            name: "class".into(),
            value: Some("list".into()),
            index: None,
        };

        assert!(apply_mutation(&mut root, &set_text, &mut ids).unwrap().is_some());
        assert!(apply_mutation(&mut root, &set_text, &mut ids).unwrap().is_none());
        assert!(apply_mutation(&mut root, &set_attr, &mut ids).unwrap().is_some());
        assert!(apply_mutation(&mut root, &set_attr, &mut ids).unwrap().is_none());
        assert_eq!(root.attribute("class"), Some("list"));
        assert_eq!(root.text_content(), "zb");
    }

    #[test]
    fn test_wrong_node_kinds() {
        let mut ids = SequentialIds::from_seed("t");
        let mut root = list(&mut ids);
        let text = root.children().unwrap()[0].children().unwrap()[0].id.clone();

        let err = apply_mutation(
            &mut root,
            &Mutation::SetAttribute {
                element: text.clone(),
                name: "x".into(),
                value: None,
                index: None,
            },
            &mut ids,
        )
        .unwrap_err();
        assert_eq!(err, MutationError::NotAnElement(text.clone()));

        let err = apply_mutation(
            &mut root,
            &Mutation::InsertChild {
                parent: text.clone(),
                index: 0,
                child: SyntheticNode::text(&mut SequentialIds::from_seed("other"), "x"),
            },
            &mut ids,
        )
        .unwrap_err();
        assert_eq!(err, MutationError::NotAParent(text));
    }

    #[test]
    fn test_abort_reports_position() {
        let mut ids = SequentialIds::from_seed("t");
        let mut root = list(&mut ids);
        let mutations = vec![
            Mutation::SetAttribute {
                element: root.id.clone(),
                name: "a".into(),
                value: Some("1".into()),
                index: None,
            },
            Mutation::SetAttribute {
                element: Uid::from("missing"),
                name: "a".into(),
                value: Some("1".into()),
                index: None,
            },
            Mutation::SetAttribute {
                element: root.id.clone(),
                name: "b".into(),
                value: Some("2".into()),
                index: None,
            },
        ];

        let err = apply_mutations(&mut root.clone(), &mutations, &mut ids, PatchPolicy::Abort).unwrap_err();
        assert_eq!((err.index, err.applied), (1, 1));
        assert_eq!(err.source, MutationError::NodeNotFound(Uid::from("missing")));

        let report = apply_mutations(&mut root, &mutations, &mut ids, PatchPolicy::SkipAndContinue).unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert_eq!(root.attribute("b"), Some("2"));
    }

    #[test]
    fn test_inverses_undo_a_diff() {
        let mut ids = SequentialIds::from_seed("t");
        let mut root = list(&mut ids);
        let original = root.clone();
        let target = SyntheticNode::element(&mut ids, "ul")
            .with_attribute("class", "x")
            .with_child(SyntheticNode::element(&mut ids, "li").with_child(SyntheticNode::text(&mut ids, "b")))
            .with_child(SyntheticNode::comment(&mut ids, "note"))
            .with_child(SyntheticNode::element(&mut ids, "li").with_child(SyntheticNode::text(&mut ids, "c")));

        let mutations = diff_node(&root, &target);
        let mut inverses = Vec::new();
        apply_mutations_with(
            &mut root,
            &mutations,
            &mut ids,
            PatchPolicy::Abort,
            &mut NodeIndex::new(),
            |_, inverse| inverses.push(inverse),
        )
        .unwrap();
        assert!(root.same_structure(&target));

        inverses.reverse();
        apply_mutations(&mut root, &inverses, &mut ids, PatchPolicy::Abort).unwrap();
        assert_eq!(root, original);
    }

    #[test]
    fn test_index_follows_structural_edits() {
        let mut ids = SequentialIds::from_seed("t");
        let mut root = list(&mut ids);
        let target = SyntheticNode::element(&mut ids, "ul")
            .with_child(SyntheticNode::comment(&mut ids, "top"))
            .with_child(SyntheticNode::element(&mut ids, "li").with_child(SyntheticNode::text(&mut ids, "b")))
            .with_child(SyntheticNode::element(&mut ids, "li").with_child(SyntheticNode::text(&mut ids, "c")));

        let mut index = NodeIndex::build(&root);
        let mutations = diff_node(&root, &target);
        apply_mutations_with(&mut root, &mutations, &mut ids, PatchPolicy::Abort, &mut index, |_, _| {}).unwrap();
        assert!(root.same_structure(&target));
        assert!(index.is_fresh());

        let mut rebuilt = NodeIndex::build(&root);
        assert_eq!(index.len(), rebuilt.len());
        for id in node_ids(&root) {
            assert_eq!(index.path(&root, id), rebuilt.path(&root, id));
        }
    }

    #[test]
    fn test_attribute_removal_undo_restores_position() {
        let mut ids = SequentialIds::from_seed("t");
        let mut root = SyntheticNode::element(&mut ids, "a")
            .with_attribute("href", "/")
            .with_attribute("class", "nav")
            .with_attribute("title", "home");
        let original = root.clone();
        let element = root.id.clone();
        let remove = Mutation::SetAttribute {
            element: element.clone(),
            name: "class".into(),
            value: None,
            index: None,
        };

        let inverse = apply_mutation(&mut root, &remove, &mut ids).unwrap().unwrap();
        assert!(matches!(&inverse, Mutation::SetAttribute { index: Some(1), .. }));
        apply_mutation(&mut root, &inverse, &mut ids).unwrap();
        assert_eq!(root, original);

        let far = Mutation::SetAttribute {
            element,
            name: "rel".into(),
            value: Some("next".into()),
            index: Some(7),
        };
        let err = apply_mutation(&mut root, &far, &mut ids).unwrap_err();
        assert_eq!(err, MutationError::AttributeOutOfBounds { index: 7, len: 3 });
    }
}
