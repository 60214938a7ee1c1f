//! Apply CSS mutations to a live style sheet.

use crate::cssom::{CssRule, StyleSheet};
use crate::mutation::{CssMutation, CssMutationError, CssMutationResult};
use aerial_common::{FreshIds, IdGenerator, Uid};
use aerial_diff::EntryEdit;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Apply one mutation in place and return its inverse.
///
/// Returns `Ok(None)` when the mutation was a no-op against the current
/// state (a declaration already holding the value at the requested
/// position, or already absent).
/// Index-based mutations check bounds and the identity at the index before
/// touching the sheet.
///
/// An inserted rule keeps its identities unless one of them is already live
/// in the sheet; then the whole inserted subtree is re-identified with ids
/// drawn from `ids`, skipping any that are live.
pub fn apply_css_mutation(
    sheet: &mut StyleSheet,
    mutation: &CssMutation,
    ids: &mut dyn IdGenerator,
) -> CssMutationResult<Option<CssMutation>> {
    trace!(target_uid = %mutation.target(), ?mutation, "applying css mutation");

    match mutation {
        CssMutation::InsertRule {
            parent,
            index,
            rule,
        } => {
            let sheet_uid = sheet.uid.clone();
            let live: HashSet<Uid> = sheet
                .flatten()
                .into_keys()
                .cloned()
                .chain(std::iter::once(sheet_uid.clone()))
                .collect();
            let parent_rule = (*parent != sheet_uid).then(|| parent.clone());
            let rules = rule_list_mut(sheet, parent)?;
            if *index > rules.len() {
                return Err(CssMutationError::IndexOutOfBounds {
                    index: *index,
                    len: rules.len(),
                });
            }

            let mut inserted = rule.clone();
            if rule_uids(&inserted).iter().any(|uid| live.contains(uid)) {
                inserted.regenerate_ids(&mut FreshIds::new(ids, live), true);
            }
            inserted.link_under(Some(&sheet_uid), parent_rule.as_ref());
            let inverse = CssMutation::RemoveRule {
                parent: parent.clone(),
                rule: inserted.uid.clone(),
                index: *index,
            };
            rules.insert(*index, inserted);
            Ok(Some(inverse))
        }

        CssMutation::RemoveRule {
            parent,
            rule,
            index,
        } => {
            let rules = rule_list_mut(sheet, parent)?;
            check_target(rules, rule, *index)?;
            let removed = rules.remove(*index);
            Ok(Some(CssMutation::InsertRule {
                parent: parent.clone(),
                index: *index,
                rule: removed,
            }))
        }

        CssMutation::MoveRule {
            parent,
            rule,
            old_index,
            new_index,
        } => {
            let rules = rule_list_mut(sheet, parent)?;
            check_target(rules, rule, *old_index)?;
            if *new_index >= rules.len() {
                return Err(CssMutationError::IndexOutOfBounds {
                    index: *new_index,
                    len: rules.len() - 1,
                });
            }
            let moved = rules.remove(*old_index);
            rules.insert(*new_index, moved);
            Ok(Some(CssMutation::MoveRule {
                parent: parent.clone(),
                rule: rule.clone(),
                old_index: *new_index,
                new_index: *old_index,
            }))
        }

        CssMutation::SetDeclaration {
            rule,
            name,
            value,
            index,
        } => {
            let target = sheet
                .find_rule_mut(rule)
                .ok_or_else(|| CssMutationError::RuleNotFound(rule.clone()))?;
            let style = target
                .declarations_mut()
                .ok_or_else(|| CssMutationError::NotADeclarationRule(rule.clone()))?;

            let edit = EntryEdit {
                value: value.clone(),
                index: *index,
            };
            let undo = style
                .set_entry(name, &edit)
                .map_err(|err| CssMutationError::DeclarationOutOfBounds {
                    index: err.index,
                    len: err.len,
                })?;
            Ok(undo.map(|undo| CssMutation::SetDeclaration {
                rule: rule.clone(),
                name: name.clone(),
                value: undo.value,
                index: undo.index,
            }))
        }
    }
}

/// Apply mutations in order, stopping at the first failure.
///
/// Returns how many mutations changed the sheet.
pub fn apply_css_mutations(
    sheet: &mut StyleSheet,
    mutations: &[CssMutation],
    ids: &mut dyn IdGenerator,
) -> CssMutationResult<usize> {
    let mut changed = 0;
    for mutation in mutations {
        if apply_css_mutation(sheet, mutation, ids)?.is_some() {
            changed += 1;
        }
    }

    debug!(total = mutations.len(), changed, "applied css mutations");
    Ok(changed)
}

fn rule_list_mut<'a>(sheet: &'a mut StyleSheet, parent: &Uid) -> CssMutationResult<&'a mut Vec<CssRule>> {
    if *parent == sheet.uid {
        return Ok(&mut sheet.rules);
    }

    let rule = sheet
        .find_rule_mut(parent)
        .ok_or_else(|| CssMutationError::RuleNotFound(parent.clone()))?;
    rule.rules_mut()
        .ok_or_else(|| CssMutationError::NotAGroupingRule(parent.clone()))
}

fn rule_uids(rule: &CssRule) -> Vec<&Uid> {
    let mut uids = vec![&rule.uid];
    if let Some(children) = rule.rules() {
        uids.extend(children.iter().flat_map(rule_uids));
    }
    uids
}

fn check_target(rules: &[CssRule], expected: &Uid, index: usize) -> CssMutationResult<()> {
    let found = rules.get(index).ok_or(CssMutationError::IndexOutOfBounds {
        index,
        len: rules.len(),
    })?;

    if found.uid != *expected {
        return Err(CssMutationError::StaleTarget {
            expected: expected.clone(),
            index,
            found: found.uid.clone(),
        });
    }
    Ok(())
}
