//! CSS diffing - compute the mutations that turn one style sheet into another

use crate::cssom::{CssRule, RuleKind, StyleSheet};
use crate::mutation::CssMutation;
use aerial_common::Uid;
use aerial_diff::{diff_array, diff_map, ArrayOp, Score};
use tracing::{debug, instrument};

/// Diff two style sheets. Mutations address `old`'s identities.
#[instrument(skip_all, fields(old = %old.uid, new = %new.uid))]
pub fn diff_style_sheet(old: &StyleSheet, new: &StyleSheet) -> Vec<CssMutation> {
    let mut mutations = Vec::new();
    diff_rule_list(&old.uid, &old.rules, &new.rules, &mut mutations);

    debug!(mutations = mutations.len(), "diffed style sheet");
    mutations
}

/// Diff two rules already known to correspond.
///
/// Declaration rules produce per-property sets that also carry the
/// position of moved or added properties; grouping rules recurse into their
/// nested rule lists.
pub fn diff_rule(old: &CssRule, new: &CssRule) -> Vec<CssMutation> {
    let mut mutations = Vec::new();
    diff_matched_rule(old, new, &mut mutations);
    mutations
}

/// Whether two rules are the same logical rule.
///
/// Rules of different kinds never correspond. Style rules match on selector,
/// media rules on condition, keyframes on name, font-face on `font-family`,
/// other at-rules on name plus prelude.
pub fn rules_correspond(old: &CssRule, new: &CssRule) -> Option<Score> {
    let same = match (&old.kind, &new.kind) {
        (RuleKind::Style { selector: a, .. }, RuleKind::Style { selector: b, .. }) => a == b,
        (RuleKind::Media { condition: a, .. }, RuleKind::Media { condition: b, .. }) => a == b,
        (RuleKind::Keyframes { name: a, .. }, RuleKind::Keyframes { name: b, .. }) => a == b,
        (RuleKind::FontFace { style: a }, RuleKind::FontFace { style: b }) => {
            a.get("font-family") == b.get("font-family")
        }
        (
            RuleKind::Unknown {
                name: a, prelude: pa, ..
            },
            RuleKind::Unknown {
                name: b, prelude: pb, ..
            },
        ) => a == b && pa == pb,
        _ => false,
    };

    same.then_some(Score::EXACT)
}

fn diff_rule_list(parent: &Uid, old: &[CssRule], new: &[CssRule], mutations: &mut Vec<CssMutation>) {
    let diff = diff_array(old, new, rules_correspond);

    for op in diff.iter() {
        match *op {
            ArrayOp::Delete { index, value } => mutations.push(CssMutation::RemoveRule {
                parent: parent.clone(),
                rule: value.uid.clone(),
                index,
            }),
            ArrayOp::Move { from, to, value, .. } => mutations.push(CssMutation::MoveRule {
                parent: parent.clone(),
                rule: value.uid.clone(),
                old_index: from,
                new_index: to,
            }),
            ArrayOp::Insert { index, value } => mutations.push(CssMutation::InsertRule {
                parent: parent.clone(),
                index,
                rule: value.clone(),
            }),
            ArrayOp::Update {
                old_value,
                new_value,
                ..
            } => diff_matched_rule(old_value, new_value, mutations),
        }
    }
}

fn diff_matched_rule(old: &CssRule, new: &CssRule, mutations: &mut Vec<CssMutation>) {
    if let (Some(old_style), Some(new_style)) = (old.declarations(), new.declarations()) {
        for change in diff_map(old_style, new_style) {
            let edit = change.to_edit();
            mutations.push(CssMutation::SetDeclaration {
                rule: old.uid.clone(),
                name: change.key().clone(),
                value: edit.value,
                index: edit.index,
            });
        }
    }

    if let (Some(old_rules), Some(new_rules)) = (old.rules(), new.rules()) {
        diff_rule_list(&old.uid, old_rules, new_rules, mutations);
    }
}
