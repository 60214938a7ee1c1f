//! CSS mutations: serializable edits addressed by stable identity.

use crate::cssom::CssRule;
use aerial_common::Uid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One edit to a style sheet.
///
/// `parent` is the uid of the sheet or grouping rule whose rule list is
/// edited. Indices follow the progressive convention of `aerial_diff`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CssMutation {
    #[serde(rename_all = "camelCase")]
    InsertRule {
        parent: Uid,
        index: usize,
        rule: CssRule,
    },

    #[serde(rename_all = "camelCase")]
    RemoveRule { parent: Uid, rule: Uid, index: usize },

    #[serde(rename_all = "camelCase")]
    MoveRule {
        parent: Uid,
        rule: Uid,
        old_index: usize,
        new_index: usize,
    },

    /// `value: None` removes the declaration. `index` is the position the
    /// declaration ends up at; without it an existing declaration keeps its
    /// place and a new one is appended.
    #[serde(rename_all = "camelCase")]
    SetDeclaration {
        rule: Uid,
        name: String,
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
}

impl CssMutation {
    /// The object the mutation is addressed to
    pub fn target(&self) -> &Uid {
        match self {
            CssMutation::InsertRule { parent, .. }
            | CssMutation::RemoveRule { parent, .. }
            | CssMutation::MoveRule { parent, .. } => parent,
            CssMutation::SetDeclaration { rule, .. } => rule,
        }
    }

    pub fn is_structural(&self) -> bool {
        !matches!(self, CssMutation::SetDeclaration { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CssMutationError {
    #[error("rule not found: {0}")]
    RuleNotFound(Uid),

    #[error("{0} is not a grouping rule")]
    NotAGroupingRule(Uid),

    #[error("{0} has no declarations")]
    NotADeclarationRule(Uid),

    #[error("index {index} out of bounds for {len} rules")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("declaration index {index} out of bounds for {len} declarations")]
    DeclarationOutOfBounds { index: usize, len: usize },

    #[error("expected {expected} at index {index}, found {found}")]
    StaleTarget {
        expected: Uid,
        index: usize,
        found: Uid,
    },
}

pub type CssMutationResult<T> = Result<T, CssMutationError>;
