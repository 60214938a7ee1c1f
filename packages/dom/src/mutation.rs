//! DOM mutations: serializable edits addressed by stable identity.

use crate::node::SyntheticNode;
use aerial_common::Uid;
use aerial_css::CssMutation;
use serde::{Deserialize, Serialize};

/// One edit to a synthetic tree.
///
/// Child-list indices follow the progressive convention of `aerial_diff`:
/// each is valid against the tree produced by every earlier mutation of the
/// batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mutation {
    /// Insert `child` into `parent`'s children at `index`
    #[serde(rename_all = "camelCase")]
    InsertChild {
        parent: Uid,
        index: usize,
        child: SyntheticNode,
    },

    /// Remove the child at `index`, which must be `child`
    #[serde(rename_all = "camelCase")]
    RemoveChild { parent: Uid, child: Uid, index: usize },

    /// Remove `child` from `old_index`, re-insert it at `new_index`
    #[serde(rename_all = "camelCase")]
    MoveChild {
        parent: Uid,
        child: Uid,
        old_index: usize,
        new_index: usize,
    },

    /// `value: None` removes the attribute; `index`, when set, is where the
    /// attribute ends up
    #[serde(rename_all = "camelCase")]
    SetAttribute {
        element: Uid,
        name: String,
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },

    /// Replace the `nodeValue` of a text or comment node
    #[serde(rename_all = "camelCase")]
    SetTextContent { node: Uid, value: String },

    /// Edit the style sheet owned by `element`
    #[serde(rename_all = "camelCase")]
    StyleSheet { element: Uid, mutation: CssMutation },
}

impl Mutation {
    /// The node the mutation is dispatched on
    pub fn target(&self) -> &Uid {
        match self {
            Mutation::InsertChild { parent, .. }
            | Mutation::RemoveChild { parent, .. }
            | Mutation::MoveChild { parent, .. } => parent,
            Mutation::SetAttribute { element, .. } | Mutation::StyleSheet { element, .. } => element,
            Mutation::SetTextContent { node, .. } => node,
        }
    }

    /// Changes the shape of a child list
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Mutation::InsertChild { .. } | Mutation::RemoveChild { .. } | Mutation::MoveChild { .. }
        )
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Mutation::InsertChild { .. } => "insert-child",
            Mutation::RemoveChild { .. } => "remove-child",
            Mutation::MoveChild { .. } => "move-child",
            Mutation::SetAttribute { .. } => "set-attribute",
            Mutation::SetTextContent { .. } => "set-text-content",
            Mutation::StyleSheet { .. } => "style-sheet",
        }
    }
}
