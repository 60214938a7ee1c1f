//! # Live Tree
//!
//! A synthetic tree that is edited only through mutations: programmatic
//! edits and `sync_to` both go through the patch applier, so every change
//! fires a [`MutationEvent`] and yields its inverse.
//!
//! A batch applied under [`PatchPolicy::Abort`] is atomic here: when a
//! mutation fails, the mutations already applied are reverted before the
//! error is returned.

use crate::differ::{diff_node, nodes_correspond};
use crate::errors::{MutationError, MutationResult, PatchError};
use crate::events::{ListenerId, MutationDispatcher, MutationEvent};
use crate::index::NodeIndex;
use crate::mutation::Mutation;
use crate::node::SyntheticNode;
use crate::patch::{apply_mutation_indexed, apply_mutations_with, PatchPolicy, PatchReport};
use aerial_common::{IdGenerator, Uid};
use tracing::{debug, error, info, instrument};

/// What a batch did to a live tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppliedBatch {
    pub report: PatchReport,
    /// Mutations that changed the tree, in application order
    pub mutations: Vec<Mutation>,
    /// Their inverses, in undo order (last applied first)
    pub inverses: Vec<Mutation>,
    /// The root was swapped wholesale because the new root did not correspond
    pub root_replaced: bool,
}

impl AppliedBatch {
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty() && !self.root_replaced
    }
}

pub struct LiveTree {
    root: SyntheticNode,
    ids: Box<dyn IdGenerator + Send>,
    index: NodeIndex,
    dispatcher: MutationDispatcher,
    policy: PatchPolicy,
}

impl LiveTree {
    pub fn new(root: SyntheticNode, ids: impl IdGenerator + Send + 'static) -> Self {
        Self {
            root,
            ids: Box::new(ids),
            index: NodeIndex::new(),
            dispatcher: MutationDispatcher::new(),
            policy: PatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> PatchPolicy {
        self.policy
    }

    pub fn root(&self) -> &SyntheticNode {
        &self.root
    }

    pub fn into_root(self) -> SyntheticNode {
        self.root
    }

    pub fn get(&mut self, id: &Uid) -> Option<&SyntheticNode> {
        self.index.get(&self.root, id)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&MutationEvent) + Send + 'static) -> ListenerId {
        self.dispatcher.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    /// Apply a batch under the tree's policy, firing one event per change
    pub fn apply(&mut self, mutations: &[Mutation]) -> Result<AppliedBatch, PatchError> {
        let mut applied = Vec::new();
        let mut inverses = Vec::new();
        let dispatcher = &mut self.dispatcher;

        let result = apply_mutations_with(
            &mut self.root,
            mutations,
            self.ids.as_mut(),
            self.policy,
            &mut self.index,
            |mutation, inverse| {
                dispatcher.dispatch(&MutationEvent::new(mutation.clone()));
                applied.push(mutation.clone());
                inverses.push(inverse);
            },
        );

        inverses.reverse();
        match result {
            Ok(report) => Ok(AppliedBatch {
                report,
                mutations: applied,
                inverses,
                root_replaced: false,
            }),
            Err(err) => {
                self.revert(&inverses);
                Err(err)
            }
        }
    }

    /// Diff against `new` and apply the result. A root that does not
    /// correspond to `new` is replaced wholesale.
    #[instrument(skip_all, fields(root = %self.root.id))]
    pub fn sync_to(&mut self, new: &SyntheticNode) -> Result<AppliedBatch, PatchError> {
        if nodes_correspond(&self.root, new).is_none() {
            info!(old = self.root.node_name(), new = new.node_name(), "replacing root");
            self.root = new.clone();
            self.index.invalidate();
            return Ok(AppliedBatch {
                root_replaced: true,
                ..AppliedBatch::default()
            });
        }

        let mutations = diff_node(&self.root, new);
        debug!(mutations = mutations.len(), "syncing live tree");
        self.apply(&mutations)
    }

    /// Insert `child` at `index`; returns the id it was inserted under
    pub fn insert_child(&mut self, parent: &Uid, index: usize, child: SyntheticNode) -> MutationResult<Uid> {
        let inverse = self.apply_one(Mutation::InsertChild {
            parent: parent.clone(),
            index,
            child,
        })?;

        match inverse {
            Some(Mutation::RemoveChild { child, .. }) => Ok(child),
            _ => Err(MutationError::NodeNotFound(parent.clone())),
        }
    }

    pub fn append_child(&mut self, parent: &Uid, child: SyntheticNode) -> MutationResult<Uid> {
        let len = self.children_of(parent)?.len();
        self.insert_child(parent, len, child)
    }

    /// Remove `child` from `parent`; returns the detached subtree
    pub fn remove_child(&mut self, parent: &Uid, child: &Uid) -> MutationResult<SyntheticNode> {
        let index = self.position_of(parent, child)?;
        let inverse = self.apply_one(Mutation::RemoveChild {
            parent: parent.clone(),
            child: child.clone(),
            index,
        })?;

        match inverse {
            Some(Mutation::InsertChild { child, .. }) => Ok(child),
            _ => Err(MutationError::NodeNotFound(child.clone())),
        }
    }

    /// Swap `old_child` for `new_child` at the same position
    pub fn replace_child(
        &mut self,
        parent: &Uid,
        old_child: &Uid,
        new_child: SyntheticNode,
    ) -> MutationResult<Uid> {
        let index = self.position_of(parent, old_child)?;
        self.remove_child(parent, old_child)?;
        self.insert_child(parent, index, new_child)
    }

    pub fn move_child(&mut self, parent: &Uid, child: &Uid, new_index: usize) -> MutationResult<()> {
        let old_index = self.position_of(parent, child)?;
        self.apply_one(Mutation::MoveChild {
            parent: parent.clone(),
            child: child.clone(),
            old_index,
            new_index,
        })?;
        Ok(())
    }

    pub fn set_attribute(
        &mut self,
        element: &Uid,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> MutationResult<()> {
        self.apply_one(Mutation::SetAttribute {
            element: element.clone(),
            name: name.into(),
            value: Some(value.into()),
            index: None,
        })?;
        Ok(())
    }

    pub fn remove_attribute(&mut self, element: &Uid, name: impl Into<String>) -> MutationResult<()> {
        self.apply_one(Mutation::SetAttribute {
            element: element.clone(),
            name: name.into(),
            value: None,
            index: None,
        })?;
        Ok(())
    }

    pub fn set_text_content(&mut self, node: &Uid, value: impl Into<String>) -> MutationResult<()> {
        self.apply_one(Mutation::SetTextContent {
            node: node.clone(),
            value: value.into(),
        })?;
        Ok(())
    }

    fn apply_one(&mut self, mutation: Mutation) -> MutationResult<Option<Mutation>> {
        let inverse = apply_mutation_indexed(&mut self.root, &mutation, self.ids.as_mut(), &mut self.index)?;
        if inverse.is_some() {
            self.dispatcher.dispatch(&MutationEvent::new(mutation));
        }
        Ok(inverse)
    }

    fn children_of(&mut self, parent: &Uid) -> MutationResult<&Vec<SyntheticNode>> {
        self.index
            .get(&self.root, parent)
            .ok_or_else(|| MutationError::NodeNotFound(parent.clone()))?
            .children()
            .ok_or_else(|| MutationError::NotAParent(parent.clone()))
    }

    fn position_of(&mut self, parent: &Uid, child: &Uid) -> MutationResult<usize> {
        self.children_of(parent)?
            .iter()
            .position(|node| node.id == *child)
            .ok_or_else(|| MutationError::NodeNotFound(child.clone()))
    }

    fn revert(&mut self, inverses: &[Mutation]) {
        for inverse in inverses {
            if let Err(err) = self.apply_one(inverse.clone()) {
                error!(%err, kind = inverse.kind_name(), "failed to revert mutation");
            }
        }
    }
}

impl std::fmt::Debug for LiveTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveTree")
            .field("root", &self.root.id)
            .field("policy", &self.policy)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
