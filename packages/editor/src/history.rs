//! # Undo/Redo History
//!
//! Records every batch applied to a [`LiveTree`] together with the inverses
//! the applier returned for it.
//!
//! - Undo applies the inverses and keeps what *that* application returned
//!   as the redo batch, so redo restores the exact identities undo removed
//! - Redo does the same in the other direction
//! - New batches clear the redo stack
//! - Mutations applied between `begin_batch` and `end_batch` undo together

use crate::errors::{EditorError, EditorResult};
use aerial_dom::{AppliedBatch, LiveTree, Mutation, SyntheticNode};
use tracing::{debug, info};

/// A group of mutations that are undone/redone together
#[derive(Debug, Clone, PartialEq)]
pub struct MutationBatch {
    /// The mutations in this batch (in application order)
    pub mutations: Vec<Mutation>,

    /// The inverse mutations (in reverse order for undo)
    pub inverses: Vec<Mutation>,

    pub description: Option<String>,
}

impl MutationBatch {
    fn new(description: Option<String>) -> Self {
        Self {
            mutations: Vec::new(),
            inverses: Vec::new(),
            description,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    fn from_applied(applied: AppliedBatch, description: Option<String>) -> Self {
        Self {
            mutations: applied.mutations,
            inverses: applied.inverses,
            description,
        }
    }

    fn extend(&mut self, applied: AppliedBatch) {
        self.mutations.extend(applied.mutations);
        let mut inverses = applied.inverses;
        inverses.append(&mut self.inverses);
        self.inverses = inverses;
    }
}

#[derive(Debug)]
pub struct History {
    /// Applied batches (most recent last)
    undo_stack: Vec<MutationBatch>,

    /// Undone batches (most recent last)
    redo_stack: Vec<MutationBatch>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    current_batch: Option<MutationBatch>,
}

impl History {
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    /// Apply `mutations` to the tree and record what changed
    pub fn apply(&mut self, tree: &mut LiveTree, mutations: &[Mutation]) -> EditorResult<AppliedBatch> {
        let applied = tree.apply(mutations)?;
        self.record(applied.clone());
        Ok(applied)
    }

    /// Bring the tree to `new` and record the resulting batch. Replacing the
    /// root wholesale cannot be undone, so it clears the history.
    pub fn sync(&mut self, tree: &mut LiveTree, new: &SyntheticNode) -> EditorResult<AppliedBatch> {
        let applied = tree.sync_to(new)?;
        if applied.root_replaced {
            info!("root replaced, clearing history");
            self.clear();
        } else {
            self.record(applied.clone());
        }
        Ok(applied)
    }

    /// Record a batch that was applied elsewhere
    pub fn record(&mut self, applied: AppliedBatch) {
        if applied.mutations.is_empty() {
            return;
        }

        match &mut self.current_batch {
            Some(batch) => batch.extend(applied),
            None => self.push_batch(MutationBatch::from_applied(applied, None)),
        }
    }

    pub fn begin_batch(&mut self, description: Option<String>) {
        self.current_batch = Some(MutationBatch::new(description));
    }

    pub fn end_batch(&mut self) {
        if let Some(batch) = self.current_batch.take() {
            if !batch.is_empty() {
                self.push_batch(batch);
            }
        }
    }

    fn push_batch(&mut self, batch: MutationBatch) {
        debug!(mutations = batch.mutations.len(), description = ?batch.description, "recording batch");
        self.undo_stack.push(batch);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
    }

    /// Undo the most recent batch. A batch that fails to undo stays on the
    /// undo stack.
    pub fn undo(&mut self, tree: &mut LiveTree) -> EditorResult<AppliedBatch> {
        self.end_batch();
        let batch = self.undo_stack.pop().ok_or(EditorError::NothingToUndo)?;

        match tree.apply(&batch.inverses) {
            Ok(applied) => {
                debug!(mutations = applied.mutations.len(), "undone");
                self.redo_stack
                    .push(MutationBatch::from_applied(applied.clone(), batch.description));
                Ok(applied)
            }
            Err(err) => {
                self.undo_stack.push(batch);
                Err(err.into())
            }
        }
    }

    pub fn redo(&mut self, tree: &mut LiveTree) -> EditorResult<AppliedBatch> {
        let batch = self.redo_stack.pop().ok_or(EditorError::NothingToRedo)?;

        match tree.apply(&batch.inverses) {
            Ok(applied) => {
                debug!(mutations = applied.mutations.len(), "redone");
                self.undo_stack
                    .push(MutationBatch::from_applied(applied.clone(), batch.description));
                Ok(applied)
            }
            Err(err) => {
                self.redo_stack.push(batch);
                Err(err.into())
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerial_common::{SequentialIds, Uid};

    fn setup() -> (LiveTree, History, SequentialIds) {
        let mut ids = SequentialIds::from_seed("doc");
        let root = SyntheticNode::element(&mut ids, "div")
            .with_attribute("class", "card")
            .with_child(SyntheticNode::text(&mut ids, "Hello"));
        (
            LiveTree::new(root, SequentialIds::from_seed("live")),
            History::new(),
            ids,
        )
    }

    fn set_text(tree: &LiveTree, value: &str) -> Mutation {
        Mutation::SetTextContent {
            node: tree.root().children().unwrap()[0].id.clone(),
            value: value.into(),
        }
    }

    #[test]
    fn test_history_creation() {
        let history = History::new();
        assert_eq!(history.undo_levels(), 0);
        assert_eq!(history.redo_levels(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_apply_undo_redo() {
        let (mut tree, mut history, _) = setup();
        let mutation = set_text(&tree, "World");

        history.apply(&mut tree, &[mutation]).unwrap();
        assert_eq!(tree.root().text_content(), "World");
        assert!(history.can_undo());

        history.undo(&mut tree).unwrap();
        assert_eq!(tree.root().text_content(), "Hello");
        assert_eq!(history.undo_levels(), 0);
        assert_eq!(history.redo_levels(), 1);

        history.redo(&mut tree).unwrap();
        assert_eq!(tree.root().text_content(), "World");
        assert_eq!(history.undo_levels(), 1);
        assert_eq!(history.redo_levels(), 0);
    }

    #[test]
    fn test_no_op_is_not_recorded() {
        let (mut tree, mut history, _) = setup();
        let mutation = set_text(&tree, "Hello");
        history.apply(&mut tree, &[mutation]).unwrap();
        assert!(!history.can_undo());
    }

    #[test]
    fn test_batched_mutations() {
        let (mut tree, mut history, _) = setup();

        history.begin_batch(Some("Update greeting".into()));
        let first = set_text(&tree, "World");
        history.apply(&mut tree, &[first]).unwrap();
        let second = set_text(&tree, "Everyone!");
        history.apply(&mut tree, &[second]).unwrap();
        history.end_batch();

        assert_eq!(history.undo_levels(), 1);
        assert_eq!(history.undo_description(), Some("Update greeting"));

        history.undo(&mut tree).unwrap();
        assert_eq!(tree.root().text_content(), "Hello");
        assert_eq!(history.redo_description(), Some("Update greeting"));
    }

    #[test]
    fn test_new_mutation_clears_redo() {
        let (mut tree, mut history, _) = setup();
        let first = set_text(&tree, "World");
        history.apply(&mut tree, &[first]).unwrap();
        history.undo(&mut tree).unwrap();
        assert_eq!(history.redo_levels(), 1);

        let second = set_text(&tree, "Everyone");
        history.apply(&mut tree, &[second]).unwrap();
        assert_eq!(history.redo_levels(), 0);
    }

    #[test]
    fn test_max_levels_enforced() {
        let (mut tree, _, _) = setup();
        let mut history = History::with_max_levels(2);

        for i in 0..3 {
            let mutation = set_text(&tree, &format!("Text {}", i));
            history.apply(&mut tree, &[mutation]).unwrap();
        }

        assert_eq!(history.undo_levels(), 2);
        history.undo(&mut tree).unwrap();
        history.undo(&mut tree).unwrap();
        assert_eq!(tree.root().text_content(), "Text 0");
        assert!(matches!(history.undo(&mut tree), Err(EditorError::NothingToUndo)));
    }

    #[test]
    fn test_undo_sync_restores_identities() {
        let (mut tree, mut history, mut ids) = setup();
        let before = tree.root().clone();
        let target = SyntheticNode::element(&mut ids, "div")
            .with_attribute("class", "card wide")
            .with_child(SyntheticNode::element(&mut ids, "h1").with_child(SyntheticNode::text(&mut ids, "Title")))
            .with_child(SyntheticNode::text(&mut ids, "Hello"));

        history.sync(&mut tree, &target).unwrap();
        assert!(tree.root().same_structure(&target));
        let heading: Uid = tree.root().children().unwrap()[0].id.clone();

        history.undo(&mut tree).unwrap();
        assert_eq!(tree.root(), &before);
        assert!(tree.root().find(&heading).is_none());

        history.redo(&mut tree).unwrap();
        assert!(tree.root().same_structure(&target));
        assert_eq!(tree.root().children().unwrap()[0].id, heading);
    }

    #[test]
    fn test_root_replacement_clears_history() {
        let (mut tree, mut history, mut ids) = setup();
        let mutation = set_text(&tree, "World");
        history.apply(&mut tree, &[mutation]).unwrap();

        let applied = history.sync(&mut tree, &SyntheticNode::comment(&mut ids, "gone")).unwrap();
        assert!(applied.root_replaced);
        assert!(!history.can_undo());
    }
}
