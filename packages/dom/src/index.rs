//! Identity → position cache for a live tree.
//!
//! Paths are child-index chains from the root. After a structural mutation
//! the patcher re-walks only the edited parent's subtree; anything else that
//! moves nodes around invalidates the index and the next lookup rebuilds it.

use crate::node::SyntheticNode;
use crate::visitor::{walk_node, Visitor};
use aerial_common::Uid;
use std::collections::HashMap;
use tracing::trace;

#[derive(Debug, Default, Clone)]
pub struct NodeIndex {
    paths: HashMap<Uid, Vec<usize>>,
    fresh: bool,
}

impl NodeIndex {
    /// An empty index; the first lookup builds it
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(root: &SyntheticNode) -> Self {
        let mut builder = PathBuilder::default();
        builder.visit_node(root);
        trace!(nodes = builder.paths.len(), "built node index");

        Self {
            paths: builder.paths,
            fresh: true,
        }
    }

    pub fn invalidate(&mut self) {
        self.fresh = false;
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Drop the paths of a detached subtree
    pub fn forget(&mut self, node: &SyntheticNode) {
        let mut forgetter = Forgetter { paths: &mut self.paths };
        forgetter.visit_node(node);
    }

    /// Recompute the paths below `parent` after its child list changed.
    /// A stale index stays stale.
    pub fn reindex_children(&mut self, root: &SyntheticNode, parent: &Uid) {
        if !self.fresh {
            return;
        }

        let Some(path) = self.paths.get(parent).cloned() else {
            self.fresh = false;
            return;
        };
        let Some(node) = node_at(root, &path).filter(|node| node.id == *parent) else {
            self.fresh = false;
            return;
        };

        let mut builder = PathBuilder {
            paths: std::mem::take(&mut self.paths),
            path,
        };
        builder.visit_node(node);
        self.paths = builder.paths;
    }

    /// Rebuild if stale
    pub fn refresh(&mut self, root: &SyntheticNode) {
        if !self.fresh {
            *self = Self::build(root);
        }
    }

    /// Whether `id` is live in `root`
    pub fn contains(&mut self, root: &SyntheticNode, id: &Uid) -> bool {
        self.refresh(root);
        self.paths.contains_key(id)
    }

    pub fn path(&mut self, root: &SyntheticNode, id: &Uid) -> Option<Vec<usize>> {
        self.refresh(root);
        self.paths.get(id).cloned()
    }

    pub fn get<'a>(&mut self, root: &'a SyntheticNode, id: &Uid) -> Option<&'a SyntheticNode> {
        let path = self.path(root, id)?;
        node_at(root, &path).filter(|node| node.id == *id)
    }

    pub fn get_mut<'a>(&mut self, root: &'a mut SyntheticNode, id: &Uid) -> Option<&'a mut SyntheticNode> {
        let path = self.path(root, id)?;
        node_at_mut(root, &path).filter(|node| node.id == *id)
    }
}

fn node_at<'a>(root: &'a SyntheticNode, path: &[usize]) -> Option<&'a SyntheticNode> {
    path.iter()
        .try_fold(root, |node, &i| node.children().and_then(|children| children.get(i)))
}

fn node_at_mut<'a>(root: &'a mut SyntheticNode, path: &[usize]) -> Option<&'a mut SyntheticNode> {
    let mut node = root;
    for &i in path {
        node = node.children_mut()?.get_mut(i)?;
    }
    Some(node)
}

#[derive(Default)]
struct PathBuilder {
    paths: HashMap<Uid, Vec<usize>>,
    path: Vec<usize>,
}

impl Visitor for PathBuilder {
    fn visit_node(&mut self, node: &SyntheticNode) {
        self.paths.insert(node.id.clone(), self.path.clone());
        if let Some(children) = node.children() {
            for (i, child) in children.iter().enumerate() {
                self.path.push(i);
                self.visit_node(child);
                self.path.pop();
            }
        }
    }
}

struct Forgetter<'a> {
    paths: &'a mut HashMap<Uid, Vec<usize>>,
}

impl Visitor for Forgetter<'_> {
    fn visit_node(&mut self, node: &SyntheticNode) {
        self.paths.remove(&node.id);
        walk_node(self, node);
    }
}
