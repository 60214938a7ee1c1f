//! # Aerial DOM
//!
//! Synthetic DOM trees with stable identities, the diff that turns one tree
//! into another as an ordered list of [`Mutation`]s, and the applier that
//! replays them on a live tree.
//!
//! ```
//! use aerial_common::SequentialIds;
//! use aerial_dom::{apply_mutations, diff_node, to_html, PatchPolicy, SyntheticNode};
//!
//! let mut ids = SequentialIds::new("file:///index.html");
//! let mut old = SyntheticNode::element(&mut ids, "span");
//! let new = SyntheticNode::element(&mut ids, "span")
//!     .with_child(SyntheticNode::text(&mut ids, "a"));
//!
//! let mutations = diff_node(&old, &new);
//! assert_eq!(mutations.len(), 1);
//!
//! apply_mutations(&mut old, &mutations, &mut ids, PatchPolicy::Abort).unwrap();
//! assert_eq!(to_html(&old), "<span>a</span>");
//! ```

pub mod differ;
pub mod errors;
pub mod events;
pub mod index;
pub mod live;
pub mod mutation;
pub mod node;
pub mod patch;
pub mod serializer;
pub mod visitor;

pub use differ::{diff_node, nodes_correspond};
pub use errors::{MutationError, MutationResult, PatchError};
pub use events::{ListenerId, MutationDispatcher, MutationEvent};
pub use index::NodeIndex;
pub use live::{AppliedBatch, LiveTree};
pub use mutation::Mutation;
pub use node::{Element, Layout, NodeKind, NodeType, Rect, SyntheticNode};
pub use patch::{
    apply_mutation, apply_mutation_indexed, apply_mutations, apply_mutations_with, PatchPolicy,
    PatchReport, SkippedMutation,
};
pub use serializer::{annotate_sources, escape_attribute, escape_text, is_void_element, open_tag, to_html};
pub use visitor::{walk_element, walk_node, Visitor};
