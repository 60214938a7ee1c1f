//! # Aerial Editor
//!
//! The collaborators that sit around a live synthetic tree:
//!
//! - [`projection`] turns mutation batches into text edits on the files the
//!   tree was rendered from
//! - [`history`] records applied batches for undo/redo
//! - [`mirror`] keeps a proxy tree in step with snapshots of a source tree

pub mod errors;
pub mod history;
pub mod mirror;
pub mod projection;

pub use errors::{EditorError, EditorResult};
pub use history::{History, MutationBatch};
#[cfg(feature = "async")]
pub use mirror::{spawn_mirror, MirrorHandle};
pub use mirror::{Mirror, MirrorReport};
pub use projection::{
    apply_text_edits, project_diff, project_mutations, Projection, ProjectionWarning, TextEdit,
};
