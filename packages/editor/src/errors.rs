use aerial_dom::{MutationError, PatchError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("mutation failed: {0}")]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("mirror task has stopped")]
    MirrorClosed,

    #[error("text edit {start}..{end} does not fit a source of {len} bytes")]
    EditOutOfBounds { start: usize, end: usize, len: usize },
}

pub type EditorResult<T> = Result<T, EditorError>;
