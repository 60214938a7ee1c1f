use aerial_common::Uid;
use aerial_css::CssMutationError;
use thiserror::Error;

/// A single mutation could not be applied
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("node not found: {0}")]
    NodeNotFound(Uid),

    #[error("{0} cannot have children")]
    NotAParent(Uid),

    #[error("{0} is not an element")]
    NotAnElement(Uid),

    #[error("{0} is not a text or comment node")]
    NotAValueNode(Uid),

    #[error("index {index} out of bounds for {len} children")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("attribute index {index} out of bounds for {len} attributes")]
    AttributeOutOfBounds { index: usize, len: usize },

    #[error("expected {expected} at index {index}, found {found}")]
    StaleTarget {
        expected: Uid,
        index: usize,
        found: Uid,
    },

    #[error("{0} does not own a style sheet")]
    NoStyleSheet(Uid),

    #[error("style sheet: {0}")]
    Css(#[from] CssMutationError),
}

pub type MutationResult<T> = Result<T, MutationError>;

/// A batch stopped at a failing mutation
#[derive(Error, Debug, Clone, PartialEq)]
#[error("mutation {index} failed after {applied} applied: {source}")]
pub struct PatchError {
    /// Position of the failing mutation in the batch
    pub index: usize,
    /// Mutations applied before it
    pub applied: usize,
    #[source]
    pub source: MutationError,
}
