//! Shared vocabulary for the synthetic DOM and CSSOM crates: stable
//! identities, source provenance and transient (non-semantic) fields.

pub mod id;
pub mod source;
pub mod transient;

pub use id::{get_document_id, FreshIds, IdGenerator, SequentialIds, Uid};
pub use source::{SourceLocation, SourceRange};
pub use transient::Transient;
