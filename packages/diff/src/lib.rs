//! # Aerial Diff
//!
//! Ordered-sequence and mapping diffs used by the synthetic DOM and CSSOM,
//! plus the order-sensitive [`OrderedMap`] that attributes and declarations
//! live in.
//!
//! ## Index convention
//!
//! Every index in an [`ArrayDiff`] is valid against the sequence obtained by
//! replaying all preceding operations, in emission order:
//!
//! ```text
//! deletes (descending) → moves → inserts (ascending) → updates
//! ```
//!
//! `Move { from, to }` removes the item at `from` and re-inserts it at `to`
//! in the shortened sequence. `Update` never changes positions.
//!
//! ## Example
//!
//! ```
//! use aerial_diff::{diff_array, Score};
//!
//! let old = vec!["a", "b", "c"];
//! let new = vec!["c", "a", "b"];
//! let diff = diff_array(&old, &new, |a, b| (a == b).then_some(Score::EXACT));
//!
//! assert_eq!(diff.move_count(), 1);
//! assert_eq!(diff.replay(&old).unwrap(), new);
//! ```

mod array;
mod map;

pub use array::{diff_array, longest_increasing_subsequence, ArrayDiff, ArrayOp, ReplayError, Score};
pub use map::{diff_map, EntryEdit, EntryIndexError, MapChange, OrderedMap};
