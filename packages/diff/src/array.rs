//! Ordered-sequence diff with insert/delete/move/update discrimination.
//!
//! Items are paired through a caller-supplied correspondence function rather
//! than strict equality. Paired items that keep their relative order (a
//! longest increasing subsequence of old positions) stay put; every other
//! paired item is moved exactly once.

use thiserror::Error;
use tracing::trace;

/// Similarity of two corresponding items, always within `0.0..=1.0`.
///
/// A correspondence function returns `None` for "not the same logical item".
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Score(f64);

impl Score {
    /// Same logical item
    pub const EXACT: Score = Score(1.0);

    /// Clamp into `0.0..=1.0`; NaN counts as the weakest match
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Score(0.0)
        } else {
            Score(value.clamp(0.0, 1.0))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// A single array edit.
///
/// Indices follow the progressive convention documented at the crate root.
/// The `value` references point into the old or new input slice.
#[derive(Debug)]
pub enum ArrayOp<'a, T> {
    /// Remove the old item at `index`
    Delete { index: usize, value: &'a T },

    /// Remove the item at `from`, re-insert it at `to`
    Move {
        from: usize,
        to: usize,
        /// Position of the item in the old input
        original_index: usize,
        value: &'a T,
    },

    /// Insert a new item at `index`
    Insert { index: usize, value: &'a T },

    /// A paired item changed in place
    Update {
        /// Position in the old input
        old_index: usize,
        /// Position in the new input (and in the replayed sequence)
        index: usize,
        old_value: &'a T,
        new_value: &'a T,
    },
}

impl<T> Clone for ArrayOp<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArrayOp<'_, T> {}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("{op} at index {index} is out of bounds for length {len}")]
    OutOfBounds {
        op: &'static str,
        index: usize,
        len: usize,
    },
}

/// Ordered operation list produced by [`diff_array`]
#[derive(Debug)]
pub struct ArrayDiff<'a, T> {
    pub ops: Vec<ArrayOp<'a, T>>,
}

impl<'a, T> ArrayDiff<'a, T> {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArrayOp<'a, T>> {
        self.ops.iter()
    }

    pub fn insert_count(&self) -> usize {
        self.count(|op| matches!(op, ArrayOp::Insert { .. }))
    }

    pub fn delete_count(&self) -> usize {
        self.count(|op| matches!(op, ArrayOp::Delete { .. }))
    }

    pub fn move_count(&self) -> usize {
        self.count(|op| matches!(op, ArrayOp::Move { .. }))
    }

    pub fn update_count(&self) -> usize {
        self.count(|op| matches!(op, ArrayOp::Update { .. }))
    }

    fn count(&self, pred: impl Fn(&ArrayOp<'a, T>) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    /// Replay the operations against `old`, in order.
    pub fn replay(&self, old: &[T]) -> Result<Vec<T>, ReplayError>
    where
        T: Clone,
    {
        let mut items = old.to_vec();

        for op in &self.ops {
            match *op {
                ArrayOp::Delete { index, .. } => {
                    check_index("delete", index, items.len(), items.len())?;
                    items.remove(index);
                }
                ArrayOp::Move { from, to, .. } => {
                    check_index("move", from, items.len(), items.len())?;
                    let item = items.remove(from);
                    check_index("move", to, items.len() + 1, items.len())?;
                    items.insert(to, item);
                }
                ArrayOp::Insert { index, value } => {
                    check_index("insert", index, items.len() + 1, items.len())?;
                    items.insert(index, value.clone());
                }
                ArrayOp::Update {
                    index, new_value, ..
                } => {
                    check_index("update", index, items.len(), items.len())?;
                    items[index] = new_value.clone();
                }
            }
        }

        Ok(items)
    }
}

/// `index` must be below `bound`; `len` is what gets reported
fn check_index(op: &'static str, index: usize, bound: usize, len: usize) -> Result<(), ReplayError> {
    if index < bound {
        Ok(())
    } else {
        Err(ReplayError::OutOfBounds { op, index, len })
    }
}

/// Diff two ordered sequences.
///
/// `correspond(old, new)` decides whether two items are the same logical
/// item. Each new item, in order, is paired with the unpaired old item of
/// highest score; ties go to the old item closest to the new position, then
/// to the leftmost one.
pub fn diff_array<'a, T, F>(old: &'a [T], new: &'a [T], mut correspond: F) -> ArrayDiff<'a, T>
where
    T: PartialEq,
    F: FnMut(&T, &T) -> Option<Score>,
{
    if old == new {
        return ArrayDiff { ops: Vec::new() };
    }

    let old_for_new = pair_items(old, new, &mut correspond);
    let mut new_for_old: Vec<Option<usize>> = vec![None; old.len()];
    for (j, paired) in old_for_new.iter().enumerate() {
        if let Some(i) = *paired {
            new_for_old[i] = Some(j);
        }
    }

    let mut ops = Vec::new();

    // deletes, highest index first so each index is also the original one
    for i in (0..old.len()).rev() {
        if new_for_old[i].is_none() {
            ops.push(ArrayOp::Delete {
                index: i,
                value: &old[i],
            });
        }
    }

    // paired old indices, listed in new order
    let sequence: Vec<usize> = old_for_new.iter().filter_map(|paired| *paired).collect();
    let keep = longest_increasing_subsequence(&sequence);
    let mut stable = vec![false; old.len()];
    for (pos, &i) in sequence.iter().enumerate() {
        stable[i] = keep[pos];
    }

    // surviving old indices, in current order
    let mut working: Vec<usize> = (0..old.len()).filter(|&i| new_for_old[i].is_some()).collect();
    let mut predecessor: Option<usize> = None;
    for &i in &sequence {
        if !stable[i] {
            let from = position_of(&working, i);
            working.remove(from);
            let to = match predecessor {
                Some(prev) => position_of(&working, prev) + 1,
                None => 0,
            };
            working.insert(to, i);
            if from != to {
                ops.push(ArrayOp::Move {
                    from,
                    to,
                    original_index: i,
                    value: &old[i],
                });
            }
        }
        predecessor = Some(i);
    }

    for (j, paired) in old_for_new.iter().enumerate() {
        if paired.is_none() {
            ops.push(ArrayOp::Insert {
                index: j,
                value: &new[j],
            });
        }
    }

    for (j, paired) in old_for_new.iter().enumerate() {
        if let Some(i) = *paired {
            if old[i] != new[j] {
                ops.push(ArrayOp::Update {
                    old_index: i,
                    index: j,
                    old_value: &old[i],
                    new_value: &new[j],
                });
            }
        }
    }

    let diff = ArrayDiff { ops };
    trace!(
        old_len = old.len(),
        new_len = new.len(),
        deletes = diff.delete_count(),
        moves = diff.move_count(),
        inserts = diff.insert_count(),
        updates = diff.update_count(),
        "array diff"
    );
    diff
}

/// For each new item, the old item it corresponds to.
fn pair_items<T, F>(old: &[T], new: &[T], correspond: &mut F) -> Vec<Option<usize>>
where
    F: FnMut(&T, &T) -> Option<Score>,
{
    let mut used = vec![false; old.len()];
    let mut pairs = Vec::with_capacity(new.len());

    for (j, new_item) in new.iter().enumerate() {
        let mut best: Option<(usize, Score)> = None;

        for (i, old_item) in old.iter().enumerate() {
            if used[i] {
                continue;
            }
            let Some(score) = correspond(old_item, new_item) else {
                continue;
            };
            let better = match best {
                None => true,
                Some((best_i, best_score)) => {
                    score > best_score
                        || (score == best_score && i.abs_diff(j) < best_i.abs_diff(j))
                }
            };
            if better {
                best = Some((i, score));
            }
        }

        if let Some((i, _)) = best {
            used[i] = true;
        }
        pairs.push(best.map(|(i, _)| i));
    }

    pairs
}

fn position_of(items: &[usize], value: usize) -> usize {
    items
        .iter()
        .position(|&item| item == value)
        .unwrap_or(items.len())
}

/// Membership mask (by position) of one longest strictly increasing
/// subsequence.
pub fn longest_increasing_subsequence(seq: &[usize]) -> Vec<bool> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];

    for (pos, &value) in seq.iter().enumerate() {
        let k = tails.partition_point(|&t| seq[t] < value);
        if k > 0 {
            prev[pos] = Some(tails[k - 1]);
        }
        if k == tails.len() {
            tails.push(pos);
        } else {
            tails[k] = pos;
        }
    }

    let mut keep = vec![false; seq.len()];
    let mut cursor = tails.last().copied();
    while let Some(pos) = cursor {
        keep[pos] = true;
        cursor = prev[pos];
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(a: &char, b: &char) -> Option<Score> {
        (a == b).then_some(Score::EXACT)
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_empty_old_is_all_inserts() {
        let old = chars("");
        let new = chars("abc");
        let diff = diff_array(&old, &new, exact);

        assert_eq!(diff.len(), 3);
        assert_eq!(diff.insert_count(), 3);
        assert_eq!(diff.replay(&old).unwrap(), new);
    }

    #[test]
    fn test_empty_new_is_all_deletes() {
        let old = chars("abc");
        let new = chars("");
        let diff = diff_array(&old, &new, exact);

        assert_eq!(diff.delete_count(), 3);
        assert_eq!(diff.len(), 3);
        // highest index first
        assert!(matches!(diff.ops[0], ArrayOp::Delete { index: 2, .. }));
        assert!(diff.replay(&old).unwrap().is_empty());
    }

    #[test]
    fn test_identical_sequences_diff_to_nothing() {
        let old = chars("abcd");
        let same = old.clone();
        let diff = diff_array(&old, &same, exact);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_swap_is_one_move() {
        let old = chars("ac");
        let new = chars("ca");
        let diff = diff_array(&old, &new, exact);

        assert_eq!(diff.move_count(), 1);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.replay(&old).unwrap(), new);
    }

    #[test]
    fn test_rotation_moves_only_the_displaced_item() {
        let old = chars("abcd");
        let new = chars("bcda");
        let diff = diff_array(&old, &new, exact);

        assert_eq!(diff.move_count(), 1);
        assert_eq!(diff.insert_count() + diff.delete_count(), 0);
        match diff.ops[0] {
            ArrayOp::Move {
                from,
                to,
                original_index,
                ..
            } => {
                assert_eq!((from, to, original_index), (0, 3, 0));
            }
            _ => panic!("Expected Move"),
        }
        assert_eq!(diff.replay(&old).unwrap(), new);
    }

    #[test]
    fn test_reversal_moves_all_but_one() {
        let old = chars("abcd");
        let new = chars("dcba");
        let diff = diff_array(&old, &new, exact);

        assert_eq!(diff.move_count(), 3);
        assert_eq!(diff.len(), 3);
        assert_eq!(diff.replay(&old).unwrap(), new);
    }

    #[test]
    fn test_mixed_edit() {
        let old = chars("abcde");
        let new = chars("xdbaey");
        let diff = diff_array(&old, &new, exact);

        assert_eq!(diff.delete_count(), 1);
        assert_eq!(diff.insert_count(), 2);
        assert_eq!(diff.replay(&old).unwrap(), new);
    }

    #[test]
    fn test_update_for_corresponding_but_unequal_items() {
        let old = vec![("div", 1), ("span", 2)];
        let new = vec![("div", 1), ("span", 3)];
        let diff = diff_array(&old, &new, |a, b| (a.0 == b.0).then_some(Score::EXACT));

        assert_eq!(diff.len(), 1);
        match diff.ops[0] {
            ArrayOp::Update {
                old_index,
                index,
                new_value,
                ..
            } => {
                assert_eq!((old_index, index), (1, 1));
                assert_eq!(new_value.1, 3);
            }
            _ => panic!("Expected Update"),
        }
        assert_eq!(diff.replay(&old).unwrap(), new);
    }

    #[test]
    fn test_tie_break_prefers_closest_old_item() {
        // three identical keys; the new item at position 2 should pair with old 2
        let old = vec![("p", 0), ("p", 1), ("p", 2)];
        let new = vec![("q", 9), ("q", 8), ("p", 2)];
        let diff = diff_array(&old, &new, |a, b| (a.0 == b.0).then_some(Score::EXACT));

        assert_eq!(diff.move_count(), 0);
        assert_eq!(diff.update_count(), 0);
        assert_eq!(diff.delete_count(), 2);
        assert_eq!(diff.replay(&old).unwrap(), new);
    }

    #[test]
    fn test_tie_break_prefers_leftmost_at_equal_distance() {
        let old = vec![("p", 0), ("x", 1), ("p", 2)];
        let new = vec![("y", 0), ("p", 5)];
        let diff = diff_array(&old, &new, |a, b| (a.0 == b.0).then_some(Score::EXACT));

        // old 0 and old 2 are both one step from new 1; old 0 wins
        let updated = diff.iter().find_map(|op| match op {
            ArrayOp::Update { old_index, .. } => Some(*old_index),
            _ => None,
        });
        assert_eq!(updated, Some(0));
        assert_eq!(diff.replay(&old).unwrap(), new);
    }

    #[test]
    fn test_higher_score_wins_over_distance() {
        let old = vec![("a", 1), ("a", 2)];
        let new = vec![("a", 2)];
        let diff = diff_array(&old, &new, |a, b| {
            if a.0 != b.0 {
                None
            } else if a.1 == b.1 {
                Some(Score::EXACT)
            } else {
                Some(Score::new(0.5))
            }
        });

        assert_eq!(diff.len(), 1);
        assert!(matches!(diff.ops[0], ArrayOp::Delete { index: 0, .. }));
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(Score::new(4.0), Score::EXACT);
        assert_eq!(Score::new(-1.0).value(), 0.0);
        assert_eq!(Score::new(f64::NAN).value(), 0.0);
    }

    #[test]
    fn test_replay_reports_out_of_bounds() {
        let old = chars("ab");
        let new = chars("abc");
        let diff = diff_array(&old, &new, exact);

        let err = diff.replay(&chars("")).unwrap_err();
        assert!(matches!(err, ReplayError::OutOfBounds { op: "insert", .. }));
    }

    #[test]
    fn test_replay_reconstructs_pseudo_random_sequences() {
        // small LCG so the sequences are reproducible
        let mut state: u64 = 0x2545_f491;
        let mut next = move |bound: u64| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) % bound
        };

        for _ in 0..200 {
            let old: Vec<u64> = (0..next(8)).map(|_| next(6)).collect();
            let new: Vec<u64> = (0..next(8)).map(|_| next(6)).collect();
            let diff = diff_array(&old, &new, |a, b| (a == b).then_some(Score::EXACT));
            assert_eq!(diff.replay(&old).unwrap(), new, "{:?} -> {:?}", old, new);
        }
    }

    #[test]
    fn test_move_count_is_minimal_for_permutations() {
        let cases = [("abcde", "eabcd", 1), ("abcde", "badce", 2), ("abc", "abc", 0)];
        for (from, to, moves) in cases {
            let old = chars(from);
            let new = chars(to);
            let diff = diff_array(&old, &new, exact);
            assert_eq!(diff.move_count(), moves, "{} -> {}", from, to);
            assert_eq!(diff.len(), moves);
        }
    }

    #[test]
    fn test_lis_mask() {
        let keep = longest_increasing_subsequence(&[3, 0, 1, 4, 2]);
        let kept: Vec<usize> = [3, 0, 1, 4, 2]
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(v, _)| *v)
            .collect();
        assert_eq!(kept.len(), 3);
        assert!(kept.windows(2).all(|w| w[0] < w[1]));
    }
}
