//! Ordered key/value mappings (attributes, declarations) and their diff.

use crate::array::{diff_array, ArrayOp, Score};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};
use thiserror::Error;

/// Insertion-ordered map that compares entry by entry, in order.
///
/// Serializes as a plain JSON object. Derefs to [`IndexMap`] for lookups and
/// iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
#[serde(bound(
    serialize = "K: Serialize, V: Serialize",
    deserialize = "K: Deserialize<'de> + Hash + Eq, V: Deserialize<'de>"
))]
pub struct OrderedMap<K, V>(IndexMap<K, V>);

/// An owned entry edit, as carried by attribute and declaration mutations.
///
/// `value: None` removes the key. `index`, when set, is the position the
/// entry ends up at; otherwise an existing entry keeps its place and a new
/// one is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryEdit<V> {
    pub value: Option<V>,
    pub index: Option<usize>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("entry index {index} out of bounds for length {len}")]
pub struct EntryIndexError {
    pub index: usize,
    pub len: usize,
}

impl<K, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn into_inner(self) -> IndexMap<K, V> {
        self.0
    }
}

impl<K, V> OrderedMap<K, V>
where
    K: Hash + Eq + Clone,
    V: PartialEq + Clone,
{
    /// Apply one edit in place and return the edit that undoes it, or `None`
    /// if the map already matched.
    pub fn set_entry(&mut self, key: &K, edit: &EntryEdit<V>) -> Result<Option<EntryEdit<V>>, EntryIndexError> {
        let len = self.0.len();
        let Some(value) = &edit.value else {
            return Ok(self.0.shift_remove_full(key).map(|(at, _, previous)| EntryEdit {
                value: Some(previous),
                index: Some(at),
            }));
        };

        match self.0.get_index_of(key) {
            Some(at) => {
                let to = edit.index.unwrap_or(at);
                if to >= len {
                    return Err(EntryIndexError { index: to, len });
                }
                if self.0[at] == *value && to == at {
                    return Ok(None);
                }
                let previous = std::mem::replace(&mut self.0[at], value.clone());
                self.0.move_index(at, to);
                Ok(Some(EntryEdit {
                    value: Some(previous),
                    index: (to != at).then_some(at),
                }))
            }
            None => {
                let to = edit.index.unwrap_or(len);
                if to > len {
                    return Err(EntryIndexError { index: to, len });
                }
                self.0.shift_insert(to, key.clone(), value.clone());
                Ok(Some(EntryEdit {
                    value: None,
                    index: None,
                }))
            }
        }
    }
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Deref for OrderedMap<K, V> {
    type Target = IndexMap<K, V>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K, V> DerefMut for OrderedMap<K, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for OrderedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().eq(other.0.iter())
    }
}

impl<K: Eq, V: Eq> Eq for OrderedMap<K, V> {}

impl<K, V> From<IndexMap<K, V>> for OrderedMap<K, V> {
    fn from(map: IndexMap<K, V>) -> Self {
        Self(map)
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(IndexMap::from_iter(iter))
    }
}

impl<K: Hash + Eq, V> Extend<(K, V)> for OrderedMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a, K, V> IntoIterator for &'a OrderedMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = indexmap::map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K, V> IntoIterator for OrderedMap<K, V> {
    type Item = (K, V);
    type IntoIter = indexmap::map::IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A single mapping change
#[derive(Debug, Clone, PartialEq)]
pub enum MapChange<'a, K, V> {
    /// Set the key's value; with `index`, also place the entry there
    Set {
        key: &'a K,
        value: &'a V,
        index: Option<usize>,
    },

    /// Drop the key
    Remove { key: &'a K },
}

impl<'a, K, V> MapChange<'a, K, V> {
    pub fn key(&self) -> &'a K {
        match self {
            MapChange::Set { key, .. } | MapChange::Remove { key } => key,
        }
    }

    pub fn to_edit(&self) -> EntryEdit<V>
    where
        V: Clone,
    {
        match self {
            MapChange::Set { value, index, .. } => EntryEdit {
                value: Some((*value).clone()),
                index: *index,
            },
            MapChange::Remove { .. } => EntryEdit {
                value: None,
                index: None,
            },
        }
    }
}

/// Positional diff of two ordered maps.
///
/// Entries are paired by key and diffed as a sequence. Removals come first,
/// then sets that place moved or added keys (indices follow the progressive
/// convention), then in-place value changes. Applying the changes in order
/// with [`OrderedMap::set_entry`] reproduces `new`, order included.
pub fn diff_map<'a, K, V>(old: &'a OrderedMap<K, V>, new: &'a OrderedMap<K, V>) -> Vec<MapChange<'a, K, V>>
where
    K: Hash + Eq,
    V: PartialEq,
{
    let old_entries: Vec<(&'a K, &'a V)> = old.iter().collect();
    let new_entries: Vec<(&'a K, &'a V)> = new.iter().collect();
    let diff = diff_array(&old_entries, &new_entries, |a, b| (a.0 == b.0).then_some(Score::EXACT));

    let mut placed: HashSet<&'a K> = HashSet::new();
    let mut changes = Vec::with_capacity(diff.len());
    for op in diff.iter() {
        match *op {
            ArrayOp::Delete { value: &(key, _), .. } => changes.push(MapChange::Remove { key }),
            ArrayOp::Move { to, value: &(key, _), .. } => {
                // a moved entry carries its new value along
                if let Some(value) = new.get(key) {
                    placed.insert(key);
                    changes.push(MapChange::Set {
                        key,
                        value,
                        index: Some(to),
                    });
                }
            }
            ArrayOp::Insert {
                index,
                value: &(key, value),
            } => changes.push(MapChange::Set {
                key,
                value,
                index: Some(index),
            }),
            ArrayOp::Update {
                new_value: &(key, value),
                ..
            } => {
                if !placed.contains(&key) {
                    changes.push(MapChange::Set {
                        key,
                        value,
                        index: None,
                    });
                }
            }
        }
    }

    changes
}
