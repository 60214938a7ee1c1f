use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Stable identity of a synthetic node or CSS object.
///
/// Assigned once at creation and carried unchanged through clones and
/// in-place patches. Structural replacement gets a fresh one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Source of fresh identities, scoped to a session or document.
pub trait IdGenerator {
    fn next_id(&mut self) -> Uid;
}

impl<F: FnMut() -> Uid> IdGenerator for F {
    fn next_id(&mut self) -> Uid {
        self()
    }
}

/// Draws from another generator, skipping ids that are already taken.
///
/// Every id handed out is added to the taken set, so one `FreshIds` never
/// repeats itself either. The inner generator must eventually produce an
/// untaken id.
pub struct FreshIds<'a> {
    inner: &'a mut dyn IdGenerator,
    taken: HashSet<Uid>,
}

impl<'a> FreshIds<'a> {
    pub fn new(inner: &'a mut dyn IdGenerator, taken: impl IntoIterator<Item = Uid>) -> Self {
        Self {
            inner,
            taken: taken.into_iter().collect(),
        }
    }
}

impl IdGenerator for FreshIds<'_> {
    fn next_id(&mut self) -> Uid {
        loop {
            let id = self.inner.next_id();
            if self.taken.insert(id.clone()) {
                return id;
            }
        }
    }
}

/// Generate document ID from a source URI using CRC32
pub fn get_document_id(uri: &str) -> String {
    let mut buff = String::from(uri);
    if !buff.contains("://") {
        buff = format!("file://{}", buff);
    }

    let mut hasher = Hasher::new();
    hasher.update(buff.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential ID generator: `<seed>-<n>`, monotonic within one instance.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    seed: String,
    count: u64,
}

impl SequentialIds {
    /// Seed from a document URI
    pub fn new(uri: &str) -> Self {
        Self::from_seed(get_document_id(uri))
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Number of ids handed out so far
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> Uid {
        self.count += 1;
        Uid(format!("{}-{}", self.seed, self.count))
    }
}
