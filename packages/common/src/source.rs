use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` into a source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `other` lies entirely inside this range
    pub fn contains(&self, other: &SourceRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Both ranges share at least one byte
    pub fn overlaps(&self, other: &SourceRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Provenance of a synthetic node or CSS object: where it came from in its
/// source file. Used to route tree edits back to text edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub uri: String,
    pub start: usize,
    pub end: usize,
    /// Content range for containers: between the tags of an element, or
    /// inside the braces of a CSS rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner: Option<SourceRange>,
}

impl SourceLocation {
    pub fn new(uri: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            uri: uri.into(),
            start,
            end,
            inner: None,
        }
    }

    pub fn with_inner(mut self, start: usize, end: usize) -> Self {
        self.inner = Some(SourceRange::new(start, end));
        self
    }

    pub fn range(&self) -> SourceRange {
        SourceRange::new(self.start, self.end)
    }

    /// Range covering everything up to the content: the start tag of an
    /// element, or the prelude of a rule. Falls back to the whole range.
    pub fn head(&self) -> SourceRange {
        match self.inner {
            Some(inner) => SourceRange::new(self.start, inner.start),
            None => self.range(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_relations() {
        let outer = SourceRange::new(0, 10);
        let inner = SourceRange::new(2, 5);
        let tail = SourceRange::new(5, 12);

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.overlaps(&tail));
        assert!(!inner.overlaps(&tail));
        assert_eq!(tail.len(), 7);
    }

    #[test]
    fn test_head_of_container() {
        let loc = SourceLocation::new("file:///a.html", 0, 20).with_inner(5, 14);
        assert_eq!(loc.head(), SourceRange::new(0, 5));

        let leaf = SourceLocation::new("file:///a.html", 3, 8);
        assert_eq!(leaf.head(), SourceRange::new(3, 8));
    }
}
