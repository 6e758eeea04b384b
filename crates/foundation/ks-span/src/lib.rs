//! Source file spans and locations

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A unique identifier for a source file
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize, Display)]
#[display("file#{_0}")]
pub struct FileId(pub u32);

impl FileId {
    /// File id used for tokens synthesized by macros without a better origin
    pub const SYNTHETIC: Self = Self(u32::MAX);

    /// Creates a new file id
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// A byte offset span in a source file
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize, Display)]
#[display("{start}..{end}")]
pub struct Span {
    /// Inclusive start offset
    pub start: u32,
    /// Exclusive end offset
    pub end: u32,
}

impl Span {
    /// Creates a new span
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// An empty span at the given offset
    #[must_use]
    pub fn point(offset: u32) -> Self {
        Self::new(offset, offset)
    }

    /// Byte range covered by this span
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    /// Length in bytes
    #[must_use]
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// True if the span covers no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Moves the span forward by `offset` bytes
    #[must_use]
    pub fn shift(self, offset: u32) -> Self {
        Self::new(self.start + offset, self.end + offset)
    }
}

/// A span with associated file
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize, Display)]
#[display("{file}@{span}")]
pub struct FileSpan {
    /// File the span points into
    pub file: FileId,
    /// Byte range inside the file
    pub span: Span,
}

impl FileSpan {
    /// Creates a new file span
    #[must_use]
    pub fn new(file: FileId, span: Span) -> Self {
        Self { file, span }
    }

    /// A span that does not point at any real source
    #[must_use]
    pub fn synthetic() -> Self {
        Self::new(FileId::SYNTHETIC, Span::default())
    }

    /// Byte range inside the file
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.span.range()
    }

    /// Joins two spans; if they live in different files `self` wins
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        if self.file == other.file {
            Self::new(self.file, self.span.join(other.span))
        } else {
            self
        }
    }

    /// True if the span was synthesized rather than read from a file
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.file == FileId::SYNTHETIC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_covers_both() {
        let joined = Span::new(4, 6).join(Span::new(1, 3));
        assert_eq!(joined, Span::new(1, 6));
        assert_eq!(joined.len(), 5);
    }

    #[test]
    fn join_across_files_keeps_left() {
        let left = FileSpan::new(FileId(0), Span::new(0, 2));
        let right = FileSpan::new(FileId(1), Span::new(5, 9));
        assert_eq!(left.join(right), left);
    }

    #[test]
    fn display_is_compact() {
        let span = FileSpan::new(FileId(2), Span::new(3, 7));
        assert_eq!(span.to_string(), "file#2@3..7");
    }
}
