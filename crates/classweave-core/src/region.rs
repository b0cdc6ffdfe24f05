//! Source regions attached to AST nodes.
//!
//! Every node remembers where it came from so the resolver can point at it.
//! Nodes synthesized by the compiler itself (quoting, implicit `this`, meta
//! splicing) carry [`Region::SYNTHETIC`].

use std::fmt;

/// A span of source text, tracked as start line/column plus byte length.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Region {
    /// Line number (1-indexed, 0 for synthetic nodes).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Region {
    /// Region used for nodes that have no source text.
    pub const SYNTHETIC: Region = Region {
        line: 0,
        col: 0,
        len: 0,
    };

    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Whether this region belongs to a compiler-generated node.
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }

    /// Smallest region on the first line covering both regions.
    ///
    /// Regions on different lines keep the start of `self`.
    pub fn cover(self, other: Region) -> Region {
        if other.is_synthetic() {
            return self;
        }
        if self.is_synthetic() {
            return other;
        }
        if self.line != other.line {
            return self;
        }
        let start = self.col.min(other.col);
        let end = (self.col + self.len).max(other.col + other.len);
        Region::new(self.line, start, end - start)
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthetic() {
            write!(f, "<generated>")
        } else {
            write!(f, "{}:{}", self.line, self.col)
        }
    }
}
