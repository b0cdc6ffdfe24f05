//! User-facing diagnostics.
//!
//! The resolver never fails on bad input. It appends a [`Diagnostic`] to a
//! caller-owned [`Diagnostics`] sink and keeps going, so one pass reports as
//! many problems as it can find.

use std::fmt;

use crate::Region;

/// A single message pinned to a source region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Where the problem is.
    pub region: Region,
    /// What the problem is.
    pub message: String,
}

impl Diagnostic {
    pub fn new(region: Region, message: impl Into<String>) -> Self {
        Self {
            region,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.region, self.message)
    }
}

/// Ordered, append-only list of diagnostics for one compilation.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message.
    pub fn report(&mut self, region: Region, message: impl Into<String>) {
        self.entries.push(Diagnostic::new(region, message));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Messages only, in report order.
    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|d| d.message.as_str()).collect()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.entries {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}
