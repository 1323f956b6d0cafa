use crate::error::{Error, Result, ServerError};

/// Severity of a diagnostic entry, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info = 0,
    Warning = 1,
    Error = 2,
}

impl Severity {
    const COUNT: usize = 3;

    /// Map the level of a `Warning` notice (NOTE=1, WARNING=2, ERROR=3)
    pub fn from_warning_level(level: u32) -> Self {
        match level {
            1 => Self::Info,
            3 => Self::Error,
            _ => Self::Warning,
        }
    }
}

/// One entry of a [`DiagnosticArena`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEntry {
    pub severity: Severity,
    pub error: ServerError,
}

impl DiagnosticEntry {
    pub fn code(&self) -> u32 {
        self.error.code
    }

    pub fn sql_state(&self) -> &str {
        &self.error.sql_state
    }

    pub fn message(&self) -> &str {
        &self.error.message
    }
}

/// Insertion-ordered collection of diagnostics produced by one operation
///
/// Entries are never reordered or deduplicated. Counts per severity are kept
/// alongside so that `entry_count` does not scan.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticArena {
    entries: Vec<DiagnosticEntry>,
    counts: [usize; Severity::COUNT],
}

impl DiagnosticArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, severity: Severity, error: ServerError) {
        self.counts[severity as usize] += 1;
        self.entries.push(DiagnosticEntry { severity, error });
    }

    /// Number of entries with exactly `level`
    pub fn entry_count(&self, level: Severity) -> usize {
        self.counts[level as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries at or above `min_level`, in insertion order
    pub fn entries(&self, min_level: Severity) -> DiagnosticIter<'_> {
        DiagnosticIter {
            inner: self.entries.iter(),
            min_level,
        }
    }

    /// The first entry with `Error` severity
    pub fn get_error(&self) -> Result<&DiagnosticEntry> {
        self.entries
            .iter()
            .find(|entry| entry.severity >= Severity::Error)
            .ok_or(Error::NoErrorEntry)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.counts = [0; Severity::COUNT];
    }
}

/// Forward-only iterator over entries of an arena, skipping entries below a level
#[derive(Debug, Clone)]
pub struct DiagnosticIter<'a> {
    inner: std::slice::Iter<'a, DiagnosticEntry>,
    min_level: Severity,
}

impl<'a> Iterator for DiagnosticIter<'a> {
    type Item = &'a DiagnosticEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let min_level = self.min_level;
        self.inner.find(|entry| entry.severity >= min_level)
    }
}
