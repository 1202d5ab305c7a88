//! Run-level diagnostics, grouped by severity.
//!
//! Per-file and per-entity failures are recovered locally rather than
//! aborting the run; they accumulate here so the caller gets a full picture
//! (error/warning/info counts plus the individual messages) without stack
//! traces leaking into user-facing output.

use serde::{Deserialize, Serialize};

/// Severity of a single diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A recoverable failure that dropped data (a file, a feature value).
    Error,
    /// A degraded but non-data-dropping condition (e.g. unavailable adapter).
    Warning,
    /// Informational note, not indicative of a problem.
    Info,
}

/// One diagnostic record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity bucket.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// File path the diagnostic pertains to, if any.
    pub file_path: Option<String>,
}

/// Accumulates diagnostics for one analysis run, grouped by severity.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DiagnosticSink {
    /// All recorded diagnostics, in emission order.
    entries: Vec<Diagnostic>,
}

impl DiagnosticSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error-severity diagnostic.
    pub fn error(&mut self, message: impl Into<String>, file_path: Option<String>) {
        self.push(Severity::Error, message, file_path);
    }

    /// Record a warning-severity diagnostic.
    pub fn warning(&mut self, message: impl Into<String>, file_path: Option<String>) {
        self.push(Severity::Warning, message, file_path);
    }

    /// Record an info-severity diagnostic.
    pub fn info(&mut self, message: impl Into<String>, file_path: Option<String>) {
        self.push(Severity::Info, message, file_path);
    }

    fn push(&mut self, severity: Severity, message: impl Into<String>, file_path: Option<String>) {
        self.entries.push(Diagnostic {
            severity,
            message: message.into(),
            file_path,
        });
    }

    /// Merge another sink's entries into this one, preserving emission order.
    pub fn extend(&mut self, other: DiagnosticSink) {
        self.entries.extend(other.entries);
    }

    /// All diagnostics of a given severity.
    pub fn by_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.severity == severity)
    }

    /// Count of diagnostics in each severity bucket, in (errors, warnings, info) order.
    pub fn counts(&self) -> (usize, usize, usize) {
        let errors = self.by_severity(Severity::Error).count();
        let warnings = self.by_severity(Severity::Warning).count();
        let info = self.by_severity(Severity::Info).count();
        (errors, warnings, info)
    }

    /// One-line human summary, e.g. "3 errors, 1 warning, 0 info".
    pub fn summary_line(&self) -> String {
        let (errors, warnings, info) = self.counts();
        format!(
            "{} error{}, {} warning{}, {} info",
            errors,
            if errors == 1 { "" } else { "s" },
            warnings,
            if warnings == 1 { "" } else { "s" },
            info
        )
    }

    /// All entries, regardless of severity.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// True if any error-severity diagnostic was recorded.
    pub fn has_errors(&self) -> bool {
        self.by_severity(Severity::Error).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_partition_by_severity() {
        let mut sink = DiagnosticSink::new();
        sink.error("bad file", Some("a.py".into()));
        sink.warning("adapter unavailable", None);
        sink.warning("adapter unavailable 2", None);
        sink.info("fyi", None);

        assert_eq!(sink.counts(), (1, 2, 1));
        assert!(sink.has_errors());
        assert_eq!(sink.summary_line(), "1 error, 2 warnings, 1 info");
    }

    #[test]
    fn extend_preserves_order() {
        let mut a = DiagnosticSink::new();
        a.error("first", None);
        let mut b = DiagnosticSink::new();
        b.warning("second", None);
        a.extend(b);
        assert_eq!(a.entries().len(), 2);
        assert_eq!(a.entries()[1].message, "second");
    }
}
