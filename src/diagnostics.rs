use crate::location::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Stable diagnostic codes (spec.md §6).
pub mod codes {
    pub const CONFIG_MISSING: &str = "CONFIG_MISSING";
    pub const CONFIG_SCHEMA: &str = "CONFIG_SCHEMA";
    pub const DISCOVERY_ENTRY_MISSING: &str = "DISCOVERY_ENTRY_MISSING";
    pub const DISCOVERY_CYCLE: &str = "DISCOVERY_CYCLE";
    pub const DISCOVERY_INCLUDE_OPTIONAL_MISSING: &str = "DISCOVERY_INCLUDE_OPTIONAL_MISSING";
    pub const FS_READ: &str = "FS_READ";
    pub const PARSER_CONDITIONAL: &str = "PARSER_CONDITIONAL";
    pub const UNKNOWN_CONSTRUCT: &str = "UNKNOWN_CONSTRUCT";
    pub const EVAL_RECURSIVE_LOOP: &str = "EVAL_RECURSIVE_LOOP";
    pub const EVAL_UNSUPPORTED_FUNC: &str = "EVAL_UNSUPPORTED_FUNC";
    pub const EVAL_NO_SOURCE: &str = "EVAL_NO_SOURCE";
    pub const IR_DUP_TARGET: &str = "IR_DUP_TARGET";
    pub const IR_UNKNOWN_DEP: &str = "IR_UNKNOWN_DEP";
    pub const IR_UNMAPPED_FLAG: &str = "IR_UNMAPPED_FLAG";
    pub const IR_REDUNDANT_FLAG: &str = "IR_REDUNDANT_FLAG";
    pub const EMIT_WRITE_FAIL: &str = "EMIT_WRITE_FAIL";
    pub const EMIT_UNKNOWN_TYPE: &str = "EMIT_UNKNOWN_TYPE";
    pub const INTERNAL: &str = "INTERNAL";
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub origin: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            location: None,
            origin: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// The 5-tuple used for dedup-on-insert (spec.md §3).
    fn key(&self) -> (Severity, &str, &str, Option<&SourceLocation>, Option<&str>) {
        (
            self.severity,
            self.code.as_str(),
            self.message.as_str(),
            self.location.as_ref(),
            self.origin.as_deref(),
        )
    }
}

/// Append-only, dedup-on-insert collection (spec.md §4.1). Insertion order is
/// preserved for the P3 property; a separate sorted view is offered for
/// rendering.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DiagnosticSink {
    entries: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if !self
            .entries
            .iter()
            .any(|existing| existing.key() == diagnostic.key())
        {
            self.entries.push(diagnostic);
        }
    }

    /// Appends another sink's entries in order, respecting dedup-on-insert.
    /// Used to fold per-worker sinks from the parallel-parse extension back
    /// into the main sink in file order, so insertion indices stay
    /// deterministic regardless of `jobs`.
    pub fn merge(&mut self, other: DiagnosticSink) {
        for entry in other.entries {
            self.push(entry);
        }
    }

    pub fn any_error(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Severity descending, then code, then insertion index (spec.md §3).
    pub fn sorted_view(&self) -> Vec<&Diagnostic> {
        let mut indexed: Vec<(usize, &Diagnostic)> = self.entries.iter().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.code.cmp(&b.code))
                .then_with(|| ia.cmp(ib))
        });
        indexed.into_iter().map(|(_, d)| d).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_deduplicates_identical_five_tuples() {
        let mut sink = DiagnosticSink::new();
        sink.push(Diagnostic::new(Severity::Warn, codes::FS_READ, "oops"));
        sink.push(Diagnostic::new(Severity::Warn, codes::FS_READ, "oops"));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn any_error_reflects_severity() {
        let mut sink = DiagnosticSink::new();
        assert!(!sink.any_error());
        sink.push(Diagnostic::new(Severity::Error, codes::INTERNAL, "bad"));
        assert!(sink.any_error());
    }

    #[test]
    fn sorted_view_orders_severity_then_code_then_insertion() {
        let mut sink = DiagnosticSink::new();
        sink.push(Diagnostic::new(Severity::Info, "B", "first"));
        sink.push(Diagnostic::new(Severity::Error, "A", "second"));
        sink.push(Diagnostic::new(Severity::Error, "A", "third"));
        sink.push(Diagnostic::new(Severity::Warn, "C", "fourth"));
        let ordered: Vec<_> = sink.sorted_view().into_iter().map(|d| &d.message).collect();
        assert_eq!(ordered, vec!["second", "third", "fourth", "first"]);
    }
}
