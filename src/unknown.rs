use crate::diagnostics::{codes, Diagnostic, DiagnosticSink, Severity};
use crate::location::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Category {
    MakeSyntax,
    MakeFunction,
    ConditionalLogic,
    ShellCommand,
    Other,
    ToolchainSpecific,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Phase {
    Parse,
    Evaluate,
    BuildGraph,
    CmakeGeneration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Impact {
    pub phase: Phase,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CMakeStatus {
    NotGenerated,
    PartiallyGenerated,
    Approximate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SuggestedAction {
    ManualReview,
    ManualCustomCommand,
    RequiresMapping,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Context {
    pub enclosing_targets: Vec<String>,
    pub variables_in_scope: Vec<String>,
    pub include_stack: Vec<std::sync::Arc<str>>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UnknownConstruct {
    pub id: String,
    pub category: Category,
    pub location: SourceLocation,
    pub raw_snippet: String,
    pub normalized_form: String,
    pub context: Context,
    pub impact: Impact,
    pub cmake_status: CMakeStatus,
    pub suggested_action: SuggestedAction,
}

const RAW_SNIPPET_LIMIT: usize = 200;

/// Trims a raw snippet to the 200-character fallback length required by
/// spec.md §4.2, respecting UTF-8 character boundaries.
pub fn trim_snippet(raw: &str) -> String {
    if raw.chars().count() <= RAW_SNIPPET_LIMIT {
        raw.to_string()
    } else {
        raw.chars().take(RAW_SNIPPET_LIMIT).collect()
    }
}

/// Append-only registry assigning monotonic `UC<n>` ids, reset per run
/// (spec.md §4.2). Every push also appends a paired diagnostic with code
/// `UNKNOWN_CONSTRUCT`, severity derived from the construct's impact.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct UnknownConstructRegistry {
    entries: Vec<UnknownConstruct>,
    next_id: u64,
}

pub struct NewUnknownConstruct {
    pub category: Category,
    pub location: SourceLocation,
    pub raw_snippet: String,
    pub normalized_form: String,
    pub context: Context,
    pub impact: Impact,
    pub cmake_status: CMakeStatus,
    pub suggested_action: SuggestedAction,
}

impl UnknownConstructRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the construct and appends the paired diagnostic to `sink`.
    pub fn record(&mut self, new: NewUnknownConstruct, sink: &mut DiagnosticSink) -> String {
        self.next_id += 1;
        let id = format!("UC{:04}", self.next_id);
        let raw_snippet = trim_snippet(&new.raw_snippet);
        let normalized_form = if new.normalized_form.is_empty() {
            raw_snippet.clone()
        } else {
            new.normalized_form
        };
        let construct = UnknownConstruct {
            id: id.clone(),
            category: new.category,
            location: new.location.clone(),
            raw_snippet,
            normalized_form,
            context: new.context,
            impact: new.impact,
            cmake_status: new.cmake_status,
            suggested_action: new.suggested_action,
        };
        sink.push(
            Diagnostic::new(
                construct.impact.severity,
                codes::UNKNOWN_CONSTRUCT,
                format!("unmapped construct {}: {}", id, construct.normalized_form),
            )
            .with_location(new.location)
            .with_origin("unknown_construct_registry"),
        );
        self.entries.push(construct);
        id
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnknownConstruct> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &UnknownConstruct> {
        self.entries.iter().filter(move |c| c.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new("Makefile", 3, 1)
    }

    #[test]
    fn record_assigns_monotonic_zero_padded_ids() {
        let mut registry = UnknownConstructRegistry::new();
        let mut sink = DiagnosticSink::new();
        let first = registry.record(
            NewUnknownConstruct {
                category: Category::MakeFunction,
                location: loc(),
                raw_snippet: "$(eval $(call X))".to_string(),
                normalized_form: "eval(call(X))".to_string(),
                context: Context::default(),
                impact: Impact {
                    phase: Phase::Evaluate,
                    severity: Severity::Warn,
                },
                cmake_status: CMakeStatus::NotGenerated,
                suggested_action: SuggestedAction::ManualReview,
            },
            &mut sink,
        );
        let second = registry.record(
            NewUnknownConstruct {
                category: Category::MakeSyntax,
                location: loc(),
                raw_snippet: "???".to_string(),
                normalized_form: String::new(),
                context: Context::default(),
                impact: Impact {
                    phase: Phase::Parse,
                    severity: Severity::Warn,
                },
                cmake_status: CMakeStatus::NotGenerated,
                suggested_action: SuggestedAction::ManualReview,
            },
            &mut sink,
        );
        assert_eq!(first, "UC0001");
        assert_eq!(second, "UC0002");
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn raw_snippet_falls_back_to_trimmed_200_chars() {
        let long = "x".repeat(500);
        assert_eq!(trim_snippet(&long).chars().count(), 200);
    }
}
