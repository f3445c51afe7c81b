use std::sync::Arc;

/// A position in a source Makefile. Paths are interned as `Arc<str>` so that
/// cloning a location through diagnostics, unknown constructs and syntax tree
/// nodes never re-allocates the path text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SourceLocation {
    pub path: Arc<str>,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(path: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Self {
            path: path.into(),
            line,
            column,
        }
    }

    pub fn at_start(path: impl Into<Arc<str>>) -> Self {
        Self::new(path, 1, 1)
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.path, self.line, self.column)
    }
}

impl PartialOrd for SourceLocation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceLocation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.path.as_ref(), self.line, self.column).cmp(&(
            other.path.as_ref(),
            other.line,
            other.column,
        ))
    }
}
