//! Discoverer (spec.md §4.5): resolves the entry Makefile, performs a
//! lightweight line-scan DFS over `include`/`-include`/`sinclude` directives
//! and `$(MAKE) -C <dir>` subdirectory recursion, detects cycles, and returns
//! files in topological (parents-before-children) read order. Deliberately
//! does not use the full Parser — a line scan is enough to find edges.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostics::{codes, Diagnostic, DiagnosticSink, Severity};
use crate::errors::{DiscoveryError, FsError};
use crate::fs::FilesystemBoundary;

static INCLUDE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(-include|sinclude|include)\s+(.+?)\s*$").unwrap());
static SUBDIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\(MAKE\)\s+-C\s+(\S+)").unwrap());
static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|[^\\])#.*$").unwrap());

#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: Arc<str>,
    pub content: String,
    pub including: Option<Arc<str>>,
}

#[derive(Debug, Default)]
pub struct IncludeGraph {
    pub edges: HashMap<Arc<str>, Vec<Arc<str>>>,
}

fn strip_comment(line: &str) -> &str {
    match COMMENT_RE.find(line) {
        Some(m) => {
            // Keep everything up to (but not including) the `#`, accounting
            // for the possible leading non-backslash capture group.
            let hash_idx = line[m.start()..].find('#').map(|i| m.start() + i).unwrap_or(m.start());
            &line[..hash_idx]
        }
        None => line,
    }
}

/// Scans one file's raw text for include/subdir edges without invoking the
/// full Parser (spec.md §4.5 point 2).
fn scan_edges(content: &str, base_dir: &std::path::Path) -> Vec<(std::path::PathBuf, bool)> {
    let mut edges = Vec::new();
    let mut joined = String::new();
    for raw_line in content.lines() {
        if let Some(stripped) = raw_line.strip_suffix('\\') {
            joined.push_str(stripped);
            joined.push(' ');
            continue;
        }
        joined.push_str(raw_line);
        let line = strip_comment(&joined);
        if let Some(caps) = INCLUDE_RE.captures(line) {
            let optional = matches!(&caps[1], "-include" | "sinclude");
            for token in caps[2].split_whitespace() {
                let token = expand_simple_tokens(token);
                edges.push((base_dir.join(token), optional));
            }
        }
        for caps in SUBDIR_RE.captures_iter(line) {
            let dir = base_dir.join(&caps[1]);
            for entry_name in crate::DEFAULT_ENTRY_NAMES {
                edges.push((dir.join(entry_name), true));
            }
        }
        joined.clear();
    }
    edges
}

/// The Discoverer does not run the Evaluator, but `$(MAKEFILE_LIST)`-free
/// literal tokens are common in include lines; anything still containing
/// `$(` is left untouched (and will simply fail the existence check, which
/// is reported as an optional-missing warning or, for a mandatory include,
/// surfaced by whatever later stage needs it).
fn expand_simple_tokens(token: &str) -> &str {
    token
}

pub struct DiscoveryResult {
    pub graph: IncludeGraph,
    pub files: Vec<DiscoveredFile>,
}

pub fn discover(
    source_dir: &std::path::Path,
    explicit_entry: Option<&std::path::Path>,
    filesystem: &dyn FilesystemBoundary,
    sink: &mut DiagnosticSink,
) -> Result<DiscoveryResult, DiscoveryError> {
    let entry_path = resolve_entry(source_dir, explicit_entry, filesystem)?;

    let mut graph = IncludeGraph::default();
    let mut files_by_path: HashMap<Arc<str>, DiscoveredFile> = HashMap::new();
    let mut order: Vec<Arc<str>> = Vec::new();
    let mut white: HashSet<Arc<str>> = HashSet::new();
    let mut gray: Vec<Arc<str>> = Vec::new();
    let mut black: HashSet<Arc<str>> = HashSet::new();

    visit(
        &entry_path,
        None,
        filesystem,
        &mut graph,
        &mut files_by_path,
        &mut order,
        &mut white,
        &mut gray,
        &mut black,
        sink,
    )?;

    let files = order
        .into_iter()
        .filter_map(|p| files_by_path.remove(&p))
        .collect();

    Ok(DiscoveryResult { graph, files })
}

#[allow(clippy::too_many_arguments)]
fn visit(
    path: &std::path::Path,
    including: Option<Arc<str>>,
    filesystem: &dyn FilesystemBoundary,
    graph: &mut IncludeGraph,
    files_by_path: &mut HashMap<Arc<str>, DiscoveredFile>,
    order: &mut Vec<Arc<str>>,
    white: &mut HashSet<Arc<str>>,
    gray: &mut Vec<Arc<str>>,
    black: &mut HashSet<Arc<str>>,
    sink: &mut DiagnosticSink,
) -> Result<(), DiscoveryError> {
    let absolute = crate::fs::to_forward_slash(path);
    let key: Arc<str> = Arc::from(absolute.as_str());

    if gray.contains(&key) {
        let mut cycle_path: Vec<Arc<str>> = gray
            .iter()
            .skip_while(|p| **p != key)
            .cloned()
            .collect();
        cycle_path.push(key.clone());
        let message = format!(
            "include cycle: {}",
            cycle_path
                .iter()
                .map(|p| p.as_ref())
                .collect::<Vec<_>>()
                .join(" -> ")
        );
        sink.push(Diagnostic::new(Severity::Error, codes::DISCOVERY_CYCLE, message));
        return Err(DiscoveryError::Cycle(cycle_path));
    }
    if black.contains(&key) {
        return Ok(());
    }

    white.remove(&key);
    gray.push(key.clone());

    if !filesystem.exists(path) {
        // Only reachable for an include whose mandatory/optional status we
        // learn from the edge that brought us here; the caller records that.
        gray.pop();
        black.insert(key);
        return Ok(());
    }

    let content = filesystem
        .read_utf8(path)
        .map_err(|e| DiscoveryError::Fs(wrap_read_error(e)))?;

    let base_dir = crate::fs::dirname(path);
    let edges = scan_edges(&content, &base_dir);

    let mut child_keys = Vec::new();
    for (child_path, optional) in edges {
        let child_absolute = crate::fs::to_forward_slash(&child_path);
        let child_key: Arc<str> = Arc::from(child_absolute.as_str());
        if !filesystem.exists(&child_path) {
            if optional {
                sink.push(Diagnostic::new(
                    Severity::Warn,
                    codes::DISCOVERY_INCLUDE_OPTIONAL_MISSING,
                    format!("optional include {} does not exist", child_path.display()),
                ));
            } else {
                sink.push(Diagnostic::new(
                    Severity::Error,
                    codes::DISCOVERY_ENTRY_MISSING,
                    format!("included file {} does not exist", child_path.display()),
                ));
            }
            continue;
        }
        child_keys.push(child_key.clone());
        visit(
            &child_path,
            Some(key.clone()),
            filesystem,
            graph,
            files_by_path,
            order,
            white,
            gray,
            black,
            sink,
        )?;
    }

    graph.edges.entry(key.clone()).or_default().extend(child_keys);

    gray.pop();
    black.insert(key.clone());
    order.push(key.clone());
    files_by_path.insert(
        key.clone(),
        DiscoveredFile {
            path: key,
            content,
            including,
        },
    );
    Ok(())
}

fn wrap_read_error(e: FsError) -> FsError {
    e
}

fn resolve_entry(
    source_dir: &std::path::Path,
    explicit_entry: Option<&std::path::Path>,
    filesystem: &dyn FilesystemBoundary,
) -> Result<std::path::PathBuf, DiscoveryError> {
    if let Some(explicit) = explicit_entry {
        let candidate = crate::fs::join(source_dir, explicit);
        return if filesystem.exists(&candidate) {
            Ok(candidate)
        } else {
            Err(DiscoveryError::ExplicitEntryMissing(candidate))
        };
    }
    for name in crate::DEFAULT_ENTRY_NAMES {
        let candidate = source_dir.join(name);
        if filesystem.exists(&candidate) {
            return Ok(candidate);
        }
    }
    Err(DiscoveryError::EntryMissing(source_dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFilesystem;

    #[test]
    fn resolves_default_entry_preferring_makefile() {
        let memfs = MemoryFilesystem::new().with_file("/src/Makefile", "app:\n\tgcc -o app main.c\n");
        let mut sink = DiagnosticSink::new();
        let result = discover(std::path::Path::new("/src"), None, &memfs, &mut sink).unwrap();
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].path.as_ref(), "/src/Makefile");
    }

    #[test]
    fn missing_entry_is_an_error() {
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let err = discover(std::path::Path::new("/src"), None, &memfs, &mut sink).unwrap_err();
        assert!(matches!(err, DiscoveryError::EntryMissing(_)));
    }

    #[test]
    fn topological_order_places_included_file_before_includer() {
        let memfs = MemoryFilesystem::new()
            .with_file("/src/Makefile", "include config.mk\napp:\n\tgcc -o app main.c\n")
            .with_file("/src/config.mk", "CFLAGS := -O2\n");
        let mut sink = DiagnosticSink::new();
        let result = discover(std::path::Path::new("/src"), None, &memfs, &mut sink).unwrap();
        let names: Vec<&str> = result.files.iter().map(|f| f.path.as_ref()).collect();
        assert_eq!(names, vec!["/src/config.mk", "/src/Makefile"]);
    }

    #[test]
    fn include_cycle_is_detected() {
        let memfs = MemoryFilesystem::new()
            .with_file("/src/A.mk", "include B.mk\n")
            .with_file("/src/B.mk", "include A.mk\n");
        let mut sink = DiagnosticSink::new();
        let err = discover(
            std::path::Path::new("/src"),
            Some(std::path::Path::new("A.mk")),
            &memfs,
            &mut sink,
        )
        .unwrap_err();
        assert!(matches!(err, DiscoveryError::Cycle(_)));
        assert!(sink.any_error());
    }

    #[test]
    fn missing_optional_include_is_a_warning_not_an_error() {
        let memfs = MemoryFilesystem::new().with_file("/src/Makefile", "-include missing.mk\napp:\n\tgcc -o app main.c\n");
        let mut sink = DiagnosticSink::new();
        let result = discover(std::path::Path::new("/src"), None, &memfs, &mut sink).unwrap();
        assert_eq!(result.files.len(), 1);
        assert!(!sink.any_error());
        assert!(sink.iter().any(|d| d.code == codes::DISCOVERY_INCLUDE_OPTIONAL_MISSING));
    }
}
