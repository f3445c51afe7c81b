//! Parser (spec.md §4.6): turns one file's raw text into a location-preserving
//! syntax tree. Recognizes conditionals, include statements, rules (with
//! their recipe lines), variable assignments and pattern rules by structural
//! shape only — it never expands a variable, resolves an include, or runs a
//! recipe. Anything it cannot classify becomes an `Unknown` node tagged with
//! category `make_syntax`, never a hard failure.

pub mod types;

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostics::{codes, Diagnostic, DiagnosticSink, Severity};
use crate::location::SourceLocation;
use types::{
    AssignOp, Conditional, ConditionalBranch, ConditionalKind, IncludeDirective, Node, RecipeLine,
    Rule, SyntaxTree, UnknownLine, VariableAssign,
};

static ASSIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9_.][A-Za-z0-9_.%]*)\s*(::=|:=|\?=|\+=|=)\s*(.*)$").unwrap()
});
static RULE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^:]+?)::?\s*(.*)$").unwrap());
static INCLUDE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(-include|sinclude|include)\s+(.+?)\s*$").unwrap());
static IFEQ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*ifeq\s*(.*)$").unwrap());
static IFNEQ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*ifneq\s*(.*)$").unwrap());
static IFDEF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*ifdef\s+(.*)$").unwrap());
static IFNDEF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*ifndef\s+(.*)$").unwrap());
static ELSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*else\b\s*(.*)$").unwrap());
static ENDIF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*endif\s*$").unwrap());

struct LogicalLine {
    text: String,
    starts_with_tab: bool,
    line_number: u32,
}

fn build_logical_lines(content: &str) -> Vec<LogicalLine> {
    let mut lines = Vec::new();
    let mut pending: Option<(String, bool, u32)> = None;
    for (idx, raw) in content.lines().enumerate() {
        let line_number = (idx + 1) as u32;
        let (mut text, starts_with_tab, first_line) = pending
            .take()
            .unwrap_or((String::new(), raw.starts_with('\t'), line_number));

        let continues = raw.ends_with('\\');
        let piece = if continues { &raw[..raw.len() - 1] } else { raw };
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(piece);

        if continues {
            pending = Some((text, starts_with_tab, first_line));
        } else {
            lines.push(LogicalLine {
                text,
                starts_with_tab,
                line_number: first_line,
            });
        }
    }
    if let Some((text, starts_with_tab, line_number)) = pending {
        lines.push(LogicalLine {
            text,
            starts_with_tab,
            line_number,
        });
    }
    lines
}

fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'#' && (i == 0 || bytes[i - 1] != b'\\') {
            return &line[..i];
        }
        i += 1;
    }
    line
}

pub fn parse(path: Arc<str>, content: &str, sink: &mut DiagnosticSink) -> SyntaxTree {
    let logical = build_logical_lines(content);
    let mut pos = 0usize;
    let nodes = parse_block(&path, &logical, &mut pos, &[], sink);
    SyntaxTree { path, nodes }
}

/// Parses a sequence of nodes until EOF or a line matching one of
/// `terminators` (e.g. `"else"`/`"endif"` for a conditional arm). The
/// terminating line is left unconsumed so the caller can inspect it.
fn parse_block(
    path: &Arc<str>,
    lines: &[LogicalLine],
    pos: &mut usize,
    terminators: &[&str],
    sink: &mut DiagnosticSink,
) -> Vec<Node> {
    let mut nodes = Vec::new();
    while *pos < lines.len() {
        let line = &lines[*pos];

        if !line.starts_with_tab {
            let trimmed_raw = line.text.trim();
            if trimmed_raw.is_empty() {
                *pos += 1;
                continue;
            }
            let content_line = strip_comment(&line.text);
            let trimmed = content_line.trim();
            if trimmed.is_empty() {
                *pos += 1;
                continue;
            }

            if !terminators.is_empty() && is_terminator(trimmed, terminators) {
                return nodes;
            }

            if ENDIF_RE.is_match(trimmed) {
                // Stray endif with no opening conditional in scope: surface
                // as an unknown construct rather than panicking.
                let loc = SourceLocation::new(path.clone(), line.line_number, 1);
                nodes.push(Node::Unknown(UnknownLine {
                    raw: trimmed.to_string(),
                    location: loc,
                }));
                *pos += 1;
                continue;
            }

            if let Some(kind) = conditional_keyword(trimmed) {
                nodes.push(Node::Conditional(parse_conditional(path, lines, pos, kind, sink)));
                continue;
            }

            if let Some(caps) = INCLUDE_RE.captures(trimmed) {
                let optional = matches!(&caps[1], "-include" | "sinclude");
                let loc = SourceLocation::new(path.clone(), line.line_number, 1);
                nodes.push(Node::Include(IncludeDirective {
                    raw_path_expr: caps[2].to_string(),
                    optional,
                    location: loc,
                }));
                *pos += 1;
                continue;
            }

            if let Some(caps) = ASSIGN_RE.captures(trimmed) {
                let op = match &caps[2] {
                    "::=" | ":=" => AssignOp::Simple,
                    "?=" => AssignOp::Conditional,
                    "+=" => AssignOp::Append,
                    _ => AssignOp::Recursive,
                };
                let loc = SourceLocation::new(path.clone(), line.line_number, 1);
                nodes.push(Node::VariableAssign(VariableAssign {
                    name: caps[1].to_string(),
                    op,
                    value: caps[3].trim().to_string(),
                    location: loc,
                }));
                *pos += 1;
                continue;
            }

            if let Some(caps) = RULE_RE.captures(trimmed) {
                let targets_part = caps[1].trim();
                if !targets_part.is_empty() && !targets_part.contains('=') {
                    let loc = SourceLocation::new(path.clone(), line.line_number, 1);
                    *pos += 1;
                    let rule = parse_rule(path, targets_part, &caps[2], loc, lines, pos);
                    nodes.push(Node::Rule(rule));
                    continue;
                }
            }

            let loc = SourceLocation::new(path.clone(), line.line_number, 1);
            nodes.push(Node::Unknown(UnknownLine {
                raw: trimmed.to_string(),
                location: loc,
            }));
            *pos += 1;
        } else {
            // A bare recipe line with no preceding rule header: GNU Make
            // treats this as an error; we record it as unknown so downstream
            // stages can report it without aborting the whole file.
            let loc = SourceLocation::new(path.clone(), line.line_number, 1);
            nodes.push(Node::Unknown(UnknownLine {
                raw: line.text.trim_start_matches('\t').to_string(),
                location: loc,
            }));
            *pos += 1;
        }
    }
    nodes
}

fn is_terminator(trimmed: &str, terminators: &[&str]) -> bool {
    terminators.iter().any(|t| match *t {
        "else" => ELSE_RE.is_match(trimmed),
        "endif" => ENDIF_RE.is_match(trimmed),
        _ => false,
    })
}

fn conditional_keyword(trimmed: &str) -> Option<ConditionalKind> {
    if IFEQ_RE.is_match(trimmed) && trimmed.trim_start().starts_with("ifeq") {
        Some(ConditionalKind::IfEq)
    } else if IFNEQ_RE.is_match(trimmed) && trimmed.trim_start().starts_with("ifneq") {
        Some(ConditionalKind::IfNeq)
    } else if IFDEF_RE.is_match(trimmed) && trimmed.trim_start().starts_with("ifdef") {
        Some(ConditionalKind::IfDef)
    } else if IFNDEF_RE.is_match(trimmed) && trimmed.trim_start().starts_with("ifndef") {
        Some(ConditionalKind::IfNdef)
    } else {
        None
    }
}

fn raw_condition_for(kind: ConditionalKind, trimmed: &str) -> String {
    let rest = match kind {
        ConditionalKind::IfEq => IFEQ_RE.captures(trimmed).map(|c| c[1].to_string()),
        ConditionalKind::IfNeq => IFNEQ_RE.captures(trimmed).map(|c| c[1].to_string()),
        ConditionalKind::IfDef => IFDEF_RE.captures(trimmed).map(|c| c[1].to_string()),
        ConditionalKind::IfNdef => IFNDEF_RE.captures(trimmed).map(|c| c[1].to_string()),
    };
    rest.unwrap_or_default().trim().to_string()
}

fn parse_conditional(
    path: &Arc<str>,
    lines: &[LogicalLine],
    pos: &mut usize,
    first_kind: ConditionalKind,
    sink: &mut DiagnosticSink,
) -> Conditional {
    let opening_line = &lines[*pos];
    let conditional_location = SourceLocation::new(path.clone(), opening_line.line_number, 1);
    let first_trimmed = strip_comment(&opening_line.text).trim().to_string();
    let mut branches = Vec::new();

    let branch_location = conditional_location.clone();
    let raw_condition = raw_condition_for(first_kind, &first_trimmed);
    *pos += 1;
    let body = parse_block(path, lines, pos, &["else", "endif"], sink);
    branches.push(ConditionalBranch {
        kind: Some(first_kind),
        raw_condition: Some(raw_condition),
        body,
        location: branch_location,
    });

    let mut closed = false;
    loop {
        if *pos >= lines.len() {
            break;
        }
        let line = &lines[*pos];
        let trimmed = strip_comment(&line.text).trim().to_string();
        if ENDIF_RE.is_match(&trimmed) {
            *pos += 1;
            closed = true;
            break;
        }
        if let Some(caps) = ELSE_RE.captures(&trimmed) {
            let rest = caps[1].trim();
            let branch_loc = SourceLocation::new(path.clone(), line.line_number, 1);
            if rest.is_empty() {
                *pos += 1;
                let body = parse_block(path, lines, pos, &["endif"], sink);
                branches.push(ConditionalBranch {
                    kind: None,
                    raw_condition: None,
                    body,
                    location: branch_loc,
                });
            } else if let Some(kind) = conditional_keyword(rest) {
                let raw_condition = raw_condition_for(kind, rest);
                *pos += 1;
                let body = parse_block(path, lines, pos, &["else", "endif"], sink);
                branches.push(ConditionalBranch {
                    kind: Some(kind),
                    raw_condition: Some(raw_condition),
                    body,
                    location: branch_loc,
                });
            } else {
                *pos += 1;
            }
            continue;
        }
        // Neither else nor endif: treat as unclosed conditional, stop here.
        break;
    }

    if !closed {
        sink.push(
            Diagnostic::new(
                Severity::Warn,
                codes::PARSER_CONDITIONAL,
                format!("conditional opened at {conditional_location} is never closed with endif"),
            )
            .with_location(conditional_location.clone()),
        );
    }

    Conditional {
        branches,
        location: conditional_location,
    }
}

fn parse_rule(
    path: &Arc<str>,
    targets_part: &str,
    rest: &str,
    location: SourceLocation,
    lines: &[LogicalLine],
    pos: &mut usize,
) -> Rule {
    let targets: Vec<String> = targets_part
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();
    let is_pattern = targets.iter().any(|t| t.contains('%'));

    let mut parts = rest.splitn(2, '|');
    let normal_part = parts.next().unwrap_or("").trim();
    let order_only_part = parts.next().unwrap_or("").trim();
    let prerequisites: Vec<String> = normal_part
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();
    let order_only_prerequisites: Vec<String> = order_only_part
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();

    let mut recipe = Vec::new();
    while *pos < lines.len() {
        let line = &lines[*pos];
        if !line.starts_with_tab {
            break;
        }
        let mut text = line.text.trim_start_matches('\t');
        let mut silent = false;
        let mut ignore_error = false;
        loop {
            if let Some(stripped) = text.strip_prefix('@') {
                silent = true;
                text = stripped;
            } else if let Some(stripped) = text.strip_prefix('-') {
                ignore_error = true;
                text = stripped;
            } else {
                break;
            }
        }
        recipe.push(RecipeLine {
            text: text.to_string(),
            silent,
            ignore_error,
            location: SourceLocation::new(path.clone(), line.line_number, 1),
        });
        *pos += 1;
    }

    Rule {
        targets,
        is_pattern,
        prerequisites,
        order_only_prerequisites,
        recipe,
        location,
    }
}
