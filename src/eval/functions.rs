//! Evaluation of Make function calls (spec.md §4.7). Only the nine
//! recognized functions are actually computed; everything else becomes an
//! `UnknownConstruct` (category `make_function`) with a normalized form and
//! expands to the empty string so evaluation continues.

use std::collections::HashSet;

use crate::diagnostics::Severity;
use crate::location::SourceLocation;
use crate::unknown::NewUnknownConstruct;

use super::environment::Environment;
use super::expand::{expand_inner, matching_close, split_top_level_commas};
use super::EvalContext;

const RECOGNIZED: &[&str] = &[
    "wildcard",
    "patsubst",
    "addprefix",
    "addsuffix",
    "notdir",
    "dir",
    "basename",
    "filter",
    "filter-out",
    "strip",
    "subst",
    "foreach",
    "if",
];

/// Splits `inner` (the text between a reference's delimiters) into a
/// function name and its raw (unexpanded) argument text, if `inner` has the
/// shape `name args...` with a lowercase/hyphen name.
pub fn split_function_call(inner: &str) -> Option<(String, String)> {
    let trimmed = inner.trim_start();
    let ws_idx = trimmed.find(char::is_whitespace)?;
    let name = &trimmed[..ws_idx];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_lowercase() || c == '-') {
        return None;
    }
    Some((name.to_string(), trimmed[ws_idx..].trim_start().to_string()))
}

pub fn call(
    name: &str,
    raw_args: String,
    location: &SourceLocation,
    env: &Environment,
    ctx: &mut EvalContext,
    in_progress: &mut HashSet<String>,
) -> String {
    if !RECOGNIZED.contains(&name) {
        record_unknown(name, &raw_args, location, ctx);
        return String::new();
    }

    let arg = |raw: &str, ctx: &mut EvalContext, in_progress: &mut HashSet<String>| {
        expand_inner(raw.trim(), location, env, ctx, in_progress)
    };

    match name {
        "wildcard" => {
            let pattern = arg(&raw_args, ctx, in_progress);
            wildcard(&pattern, ctx)
        }
        "patsubst" => {
            let parts = split_top_level_commas(&raw_args);
            if parts.len() != 3 {
                return String::new();
            }
            let pattern = arg(&parts[0], ctx, in_progress);
            let replacement = arg(&parts[1], ctx, in_progress);
            let text = arg(&parts[2], ctx, in_progress);
            patsubst(&pattern, &replacement, &text)
        }
        "addprefix" => {
            let parts = split_top_level_commas(&raw_args);
            if parts.len() != 2 {
                return String::new();
            }
            let prefix = arg(&parts[0], ctx, in_progress);
            let text = arg(&parts[1], ctx, in_progress);
            text.split_whitespace()
                .map(|w| format!("{prefix}{w}"))
                .collect::<Vec<_>>()
                .join(" ")
        }
        "addsuffix" => {
            let parts = split_top_level_commas(&raw_args);
            if parts.len() != 2 {
                return String::new();
            }
            let suffix = arg(&parts[0], ctx, in_progress);
            let text = arg(&parts[1], ctx, in_progress);
            text.split_whitespace()
                .map(|w| format!("{w}{suffix}"))
                .collect::<Vec<_>>()
                .join(" ")
        }
        "notdir" => {
            let text = arg(&raw_args, ctx, in_progress);
            text.split_whitespace()
                .map(|w| w.rsplit('/').next().unwrap_or(w).to_string())
                .collect::<Vec<_>>()
                .join(" ")
        }
        "dir" => {
            let text = arg(&raw_args, ctx, in_progress);
            text.split_whitespace()
                .map(|w| match w.rfind('/') {
                    Some(idx) => w[..=idx].to_string(),
                    None => "./".to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ")
        }
        "basename" => {
            let text = arg(&raw_args, ctx, in_progress);
            text.split_whitespace()
                .map(|w| match w.rfind('.') {
                    Some(idx) if idx > 0 => w[..idx].to_string(),
                    _ => w.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ")
        }
        "filter" | "filter-out" => {
            let parts = split_top_level_commas(&raw_args);
            if parts.len() != 2 {
                return String::new();
            }
            let patterns = arg(&parts[0], ctx, in_progress);
            let text = arg(&parts[1], ctx, in_progress);
            let pattern_list: Vec<&str> = patterns.split_whitespace().collect();
            let keep_matches = name == "filter";
            text.split_whitespace()
                .filter(|w| pattern_list.iter().any(|p| glob_word_match(p, w)) == keep_matches)
                .collect::<Vec<_>>()
                .join(" ")
        }
        "strip" => {
            let text = arg(&raw_args, ctx, in_progress);
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        }
        "subst" => {
            let parts = split_top_level_commas(&raw_args);
            if parts.len() != 3 {
                return String::new();
            }
            let from = arg(&parts[0], ctx, in_progress);
            let to = arg(&parts[1], ctx, in_progress);
            let text = arg(&parts[2], ctx, in_progress);
            text.replace(&from, &to)
        }
        "foreach" => {
            let parts = split_top_level_commas(&raw_args);
            if parts.len() != 3 {
                return String::new();
            }
            let var_name = arg(&parts[0], ctx, in_progress);
            let list = arg(&parts[1], ctx, in_progress);
            let text_template = parts[2].trim();
            let mut results = Vec::new();
            for word in list.split_whitespace() {
                let mut scoped = env.clone();
                scoped.push_overlay();
                scoped.bind_simple(var_name.trim(), word.to_string());
                let mut local_in_progress = HashSet::new();
                results.push(expand_inner(
                    text_template,
                    location,
                    &scoped,
                    ctx,
                    &mut local_in_progress,
                ));
            }
            results.join(" ")
        }
        "if" => {
            let parts = split_top_level_commas(&raw_args);
            if parts.is_empty() {
                return String::new();
            }
            let condition = arg(&parts[0], ctx, in_progress);
            if !condition.is_empty() {
                parts.get(1).map(|t| arg(t, ctx, in_progress)).unwrap_or_default()
            } else {
                parts.get(2).map(|t| arg(t, ctx, in_progress)).unwrap_or_default()
            }
        }
        _ => unreachable!("exhaustively matched against RECOGNIZED"),
    }
}

fn patsubst(pattern: &str, replacement: &str, text: &str) -> String {
    text.split_whitespace()
        .map(|word| match stem_match(pattern, word) {
            Some(stem) => replacement.replacen('%', &stem, 1),
            None => word.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Matches `word` against a `%`-wildcard pattern, returning the stem bound to
/// `%` on success.
fn stem_match(pattern: &str, word: &str) -> Option<String> {
    let idx = pattern.find('%')?;
    let (prefix, suffix) = (&pattern[..idx], &pattern[idx + 1..]);
    if word.len() < prefix.len() + suffix.len() {
        return None;
    }
    if !word.starts_with(prefix) || !word.ends_with(suffix) {
        return None;
    }
    Some(word[prefix.len()..word.len() - suffix.len()].to_string())
}

fn glob_word_match(pattern: &str, word: &str) -> bool {
    if pattern.contains('%') {
        stem_match(pattern, word).is_some()
    } else {
        pattern == word
    }
}

fn wildcard(pattern: &str, ctx: &mut EvalContext) -> String {
    let path = std::path::Path::new(pattern);
    let dir = crate::fs::dirname(path);
    let base_pattern = crate::fs::basename(path);
    let dir = if dir.as_os_str().is_empty() {
        std::path::PathBuf::from(".")
    } else {
        dir
    };
    let entries = ctx.filesystem.list_dir(&dir).unwrap_or_default();
    let mut matches: Vec<String> = entries
        .into_iter()
        .filter(|p| glob_word_match(&base_pattern, &crate::fs::basename(p)))
        .map(|p| crate::fs::to_forward_slash(&p))
        .filter(|p| !is_ignored(p, ctx.ignore_paths))
        .collect();
    matches.sort();
    matches.join(" ")
}

fn is_ignored(path: &str, ignore_paths: &[String]) -> bool {
    ignore_paths.iter().any(|pattern| glob_word_match(pattern, path))
}

fn record_unknown(name: &str, raw_args: &str, location: &SourceLocation, ctx: &mut EvalContext) {
    let normalized = format!("{}({})", name, normalize_args(raw_args));
    let id = ctx.unknown.record(
        NewUnknownConstruct {
            category: crate::unknown::Category::MakeFunction,
            location: location.clone(),
            raw_snippet: crate::unknown::trim_snippet(raw_args),
            normalized_form: normalized,
            context: crate::unknown::Context::default(),
            impact: crate::unknown::Impact {
                phase: crate::unknown::Phase::Evaluate,
                severity: Severity::Warn,
            },
            cmake_status: crate::unknown::CMakeStatus::NotGenerated,
            suggested_action: crate::unknown::SuggestedAction::ManualReview,
        },
        ctx.sink,
    );
    log::debug!("unsupported make function \"{name}\" recorded as {id}");
}

fn normalize_args(raw_args: &str) -> String {
    split_top_level_commas(raw_args)
        .iter()
        .map(|a| normalize_text(a))
        .collect::<Vec<_>>()
        .join(", ")
}

fn normalize_text(text: &str) -> String {
    let trimmed = text.trim();
    match whole_reference_inner(trimmed) {
        Some(inner) => match split_function_call(&inner) {
            Some((name, rest)) => format!("{}({})", name, normalize_args(&rest)),
            None => trimmed.to_string(),
        },
        None => trimmed.to_string(),
    }
}

fn whole_reference_inner(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < 3 || chars[0] != '$' {
        return None;
    }
    let open = chars[1];
    let close = match open {
        '(' => ')',
        '{' => '}',
        _ => return None,
    };
    let end = matching_close(&chars, 1, open, close)?;
    if end != chars.len() - 1 {
        return None;
    }
    Some(chars[2..end].iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSink;
    use crate::eval::expand::expand;
    use crate::fs::MemoryFilesystem;
    use crate::unknown::UnknownConstructRegistry;

    fn ctx<'a>(
        filesystem: &'a MemoryFilesystem,
        sink: &'a mut DiagnosticSink,
        unknown: &'a mut UnknownConstructRegistry,
    ) -> EvalContext<'a> {
        EvalContext {
            filesystem,
            sink,
            unknown,
            ignore_paths: &[],
        }
    }

    #[test]
    fn patsubst_substitutes_stem() {
        assert_eq!(patsubst("%.c", "%.o", "main.c util.c"), "main.o util.o");
    }

    #[test]
    fn notdir_and_dir_split_paths() {
        assert_eq!(
            call_simple("notdir", "src/main.c"),
            "main.c"
        );
    }

    fn call_simple(name: &str, raw_args: &str) -> String {
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let env = Environment::new();
        let loc = SourceLocation::at_start("Makefile");
        let mut c = ctx(&memfs, &mut sink, &mut unknown);
        let mut in_progress = HashSet::new();
        call(name, raw_args.to_string(), &loc, &env, &mut c, &mut in_progress)
    }

    #[test]
    fn unrecognized_function_records_unknown_construct_and_expands_empty() {
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let env = Environment::new();
        let loc = SourceLocation::at_start("Makefile");
        let mut c = ctx(&memfs, &mut sink, &mut unknown);
        let result = expand("$(eval $(call DEFINE_RULE,$(t)))", &loc, &env, &mut c);
        assert_eq!(result, "");
        assert_eq!(unknown.len(), 1);
        let entry = unknown.iter().next().unwrap();
        assert_eq!(entry.normalized_form, "eval(call(DEFINE_RULE, $(t)))");
    }

    #[test]
    fn if_function_picks_branch_by_condition() {
        assert_eq!(call_simple("if", "1,yes,no"), "yes");
        assert_eq!(call_simple("if", ",yes,no"), "no");
    }
}
