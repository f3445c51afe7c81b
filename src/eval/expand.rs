//! Recursive textual expansion of `$(NAME)`/`${NAME}` and automatic
//! variables (spec.md §4.7). A fresh in-progress set is created per top-level
//! call so cycle detection never leaks state between expansions (§9 design
//! note).

use std::collections::HashSet;

use crate::diagnostics::{codes, Diagnostic, Severity};
use crate::location::SourceLocation;

use super::environment::Environment;
use super::EvalContext;

pub fn expand(text: &str, location: &SourceLocation, env: &Environment, ctx: &mut EvalContext) -> String {
    let mut in_progress = HashSet::new();
    expand_inner(text, location, env, ctx, &mut in_progress)
}

pub(crate) fn expand_inner(
    text: &str,
    location: &SourceLocation,
    env: &Environment,
    ctx: &mut EvalContext,
    in_progress: &mut HashSet<String>,
) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut i = 0usize;
    while i < chars.len() {
        if chars[i] != '$' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        if i + 1 >= chars.len() {
            out.push('$');
            i += 1;
            continue;
        }
        let next = chars[i + 1];
        if next == '$' {
            out.push('$');
            i += 2;
            continue;
        }
        if next == '(' || next == '{' {
            let close = if next == '(' { ')' } else { '}' };
            if let Some(end) = matching_close(&chars, i + 1, next, close) {
                let inner: String = chars[i + 2..end].iter().collect();
                out.push_str(&resolve_reference(&inner, location, env, ctx, in_progress));
                i = end + 1;
                continue;
            } else {
                // Unterminated reference: pass through literally.
                out.push(chars[i]);
                i += 1;
                continue;
            }
        }
        // Bare automatic variable: $@ $< $^ $? $* (and anything else single
        // char is looked up as a one-letter variable name, per Make).
        let name = next.to_string();
        out.push_str(&resolve_name(&name, location, env, ctx, in_progress));
        i += 2;
    }
    out
}

pub(crate) fn matching_close(chars: &[char], open_idx: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0i32;
    let mut i = open_idx;
    while i < chars.len() {
        if chars[i] == open {
            depth += 1;
        } else if chars[i] == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

fn resolve_reference(
    inner: &str,
    location: &SourceLocation,
    env: &Environment,
    ctx: &mut EvalContext,
    in_progress: &mut HashSet<String>,
) -> String {
    if let Some((func_name, raw_args)) = super::functions::split_function_call(inner) {
        return super::functions::call(&func_name, raw_args, location, env, ctx, in_progress);
    }
    resolve_name(inner.trim(), location, env, ctx, in_progress)
}

fn resolve_name(
    name: &str,
    location: &SourceLocation,
    env: &Environment,
    ctx: &mut EvalContext,
    in_progress: &mut HashSet<String>,
) -> String {
    if name.len() == 1 && "@<^?*".contains(name) && env.get(name).is_none() {
        // Automatic variable not yet bound: this is a pattern rule kept
        // symbolic (spec.md §9, "pattern rule instantiation is deferred").
        // Leave the placeholder literal for the IR Builder to resolve.
        return format!("${name}");
    }
    if in_progress.contains(name) {
        ctx.sink.push(
            Diagnostic::new(
                Severity::Error,
                codes::EVAL_RECURSIVE_LOOP,
                format!("recursive expansion loop on variable \"{name}\""),
            )
            .with_location(location.clone()),
        );
        return String::new();
    }
    match env.get(name) {
        Some(var) if var.recursive => {
            in_progress.insert(name.to_string());
            let expanded = expand_inner(&var.value, location, env, ctx, in_progress);
            in_progress.remove(name);
            expanded
        }
        Some(var) => var.value.clone(),
        None => String::new(),
    }
}

/// Splits `s` on top-level commas, respecting nesting of `(` `)` and `{` `}`
/// (spec.md §4.7's function-call argument lists).
pub fn split_top_level_commas(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in s.chars() {
        match ch {
            '(' | '{' => {
                depth += 1;
                current.push(ch);
            }
            ')' | '}' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.clone());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSink;
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
    fn expands_simple_variable_reference() {
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let mut env = Environment::new();
        env.bind_simple("CC", "gcc".to_string());
        let loc = SourceLocation::at_start("Makefile");
        let mut c = ctx(&memfs, &mut sink, &mut unknown);
        assert_eq!(expand("$(CC) -c", &loc, &env, &mut c), "gcc -c");
    }

    #[test]
    fn undefined_variable_expands_to_empty() {
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let env = Environment::new();
        let loc = SourceLocation::at_start("Makefile");
        let mut c = ctx(&memfs, &mut sink, &mut unknown);
        assert_eq!(expand("[$(NOPE)]", &loc, &env, &mut c), "[]");
    }

    #[test]
    fn recursive_self_reference_is_detected_and_cleared() {
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let mut env = Environment::new();
        env.bind_recursive("A", "$(A)".to_string());
        let loc = SourceLocation::at_start("Makefile");
        let mut c = ctx(&memfs, &mut sink, &mut unknown);
        let result = expand("$(A)", &loc, &env, &mut c);
        assert_eq!(result, "");
        assert!(sink.iter().any(|d| d.code == codes::EVAL_RECURSIVE_LOOP));
    }

    #[test]
    fn split_top_level_commas_ignores_nested_parens() {
        let parts = split_top_level_commas("%.o,%.c,$(call f,a,b)");
        assert_eq!(parts, vec!["%.o", "%.c", "$(call f,a,b)"]);
    }
}
