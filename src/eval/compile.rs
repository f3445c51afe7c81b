//! Compile inference (spec.md §4.7): recognizes compiler invocations inside
//! an already-expanded recipe line and extracts include dirs, defines, the
//! output artifact and candidate source tokens.

use crate::diagnostics::{codes, Diagnostic, DiagnosticSink, Severity};
use crate::location::SourceLocation;
use crate::model::Language;

const COMPILER_PREFIXES: &[&str] = &[
    "cc", "gcc", "clang", "c++", "g++", "clang++", "cl", "as", "nasm",
];

#[derive(Debug, Clone)]
pub struct InferredCompile {
    pub source: String,
    pub output: String,
    pub language: Language,
    pub flags: Vec<String>,
    pub include_dirs: Vec<String>,
    pub defines: Vec<String>,
    pub location: SourceLocation,
}

fn compiler_basename(token: &str) -> &str {
    token.rsplit('/').next().unwrap_or(token)
}

fn strip_leading_assignments(tokens: &[&str]) -> usize {
    let mut i = 0;
    while i < tokens.len() {
        let t = tokens[i];
        if let Some(eq) = t.find('=') {
            let name = &t[..eq];
            if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                i += 1;
                continue;
            }
        }
        break;
    }
    i
}

fn language_from_compiler(basename: &str) -> Option<Language> {
    match basename {
        "g++" | "clang++" | "c++" => Some(Language::Cpp),
        "as" | "nasm" => Some(Language::Asm),
        _ => None,
    }
}

fn language_from_extension(path: &str) -> Language {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".cc") || lower.ends_with(".cpp") || lower.ends_with(".cxx") || lower.ends_with(".c++") {
        Language::Cpp
    } else if lower.ends_with(".c") {
        Language::C
    } else if lower.ends_with(".s") || lower.ends_with(".asm") {
        Language::Asm
    } else {
        Language::Other
    }
}

/// Attempts to recognize `line` as a compiler invocation. Returns one
/// `InferredCompile` per candidate source token sharing the line's output
/// artifact, or an empty vector if the line is not a recognized compile.
pub fn infer_recipe_line(
    line: &str,
    fallback_output: Option<&str>,
    location: &SourceLocation,
    sink: &mut DiagnosticSink,
) -> Vec<InferredCompile> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return Vec::new();
    }
    let start = strip_leading_assignments(&tokens);
    if start >= tokens.len() {
        return Vec::new();
    }
    let compiler = tokens[start];
    let basename = compiler_basename(compiler);
    if !COMPILER_PREFIXES.contains(&basename) {
        return Vec::new();
    }

    let mut include_dirs = Vec::new();
    let mut defines = Vec::new();
    let mut flags = Vec::new();
    let mut sources = Vec::new();
    let mut output: Option<String> = None;

    let rest = &tokens[start + 1..];
    let mut i = 0;
    while i < rest.len() {
        let tok = rest[i];
        if tok == "-I" {
            if let Some(next) = rest.get(i + 1) {
                include_dirs.push(next.to_string());
                i += 2;
                continue;
            }
        } else if let Some(path) = tok.strip_prefix("-I") {
            if !path.is_empty() {
                include_dirs.push(path.to_string());
                i += 1;
                continue;
            }
        } else if tok == "-D" {
            if let Some(next) = rest.get(i + 1) {
                defines.push(next.to_string());
                i += 2;
                continue;
            }
        } else if let Some(def) = tok.strip_prefix("-D") {
            if !def.is_empty() {
                defines.push(def.to_string());
                i += 1;
                continue;
            }
        } else if tok == "-o" {
            if let Some(next) = rest.get(i + 1) {
                output = Some(next.to_string());
                i += 2;
                continue;
            }
        } else if tok.starts_with('-') {
            flags.push(tok.to_string());
            i += 1;
            continue;
        } else {
            sources.push(tok.to_string());
            i += 1;
            continue;
        }
        i += 1;
    }

    let output = match output.or_else(|| fallback_output.map(|s| s.to_string())) {
        Some(o) => o,
        None => {
            sink.push(
                Diagnostic::new(
                    Severity::Warn,
                    codes::EVAL_NO_SOURCE,
                    format!("compile recipe \"{line}\" has no -o output and no fallback target"),
                )
                .with_location(location.clone()),
            );
            return Vec::new();
        }
    };

    let language = language_from_compiler(basename)
        .unwrap_or_else(|| sources.first().map(|s| language_from_extension(s)).unwrap_or(Language::C));

    if sources.is_empty() {
        sink.push(
            Diagnostic::new(
                Severity::Warn,
                codes::EVAL_NO_SOURCE,
                format!("compile recipe \"{line}\" produced no recognizable source token"),
            )
            .with_location(location.clone()),
        );
        return Vec::new();
    }

    sources
        .into_iter()
        .map(|source| InferredCompile {
            source,
            output: output.clone(),
            language,
            flags: flags.clone(),
            include_dirs: include_dirs.clone(),
            defines: defines.clone(),
            location: location.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_gcc_compile_line() {
        let mut sink = DiagnosticSink::new();
        let loc = SourceLocation::at_start("Makefile");
        let result = infer_recipe_line("gcc -c main.c -o main.o -Iinclude -DFOO", None, &loc, &mut sink);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].source, "main.c");
        assert_eq!(result[0].output, "main.o");
        assert_eq!(result[0].include_dirs, vec!["include"]);
        assert_eq!(result[0].defines, vec!["FOO"]);
        assert_eq!(result[0].language, Language::C);
    }

    #[test]
    fn non_compiler_line_is_not_recognized() {
        let mut sink = DiagnosticSink::new();
        let loc = SourceLocation::at_start("Makefile");
        assert!(infer_recipe_line("rm -f *.o", None, &loc, &mut sink).is_empty());
    }

    #[test]
    fn missing_output_falls_back_to_rule_target_and_warns_if_absent() {
        let mut sink = DiagnosticSink::new();
        let loc = SourceLocation::at_start("Makefile");
        let result = infer_recipe_line("gcc -c main.c", Some("main.o"), &loc, &mut sink);
        assert_eq!(result[0].output, "main.o");
        assert!(sink.is_empty());
    }

    #[test]
    fn cpp_compiler_forces_cpp_language() {
        let mut sink = DiagnosticSink::new();
        let loc = SourceLocation::at_start("Makefile");
        let result = infer_recipe_line("g++ -c main.c -o main.o", None, &loc, &mut sink);
        assert_eq!(result[0].language, Language::Cpp);
    }
}
