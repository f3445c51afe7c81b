//! IR Builder (spec.md §4.8): turns `BuildFacts` + `Config` into the
//! `Project` IR the Emitter consumes. Grouping, classification, dependency
//! attachment and ordering all happen here; nothing downstream touches a
//! syntax tree or a variable environment again.

pub mod types;

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::Config;
use crate::diagnostics::{codes, Diagnostic, DiagnosticSink, Severity};
use crate::eval::compile::InferredCompile;
use crate::eval::{BuildFacts, CustomCommand, EvaluatedRule};
use crate::fs::FilesystemBoundary;
use crate::model::{Language, LinkClassification};
use crate::unknown::UnknownConstructRegistry;

use types::{CustomCommandSpec, LinkLibrary, Project, SourceFile, Target, TargetType};

/// One source-file-to-artifact compile fact, still tagged with whether its
/// `source` token is itself a build artifact (a link step) or a real file on
/// disk (an actual compile).
#[derive(Debug, Clone)]
struct GroupEntry {
    source: String,
    language: Language,
    flags: Vec<String>,
    include_dirs: Vec<String>,
    defines: Vec<String>,
}

fn target_type_for_output(output: &str) -> TargetType {
    let lower = output.to_ascii_lowercase();
    let ext = std::path::Path::new(&lower)
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_string());
    match ext.as_deref() {
        None | Some("exe") => TargetType::Executable,
        Some("a") | Some("lib") => TargetType::StaticLibrary,
        Some("so") | Some("dylib") | Some("dll") => TargetType::SharedLibrary,
        Some("o") | Some("obj") => TargetType::ObjectLibrary,
        _ => TargetType::Custom,
    }
}

fn is_library(kind: &TargetType) -> bool {
    matches!(
        kind,
        TargetType::StaticLibrary | TargetType::SharedLibrary | TargetType::ObjectLibrary
    )
}

/// Sanitizes a target's physical name: strips the directory and extension
/// and, for library artifacts, the conventional `lib` prefix (spec.md §4.8
/// "Name and alias assignment").
fn physical_name(output: &str, kind: &TargetType) -> String {
    let base = crate::fs::basename(std::path::Path::new(output));
    let stem = std::path::Path::new(&base)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or(base);
    let stripped = if is_library(kind) {
        stem.strip_prefix("lib").unwrap_or(&stem).to_string()
    } else {
        stem
    };
    stripped
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '+' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Matches a `%`-pattern against a concrete word, returning the bound stem.
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

fn substitute_automatic(text: &str, target: &str, source: &str) -> String {
    text.replace("$@", target).replace("$<", source)
}

/// Pattern rule instantiation is deferred to the IR Builder (spec.md §9): a
/// pattern rule stays symbolic until a concrete prerequisite exists on disk
/// that matches its prerequisite pattern after stem substitution.
fn instantiate_pattern_rules(
    facts: &BuildFacts,
    filesystem: &dyn FilesystemBoundary,
    sink: &mut DiagnosticSink,
) -> Vec<InferredCompile> {
    let mut already_produced: HashSet<&str> = facts
        .inferred_compiles
        .iter()
        .map(|c| c.output.as_str())
        .collect();
    already_produced.extend(facts.custom_commands.iter().map(|c| c.output.as_str()));

    let mut out = Vec::new();
    for rule in &facts.evaluated_rules {
        for target in &rule.targets {
            for prereq in &rule.prerequisites {
                if already_produced.contains(prereq.as_str()) {
                    continue;
                }
                for pattern in &facts.pattern_rules {
                    let Some(pattern_target) = pattern.targets.first() else {
                        continue;
                    };
                    let Some(stem) = stem_match(pattern_target, prereq) else {
                        continue;
                    };
                    let Some(prereq_pattern) = pattern.prerequisites.first() else {
                        continue;
                    };
                    let concrete_source = prereq_pattern.replacen('%', &stem, 1);
                    if !filesystem.exists(std::path::Path::new(&concrete_source)) {
                        continue;
                    }
                    for recipe_line in &pattern.recipe {
                        let substituted = substitute_automatic(recipe_line, prereq, &concrete_source);
                        let compiles = crate::eval::compile::infer_recipe_line(
                            &substituted,
                            Some(prereq.as_str()),
                            &pattern.location,
                            sink,
                        );
                        if !compiles.is_empty() {
                            out.extend(compiles);
                            break;
                        }
                    }
                    // A concrete match was found for this prerequisite;
                    // stop trying other pattern rules for it.
                    let _ = target;
                    break;
                }
            }
        }
    }
    out
}

#[derive(Default)]
struct BuiltTarget {
    target: Target,
    /// Raw (unmapped, unclassified) link tokens collected from `-l` flags
    /// and artifact references, kept around until every target's physical
    /// name is known so internal references can resolve to an alias.
    raw_link_tokens: Vec<String>,
}

/// Splits a flag list into (remaining flags, raw `-l` library tokens).
fn split_link_flags(flags: &[String]) -> (Vec<String>, Vec<String>) {
    let mut remaining = Vec::new();
    let mut libs = Vec::new();
    for flag in flags {
        if let Some(name) = flag.strip_prefix("-l") {
            if !name.is_empty() {
                libs.push(name.to_string());
                continue;
            }
        }
        remaining.push(flag.clone());
    }
    (remaining, libs)
}

fn dedup_push(vec: &mut Vec<String>, value: String) {
    if !vec.contains(&value) {
        vec.push(value);
    }
}

pub fn build(
    facts: &BuildFacts,
    config: &Config,
    filesystem: &dyn FilesystemBoundary,
    sink: &mut DiagnosticSink,
    unknown: &mut UnknownConstructRegistry,
) -> Project {
    let pattern_instantiated = instantiate_pattern_rules(facts, filesystem, sink);

    let mut all_compiles: Vec<InferredCompile> = facts.inferred_compiles.clone();
    all_compiles.extend(pattern_instantiated);

    let ignored = |path: &str| -> bool {
        config
            .ignore_paths
            .iter()
            .any(|pattern| pattern == path || path.starts_with(pattern.trim_end_matches('/')))
    };
    all_compiles.retain(|c| !ignored(&c.source) && !ignored(&c.output));
    let custom_commands: Vec<&CustomCommand> = facts
        .custom_commands
        .iter()
        .filter(|c| !ignored(&c.output))
        .collect();

    let mut produced_outputs: HashSet<String> = all_compiles.iter().map(|c| c.output.clone()).collect();
    produced_outputs.extend(custom_commands.iter().map(|c| c.output.clone()));

    let mut groups: BTreeMap<String, Vec<GroupEntry>> = BTreeMap::new();
    for compile in &all_compiles {
        groups.entry(compile.output.clone()).or_default().push(GroupEntry {
            source: compile.source.clone(),
            language: compile.language,
            flags: compile.flags.clone(),
            include_dirs: compile.include_dirs.clone(),
            defines: compile.defines.clone(),
        });
    }

    // consumed_by[x] = outputs that reference x as an entry source.
    let mut consumed_by: HashMap<String, Vec<String>> = HashMap::new();
    for (output, entries) in &groups {
        for entry in entries {
            if produced_outputs.contains(&entry.source) {
                consumed_by.entry(entry.source.clone()).or_default().push(output.clone());
            }
        }
    }

    // An object-artifact group consumed by exactly one other group, and
    // which is not itself a link step, is inlined into its sole consumer
    // rather than emitted as a standalone object_library target: GNU Make's
    // implicit `.o` intermediates have no useful standalone CMake
    // counterpart (documented in DESIGN.md).
    let mut inlined: HashSet<String> = HashSet::new();
    for (output, entries) in &groups {
        let kind = target_type_for_output(output);
        if kind != TargetType::ObjectLibrary {
            continue;
        }
        let has_artifact_entry = entries.iter().any(|e| produced_outputs.contains(&e.source));
        if has_artifact_entry {
            continue;
        }
        if consumed_by.get(output).map(|v| v.len()) == Some(1) {
            inlined.insert(output.clone());
        }
    }

    let mut built: BTreeMap<String, BuiltTarget> = BTreeMap::new();

    for (output, entries) in &groups {
        if inlined.contains(output) {
            continue;
        }
        let kind = target_type_for_output(output);
        let name = physical_name(output, &kind);
        let mut target = Target::new(name, kind.clone());

        let (real_entries, artifact_entries): (Vec<_>, Vec<_>) =
            entries.iter().cloned().partition(|e| !produced_outputs.contains(&e.source));

        let mut flattened = real_entries;
        for artifact_entry in &artifact_entries {
            if inlined.contains(&artifact_entry.source) {
                if let Some(inlined_entries) = groups.get(&artifact_entry.source) {
                    flattened.extend(inlined_entries.clone());
                }
            }
        }

        let mut raw_link_tokens = Vec::new();
        let mut seen_sources: HashMap<String, usize> = HashMap::new();
        for entry in &flattened {
            let (remaining_flags, libs) = split_link_flags(&entry.flags);
            raw_link_tokens.extend(libs);
            if let Some(&idx) = seen_sources.get(&entry.source) {
                let existing: &mut SourceFile = &mut target.sources[idx];
                for flag in &remaining_flags {
                    dedup_push(&mut existing.flags, flag.clone());
                }
            } else {
                seen_sources.insert(entry.source.clone(), target.sources.len());
                target.sources.push(SourceFile {
                    path: entry.source.clone(),
                    language: entry.language,
                    flags: remaining_flags,
                });
            }
            for dir in &entry.include_dirs {
                dedup_push(&mut target.include_dirs, dir.clone());
            }
            for define in &entry.defines {
                dedup_push(&mut target.defines, define.clone());
            }
        }

        for artifact_entry in &artifact_entries {
            if inlined.contains(&artifact_entry.source) {
                continue;
            }
            let (remaining, libs) = split_link_flags(&artifact_entry.flags);
            for flag in remaining {
                dedup_push(&mut target.link_options, flag);
            }
            raw_link_tokens.extend(libs);
            // The artifact itself (e.g. a standalone object_library or an
            // internal static/shared library) is a link reference too.
            raw_link_tokens.push(artifact_entry.source.clone());
        }

        built.insert(
            output.clone(),
            BuiltTarget {
                target,
                raw_link_tokens,
            },
        );
    }

    // Custom targets: rule outputs recognized as neither executable nor
    // library, and not produced by any inferred compile at all.
    for command in &custom_commands {
        if groups.contains_key(&command.output) {
            continue;
        }
        let kind = target_type_for_output(&command.output);
        let kind = if is_library(&kind) || kind == TargetType::Executable {
            // A rule with an unrecognized recipe whose output nonetheless
            // looks like an executable/library artifact still counts as
            // "neither compile nor archive nor link could be inferred"
            // (spec.md §4.9's emitter fallback), so it is emitted as Custom.
            TargetType::Custom
        } else {
            kind
        };
        let name = physical_name(&command.output, &kind);
        let mut target = Target::new(name, kind);
        target.custom_command = Some(CustomCommandSpec {
            inputs: command.inputs.clone(),
            recipe: command.recipe.clone(),
        });
        built.insert(
            command.output.clone(),
            BuiltTarget {
                target,
                raw_link_tokens: command.inputs.clone(),
            },
        );
    }

    // Map from produced artifact path -> physical name, for resolving raw
    // link tokens and rule-level dependency prerequisites.
    let artifact_to_name: HashMap<String, String> = built
        .iter()
        .map(|(output, bt)| (output.clone(), bt.target.physical_name.clone()))
        .collect();

    apply_config_and_classify(&mut built, config, &artifact_to_name, sink);
    attach_dependencies(&mut built, facts, &artifact_to_name, sink);
    apply_global_dedup(&mut built, &facts.project_globals, sink);

    let mut targets: Vec<Target> = built.into_values().map(|bt| bt.target).collect();

    // I1: duplicate physical names.
    let mut seen_names: HashSet<String> = HashSet::new();
    for target in &targets {
        if !seen_names.insert(target.physical_name.clone()) {
            sink.push(Diagnostic::new(
                Severity::Error,
                codes::IR_DUP_TARGET,
                format!("duplicate target physical name \"{}\"", target.physical_name),
            ));
        }
    }

    finalize_ordering(&mut targets);

    let languages = resolve_languages(config, &targets);

    let _ = unknown; // reserved for future IR-level unknown-construct reporting.

    Project {
        name: config.project_name.clone(),
        version: config.version.clone(),
        namespace: config.namespace.clone(),
        languages,
        targets,
        project_globals: facts.project_globals.clone(),
    }
}

/// Library role classification (spec.md §4.8) plus application of
/// `target_mappings`/`flag_mappings`/`link_overrides` from configuration.
fn apply_config_and_classify(
    built: &mut BTreeMap<String, BuiltTarget>,
    config: &Config,
    artifact_to_name: &HashMap<String, String>,
    sink: &mut DiagnosticSink,
) {
    // Assign aliases to internal libraries before classifying references so
    // other targets can prefer them (I2).
    for bt in built.values_mut() {
        if is_library(&bt.target.kind) {
            bt.target.alias = Some(format!("{}::{}", config.namespace, bt.target.physical_name));
        }
    }

    let outputs: Vec<String> = built.keys().cloned().collect();
    let mut unmapped_flags_seen: HashSet<String> = HashSet::new();

    for output in &outputs {
        let raw_tokens = built.get(output).unwrap().raw_link_tokens.clone();
        let mut link_libraries = Vec::new();
        for token in raw_tokens {
            let classification = classify(&token, artifact_to_name, config);
            let lib = match classification {
                LinkClassification::Internal => {
                    let physical = artifact_to_name
                        .get(&token)
                        .cloned()
                        .or_else(|| artifact_to_name.get(&format!("lib{token}.a")).cloned())
                        .or_else(|| artifact_to_name.get(&format!("lib{token}.so")).cloned())
                        .unwrap_or_else(|| token.clone());
                    let alias = built
                        .values()
                        .find(|bt| bt.target.physical_name == physical)
                        .and_then(|bt| bt.target.alias.clone());
                    LinkLibrary::Internal(alias.unwrap_or(physical))
                }
                LinkClassification::External => LinkLibrary::External(token.clone()),
                LinkClassification::Imported { imported_target } => {
                    LinkLibrary::Imported(imported_target)
                }
            };
            if !link_libraries.contains(&lib) {
                link_libraries.push(lib);
            }
        }

        let bt = built.get_mut(output).unwrap();
        bt.target.link_libraries = link_libraries;

        if let Some(mapping) = config.target_mappings.get(output).or_else(|| {
            config
                .target_mappings
                .get(&bt.target.physical_name)
        }) {
            if let Some(dest) = &mapping.dest_name {
                bt.target.physical_name = dest.clone();
                if is_library(&bt.target.kind) {
                    bt.target.alias = Some(format!("{}::{}", config.namespace, dest));
                }
            }
            if let Some(type_override) = &mapping.type_override {
                if let Some(kind) = parse_target_type(type_override) {
                    bt.target.kind = kind;
                }
            }
            for lib in &mapping.link_libs {
                bt.target.link_libraries.push(LinkLibrary::External(lib.clone()));
            }
            for dir in &mapping.include_dirs {
                dedup_push(&mut bt.target.include_dirs, dir.clone());
            }
            for define in &mapping.defines {
                dedup_push(&mut bt.target.defines, define.clone());
            }
            for opt in &mapping.options {
                dedup_push(&mut bt.target.compile_options, opt.clone());
            }
            if let Some(visibility) = mapping.visibility {
                bt.target.visibility = visibility;
            }
        }

        // flag_mappings: textual substitution on compile/link options,
        // first-occurrence order preserved, deduplicated.
        remap_flags(&mut bt.target.compile_options, config, &mut unmapped_flags_seen, sink);
        remap_flags(&mut bt.target.link_options, config, &mut unmapped_flags_seen, sink);
    }
}

fn remap_flags(
    flags: &mut Vec<String>,
    config: &Config,
    unmapped_seen: &mut HashSet<String>,
    sink: &mut DiagnosticSink,
) {
    let mut mapped = Vec::new();
    for flag in flags.drain(..) {
        let replacement = config.flag_mappings.get(&flag).cloned();
        match replacement {
            Some(r) => dedup_push(&mut mapped, r),
            None => {
                if unmapped_seen.insert(flag.clone()) {
                    sink.push(Diagnostic::new(
                        Severity::Warn,
                        codes::IR_UNMAPPED_FLAG,
                        format!("flag \"{flag}\" has no configured mapping; passed through verbatim"),
                    ));
                }
                dedup_push(&mut mapped, flag);
            }
        }
    }
    *flags = mapped;
}

fn parse_target_type(raw: &str) -> Option<TargetType> {
    match raw {
        "executable" => Some(TargetType::Executable),
        "static_library" => Some(TargetType::StaticLibrary),
        "shared_library" => Some(TargetType::SharedLibrary),
        "object_library" => Some(TargetType::ObjectLibrary),
        "interface" => Some(TargetType::Interface),
        "imported" => Some(TargetType::Imported),
        "custom" => Some(TargetType::Custom),
        _ => None,
    }
}

fn classify(
    token: &str,
    artifact_to_name: &HashMap<String, String>,
    config: &Config,
) -> LinkClassification {
    if let Some(over) = config.link_overrides.get(token) {
        return over.classification.clone();
    }
    if artifact_to_name.contains_key(token)
        || artifact_to_name.contains_key(&format!("lib{token}.a"))
        || artifact_to_name.contains_key(&format!("lib{token}.so"))
    {
        return LinkClassification::Internal;
    }
    let looks_like_path = token.contains('/') || token.starts_with('.');
    if looks_like_path && std::path::Path::new(token).is_absolute() {
        return LinkClassification::External;
    }
    LinkClassification::External
}

/// Dependency attachment (spec.md §4.8): for each evaluated rule whose
/// primary target matches a built artifact, the set of prerequisites that
/// themselves resolve to produced artifacts becomes that target's
/// `dependencies`. Unresolvable names already left as plain strings in the
/// rule are reported once (`IR_UNKNOWN_DEP`) and then dropped, since they do
/// not name a target this IR can express a dependency edge to.
fn attach_dependencies(
    built: &mut BTreeMap<String, BuiltTarget>,
    facts: &BuildFacts,
    artifact_to_name: &HashMap<String, String>,
    sink: &mut DiagnosticSink,
) {
    let alias_by_output: HashMap<String, String> = built
        .iter()
        .filter_map(|(output, bt)| bt.target.alias.clone().map(|a| (output.clone(), a)))
        .collect();

    for rule in &facts.evaluated_rules {
        let Some(primary) = rule.targets.first() else {
            continue;
        };
        let Some(bt) = built.get_mut(primary) else {
            continue;
        };
        let mut deps = Vec::new();
        for prereq in rule.prerequisites.iter().chain(rule.order_only_prerequisites.iter()) {
            if let Some(name) = alias_by_output.get(prereq).or_else(|| artifact_to_name.get(prereq)) {
                dedup_push(&mut deps, name.clone());
            } else if artifact_to_name.contains_key(prereq) {
                dedup_push(&mut deps, prereq.clone());
            }
        }
        if deps.is_empty() && !rule.prerequisites.is_empty() {
            let unresolved: Vec<&String> = rule
                .prerequisites
                .iter()
                .filter(|p| !artifact_to_name.contains_key(p.as_str()))
                .collect();
            for prereq in unresolved {
                sink.push(
                    Diagnostic::new(
                        Severity::Warn,
                        codes::IR_UNKNOWN_DEP,
                        format!("prerequisite \"{prereq}\" of \"{primary}\" does not resolve to a built target"),
                    )
                    .with_location(rule.location.clone()),
                );
            }
        }
        if !deps.is_empty() {
            bt.target.dependencies = deps;
        }
    }
}

/// I6: a flag/define/include already present in project globals is removed
/// from a target unless that target's own configuration explicitly
/// overrides it (modeled here as: flags that came purely from the global
/// bucket, not from `target_mappings`, are the ones eligible for removal —
/// since `target_mappings` options are appended after this pass runs, this
/// function only sees inferred compile flags). Per-file flags inferred from
/// a compile recipe live on `SourceFile::flags`, not `Target::compile_options`
/// (which only ever holds `target_mappings`-supplied options); each source is
/// checked against its own language's bucket, not one bucket picked for the
/// whole target, so a target mixing `.c` and `.cpp` sources still strips a
/// duplicated `CFLAGS` entry from its C sources and a duplicated `CXXFLAGS`
/// entry from its C++ sources.
fn apply_global_dedup(
    built: &mut BTreeMap<String, BuiltTarget>,
    globals: &crate::eval::project_globals::ProjectGlobals,
    sink: &mut DiagnosticSink,
) {
    let mut reported: HashSet<(String, String)> = HashSet::new();
    for bt in built.values_mut() {
        let target = &mut bt.target;

        // A target's own `compile_options` (target_mappings-supplied, not
        // tied to any one source) is checked against every language bucket
        // in play for this target, since it isn't scoped to a single source.
        let target_redundant: HashSet<String> = globals
            .all_flags
            .iter()
            .cloned()
            .chain(
                languages_in(target)
                    .iter()
                    .flat_map(|lang| bucket_for_language(*lang, globals).iter().cloned()),
            )
            .collect();
        let physical_name = target.physical_name.clone();
        target.compile_options.retain(|flag| {
            retain_redundant(&mut reported, sink, &physical_name, flag, &target_redundant)
        });

        // Each source's own inferred flags are only redundant against the
        // bucket for *that source's* language (plus `all_flags`) — a `.c`
        // source does not get its flags stripped against `CXXFLAGS`, and
        // vice versa (I6, spec.md line 73).
        for source in &mut target.sources {
            let redundant: HashSet<String> = globals
                .all_flags
                .iter()
                .cloned()
                .chain(bucket_for_language(source.language, globals).iter().cloned())
                .collect();
            source
                .flags
                .retain(|flag| retain_redundant(&mut reported, sink, &physical_name, flag, &redundant));
        }

        let redundant_defines: HashSet<&String> = globals.defines.iter().collect();
        target.defines.retain(|d| !redundant_defines.contains(d));
        let redundant_includes: HashSet<&String> = globals.includes.iter().collect();
        target.include_dirs.retain(|d| !redundant_includes.contains(d));
    }
}

fn retain_redundant(
    reported: &mut HashSet<(String, String)>,
    sink: &mut DiagnosticSink,
    physical_name: &str,
    flag: &str,
    redundant: &HashSet<String>,
) -> bool {
    let keep = !redundant.contains(flag);
    if !keep && reported.insert((physical_name.to_string(), flag.to_string())) {
        sink.push(Diagnostic::new(
            Severity::Info,
            codes::IR_REDUNDANT_FLAG,
            format!("flag \"{flag}\" on target \"{physical_name}\" duplicates a project-global flag; removed"),
        ));
    }
    keep
}

fn bucket_for_language(language: Language, globals: &crate::eval::project_globals::ProjectGlobals) -> &[String] {
    match language {
        Language::Cpp => &globals.cpp_flags,
        Language::Asm => &globals.asm_flags,
        Language::C | Language::Other => &globals.c_flags,
    }
}

fn languages_in(target: &Target) -> HashSet<Language> {
    target.sources.iter().map(|s| s.language).collect()
}

/// Ordering (spec.md §4.8): targets by physical name, sources within a
/// target by path, link libraries in a stable internal/external/imported
/// partition, each partition sorted lexicographically.
fn finalize_ordering(targets: &mut [Target]) {
    for target in targets.iter_mut() {
        target.sources.sort_by(|a, b| a.path.cmp(&b.path));
        target.include_dirs.sort();
        target.include_dirs.dedup();
        target.defines.sort();
        target.defines.dedup();
        target.compile_options.sort();
        target.link_options.sort();
        target.dependencies.sort();
        target.dependencies.dedup();

        let (mut internal, mut external, mut imported): (Vec<_>, Vec<_>, Vec<_>) =
            (Vec::new(), Vec::new(), Vec::new());
        for lib in target.link_libraries.drain(..) {
            match lib {
                LinkLibrary::Internal(n) => internal.push(n),
                LinkLibrary::External(n) => external.push(n),
                LinkLibrary::Imported(n) => imported.push(n),
            }
        }
        internal.sort();
        external.sort();
        imported.sort();
        target.link_libraries = internal
            .into_iter()
            .map(LinkLibrary::Internal)
            .chain(external.into_iter().map(LinkLibrary::External))
            .chain(imported.into_iter().map(LinkLibrary::Imported))
            .collect();
    }
    targets.sort_by(|a, b| a.physical_name.cmp(&b.physical_name));
}

fn resolve_languages(config: &Config, targets: &[Target]) -> HashSet<Language> {
    if let Some(langs) = &config.languages {
        return langs.clone();
    }
    let mut set: HashSet<Language> = targets
        .iter()
        .flat_map(|t| t.sources.iter().map(|s| s.language))
        .filter(|l| *l != Language::Other)
        .collect();
    if set.is_empty() {
        set.insert(Language::C);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::project_globals::ProjectGlobals;
    use crate::fs::MemoryFilesystem;
    use crate::location::SourceLocation;
    use crate::unknown::UnknownConstructRegistry;

    fn compile(source: &str, output: &str, language: Language) -> InferredCompile {
        InferredCompile {
            source: source.to_string(),
            output: output.to_string(),
            language,
            flags: Vec::new(),
            include_dirs: Vec::new(),
            defines: Vec::new(),
            location: SourceLocation::at_start("Makefile"),
        }
    }

    fn rule(targets: &[&str], prereqs: &[&str]) -> EvaluatedRule {
        EvaluatedRule {
            targets: targets.iter().map(|s| s.to_string()).collect(),
            prerequisites: prereqs.iter().map(|s| s.to_string()).collect(),
            order_only_prerequisites: Vec::new(),
            recipe: Vec::new(),
            is_pattern: false,
            location: SourceLocation::at_start("Makefile"),
        }
    }

    #[test]
    fn single_executable_scenario_collapses_object_intermediate() {
        let mut facts = BuildFacts::default();
        facts.inferred_compiles.push(compile("main.c", "main.o", Language::C));
        facts.inferred_compiles.push(compile("main.o", "app", Language::Other));
        facts.evaluated_rules.push(rule(&["app"], &["main.o"]));
        facts.evaluated_rules.push(rule(&["main.o"], &["main.c"]));

        let config = Config::default();
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let project = build(&facts, &config, &memfs, &mut sink, &mut unknown);

        assert_eq!(project.targets.len(), 1);
        let app = &project.targets[0];
        assert_eq!(app.physical_name, "app");
        assert_eq!(app.kind, TargetType::Executable);
        assert_eq!(app.sources.len(), 1);
        assert_eq!(app.sources[0].path, "main.c");
        assert!(app.alias.is_none());
    }

    #[test]
    fn internal_library_gets_alias_and_is_linked_by_executable() {
        let mut facts = BuildFacts::default();
        facts.inferred_compiles.push(compile("foo.c", "libfoo.a", Language::C));
        facts.inferred_compiles.push({
            let mut c = compile("main.c", "app", Language::C);
            c.flags.push("-lfoo".to_string());
            c
        });
        facts.evaluated_rules.push(rule(&["libfoo.a"], &["foo.c"]));
        facts.evaluated_rules.push(rule(&["app"], &["main.c"]));

        let mut config = Config::default();
        config.namespace = "MyProj".to_string();
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let project = build(&facts, &config, &memfs, &mut sink, &mut unknown);

        assert_eq!(project.targets.len(), 2);
        let foo = project.targets.iter().find(|t| t.physical_name == "foo").unwrap();
        assert_eq!(foo.alias.as_deref(), Some("MyProj::foo"));
        let app = project.targets.iter().find(|t| t.physical_name == "app").unwrap();
        assert_eq!(app.link_libraries, vec![LinkLibrary::Internal("MyProj::foo".to_string())]);
    }

    #[test]
    fn pattern_rule_instantiates_exactly_one_compile() {
        let mut facts = BuildFacts::default();
        facts.pattern_rules.push(EvaluatedRule {
            targets: vec!["%.o".to_string()],
            prerequisites: vec!["%.c".to_string()],
            order_only_prerequisites: Vec::new(),
            recipe: vec!["gcc -c $< -o $@".to_string()],
            is_pattern: true,
            location: SourceLocation::at_start("Makefile"),
        });
        facts.inferred_compiles.push(compile("main.o", "app", Language::Other));
        facts.evaluated_rules.push(rule(&["app"], &["main.o"]));

        let config = Config::default();
        let memfs = MemoryFilesystem::new().with_file("main.c", "int main(){}");
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let project = build(&facts, &config, &memfs, &mut sink, &mut unknown);

        let app = project.targets.iter().find(|t| t.physical_name == "app").unwrap();
        assert_eq!(app.sources.len(), 1);
        assert_eq!(app.sources[0].path, "main.c");
    }

    #[test]
    fn duplicate_physical_names_raise_ir_dup_target() {
        let mut facts = BuildFacts::default();
        facts.inferred_compiles.push(compile("a.c", "out/app", Language::C));
        facts.inferred_compiles.push(compile("b.c", "other/app", Language::C));
        let config = Config::default();
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let _ = build(&facts, &config, &memfs, &mut sink, &mut unknown);
        assert!(sink.iter().any(|d| d.code == codes::IR_DUP_TARGET));
    }

    #[test]
    fn global_flag_is_removed_from_target_once_with_info_diagnostic() {
        let mut facts = BuildFacts::default();
        let globals = &mut facts.project_globals;
        globals.record("CFLAGS", "-O2", std::sync::Arc::from("config.mk"));
        let mut c = compile("main.c", "app", Language::C);
        c.flags.push("-O2".to_string());
        facts.inferred_compiles.push(c);

        let config = Config::default();
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let project = build(&facts, &config, &memfs, &mut sink, &mut unknown);
        let app = project.targets.iter().find(|t| t.physical_name == "app").unwrap();
        assert!(!app.sources[0].flags.contains(&"-O2".to_string()));
        assert!(sink.iter().any(|d| d.code == codes::IR_REDUNDANT_FLAG));
    }

    #[test]
    fn global_dedup_checks_each_source_against_its_own_language_bucket() {
        let mut facts = BuildFacts::default();
        let globals = &mut facts.project_globals;
        globals.record("CFLAGS", "-O2", std::sync::Arc::from("config.mk"));
        globals.record("CXXFLAGS", "-std=c++17", std::sync::Arc::from("config.mk"));

        let mut c_source = compile("main.c", "app", Language::C);
        c_source.flags.push("-O2".to_string());
        let mut cpp_source = compile("util.cpp", "app", Language::Cpp);
        cpp_source.flags.push("-std=c++17".to_string());
        // A C-bucket flag on a C++ source is not a duplicate of any CXX
        // global and must survive.
        cpp_source.flags.push("-O2".to_string());
        facts.inferred_compiles.push(c_source);
        facts.inferred_compiles.push(cpp_source);

        let config = Config::default();
        let memfs = MemoryFilesystem::new();
        let mut sink = DiagnosticSink::new();
        let mut unknown = UnknownConstructRegistry::new();
        let project = build(&facts, &config, &memfs, &mut sink, &mut unknown);
        let app = project.targets.iter().find(|t| t.physical_name == "app").unwrap();

        let c_src = app.sources.iter().find(|s| s.path == "main.c").unwrap();
        assert!(!c_src.flags.contains(&"-O2".to_string()));

        let cpp_src = app.sources.iter().find(|s| s.path == "util.cpp").unwrap();
        assert!(!cpp_src.flags.contains(&"-std=c++17".to_string()));
        assert!(
            cpp_src.flags.contains(&"-O2".to_string()),
            "a CFLAGS-bucket flag should not be stripped from a C++ source"
        );
    }
}
