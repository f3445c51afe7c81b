//! Emitter (spec.md §4.9): a pure function from `(Project, EmitOptions)` to
//! an ordered list of `(path, content)` pairs. Nothing in this module ever
//! touches a filesystem directly — the Orchestrator decides whether to flush
//! the result through the `FilesystemBoundary`, or (in dry-run) just return
//! it.

mod global_config;
mod packaging;
mod target;

use std::collections::BTreeMap;

use crate::diagnostics::{codes, Diagnostic, DiagnosticSink, Severity};
use crate::ir::types::{Project, Target};
use crate::model::Language;
use crate::unknown::{Category, CMakeStatus, Context, Impact, NewUnknownConstruct, Phase, SuggestedAction, UnknownConstructRegistry};

#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    pub packaging_enabled: bool,
}

/// Groups targets by the longest common directory prefix of their source
/// files, relative to the project root (spec.md §4.9 "layout planning").
/// Targets with no sources (custom targets with no tracked inputs) fall into
/// the root group.
fn group_dir_for(target: &Target) -> String {
    if target.sources.is_empty() {
        return String::new();
    }
    let mut common: Option<Vec<String>> = None;
    for source in &target.sources {
        let dir = std::path::Path::new(&source.path)
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        let components: Vec<String> = dir.split('/').filter(|s| !s.is_empty()).map(String::from).collect();
        common = Some(match common {
            None => components,
            Some(prev) => {
                prev.into_iter()
                    .zip(components)
                    .take_while(|(a, b)| a == b)
                    .map(|(a, _)| a)
                    .collect()
            }
        });
    }
    common.unwrap_or_default().join("/")
}

fn language_order(lang: Language) -> u8 {
    match lang {
        Language::C => 0,
        Language::Cpp => 1,
        Language::Asm => 2,
        Language::Other => 3,
    }
}

pub fn emit(
    project: &Project,
    options: &EmitOptions,
    sink: &mut DiagnosticSink,
    unknown: &mut UnknownConstructRegistry,
) -> Vec<(String, String)> {
    let mut files: Vec<(String, String)> = Vec::new();

    let mut groups: BTreeMap<String, Vec<&Target>> = BTreeMap::new();
    for target in &project.targets {
        groups.entry(group_dir_for(target)).or_default().push(target);
    }

    let has_globals = !project.project_globals.c_flags.is_empty()
        || !project.project_globals.cpp_flags.is_empty()
        || !project.project_globals.asm_flags.is_empty()
        || !project.project_globals.link_flags.is_empty()
        || !project.project_globals.all_flags.is_empty()
        || !project.project_globals.defines.is_empty()
        || !project.project_globals.includes.is_empty()
        || !project.project_globals.feature_toggles.is_empty();

    if has_globals {
        files.push((
            "ProjectGlobalConfig.cmake".to_string(),
            global_config::render(project),
        ));
    }

    for (dir, members) in &groups {
        if dir.is_empty() {
            continue;
        }
        let path = format!("{dir}/CMakeLists.txt");
        let content = render_subdirectory(members, project, has_globals, sink, unknown);
        files.push((path, content));
    }

    let root_group = groups.get("").cloned().unwrap_or_default();
    let root_content = render_root(
        project,
        &groups,
        has_globals,
        options.packaging_enabled,
        &root_group,
        sink,
        unknown,
    );
    files.push(("CMakeLists.txt".to_string(), root_content));

    if options.packaging_enabled {
        files.extend(packaging::render(project));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}

fn render_root(
    project: &Project,
    groups: &BTreeMap<String, Vec<&Target>>,
    has_globals: bool,
    packaging_enabled: bool,
    root_members: &[&Target],
    sink: &mut DiagnosticSink,
    unknown: &mut UnknownConstructRegistry,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "cmake_minimum_required(VERSION {})\n\n",
        crate::CMAKE_MINIMUM_VERSION
    ));

    let mut langs: Vec<Language> = project.languages.iter().copied().collect();
    langs.sort_by_key(|l| language_order(*l));
    let lang_names: Vec<&str> = langs.iter().map(|l| l.cmake_name()).collect();

    match &project.version {
        Some(v) => out.push_str(&format!(
            "project({} VERSION {} LANGUAGES {})\n\n",
            project.name,
            v,
            lang_names.join(" ")
        )),
        None => out.push_str(&format!("project({} LANGUAGES {})\n\n", project.name, lang_names.join(" "))),
    }

    if has_globals {
        out.push_str("include(ProjectGlobalConfig.cmake)\n\n");
    }

    let globals = &project.project_globals;
    let c_init: Vec<&String> = globals.c_flags.iter().chain(globals.all_flags.iter()).collect();
    if !c_init.is_empty() {
        out.push_str(&format!(
            "set(CMAKE_C_FLAGS_INIT \"{}\")\n",
            c_init.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" ")
        ));
    }
    let cpp_init: Vec<&String> = globals.cpp_flags.iter().chain(globals.all_flags.iter()).collect();
    if !cpp_init.is_empty() {
        out.push_str(&format!(
            "set(CMAKE_CXX_FLAGS_INIT \"{}\")\n",
            cpp_init.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" ")
        ));
    }
    if !c_init.is_empty() || !cpp_init.is_empty() {
        out.push('\n');
    }

    let mut subdirs: Vec<&String> = groups.keys().filter(|k| !k.is_empty()).collect();
    subdirs.sort();
    for dir in subdirs {
        out.push_str(&format!("add_subdirectory({dir})\n"));
    }

    if packaging_enabled {
        out.push('\n');
        out.push_str("include(cmake/packaging.cmake)\n");
    }

    if !root_members.is_empty() {
        out.push('\n');
        out.push_str(&render_target_block(root_members, project, has_globals, sink, unknown));
    }

    out
}

fn render_subdirectory(
    members: &[&Target],
    project: &Project,
    has_globals: bool,
    sink: &mut DiagnosticSink,
    unknown: &mut UnknownConstructRegistry,
) -> String {
    render_target_block(members, project, has_globals, sink, unknown)
}

fn render_target_block(
    members: &[&Target],
    project: &Project,
    has_globals: bool,
    sink: &mut DiagnosticSink,
    unknown: &mut UnknownConstructRegistry,
) -> String {
    let mut sorted: Vec<&&Target> = members.iter().collect();
    sorted.sort_by(|a, b| a.physical_name.cmp(&b.physical_name));
    let mut out = String::new();
    for (idx, target) in sorted.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        match target::render(target, project, has_globals) {
            Some(fragment) => out.push_str(&fragment),
            None => {
                out.push_str(&format!(
                    "# unmappable target \"{}\": no CMake target type could be inferred\n",
                    target.physical_name
                ));
                sink.push(Diagnostic::new(
                    Severity::Error,
                    codes::EMIT_UNKNOWN_TYPE,
                    format!("target \"{}\" could not be mapped to a CMake target type", target.physical_name),
                ));
                unknown.record(
                    NewUnknownConstruct {
                        category: Category::ToolchainSpecific,
                        location: crate::location::SourceLocation::at_start("<ir>"),
                        raw_snippet: crate::unknown::trim_snippet(&target.physical_name),
                        normalized_form: target.physical_name.clone(),
                        context: Context::default(),
                        impact: Impact {
                            phase: Phase::CmakeGeneration,
                            severity: Severity::Error,
                        },
                        cmake_status: CMakeStatus::NotGenerated,
                        suggested_action: SuggestedAction::ManualCustomCommand,
                    },
                    sink,
                );
            }
        }
    }
    out
}
