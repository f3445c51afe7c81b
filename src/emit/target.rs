//! Per-target CMake fragment rendering (spec.md §4.9). One function per
//! target kind, mirroring the factory-per-kind shape a generator naturally
//! falls into once executables, libraries and custom targets each need their
//! own declaration statement but share the same property-setting tail.

use crate::ir::types::{LinkLibrary, Project, Target, TargetType};

fn quote_list(items: &[String]) -> String {
    items.join(" ")
}

fn declaration(target: &Target) -> Option<String> {
    let sources = target.sources.iter().map(|s| s.path.clone()).collect::<Vec<_>>();
    match target.kind {
        TargetType::Executable => Some(format!(
            "add_executable({} {})",
            target.physical_name,
            quote_list(&sources)
        )),
        TargetType::StaticLibrary => Some(format!(
            "add_library({} STATIC {})",
            target.physical_name,
            quote_list(&sources)
        )),
        TargetType::SharedLibrary => Some(format!(
            "add_library({} SHARED {})",
            target.physical_name,
            quote_list(&sources)
        )),
        TargetType::ObjectLibrary => Some(format!(
            "add_library({} OBJECT {})",
            target.physical_name,
            quote_list(&sources)
        )),
        TargetType::Interface => Some(format!("add_library({} INTERFACE)", target.physical_name)),
        TargetType::Imported => Some(format!(
            "add_library({} UNKNOWN IMPORTED)",
            target.physical_name
        )),
        TargetType::Custom => target.custom_command.as_ref().map(|spec| {
            let inputs = quote_list(&spec.inputs);
            let commands = spec
                .recipe
                .iter()
                .map(|line| format!("  COMMAND {line}"))
                .collect::<Vec<_>>()
                .join("\n");
            if inputs.is_empty() {
                format!("add_custom_target({}\n{}\n)", target.physical_name, commands)
            } else {
                format!(
                    "add_custom_target({}\n  DEPENDS {}\n{}\n)",
                    target.physical_name, inputs, commands
                )
            }
        }),
    }
}

fn link_library_name(lib: &LinkLibrary) -> &str {
    match lib {
        LinkLibrary::Internal(name) => name,
        LinkLibrary::External(name) => name,
        LinkLibrary::Imported(name) => name,
    }
}

/// Renders one target's full CMake fragment, or `None` when its type or
/// recipe could not be mapped (spec.md §4.9's unmappable-target fallback).
pub fn render(target: &Target, project: &Project, has_globals: bool) -> Option<String> {
    let decl = declaration(target)?;
    let mut out = String::new();
    out.push_str(&decl);
    out.push('\n');

    let vis = target.visibility.to_string();

    for source in target.sources.iter().filter(|s| !s.flags.is_empty()) {
        out.push_str(&format!(
            "set_source_files_properties({} PROPERTIES COMPILE_OPTIONS \"{}\")\n",
            source.path,
            source.flags.join(";")
        ));
    }

    if !target.include_dirs.is_empty() {
        out.push_str(&format!(
            "target_include_directories({} {} {})\n",
            target.physical_name,
            vis,
            quote_list(&target.include_dirs)
        ));
    }
    if !target.defines.is_empty() {
        out.push_str(&format!(
            "target_compile_definitions({} {} {})\n",
            target.physical_name,
            vis,
            quote_list(&target.defines)
        ));
    }
    if !target.compile_options.is_empty() {
        out.push_str(&format!(
            "target_compile_options({} {} {})\n",
            target.physical_name,
            vis,
            quote_list(&target.compile_options)
        ));
    }
    if !target.link_options.is_empty() {
        out.push_str(&format!(
            "target_link_options({} {} {})\n",
            target.physical_name,
            vis,
            quote_list(&target.link_options)
        ));
    }

    let mut link_names: Vec<String> = target.link_libraries.iter().map(|l| link_library_name(l).to_string()).collect();
    if has_globals && target.kind != TargetType::Interface {
        link_names.push(format!("{}::GlobalOptions", project.namespace));
    }
    if !link_names.is_empty() {
        out.push_str(&format!(
            "target_link_libraries({} {} {})\n",
            target.physical_name,
            vis,
            link_names.join(" ")
        ));
    }

    if !target.dependencies.is_empty() {
        out.push_str(&format!(
            "add_dependencies({} {})\n",
            target.physical_name,
            quote_list(&target.dependencies)
        ));
    }

    if let Some(alias) = &target.alias {
        out.push_str(&format!(
            "add_library({} ALIAS {})\n",
            alias, target.physical_name
        ));
    }

    Some(out)
}
