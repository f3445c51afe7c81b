//! `ProjectGlobalConfig.cmake` rendering (spec.md §4.9): feature toggles,
//! then an `INTERFACE` library carrying every project-global flag, define and
//! include dir, exposed under `<Namespace>::GlobalOptions`.

use crate::eval::project_globals::ToggleValue;
use crate::ir::types::Project;

pub fn render(project: &Project) -> String {
    let globals = &project.project_globals;
    let mut out = String::new();
    out.push_str("# Generated from project-global Make variables; do not edit by hand.\n\n");

    let mut toggle_names: Vec<&String> = globals.feature_toggles.keys().collect();
    toggle_names.sort();
    for name in toggle_names {
        match &globals.feature_toggles[name] {
            ToggleValue::Bool(b) => {
                out.push_str(&format!(
                    "option({} \"\" {})\n",
                    name,
                    if *b { "ON" } else { "OFF" }
                ));
            }
            ToggleValue::Str(s) => {
                out.push_str(&format!("set({name} \"{s}\" CACHE STRING \"\")\n"));
            }
        }
    }
    if !globals.feature_toggles.is_empty() {
        out.push('\n');
    }

    let interface_name = format!("{}_global_options", project.namespace);
    out.push_str(&format!("add_library({interface_name} INTERFACE)\n"));

    let mut all_flags: Vec<&String> = globals
        .c_flags
        .iter()
        .chain(globals.cpp_flags.iter())
        .chain(globals.asm_flags.iter())
        .chain(globals.all_flags.iter())
        .collect();
    all_flags.sort();
    all_flags.dedup();
    if !all_flags.is_empty() {
        out.push_str(&format!(
            "target_compile_options({interface_name} INTERFACE {})\n",
            all_flags.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" ")
        ));
    }

    let mut defines: Vec<&String> = globals.defines.iter().collect();
    defines.sort();
    if !defines.is_empty() {
        out.push_str(&format!(
            "target_compile_definitions({interface_name} INTERFACE {})\n",
            defines.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" ")
        ));
    }

    let mut includes: Vec<&String> = globals.includes.iter().collect();
    includes.sort();
    if !includes.is_empty() {
        out.push_str(&format!(
            "target_include_directories({interface_name} INTERFACE {})\n",
            includes.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" ")
        ));
    }

    if !globals.link_flags.is_empty() {
        let mut link_flags: Vec<&String> = globals.link_flags.iter().collect();
        link_flags.sort();
        link_flags.dedup();
        out.push_str(&format!(
            "target_link_options({interface_name} INTERFACE {})\n",
            link_flags.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" ")
        ));
    }

    out.push_str(&format!(
        "add_library({}::GlobalOptions ALIAS {interface_name})\n",
        project.namespace
    ));

    out
}
