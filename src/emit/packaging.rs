//! Packaging artifacts (spec.md §4.9), emitted only when `packaging_enabled`:
//! an export set, the namespace-qualified install/export calls, and a
//! `<Name>Config.cmake` + `<Name>ConfigVersion.cmake` pair so a downstream
//! `find_package(<Name> REQUIRED)` resolves `<Namespace>::<target>`.

use crate::ir::types::{Project, TargetType};

fn exportable(kind: &TargetType) -> bool {
    matches!(
        kind,
        TargetType::Executable | TargetType::StaticLibrary | TargetType::SharedLibrary | TargetType::ObjectLibrary
    )
}

pub fn render(project: &Project) -> Vec<(String, String)> {
    let mut files = Vec::new();
    let export_set = format!("{}Targets", project.name);

    let exported: Vec<&str> = project
        .targets
        .iter()
        .filter(|t| exportable(&t.kind))
        .map(|t| t.physical_name.as_str())
        .collect();

    let mut install_block = String::new();
    if !exported.is_empty() {
        install_block.push_str(&format!(
            "install(TARGETS {}\n  EXPORT {export_set}\n  RUNTIME DESTINATION bin\n  LIBRARY DESTINATION lib\n  ARCHIVE DESTINATION lib\n)\n\n",
            exported.join(" ")
        ));
    }

    let mut include_dirs: Vec<&String> = project
        .targets
        .iter()
        .flat_map(|t| t.include_dirs.iter())
        .collect();
    include_dirs.sort();
    include_dirs.dedup();
    for dir in &include_dirs {
        install_block.push_str(&format!("install(DIRECTORY {dir}/ DESTINATION include)\n"));
    }
    if !include_dirs.is_empty() {
        install_block.push('\n');
    }

    install_block.push_str(&format!(
        "install(EXPORT {export_set} NAMESPACE {}:: DESTINATION lib/cmake/{})\n",
        project.namespace, project.name
    ));
    install_block.push_str(&format!(
        "export(EXPORT {export_set} NAMESPACE {}:: FILE \"${{CMAKE_CURRENT_BINARY_DIR}}/{export_set}.cmake\")\n",
        project.namespace
    ));

    files.push(("cmake/packaging.cmake".to_string(), install_block));

    let config_content = format!(
        "include(\"${{CMAKE_CURRENT_LIST_DIR}}/{export_set}.cmake\")\ncheck_required_components({})\n",
        project.name
    );
    files.push((format!("{}Config.cmake", project.name), config_content));

    let version_content = match &project.version {
        Some(v) => format!(
            "set(PACKAGE_VERSION \"{v}\")\nif(PACKAGE_VERSION VERSION_LESS PACKAGE_FIND_VERSION)\n  set(PACKAGE_VERSION_COMPATIBLE FALSE)\nelse()\n  set(PACKAGE_VERSION_COMPATIBLE TRUE)\n  if(PACKAGE_VERSION STREQUAL PACKAGE_FIND_VERSION)\n    set(PACKAGE_VERSION_EXACT TRUE)\n  endif()\nendif()\n"
        ),
        None => "set(PACKAGE_VERSION \"0.0.0\")\nset(PACKAGE_VERSION_COMPATIBLE TRUE)\n".to_string(),
    };
    files.push((format!("{}ConfigVersion.cmake", project.name), version_content));

    files
}
