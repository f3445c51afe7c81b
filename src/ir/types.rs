//! The `Project` IR (spec.md §3, §4.8): the only thing the Emitter consumes.
//! Built once by the IR Builder and never mutated after validation.

use std::collections::HashSet;

use crate::model::{Language, Visibility};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetType {
    Executable,
    StaticLibrary,
    SharedLibrary,
    ObjectLibrary,
    Interface,
    Imported,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub language: Language,
    pub flags: Vec<String>,
}

/// A target's link libraries are heterogeneous: another target in this
/// project (preferably referenced by its namespaced alias), a raw external
/// token (`-lfoo`, `pthread`), or an externally imported target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkLibrary {
    Internal(String),
    External(String),
    Imported(String),
}

#[derive(Debug, Clone)]
pub struct CustomCommandSpec {
    pub inputs: Vec<String>,
    pub recipe: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Target {
    pub physical_name: String,
    pub alias: Option<String>,
    pub kind: TargetType,
    pub sources: Vec<SourceFile>,
    pub include_dirs: Vec<String>,
    pub defines: Vec<String>,
    pub compile_options: Vec<String>,
    pub link_options: Vec<String>,
    pub link_libraries: Vec<LinkLibrary>,
    pub dependencies: Vec<String>,
    pub visibility: Visibility,
    pub custom_command: Option<CustomCommandSpec>,
}

impl Target {
    pub fn new(physical_name: String, kind: TargetType) -> Self {
        Self {
            physical_name,
            alias: None,
            kind,
            sources: Vec::new(),
            include_dirs: Vec::new(),
            defines: Vec::new(),
            compile_options: Vec::new(),
            link_options: Vec::new(),
            link_libraries: Vec::new(),
            dependencies: Vec::new(),
            visibility: Visibility::default(),
            custom_command: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub version: Option<semver::Version>,
    pub namespace: String,
    pub languages: HashSet<Language>,
    pub targets: Vec<Target>,
    pub project_globals: crate::eval::project_globals::ProjectGlobals,
}
