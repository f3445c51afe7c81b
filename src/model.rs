//! Small enumerations shared between the Configuration Model, the Evaluator
//! and the IR Builder, kept in one place so every stage agrees on their
//! spelling (spec.md §3/§4.4/§4.8).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Language {
    C,
    Cpp,
    Asm,
    Other,
}

impl Language {
    pub fn cmake_name(&self) -> &'static str {
        match self {
            Language::C => "C",
            Language::Cpp => "CXX",
            Language::Asm => "ASM",
            Language::Other => "NONE",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Asm => "asm",
            Language::Other => "other",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Visibility {
    Public,
    Private,
    Interface,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Private
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Visibility::Public => "PUBLIC",
            Visibility::Private => "PRIVATE",
            Visibility::Interface => "INTERFACE",
        };
        write!(f, "{}", s)
    }
}

/// Library role classification (spec.md §4.8 and the Glossary).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LinkClassification {
    Internal,
    External,
    Imported { imported_target: String },
}
