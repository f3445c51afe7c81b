pub mod command_line;

use crate::errors::CommandLineError;

/// A directory argument that is resolved to an absolute path at parse time
/// without requiring the path to already exist (the output directory in
/// particular is created during emission).
#[derive(Debug, Clone)]
pub struct ProjectDirectory(std::path::PathBuf);

impl ProjectDirectory {
    pub fn as_path(&self) -> &std::path::Path {
        self.0.as_path()
    }
}

impl std::convert::From<std::path::PathBuf> for ProjectDirectory {
    fn from(f: std::path::PathBuf) -> Self {
        Self(f)
    }
}

impl Default for ProjectDirectory {
    fn default() -> Self {
        Self(std::env::current_dir().expect("could not locate current directory"))
    }
}

impl std::string::ToString for ProjectDirectory {
    fn to_string(&self) -> String {
        self.0.display().to_string()
    }
}

impl std::str::FromStr for ProjectDirectory {
    type Err = CommandLineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(canonicalize_path(&std::path::PathBuf::from(s))))
    }
}

fn canonicalize_path(path: &std::path::Path) -> std::path::PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .expect("could not locate current directory")
            .join(path)
    }
}
