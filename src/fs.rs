//! Sole I/O site (spec.md §4.3). Every other stage takes a `&dyn
//! FilesystemBoundary` rather than touching `std::fs` directly, so the
//! Parser/Evaluator/IR Builder/Emitter stay pure above this boundary (P2) and
//! tests can substitute `MemoryFilesystem` without touching disk.

use crate::errors::FsError;

pub trait FilesystemBoundary {
    fn exists(&self, path: &std::path::Path) -> bool;
    fn read_utf8(&self, path: &std::path::Path) -> Result<String, FsError>;
    fn write_utf8(&self, path: &std::path::Path, content: &str) -> Result<(), FsError>;
    fn list_dir(&self, path: &std::path::Path) -> Result<Vec<std::path::PathBuf>, FsError>;
}

/// Normalizes to an absolute, forward-slash path. Pure string/path
/// manipulation; never touches disk beyond `canonicalize`'s requirement that
/// the path exist when `must_exist` is set.
pub fn to_forward_slash(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

pub fn join(base: &std::path::Path, child: &std::path::Path) -> std::path::PathBuf {
    if child.is_absolute() {
        child.to_path_buf()
    } else {
        base.join(child)
    }
}

pub fn basename(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub fn dirname(path: &std::path::Path) -> std::path::PathBuf {
    path.parent().map(|p| p.to_path_buf()).unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct RealFilesystem;

impl FilesystemBoundary for RealFilesystem {
    fn exists(&self, path: &std::path::Path) -> bool {
        path.exists()
    }

    fn read_utf8(&self, path: &std::path::Path) -> Result<String, FsError> {
        let bytes =
            std::fs::read(path).map_err(|e| FsError::ReadFromFile(path.to_path_buf(), e))?;
        String::from_utf8(bytes).map_err(|e| FsError::NotUtf8(path.to_path_buf(), e))
    }

    fn write_utf8(&self, path: &std::path::Path, content: &str) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FsError::CreateDirectory(parent.to_path_buf(), e))?;
        }
        std::fs::write(path, content).map_err(|e| FsError::WriteToFile(path.to_path_buf(), e))
    }

    fn list_dir(&self, path: &std::path::Path) -> Result<Vec<std::path::PathBuf>, FsError> {
        let read_dir =
            std::fs::read_dir(path).map_err(|e| FsError::ReadFromFile(path.to_path_buf(), e))?;
        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| FsError::ReadFromFile(path.to_path_buf(), e))?;
            entries.push(entry.path());
        }
        entries.sort();
        Ok(entries)
    }
}

/// In-memory filesystem used by unit and integration tests so the Parser,
/// Evaluator, IR Builder and Emitter can be exercised without touching disk
/// (spec.md P2: purity above the boundary).
#[derive(Debug, Default)]
pub struct MemoryFilesystem {
    files: std::cell::RefCell<std::collections::BTreeMap<std::path::PathBuf, String>>,
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<std::path::PathBuf>, content: impl Into<String>) -> Self {
        self.files.borrow_mut().insert(path.into(), content.into());
        self
    }

    pub fn written_files(&self) -> std::collections::BTreeMap<std::path::PathBuf, String> {
        self.files.borrow().clone()
    }
}

impl FilesystemBoundary for MemoryFilesystem {
    fn exists(&self, path: &std::path::Path) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn read_utf8(&self, path: &std::path::Path) -> Result<String, FsError> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| FsError::ReadFromFile(path.to_path_buf(), std::io::ErrorKind::NotFound.into()))
    }

    fn write_utf8(&self, path: &std::path::Path, content: &str) -> Result<(), FsError> {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn list_dir(&self, path: &std::path::Path) -> Result<Vec<std::path::PathBuf>, FsError> {
        let mut entries: Vec<std::path::PathBuf> = self
            .files
            .borrow()
            .keys()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect();
        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_filesystem_round_trips_writes() {
        let mut memfs = MemoryFilesystem::new();
        let path = std::path::Path::new("/tmp/out/CMakeLists.txt");
        memfs.write_utf8(path, "hello").unwrap();
        assert_eq!(memfs.read_utf8(path).unwrap(), "hello");
        assert!(memfs.exists(path));
    }

    #[test]
    fn to_forward_slash_normalizes_backslashes() {
        assert_eq!(to_forward_slash(std::path::Path::new("a\\b")), "a/b");
    }
}
