use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Filesystem queries relative to an explicit project root.
///
/// Every call goes to disk; nothing is cached, and the process working
/// directory is never consulted or changed.
#[derive(Debug, Clone)]
pub struct FileProbe {
    root: PathBuf,
}

impl FileProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Confirm the root is an existing, listable directory.
    pub fn check_root(&self) -> Result<()> {
        match fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(Error::ProjectNotFound(self.root.clone())),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(Error::PermissionDenied(self.root.clone()));
            }
            Err(_) => return Err(Error::ProjectNotFound(self.root.clone())),
        }

        fs::read_dir(&self.root).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied(self.root.clone()),
            _ => Error::ProjectNotFound(self.root.clone()),
        })?;

        Ok(())
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root.join(rel).is_file()
    }

    /// `false` when the file is absent or unreadable.
    pub fn contains_substring(&self, rel: &str, needle: &str) -> bool {
        match fs::read(self.root.join(rel)) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).contains(needle),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn exists_is_relative_to_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("uv.lock"), "").unwrap();

        let probe = FileProbe::new(dir.path());
        assert!(probe.exists("uv.lock"));
        assert!(!probe.exists("pdm.lock"));
    }

    #[test]
    fn directories_do_not_count_as_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("requirements.txt")).unwrap();

        assert!(!FileProbe::new(dir.path()).exists("requirements.txt"));
    }

    #[test]
    fn contains_substring_on_missing_file_is_false() {
        let dir = TempDir::new().unwrap();
        let probe = FileProbe::new(dir.path());
        assert!(!probe.contains_substring("requirements.txt", "=="));
    }

    #[test]
    fn contains_substring_reads_current_contents() {
        let dir = TempDir::new().unwrap();
        let probe = FileProbe::new(dir.path());
        let path = dir.path().join("requirements.txt");

        fs::write(&path, "requests>=2\n").unwrap();
        assert!(!probe.contains_substring("requirements.txt", "=="));

        fs::write(&path, "requests==2.31.0\n").unwrap();
        assert!(probe.contains_substring("requirements.txt", "=="));
    }

    #[test]
    fn missing_root_is_project_not_found() {
        let probe = FileProbe::new("/definitely/not/a/project");
        assert!(matches!(probe.check_root(), Err(Error::ProjectNotFound(_))));
    }

    #[test]
    fn file_root_is_project_not_found() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let probe = FileProbe::new(file.path());
        assert!(matches!(probe.check_root(), Err(Error::ProjectNotFound(_))));
    }
}
