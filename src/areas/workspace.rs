//! Working directory reader/writer
//!
//! All paths handed to and returned from the workspace are relative to the
//! repository root. The metadata directory is never listed or touched.

use crate::areas::repository::METADATA_DIR;
use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
use crate::artifacts::index::index_entry::EntryMetadata;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every file below the root, relative and in name order.
    pub fn list_files(&self) -> Result<Vec<PathBuf>> {
        self.list_files_under(Path::new(""))
    }

    /// Every file at or below `path`. A plain file lists as itself.
    pub fn list_files_under(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let relative_path = self.normalize(path)?;
        let root_path = self.path.join(&relative_path);

        if !root_path.exists() {
            return Err(Error::InvalidPath(relative_path));
        }

        if root_path.is_file() {
            return Ok(vec![relative_path]);
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != METADATA_DIR);

        for entry in walker {
            let entry = entry.map_err(|err| {
                std::io::Error::other(format!("cannot walk the working directory: {err}"))
            })?;

            if entry.file_type().is_file()
                && let Ok(relative) = entry.path().strip_prefix(self.path.as_ref())
            {
                files.push(relative.to_path_buf());
            }
        }

        Ok(files)
    }

    pub fn exists(&self, file_path: &Path) -> bool {
        self.path.join(file_path).exists()
    }

    pub fn read_file(&self, file_path: &Path) -> Result<Bytes> {
        Ok(Bytes::from(std::fs::read(self.path.join(file_path))?))
    }

    /// Stat a file; `None` if it is missing or is not a regular file.
    pub fn stat_file(&self, file_path: &Path) -> Result<Option<EntryMetadata>> {
        let full_path = self.path.join(file_path);

        match std::fs::metadata(&full_path) {
            Ok(metadata) if metadata.is_file() => {
                Ok(Some((full_path.as_path(), &metadata).into()))
            }
            Ok(_) => Ok(None),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Write `data` at `file_path`, clearing whatever stands in the way:
    /// a directory at the path itself, or a file where a parent directory
    /// has to go.
    pub fn write_file(&self, file_path: &Path, data: &[u8], mode: EntryMode) -> Result<()> {
        let relative_path = self.normalize(file_path)?;
        let full_path = self.path.join(&relative_path);

        if let Some(parent) = relative_path.parent() {
            self.make_parent_dirs(parent)?;
        }

        if full_path.is_dir() {
            std::fs::remove_dir_all(&full_path)?;
        }

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&full_path)?;
        file.write_all(data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = match mode {
                EntryMode::File(FileMode::Executable) => 0o755,
                _ => 0o644,
            };
            std::fs::set_permissions(&full_path, std::fs::Permissions::from_mode(permissions))?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        Ok(())
    }

    /// Remove a file and any parent directories left empty by it.
    pub fn remove_file(&self, file_path: &Path) -> Result<()> {
        let relative_path = self.normalize(file_path)?;
        let full_path = self.path.join(&relative_path);

        match std::fs::remove_file(&full_path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        let mut current = relative_path.parent();
        while let Some(parent) = current {
            if parent.as_os_str().is_empty() {
                break;
            }

            let dir_path = self.path.join(parent);
            if dir_path.read_dir()?.next().is_some() {
                break;
            }

            std::fs::remove_dir(&dir_path)?;
            current = parent.parent();
        }

        Ok(())
    }

    fn make_parent_dirs(&self, parent: &Path) -> Result<()> {
        let mut dir_path = self.path.to_path_buf();

        for component in parent.components() {
            dir_path.push(component);

            if dir_path.is_file() {
                std::fs::remove_file(&dir_path)?;
            }
            if !dir_path.exists() {
                std::fs::create_dir(&dir_path)?;
            }
        }

        Ok(())
    }

    /// Turn an absolute or relative path into a plain root-relative path.
    fn normalize(&self, path: &Path) -> Result<PathBuf> {
        let relative = if path.is_absolute() {
            path.strip_prefix(self.path.as_ref())
                .map_err(|_| Error::InvalidPath(path.to_path_buf()))?
        } else {
            path
        };

        let mut normalized = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) if part == METADATA_DIR => {
                    return Err(Error::InvalidPath(path.to_path_buf()));
                }
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                _ => return Err(Error::InvalidPath(path.to_path_buf())),
            }
        }

        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn root() -> TempDir {
        TempDir::new().expect("Failed to create temp dir")
    }

    #[rstest]
    fn lists_files_sorted_and_skips_metadata(root: TempDir) {
        root.child("b.txt").write_str("b").unwrap();
        root.child("a/z.txt").write_str("z").unwrap();
        root.child(".arbor/HEAD").write_str("ref: refs/heads/main").unwrap();
        let workspace = Workspace::new(root.path().to_path_buf().into_boxed_path());

        assert_eq!(
            workspace.list_files().unwrap(),
            vec![PathBuf::from("a/z.txt"), PathBuf::from("b.txt")]
        );
    }

    #[rstest]
    fn write_file_replaces_obstacles(root: TempDir) {
        root.child("a").write_str("file in the way").unwrap();
        root.child("b/c.txt").write_str("dir in the way").unwrap();
        let workspace = Workspace::new(root.path().to_path_buf().into_boxed_path());

        workspace
            .write_file(Path::new("a/nested.txt"), b"nested", EntryMode::default())
            .unwrap();
        workspace
            .write_file(Path::new("b"), b"now a file", EntryMode::default())
            .unwrap();

        root.child("a/nested.txt").assert("nested");
        root.child("b").assert("now a file");
    }

    #[rstest]
    fn remove_file_prunes_empty_parents(root: TempDir) {
        root.child("keep.txt").write_str("k").unwrap();
        root.child("a/b/c.txt").write_str("c").unwrap();
        let workspace = Workspace::new(root.path().to_path_buf().into_boxed_path());

        workspace.remove_file(Path::new("a/b/c.txt")).unwrap();

        assert!(!root.child("a").exists());
        assert!(root.child("keep.txt").exists());
    }

    #[rstest]
    fn refuses_paths_outside_the_root(root: TempDir) {
        let workspace = Workspace::new(root.path().to_path_buf().into_boxed_path());

        assert!(matches!(
            workspace.write_file(Path::new("../escape"), b"x", EntryMode::default()),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            workspace.write_file(Path::new(".arbor/HEAD"), b"x", EntryMode::default()),
            Err(Error::InvalidPath(_))
        ));
    }
}
