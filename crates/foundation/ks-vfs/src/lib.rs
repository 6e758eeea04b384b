//! Virtual File System for managing source files
//!
//! Holds both on-disk sources and in-memory buffers so the compiler and the
//! diagnostics renderer see the same text for a given [`FileId`].

use anyhow::Result;
use ks_span::FileId;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Virtual File System that tracks source files
pub struct VirtualFileSystem {
    inner: Arc<RwLock<VfsInner>>,
}

struct VfsInner {
    files: FxHashMap<FileId, FileData>,
    paths: FxHashMap<PathBuf, FileId>,
    next_id: u32,
}

/// Data associated with a file
#[derive(Clone, Debug)]
pub struct FileData {
    /// Path of the file (may be virtual)
    pub path: PathBuf,
    /// File contents (if loaded)
    pub contents: Option<String>,
}

impl VirtualFileSystem {
    /// Creates a new empty virtual file system
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(VfsInner {
                files: FxHashMap::default(),
                paths: FxHashMap::default(),
                next_id: 0,
            })),
        }
    }

    /// Registers a file path and returns its ID
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned
    pub fn register_file(&self, path: impl AsRef<Path>) -> Result<FileId> {
        let path = path.as_ref().to_path_buf();
        let mut inner = self
            .inner
            .write()
            .map_err(|_| anyhow::anyhow!("Lock poisoned"))?;

        if let Some(&file_id) = inner.paths.get(&path) {
            return Ok(file_id);
        }

        let file_id = FileId::new(inner.next_id);
        inner.next_id += 1;

        inner.files.insert(
            file_id,
            FileData {
                path: path.clone(),
                contents: None,
            },
        );
        inner.paths.insert(path, file_id);

        Ok(file_id)
    }

    /// Registers an in-memory file with the given contents
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned
    pub fn add_virtual_file(
        &self,
        path: impl AsRef<Path>,
        contents: impl Into<String>,
    ) -> Result<FileId> {
        let file_id = self.register_file(path)?;
        self.set_file_contents(file_id, contents.into())?;
        Ok(file_id)
    }

    /// Loads file contents from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the lock is poisoned
    pub fn load_file(&self, file_id: FileId) -> Result<String> {
        let path = self.get_file_path(file_id)?;
        tracing::trace!(?path, "loading source file");

        let contents = fs::read_to_string(&path)
            .map_err(|err| anyhow::anyhow!("failed to read {}: {err}", path.display()))?;

        let mut inner = self
            .inner
            .write()
            .map_err(|_| anyhow::anyhow!("Lock poisoned"))?;
        if let Some(file_data) = inner.files.get_mut(&file_id) {
            file_data.contents = Some(contents.clone());
        }

        Ok(contents)
    }

    /// Returns cached contents, loading from disk on first access
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unknown or cannot be read
    pub fn source(&self, file_id: FileId) -> Result<String> {
        match self.get_file_contents(file_id)? {
            Some(contents) => Ok(contents),
            None => self.load_file(file_id),
        }
    }

    /// Sets file contents (useful for testing or in-memory files)
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned or file doesn't exist
    pub fn set_file_contents(&self, file_id: FileId, contents: String) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| anyhow::anyhow!("Lock poisoned"))?;
        let file_data = inner
            .files
            .get_mut(&file_id)
            .ok_or_else(|| anyhow::anyhow!("File not found: {file_id:?}"))?;
        file_data.contents = Some(contents);
        Ok(())
    }

    /// Gets cached file contents (if available)
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned or file doesn't exist
    pub fn get_file_contents(&self, file_id: FileId) -> Result<Option<String>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| anyhow::anyhow!("Lock poisoned"))?;
        Ok(inner
            .files
            .get(&file_id)
            .ok_or_else(|| anyhow::anyhow!("File not found: {file_id:?}"))?
            .contents
            .clone())
    }

    /// Gets file path
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned or file doesn't exist
    pub fn get_file_path(&self, file_id: FileId) -> Result<PathBuf> {
        let inner = self
            .inner
            .read()
            .map_err(|_| anyhow::anyhow!("Lock poisoned"))?;
        Ok(inner
            .files
            .get(&file_id)
            .ok_or_else(|| anyhow::anyhow!("File not found: {file_id:?}"))?
            .path
            .clone())
    }

    /// Gets file ID from path
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned
    pub fn get_file_id(&self, path: impl AsRef<Path>) -> Result<Option<FileId>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| anyhow::anyhow!("Lock poisoned"))?;
        Ok(inner.paths.get(path.as_ref()).copied())
    }

    /// True if the path is registered or exists on disk
    #[must_use]
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        matches!(self.get_file_id(path), Ok(Some(_))) || path.is_file()
    }

    /// Every registered file, ordered by id
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned
    pub fn files(&self) -> Result<Vec<(FileId, FileData)>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| anyhow::anyhow!("Lock poisoned"))?;
        let mut files: Vec<_> = inner
            .files
            .iter()
            .map(|(id, data)| (*id, data.clone()))
            .collect();
        files.sort_by_key(|(id, _)| id.0);
        Ok(files)
    }
}

impl Default for VirtualFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for VirtualFileSystem {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_registration() {
        let vfs = VirtualFileSystem::new();
        let id1 = vfs.register_file("main.ks").unwrap();
        let id2 = vfs.register_file("main.ks").unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn virtual_files_do_not_touch_disk() {
        let vfs = VirtualFileSystem::new();
        let id = vfs
            .add_virtual_file("does/not/exist.ks", "const A = 1;")
            .unwrap();
        assert_eq!(vfs.source(id).unwrap(), "const A = 1;");
        assert!(vfs.exists("does/not/exist.ks"));
    }

    #[test]
    fn source_loads_from_disk_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.ks");
        fs::write(&path, "fn main() {}").unwrap();

        let vfs = VirtualFileSystem::new();
        let id = vfs.register_file(&path).unwrap();
        assert_eq!(vfs.get_file_contents(id).unwrap(), None);
        assert_eq!(vfs.source(id).unwrap(), "fn main() {}");
        assert!(vfs.get_file_contents(id).unwrap().is_some());
    }
}
