//! Module files on disk and in the virtual file system

use ks_index::{LoadedSource, ModuleRequest, SourceLoader};
use ks_span::FileId;
use ks_vfs::VirtualFileSystem;
use std::path::{Path, PathBuf};

/// Resolves `mod name;` relative to the declaring file
///
/// The entry file and `mod.ks` files own their directory; any other
/// `dir/name.ks` owns `dir/name/`. Inside that directory `mod name;` is
/// `name.ks` or `name/mod.ks`, in that order.
pub struct VfsLoader<'a> {
    vfs: &'a VirtualFileSystem,
    root: FileId,
}

impl<'a> VfsLoader<'a> {
    /// Loader for the compilation whose entry file is `root`
    #[must_use]
    pub fn new(vfs: &'a VirtualFileSystem, root: FileId) -> Self {
        Self { vfs, root }
    }

    fn module_dir(&self, file: FileId) -> Option<PathBuf> {
        let path = self.vfs.get_file_path(file).ok()?;
        let dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let owns_dir = file == self.root || path.file_name().is_some_and(|name| name == "mod.ks");
        if owns_dir {
            Some(dir)
        } else {
            Some(dir.join(path.file_stem()?))
        }
    }

    /// Paths tried for `request`, most specific first
    #[must_use]
    pub fn candidates(&self, request: &ModuleRequest) -> Vec<PathBuf> {
        let Some(mut dir) = self.module_dir(request.file) else {
            return Vec::new();
        };
        for segment in &request.nesting {
            dir.push(segment);
        }
        vec![
            dir.join(format!("{}.ks", request.name)),
            dir.join(&request.name).join("mod.ks"),
        ]
    }
}

impl SourceLoader for VfsLoader<'_> {
    fn load(&mut self, request: &ModuleRequest) -> Option<LoadedSource> {
        let path = self
            .candidates(request)
            .into_iter()
            .find(|candidate| self.vfs.exists(candidate))?;

        let file = match self.vfs.register_file(&path) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to register module file");
                return None;
            }
        };
        match self.vfs.source(file) {
            Ok(source) => {
                tracing::debug!(module = %request.module_path, path = %path.display(), "loaded module");
                Some(LoadedSource { file, source })
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to read module file");
                None
            }
        }
    }
}
