//! Loading `mod name;` files

use ks_span::{FileId, FileSpan};
use rustc_hash::FxHashMap;

/// A `mod name;` declaration that needs its file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequest {
    /// File containing the declaration
    pub file: FileId,
    /// Inline modules between the top of `file` and the declaration
    pub nesting: Vec<String>,
    /// Declared module name
    pub name: String,
    /// Fully qualified path of the new module
    pub module_path: String,
    /// Span of the module name
    pub span: FileSpan,
}

/// Source text of a module file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSource {
    /// Id under which the file was registered
    pub file: FileId,
    /// File contents
    pub source: String,
}

/// Finds the file behind a `mod name;` declaration
pub trait SourceLoader {
    /// Returns `None` if no file exists for the module
    fn load(&mut self, request: &ModuleRequest) -> Option<LoadedSource>;
}

/// Loader over in-memory sources keyed by module path
///
/// Used for single-source compilation (with no modules at all) and in
/// tests.
#[derive(Debug, Default)]
pub struct StaticLoader {
    sources: FxHashMap<String, String>,
    next_file: u32,
}

impl StaticLoader {
    /// Loader that knows no files
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the source of the module at `path`, e.g. `util` or `util::fmt`
    #[must_use]
    pub fn with_module(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.sources.insert(path.into(), source.into());
        self
    }
}

impl SourceLoader for StaticLoader {
    fn load(&mut self, request: &ModuleRequest) -> Option<LoadedSource> {
        let source = self.sources.get(&request.module_path)?.clone();
        self.next_file += 1;
        Some(LoadedSource {
            file: FileId(self.next_file),
            source,
        })
    }
}
