//! Compilation driver and high-level APIs
//!
//! Runs the front end in order: parse the entry file, collect items and
//! expand macros to a fixed point (loading `mod name;` files on the way),
//! resolve imports, then evaluate every constant. The result is a [`Unit`]
//! ready for the bytecode emitter.

mod error;
mod loader;
mod options;

pub use error::CompileError;
pub use loader::VfsLoader;
pub use options::{CONFIG_FILE, ConstEvalOptions, MacroOptions, Options};

use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use indexmap::IndexMap;
use ks_const_eval::{ConstEvaluator, EVAL_STACK_SIZE};
use ks_index::{Index, Indexer};
use ks_intern::Interner;
use ks_module::Context;
use ks_resolve::ItemKind;
use ks_span::FileId;
use ks_syntax::{FnDecl, Printer};
use ks_value::Value;
use ks_vfs::VirtualFileSystem;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::{panic, thread};

/// Output of a successful compilation
#[derive(Debug, Clone)]
pub struct Unit {
    /// Module tree, symbol table and expanded declarations
    pub index: Index,
    /// Value of every constant by fully qualified path
    pub constants: IndexMap<String, Value>,
    /// Runtime functions by fully qualified path, bodies fully expanded
    pub functions: IndexMap<String, FnDecl>,
}

/// Owns everything one compilation session needs
pub struct Driver {
    vfs: VirtualFileSystem,
    interner: Interner,
    context: Context,
    options: Options,
}

impl Driver {
    /// Driver with the standard native modules installed
    ///
    /// # Errors
    ///
    /// Returns an error if the standard modules conflict with each other
    pub fn new(options: Options) -> anyhow::Result<Self> {
        Ok(Self::with_context(ks_modules::default_context()?, options))
    }

    /// Driver with a host-provided module context
    #[must_use]
    pub fn with_context(context: Context, options: Options) -> Self {
        Self {
            vfs: VirtualFileSystem::new(),
            interner: Interner::new(),
            context,
            options,
        }
    }

    /// Source files seen so far
    #[must_use]
    pub fn vfs(&self) -> &VirtualFileSystem {
        &self.vfs
    }

    /// Interner shared by every unit of this driver
    #[must_use]
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Active options
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Compiles the file at `path`
    ///
    /// # Errors
    ///
    /// Returns every error of the first phase that failed
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<Unit, Vec<CompileError>> {
        let index = self.index_file(path)?;
        self.evaluate(index)
    }

    /// Compiles in-memory source registered under the virtual `path`
    ///
    /// `mod name;` declarations resolve against other virtual files and the
    /// disk, relative to `path`.
    ///
    /// # Errors
    ///
    /// Returns every error of the first phase that failed
    pub fn compile_source(
        &self,
        path: impl AsRef<Path>,
        source: impl Into<String>,
    ) -> Result<Unit, Vec<CompileError>> {
        let path = path.as_ref();
        self.vfs
            .add_virtual_file(path, source)
            .map_err(|err| vec![load_error(path, &err)])?;
        self.compile_file(path)
    }

    /// Parses, collects and expands the file at `path` without evaluating
    /// constants
    ///
    /// # Errors
    ///
    /// Returns every error of the first phase that failed
    pub fn index_file(&self, path: impl AsRef<Path>) -> Result<Index, Vec<CompileError>> {
        let path = path.as_ref();
        let _span = tracing::info_span!("compile", path = %path.display()).entered();

        let (file, source) = self
            .vfs
            .register_file(path)
            .and_then(|file| Ok((file, self.vfs.source(file)?)))
            .map_err(|err| vec![load_error(path, &err)])?;

        let syntax = ks_parser::parse_source(file, &source, &self.interner)
            .map_err(|err| vec![CompileError::from(err)])?;
        tracing::debug!(items = syntax.items.len(), "parsed entry file");

        let mut loader = VfsLoader::new(&self.vfs, file);
        let index = Indexer::new(&self.context, &self.interner, &mut loader)
            .with_options(self.options.index_options())
            .index(syntax)
            .map_err(|errors| errors.into_iter().map(CompileError::from).collect::<Vec<_>>())?;
        tracing::debug!(
            items = index.symbols.len(),
            expansions = index.expansions,
            "indexed compilation"
        );
        Ok(index)
    }

    fn evaluate(&self, index: Index) -> Result<Unit, Vec<CompileError>> {
        let limits = self.options.eval_limits();
        let (indexed, interner) = (&index, &self.interner);
        let run = move || ConstEvaluator::new(indexed, interner).with_limits(limits).eval_all();

        // Const fn calls recurse on the native stack
        let constants = thread::scope(|scope| {
            let spawned = thread::Builder::new()
                .name("const-eval".to_string())
                .stack_size(EVAL_STACK_SIZE)
                .spawn_scoped(scope, run);
            match spawned {
                Ok(handle) => handle
                    .join()
                    .unwrap_or_else(|payload| panic::resume_unwind(payload)),
                Err(err) => {
                    tracing::warn!(%err, "evaluating constants on the calling thread");
                    run()
                }
            }
        })
        .map_err(|errors| errors.into_iter().map(CompileError::from).collect::<Vec<_>>())?;

        let functions = index
            .tree
            .items()
            .filter(|(_, data)| data.kind == ItemKind::Function)
            .filter_map(|(id, data)| Some((data.path.clone(), index.fn_decl(id)?.clone())))
            .collect();

        Ok(Unit {
            index,
            constants,
            functions,
        })
    }

    /// Pretty-prints the crate root of `index` with every macro expanded
    #[must_use]
    pub fn expanded_source(&self, index: &Index) -> String {
        Printer::new(&self.interner).items(&index.expanded_items())
    }

    /// Renders errors rustc-style against the sources in the file system
    #[must_use]
    pub fn render_diagnostics(&self, errors: &[CompileError]) -> String {
        let mut files = SimpleFiles::new();
        let mut ids: FxHashMap<FileId, usize> = FxHashMap::default();
        for (id, data) in self.vfs.files().unwrap_or_default() {
            if let Some(contents) = data.contents {
                ids.insert(id, files.add(data.path.display().to_string(), contents));
            }
        }

        let config = term::Config::default();
        let mut buffer = Vec::new();
        for error in errors {
            let diagnostic = match ids.get(&error.span().file) {
                Some(&file_id) => error.to_codespan_diagnostic(file_id),
                None => {
                    let mut diagnostic = error.to_codespan_diagnostic(0);
                    diagnostic.labels.clear();
                    diagnostic
                }
            };
            #[allow(deprecated, reason = "renders through the older `term::emit` entry point")]
            let emitted = term::emit(&mut buffer, &config, &files, &diagnostic);
            if let Err(err) = emitted {
                tracing::warn!(%err, "failed to render diagnostic");
                buffer.extend_from_slice(format!("error: {error}\n").as_bytes());
            }
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

fn load_error(path: &Path, err: &anyhow::Error) -> CompileError {
    CompileError::Load {
        path: path.to_path_buf(),
        message: format!("{err:#}"),
    }
}
