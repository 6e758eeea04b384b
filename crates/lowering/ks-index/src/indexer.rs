//! Fixed-point item collection

use crate::error::IndexError;
use crate::loader::{ModuleRequest, SourceLoader};
use indexmap::IndexMap;
use ks_intern::Interner;
use ks_macro::{DEFAULT_MAX_DEPTH, MacroError, MacroExpander};
use ks_module::Context;
use ks_resolve::{
    ItemId, ItemKind, ModuleId, ModuleTree, ResolutionError, Resolver, SymbolTable,
};
use ks_span::FileId;
use ks_syntax::{
    ConstDecl, FnDecl, Item, ItemKind as SyntaxKind, MacroCall, ModContent, ModDecl, SourceFile,
    UseEntry,
};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Default number of item-macro rounds before giving up
pub const DEFAULT_MAX_ROUNDS: usize = 256;

/// Limits for macro expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    /// Nesting limit for macros that expand to further macro calls
    pub max_depth: usize,
    /// Number of item-macro rounds
    pub max_rounds: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// Fully collected and expanded compilation
#[derive(Debug, Clone)]
pub struct Index {
    /// Every module and item
    pub tree: ModuleTree,
    /// Paths and resolved imports
    pub symbols: SymbolTable,
    /// Function and constant declarations, macros expanded
    pub definitions: IndexMap<ItemId, Item>,
    /// Number of macro invocations expanded
    pub expansions: usize,
}

impl Index {
    /// Declaration of a `fn` or `const fn` item
    #[must_use]
    pub fn fn_decl(&self, item: ItemId) -> Option<&FnDecl> {
        match &self.definitions.get(&item)?.kind {
            SyntaxKind::Fn(decl) => Some(decl),
            _ => None,
        }
    }

    /// Declaration of a `const` item
    #[must_use]
    pub fn const_decl(&self, item: ItemId) -> Option<&ConstDecl> {
        match &self.definitions.get(&item)?.kind {
            SyntaxKind::Const(decl) => Some(decl),
            _ => None,
        }
    }

    /// Rebuilds the syntax of the crate root with every macro expanded
    ///
    /// Native modules are left out.
    #[must_use]
    pub fn expanded_items(&self) -> Vec<Item> {
        self.module_items(self.tree.root())
    }

    fn module_items(&self, module: ModuleId) -> Vec<Item> {
        let mut items = Vec::new();
        for &id in self.tree.module(module).items.values() {
            let data = self.tree.item(id);
            let kind = match &data.kind {
                ItemKind::Module(child) if !data.span.is_synthetic() => SyntaxKind::Mod(ModDecl {
                    name: data.name,
                    name_span: data.span,
                    content: ModContent::Inline(self.module_items(*child)),
                }),
                ItemKind::Import { path } => SyntaxKind::Use(vec![UseEntry {
                    path: path.clone(),
                    alias: (path.last_ident() != Some(data.name)).then_some(data.name),
                    span: data.span,
                }]),
                ItemKind::Function | ItemKind::ConstFn | ItemKind::Const => {
                    if let Some(item) = self.definitions.get(&id) {
                        items.push(item.clone());
                    }
                    continue;
                }
                ItemKind::Module(_) | ItemKind::NativeFunction { .. } | ItemKind::Macro => {
                    continue;
                }
            };
            items.push(Item {
                visibility: data.visibility,
                kind,
                span: data.span,
            });
        }
        items
    }
}

/// Where a module's items come from, for loading nested `mod name;` files
#[derive(Debug, Clone)]
struct ModuleOrigin {
    file: FileId,
    nesting: Vec<String>,
}

#[derive(Debug)]
struct PendingMacro {
    module: ModuleId,
    call: MacroCall,
    depth: usize,
}

/// Collects items and drives macro expansion to a fixed point
pub struct Indexer<'a> {
    context: &'a Context,
    interner: &'a Interner,
    loader: &'a mut dyn SourceLoader,
    options: IndexOptions,
    tree: ModuleTree,
    definitions: IndexMap<ItemId, Item>,
    origins: FxHashMap<ModuleId, ModuleOrigin>,
    pending: VecDeque<PendingMacro>,
    expansions: usize,
    errors: Vec<IndexError>,
}

impl<'a> Indexer<'a> {
    /// Creates an indexer with default limits
    pub fn new(
        context: &'a Context,
        interner: &'a Interner,
        loader: &'a mut dyn SourceLoader,
    ) -> Self {
        Self {
            context,
            interner,
            loader,
            options: IndexOptions::default(),
            tree: ModuleTree::new(),
            definitions: IndexMap::new(),
            origins: FxHashMap::default(),
            pending: VecDeque::new(),
            expansions: 0,
            errors: Vec::new(),
        }
    }

    /// Overrides the expansion limits
    #[must_use]
    pub fn with_options(mut self, options: IndexOptions) -> Self {
        self.options = options;
        self
    }

    /// Indexes a parsed root file
    ///
    /// # Errors
    ///
    /// Returns every error of the first phase that failed. Collection and
    /// item-macro errors are reported together, then import errors, then
    /// expression-macro errors.
    pub fn index(mut self, root: SourceFile) -> Result<Index, Vec<IndexError>> {
        if let Err(err) = self.tree.install_native(self.context, self.interner) {
            return Err(vec![err.into()]);
        }

        let root_module = self.tree.root();
        self.origins.insert(
            root_module,
            ModuleOrigin {
                file: root.file,
                nesting: Vec::new(),
            },
        );
        self.collect(root_module, root.items, 0);
        tracing::debug!(
            items = self.definitions.len(),
            pending = self.pending.len(),
            "collected root items"
        );

        self.expand_item_macros();
        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        let symbols = Resolver::new(&self.tree, self.interner)
            .symbol_table()
            .map_err(|errors| errors.into_iter().map(IndexError::from).collect::<Vec<_>>())?;

        let errors = self.expand_bodies();
        if !errors.is_empty() {
            return Err(errors);
        }
        tracing::debug!(
            symbols = symbols.len(),
            expansions = self.expansions,
            "indexed compilation"
        );

        Ok(Index {
            tree: self.tree,
            symbols,
            definitions: self.definitions,
            expansions: self.expansions,
        })
    }

    /// Adds `items` to `module`, queueing item macros at `depth`
    fn collect(&mut self, module: ModuleId, items: Vec<Item>, depth: usize) {
        for item in items {
            if let Err(err) = self.collect_item(module, item, depth) {
                self.errors.push(err);
            }
        }
    }

    fn collect_item(&mut self, module: ModuleId, item: Item, depth: usize) -> Result<(), IndexError> {
        let visibility = item.visibility;
        let (name, name_span, kind) = match item.kind {
            SyntaxKind::Fn(ref decl) => (
                decl.name,
                decl.name_span,
                if decl.is_const {
                    ItemKind::ConstFn
                } else {
                    ItemKind::Function
                },
            ),
            SyntaxKind::Const(ref decl) => (decl.name, decl.name_span, ItemKind::Const),
            SyntaxKind::Mod(decl) => return self.collect_module(module, visibility, decl),
            SyntaxKind::Use(entries) => {
                for entry in entries {
                    let Some(binding) = entry.binding() else {
                        continue;
                    };
                    self.tree.add_item(
                        module,
                        binding,
                        visibility,
                        ItemKind::Import { path: entry.path },
                        entry.span,
                        self.interner,
                    )?;
                }
                return Ok(());
            }
            SyntaxKind::MacroCall(call) => {
                self.pending.push_back(PendingMacro {
                    module,
                    call,
                    depth,
                });
                return Ok(());
            }
        };

        let id = self
            .tree
            .add_item(module, name, visibility, kind, name_span, self.interner)?;
        self.definitions.insert(id, item);
        Ok(())
    }

    fn collect_module(
        &mut self,
        parent: ModuleId,
        visibility: ks_syntax::Visibility,
        decl: ModDecl,
    ) -> Result<(), IndexError> {
        let module = self
            .tree
            .add_module(parent, decl.name, visibility, decl.name_span, self.interner)?;
        let name = self.interner.resolve(&decl.name);
        let parent_origin = self
            .origins
            .get(&parent)
            .cloned()
            .unwrap_or(ModuleOrigin {
                file: decl.name_span.file,
                nesting: Vec::new(),
            });

        match decl.content {
            ModContent::Inline(items) => {
                if items.is_empty() {
                    tracing::warn!(module = %self.tree.module(module).path, "empty module");
                }
                let mut nesting = parent_origin.nesting;
                nesting.push(name);
                self.origins.insert(
                    module,
                    ModuleOrigin {
                        file: parent_origin.file,
                        nesting,
                    },
                );
                self.collect(module, items, 0);
            }
            ModContent::External => {
                let request = ModuleRequest {
                    file: parent_origin.file,
                    nesting: parent_origin.nesting,
                    module_path: self.tree.module(module).path.clone(),
                    name,
                    span: decl.name_span,
                };
                let loaded =
                    self.loader
                        .load(&request)
                        .ok_or_else(|| ResolutionError::Undefined {
                            name: format!("{}.ks", request.module_path.replace("::", "/")),
                            use_site: decl.name_span,
                            suggestions: Vec::new(),
                        })?;
                tracing::debug!(module = %request.module_path, file = %loaded.file, "loaded module file");

                let parsed = ks_parser::parse_source(loaded.file, &loaded.source, self.interner)?;
                self.origins.insert(
                    module,
                    ModuleOrigin {
                        file: loaded.file,
                        nesting: Vec::new(),
                    },
                );
                self.collect(module, parsed.items, 0);
            }
        }
        Ok(())
    }

    /// Expands pending item macros until none remain
    ///
    /// Each round drains the queue in order; items an expansion produces are
    /// collected immediately, so later invocations in the same round already
    /// see its imports.
    fn expand_item_macros(&mut self) {
        let mut round = 0;
        while !self.pending.is_empty() {
            if round == self.options.max_rounds {
                if let Some(stuck) = self.pending.front() {
                    self.errors.push(IndexError::Macro(MacroError::RecursionLimit {
                        path: stuck.call.path.display(self.interner),
                        limit: self.options.max_rounds,
                        span: stuck.call.span,
                    }));
                }
                self.pending.clear();
                return;
            }
            round += 1;

            let batch: Vec<PendingMacro> = self.pending.drain(..).collect();
            tracing::debug!(round, invocations = batch.len(), "expanding item macros");
            for pending in batch {
                if let Err(err) = self.expand_item_macro(pending) {
                    self.errors.push(err.into());
                }
            }
        }
    }

    fn expand_item_macro(&mut self, pending: PendingMacro) -> Result<(), MacroError> {
        let path = resolve_macro(&self.tree, self.interner, pending.module, &pending.call)?;
        let mut expander = MacroExpander::new(self.context, self.interner)
            .with_max_depth(self.options.max_depth);
        let items = expander.expand_items(&path, &pending.call, pending.depth)?;
        self.expansions += expander.expanded();
        self.collect(pending.module, items, pending.depth + 1);
        Ok(())
    }

    /// Expands expression macros in every body
    fn expand_bodies(&mut self) -> Vec<IndexError> {
        let mut errors = Vec::new();
        let tree = &self.tree;
        let interner = self.interner;
        let mut expander =
            MacroExpander::new(self.context, interner).with_max_depth(self.options.max_depth);

        for (id, item) in &mut self.definitions {
            let module = tree.item(*id).parent;
            let body = match &mut item.kind {
                SyntaxKind::Fn(decl) => &mut decl.body,
                SyntaxKind::Const(decl) => &mut decl.body,
                _ => continue,
            };
            if body.is_expanded() {
                continue;
            }
            if let Err(err) =
                expander.expand_body(body, |_, call| resolve_macro(tree, interner, module, call))
            {
                errors.push(err.into());
            }
        }

        self.expansions += expander.expanded();
        errors
    }
}

/// Resolves a macro path to the path it is registered under
fn resolve_macro(
    tree: &ModuleTree,
    interner: &Interner,
    module: ModuleId,
    call: &MacroCall,
) -> Result<String, MacroError> {
    let item = Resolver::new(tree, interner)
        .resolve_path(module, &call.path, call.path.span)
        .map_err(|err| match err {
            ResolutionError::Undefined { .. } => MacroError::Undefined {
                path: call.path.display(interner),
                span: call.span,
            },
            other => MacroError::Failed {
                message: other.to_string(),
                span: other.span(),
            },
        })?;

    let data = tree.item(item);
    match data.kind {
        ItemKind::Macro => Ok(data.path.clone()),
        _ => Err(MacroError::Failed {
            message: format!("`{}` is a {}, not a macro", data.path, data.kind.describe()),
            span: call.span,
        }),
    }
}
