//! Path resolution over a finished module tree

use crate::error::ResolutionError;
use crate::tree::{ItemId, ItemKind, ModuleId, ModuleTree};
use indexmap::IndexMap;
use ks_intern::{Interner, Symbol};
use ks_span::FileSpan;
use ks_syntax::{Path, PathSegment};
use rustc_hash::FxHashMap;

/// Every item of a compilation by fully qualified path
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// `a::b::c` to item, imports excluded, in declaration order
    pub paths: IndexMap<String, ItemId>,
    /// Import item to the item it finally names
    pub import_targets: FxHashMap<ItemId, ItemId>,
}

impl SymbolTable {
    /// Item at a fully qualified path
    #[must_use]
    pub fn get(&self, path: &str) -> Option<ItemId> {
        self.paths.get(path).copied()
    }

    /// The item itself, or the target if it is an import
    #[must_use]
    pub fn target(&self, item: ItemId) -> ItemId {
        self.import_targets.get(&item).copied().unwrap_or(item)
    }

    /// Number of non-import items
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True if the table has no items
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Resolves paths against a [`ModuleTree`]
///
/// Resolution never changes the tree.
pub struct Resolver<'a> {
    tree: &'a ModuleTree,
    interner: &'a Interner,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over `tree`
    #[must_use]
    pub fn new(tree: &'a ModuleTree, interner: &'a Interner) -> Self {
        Self { tree, interner }
    }

    /// Resolve a path as written in module `from`
    ///
    /// The first plain segment is looked up in `from` (items and imports),
    /// then in the enclosing modules. Every later segment must be a visible
    /// child of the module named so far. Imports are followed to the item
    /// they name.
    ///
    /// # Errors
    ///
    /// Returns a `ResolutionError` if a segment is missing, private, not a
    /// module, or if imports form a cycle.
    pub fn resolve_path(
        &self,
        from: ModuleId,
        path: &Path,
        use_site: FileSpan,
    ) -> Result<ItemId, ResolutionError> {
        self.resolve_in(from, path, use_site, &mut Vec::new())
    }

    fn resolve_in(
        &self,
        from: ModuleId,
        path: &Path,
        use_site: FileSpan,
        visiting: &mut Vec<ItemId>,
    ) -> Result<ItemId, ResolutionError> {
        let mut scope: Option<ModuleId> = None;
        let mut current: Option<ItemId> = None;

        for (index, segment) in path.segments.iter().enumerate() {
            match *segment {
                PathSegment::Crate if index == 0 => scope = Some(self.tree.root()),
                PathSegment::SelfModule if index == 0 => scope = Some(from),
                PathSegment::Super if current.is_none() => {
                    let base = scope.unwrap_or(from);
                    let parent = self
                        .tree
                        .module(base)
                        .parent
                        .ok_or(ResolutionError::SuperOfRoot { use_site })?;
                    scope = Some(parent);
                }
                PathSegment::Ident(name) => {
                    let item = match (current, scope) {
                        (None, None) => self.lookup_first(from, name, use_site)?,
                        (None, Some(module)) => self.lookup_member(from, module, name, use_site)?,
                        (Some(previous), _) => {
                            let module = self.as_module(previous, use_site)?;
                            self.lookup_member(from, module, name, use_site)?
                        }
                    };
                    current = Some(self.follow(item, visiting)?);
                }
                other => {
                    return Err(ResolutionError::Undefined {
                        name: keyword_text(other).to_string(),
                        use_site,
                        suggestions: Vec::new(),
                    });
                }
            }
        }

        if let Some(item) = current {
            return Ok(item);
        }
        scope
            .and_then(|module| self.tree.module(module).item)
            .ok_or_else(|| ResolutionError::Undefined {
                name: path.display(self.interner),
                use_site,
                suggestions: Vec::new(),
            })
    }

    /// First segment: own items and imports, then enclosing modules
    fn lookup_first(
        &self,
        from: ModuleId,
        name: Symbol,
        use_site: FileSpan,
    ) -> Result<ItemId, ResolutionError> {
        if let Some(item) = self.tree.lookup(from, name) {
            return Ok(item);
        }

        let mut ancestor = self.tree.module(from).parent;
        while let Some(module) = ancestor {
            if let Some(item) = self.tree.lookup(module, name) {
                if !matches!(self.tree.item(item).kind, ItemKind::Import { .. }) {
                    return Ok(item);
                }
            }
            ancestor = self.tree.module(module).parent;
        }

        let text = self.interner.resolve(&name);
        let mut available = Vec::new();
        let mut module = Some(from);
        while let Some(id) = module {
            available.extend(
                self.tree
                    .module(id)
                    .items
                    .keys()
                    .map(|sym| self.interner.resolve(sym)),
            );
            module = self.tree.module(id).parent;
        }
        Err(ResolutionError::Undefined {
            suggestions: ResolutionError::compute_suggestions(
                &text,
                available.iter().map(String::as_str),
            ),
            name: text,
            use_site,
        })
    }

    /// Later segments: a visible child of `module`
    fn lookup_member(
        &self,
        from: ModuleId,
        module: ModuleId,
        name: Symbol,
        use_site: FileSpan,
    ) -> Result<ItemId, ResolutionError> {
        let Some(item) = self.tree.lookup(module, name) else {
            let text = self.interner.resolve(&name);
            let available: Vec<String> = self
                .tree
                .module(module)
                .items
                .keys()
                .map(|sym| self.interner.resolve(sym))
                .collect();
            return Err(ResolutionError::Undefined {
                suggestions: ResolutionError::compute_suggestions(
                    &text,
                    available.iter().map(String::as_str),
                ),
                name: text,
                use_site,
            });
        };

        if !self.tree.is_visible(from, item) {
            let data = self.tree.item(item);
            return Err(ResolutionError::PrivateItem {
                name: data.path.clone(),
                def_site: data.span,
                use_site,
            });
        }
        Ok(item)
    }

    fn as_module(&self, item: ItemId, use_site: FileSpan) -> Result<ModuleId, ResolutionError> {
        match self.tree.item(item).kind {
            ItemKind::Module(module) => Ok(module),
            _ => Err(ResolutionError::NotAModule {
                name: self.tree.item(item).path.clone(),
                use_site,
            }),
        }
    }

    /// Follows an import chain to the item it names
    fn follow(&self, item: ItemId, visiting: &mut Vec<ItemId>) -> Result<ItemId, ResolutionError> {
        let data = self.tree.item(item);
        let ItemKind::Import { path } = &data.kind else {
            return Ok(item);
        };

        if visiting.contains(&item) {
            return Err(ResolutionError::ImportCycle {
                name: data.path.clone(),
                use_site: data.span,
            });
        }
        visiting.push(item);
        let target = self.resolve_in(data.parent, path, path.span, visiting);
        visiting.pop();
        target
    }

    /// Resolve every `use` in the tree
    ///
    /// # Errors
    ///
    /// Returns every failing import, not just the first.
    pub fn resolve_imports(&self) -> Result<FxHashMap<ItemId, ItemId>, Vec<ResolutionError>> {
        let mut targets = FxHashMap::default();
        let mut errors = Vec::new();

        for (id, data) in self.tree.items() {
            if !matches!(data.kind, ItemKind::Import { .. }) {
                continue;
            }
            match self.follow(id, &mut Vec::new()) {
                Ok(target) => {
                    targets.insert(id, target);
                }
                Err(err) => {
                    if !errors.contains(&err) {
                        errors.push(err);
                    }
                }
            }
        }

        tracing::debug!(
            imports = targets.len(),
            errors = errors.len(),
            "resolved imports"
        );
        if errors.is_empty() {
            Ok(targets)
        } else {
            Err(errors)
        }
    }

    /// Resolve all imports and build the symbol table
    ///
    /// # Errors
    ///
    /// Same as [`Self::resolve_imports`].
    pub fn symbol_table(&self) -> Result<SymbolTable, Vec<ResolutionError>> {
        let import_targets = self.resolve_imports()?;
        let paths = self
            .tree
            .items()
            .filter(|(_, data)| !matches!(data.kind, ItemKind::Import { .. }))
            .map(|(id, data)| (data.path.clone(), id))
            .collect();
        Ok(SymbolTable {
            paths,
            import_targets,
        })
    }
}

fn keyword_text(segment: PathSegment) -> &'static str {
    match segment {
        PathSegment::Crate => "crate",
        PathSegment::Super => "super",
        PathSegment::SelfModule => "self",
        PathSegment::Ident(_) => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ks_module::{Context, Module};
    use ks_span::FileId;
    use ks_syntax::{Item, ItemKind as SyntaxKind, ModContent};
    use ks_value::Value;

    fn collect(source: &str) -> (ModuleTree, Interner) {
        let interner = Interner::new();
        let file = ks_parser::parse_source(FileId(0), source, &interner).unwrap();
        let mut tree = ModuleTree::new();
        let root = tree.root();
        collect_items(&mut tree, root, &file.items, &interner);
        (tree, interner)
    }

    fn collect_items(tree: &mut ModuleTree, module: ModuleId, items: &[Item], interner: &Interner) {
        for item in items {
            match &item.kind {
                SyntaxKind::Fn(decl) => {
                    let kind = if decl.is_const {
                        ItemKind::ConstFn
                    } else {
                        ItemKind::Function
                    };
                    tree.add_item(module, decl.name, item.visibility, kind, decl.name_span, interner)
                        .unwrap();
                }
                SyntaxKind::Const(decl) => {
                    tree.add_item(
                        module,
                        decl.name,
                        item.visibility,
                        ItemKind::Const,
                        decl.name_span,
                        interner,
                    )
                    .unwrap();
                }
                SyntaxKind::Mod(decl) => {
                    let child = tree
                        .add_module(module, decl.name, item.visibility, decl.name_span, interner)
                        .unwrap();
                    if let ModContent::Inline(items) = &decl.content {
                        collect_items(tree, child, items, interner);
                    }
                }
                SyntaxKind::Use(entries) => {
                    for entry in entries {
                        tree.add_item(
                            module,
                            entry.binding().unwrap(),
                            item.visibility,
                            ItemKind::Import {
                                path: entry.path.clone(),
                            },
                            entry.span,
                            interner,
                        )
                        .unwrap();
                    }
                }
                SyntaxKind::MacroCall(_) => {}
            }
        }
    }

    fn import(tree: &ModuleTree, path: &str) -> ItemId {
        tree.items()
            .find(|(_, data)| data.path == path && matches!(data.kind, ItemKind::Import { .. }))
            .map(|(id, _)| id)
            .unwrap()
    }

    fn single_error(source: &str) -> ResolutionError {
        let (tree, interner) = collect(source);
        let mut errors = Resolver::new(&tree, &interner)
            .resolve_imports()
            .unwrap_err();
        assert_eq!(errors.len(), 1, "{errors:?}");
        errors.remove(0)
    }

    #[test]
    fn sibling_cannot_use_private_item() {
        let err = single_error(
            "mod a { fn hidden() {} pub fn open() {} }
             mod b { use super::a::hidden; use super::a::open; }",
        );
        assert!(matches!(err, ResolutionError::PrivateItem { ref name, .. } if name == "a::hidden"));
    }

    #[test]
    fn descendants_see_private_items_of_ancestors() {
        let (tree, interner) = collect(
            "fn helper() {}
             mod child { mod grandchild { use crate::helper; use super::super::helper as again; } }",
        );
        let table = Resolver::new(&tree, &interner).symbol_table().unwrap();

        let helper = table.get("helper").unwrap();
        assert_eq!(table.target(import(&tree, "child::grandchild::helper")), helper);
        assert_eq!(table.target(import(&tree, "child::grandchild::again")), helper);
    }

    #[test]
    fn first_segment_falls_back_to_enclosing_modules() {
        let (tree, interner) = collect("const LIMIT = 3; mod inner { pub fn f() {} }");
        let resolver = Resolver::new(&tree, &interner);
        let inner = tree
            .modules()
            .find(|(_, data)| data.path == "inner")
            .map(|(id, _)| id)
            .unwrap();

        let path = Path::ident(interner.intern("LIMIT"), FileSpan::synthetic());
        let item = resolver
            .resolve_path(inner, &path, FileSpan::synthetic())
            .unwrap();
        assert_eq!(tree.item(item).path, "LIMIT");
    }

    #[test]
    fn undefined_names_get_suggestions() {
        let err = single_error("mod a { pub fn fib() {} } use a::fob;");
        assert_eq!(
            err,
            ResolutionError::Undefined {
                name: "fob".to_string(),
                use_site: err.span(),
                suggestions: vec!["fib".to_string()],
            }
        );
    }

    #[test]
    fn import_cycles_are_detected() {
        let (tree, interner) = collect("use a as b; use b as a;");
        let errors = Resolver::new(&tree, &interner)
            .resolve_imports()
            .unwrap_err();
        let names: Vec<_> = errors
            .iter()
            .map(|err| match err {
                ResolutionError::ImportCycle { name, .. } => name.as_str(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn super_of_root_is_an_error() {
        let err = single_error("use super::x;");
        assert!(matches!(err, ResolutionError::SuperOfRoot { .. }));
    }

    #[test]
    fn paths_only_continue_through_modules() {
        let err = single_error("const X = 1; use X::y;");
        assert_eq!(err.to_string(), "`X` is not a module");
    }

    #[test]
    fn reexports_resolve_to_the_original_item() {
        let (tree, interner) = collect(
            "mod a { mod hidden { pub fn f() {} } pub use hidden::f; }
             use a::f;",
        );
        let table = Resolver::new(&tree, &interner).symbol_table().unwrap();

        assert_eq!(
            table.target(import(&tree, "f")),
            table.get("a::hidden::f").unwrap()
        );
        assert!(table.get("f").is_none());
    }

    #[test]
    fn private_reexport_is_not_visible() {
        let err = single_error(
            "mod a { mod hidden { pub fn f() {} } use hidden::f; }
             use a::f;",
        );
        assert!(matches!(err, ResolutionError::PrivateItem { .. }));
    }

    #[test]
    fn native_items_resolve_by_full_path() {
        let (mut tree, interner) = collect("use std::io::println; use std::io::{self as output};");
        let mut io = Module::with_crate_item("std", ["io"]);
        io.function("println", 1, |_| Ok(Value::Unit)).unwrap();
        let mut context = Context::new();
        context.install(io).unwrap();
        tree.install_native(&context, &interner).unwrap();

        let table = Resolver::new(&tree, &interner).symbol_table().unwrap();
        let println = tree.item(table.target(import(&tree, "println")));
        assert_eq!(println.path, "std::io::println");
        assert_eq!(println.kind, ItemKind::NativeFunction { arity: 1 });
        assert_eq!(tree.item(table.target(import(&tree, "output"))).path, "std::io");
    }

    #[test]
    fn every_failing_import_is_reported() {
        let (tree, interner) = collect("use missing::a; use also_missing::b; mod m {}");
        let errors = Resolver::new(&tree, &interner)
            .resolve_imports()
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(
            errors
                .iter()
                .all(|err| matches!(err, ResolutionError::Undefined { .. }))
        );
    }
}
