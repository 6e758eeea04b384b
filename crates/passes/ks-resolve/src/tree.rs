//! Module tree built during item collection

use crate::error::ResolutionError;
use indexmap::IndexMap;
use ks_arena::{Arena, Idx};
use ks_intern::{Interner, Symbol};
use ks_module::{Context, ModuleItem};
use ks_span::FileSpan;
use ks_syntax::{Path, Visibility};

/// Identifier of a module in the tree
pub type ModuleId = Idx<ModuleData>;

/// Identifier of an item in the tree
pub type ItemId = Idx<ItemData>;

/// What an item is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// `fn`, callable only at runtime
    Function,
    /// `const fn`
    ConstFn,
    /// `const NAME = ...;`
    Const,
    /// `mod name`
    Module(ModuleId),
    /// `use path;`, binding the last segment or the alias
    Import {
        /// Imported path as written
        path: Path,
    },
    /// Function registered by the host
    NativeFunction {
        /// Declared parameter count
        arity: usize,
    },
    /// Macro registered by the host
    Macro,
}

impl ItemKind {
    /// Short description used in diagnostics and logs
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::ConstFn => "const function",
            Self::Const => "constant",
            Self::Module(_) => "module",
            Self::Import { .. } => "import",
            Self::NativeFunction { .. } => "native function",
            Self::Macro => "macro",
        }
    }
}

/// A named item inside a module
#[derive(Debug, Clone)]
pub struct ItemData {
    /// Name bound in the parent module
    pub name: Symbol,
    /// Fully qualified path, e.g. `a::b::c`
    pub path: String,
    /// Declared visibility
    pub visibility: Visibility,
    /// Module that contains the item
    pub parent: ModuleId,
    /// What the item is
    pub kind: ItemKind,
    /// Definition site
    pub span: FileSpan,
}

/// A module and the names declared in it
#[derive(Debug, Clone)]
pub struct ModuleData {
    /// Module name (None for the crate root)
    pub name: Option<Symbol>,
    /// Enclosing module
    pub parent: Option<ModuleId>,
    /// Fully qualified path (empty for the crate root)
    pub path: String,
    /// Items in declaration order
    pub items: IndexMap<Symbol, ItemId>,
    /// Item that declares this module in its parent
    pub item: Option<ItemId>,
}

/// All modules and items of one compilation
///
/// Native modules are mounted as public modules at the crate root, so
/// `std::io::println` is reachable from every module.
#[derive(Debug, Clone)]
pub struct ModuleTree {
    modules: Arena<ModuleData>,
    items: Arena<ItemData>,
    root: ModuleId,
}

impl ModuleTree {
    /// Creates a tree holding only the crate root
    #[must_use]
    pub fn new() -> Self {
        let mut modules = Arena::new();
        let root = modules.alloc(ModuleData {
            name: None,
            parent: None,
            path: String::new(),
            items: IndexMap::new(),
            item: None,
        });
        Self {
            modules,
            items: Arena::new(),
            root,
        }
    }

    /// The crate root
    #[must_use]
    pub fn root(&self) -> ModuleId {
        self.root
    }

    /// Module data by id
    #[must_use]
    pub fn module(&self, id: ModuleId) -> &ModuleData {
        &self.modules[id]
    }

    /// Item data by id
    #[must_use]
    pub fn item(&self, id: ItemId) -> &ItemData {
        &self.items[id]
    }

    /// Every module, root first
    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &ModuleData)> {
        self.modules.iter()
    }

    /// Every item in creation order
    pub fn items(&self) -> impl Iterator<Item = (ItemId, &ItemData)> {
        self.items.iter()
    }

    /// Looks up `name` directly inside `module`
    #[must_use]
    pub fn lookup(&self, module: ModuleId, name: Symbol) -> Option<ItemId> {
        self.modules[module].items.get(&name).copied()
    }

    fn child_path(&self, module: ModuleId, name: &str) -> String {
        let parent = &self.modules[module].path;
        if parent.is_empty() {
            name.to_string()
        } else {
            format!("{parent}::{name}")
        }
    }

    /// Declares an item in `module`
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError::DuplicateDefinition` if `module` already
    /// binds `name`.
    pub fn add_item(
        &mut self,
        module: ModuleId,
        name: Symbol,
        visibility: Visibility,
        kind: ItemKind,
        span: FileSpan,
        interner: &Interner,
    ) -> Result<ItemId, ResolutionError> {
        let text = interner.resolve(&name);
        if let Some(existing) = self.lookup(module, name) {
            return Err(ResolutionError::DuplicateDefinition {
                name: text,
                first: self.items[existing].span,
                second: span,
            });
        }

        let path = self.child_path(module, &text);
        let id = self.items.alloc(ItemData {
            name,
            path,
            visibility,
            parent: module,
            kind,
            span,
        });
        self.modules[module].items.insert(name, id);
        Ok(id)
    }

    /// Declares a child module of `parent`
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError::DuplicateDefinition` if `parent` already
    /// binds `name`.
    pub fn add_module(
        &mut self,
        parent: ModuleId,
        name: Symbol,
        visibility: Visibility,
        span: FileSpan,
        interner: &Interner,
    ) -> Result<ModuleId, ResolutionError> {
        let text = interner.resolve(&name);
        if let Some(existing) = self.lookup(parent, name) {
            return Err(ResolutionError::DuplicateDefinition {
                name: text,
                first: self.items[existing].span,
                second: span,
            });
        }

        let module = self.modules.alloc(ModuleData {
            name: Some(name),
            parent: Some(parent),
            path: self.child_path(parent, &text),
            items: IndexMap::new(),
            item: None,
        });
        let item = self.add_item(
            parent,
            name,
            visibility,
            ItemKind::Module(module),
            span,
            interner,
        )?;
        self.modules[module].item = Some(item);
        Ok(module)
    }

    /// True if `module` is `ancestor` or nested inside it
    #[must_use]
    pub fn is_within(&self, module: ModuleId, ancestor: ModuleId) -> bool {
        let mut current = Some(module);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.modules[id].parent;
        }
        false
    }

    /// Check if an item is visible from a module
    ///
    /// Public items are visible everywhere; private items only inside their
    /// parent module and its descendants.
    #[must_use]
    pub fn is_visible(&self, from: ModuleId, item: ItemId) -> bool {
        let data = &self.items[item];
        data.visibility.is_public() || self.is_within(from, data.parent)
    }

    /// Mounts every module installed in `context` under the crate root
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError::DuplicateDefinition` if source code already
    /// declared a conflicting name.
    pub fn install_native(
        &mut self,
        context: &Context,
        interner: &Interner,
    ) -> Result<(), ResolutionError> {
        for native in context.modules() {
            let mut module = self.root;
            for segment in native.path() {
                let name = interner.intern(segment);
                let existing = match self.lookup(module, name).map(|id| &self.items[id].kind) {
                    Some(ItemKind::Module(child)) => Some(*child),
                    _ => None,
                };
                module = match existing {
                    Some(child) => child,
                    None => self.add_module(
                        module,
                        name,
                        Visibility::Public,
                        FileSpan::synthetic(),
                        interner,
                    )?,
                };
            }

            for (name, item) in native.items() {
                let kind = match item {
                    ModuleItem::Function { arity, .. } => ItemKind::NativeFunction { arity: *arity },
                    ModuleItem::Macro(_) => ItemKind::Macro,
                };
                self.add_item(
                    module,
                    interner.intern(name),
                    Visibility::Public,
                    kind,
                    FileSpan::synthetic(),
                    interner,
                )?;
            }
            tracing::debug!(module = %native.display_path(), "mounted native module");
        }
        Ok(())
    }
}

impl Default for ModuleTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ks_module::Module;
    use ks_value::Value;

    fn tree_with_nested(interner: &Interner) -> (ModuleTree, ModuleId, ModuleId, ItemId) {
        let mut tree = ModuleTree::new();
        let outer = tree
            .add_module(
                tree.root(),
                interner.intern("outer"),
                Visibility::Private,
                FileSpan::synthetic(),
                interner,
            )
            .unwrap();
        let inner = tree
            .add_module(
                outer,
                interner.intern("inner"),
                Visibility::Public,
                FileSpan::synthetic(),
                interner,
            )
            .unwrap();
        let secret = tree
            .add_item(
                outer,
                interner.intern("secret"),
                Visibility::Private,
                ItemKind::Const,
                FileSpan::synthetic(),
                interner,
            )
            .unwrap();
        (tree, outer, inner, secret)
    }

    #[test]
    fn private_items_are_visible_to_descendants_only() {
        let interner = Interner::new();
        let (tree, outer, inner, secret) = tree_with_nested(&interner);

        assert!(tree.is_visible(outer, secret));
        assert!(tree.is_visible(inner, secret));
        assert!(!tree.is_visible(tree.root(), secret));
    }

    #[test]
    fn paths_are_fully_qualified() {
        let interner = Interner::new();
        let (tree, _, inner, secret) = tree_with_nested(&interner);

        assert_eq!(tree.item(secret).path, "outer::secret");
        assert_eq!(tree.module(inner).path, "outer::inner");
        assert_eq!(tree.module(tree.root()).path, "");
    }

    #[test]
    fn duplicate_names_in_one_module_are_rejected() {
        let interner = Interner::new();
        let (mut tree, outer, _, _) = tree_with_nested(&interner);

        let err = tree
            .add_item(
                outer,
                interner.intern("inner"),
                Visibility::Public,
                ItemKind::Function,
                FileSpan::synthetic(),
                &interner,
            )
            .unwrap_err();
        assert!(matches!(err, ResolutionError::DuplicateDefinition { ref name, .. } if name == "inner"));
    }

    #[test]
    fn native_modules_share_their_crate_root() {
        let interner = Interner::new();
        let mut io = Module::with_crate_item("std", ["io"]);
        io.function("println", 1, |_| Ok(Value::Unit)).unwrap();
        let mut math = Module::with_crate_item("std", ["math"]);
        math.function("abs", 1, |args| Ok(args[0].clone())).unwrap();
        let mut context = Context::new();
        context.install(io).unwrap();
        context.install(math).unwrap();

        let mut tree = ModuleTree::new();
        tree.install_native(&context, &interner).unwrap();

        let paths: Vec<_> = tree.items().map(|(_, item)| item.path.clone()).collect();
        assert_eq!(
            paths,
            ["std", "std::io", "std::io::println", "std::math", "std::math::abs"]
        );
    }
}
