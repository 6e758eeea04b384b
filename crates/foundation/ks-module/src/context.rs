//! The set of installed native modules

use crate::{Module, ModuleItem, NativeFunction};
use indexmap::IndexMap;
use ks_macro::{MacroRegistry, NativeMacro};
use rustc_hash::FxHashMap;

/// Error raised while installing native modules
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// Two registrations claim the same path
    #[error("conflicting item `{path}` in native modules")]
    ConflictingItem {
        /// Fully qualified path
        path: String,
    },
}

/// Installed native modules
///
/// Functions and macros are indexed by their `a::b::name` path.
#[derive(Debug, Default)]
pub struct Context {
    modules: IndexMap<String, Module>,
    items: FxHashMap<String, ModuleItem>,
}

impl Context {
    /// Creates an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a module
    ///
    /// Installing a second module at an existing path merges the two as long
    /// as their item names differ.
    ///
    /// # Errors
    ///
    /// `ContextError::ConflictingItem` if an item path is already taken, or
    /// if an item and a module share a path.
    pub fn install(&mut self, module: Module) -> Result<(), ContextError> {
        let module_path = module.display_path();

        for prefix in 1..=module.path().len() {
            let ancestor = module.path()[..prefix].join("::");
            if self.items.contains_key(&ancestor) {
                return Err(ContextError::ConflictingItem { path: ancestor });
            }
        }

        for (name, _) in module.items() {
            let path = format!("{module_path}::{name}");
            if self.items.contains_key(&path) || self.is_module_path(&path) {
                return Err(ContextError::ConflictingItem { path });
            }
        }

        for (name, item) in module.items() {
            self.items
                .insert(format!("{module_path}::{name}"), item.clone());
        }
        tracing::debug!(module = %module_path, items = module.len(), "installed native module");

        match self.modules.get_mut(&module_path) {
            Some(existing) => {
                for (name, item) in module.items() {
                    existing.adopt(name, item.clone());
                }
            }
            None => {
                self.modules.insert(module_path, module);
            }
        }
        Ok(())
    }

    fn is_module_path(&self, path: &str) -> bool {
        self.modules.keys().any(|module| {
            module == path
                || module
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with("::"))
        })
    }

    /// Installed modules in installation order
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Item registered at `path`
    #[must_use]
    pub fn item(&self, path: &str) -> Option<&ModuleItem> {
        self.items.get(path)
    }

    /// Native function registered at `path`
    #[must_use]
    pub fn function(&self, path: &str) -> Option<(usize, NativeFunction)> {
        match self.items.get(path)? {
            ModuleItem::Function { arity, handler } => Some((*arity, handler.clone())),
            ModuleItem::Macro(_) => None,
        }
    }
}

impl MacroRegistry for Context {
    fn lookup_macro(&self, path: &str) -> Option<NativeMacro> {
        match self.items.get(path)? {
            ModuleItem::Macro(handler) => Some(handler.clone()),
            ModuleItem::Function { .. } => None,
        }
    }
}
