//! Native module builder

use crate::ContextError;
use indexmap::IndexMap;
use ks_macro::{MacroContext, MacroError, NativeMacro};
use ks_syntax::TokenStream;
use ks_value::Value;
use std::fmt;
use std::sync::Arc;

/// Error returned by a native function
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NativeError {
    /// Wrong number of arguments
    #[error("expected {expected} arguments, got {got}")]
    ArityMismatch {
        /// Declared arity
        expected: usize,
        /// Supplied arguments
        got: usize,
    },
    /// Failure reported by the function
    #[error("{0}")]
    Failed(String),
}

/// Signature of a native function
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, NativeError> + Send + Sync;

/// Shared handle to a native function
pub type NativeFunction = Arc<NativeFn>;

/// An item registered by a native module
#[derive(Clone)]
pub enum ModuleItem {
    /// Function callable at runtime
    Function {
        /// Number of parameters
        arity: usize,
        /// Implementation
        handler: NativeFunction,
    },
    /// Macro expanded at compile time
    Macro(NativeMacro),
}

impl ModuleItem {
    /// Short description used in logs and listings
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Function { .. } => "function",
            Self::Macro(_) => "macro",
        }
    }
}

impl fmt::Debug for ModuleItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function { arity, .. } => f
                .debug_struct("Function")
                .field("arity", arity)
                .finish_non_exhaustive(),
            Self::Macro(_) => f.debug_tuple("Macro").finish_non_exhaustive(),
        }
    }
}

/// A native module: a path plus the functions and macros it exports
///
/// Everything a native module registers is public.
#[derive(Debug, Clone, Default)]
pub struct Module {
    path: Vec<String>,
    items: IndexMap<String, ModuleItem>,
}

impl Module {
    /// Module installed at the root of a crate, e.g. `std`
    #[must_use]
    pub fn with_crate(name: impl Into<String>) -> Self {
        Self {
            path: vec![name.into()],
            items: IndexMap::new(),
        }
    }

    /// Module nested inside a crate, e.g. `std::experiments`
    #[must_use]
    pub fn with_crate_item<I, S>(name: impl Into<String>, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut path = vec![name.into()];
        path.extend(segments.into_iter().map(Into::into));
        Self {
            path,
            items: IndexMap::new(),
        }
    }

    /// Path segments of the module
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// `a::b` form of the module path
    #[must_use]
    pub fn display_path(&self) -> String {
        self.path.join("::")
    }

    /// Exported items in registration order
    pub fn items(&self) -> impl Iterator<Item = (&str, &ModuleItem)> {
        self.items.iter().map(|(name, item)| (name.as_str(), item))
    }

    /// Number of exported items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the module exports nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Takes over an item already checked by the context
    pub(crate) fn adopt(&mut self, name: &str, item: ModuleItem) {
        self.items.insert(name.to_string(), item);
    }

    fn insert(&mut self, name: String, item: ModuleItem) -> Result<(), ContextError> {
        if self.items.contains_key(&name) {
            return Err(ContextError::ConflictingItem {
                path: format!("{}::{name}", self.display_path()),
            });
        }
        self.items.insert(name, item);
        Ok(())
    }

    /// Registers a native function
    ///
    /// Calls with the wrong number of arguments fail before reaching
    /// `handler`.
    ///
    /// # Errors
    ///
    /// `ContextError::ConflictingItem` if the name is taken.
    pub fn function<F>(
        &mut self,
        name: impl Into<String>,
        arity: usize,
        handler: F,
    ) -> Result<(), ContextError>
    where
        F: Fn(&[Value]) -> Result<Value, NativeError> + Send + Sync + 'static,
    {
        let handler: NativeFunction = Arc::new(move |args: &[Value]| {
            if args.len() != arity {
                return Err(NativeError::ArityMismatch {
                    expected: arity,
                    got: args.len(),
                });
            }
            handler(args)
        });
        self.insert(name.into(), ModuleItem::Function { arity, handler })
    }

    /// Registers a native macro
    ///
    /// # Errors
    ///
    /// `ContextError::ConflictingItem` if the name is taken.
    pub fn macro_<F>(&mut self, name: impl Into<String>, handler: F) -> Result<(), ContextError>
    where
        F: Fn(&MacroContext<'_>, &TokenStream) -> Result<TokenStream, MacroError>
            + Send
            + Sync
            + 'static,
    {
        self.insert(name.into(), ModuleItem::Macro(Arc::new(handler)))
    }
}
