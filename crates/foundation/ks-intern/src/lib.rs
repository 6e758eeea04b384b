//! String interning for symbols

pub use lasso::Spur as Symbol;
use lasso::ThreadedRodeo;
use std::fmt;
use std::sync::Arc;

/// Thread-safe string interner
///
/// Cloning is cheap; all clones share the same table.
#[derive(Clone)]
pub struct Interner {
    inner: Arc<ThreadedRodeo>,
}

impl Interner {
    /// Creates an empty interner
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ThreadedRodeo::new()),
        }
    }

    /// Interns `text`, returning its symbol
    pub fn intern(&self, text: &str) -> Symbol {
        self.inner.get_or_intern(text)
    }

    /// Looks up a symbol without interning
    #[must_use]
    pub fn get(&self, text: &str) -> Option<Symbol> {
        self.inner.get(text)
    }

    /// Resolves a symbol to an owned string
    #[must_use]
    pub fn resolve(&self, sym: &Symbol) -> String {
        self.inner.resolve(sym).to_string()
    }

    /// Resolves a symbol, returning `None` for symbols from another interner
    #[must_use]
    pub fn try_resolve(&self, sym: &Symbol) -> Option<String> {
        self.inner.try_resolve(sym).map(ToString::to_string)
    }

    /// Joins symbols with `::`
    #[must_use]
    pub fn join_path(&self, segments: &[Symbol]) -> String {
        segments
            .iter()
            .map(|segment| self.inner.resolve(segment))
            .collect::<Vec<_>>()
            .join("::")
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interner")
            .field("len", &self.inner.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let interner = Interner::new();
        let first = interner.intern("greeting");
        let second = interner.clone().intern("greeting");
        assert_eq!(first, second);
        assert_eq!(interner.resolve(&first), "greeting");
    }

    #[test]
    fn join_path_uses_double_colon() {
        let interner = Interner::new();
        let path = [interner.intern("std"), interner.intern("experiments")];
        assert_eq!(interner.join_path(&path), "std::experiments");
    }
}
