//! Module and visibility resolution for Kestrel
//!
//! Item collection fills a [`ModuleTree`]; the [`Resolver`] then maps every
//! path to the item it names, following `use` imports and enforcing
//! visibility.
//!
//! # Visibility
//!
//! A private item is visible in the module that defines it and in every
//! module nested inside that one. `pub` items are visible everywhere.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ks_resolve::{ModuleTree, Resolver};
//!
//! let table = Resolver::new(&tree, &interner).symbol_table()?;
//! let fib = table.get("math::fib");
//! ```

pub mod error;
pub mod resolver;
pub mod tree;

pub use error::ResolutionError;
pub use resolver::{Resolver, SymbolTable};
pub use tree::{ItemData, ItemId, ItemKind, ModuleData, ModuleId, ModuleTree};
