//! Item collection and macro expansion scheduling
//!
//! Turns a parsed root file into a fully expanded module tree:
//!
//! 1. Collect the items of the root file, loading `mod name;` files through
//!    a [`SourceLoader`].
//! 2. Expand item-position macros in rounds. Each round sees the imports
//!    collected by the rounds before it, and whatever an expansion produces
//!    is collected before the next invocation runs.
//! 3. Resolve every import.
//! 4. Expand expression-position macros inside every function and constant
//!    body, in place.

mod error;
mod indexer;
mod loader;

pub use error::IndexError;
pub use indexer::{DEFAULT_MAX_ROUNDS, Index, IndexOptions, Indexer};
pub use loader::{LoadedSource, ModuleRequest, SourceLoader, StaticLoader};
