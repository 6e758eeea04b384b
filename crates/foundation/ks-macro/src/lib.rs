//! Macro expansion for Kestrel
//!
//! Macros are native functions registered by the host through a
//! [`MacroRegistry`]. An invocation's input tokens go to the handler, and the
//! returned tokens are parsed as items or as a single expression at the
//! invocation site.
//!
//! Scheduling (which invocation runs when, and how its path resolves) lives
//! in `ks-index`; this crate only expands.

pub mod context;
pub mod error;
pub mod expand;

pub use context::MacroContext;
pub use error::MacroError;
pub use expand::{DEFAULT_MAX_DEPTH, MacroExpander, MacroHandler, MacroRegistry, NativeMacro};
