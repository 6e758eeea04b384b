//! Native modules
//!
//! The host exposes functions and macros to Kestrel code by building
//! [`Module`]s and installing them into a [`Context`]. Installed items are
//! public and addressed by their full path, e.g. `std::io::println`.

mod context;
mod module;

pub use context::{Context, ContextError};
pub use module::{Module, ModuleItem, NativeError, NativeFn, NativeFunction};
