//! Integration test utilities for the Kestrel compiler
//!
//! Projects are written into a temporary directory and compiled from disk
//! through [`ks_driver::Driver`], so module file lookup, `Kestrel.toml`
//! discovery and diagnostics rendering are exercised end to end.

pub mod multi_file;
