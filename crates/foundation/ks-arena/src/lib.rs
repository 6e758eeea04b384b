//! Indexed arena allocator for syntax nodes
//!
//! Function bodies store their expressions and statements in `la-arena`
//! arenas so macro expansion can overwrite a node in place by id.

pub use la_arena::{Arena, ArenaMap, Idx, RawIdx};
