//! Source tree traversal.
//!
//! - `path_mapper.rs` - mirrored paths and extraction folder names
//! - `stats.rs` - per-directory extension tally
//! - `tree_walker.rs` - copy/extract dispatch and nested archive expansion

pub mod path_mapper;
pub mod stats;
pub mod tree_walker;

pub use path_mapper::PathMapper;
pub use stats::{extension_of, ExtensionTally};
pub use tree_walker::TreeWalker;
