//! Card file system model and building primitives

pub mod allocator;
pub mod builder;
pub mod file;
pub mod path;

pub use allocator::{allocate_id, first_free_id, MAX_ID};
pub use builder::{create_or_replace, ensure_directory, probe, Probe};
pub use file::{FileDescriptor, FileKind};
pub use path::{Path, MF_ID};
