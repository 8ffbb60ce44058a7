//! In-memory file descriptors
//!
//! A descriptor is built before any card call and only changes the card when
//! handed to `Card::create`. The card returns the same type from `select`.

use serde::{Deserialize, Serialize};

use super::path::Path;
use crate::acl::{SecAttr, SecurityRole};

/// Kind of a card file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Dedicated file (directory)
    Directory,
    /// Transparent elementary file
    WorkingFile,
}

/// Description of a file to create, or of a file found on the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// File identifier within the parent directory
    pub id: u16,
    pub kind: FileKind,
    /// Size in bytes, zero for directories
    pub size: usize,
    /// Absolute path of the file
    pub path: Path,
    /// Access-control vector; the card refuses to create a file without one
    pub sec_attr: Option<SecAttr>,
}

impl FileDescriptor {
    /// A descriptor for `path`, identified by the last id of the path
    pub fn new(kind: FileKind, path: Path, size: usize) -> Self {
        Self {
            id: path.file_id().unwrap_or_default(),
            kind,
            size,
            path,
            sec_attr: None,
        }
    }

    /// A directory at `path`
    pub fn directory(path: Path) -> Self {
        Self::new(FileKind::Directory, path, 0)
    }

    /// A working file at `path` with `size` bytes
    pub fn working_file(path: Path, size: usize) -> Self {
        Self::new(FileKind::WorkingFile, path, size)
    }

    /// Attach the full attribute vector of `role`
    pub fn with_role(mut self, role: SecurityRole) -> Self {
        self.set_role(role);
        self
    }

    pub fn set_role(&mut self, role: SecurityRole) {
        self.sec_attr = Some(role.attributes());
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Path of the directory holding this file
    pub fn parent(&self) -> Option<Path> {
        self.path.parent()
    }
}
