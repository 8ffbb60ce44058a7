//! Provisioning profile
//!
//! A profile lists the files the card should carry after provisioning, in
//! creation order (parents before children), and lets the engine resolve
//! where each kind of object directory lives. Profiles are plain JSON:
//!
//! ```json
//! { "files": [ { "name": "PKCS15-AppDF", "path": "3F00/FF00", "kind": "directory" } ] }
//! ```

use std::fs;
use std::path::Path as FsPath;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{CardError, CardResult};
use crate::fs::{FileDescriptor, FileKind, Path};
use crate::objects::DfType;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Cannot read profile: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed profile: {0}")]
    Json(#[from] serde_json::Error),
}

/// A file declared by the profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Symbolic name, e.g. `PKCS15-PrKDF`
    pub name: String,
    pub path: Path,
    pub kind: FileKind,
    #[serde(default)]
    pub size: usize,
}

impl FileEntry {
    pub fn new(name: &str, path: Path, kind: FileKind, size: usize) -> Self {
        Self {
            name: name.to_string(),
            path,
            kind,
            size,
        }
    }

    /// A fresh descriptor for this entry, without security attributes
    pub fn template(&self) -> FileDescriptor {
        FileDescriptor::new(self.kind, self.path.clone(), self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    files: Vec<FileEntry>,
}

impl Profile {
    pub fn new(files: Vec<FileEntry>) -> Self {
        Self { files }
    }

    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a profile from a JSON file
    pub fn load(path: &FsPath) -> Result<Self, ProfileError> {
        let content = fs::read_to_string(path)?;
        let profile = Self::from_json(&content)?;
        info!("Loaded profile {:?} ({} files)", path, profile.files.len());
        Ok(profile)
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn entry(&self, name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// The profile file of an object directory type
    pub fn df_file(&self, df_type: DfType) -> Option<&FileEntry> {
        df_type.profile_name().and_then(|name| self.entry(name))
    }

    /// Path of the card directory holding objects of `df_type`
    ///
    /// That directory sits next to the type's profile file, under the type's
    /// fixed identifier. Types without either fail with `Internal`.
    pub fn df_path(&self, df_type: DfType) -> CardResult<Path> {
        let id = df_type
            .fixed_id()
            .ok_or_else(|| CardError::Internal(format!("no directory id for {:?}", df_type)))?;
        let file = self
            .df_file(df_type)
            .ok_or_else(|| CardError::Internal(format!("profile has no {:?} file", df_type)))?;
        let parent = file
            .path
            .parent()
            .ok_or_else(|| CardError::Internal(format!("{} has no parent directory", file.path)))?;
        let path = parent.join(id);
        debug!("{:?} directory resolves to {}", df_type, path);
        Ok(path)
    }
}

impl Default for Profile {
    /// The layout rutoken tokens are personalized with
    fn default() -> Self {
        let mf = Path::mf();
        let app = mf.join(0xFF00);
        let ef = |name: &str, id: u16, size: usize| {
            FileEntry::new(name, app.join(id), FileKind::WorkingFile, size)
        };
        Self::new(vec![
            FileEntry::new("MF", mf.clone(), FileKind::Directory, 0),
            FileEntry::new("PKCS15-AppDF", app.clone(), FileKind::Directory, 0),
            ef("PKCS15-ODF", 0x5031, 128),
            ef("PKCS15-TokenInfo", 0x5032, 128),
            ef("PKCS15-AODF", 0x4401, 256),
            ef("PKCS15-PrKDF", 0x4402, 512),
            ef("PKCS15-PuKDF", 0x4403, 512),
            ef("PKCS15-CDF", 0x4404, 1024),
            ef("PKCS15-DODF", 0x4405, 512),
        ])
    }
}
