//! Virtual card state structures
//!
//! A [`CardImage`] is the complete content of a [`VirtualCard`](super::VirtualCard):
//! its file tree, PIN objects and format-mode flag. Byte fields serialize as
//! base64 strings.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::acl::SecAttr;
use crate::fs::{FileDescriptor, FileKind, Path};

use super::status::SW;

/// Custom serde module for base64 encoding of byte vectors
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(Vec::new());
        }
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// A file stored on the virtual card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub path: Path,
    pub kind: FileKind,
    pub size: usize,
    #[serde(with = "base64_bytes")]
    pub sec_attr: Vec<u8>,
    /// Content of a working file, always `size` bytes long
    #[serde(with = "base64_bytes", default)]
    pub data: Vec<u8>,
}

impl FileNode {
    /// Materialize a descriptor at `path`
    pub fn from_descriptor(path: Path, file: &FileDescriptor, sec_attr: &SecAttr) -> Self {
        let size = match file.kind {
            FileKind::Directory => 0,
            FileKind::WorkingFile => file.size,
        };
        Self {
            path,
            kind: file.kind,
            size,
            sec_attr: sec_attr.as_bytes().to_vec(),
            data: vec![0u8; size],
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Metadata as returned by SELECT
    pub fn to_descriptor(&self) -> FileDescriptor {
        let mut file = FileDescriptor::new(self.kind, self.path.clone(), self.size);
        file.sec_attr = SecAttr::from_slice(&self.sec_attr);
        file
    }
}

/// A PIN (CHV) object stored on the virtual card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRecord {
    pub id: u8,
    pub options: u8,
    pub flags: u8,
    pub max_retries: u8,
    pub retry_counter: u8,
    #[serde(with = "base64_bytes")]
    pub secret_hash: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub sec_attr: Vec<u8>,
}

impl PinRecord {
    /// Build a record from the parameters of a create request
    ///
    /// The low nibble of `retry_limit` is the number of allowed attempts.
    pub fn new(id: u8, options: u8, flags: u8, retry_limit: u8, secret: &[u8], sec_attr: &[u8]) -> Self {
        let max_retries = retry_limit & 0x0F;
        Self {
            id,
            options,
            flags,
            max_retries,
            retry_counter: max_retries,
            secret_hash: Self::hash_pin(secret),
            sec_attr: sec_attr.to_vec(),
        }
    }

    /// Hash a PIN for storage using SHA-256
    pub fn hash_pin(pin: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(pin);
        hasher.finalize().to_vec()
    }

    /// Check `pin`, maintaining the retry counter
    ///
    /// Returns the status word to report on failure.
    pub fn verify(&mut self, pin: &[u8]) -> Result<(), u16> {
        if self.retry_counter == 0 {
            return Err(SW::AUTH_METHOD_BLOCKED);
        }

        if Self::hash_pin(pin) == self.secret_hash {
            self.retry_counter = self.max_retries;
            Ok(())
        } else {
            self.retry_counter = self.retry_counter.saturating_sub(1);
            if self.retry_counter == 0 {
                Err(SW::AUTH_METHOD_BLOCKED)
            } else {
                Err(SW::counter_warning(self.retry_counter))
            }
        }
    }
}

/// Complete content of a virtual card
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardImage {
    /// Files sorted by path
    pub files: Vec<FileNode>,
    /// PIN objects sorted by id
    pub pins: Vec<PinRecord>,
    /// Whether the card is between format-begin and format-end
    pub format_mode: bool,
}
