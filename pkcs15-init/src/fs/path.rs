//! Card file paths
//!
//! A path is the ordered list of 2-byte file identifiers leading from the
//! master file. Its byte length is always even.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CardError;

/// File identifier of the master file
pub const MF_ID: u16 = 0x3F00;

/// An absolute path on the card
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    ids: Vec<u16>,
}

impl Path {
    /// The master file path `3F00`
    pub fn mf() -> Self {
        Self { ids: vec![MF_ID] }
    }

    /// Build a path from its identifiers
    pub fn from_ids(ids: &[u16]) -> Self {
        Self { ids: ids.to_vec() }
    }

    /// Identifiers from the root down
    pub fn ids(&self) -> &[u16] {
        &self.ids
    }

    /// Length in bytes (two per identifier)
    pub fn len(&self) -> usize {
        self.ids.len() * 2
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifier of the file the path points at
    pub fn file_id(&self) -> Option<u16> {
        self.ids.last().copied()
    }

    /// Path of the containing directory, `None` for the root
    pub fn parent(&self) -> Option<Path> {
        match self.ids.split_last() {
            Some((_, rest)) if !rest.is_empty() => Some(Self { ids: rest.to_vec() }),
            _ => None,
        }
    }

    /// Append a file identifier in place
    pub fn push(&mut self, id: u16) {
        self.ids.push(id);
    }

    /// A new path with `id` appended
    pub fn join(&self, id: u16) -> Path {
        let mut path = self.clone();
        path.push(id);
        path
    }

    /// True if `self` is `other` or lies below it
    pub fn starts_with(&self, other: &Path) -> bool {
        self.ids.starts_with(&other.ids)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ids.iter().map(|id| format!("{:04X}", id)).collect();
        write!(f, "{}", parts.join("/"))
    }
}

impl FromStr for Path {
    type Err = CardError;

    /// Accepts `3F00/0000/1001` as well as the contiguous `3F0000001001`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s.chars().filter(|c| *c != '/' && !c.is_whitespace()).collect();
        if hex.is_empty() || !hex.is_ascii() || hex.len() % 4 != 0 {
            return Err(CardError::InvalidArguments(format!("bad path '{}'", s)));
        }
        let ids = (0..hex.len())
            .step_by(4)
            .map(|i| u16::from_str_radix(&hex[i..i + 4], 16))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CardError::InvalidArguments(format!("bad path '{}': {}", s, e)))?;
        Ok(Self { ids })
    }
}

impl TryFrom<String> for Path {
    type Error = CardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path: Path = "3F00/0000/1001".parse().unwrap();
        assert_eq!(path.ids(), &[0x3F00, 0x0000, 0x1001]);
        assert_eq!(path.len(), 6);
        assert_eq!(path.to_string(), "3F00/0000/1001");

        let compact: Path = "3F0000000000".parse().unwrap();
        assert_eq!(compact, Path::from_ids(&[0x3F00, 0, 0]));
    }

    #[test]
    fn test_parse_rejects_partial_ids() {
        assert!("3F0".parse::<Path>().is_err());
        assert!("".parse::<Path>().is_err());
        assert!("3F00/XY00".parse::<Path>().is_err());
    }

    #[test]
    fn test_parent_and_join() {
        let path = Path::mf().join(0x0000).join(0x0001);
        assert_eq!(path.parent(), Some(Path::from_ids(&[0x3F00, 0x0000])));
        assert_eq!(path.file_id(), Some(0x0001));
        assert_eq!(Path::mf().parent(), None);
        assert!(path.starts_with(&Path::mf()));
    }

    #[test]
    fn test_serde_as_string() {
        let path = Path::from_ids(&[0x3F00, 0xFF00]);
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"3F00/FF00\"");
        let parsed: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, path);
    }
}
