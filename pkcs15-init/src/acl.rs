//! Security attribute catalog
//!
//! Every file and data object created on the card carries a fixed-length
//! access-control vector. The vectors are compile-time constants indexed by
//! [`SecurityRole`]; a [`SecAttr`] is always a complete vector, so a file can
//! never be created with a partially applied one.

use std::fmt;

/// Length of a security attribute vector in bytes
pub const SEC_ATTR_SIZE: usize = 15;

/// Access-control roles an object can be created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityRole {
    /// Private objects: key files and data objects
    PrivateObject,
    /// Public keys and certificates
    PublicObject,
    /// Directories of the base tree built during format
    BaseDirectory,
    /// Directories created from the profile
    Directory,
    /// Working files created from the profile
    WorkingFile,
    /// Administrator (security officer) PIN object
    AdminPin,
    /// User PIN object
    UserPin,
}

impl SecurityRole {
    /// The full attribute vector for this role
    pub fn attributes(self) -> SecAttr {
        CATALOG[self as usize]
    }
}

/// A complete security attribute vector
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecAttr([u8; SEC_ATTR_SIZE]);

impl SecAttr {
    pub const fn new(raw: [u8; SEC_ATTR_SIZE]) -> Self {
        Self(raw)
    }

    /// Raw bytes as sent to the card
    pub fn as_bytes(&self) -> &[u8; SEC_ATTR_SIZE] {
        &self.0
    }

    /// Rebuild a vector read back from the card
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; SEC_ATTR_SIZE] = bytes.try_into().ok()?;
        Some(Self(raw))
    }
}

impl From<SecurityRole> for SecAttr {
    fn from(role: SecurityRole) -> Self {
        role.attributes()
    }
}

impl fmt::Debug for SecAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecAttr({})", crate::tlv::hexify(&self.0))
    }
}

// Byte 0 selects the attribute format (0x42 file, 0x43 directory/object).
// 0xFF marks an operation that is never allowed.
const CATALOG: [SecAttr; 7] = [
    // PrivateObject
    SecAttr([0x43, 1, 1, 0, 0, 0, 0, 1, 2, 2, 0, 0, 0, 0, 2]),
    // PublicObject
    SecAttr([0x42, 0, 1, 0, 0, 0, 0, 1, 0, 2, 0, 0, 0, 0, 2]),
    // BaseDirectory
    SecAttr([0x43, 1, 1, 0, 0, 0, 0, 0xFF, 2, 2, 0, 0, 0, 0, 0]),
    // Directory
    SecAttr([0x43, 1, 1, 0, 0, 0, 0, 1, 2, 2, 0, 0, 0, 0, 2]),
    // WorkingFile
    SecAttr([0x42, 0, 1, 0, 0, 0, 0, 1, 0, 2, 0, 0, 0, 0, 2]),
    // AdminPin
    SecAttr([0x43, 1, 1, 0, 0, 0, 0, 0xFF, 1, 1, 0, 0, 0, 0, 0]),
    // UserPin
    SecAttr([0x43, 1, 1, 0, 0, 0, 0, 0xFF, 1, 2, 0, 0, 0, 0, 0]),
];
