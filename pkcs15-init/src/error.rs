//! Error taxonomy shared by the provisioning engine and card backends

use thiserror::Error;

use crate::card::status::SW;
use crate::tlv::TLVError;

/// Errors reported by card operations and provisioning steps
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CardError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Out of memory")]
    OutOfMemory,

    #[error("File not found")]
    NotFound,

    #[error("Too many objects")]
    TooManyObjects,

    #[error("Operation not supported")]
    NotSupported,

    #[error("Wrong card state")]
    WrongCardState,

    #[error("Selected file is not a directory")]
    NotADirectory,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not allowed")]
    NotAllowed,

    #[error("Card returned status {0:04X}")]
    Card(u16),
}

/// Result type used throughout the crate
pub type CardResult<T> = Result<T, CardError>;

impl CardError {
    /// Map a status word reported by the card onto the error taxonomy
    pub fn from_sw(sw: u16) -> Self {
        match sw {
            SW::FILE_NOT_FOUND | SW::RECORD_NOT_FOUND | SW::REFERENCED_DATA_NOT_FOUND => {
                Self::NotFound
            }
            SW::SECURITY_STATUS_NOT_SATISFIED
            | SW::CONDITIONS_NOT_SATISFIED
            | SW::COMMAND_NOT_ALLOWED
            | SW::AUTH_METHOD_BLOCKED => Self::NotAllowed,
            SW::NOT_ENOUGH_MEMORY | SW::MEMORY_FAILURE => Self::OutOfMemory,
            SW::FUNCTION_NOT_SUPPORTED | SW::INS_NOT_SUPPORTED => Self::NotSupported,
            SW::COMMAND_INCOMPATIBLE => Self::WrongCardState,
            SW::WRONG_DATA | SW::WRONG_LENGTH | SW::INCORRECT_P1_P2 | SW::WRONG_P1_P2 => {
                Self::InvalidArguments(format!("card rejected command data ({:04X})", sw))
            }
            other => Self::Card(other),
        }
    }

    /// True for the "object is absent" outcome expected while probing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl From<u16> for CardError {
    fn from(sw: u16) -> Self {
        Self::from_sw(sw)
    }
}

impl From<TLVError> for CardError {
    fn from(e: TLVError) -> Self {
        Self::InvalidArguments(format!("malformed TLV: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sw_not_found() {
        assert_eq!(CardError::from_sw(SW::FILE_NOT_FOUND), CardError::NotFound);
        assert!(CardError::from_sw(0x6A82).is_not_found());
    }

    #[test]
    fn test_from_sw_permission() {
        assert_eq!(CardError::from_sw(SW::SECURITY_STATUS_NOT_SATISFIED), CardError::NotAllowed);
        assert_eq!(CardError::from_sw(SW::AUTH_METHOD_BLOCKED), CardError::NotAllowed);
    }

    #[test]
    fn test_from_sw_generic() {
        let err: CardError = 0x6F00.into();
        assert_eq!(err, CardError::Card(0x6F00));
        assert_eq!(err.to_string(), "Card returned status 6F00");
    }
}
