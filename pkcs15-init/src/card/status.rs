//! ISO 7816-4 status words
//!
//! Card backends report failures with these values and
//! [`CardError::from_sw`](crate::CardError::from_sw) classifies them.

pub struct SW;

impl SW {
    pub const SUCCESS: u16 = 0x9000;

    // 64xx / 65xx: the card state changed or could not change
    pub const EXEC_ERROR: u16 = 0x6400;
    pub const MEMORY_FAILURE: u16 = 0x6501;

    pub const WRONG_LENGTH: u16 = 0x6700;

    // 69xx: command refused in the current security or file state
    pub const COMMAND_NOT_ALLOWED: u16 = 0x6900;
    pub const COMMAND_INCOMPATIBLE: u16 = 0x6981;
    pub const SECURITY_STATUS_NOT_SATISFIED: u16 = 0x6982;
    pub const AUTH_METHOD_BLOCKED: u16 = 0x6983;
    pub const CONDITIONS_NOT_SATISFIED: u16 = 0x6985;
    /// UPDATE BINARY without a selected working file
    pub const COMMAND_NOT_ALLOWED_NO_EF: u16 = 0x6986;

    // 6Axx: wrong parameters or missing objects
    pub const WRONG_DATA: u16 = 0x6A80;
    pub const FUNCTION_NOT_SUPPORTED: u16 = 0x6A81;
    pub const FILE_NOT_FOUND: u16 = 0x6A82;
    pub const RECORD_NOT_FOUND: u16 = 0x6A83;
    pub const NOT_ENOUGH_MEMORY: u16 = 0x6A84;
    pub const INCORRECT_P1_P2: u16 = 0x6A86;
    pub const REFERENCED_DATA_NOT_FOUND: u16 = 0x6A88;
    pub const FILE_ALREADY_EXISTS: u16 = 0x6A89;

    pub const WRONG_P1_P2: u16 = 0x6B00;
    pub const INS_NOT_SUPPORTED: u16 = 0x6D00;
    pub const UNKNOWN_ERROR: u16 = 0x6F00;

    /// Wrong PIN with `retries` attempts left (63Cx); counts above 15 saturate the nibble
    pub fn counter_warning(retries: u8) -> u16 {
        0x63C0 | u16::from(retries & 0x0F)
    }

    /// Attempts left according to a 63Cx warning
    pub fn retries_left(sw: u16) -> Option<u8> {
        ((sw & 0xFFF0) == 0x63C0).then(|| (sw & 0x0F) as u8)
    }
}
