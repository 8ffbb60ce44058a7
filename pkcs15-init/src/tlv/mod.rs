//! Simple-TLV encoding used by the card's create-data-object request
//!
//! See [`DataObjectRequest`](crate::card::DataObjectRequest) for the layout.

mod encoder;
mod parser;

pub use encoder::TlvWriter;
pub use parser::{read_all, TLVError, Tlv, TlvReader};

/// Tags of the create-data-object request
pub mod tags {
    /// Constructed header template
    pub const DO_HEADER: u8 = 0x62;
    /// Body length, two bytes big-endian
    pub const BODY_LENGTH: u8 = 0x80;
    /// Object type and object id
    pub const OBJECT_TYPE_ID: u8 = 0x83;
    /// Options, flags and retry limit
    pub const OBJECT_PARAMS: u8 = 0x85;
    /// Security attribute vector
    pub const SECURITY_ATTRIBUTES: u8 = 0x86;
    /// Object body (the secret for a PIN object)
    pub const DO_BODY: u8 = 0xA5;
}

/// Convert a byte slice to an uppercase hex string for log output
pub fn hexify(value: &[u8]) -> String {
    value.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" ")
}
