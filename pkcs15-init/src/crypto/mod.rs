//! Private key encoding
//!
//! The card stores private keys as opaque encoded blobs. The layout is the
//! encoder's business; the provisioning engine only needs the encoded
//! length to size the key file.

pub mod rsa;

use ::rsa::RsaPrivateKey;

use crate::error::CardResult;

pub use self::rsa::RsaBlobEncoder;

/// Serializes a private key into the card's storage format
pub trait PrivateKeyEncoder {
    /// Write the encoded key into `out` and return the number of bytes used
    fn encode(&self, key: &RsaPrivateKey, out: &mut [u8]) -> CardResult<usize>;
}
