//! RSA private key blob encoding
//!
//! Writes the PRIVATEKEYBLOB layout rutoken-style cards accept:
//!
//! ```text
//! BLOBHEADER   type(1) version(1) reserved(2) alg_id(4)
//! RSAPUBKEY    magic "RSA2"(4) bitlen(4) pubexp(4)
//! modulus      bitlen/8
//! prime1       bitlen/16
//! prime2       bitlen/16
//! exponent1    bitlen/16
//! exponent2    bitlen/16
//! coefficient  bitlen/16
//! priv_exp     bitlen/8
//! ```
//!
//! Every integer is little-endian, big numbers zero-padded to their slot.

use log::debug;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey};
use zeroize::Zeroizing;

use super::PrivateKeyEncoder;
use crate::error::{CardError, CardResult};

const PRIVATEKEYBLOB: u8 = 0x07;
const CUR_BLOB_VERSION: u8 = 0x02;
const CALG_RSA_KEYX: u32 = 0x0000_A400;
const RSA2_MAGIC: u32 = 0x3241_5352;

/// Header bytes preceding the key components
pub const BLOB_HEADER_LEN: usize = 20;

/// Default private key encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaBlobEncoder;

impl RsaBlobEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encoded size of a key with a `bits`-bit modulus
    pub fn blob_len(bits: usize) -> usize {
        BLOB_HEADER_LEN + 2 * (bits / 8) + 5 * (bits / 16)
    }

    /// Build the blob for `key`
    pub fn to_blob(key: &RsaPrivateKey) -> CardResult<Zeroizing<Vec<u8>>> {
        let primes = key.primes();
        if primes.len() != 2 {
            return Err(CardError::NotSupported);
        }
        let (p, q) = (&primes[0], &primes[1]);

        let bits = key.n().bits();
        if bits % 16 != 0 {
            return Err(CardError::InvalidArguments(format!(
                "modulus of {} bits is not a multiple of 16",
                bits
            )));
        }
        let full = bits / 8;
        let half = bits / 16;

        let e = key.e().to_bytes_le();
        if e.len() > 4 {
            return Err(CardError::InvalidArguments("public exponent exceeds 32 bits".into()));
        }
        let mut pubexp = [0u8; 4];
        pubexp[..e.len()].copy_from_slice(&e);

        let one = BigUint::from(1u64);
        let dp = Zeroizing::new(key.d() % &(p - &one));
        let dq = Zeroizing::new(key.d() % &(q - &one));
        let qinv = key
            .crt_coefficient()
            .ok_or_else(|| CardError::Internal("cannot compute CRT coefficient".into()))?;
        let qinv = Zeroizing::new(qinv);

        let mut blob = Zeroizing::new(Vec::with_capacity(Self::blob_len(bits)));
        blob.push(PRIVATEKEYBLOB);
        blob.push(CUR_BLOB_VERSION);
        blob.extend_from_slice(&0u16.to_le_bytes());
        blob.extend_from_slice(&CALG_RSA_KEYX.to_le_bytes());
        blob.extend_from_slice(&RSA2_MAGIC.to_le_bytes());
        blob.extend_from_slice(&(bits as u32).to_le_bytes());
        blob.extend_from_slice(&pubexp);

        put_le(&mut blob, key.n(), full)?;
        put_le(&mut blob, p, half)?;
        put_le(&mut blob, q, half)?;
        put_le(&mut blob, &dp, half)?;
        put_le(&mut blob, &dq, half)?;
        put_le(&mut blob, &qinv, half)?;
        put_le(&mut blob, key.d(), full)?;

        debug!("Encoded RSA-{} private key blob ({} bytes)", bits, blob.len());
        Ok(blob)
    }
}

/// Append `value` little-endian, zero-padded to `width` bytes
fn put_le(out: &mut Vec<u8>, value: &BigUint, width: usize) -> CardResult<()> {
    let bytes = Zeroizing::new(value.to_bytes_le());
    if bytes.len() > width {
        return Err(CardError::InvalidArguments(format!(
            "key component of {} bytes does not fit {} bytes",
            bytes.len(),
            width
        )));
    }
    out.extend_from_slice(&bytes);
    out.resize(out.len() + width - bytes.len(), 0);
    Ok(())
}

impl PrivateKeyEncoder for RsaBlobEncoder {
    fn encode(&self, key: &RsaPrivateKey, out: &mut [u8]) -> CardResult<usize> {
        let blob = Self::to_blob(key)?;
        let capacity = out.len();
        let target = out.get_mut(..blob.len()).ok_or_else(|| {
            CardError::InvalidArguments(format!(
                "encoded key needs {} bytes, buffer holds {}",
                blob.len(),
                capacity
            ))
        })?;
        target.copy_from_slice(&blob);
        Ok(blob.len())
    }
}
