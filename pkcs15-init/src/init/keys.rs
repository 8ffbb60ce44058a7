//! Private key storage
//!
//! A private key lives in a working file named by its key reference inside
//! the private-key directory. The file is sized to the encoded key and
//! replaced if it already exists.

use log::{debug, info, warn};
use rsa::RsaPrivateKey;
use zeroize::{Zeroize, Zeroizing};

use crate::acl::SecurityRole;
use crate::card::Card;
use crate::crypto::PrivateKeyEncoder;
use crate::error::{CardError, CardResult};
use crate::fs::{create_or_replace, FileDescriptor, Path, MAX_ID};
use crate::objects::{DfType, ObjectType};
use crate::profile::Profile;

/// Capacity of the encoding buffer
pub const KEY_BUFFER_SIZE: usize = 2048;

/// Where a private key goes and how large it ended up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInfo {
    /// Set by [`select_key_reference`]
    pub path: Path,
    pub key_reference: u8,
    /// Set by [`store_key`]
    pub encoded_size: usize,
}

impl KeyInfo {
    pub fn new(key_reference: u8) -> Self {
        Self {
            key_reference,
            ..Self::default()
        }
    }
}

/// A private key object being provisioned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyObject {
    pub object_type: ObjectType,
    pub info: KeyInfo,
}

impl KeyObject {
    pub fn rsa(key_reference: u8) -> Self {
        Self {
            object_type: ObjectType::PrivateKeyRsa,
            info: KeyInfo::new(key_reference),
        }
    }
}

/// Place the key inside the private-key directory under its reference
pub fn select_key_reference(profile: &Profile, info: &mut KeyInfo) -> CardResult<()> {
    let dir = profile.df_path(DfType::PrKdf).map_err(|e| {
        debug!("Cannot resolve the private key directory: {}", e);
        e
    })?;
    if u16::from(info.key_reference) >= MAX_ID {
        return Err(CardError::TooManyObjects);
    }
    info.path = dir.join(u16::from(info.key_reference));
    debug!("Key reference {} maps to {}", info.key_reference, info.path);
    Ok(())
}

/// Nothing to do: key storage is created when the key is stored
pub fn create_key(object: &KeyObject) -> CardResult<()> {
    debug!("create_key({:?}): storage is allocated by store_key", object.object_type);
    Ok(())
}

/// Encode `key` and write it to the card
///
/// Returns the encoded length. The encoding never outlives the call.
pub fn store_key<C, E>(card: &mut C, encoder: &E, object: &mut KeyObject, key: &RsaPrivateKey) -> CardResult<usize>
where
    C: Card + ?Sized,
    E: PrivateKeyEncoder + ?Sized,
{
    if object.object_type != ObjectType::PrivateKeyRsa {
        return Err(CardError::NotSupported);
    }
    let mut buffer = Zeroizing::new(vec![0u8; KEY_BUFFER_SIZE]);
    let len = store_key_in(card, encoder, &object.info, key, &mut buffer)?;
    object.info.encoded_size = len;
    Ok(len)
}

/// [`store_key`] over a caller-supplied buffer, zeroed before returning
fn store_key_in<C, E>(card: &mut C, encoder: &E, info: &KeyInfo, key: &RsaPrivateKey, buffer: &mut [u8]) -> CardResult<usize>
where
    C: Card + ?Sized,
    E: PrivateKeyEncoder + ?Sized,
{
    let len = match encoder.encode(key, buffer) {
        Ok(len) if len <= buffer.len() => len,
        Ok(len) => {
            buffer.zeroize();
            return Err(CardError::Internal(format!("encoder reported {} bytes", len)));
        }
        Err(e) => {
            buffer.zeroize();
            return Err(e);
        }
    };

    let result = write_key_file(card, info, &buffer[..len]);
    buffer[..len].zeroize();
    result.map(|_| len)
}

fn write_key_file<C: Card + ?Sized>(card: &mut C, info: &KeyInfo, encoded: &[u8]) -> CardResult<()> {
    if info.path.file_id() != Some(u16::from(info.key_reference)) {
        return Err(CardError::InvalidArguments(format!(
            "key path {} does not end in reference {}",
            info.path, info.key_reference
        )));
    }
    let file = FileDescriptor::working_file(info.path.clone(), encoded.len())
        .with_role(SecurityRole::PrivateObject);
    create_or_replace(card, Some(&info.path), &file)?;

    let written = card.update_binary(0, encoded)?;
    if written != encoded.len() {
        warn!("Short key write: {} of {} bytes", written, encoded.len());
        return Err(CardError::Internal(format!(
            "wrote {} of {} key bytes",
            written,
            encoded.len()
        )));
    }
    info!("Stored private key {} ({} bytes)", info.path, written);
    Ok(())
}
