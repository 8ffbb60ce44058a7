//! Files for new PKCS#15 objects

use log::{debug, info, warn};

use crate::acl::SecurityRole;
use crate::card::Card;
use crate::error::{CardError, CardResult};
use crate::fs::{allocate_id, ensure_directory, probe, FileDescriptor, Probe};
use crate::objects::{DfType, ObjectClass, ObjectType};
use crate::profile::Profile;

/// Directory type and access role for objects of `object_type`
fn placement(object_type: ObjectType) -> CardResult<(DfType, SecurityRole)> {
    match object_type.class() {
        ObjectClass::Certificate => Ok((DfType::Cdf, SecurityRole::PublicObject)),
        ObjectClass::PublicKey => Ok((DfType::PuKdf, SecurityRole::PublicObject)),
        ObjectClass::DataObject => Ok((DfType::Dodf, SecurityRole::PrivateObject)),
        _ => Err(CardError::NotSupported),
    }
}

/// Describe a fresh empty file for a new object
///
/// The file gets the first free identifier in the object's directory. Any
/// file already sitting at the resulting path is deleted; the caller writes
/// the content.
pub fn new_file<C: Card + ?Sized>(
    card: &mut C,
    profile: &Profile,
    object_type: ObjectType,
    index: u32,
) -> CardResult<FileDescriptor> {
    let (df_type, role) = placement(object_type)?;
    let dir = profile.df_path(df_type)?;
    let id = allocate_id(card, Some(&dir))?;
    debug!("New {:?} #{} gets id {:04X} in {}", object_type, index, id, dir);

    let file = FileDescriptor::working_file(dir.join(id), 0).with_role(role);
    if let Ok(Probe::Present(_)) = probe(card, &file.path) {
        if let Err(e) = card.delete(&file.path) {
            warn!("Failed to remove stale {}: {}", file.path, e);
        }
    }
    info!("Prepared {} for {:?}", file.path, object_type);
    Ok(file)
}

/// Create a directory unless one is already there
pub fn create_dir<C: Card + ?Sized>(card: &mut C, dir: &FileDescriptor) -> CardResult<()> {
    ensure_directory(card, dir)
}
