//! Profile-driven directory layout
//!
//! Walks the profile's file list and creates every file below the root,
//! then the fixed-id object directory next to each well-known directory
//! file. Requires an open user session once the card has left format mode.

use log::{debug, error, info};

use crate::acl::SecurityRole;
use crate::card::Card;
use crate::error::{CardError, CardResult};
use crate::fs::FileDescriptor;
use crate::objects::role_for_name;
use crate::profile::Profile;

/// Create every profile file, aborting on the first failure
///
/// Failing to create a role directory is logged and does not abort the walk.
pub fn provision_directories<C: Card + ?Sized>(card: &mut C, profile: &Profile) -> CardResult<()> {
    for entry in profile.entries() {
        if entry.path.len() <= 2 {
            continue;
        }
        let parent = entry
            .path
            .parent()
            .ok_or_else(|| CardError::InvalidArguments(format!("{} has no parent", entry.path)))?;
        card.select(&parent).map_err(|e| {
            debug!("Failed to select {}: {}", parent, e);
            e
        })?;

        let mut file = entry.template();
        file.set_role(if file.is_directory() {
            SecurityRole::Directory
        } else {
            SecurityRole::WorkingFile
        });
        card.create(&file).map_err(|e| {
            error!("Failed to create {} ({}) from profile: {}", entry.name, entry.path, e);
            e
        })?;
        info!("Created {} at {}", entry.name, entry.path);

        let Some(id) = role_for_name(&entry.name).and_then(|role| role.id) else {
            continue;
        };
        let dir = FileDescriptor::directory(parent.join(id)).with_role(SecurityRole::Directory);
        let created = if file.is_directory() {
            card.select(&parent).and_then(|_| card.create(&dir))
        } else {
            card.create(&dir)
        };
        match created {
            Ok(()) => info!("Created object directory {}", dir.path),
            Err(e) => error!("Failed to create object directory {}: {}", dir.path, e),
        }
    }
    Ok(())
}
