//! File identifier allocation
//!
//! Provisioned objects get the lowest free identifier below [`MAX_ID`] in
//! their directory. The ceiling is a fixed policy of 255 objects per
//! directory, not a card limit.

use std::collections::HashSet;

use log::debug;

use super::path::Path;
use crate::card::Card;
use crate::error::{CardError, CardResult};

/// Identifiers `0..MAX_ID` are available for allocation
pub const MAX_ID: u16 = 255;

/// Find the first identifier in `0..MAX_ID` missing from a raw directory listing
///
/// The listing is a sequence of big-endian 2-byte identifiers; a dangling
/// odd byte is ignored.
pub fn first_free_id(listing: &[u8]) -> Option<u16> {
    let used: HashSet<u16> = listing
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    (0..MAX_ID).find(|id| !used.contains(id))
}

/// Allocate a free identifier in `parent`, or in the current directory if `None`
///
/// Fails with `NotADirectory` if `parent` selects a working file and with
/// `TooManyObjects` once every identifier below [`MAX_ID`] is taken.
pub fn allocate_id<C: Card + ?Sized>(card: &mut C, parent: Option<&Path>) -> CardResult<u16> {
    if let Some(path) = parent {
        let selected = card.select(path)?;
        if !selected.is_directory() {
            debug!("Cannot allocate an id under working file {}", path);
            return Err(CardError::NotADirectory);
        }
    }

    let listing = card.list_files()?;
    match first_free_id(&listing) {
        Some(id) => {
            debug!("Allocated file id {:04X} ({} ids in use)", id, listing.len() / 2);
            Ok(id)
        }
        None => {
            debug!("No free file id left below {:04X}", MAX_ID);
            Err(CardError::TooManyObjects)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::SecurityRole;
    use crate::card::{CardCtl, VirtualCard};
    use crate::fs::FileDescriptor;

    fn listing(ids: &[u16]) -> Vec<u8> {
        ids.iter().flat_map(|id| id.to_be_bytes()).collect()
    }

    #[test]
    fn test_first_free_id_picks_smallest_gap() {
        assert_eq!(first_free_id(&[]), Some(0));
        assert_eq!(first_free_id(&listing(&[0, 1, 2])), Some(3));
        assert_eq!(first_free_id(&listing(&[1, 0, 3])), Some(2));
        // Ids outside the allocation range never block it
        assert_eq!(first_free_id(&listing(&[0x1001, 0x3F00, 0])), Some(1));
    }

    #[test]
    fn test_first_free_id_is_deterministic() {
        let raw = listing(&[4, 0, 2, 1]);
        assert_eq!(first_free_id(&raw), first_free_id(&raw));
        assert_eq!(first_free_id(&raw), Some(3));
    }

    #[test]
    fn test_first_free_id_exhausted() {
        let full: Vec<u16> = (0..MAX_ID).collect();
        assert_eq!(first_free_id(&listing(&full)), None);

        let almost: Vec<u16> = (0..MAX_ID).filter(|id| *id != 254).collect();
        assert_eq!(first_free_id(&listing(&almost)), Some(254));
    }

    #[test]
    fn test_odd_listing_byte_ignored() {
        let mut raw = listing(&[0]);
        raw.push(0x00);
        assert_eq!(first_free_id(&raw), Some(1));
    }

    fn formatted_card() -> VirtualCard {
        let mut card = VirtualCard::new();
        card.card_ctl(CardCtl::FormatInit, &[]).unwrap();
        card.create(&FileDescriptor::directory(Path::mf()).with_role(SecurityRole::BaseDirectory))
            .unwrap();
        card
    }

    #[test]
    fn test_allocate_id_on_card() {
        let mut card = formatted_card();
        let dir = Path::mf();
        assert_eq!(allocate_id(&mut card, Some(&dir)).unwrap(), 0);

        for id in 0..3u16 {
            card.select(&dir).unwrap();
            card.create(
                &FileDescriptor::working_file(dir.join(id), 0).with_role(SecurityRole::WorkingFile),
            )
            .unwrap();
        }
        assert_eq!(allocate_id(&mut card, Some(&dir)).unwrap(), 3);
        // No creation in between: same answer
        assert_eq!(allocate_id(&mut card, Some(&dir)).unwrap(), 3);
    }

    #[test]
    fn test_allocate_id_exhausted_on_card() {
        let mut card = formatted_card();
        let dir = Path::mf();
        for id in 0..MAX_ID {
            card.select(&dir).unwrap();
            card.create(
                &FileDescriptor::working_file(dir.join(id), 0).with_role(SecurityRole::WorkingFile),
            )
            .unwrap();
        }
        assert_eq!(allocate_id(&mut card, Some(&dir)), Err(CardError::TooManyObjects));
    }

    #[test]
    fn test_allocate_id_requires_directory() {
        let mut card = formatted_card();
        let ef = Path::mf().join(0x0007);
        card.create(&FileDescriptor::working_file(ef.clone(), 4).with_role(SecurityRole::WorkingFile))
            .unwrap();
        assert_eq!(allocate_id(&mut card, Some(&ef)), Err(CardError::NotADirectory));
    }

    #[test]
    fn test_allocate_id_selection_failure_propagates() {
        let mut card = formatted_card();
        let missing = Path::mf().join(0x4444);
        assert_eq!(allocate_id(&mut card, Some(&missing)), Err(CardError::NotFound));
    }
}
