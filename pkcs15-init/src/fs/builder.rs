//! File system building primitives
//!
//! Probing selects classify "not found" as an expected outcome through
//! [`Probe`] instead of muting error reporting on the card context.

use log::{debug, info};

use super::file::FileDescriptor;
use super::path::Path;
use crate::card::Card;
use crate::error::{CardError, CardResult};

/// Outcome of a select whose target may legitimately be absent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Present(FileDescriptor),
    Absent,
}

impl Probe {
    pub fn is_present(&self) -> bool {
        matches!(self, Probe::Present(_))
    }
}

/// Select `path`, reporting absence as [`Probe::Absent`]
///
/// Any error other than `NotFound` is a real failure and propagates.
pub fn probe<C: Card + ?Sized>(card: &mut C, path: &Path) -> CardResult<Probe> {
    match card.select(path) {
        Ok(file) => Ok(Probe::Present(file)),
        Err(CardError::NotFound) => Ok(Probe::Absent),
        Err(e) => Err(e),
    }
}

fn parent_of(path: &Path) -> CardResult<Path> {
    path.parent()
        .ok_or_else(|| CardError::InvalidArguments(format!("{} has no parent directory", path)))
}

/// Create `file`, deleting whatever already sits at its identifier
///
/// With `path` set, an existing file at `parent(path)/file.id` is removed
/// and the parent directory selected before the create. Without a path the
/// file is created in the current directory.
pub fn create_or_replace<C: Card + ?Sized>(
    card: &mut C,
    path: Option<&Path>,
    file: &FileDescriptor,
) -> CardResult<()> {
    if let Some(path) = path {
        let parent = parent_of(path)?;
        if probe(card, path)?.is_present() {
            let sibling = parent.join(file.id);
            if probe(card, &sibling)?.is_present() {
                info!("Replacing existing file {}", sibling);
                card.delete(&sibling)?;
            }
        }
        card.select(&parent)?;
    }
    debug!("Creating {:?} {:04X} ({} bytes)", file.kind, file.id, file.size);
    card.create(file)
}

/// Make sure a directory exists at `dir.path`
///
/// Creates it if absent. An existing directory is left untouched; a working
/// file in its place fails with `WrongCardState`.
pub fn ensure_directory<C: Card + ?Sized>(card: &mut C, dir: &FileDescriptor) -> CardResult<()> {
    if !dir.is_directory() {
        return Err(CardError::InvalidArguments(format!(
            "{} is not a directory descriptor",
            dir.path
        )));
    }

    match probe(card, &dir.path)? {
        Probe::Present(existing) if existing.is_directory() => {
            debug!("Directory {} already present", dir.path);
            Ok(())
        }
        Probe::Present(_) => Err(CardError::WrongCardState),
        Probe::Absent => {
            if let Some(parent) = dir.parent() {
                card.select(&parent)?;
            }
            info!("Creating directory {}", dir.path);
            card.create(dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::SecurityRole;
    use crate::card::{CardCall, CardCtl, VirtualCard};
    use crate::card::status::SW;

    fn formatted_card() -> VirtualCard {
        let mut card = VirtualCard::new();
        card.card_ctl(CardCtl::FormatInit, &[]).unwrap();
        card.create(&FileDescriptor::directory(Path::mf()).with_role(SecurityRole::BaseDirectory))
            .unwrap();
        card
    }

    fn creates(card: &VirtualCard) -> usize {
        card.calls().iter().filter(|c| matches!(c, CardCall::Create(_))).count()
    }

    #[test]
    fn test_probe_classifies_absence() {
        let mut card = formatted_card();
        assert!(probe(&mut card, &Path::mf()).unwrap().is_present());
        assert_eq!(probe(&mut card, &Path::mf().join(0x0101)).unwrap(), Probe::Absent);
    }

    #[test]
    fn test_probe_propagates_real_errors() {
        let mut card = formatted_card();
        card.fail_next(CardCall::Select(Path::mf()), SW::UNKNOWN_ERROR);
        assert_eq!(probe(&mut card, &Path::mf()), Err(CardError::Card(SW::UNKNOWN_ERROR)));
    }

    #[test]
    fn test_create_or_replace_is_idempotent() {
        let mut card = formatted_card();
        let path = Path::mf().join(0x0010);
        let file = FileDescriptor::working_file(path.clone(), 32).with_role(SecurityRole::PrivateObject);

        create_or_replace(&mut card, Some(&path), &file).unwrap();
        card.update_binary(0, &[0xAA; 4]).unwrap();
        let once = card.image();

        create_or_replace(&mut card, Some(&path), &file).unwrap();
        card.update_binary(0, &[0xAA; 4]).unwrap();
        assert_eq!(card.image(), once);
        assert!(card.calls().contains(&CardCall::Delete(path)));
    }

    #[test]
    fn test_create_or_replace_without_path_uses_current_dir() {
        let mut card = formatted_card();
        card.select(&Path::mf()).unwrap();
        let file = FileDescriptor::working_file(Path::mf().join(0x0011), 8)
            .with_role(SecurityRole::WorkingFile);
        create_or_replace(&mut card, None, &file).unwrap();
        assert!(card.file(&Path::mf().join(0x0011)).is_some());
    }

    #[test]
    fn test_create_or_replace_propagates_create_failure() {
        let mut card = formatted_card();
        let path = Path::mf().join(0x0012);
        // No security attributes: the card refuses the file
        let file = FileDescriptor::working_file(path.clone(), 8);
        assert!(create_or_replace(&mut card, Some(&path), &file).is_err());
        assert!(card.file(&path).is_none());
    }

    #[test]
    fn test_ensure_directory_creates_missing() {
        let mut card = formatted_card();
        let dir = FileDescriptor::directory(Path::mf().join(0x5015)).with_role(SecurityRole::Directory);
        ensure_directory(&mut card, &dir).unwrap();
        assert!(card.file(&dir.path).unwrap().is_directory());
    }

    #[test]
    fn test_ensure_directory_existing_is_noop() {
        let mut card = formatted_card();
        let dir = FileDescriptor::directory(Path::mf().join(0x5015)).with_role(SecurityRole::Directory);
        ensure_directory(&mut card, &dir).unwrap();
        let before = creates(&card);

        ensure_directory(&mut card, &dir).unwrap();
        assert_eq!(creates(&card), before);
    }

    #[test]
    fn test_ensure_directory_refuses_working_file() {
        let mut card = formatted_card();
        let path = Path::mf().join(0x5015);
        card.create(&FileDescriptor::working_file(path.clone(), 4).with_role(SecurityRole::WorkingFile))
            .unwrap();

        let dir = FileDescriptor::directory(path).with_role(SecurityRole::Directory);
        assert_eq!(ensure_directory(&mut card, &dir), Err(CardError::WrongCardState));
    }
}
