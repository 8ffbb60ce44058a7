//! Card access
//!
//! [`Card`] is the device-operations collaborator the provisioning engine
//! drives. Every call blocks until the card answers; "current directory" is
//! card-side session state, so callers re-select before create or delete.
//!
//! [`VirtualCard`] is an in-memory implementation used for tests and for
//! rehearsing a profile before touching a real token.

pub mod data_object;
pub mod security_state;
pub mod state;
pub mod status;
pub mod storage;
pub mod virtual_card;

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::CardResult;
use crate::fs::{FileDescriptor, Path};

pub use data_object::DataObjectRequest;
pub use security_state::{SecurityCondition, SecurityState};
pub use state::{CardImage, FileNode, PinRecord};
pub use status::SW;
pub use storage::CardImageStore;
pub use virtual_card::{CardCall, VirtualCard};

/// Card control requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardCtl {
    /// Wipe the card and enter format mode
    FormatInit,
    /// Leave format mode
    FormatEnd,
    /// Create a data object (PIN) from an encoded request
    CreateDataObject,
}

/// Kind of authentication object a VERIFY addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthKind {
    /// Card holder verification (PIN)
    Chv,
}

/// Device operations the provisioning engine needs
pub trait Card {
    /// Select `path`, returning the metadata of the selected file.
    /// Selecting a working file makes its parent the current directory.
    fn select(&mut self, path: &Path) -> CardResult<FileDescriptor>;

    /// Create `file` in the current directory and select it
    fn create(&mut self, file: &FileDescriptor) -> CardResult<()>;

    /// Delete the file at `path`
    fn delete(&mut self, path: &Path) -> CardResult<()>;

    /// Identifiers present in the current directory as raw 2-byte pairs
    fn list_files(&mut self) -> CardResult<Vec<u8>>;

    /// Issue a card control request
    fn card_ctl(&mut self, ctl: CardCtl, payload: &[u8]) -> CardResult<()>;

    /// Verify a PIN, opening an elevated session on success
    fn verify(&mut self, kind: AuthKind, id: u8, secret: &[u8]) -> CardResult<()>;

    /// Drop every verified PIN of the session
    fn logout(&mut self) -> CardResult<()>;

    /// Write `data` into the currently selected working file
    fn update_binary(&mut self, offset: usize, data: &[u8]) -> CardResult<usize>;
}

impl<C: Card + ?Sized> Card for &mut C {
    fn select(&mut self, path: &Path) -> CardResult<FileDescriptor> {
        (**self).select(path)
    }

    fn create(&mut self, file: &FileDescriptor) -> CardResult<()> {
        (**self).create(file)
    }

    fn delete(&mut self, path: &Path) -> CardResult<()> {
        (**self).delete(path)
    }

    fn list_files(&mut self) -> CardResult<Vec<u8>> {
        (**self).list_files()
    }

    fn card_ctl(&mut self, ctl: CardCtl, payload: &[u8]) -> CardResult<()> {
        (**self).card_ctl(ctl, payload)
    }

    fn verify(&mut self, kind: AuthKind, id: u8, secret: &[u8]) -> CardResult<()> {
        (**self).verify(kind, id, secret)
    }

    fn logout(&mut self) -> CardResult<()> {
        (**self).logout()
    }

    fn update_binary(&mut self, offset: usize, data: &[u8]) -> CardResult<usize> {
        (**self).update_binary(offset, data)
    }
}

/// A card handle that can be cloned across the layers talking to one device
///
/// Each operation holds the lock for its duration, the same serialization
/// the physical card imposes.
pub struct SharedCard<C> {
    inner: Arc<Mutex<C>>,
}

impl<C> SharedCard<C> {
    pub fn new(card: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(card)),
        }
    }

    /// Lock the card for direct inspection
    pub fn lock(&self) -> MutexGuard<'_, C> {
        self.inner.lock()
    }
}

impl<C> Clone for SharedCard<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Card> Card for SharedCard<C> {
    fn select(&mut self, path: &Path) -> CardResult<FileDescriptor> {
        self.inner.lock().select(path)
    }

    fn create(&mut self, file: &FileDescriptor) -> CardResult<()> {
        self.inner.lock().create(file)
    }

    fn delete(&mut self, path: &Path) -> CardResult<()> {
        self.inner.lock().delete(path)
    }

    fn list_files(&mut self) -> CardResult<Vec<u8>> {
        self.inner.lock().list_files()
    }

    fn card_ctl(&mut self, ctl: CardCtl, payload: &[u8]) -> CardResult<()> {
        self.inner.lock().card_ctl(ctl, payload)
    }

    fn verify(&mut self, kind: AuthKind, id: u8, secret: &[u8]) -> CardResult<()> {
        self.inner.lock().verify(kind, id, secret)
    }

    fn logout(&mut self) -> CardResult<()> {
        self.inner.lock().logout()
    }

    fn update_binary(&mut self, offset: usize, data: &[u8]) -> CardResult<usize> {
        self.inner.lock().update_binary(offset, data)
    }
}
