//! In-memory card emulation
//!
//! Models the parts of an ISO 7816-4 file system the provisioning engine
//! touches: an MF/DF/EF tree with a current-directory pointer, format mode,
//! PIN data objects and the verified-session state. Every call is recorded,
//! and a failure status can be injected for the next matching call.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use super::data_object::{DataObjectRequest, DO_TYPE_CHV};
use super::security_state::{SecurityCondition, SecurityState};
use super::state::{CardImage, FileNode, PinRecord};
use super::status::SW;
use super::{AuthKind, Card, CardCtl};
use crate::error::{CardError, CardResult};
use crate::fs::{FileDescriptor, FileKind, Path, MF_ID};

/// A call received by a [`VirtualCard`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardCall {
    Select(Path),
    /// Create, with the path declared by the descriptor
    Create(Path),
    Delete(Path),
    ListFiles,
    Ctl(CardCtl),
    Verify(u8),
    Logout,
    /// Update of the selected file at the given offset
    UpdateBinary(usize),
}

#[derive(Debug)]
struct Fault {
    call: CardCall,
    skip: usize,
    sw: u16,
}

/// Emulated card
#[derive(Debug, Default)]
pub struct VirtualCard {
    files: BTreeMap<Path, FileNode>,
    pins: BTreeMap<u8, PinRecord>,
    format_mode: bool,
    current_df: Option<Path>,
    current_ef: Option<Path>,
    security_state: SecurityState,
    calls: Vec<CardCall>,
    faults: Vec<Fault>,
}

impl VirtualCard {
    /// A blank card: no file system, no PINs
    pub fn new() -> Self {
        Self::default()
    }

    /// A card holding a previously saved image
    pub fn from_image(image: CardImage) -> Self {
        Self {
            files: image.files.into_iter().map(|f| (f.path.clone(), f)).collect(),
            pins: image.pins.into_iter().map(|p| (p.id, p)).collect(),
            format_mode: image.format_mode,
            ..Self::default()
        }
    }

    /// Snapshot of the persistent content
    pub fn image(&self) -> CardImage {
        CardImage {
            files: self.files.values().cloned().collect(),
            pins: self.pins.values().cloned().collect(),
            format_mode: self.format_mode,
        }
    }

    pub fn file(&self, path: &Path) -> Option<&FileNode> {
        self.files.get(path)
    }

    pub fn pin(&self, id: u8) -> Option<&PinRecord> {
        self.pins.get(&id)
    }

    pub fn is_format_mode(&self) -> bool {
        self.format_mode
    }

    pub fn security_state(&self) -> &SecurityState {
        &self.security_state
    }

    pub fn current_df(&self) -> Option<&Path> {
        self.current_df.as_ref()
    }

    /// Every call received so far, oldest first
    pub fn calls(&self) -> &[CardCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Make the next call equal to `call` fail with status `sw`
    pub fn fail_next(&mut self, call: CardCall, sw: u16) {
        self.fail_later(call, 0, sw);
    }

    /// Let `skip` calls equal to `call` through, then fail the next one
    pub fn fail_later(&mut self, call: CardCall, skip: usize, sw: u16) {
        self.faults.push(Fault { call, skip, sw });
    }

    /// Record `call` and return the injected failure, if any
    fn enter(&mut self, call: CardCall) -> Result<(), u16> {
        let idx = self.faults.iter().position(|f| f.call == call);
        self.calls.push(call);
        let Some(idx) = idx else {
            return Ok(());
        };
        if self.faults[idx].skip > 0 {
            self.faults[idx].skip -= 1;
            return Ok(());
        }
        let fault = self.faults.remove(idx);
        debug!("Injected failure {:04X} for {:?}", fault.sw, fault.call);
        Err(fault.sw)
    }

    fn check_write_access(&self) -> Result<(), u16> {
        if self.format_mode || self.security_state.any_verified() {
            Ok(())
        } else {
            Err(SW::SECURITY_STATUS_NOT_SATISFIED)
        }
    }

    fn do_select(&mut self, path: &Path) -> Result<FileDescriptor, u16> {
        let node = self.files.get(path).ok_or(SW::FILE_NOT_FOUND)?;
        let descriptor = node.to_descriptor();
        if node.is_directory() {
            self.current_df = Some(path.clone());
            self.current_ef = None;
        } else {
            self.current_df = path.parent();
            self.current_ef = Some(path.clone());
        }
        Ok(descriptor)
    }

    fn do_create(&mut self, file: &FileDescriptor) -> Result<(), u16> {
        self.check_write_access()?;
        let sec_attr = file.sec_attr.ok_or(SW::WRONG_DATA)?;

        let path = match &self.current_df {
            None if file.id == MF_ID && file.kind == FileKind::Directory => Path::mf(),
            None => return Err(SW::CONDITIONS_NOT_SATISFIED),
            Some(_) if file.id == MF_ID => return Err(SW::FILE_ALREADY_EXISTS),
            Some(df) => df.join(file.id),
        };
        if self.files.contains_key(&path) {
            return Err(SW::FILE_ALREADY_EXISTS);
        }

        debug!("Card creates {:?} {}", file.kind, path);
        let node = FileNode::from_descriptor(path.clone(), file, &sec_attr);
        self.files.insert(path.clone(), node);
        match file.kind {
            FileKind::Directory => {
                self.current_df = Some(path);
                self.current_ef = None;
            }
            FileKind::WorkingFile => self.current_ef = Some(path),
        }
        Ok(())
    }

    fn do_delete(&mut self, path: &Path) -> Result<(), u16> {
        self.check_write_access()?;
        if !self.files.contains_key(path) {
            return Err(SW::FILE_NOT_FOUND);
        }
        if self.files.keys().any(|p| p != path && p.starts_with(path)) {
            return Err(SW::COMMAND_INCOMPATIBLE);
        }

        self.files.remove(path);
        if self.current_ef.as_ref() == Some(path) {
            self.current_ef = None;
        }
        if self.current_df.as_ref() == Some(path) {
            self.current_df = path.parent();
        }
        debug!("Card deleted {}", path);
        Ok(())
    }

    fn do_list_files(&self) -> Result<Vec<u8>, u16> {
        let df = self.current_df.as_ref().ok_or(SW::CONDITIONS_NOT_SATISFIED)?;
        Ok(self
            .files
            .keys()
            .filter(|p| p.parent().as_ref() == Some(df))
            .filter_map(Path::file_id)
            .flat_map(u16::to_be_bytes)
            .collect())
    }

    fn do_card_ctl(&mut self, ctl: CardCtl, payload: &[u8]) -> Result<(), u16> {
        match ctl {
            CardCtl::FormatInit => {
                self.files.clear();
                self.pins.clear();
                self.security_state.clear_all();
                self.current_df = None;
                self.current_ef = None;
                self.format_mode = true;
                info!("Card erased, format mode entered");
                Ok(())
            }
            CardCtl::FormatEnd => {
                if !self.format_mode {
                    return Err(SW::CONDITIONS_NOT_SATISFIED);
                }
                self.format_mode = false;
                info!("Format mode left");
                Ok(())
            }
            CardCtl::CreateDataObject => {
                if !self.format_mode && !self.security_state.is_verified(SecurityCondition::Admin) {
                    return Err(SW::SECURITY_STATUS_NOT_SATISFIED);
                }
                let request = DataObjectRequest::decode(payload).map_err(|e| {
                    warn!("Rejecting data object: {}", e);
                    SW::WRONG_DATA
                })?;
                if request.object_type != DO_TYPE_CHV {
                    return Err(SW::FUNCTION_NOT_SUPPORTED);
                }
                if self.pins.contains_key(&request.id) {
                    return Err(SW::FILE_ALREADY_EXISTS);
                }
                let record = PinRecord::new(
                    request.id,
                    request.options,
                    request.flags,
                    request.retry_limit,
                    &request.body,
                    request.sec_attr.as_bytes(),
                );
                info!("Created PIN object {:02X} ({} tries)", record.id, record.max_retries);
                self.pins.insert(record.id, record);
                Ok(())
            }
        }
    }

    fn do_verify(&mut self, kind: AuthKind, id: u8, secret: &[u8]) -> Result<(), u16> {
        let AuthKind::Chv = kind;
        let pin = self.pins.get_mut(&id).ok_or(SW::REFERENCED_DATA_NOT_FOUND)?;
        pin.verify(secret)?;
        let condition = SecurityCondition::from_options(pin.options).unwrap_or(SecurityCondition::User);
        self.security_state.set_verified(condition);
        debug!("PIN {:02X} verified ({:?})", id, condition);
        Ok(())
    }

    fn do_update_binary(&mut self, offset: usize, data: &[u8]) -> Result<usize, u16> {
        self.check_write_access()?;
        let path = self.current_ef.clone().ok_or(SW::COMMAND_NOT_ALLOWED_NO_EF)?;
        let node = self.files.get_mut(&path).ok_or(SW::COMMAND_NOT_ALLOWED_NO_EF)?;
        let end = offset.checked_add(data.len()).ok_or(SW::WRONG_LENGTH)?;
        if end > node.data.len() {
            return Err(SW::WRONG_LENGTH);
        }
        node.data[offset..end].copy_from_slice(data);
        Ok(data.len())
    }
}

fn status<T>(result: Result<T, u16>) -> CardResult<T> {
    result.map_err(CardError::from_sw)
}

impl Card for VirtualCard {
    fn select(&mut self, path: &Path) -> CardResult<FileDescriptor> {
        status(self.enter(CardCall::Select(path.clone())).and_then(|_| self.do_select(path)))
    }

    fn create(&mut self, file: &FileDescriptor) -> CardResult<()> {
        status(self.enter(CardCall::Create(file.path.clone())).and_then(|_| self.do_create(file)))
    }

    fn delete(&mut self, path: &Path) -> CardResult<()> {
        status(self.enter(CardCall::Delete(path.clone())).and_then(|_| self.do_delete(path)))
    }

    fn list_files(&mut self) -> CardResult<Vec<u8>> {
        status(self.enter(CardCall::ListFiles).and_then(|_| self.do_list_files()))
    }

    fn card_ctl(&mut self, ctl: CardCtl, payload: &[u8]) -> CardResult<()> {
        status(self.enter(CardCall::Ctl(ctl)).and_then(|_| self.do_card_ctl(ctl, payload)))
    }

    fn verify(&mut self, kind: AuthKind, id: u8, secret: &[u8]) -> CardResult<()> {
        status(self.enter(CardCall::Verify(id)).and_then(|_| self.do_verify(kind, id, secret)))
    }

    fn logout(&mut self) -> CardResult<()> {
        status(self.enter(CardCall::Logout))?;
        self.security_state.clear_all();
        debug!("Session rights reset");
        Ok(())
    }

    fn update_binary(&mut self, offset: usize, data: &[u8]) -> CardResult<usize> {
        status(
            self.enter(CardCall::UpdateBinary(offset))
                .and_then(|_| self.do_update_binary(offset, data)),
        )
    }
}
