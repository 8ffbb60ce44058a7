//! Erase and provision
//!
//! Formats the card and rebuilds it from scratch:
//!
//! 1. format-begin wipes the card; a failure here ends the run
//! 2. the base tree is built: `3F00/0000/0000`, both PINs, a user session,
//!    then `…/0000/0000/0001`, `…/0000/0000/0002` and `3F00/0000/0001`;
//!    the session is dropped whatever happened
//! 3. format-end is always sent once format-begin succeeded
//! 4. with a fresh user session the profile layout is created, and the
//!    session dropped again
//!
//! The first hard failure is the one reported. Later cleanup failures are
//! only logged. Nothing is rolled back.

use log::{debug, error, info, warn};

use super::layout::provision_directories;
use super::pins::{create_pins, verify_user_pin};
use crate::acl::SecurityRole;
use crate::card::{Card, CardCtl};
use crate::error::{CardError, CardResult};
use crate::fs::{FileDescriptor, Path};
use crate::profile::Profile;

/// Progress of an erase run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EraseState {
    Idle,
    FormatInit,
    BaseTree,
    Pins,
    VerifyUser,
    BuildTypicalLayout,
    ResetRights,
    FormatEnd,
    ProfileLayout,
    Provisioned,
    Failed(CardError),
}

/// Combine an outcome with the outcome of its cleanup, keeping the first error
pub fn keep_first<T>(outcome: CardResult<T>, cleanup: CardResult<()>) -> CardResult<T> {
    match (outcome, cleanup) {
        (Err(e), Err(later)) => {
            warn!("Cleanup also failed: {}", later);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(_), Err(later)) => Err(later),
        (Ok(value), Ok(())) => Ok(value),
    }
}

/// Run `body`, then `cleanup` regardless of the outcome
pub fn scoped<S: ?Sized, T>(
    ctx: &mut S,
    body: impl FnOnce(&mut S) -> CardResult<T>,
    cleanup: impl FnOnce(&mut S) -> CardResult<()>,
) -> CardResult<T> {
    let outcome = body(ctx);
    let cleaned = cleanup(ctx);
    keep_first(outcome, cleaned)
}

/// One erase-and-provision run over a card
pub struct EraseMachine<'c, C: ?Sized> {
    card: &'c mut C,
    history: Vec<EraseState>,
}

impl<'c, C: Card + ?Sized> EraseMachine<'c, C> {
    pub fn new(card: &'c mut C) -> Self {
        Self {
            card,
            history: vec![EraseState::Idle],
        }
    }

    /// Current state
    pub fn state(&self) -> EraseState {
        self.history.last().cloned().unwrap_or(EraseState::Idle)
    }

    /// Every state entered, oldest first
    pub fn history(&self) -> &[EraseState] {
        &self.history
    }

    pub fn into_history(self) -> Vec<EraseState> {
        self.history
    }

    fn enter(&mut self, state: EraseState) {
        debug!("Erase: {:?}", state);
        self.history.push(state);
    }

    /// Erase the card and provision `profile`
    pub fn run(&mut self, profile: &Profile) -> CardResult<()> {
        let result = self.provision(profile);
        match &result {
            Ok(()) => {
                info!("Card erased and provisioned");
                self.enter(EraseState::Provisioned);
            }
            Err(e) => {
                error!("Failed to init PKCS15: {}", e);
                self.enter(EraseState::Failed(e.clone()));
            }
        }
        result
    }

    fn provision(&mut self, profile: &Profile) -> CardResult<()> {
        self.enter(EraseState::FormatInit);
        self.card.card_ctl(CardCtl::FormatInit, &[]).map_err(|e| {
            error!("Failed to erase: {}", e);
            e
        })?;

        let built = scoped(self, Self::build_typical_fs, Self::reset_rights);
        if let Err(e) = &built {
            error!("Failed to create typical fs: {}", e);
        }

        self.enter(EraseState::FormatEnd);
        let ended = self.card.card_ctl(CardCtl::FormatEnd, &[]);
        keep_first(built, ended)?;

        self.enter(EraseState::ProfileLayout);
        verify_user_pin(&mut *self.card)?;
        let laid_out = provision_directories(&mut *self.card, profile);
        if let Err(e) = self.card.logout() {
            debug!("Failed to reset access rights: {}", e);
        }
        laid_out
    }

    fn create_base_dir(&mut self, path: Path) -> CardResult<()> {
        let dir = FileDescriptor::directory(path).with_role(SecurityRole::BaseDirectory);
        debug!("Creating base directory {}", dir.path);
        self.card.create(&dir)
    }

    fn build_typical_fs(&mut self) -> CardResult<()> {
        let mf = Path::mf();
        let workspace = mf.join(0x0000);
        let inner = workspace.join(0x0000);

        self.enter(EraseState::BaseTree);
        self.create_base_dir(mf.clone())?;
        self.create_base_dir(workspace.clone())?;
        self.create_base_dir(inner.clone())?;

        self.enter(EraseState::Pins);
        create_pins(&mut *self.card)?;

        self.enter(EraseState::VerifyUser);
        verify_user_pin(&mut *self.card)?;

        self.enter(EraseState::BuildTypicalLayout);
        self.create_base_dir(inner.join(0x0001))?;
        self.card.select(&inner)?;
        self.create_base_dir(inner.join(0x0002))?;
        self.card.select(&workspace)?;
        self.create_base_dir(workspace.join(0x0001))
    }

    fn reset_rights(&mut self) -> CardResult<()> {
        self.enter(EraseState::ResetRights);
        self.card.logout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::status::SW;
    use crate::card::{CardCall, PinRecord, VirtualCard};
    use crate::init::pins::{ADMIN_PIN, USER_PIN};

    fn run(card: &mut VirtualCard) -> (CardResult<()>, Vec<EraseState>) {
        let mut machine = EraseMachine::new(card);
        let result = machine.run(&Profile::default());
        (result, machine.into_history())
    }

    fn p(ids: &[u16]) -> Path {
        Path::from_ids(ids)
    }

    #[test]
    fn test_erase_end_to_end() {
        let mut card = VirtualCard::new();
        let (result, history) = run(&mut card);
        result.unwrap();

        assert_eq!(
            history,
            vec![
                EraseState::Idle,
                EraseState::FormatInit,
                EraseState::BaseTree,
                EraseState::Pins,
                EraseState::VerifyUser,
                EraseState::BuildTypicalLayout,
                EraseState::ResetRights,
                EraseState::FormatEnd,
                EraseState::ProfileLayout,
                EraseState::Provisioned,
            ]
        );

        for path in [
            p(&[0x3F00]),
            p(&[0x3F00, 0x0000]),
            p(&[0x3F00, 0x0000, 0x0000]),
            p(&[0x3F00, 0x0000, 0x0000, 0x0001]),
            p(&[0x3F00, 0x0000, 0x0000, 0x0002]),
            p(&[0x3F00, 0x0000, 0x0001]),
        ] {
            let node = card.file(&path).unwrap();
            assert!(node.is_directory(), "{}", path);
            assert_eq!(node.sec_attr, SecurityRole::BaseDirectory.attributes().as_bytes().to_vec());
        }
        for id in [0x1001, 0x1002, 0x1003, 0x1004] {
            assert!(card.file(&p(&[0x3F00, 0xFF00, id])).unwrap().is_directory());
        }

        assert_eq!(card.pin(USER_PIN.id).unwrap().secret_hash, PinRecord::hash_pin(b"12345678"));
        assert_eq!(card.pin(ADMIN_PIN.id).unwrap().secret_hash, PinRecord::hash_pin(b"87654321"));
        assert!(!card.is_format_mode());
        assert!(!card.security_state().any_verified());
        assert_eq!(card.calls().last(), Some(&CardCall::Logout));
    }

    #[test]
    fn test_erase_is_repeatable() {
        let mut card = VirtualCard::new();
        run(&mut card).0.unwrap();
        let first = card.image();
        run(&mut card).0.unwrap();
        assert_eq!(card.image(), first);
    }

    #[test]
    fn test_format_init_failure_is_terminal() {
        let mut card = VirtualCard::new();
        card.fail_next(CardCall::Ctl(CardCtl::FormatInit), SW::EXEC_ERROR);

        let (result, history) = run(&mut card);
        assert_eq!(result, Err(CardError::Card(SW::EXEC_ERROR)));
        assert_eq!(history.last(), Some(&EraseState::Failed(CardError::Card(SW::EXEC_ERROR))));
        assert_eq!(card.calls(), &[CardCall::Ctl(CardCtl::FormatInit)]);
    }

    #[test]
    fn test_base_tree_failure_still_ends_format() {
        let mut card = VirtualCard::new();
        card.fail_next(CardCall::Create(p(&[0x3F00, 0x0000, 0x0000, 0x0002])), SW::NOT_ENOUGH_MEMORY);

        let (result, history) = run(&mut card);
        assert_eq!(result, Err(CardError::OutOfMemory));
        assert!(history.contains(&EraseState::ResetRights));
        assert!(history.contains(&EraseState::FormatEnd));
        assert!(!history.contains(&EraseState::ProfileLayout));

        // The session opened for the base tree was dropped and format mode left
        assert!(!card.security_state().any_verified());
        assert!(!card.is_format_mode());
        assert!(card.calls().contains(&CardCall::Logout));
    }

    #[test]
    fn test_pin_failure_skips_verify() {
        let mut card = VirtualCard::new();
        card.fail_next(CardCall::Ctl(CardCtl::CreateDataObject), SW::NOT_ENOUGH_MEMORY);

        let (result, _) = run(&mut card);
        assert_eq!(result, Err(CardError::OutOfMemory));
        assert!(!card.calls().iter().any(|c| matches!(c, CardCall::Verify(_))));
        assert!(card.pin(ADMIN_PIN.id).is_none());
    }

    #[test]
    fn test_format_end_failure_overrides_success() {
        let mut card = VirtualCard::new();
        card.fail_next(CardCall::Ctl(CardCtl::FormatEnd), SW::EXEC_ERROR);

        let (result, history) = run(&mut card);
        assert_eq!(result, Err(CardError::Card(SW::EXEC_ERROR)));
        assert!(!history.contains(&EraseState::ProfileLayout));
    }

    #[test]
    fn test_format_end_failure_keeps_first_error() {
        let mut card = VirtualCard::new();
        card.fail_next(CardCall::Verify(USER_PIN.id), SW::SECURITY_STATUS_NOT_SATISFIED);
        card.fail_next(CardCall::Ctl(CardCtl::FormatEnd), SW::EXEC_ERROR);

        let (result, _) = run(&mut card);
        assert_eq!(result, Err(CardError::NotAllowed));
    }

    #[test]
    fn test_logout_failure_fails_clean_base_tree() {
        let mut card = VirtualCard::new();
        card.fail_next(CardCall::Logout, SW::EXEC_ERROR);

        let (result, history) = run(&mut card);
        assert_eq!(result, Err(CardError::Card(SW::EXEC_ERROR)));
        assert!(history.contains(&EraseState::FormatEnd));
        assert!(!card.is_format_mode());
    }

    #[test]
    fn test_final_logout_failure_only_logged() {
        let mut card = VirtualCard::new();
        card.fail_later(CardCall::Logout, 1, SW::EXEC_ERROR);

        let mut machine = EraseMachine::new(&mut card);
        machine.run(&Profile::default()).unwrap();
        assert_eq!(machine.state(), EraseState::Provisioned);

        // The failed logout left the profile session open
        assert!(card.security_state().any_verified());
        assert_eq!(card.calls().iter().filter(|c| **c == CardCall::Logout).count(), 2);
    }

    #[test]
    fn test_profile_layout_failure_reported() {
        let mut card = VirtualCard::new();
        card.fail_next(CardCall::Create(p(&[0x3F00, 0xFF00])), SW::NOT_ENOUGH_MEMORY);

        let (result, history) = run(&mut card);
        assert_eq!(result, Err(CardError::OutOfMemory));
        assert!(history.contains(&EraseState::ProfileLayout));
        assert!(!card.security_state().any_verified());
    }

    #[test]
    fn test_keep_first() {
        assert_eq!(keep_first(Ok(1), Ok(())), Ok(1));
        assert_eq!(keep_first::<()>(Ok(()), Err(CardError::NotAllowed)), Err(CardError::NotAllowed));
        assert_eq!(
            keep_first::<()>(Err(CardError::NotFound), Err(CardError::NotAllowed)),
            Err(CardError::NotFound)
        );
    }

    #[test]
    fn test_scoped_always_cleans_up() {
        let mut log: Vec<&str> = Vec::new();
        let result = scoped(
            &mut log,
            |log| {
                log.push("body");
                Err::<(), _>(CardError::NotFound)
            },
            |log| {
                log.push("cleanup");
                Ok(())
            },
        );
        assert_eq!(result, Err(CardError::NotFound));
        assert_eq!(log, vec!["body", "cleanup"]);
    }
}
