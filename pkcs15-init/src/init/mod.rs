//! Card provisioning
//!
//! [`Provisioner`] is what the credential-management layer talks to. It owns
//! a card handle, the profile and the key encoder, and gates every operation
//! through the [`Capabilities`] registry.

pub mod erase;
pub mod keys;
pub mod layout;
pub mod new_file;
pub mod ops;
pub mod pins;

use log::info;
use rsa::RsaPrivateKey;
use zeroize::Zeroizing;

use crate::card::Card;
use crate::crypto::{PrivateKeyEncoder, RsaBlobEncoder};
use crate::error::CardResult;
use crate::fs::FileDescriptor;
use crate::objects::ObjectType;
use crate::profile::Profile;

pub use erase::{EraseMachine, EraseState};
pub use keys::{KeyInfo, KeyObject, KEY_BUFFER_SIZE};
pub use ops::{Capabilities, Operation};
pub use pins::{PinDescriptor, ADMIN_PIN, USER_PIN};

/// Provisioning driver for one card
pub struct Provisioner<C, E = RsaBlobEncoder> {
    card: C,
    profile: Profile,
    encoder: E,
    capabilities: Capabilities,
    last_erase: Vec<EraseState>,
}

impl<C: Card> Provisioner<C> {
    pub fn new(card: C, profile: Profile) -> Self {
        Self::with_encoder(card, profile, RsaBlobEncoder::new())
    }
}

impl<C: Card, E: PrivateKeyEncoder> Provisioner<C, E> {
    /// Use `encoder` for private keys instead of the default blob layout
    pub fn with_encoder(card: C, profile: Profile, encoder: E) -> Self {
        Self {
            card,
            profile,
            encoder,
            capabilities: Capabilities::default(),
            last_erase: Vec::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn card(&self) -> &C {
        &self.card
    }

    pub fn card_mut(&mut self) -> &mut C {
        &mut self.card
    }

    pub fn into_card(self) -> C {
        self.card
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// States entered by the most recent [`erase`](Self::erase)
    pub fn last_erase(&self) -> &[EraseState] {
        &self.last_erase
    }

    /// Wipe the card and provision the profile layout
    pub fn erase(&mut self) -> CardResult<()> {
        self.capabilities.lookup(Operation::EraseCard)?;
        info!("Erasing card");
        let mut machine = EraseMachine::new(&mut self.card);
        let result = machine.run(&self.profile);
        self.last_erase = machine.into_history();
        result
    }

    pub fn create_dir(&mut self, dir: &FileDescriptor) -> CardResult<()> {
        self.capabilities.lookup(Operation::CreateDir)?;
        new_file::create_dir(&mut self.card, dir)
    }

    pub fn select_key_reference(&self, info: &mut KeyInfo) -> CardResult<()> {
        self.capabilities.lookup(Operation::SelectKeyReference)?;
        keys::select_key_reference(&self.profile, info)
    }

    pub fn create_key(&self, object: &KeyObject) -> CardResult<()> {
        self.capabilities.lookup(Operation::CreateKey)?;
        keys::create_key(object)
    }

    /// Write `key` to the file chosen by [`select_key_reference`](Self::select_key_reference)
    pub fn store_key(&mut self, object: &mut KeyObject, key: &RsaPrivateKey) -> CardResult<usize> {
        self.capabilities.lookup(Operation::StoreKey)?;
        keys::store_key(&mut self.card, &self.encoder, object, key)
    }

    /// Encode `key` the way [`store_key`](Self::store_key) writes it
    pub fn encode_private_key(&self, key: &RsaPrivateKey) -> CardResult<Zeroizing<Vec<u8>>> {
        self.capabilities.lookup(Operation::EncodePrivateKey)?;
        let mut buffer = Zeroizing::new(vec![0u8; KEY_BUFFER_SIZE]);
        let len = self.encoder.encode(key, &mut buffer)?;
        buffer.truncate(len);
        Ok(buffer)
    }

    pub fn new_file(&mut self, object_type: ObjectType, index: u32) -> CardResult<FileDescriptor> {
        self.capabilities.lookup(Operation::NewFile)?;
        new_file::new_file(&mut self.card, &self.profile, object_type, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::SecurityRole;
    use crate::card::{SharedCard, VirtualCard};
    use crate::error::CardError;
    use crate::fs::Path;
    use crate::objects::DfType;
    use rand::rngs::OsRng;

    fn erased() -> Provisioner<VirtualCard> {
        let mut prov = Provisioner::new(VirtualCard::new(), Profile::default());
        prov.erase().unwrap();
        prov
    }

    #[test]
    fn test_erase_records_history() {
        let prov = erased();
        assert_eq!(prov.last_erase().first(), Some(&EraseState::Idle));
        assert_eq!(prov.last_erase().last(), Some(&EraseState::Provisioned));
    }

    #[test]
    fn test_unsupported_operation() {
        let mut prov = Provisioner::new(VirtualCard::new(), Profile::default())
            .with_capabilities(Capabilities::rutoken().without(Operation::EraseCard));
        assert_eq!(prov.erase(), Err(CardError::NotSupported));
        assert!(prov.card().calls().is_empty());
        assert!(prov.last_erase().is_empty());
    }

    #[test]
    fn test_key_lifecycle() {
        let mut prov = erased();
        let key = RsaPrivateKey::new(&mut OsRng, 512).unwrap();
        let mut object = KeyObject::rsa(1);

        prov.select_key_reference(&mut object.info).unwrap();
        prov.create_key(&object).unwrap();
        // Key files are written under a user session
        prov.card_mut()
            .verify(crate::card::AuthKind::Chv, USER_PIN.id, &USER_PIN.secret)
            .unwrap();
        let len = prov.store_key(&mut object, &key).unwrap();

        let encoded = prov.encode_private_key(&key).unwrap();
        assert_eq!(encoded.len(), len);
        assert_eq!(prov.card().file(&object.info.path).unwrap().data, encoded.to_vec());
        assert_eq!(object.info.path.parent(), Some(prov.profile().df_path(DfType::PrKdf).unwrap()));
    }

    #[test]
    fn test_new_file_and_create_dir() {
        let mut prov = erased();
        let file = prov.new_file(ObjectType::CertX509, 0).unwrap();
        assert_eq!(file.parent(), Some(prov.profile().df_path(DfType::Cdf).unwrap()));

        prov.card_mut()
            .verify(crate::card::AuthKind::Chv, USER_PIN.id, &USER_PIN.secret)
            .unwrap();
        let dir = FileDescriptor::directory(Path::from_ids(&[0x3F00, 0xFF00, 0x2000]))
            .with_role(SecurityRole::Directory);
        prov.create_dir(&dir).unwrap();
        assert!(prov.card().file(&dir.path).unwrap().is_directory());
    }

    #[test]
    fn test_shared_card_handle() {
        let shared = SharedCard::new(VirtualCard::new());
        let mut prov = Provisioner::new(shared.clone(), Profile::default());
        prov.erase().unwrap();

        let card = shared.lock();
        assert!(card.file(&Path::from_ids(&[0x3F00, 0xFF00, 0x1001])).is_some());
        assert!(!card.is_format_mode());
    }
}
