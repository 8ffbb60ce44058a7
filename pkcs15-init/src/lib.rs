//! PKCS#15 provisioning for rutoken-style smart cards
//!
//! Turns a blank card into a PKCS#15 credential container: the base
//! directory tree, the user and administrator PINs, the profile's object
//! directories and RSA private key files.
//!
//! The card itself sits behind the [`Card`] trait. [`VirtualCard`] emulates
//! one in memory and can persist its image to disk.
//!
//! ```no_run
//! use pkcs15_init::{Profile, Provisioner, VirtualCard};
//!
//! let mut provisioner = Provisioner::new(VirtualCard::new(), Profile::default());
//! provisioner.erase()?;
//! # Ok::<(), pkcs15_init::CardError>(())
//! ```

pub mod acl;
pub mod card;
pub mod crypto;
pub mod error;
pub mod fs;
pub mod init;
pub mod objects;
pub mod profile;
pub mod tlv;

pub use acl::{SecAttr, SecurityRole};
pub use card::{Card, CardCtl, CardImageStore, SharedCard, VirtualCard};
pub use crypto::{PrivateKeyEncoder, RsaBlobEncoder};
pub use error::{CardError, CardResult};
pub use fs::{FileDescriptor, FileKind, Path};
pub use init::{Capabilities, EraseState, KeyInfo, KeyObject, Operation, Provisioner};
pub use objects::{DfType, ObjectType};
pub use profile::Profile;
