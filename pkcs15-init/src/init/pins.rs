//! PIN objects created at format time

use log::{debug, error, info};
use zeroize::Zeroizing;

use crate::acl::SecurityRole;
use crate::card::data_object::{
    DataObjectRequest, DO_ID_ADMIN, DO_ID_USER, DO_TYPE_CHV, FLAGS_COMPACT_DO, OPTIONS_ACCESS_ADMIN,
    OPTIONS_ACCESS_USER,
};
use crate::card::{AuthKind, Card, CardCtl};
use crate::error::CardResult;

/// Every PIN secret is exactly this long
pub const PIN_LENGTH: usize = 8;

/// Parameters of a PIN object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinDescriptor {
    pub name: &'static str,
    pub id: u8,
    pub options: u8,
    pub flags: u8,
    pub retry_limit: u8,
    pub secret: [u8; PIN_LENGTH],
    pub role: SecurityRole,
}

pub const USER_PIN: PinDescriptor = PinDescriptor {
    name: "user",
    id: DO_ID_USER,
    options: OPTIONS_ACCESS_USER,
    flags: FLAGS_COMPACT_DO,
    retry_limit: 0xFF,
    secret: *b"12345678",
    role: SecurityRole::UserPin,
};

pub const ADMIN_PIN: PinDescriptor = PinDescriptor {
    name: "admin",
    id: DO_ID_ADMIN,
    options: OPTIONS_ACCESS_ADMIN,
    flags: FLAGS_COMPACT_DO,
    retry_limit: 0xFF,
    secret: *b"87654321",
    role: SecurityRole::AdminPin,
};

/// Creation order: the user PIN must exist before the admin PIN
pub const DEFAULT_PINS: [PinDescriptor; 2] = [USER_PIN, ADMIN_PIN];

impl PinDescriptor {
    /// The create-data-object request for this PIN
    pub fn request(&self) -> DataObjectRequest {
        DataObjectRequest {
            object_type: DO_TYPE_CHV,
            id: self.id,
            options: self.options,
            flags: self.flags,
            retry_limit: self.retry_limit,
            sec_attr: self.role.attributes(),
            body: Zeroizing::new(self.secret.to_vec()),
        }
    }
}

/// Create the user then the admin PIN, stopping at the first failure
pub fn create_pins<C: Card + ?Sized>(card: &mut C) -> CardResult<()> {
    for pin in DEFAULT_PINS.iter() {
        let payload = pin.request().encode()?;
        card.card_ctl(CardCtl::CreateDataObject, &payload).map_err(|e| {
            error!("Failed to create {} PIN: {}", pin.name, e);
            e
        })?;
        info!("Created {} PIN {:02X}", pin.name, pin.id);
    }
    Ok(())
}

/// Open a user session with the default user secret
pub fn verify_user_pin<C: Card + ?Sized>(card: &mut C) -> CardResult<()> {
    card.verify(AuthKind::Chv, USER_PIN.id, &USER_PIN.secret).map_err(|e| {
        debug!("VERIFY default user PIN: {}", e);
        e
    })
}
