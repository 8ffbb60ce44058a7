//! Security state of a card session
//!
//! Tracks which PIN classes have been verified since the last logout.

use super::data_object::{OPTIONS_ACCESS_ADMIN, OPTIONS_ACCESS_USER};

/// Rights a verified PIN grants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityCondition {
    User,
    Admin,
}

impl SecurityCondition {
    /// Condition granted by a PIN created with `options`
    pub fn from_options(options: u8) -> Option<Self> {
        if options & OPTIONS_ACCESS_ADMIN != 0 {
            Some(Self::Admin)
        } else if options & OPTIONS_ACCESS_USER != 0 {
            Some(Self::User)
        } else {
            None
        }
    }
}

/// Tracks security state for the current session
#[derive(Debug, Default)]
pub struct SecurityState {
    user_verified: bool,
    admin_verified: bool,
}

impl SecurityState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a security condition as verified
    pub fn set_verified(&mut self, condition: SecurityCondition) {
        match condition {
            SecurityCondition::User => self.user_verified = true,
            SecurityCondition::Admin => self.admin_verified = true,
        }
    }

    /// Check if a security condition is satisfied
    pub fn is_verified(&self, condition: SecurityCondition) -> bool {
        match condition {
            SecurityCondition::User => self.user_verified,
            SecurityCondition::Admin => self.admin_verified,
        }
    }

    /// True once any PIN has been verified
    pub fn any_verified(&self) -> bool {
        self.user_verified || self.admin_verified
    }

    /// Clear all security conditions (logout, format or power cycle)
    pub fn clear_all(&mut self) {
        self.user_verified = false;
        self.admin_verified = false;
    }
}
