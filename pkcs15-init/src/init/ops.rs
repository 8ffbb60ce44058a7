//! Provisioning capability registry
//!
//! The credential-management layer asks which provisioning operations a card
//! driver supports before calling them. Unsupported operations fail with
//! `NotSupported` instead of being silently skipped.

use std::collections::HashSet;

use log::debug;

use crate::error::{CardError, CardResult};

/// Operations a provisioning driver may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    EraseCard,
    InitCard,
    CreateDir,
    CreateDomain,
    SelectPinReference,
    CreatePin,
    SelectKeyReference,
    CreateKey,
    StoreKey,
    GenerateKey,
    EncodePrivateKey,
    EncodePublicKey,
    FinalizeCard,
    NewFile,
    DeleteObject,
}

/// The set of operations a driver supports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    supported: HashSet<Operation>,
}

impl Capabilities {
    /// What this crate implements for rutoken-style cards
    pub fn rutoken() -> Self {
        Self::from_ops(&[
            Operation::EraseCard,
            Operation::CreateDir,
            Operation::SelectKeyReference,
            Operation::CreateKey,
            Operation::StoreKey,
            Operation::EncodePrivateKey,
            Operation::NewFile,
        ])
    }

    pub fn from_ops(ops: &[Operation]) -> Self {
        Self {
            supported: ops.iter().copied().collect(),
        }
    }

    /// Drop `op` from the set
    pub fn without(mut self, op: Operation) -> Self {
        self.supported.remove(&op);
        self
    }

    pub fn supports(&self, op: Operation) -> bool {
        self.supported.contains(&op)
    }

    /// Succeed if `op` is supported, fail with `NotSupported` otherwise
    pub fn lookup(&self, op: Operation) -> CardResult<()> {
        if self.supports(op) {
            Ok(())
        } else {
            debug!("Operation {:?} is not supported", op);
            Err(CardError::NotSupported)
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::rutoken()
    }
}
