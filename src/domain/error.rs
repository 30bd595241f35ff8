//! Simulator errors
//!
//! Operator input errors are recoverable and shown to the operator. Session
//! misuse errors are bugs.

use crate::domain::catalog::{BleUuid, ServiceKind};

/// Why a serial number text cannot be turned into advertising bytes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerialNumberError {
    #[error("serial number needs to be at most {max} decimal digits, got {len} characters")]
    TooLong { len: usize, max: usize },
    /// Sorts before '0'
    #[error("'{ch}' is not a valid decimal digit.")]
    NotADigit { ch: char },
    /// Sorts after '9'
    #[error("'{ch}' is not good. Only decimal digits allowed.")]
    InvalidDigit { ch: char },
}

#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("invalid serial number: {0}")]
    InvalidSerialNumber(#[from] SerialNumberError),
    #[error("{0} service has not been published")]
    NotPublished(ServiceKind),
    #[error("characteristic {identity} does not belong to the {service} service")]
    UnknownCharacteristic {
        service: ServiceKind,
        identity: BleUuid,
    },
    #[error("transport error: {0}")]
    Transport(String),
}

impl SimulatorError {
    /// Errors that can only come from misuse of the session, never from
    /// operator input or the radio
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::NotPublished(_) | Self::UnknownCharacteristic { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SimulatorError>;
