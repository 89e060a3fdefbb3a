//! Error types for the songburst library
//!
//! Peer-facing failures travel as [`AttError`] values; this module defines the
//! application-facing status taxonomy of the service.

use thiserror::Error;

use crate::att::AttError;

/// Status codes reported to the application, in the vendor stack's numbering
pub const STATUS_INVALID_PARAMETER: u8 = 0x02;
pub const STATUS_ALREADY_IN_REQUESTED_MODE: u8 = 0x11;
pub const STATUS_MEM_ALLOC_ERROR: u8 = 0x13;
pub const STATUS_INVALID_RANGE: u8 = 0x18;

/// Errors returned by the song burst service to its application and at registration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Invalid length {actual}, expected exactly {expected}")]
    InvalidRange { expected: usize, actual: usize },

    #[error("Subscription table allocation failed")]
    ResourceExhausted,

    #[error("Already registered")]
    AlreadyRegistered,

    #[error("Unknown parameter: {0}")]
    UnknownParameter(u8),

    #[error("Attribute runtime error: {0}")]
    Att(#[from] AttError),
}

impl ProfileError {
    /// Numeric status for callers that speak status codes
    pub fn status(&self) -> u8 {
        match self {
            ProfileError::InvalidRange { .. } => STATUS_INVALID_RANGE,
            ProfileError::ResourceExhausted => STATUS_MEM_ALLOC_ERROR,
            ProfileError::AlreadyRegistered => STATUS_ALREADY_IN_REQUESTED_MODE,
            ProfileError::UnknownParameter(_) => STATUS_INVALID_PARAMETER,
            ProfileError::Att(e) => e.to_error_code().into(),
        }
    }
}
