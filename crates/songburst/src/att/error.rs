//! Error handling for the ATT protocol
use super::constants::*;
use thiserror::Error;

/// ATT error codes as sent to the peer in an Error Response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttErrorCode {
    /// Invalid handle
    InvalidHandle,
    /// Read not permitted
    ReadNotPermitted,
    /// Write not permitted
    WriteNotPermitted,
    /// Invalid offset
    InvalidOffset,
    /// Attribute not found
    AttributeNotFound,
    /// Attribute not long
    AttributeNotLong,
    /// Invalid attribute value length
    InvalidAttributeValueLength,
    /// Unlikely error
    Unlikely,
    /// Insufficient resources
    InsufficientResources,
    /// Client characteristic configuration descriptor improperly configured
    CccdImproperlyConfigured,
}

impl From<AttErrorCode> for u8 {
    fn from(code: AttErrorCode) -> u8 {
        match code {
            AttErrorCode::InvalidHandle => ATT_ERROR_INVALID_HANDLE,
            AttErrorCode::ReadNotPermitted => ATT_ERROR_READ_NOT_PERMITTED,
            AttErrorCode::WriteNotPermitted => ATT_ERROR_WRITE_NOT_PERMITTED,
            AttErrorCode::InvalidOffset => ATT_ERROR_INVALID_OFFSET,
            AttErrorCode::AttributeNotFound => ATT_ERROR_ATTRIBUTE_NOT_FOUND,
            AttErrorCode::AttributeNotLong => ATT_ERROR_ATTRIBUTE_NOT_LONG,
            AttErrorCode::InvalidAttributeValueLength => ATT_ERROR_INVALID_ATTRIBUTE_VALUE_LENGTH,
            AttErrorCode::Unlikely => ATT_ERROR_UNLIKELY,
            AttErrorCode::InsufficientResources => ATT_ERROR_INSUFFICIENT_RESOURCES,
            AttErrorCode::CccdImproperlyConfigured => ATT_ERROR_CCCD_IMPROPERLY_CONFIGURED,
        }
    }
}

/// ATT Error type
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttError {
    #[error("Attribute not found")]
    AttributeNotFound,

    #[error("Read not permitted")]
    ReadNotPermitted,

    #[error("Write not permitted")]
    WriteNotPermitted,

    #[error("Invalid handle: {0}")]
    InvalidHandle(u16),

    #[error("Invalid offset: {0}")]
    InvalidOffset(u16),

    #[error("Invalid attribute value length: {0}")]
    InvalidAttributeValueLength(usize),

    #[error("Attribute not long")]
    AttributeNotLong,

    #[error("Insufficient resources")]
    InsufficientResources,

    #[error("Client characteristic configuration improperly configured: {0:#06x}")]
    CccdImproperlyConfigured(u16),

    #[error("Connection {0:#06x} is not up")]
    NotConnected(u16),

    #[error("Unlikely error")]
    Unlikely,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl AttError {
    /// Convert to ATT error code
    pub fn to_error_code(&self) -> AttErrorCode {
        match self {
            AttError::AttributeNotFound => AttErrorCode::AttributeNotFound,
            AttError::ReadNotPermitted => AttErrorCode::ReadNotPermitted,
            AttError::WriteNotPermitted => AttErrorCode::WriteNotPermitted,
            AttError::InvalidHandle(_) => AttErrorCode::InvalidHandle,
            AttError::InvalidOffset(_) => AttErrorCode::InvalidOffset,
            AttError::InvalidAttributeValueLength(_) => AttErrorCode::InvalidAttributeValueLength,
            AttError::AttributeNotLong => AttErrorCode::AttributeNotLong,
            AttError::InsufficientResources => AttErrorCode::InsufficientResources,
            AttError::CccdImproperlyConfigured(_) => AttErrorCode::CccdImproperlyConfigured,
            AttError::NotConnected(_) => AttErrorCode::Unlikely,
            AttError::Unlikely => AttErrorCode::Unlikely,
            AttError::InvalidParameter(_) => AttErrorCode::Unlikely,
        }
    }
}

/// ATT Result type
pub type AttResult<T> = Result<T, AttError>;
