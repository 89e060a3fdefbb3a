//! Attribute Protocol (ATT) definitions
//!
//! This module provides the ATT-level vocabulary shared by the GATT runtime and
//! the services registered with it: error codes, permissions, connection handles
//! and access methods.

pub mod constants;
pub mod error;
pub mod types;

pub use self::constants::*;
pub use self::error::{AttError, AttErrorCode, AttResult};
pub use self::types::{AccessMethod, AttPermissions, ConnHandle};
