//! Type definitions for the ATT protocol
use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// ATT permission flags of an attribute table entry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttPermissions: u16 {
        const READ = 0x0001;
        const WRITE = 0x0002;
        const READ_ENCRYPTED = 0x0004;
        const WRITE_ENCRYPTED = 0x0008;
        const READ_AUTHENTICATED = 0x0010;
        const WRITE_AUTHENTICATED = 0x0020;
        const READ_AUTHORIZED = 0x0040;
        const WRITE_AUTHORIZED = 0x0080;
    }
}

impl AttPermissions {
    /// Create read-only permissions
    pub fn read_only() -> Self {
        Self::READ
    }

    /// Create read-write permissions
    pub fn read_write() -> Self {
        Self::READ | Self::WRITE
    }

    /// Check if read is permitted at all
    pub fn can_read(&self) -> bool {
        self.intersects(Self::READ | Self::READ_ENCRYPTED | Self::READ_AUTHENTICATED | Self::READ_AUTHORIZED)
    }

    /// Check if write is permitted at all
    pub fn can_write(&self) -> bool {
        self.intersects(
            Self::WRITE | Self::WRITE_ENCRYPTED | Self::WRITE_AUTHENTICATED | Self::WRITE_AUTHORIZED,
        )
    }
}

/// Link-layer connection handle as assigned by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnHandle(pub u16);

impl ConnHandle {
    /// Marker for "no connection" in per-connection tables
    pub const INVALID: ConnHandle = ConnHandle(0xFFFF);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl fmt::Display for ConnHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// The kind of ATT request that led to an attribute access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMethod {
    /// Read Request
    Read,
    /// Read Blob Request
    ReadBlob,
    /// Write Request
    Write,
    /// Write Command (no response)
    WriteCommand,
}
