//! Common types for GATT operations
//!
//! This module defines the bit sets carried in characteristic declarations and
//! client characteristic configuration descriptors.

use bitflags::bitflags;

bitflags! {
    /// Characteristic properties as defined in the Bluetooth specification
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CharacteristicProperties: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
        const AUTHENTICATED_SIGNED_WRITES = 0x40;
        const EXTENDED_PROPERTIES = 0x80;
    }
}

bitflags! {
    /// Value of a Client Characteristic Configuration descriptor
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClientCharConfig: u16 {
        const NOTIFY = 0x0001;
        const INDICATE = 0x0002;
    }
}

impl ClientCharConfig {
    pub fn should_notify(&self) -> bool {
        self.contains(Self::NOTIFY)
    }

    pub fn should_indicate(&self) -> bool {
        self.contains(Self::INDICATE)
    }
}

/// First and last handle occupied by a registered service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleRange {
    pub start: u16,
    pub end: u16,
}

impl HandleRange {
    pub fn contains(&self, handle: u16) -> bool {
        (self.start..=self.end).contains(&handle)
    }
}
