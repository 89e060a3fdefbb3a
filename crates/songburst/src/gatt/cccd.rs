//! Per-connection client characteristic configuration
//!
//! A [`SubscriptionTable`] backs one CCCD in an attribute table. It holds one slot
//! per connection the runtime can carry at once; a slot is either free
//! (`ConnHandle::INVALID`) or bound to a connection together with the
//! configuration that peer last wrote.

use std::collections::TryReserveError;
use std::sync::{PoisonError, RwLock};

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};

use super::types::ClientCharConfig;
use crate::att::{AttError, AttResult, ConnHandle};

/// Size of a CCCD value on the wire
pub const CCCD_VALUE_LEN: usize = 2;

/// One slot of a subscription table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharCfgEntry {
    pub conn: ConnHandle,
    pub value: ClientCharConfig,
}

impl CharCfgEntry {
    const FREE: CharCfgEntry = CharCfgEntry {
        conn: ConnHandle::INVALID,
        value: ClientCharConfig::empty(),
    };
}

/// Connection-indexed subscription state of one characteristic
#[derive(Debug)]
pub struct SubscriptionTable {
    entries: RwLock<Vec<CharCfgEntry>>,
}

impl SubscriptionTable {
    /// Allocate a table with `slots` entries, all free.
    pub fn allocate(slots: usize) -> Result<Self, TryReserveError> {
        let mut entries = Vec::new();
        entries.try_reserve_exact(slots)?;
        entries.resize(slots, CharCfgEntry::FREE);
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    /// Number of connection slots
    pub fn slots(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Free every slot bound to `conn`. `ConnHandle::INVALID` frees all slots.
    pub fn reset(&self, conn: ConnHandle) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for entry in entries.iter_mut() {
            if !conn.is_valid() || entry.conn == conn {
                *entry = CharCfgEntry::FREE;
            }
        }
    }

    /// Configuration currently stored for `conn`
    pub fn get(&self, conn: ConnHandle) -> ClientCharConfig {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|entry| entry.conn == conn)
            .map(|entry| entry.value)
            .unwrap_or_default()
    }

    /// Store `value` for `conn`, claiming a free slot if the connection has none.
    /// Writing an empty configuration releases the slot.
    pub fn set(&self, conn: ConnHandle, value: ClientCharConfig) -> AttResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = entries.iter_mut().find(|entry| entry.conn == conn) {
            *entry = if value.is_empty() {
                CharCfgEntry::FREE
            } else {
                CharCfgEntry { conn, value }
            };
            return Ok(());
        }

        if value.is_empty() {
            return Ok(());
        }

        match entries.iter_mut().find(|entry| !entry.conn.is_valid()) {
            Some(entry) => {
                *entry = CharCfgEntry { conn, value };
                Ok(())
            }
            None => Err(AttError::InsufficientResources),
        }
    }

    /// Connections whose configuration includes all of `wanted`
    pub fn subscribers(&self, wanted: ClientCharConfig) -> Vec<ConnHandle> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| entry.conn.is_valid() && entry.value.contains(wanted))
            .map(|entry| entry.conn)
            .collect()
    }

    /// Snapshot of all slots
    pub fn entries(&self) -> Vec<CharCfgEntry> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Handle a peer write to a CCCD.
///
/// `allowed` is the set of capabilities the characteristic supports; the peer may
/// only write zero or a subset of it.
pub fn process_ccc_write(
    table: &SubscriptionTable,
    conn: ConnHandle,
    value: &[u8],
    offset: u16,
    allowed: ClientCharConfig,
) -> AttResult<()> {
    if offset != 0 {
        return Err(AttError::AttributeNotLong);
    }
    if value.len() != CCCD_VALUE_LEN {
        return Err(AttError::InvalidAttributeValueLength(value.len()));
    }

    let raw = LittleEndian::read_u16(value);
    let config = match ClientCharConfig::from_bits(raw) {
        Some(config) if allowed.contains(config) => config,
        _ => {
            debug!("Rejecting CCCD value {:#06x} from {}", raw, conn);
            return Err(AttError::CccdImproperlyConfigured(raw));
        }
    };

    trace!("CCCD for {} set to {:?}", conn, config);
    table.set(conn, config)
}

/// Encode a CCCD value for a read response
pub fn encode_ccc_value(value: ClientCharConfig) -> [u8; CCCD_VALUE_LEN] {
    let mut buf = [0u8; CCCD_VALUE_LEN];
    LittleEndian::write_u16(&mut buf, value.bits());
    buf
}
