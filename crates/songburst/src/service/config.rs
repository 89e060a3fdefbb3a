//! Service configuration

use crate::att::{AttError, AttResult, ATT_MAX_ENCRYPT_KEY_SIZE};
use crate::uuid::Uuid;

/// 16-bit identifiers of the service and its characteristics on the TI base UUID
pub const SONG_SERVICE_ID: u16 = 0xAA80;
pub const SONG_DATA_ID: u16 = 0xAA81;
pub const SONG_CONFIG_ID: u16 = 0xAA82;

/// Song burst service configuration
#[derive(Debug, Clone)]
pub struct SongServiceConfig {
    /// Service identifier
    pub service_id: u16,
    /// Data characteristic identifier
    pub data_id: u16,
    /// Config characteristic identifier
    pub config_id: u16,
    /// Add Characteristic User Description descriptors
    pub user_descriptions: bool,
    /// Encryption key size handed to the runtime on registration, as metadata
    /// for runtimes that enforce link security
    pub encryption_key_size: u8,
}

impl Default for SongServiceConfig {
    fn default() -> Self {
        Self {
            service_id: SONG_SERVICE_ID,
            data_id: SONG_DATA_ID,
            config_id: SONG_CONFIG_ID,
            user_descriptions: false,
            encryption_key_size: ATT_MAX_ENCRYPT_KEY_SIZE,
        }
    }
}

impl SongServiceConfig {
    pub fn service_uuid(&self) -> Uuid {
        Uuid::from_ti_u16(self.service_id)
    }

    pub fn data_uuid(&self) -> Uuid {
        Uuid::from_ti_u16(self.data_id)
    }

    pub fn config_uuid(&self) -> Uuid {
        Uuid::from_ti_u16(self.config_id)
    }

    /// Identifiers must be distinct and stay clear of the 0x28xx/0x29xx
    /// declaration and descriptor range.
    pub fn validate(&self) -> AttResult<()> {
        let ids = [self.service_id, self.data_id, self.config_id];
        if let Some(id) = ids.iter().find(|id| (0x2800..=0x29FF).contains(*id)) {
            return Err(AttError::InvalidParameter(format!(
                "Identifier {:#06x} collides with a GATT declaration type",
                id
            )));
        }
        if self.data_id == self.config_id
            || self.service_id == self.data_id
            || self.service_id == self.config_id
        {
            return Err(AttError::InvalidParameter("Identifiers must be distinct".into()));
        }
        if !(7..=ATT_MAX_ENCRYPT_KEY_SIZE).contains(&self.encryption_key_size) {
            return Err(AttError::InvalidParameter(format!(
                "Encryption key size {} out of range",
                self.encryption_key_size
            )));
        }
        Ok(())
    }
}
