//! Peer read and write handling for the song burst attributes

use std::sync::PoisonError;

use log::{debug, error, trace};

use super::params::{Parameter, SONG_CONFIG_LEN, SONG_DATA_LEN};
use super::ServiceState;
use crate::att::{AccessMethod, AttError, AttResult, ConnHandle, CLIENT_CHAR_CONFIG_UUID};
use crate::gatt::{process_ccc_write, Attribute, AttributeAccess, ClientCharConfig};

/// What a table entry refers to, by its 16-bit identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Data,
    Config,
    ClientConfig,
}

impl ServiceState {
    fn resolve(&self, attr: &Attribute) -> AttResult<Target> {
        let id = attr
            .type_
            .short_id()
            .ok_or(AttError::InvalidHandle(attr.handle))?;

        if id == self.config.data_id {
            Ok(Target::Data)
        } else if id == self.config.config_id {
            Ok(Target::Config)
        } else if id == CLIENT_CHAR_CONFIG_UUID {
            Ok(Target::ClientConfig)
        } else {
            Err(AttError::AttributeNotFound)
        }
    }

    fn read_data(&self, out: &mut [u8], offset: u16, max_len: u16) -> AttResult<usize> {
        let start = offset as usize;
        if start > SONG_DATA_LEN {
            debug!("Read blob offset {} past end of song data", offset);
            return Err(AttError::InvalidOffset(offset));
        }

        let len = (max_len as usize)
            .min(SONG_DATA_LEN - start)
            .min(out.len());
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        out[..len].copy_from_slice(&data[start..start + len]);
        Ok(len)
    }

    fn read_config(&self, out: &mut [u8]) -> AttResult<usize> {
        let out = out.get_mut(..SONG_CONFIG_LEN).ok_or(AttError::Unlikely)?;
        out.copy_from_slice(&*self.conf.read().unwrap_or_else(PoisonError::into_inner));
        Ok(SONG_CONFIG_LEN)
    }

    fn write_config(&self, value: &[u8], offset: u16) -> AttResult<()> {
        if offset != 0 {
            return Err(AttError::AttributeNotLong);
        }
        let value = <[u8; SONG_CONFIG_LEN]>::try_from(value)
            .map_err(|_| AttError::InvalidAttributeValueLength(value.len()))?;

        *self.conf.write().unwrap_or_else(PoisonError::into_inner) = value;
        trace!("Config written: {}", hex::encode(value));

        self.callbacks.notify(Parameter::Config);
        Ok(())
    }
}

impl AttributeAccess for ServiceState {
    fn read_attribute(
        &self,
        conn: ConnHandle,
        attr: &Attribute,
        out: &mut [u8],
        offset: u16,
        max_len: u16,
        _method: AccessMethod,
    ) -> AttResult<usize> {
        let result = match self.resolve(attr)? {
            Target::Data => self.read_data(out, offset, max_len),
            // Offset is not honored; the value is shorter than any blob threshold.
            Target::Config => self.read_config(out),
            Target::ClientConfig => Err(AttError::AttributeNotFound),
        };
        if let Err(e) = &result {
            debug!("Read of {:#06x} by {} rejected: {}", attr.handle, conn, e);
        }
        result
    }

    fn write_attribute(
        &self,
        conn: ConnHandle,
        attr: &Attribute,
        value: &[u8],
        offset: u16,
        _method: AccessMethod,
    ) -> AttResult<()> {
        let result = match self.resolve(attr)? {
            Target::Data => {
                error!("Peer write reached the read-only song data attribute {:#06x}", attr.handle);
                Err(AttError::WriteNotPermitted)
            }
            Target::Config => self.write_config(value, offset),
            Target::ClientConfig => {
                let subscriptions = attr.subscriptions().ok_or(AttError::AttributeNotFound)?;
                process_ccc_write(subscriptions, conn, value, offset, ClientCharConfig::NOTIFY)
            }
        };
        if let Err(e) = &result {
            debug!("Write of {:#06x} by {} rejected: {}", attr.handle, conn, e);
        }
        result
    }
}
