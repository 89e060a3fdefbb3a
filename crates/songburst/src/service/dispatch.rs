//! Application-driven value updates and notification fan-out

use std::sync::PoisonError;

use log::{debug, error, trace, warn};

use super::params::{Parameter, SONG_CONFIG_LEN, SONG_DATA_LEN};
use super::{Registration, ServiceState};
use crate::error::ProfileError;
use crate::gatt::ClientCharConfig;

/// Aggregate outcome of pushing one value to every subscribed connection
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanOut {
    /// Connections the runtime accepted a notification for
    pub sent: usize,
    /// Connections whose notification the runtime rejected
    pub failed: usize,
}

impl ServiceState {
    pub(crate) fn set_parameter(&self, param: Parameter, value: &[u8]) -> Result<(), ProfileError> {
        let invalid_range = || ProfileError::InvalidRange {
            expected: param.value_len(),
            actual: value.len(),
        };

        match param {
            Parameter::Data => {
                let data = <[u8; SONG_DATA_LEN]>::try_from(value).map_err(|_| invalid_range())?;
                *self.data.write().unwrap_or_else(PoisonError::into_inner) = data;

                let outcome = self.notify_subscribers();
                debug!(
                    "Song data updated, notified {} connection(s), {} failed",
                    outcome.sent, outcome.failed
                );
            }
            Parameter::Config => {
                let conf = <[u8; SONG_CONFIG_LEN]>::try_from(value).map_err(|_| invalid_range())?;
                *self.conf.write().unwrap_or_else(PoisonError::into_inner) = conf;
                trace!("Config set by application: {}", hex::encode(conf));
            }
        }
        Ok(())
    }

    pub(crate) fn get_parameter(&self, param: Parameter, out: &mut [u8]) -> Result<usize, ProfileError> {
        let len = param.value_len();
        let available = out.len();
        let out = out.get_mut(..len).ok_or(ProfileError::InvalidRange {
            expected: len,
            actual: available,
        })?;

        match param {
            Parameter::Data => {
                out.copy_from_slice(&*self.data.read().unwrap_or_else(PoisonError::into_inner))
            }
            Parameter::Config => {
                out.copy_from_slice(&*self.conf.read().unwrap_or_else(PoisonError::into_inner))
            }
        }
        Ok(len)
    }

    /// Push the current song data to every connection with notifications enabled.
    pub(crate) fn notify_subscribers(&self) -> FanOut {
        let (runtime, subscriptions, handle) = {
            let registration = self.registration.read().unwrap_or_else(PoisonError::into_inner);
            match &*registration {
                Registration::Registered(registered) => (
                    registered.runtime.clone(),
                    registered.subscriptions.clone(),
                    registered.table.value_handle(&self.config.data_uuid()),
                ),
                Registration::Unregistered => return FanOut::default(),
            }
        };

        let subscribers = subscriptions.subscribers(ClientCharConfig::NOTIFY);
        if subscribers.is_empty() {
            return FanOut::default();
        }

        let Some(handle) = handle else {
            error!("No song data handle in the registered table");
            return FanOut {
                sent: 0,
                failed: subscribers.len(),
            };
        };

        let Some(runtime) = runtime.upgrade() else {
            warn!("Attribute runtime is gone, dropping {} notification(s)", subscribers.len());
            return FanOut {
                sent: 0,
                failed: subscribers.len(),
            };
        };

        let value = *self.data.read().unwrap_or_else(PoisonError::into_inner);
        let mut outcome = FanOut::default();
        for conn in subscribers {
            match runtime.send_notification(conn, handle, &value) {
                Ok(()) => outcome.sent += 1,
                Err(e) => {
                    warn!("Notification to {} failed: {}", conn, e);
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }
}
