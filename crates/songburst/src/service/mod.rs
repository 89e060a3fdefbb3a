//! The song burst service
//!
//! A custom GATT service carrying a fixed 378-byte "song" burst and a 2-byte
//! configuration value. The application sets the song data and is told when a
//! peer rewrites the configuration; peers read the song data in pieces with
//! Read Blob requests and subscribe to notifications of new bursts.
//!
//! ```text
//! Service 0xAA80
//!   Characteristic 0xAA81  data    read, notify   378 bytes
//!     CCCD 0x2902
//!   Characteristic 0xAA82  config  read, write    2 bytes
//! ```

mod access;
mod callbacks;
mod config;
mod dispatch;
mod params;
mod table;

#[cfg(test)]
mod tests;

use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};

use log::{error, info};

pub use callbacks::ProfileCallbacks;
pub use config::{SongServiceConfig, SONG_CONFIG_ID, SONG_DATA_ID, SONG_SERVICE_ID};
pub use dispatch::FanOut;
pub use params::{Parameter, SONG_CONFIG_LEN, SONG_DATA_LEN};
pub use table::{CONFIG_USER_DESCRIPTION, DATA_USER_DESCRIPTION};

use crate::att::{AccessMethod, AttResult, ConnHandle};
use crate::error::ProfileError;
use crate::gatt::{Attribute, AttributeAccess, AttributeTable, GattRuntime, SubscriptionTable};
use callbacks::CallbackSlot;

struct Registered {
    runtime: Weak<dyn GattRuntime>,
    table: Arc<AttributeTable>,
    subscriptions: Arc<SubscriptionTable>,
}

enum Registration {
    Unregistered,
    Registered(Registered),
}

/// Shared state behind a [`SongBurstService`]; also what the runtime calls into.
pub(crate) struct ServiceState {
    config: SongServiceConfig,
    data: RwLock<[u8; SONG_DATA_LEN]>,
    conf: RwLock<[u8; SONG_CONFIG_LEN]>,
    callbacks: CallbackSlot,
    registration: RwLock<Registration>,
}

/// The song burst service
///
/// Cloning yields another handle to the same service.
#[derive(Clone)]
pub struct SongBurstService {
    state: Arc<ServiceState>,
}

impl SongBurstService {
    /// Create an unregistered service
    pub fn new(config: SongServiceConfig) -> Self {
        Self {
            state: Arc::new(ServiceState {
                config,
                data: RwLock::new([0; SONG_DATA_LEN]),
                conf: RwLock::new([0; SONG_CONFIG_LEN]),
                callbacks: CallbackSlot::default(),
                registration: RwLock::new(Registration::Unregistered),
            }),
        }
    }

    /// The process-wide instance with the default configuration
    pub fn global() -> &'static SongBurstService {
        static INSTANCE: OnceLock<SongBurstService> = OnceLock::new();
        INSTANCE.get_or_init(|| SongBurstService::new(SongServiceConfig::default()))
    }

    pub fn config(&self) -> &SongServiceConfig {
        &self.state.config
    }

    /// Register the service with `runtime`.
    ///
    /// Zeroes the song data, allocates one subscription slot per connection the
    /// runtime supports and hands the attribute table over. Succeeds at most once;
    /// on failure the service stays unregistered.
    pub fn add_service<R>(&self, runtime: &Arc<R>) -> Result<(), ProfileError>
    where
        R: GattRuntime + 'static,
    {
        let mut registration = self
            .state
            .registration
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Registration::Registered(_) = *registration {
            return Err(ProfileError::AlreadyRegistered);
        }

        let config = &self.state.config;
        config.validate()?;

        *self.state.data.write().unwrap_or_else(PoisonError::into_inner) = [0; SONG_DATA_LEN];

        let slots = runtime.max_connections();
        let subscriptions = SubscriptionTable::allocate(slots).map_err(|e| {
            error!("Cannot allocate {} subscription slots: {}", slots, e);
            ProfileError::ResourceExhausted
        })?;
        subscriptions.reset(ConnHandle::INVALID);
        let subscriptions = Arc::new(subscriptions);

        let table = table::build_attribute_table(config, subscriptions.clone());
        let access: Arc<dyn AttributeAccess> = self.state.clone();
        // Nothing below may fail: the runtime already routes requests to us.
        let table = runtime.register_service(table, access)?;
        match table.value_handle(&config.data_uuid()) {
            Some(handle) => info!(
                "Song burst service {} registered, data at {:#06x}, {} subscription slots",
                config.service_uuid(),
                handle,
                slots
            ),
            None => error!(
                "Runtime registered service {} without its data characteristic",
                config.service_uuid()
            ),
        }

        let runtime: Weak<dyn GattRuntime> = Arc::downgrade(runtime) as Weak<dyn GattRuntime>;
        *registration = Registration::Registered(Registered {
            runtime,
            table,
            subscriptions,
        });
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        matches!(
            *self.state.registration.read().unwrap_or_else(PoisonError::into_inner),
            Registration::Registered(_)
        )
    }

    /// The registered attribute table
    pub fn attribute_table(&self) -> Option<Arc<AttributeTable>> {
        match &*self.state.registration.read().unwrap_or_else(PoisonError::into_inner) {
            Registration::Registered(registered) => Some(registered.table.clone()),
            Registration::Unregistered => None,
        }
    }

    /// Handle of the characteristic value for `param`, once registered
    pub fn value_handle(&self, param: Parameter) -> Option<u16> {
        let uuid = match param {
            Parameter::Data => self.state.config.data_uuid(),
            Parameter::Config => self.state.config.config_uuid(),
        };
        self.attribute_table()?.value_handle(&uuid)
    }

    /// Handle of the data characteristic's CCCD, once registered
    pub fn cccd_handle(&self) -> Option<u16> {
        self.attribute_table()?
            .iter()
            .find(|attr| attr.subscriptions().is_some())
            .map(|attr| attr.handle)
    }

    /// Install the application's handlers.
    ///
    /// `None` installs nothing and succeeds. Fails with
    /// [`ProfileError::AlreadyRegistered`] once a handler set is installed.
    pub fn register_callbacks(
        &self,
        handlers: Option<Arc<dyn ProfileCallbacks>>,
    ) -> Result<(), ProfileError> {
        self.state.callbacks.register(handlers)
    }

    pub fn has_callbacks(&self) -> bool {
        self.state.callbacks.is_installed()
    }

    /// Replace the value behind `param`. `value` must be exactly the parameter's
    /// length. New song data is pushed to every subscribed connection; failures
    /// for single connections are logged, not returned.
    pub fn set_parameter(&self, param: Parameter, value: &[u8]) -> Result<(), ProfileError> {
        self.state.set_parameter(param, value)
    }

    /// Copy the full value behind `param` into `out`, returning its length.
    pub fn get_parameter(&self, param: Parameter, out: &mut [u8]) -> Result<usize, ProfileError> {
        self.state.get_parameter(param, out)
    }

    /// Current song data
    pub fn data(&self) -> [u8; SONG_DATA_LEN] {
        *self.state.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current configuration value
    pub fn config_value(&self) -> [u8; SONG_CONFIG_LEN] {
        *self.state.conf.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push the current song data to all subscribers and report the outcome.
    pub fn notify_subscribers(&self) -> FanOut {
        self.state.notify_subscribers()
    }
}

impl AttributeAccess for SongBurstService {
    fn read_attribute(
        &self,
        conn: ConnHandle,
        attr: &Attribute,
        out: &mut [u8],
        offset: u16,
        max_len: u16,
        method: AccessMethod,
    ) -> AttResult<usize> {
        self.state.read_attribute(conn, attr, out, offset, max_len, method)
    }

    fn write_attribute(
        &self,
        conn: ConnHandle,
        attr: &Attribute,
        value: &[u8],
        offset: u16,
        method: AccessMethod,
    ) -> AttResult<()> {
        self.state.write_attribute(conn, attr, value, offset, method)
    }
}
