//! Up-calls into the owning application

use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, warn};

use super::params::Parameter;
use crate::error::ProfileError;

/// Handlers the application installs to learn about peer-initiated changes
pub trait ProfileCallbacks: Send + Sync {
    /// A peer changed the value behind `param`.
    fn on_parameter_changed(&self, param: Parameter);
}

impl<F> ProfileCallbacks for F
where
    F: Fn(Parameter) + Send + Sync,
{
    fn on_parameter_changed(&self, param: Parameter) {
        self(param)
    }
}

/// Install-once slot for the application's handler set
#[derive(Default)]
pub(crate) struct CallbackSlot {
    installed: RwLock<Option<Arc<dyn ProfileCallbacks>>>,
}

impl CallbackSlot {
    /// `None` installs nothing and leaves the slot open.
    pub(crate) fn register(
        &self,
        handlers: Option<Arc<dyn ProfileCallbacks>>,
    ) -> Result<(), ProfileError> {
        let mut installed = self.installed.write().unwrap_or_else(PoisonError::into_inner);
        if installed.is_some() {
            warn!("Application callbacks already registered");
            return Err(ProfileError::AlreadyRegistered);
        }
        if let Some(handlers) = handlers {
            debug!("Application callbacks installed");
            *installed = Some(handlers);
        }
        Ok(())
    }

    pub(crate) fn is_installed(&self) -> bool {
        self.installed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Invoke the installed handlers, if any. The slot lock is not held during the call.
    pub(crate) fn notify(&self, param: Parameter) {
        let handlers = self
            .installed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handlers) = handlers {
            handlers.on_parameter_changed(param);
        }
    }
}
