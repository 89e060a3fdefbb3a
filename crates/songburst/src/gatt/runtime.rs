//! Contract between services and the attribute-server runtime

use std::sync::Arc;

use super::table::{Attribute, AttributeTable};
use crate::att::{AccessMethod, AttResult, ConnHandle};

/// Read/write entry points a service registers together with its table.
///
/// The runtime answers declarations, descriptions and CCCD reads itself; every
/// other request on the service's attributes lands here.
pub trait AttributeAccess: Send + Sync {
    /// Copy the value of `attr` starting at `offset` into `out`, transferring at most
    /// `max_len` bytes. Returns the number of bytes written.
    fn read_attribute(
        &self,
        conn: ConnHandle,
        attr: &Attribute,
        out: &mut [u8],
        offset: u16,
        max_len: u16,
        method: AccessMethod,
    ) -> AttResult<usize>;

    /// Validate and apply a write of `value` at `offset`.
    fn write_attribute(
        &self,
        conn: ConnHandle,
        attr: &Attribute,
        value: &[u8],
        offset: u16,
        method: AccessMethod,
    ) -> AttResult<()>;
}

/// The services-facing side of an attribute-server runtime
pub trait GattRuntime: Send + Sync {
    /// Maximum number of simultaneous connections
    fn max_connections(&self) -> usize;

    /// Assign handles to `table` and start routing requests for it to `access`.
    /// Returns the registered table.
    fn register_service(
        &self,
        table: AttributeTable,
        access: Arc<dyn AttributeAccess>,
    ) -> AttResult<Arc<AttributeTable>>;

    /// Push a Handle Value Notification to one connection.
    fn send_notification(&self, conn: ConnHandle, handle: u16, value: &[u8]) -> AttResult<()>;
}
