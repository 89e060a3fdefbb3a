//! GATT Server implementation
//!
//! An in-process attribute-server runtime. It owns handle allocation, the
//! registered attribute tables and the set of live connections, answers the
//! generic attributes (declarations, descriptions, CCCD reads) on its own and
//! routes every other request to the service that registered the attribute.
//! Notifications leave through a [`NotificationSink`], the transport seam.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info, trace, warn};

use super::runtime::{AttributeAccess, GattRuntime};
use super::table::{Attribute, AttributeTable};
use super::types::HandleRange;
use crate::att::{
    AccessMethod, AttError, AttResult, ConnHandle, ATT_DEFAULT_MTU, ATT_HANDLE_MIN, ATT_MAX_MTU,
    ATT_NOTIFICATION_HEADER_SIZE, ATT_READ_RSP_HEADER_SIZE,
};

/// GATT Server configuration
#[derive(Debug, Clone)]
pub struct GattServerConfig {
    /// Maximum number of simultaneous connections
    pub max_connections: usize,
    /// Largest MTU the server accepts during exchange
    pub max_mtu: u16,
}

impl Default for GattServerConfig {
    fn default() -> Self {
        Self {
            max_connections: 3,
            max_mtu: ATT_MAX_MTU,
        }
    }
}

/// Transport used to deliver notifications to a peer
pub trait NotificationSink: Send + Sync {
    fn send_notification(&self, conn: ConnHandle, handle: u16, value: &[u8]) -> AttResult<()>;
}

/// Client connection information
#[derive(Debug, Clone, Copy)]
struct ClientConnection {
    /// Negotiated MTU
    mtu: u16,
}

struct Registration {
    range: HandleRange,
    table: Arc<AttributeTable>,
    access: Arc<dyn AttributeAccess>,
}

/// A GATT server
pub struct GattServer {
    /// Server configuration
    config: GattServerConfig,
    /// Outbound notification transport
    sink: Arc<dyn NotificationSink>,
    /// Registered services in handle order
    services: RwLock<Vec<Registration>>,
    /// Live connections
    connections: RwLock<HashMap<ConnHandle, ClientConnection>>,
}

impl GattServer {
    /// Create a new GATT server
    pub fn new(config: GattServerConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            config,
            sink,
            services: RwLock::new(Vec::new()),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Get GATT server configuration
    pub fn config(&self) -> &GattServerConfig {
        &self.config
    }

    /// Track a new connection with the given MTU.
    pub fn connect(&self, conn: ConnHandle, mtu: u16) -> AttResult<()> {
        if !conn.is_valid() {
            return Err(AttError::InvalidParameter(format!("Invalid connection handle {}", conn)));
        }

        let mut connections = self.connections.write().unwrap_or_else(PoisonError::into_inner);
        if !connections.contains_key(&conn) && connections.len() >= self.config.max_connections {
            warn!("Refusing connection {}: {} slots in use", conn, connections.len());
            return Err(AttError::InsufficientResources);
        }

        let mtu = mtu.clamp(ATT_DEFAULT_MTU, self.config.max_mtu);
        info!("Connection {} up, MTU {}", conn, mtu);
        connections.insert(conn, ClientConnection { mtu });
        Ok(())
    }

    /// Forget a connection and drop its subscriptions.
    pub fn disconnect(&self, conn: ConnHandle) {
        let removed = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&conn);
        if removed.is_none() {
            return;
        }

        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        for registration in services.iter() {
            for subscriptions in registration.table.iter().filter_map(Attribute::subscriptions) {
                subscriptions.reset(conn);
            }
        }
        info!("Connection {} down", conn);
    }

    pub fn is_connected(&self, conn: ConnHandle) -> bool {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&conn)
    }

    /// Handle ranges of all registered services
    pub fn services(&self) -> Vec<HandleRange> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|registration| registration.range)
            .collect()
    }

    fn mtu(&self, conn: ConnHandle) -> AttResult<u16> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&conn)
            .map(|client| client.mtu)
            .ok_or(AttError::NotConnected(conn.0))
    }

    fn lookup(&self, handle: u16) -> AttResult<(Arc<AttributeTable>, Arc<dyn AttributeAccess>)> {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        services
            .iter()
            .find(|registration| registration.range.contains(handle))
            .map(|registration| (registration.table.clone(), registration.access.clone()))
            .ok_or(AttError::InvalidHandle(handle))
    }

    /// Handle a Read Request.
    pub fn read(&self, conn: ConnHandle, handle: u16) -> AttResult<Vec<u8>> {
        self.read_with(conn, handle, 0, AccessMethod::Read)
    }

    /// Handle a Read Blob Request.
    pub fn read_blob(&self, conn: ConnHandle, handle: u16, offset: u16) -> AttResult<Vec<u8>> {
        self.read_with(conn, handle, offset, AccessMethod::ReadBlob)
    }

    fn read_with(
        &self,
        conn: ConnHandle,
        handle: u16,
        offset: u16,
        method: AccessMethod,
    ) -> AttResult<Vec<u8>> {
        let max_len = self.mtu(conn)? - ATT_READ_RSP_HEADER_SIZE;
        let (table, access) = self.lookup(handle)?;
        let attr = table.get(handle).ok_or(AttError::InvalidHandle(handle))?;

        if !attr.permissions.can_read() {
            debug!("Read of handle {:#06x} by {} not permitted", handle, conn);
            return Err(AttError::ReadNotPermitted);
        }

        let result = match attr.runtime_value(conn) {
            Some(value) => {
                let offset = offset as usize;
                if offset > value.len() {
                    return Err(AttError::InvalidOffset(offset as u16));
                }
                let end = value.len().min(offset + max_len as usize);
                value[offset..end].to_vec()
            }
            None => {
                let mut out = vec![0u8; max_len as usize];
                let len = access.read_attribute(conn, attr, &mut out, offset, max_len, method)?;
                out.truncate(len);
                out
            }
        };

        trace!(
            "Read {:#06x}@{} by {}: {}",
            handle,
            offset,
            conn,
            hex::encode(&result)
        );
        Ok(result)
    }

    /// Handle a Write Request.
    pub fn write(&self, conn: ConnHandle, handle: u16, value: &[u8]) -> AttResult<()> {
        self.write_with(conn, handle, value, AccessMethod::Write)
    }

    /// Handle a Write Command. Errors are logged, never answered.
    pub fn write_command(&self, conn: ConnHandle, handle: u16, value: &[u8]) {
        if let Err(e) = self.write_with(conn, handle, value, AccessMethod::WriteCommand) {
            debug!("Dropped write command to {:#06x} from {}: {}", handle, conn, e);
        }
    }

    fn write_with(
        &self,
        conn: ConnHandle,
        handle: u16,
        value: &[u8],
        method: AccessMethod,
    ) -> AttResult<()> {
        self.mtu(conn)?;
        let (table, access) = self.lookup(handle)?;
        let attr = table.get(handle).ok_or(AttError::InvalidHandle(handle))?;

        if !attr.permissions.can_write() {
            debug!("Write of handle {:#06x} by {} not permitted", handle, conn);
            return Err(AttError::WriteNotPermitted);
        }

        trace!("Write {:#06x} by {}: {}", handle, conn, hex::encode(value));
        access.write_attribute(conn, attr, value, 0, method)
    }
}

impl GattRuntime for GattServer {
    fn max_connections(&self) -> usize {
        self.config.max_connections
    }

    fn register_service(
        &self,
        mut table: AttributeTable,
        access: Arc<dyn AttributeAccess>,
    ) -> AttResult<Arc<AttributeTable>> {
        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        let start = match services.last() {
            Some(last) => last
                .range
                .end
                .checked_add(1)
                .ok_or(AttError::InsufficientResources)?,
            None => ATT_HANDLE_MIN,
        };

        let range = table.assign_handles(start)?;
        let table = Arc::new(table);
        services.push(Registration {
            range,
            table: table.clone(),
            access,
        });

        info!(
            "Registered service with {} attributes at {:#06x}..={:#06x}, key size {}",
            table.len(),
            range.start,
            range.end,
            table.encryption_key_size()
        );
        Ok(table)
    }

    /// Values longer than the connection's MTU allows are cut to the leading
    /// `MTU - 3` bytes; the peer fetches the rest with Read Blob.
    fn send_notification(&self, conn: ConnHandle, handle: u16, value: &[u8]) -> AttResult<()> {
        let max_len = (self.mtu(conn)? - ATT_NOTIFICATION_HEADER_SIZE) as usize;
        let value = if value.len() > max_len {
            debug!(
                "Notification {:#06x} to {} cut from {} to {} bytes",
                handle,
                conn,
                value.len(),
                max_len
            );
            &value[..max_len]
        } else {
            value
        };

        trace!("Notify {:#06x} to {}: {} bytes", handle, conn, value.len());
        self.sink.send_notification(conn, handle, value)
    }
}
