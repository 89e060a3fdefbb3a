//! Declarative attribute tables
//!
//! A service describes itself as an ordered list of attributes: the service
//! declaration, then for every characteristic its declaration, its value and
//! any descriptors. Handles are left unassigned until the runtime registers the
//! table.

use std::sync::Arc;

use byteorder::{LittleEndian, WriteBytesExt};

use super::cccd::{encode_ccc_value, SubscriptionTable};
use super::types::{CharacteristicProperties, HandleRange};
use crate::att::{
    AttError, AttPermissions, AttResult, ConnHandle, ATT_HANDLE_MAX, CHARACTERISTIC_UUID,
    CHAR_USER_DESC_UUID, CLIENT_CHAR_CONFIG_UUID, PRIMARY_SERVICE_UUID,
};
use crate::uuid::Uuid;

/// Where the value of an attribute lives
#[derive(Debug, Clone)]
pub enum AttributeValue {
    /// Service declaration carrying the service UUID
    ServiceDeclaration(Uuid),
    /// Characteristic declaration; the value handle always follows the declaration
    CharacteristicDeclaration {
        properties: CharacteristicProperties,
        value_uuid: Uuid,
    },
    /// Constant bytes held by the table (user descriptions)
    Static(Vec<u8>),
    /// Value owned by the registering service, served through its access callbacks
    Service,
    /// Per-connection client configuration
    ClientConfig(Arc<SubscriptionTable>),
}

/// An attribute in a table
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Attribute handle, zero until registered
    pub handle: u16,
    /// Attribute type (UUID)
    pub type_: Uuid,
    /// Attribute permissions
    pub permissions: AttPermissions,
    /// Attribute value
    pub value: AttributeValue,
}

impl Attribute {
    /// Value bytes of attributes the runtime serves on its own.
    ///
    /// Returns `None` for service-owned values.
    pub fn runtime_value(&self, conn: ConnHandle) -> Option<Vec<u8>> {
        match &self.value {
            AttributeValue::ServiceDeclaration(uuid) => Some(uuid.to_att_bytes()),
            AttributeValue::CharacteristicDeclaration {
                properties,
                value_uuid,
            } => {
                let mut value = Vec::with_capacity(19);
                value.push(properties.bits());
                value
                    .write_u16::<LittleEndian>(self.handle.wrapping_add(1))
                    .ok()?;
                value.extend_from_slice(&value_uuid.to_att_bytes());
                Some(value)
            }
            AttributeValue::Static(bytes) => Some(bytes.clone()),
            AttributeValue::ClientConfig(table) => Some(encode_ccc_value(table.get(conn)).to_vec()),
            AttributeValue::Service => None,
        }
    }

    /// Subscription table behind a CCCD attribute
    pub fn subscriptions(&self) -> Option<&Arc<SubscriptionTable>> {
        match &self.value {
            AttributeValue::ClientConfig(table) => Some(table),
            _ => None,
        }
    }
}

/// Ordered attributes of one service
#[derive(Debug, Clone)]
pub struct AttributeTable {
    attributes: Vec<Attribute>,
    /// Key size links need before encrypted permissions apply. Runtimes with link
    /// security enforce it; `GattServer` has no link layer and only records it.
    encryption_key_size: u8,
}

impl AttributeTable {
    /// Start a table with the primary service declaration for `service_uuid`.
    pub fn primary_service(service_uuid: Uuid, encryption_key_size: u8) -> Self {
        Self {
            attributes: vec![Attribute {
                handle: 0,
                type_: Uuid::from_u16(PRIMARY_SERVICE_UUID),
                permissions: AttPermissions::read_only(),
                value: AttributeValue::ServiceDeclaration(service_uuid),
            }],
            encryption_key_size,
        }
    }

    /// Append a characteristic declaration followed by its service-owned value.
    pub fn add_characteristic(
        &mut self,
        uuid: Uuid,
        properties: CharacteristicProperties,
        permissions: AttPermissions,
    ) -> &mut Self {
        self.attributes.push(Attribute {
            handle: 0,
            type_: Uuid::from_u16(CHARACTERISTIC_UUID),
            permissions: AttPermissions::read_only(),
            value: AttributeValue::CharacteristicDeclaration {
                properties,
                value_uuid: uuid,
            },
        });
        self.attributes.push(Attribute {
            handle: 0,
            type_: uuid,
            permissions,
            value: AttributeValue::Service,
        });
        self
    }

    /// Append a Client Characteristic Configuration descriptor.
    pub fn add_cccd(&mut self, subscriptions: Arc<SubscriptionTable>) -> &mut Self {
        self.attributes.push(Attribute {
            handle: 0,
            type_: Uuid::from_u16(CLIENT_CHAR_CONFIG_UUID),
            permissions: AttPermissions::read_write(),
            value: AttributeValue::ClientConfig(subscriptions),
        });
        self
    }

    /// Append a Characteristic User Description descriptor.
    pub fn add_user_description(&mut self, description: &str) -> &mut Self {
        self.attributes.push(Attribute {
            handle: 0,
            type_: Uuid::from_u16(CHAR_USER_DESC_UUID),
            permissions: AttPermissions::read_only(),
            value: AttributeValue::Static(description.as_bytes().to_vec()),
        });
        self
    }

    /// Give the attributes consecutive handles starting at `start`.
    pub fn assign_handles(&mut self, start: u16) -> AttResult<HandleRange> {
        let count = self.attributes.len() as u32;
        if start == 0 || count == 0 || start as u32 + count - 1 > ATT_HANDLE_MAX as u32 {
            return Err(AttError::InsufficientResources);
        }
        for (index, attr) in self.attributes.iter_mut().enumerate() {
            attr.handle = start + index as u16;
        }
        Ok(HandleRange {
            start,
            end: start + (count as u16 - 1),
        })
    }

    /// Handle range, if handles were assigned
    pub fn range(&self) -> Option<HandleRange> {
        let start = self.attributes.first()?.handle;
        let end = self.attributes.last()?.handle;
        (start != 0).then_some(HandleRange { start, end })
    }

    pub fn get(&self, handle: u16) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.handle == handle)
    }

    /// Handle of the characteristic value with the given type
    pub fn value_handle(&self, uuid: &Uuid) -> Option<u16> {
        self.attributes
            .iter()
            .find(|attr| attr.type_ == *uuid && matches!(attr.value, AttributeValue::Service))
            .map(|attr| attr.handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Encryption key size requested at registration
    pub fn encryption_key_size(&self) -> u8 {
        self.encryption_key_size
    }
}
