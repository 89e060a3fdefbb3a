//! GATT (Generic Attribute Profile) implementation
//!
//! This module provides the server side of GATT: declarative attribute tables,
//! per-connection subscription state, the contract between services and the
//! attribute-server runtime, and an in-process runtime implementing it.

pub mod cccd;
pub mod runtime;
pub mod server;
pub mod table;
pub mod types;


pub use cccd::{process_ccc_write, CharCfgEntry, SubscriptionTable};
pub use runtime::{AttributeAccess, GattRuntime};
pub use server::{GattServer, GattServerConfig, NotificationSink};
pub use table::{Attribute, AttributeTable, AttributeValue};
pub use types::{CharacteristicProperties, ClientCharConfig, HandleRange};
