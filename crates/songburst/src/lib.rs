//! SongBurst - a custom GATT service carrying a 378-byte song data burst
//!
//! This library implements the song burst service on top of a small GATT server
//! layer: ATT error codes and permissions, declarative attribute tables,
//! per-connection subscription state, and an in-process attribute-server runtime.
//! The service validates peer reads and writes, serves the song data through
//! partial (blob) reads, notifies subscribed peers when the application supplies
//! new data and calls back into the application when a peer rewrites the
//! configuration value.

pub mod att;
pub mod error;
pub mod gatt;
pub mod service;
pub mod uuid;

// Re-export common types for convenience
pub use att::{AccessMethod, AttError, AttErrorCode, AttPermissions, AttResult, ConnHandle};
pub use error::ProfileError;
pub use gatt::{
    AttributeAccess, AttributeTable, ClientCharConfig, GattRuntime, GattServer, GattServerConfig,
    NotificationSink, SubscriptionTable,
};
pub use service::{
    FanOut, Parameter, ProfileCallbacks, SongBurstService, SongServiceConfig, SONG_CONFIG_LEN,
    SONG_DATA_LEN,
};
pub use uuid::Uuid;
