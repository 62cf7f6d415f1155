//! gattbus - GATT services and characteristics over an object bus
//!
//! This library publishes a local GATT application (services and
//! characteristics) as objects on a BlueZ-style message bus, and proxies
//! characteristics of remote devices exposed by the same stack. All bus I/O
//! goes through the [`bus::Bus`] trait; the runtime behind it delivers
//! requests, signals and call completions as [`bus::BusEvent`]s which a
//! [`dispatch::Dispatcher`] routes on a single thread.

pub mod bus;
pub mod dispatch;
pub mod error;
pub mod gatt;
pub mod path;
pub mod uuid;
pub mod variant;

// Re-export common types for convenience
pub use bus::{Bus, BusError, BusEvent, CallCompletion, CallToken};
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use gatt::{
    Application, ApplicationConfig, ClientConfig, Demultiplexer, PermissionFlags,
    RemoteCharacteristic, WriteType,
};
pub use path::ObjectPath;
pub use uuid::Uuid;
pub use variant::Variant;
