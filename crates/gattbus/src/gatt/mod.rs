//! GATT (Generic Attribute Profile) object model
//!
//! The server side publishes local services and characteristics as bus
//! objects; the client side proxies characteristics of a remote device.

pub mod client;
pub mod demux;
pub mod registry;
pub mod server;
pub mod types;


pub use client::{ClientConfig, RemoteCharacteristic};
pub use demux::Demultiplexer;
pub use registry::{Handler, ObjectRegistry};
pub use server::{Application, ApplicationConfig, LocalCharacteristic, LocalService};
pub use types::{PermissionFlags, WriteOptions, WriteType};
