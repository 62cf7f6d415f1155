//! Error types for the gattbus library
//!
//! Local validation failures are returned synchronously from the call that
//! caused them. Failures of remote operations only ever reach the caller
//! through that operation's completion callback.

use crate::bus::BusError;
use crate::path::ObjectPath;
use crate::uuid::Uuid;
use thiserror::Error;

/// Bus error names used when an error has to be returned to a remote caller
pub const ERROR_FAILED: &str = "org.bluez.Error.Failed";
pub const ERROR_INVALID_ARGUMENTS: &str = "org.bluez.Error.InvalidArguments";
pub const ERROR_INVALID_OFFSET: &str = "org.bluez.Error.InvalidOffset";
pub const ERROR_NOT_PERMITTED: &str = "org.bluez.Error.NotPermitted";
pub const ERROR_NOT_SUPPORTED: &str = "org.bluez.Error.NotSupported";
pub const ERROR_DOES_NOT_EXIST: &str = "org.bluez.Error.DoesNotExist";
pub const ERROR_UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";
pub const ERROR_UNKNOWN_INTERFACE: &str = "org.freedesktop.DBus.Error.UnknownInterface";
pub const ERROR_UNKNOWN_PROPERTY: &str = "org.freedesktop.DBus.Error.UnknownProperty";

/// Errors produced by the GATT object model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),

    #[error("Invalid object path: {0}")]
    InvalidAddress(String),

    #[error("Object path already published: {0}")]
    Conflict(ObjectPath),

    #[error("UUID already registered: {0}")]
    AlreadyExists(Uuid),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Unknown interface: {0}")]
    UnknownInterface(String),

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Operation not permitted by characteristic flags: {operation}")]
    PermissionDenied { operation: &'static str },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Offset {0} not supported, only whole-value access is")]
    InvalidOffset(u16),

    #[error("Remote call failed: {name}: {message}")]
    CallFailed { name: String, message: String },

    #[error("No value set on {0}")]
    ValueNotSet(ObjectPath),
}

impl Error {
    /// Bus error name reported to a remote caller for this error
    pub fn bus_name(&self) -> &str {
        match self {
            Error::InvalidUuid(_) | Error::InvalidAddress(_) => ERROR_INVALID_ARGUMENTS,
            Error::PermissionDenied { .. } => ERROR_NOT_PERMITTED,
            Error::InvalidOffset(_) => ERROR_INVALID_OFFSET,
            Error::Protocol(_) => ERROR_INVALID_ARGUMENTS,
            Error::CallFailed { name, .. } => name,
            Error::NotFound(_) => ERROR_DOES_NOT_EXIST,
            Error::UnknownMethod(_) => ERROR_UNKNOWN_METHOD,
            Error::UnknownInterface(_) => ERROR_UNKNOWN_INTERFACE,
            Error::UnknownProperty(_) => ERROR_UNKNOWN_PROPERTY,
            Error::ValueNotSet(_) => ERROR_NOT_SUPPORTED,
            Error::Conflict(_) | Error::AlreadyExists(_) => ERROR_FAILED,
        }
    }

    /// Convert into the error reply the bus runtime sends back
    pub fn to_bus_error(&self) -> BusError {
        BusError::new(self.bus_name(), self.to_string())
    }
}

impl From<BusError> for Error {
    fn from(err: BusError) -> Self {
        Error::CallFailed {
            name: err.name,
            message: err.message,
        }
    }
}

/// Result type for gattbus operations
pub type Result<T> = std::result::Result<T, Error>;
