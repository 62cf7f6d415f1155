//! Common types for GATT operations

use crate::bus::{OPT_OFFSET, OPT_TYPE};
use crate::error::{Error, Result};
use crate::variant::{PropMap, Variant};
use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Characteristic properties as defined in the Bluetooth specification
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PermissionFlags: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
        const AUTHENTICATED_SIGNED_WRITES = 0x40;
        const EXTENDED_PROPERTIES = 0x80;
    }
}

/// Flag names in serialization order.
const FLAG_NAMES: [(PermissionFlags, &str); 8] = [
    (PermissionFlags::BROADCAST, "broadcast"),
    (PermissionFlags::READ, "read"),
    (PermissionFlags::WRITE_WITHOUT_RESPONSE, "write-without-response"),
    (PermissionFlags::WRITE, "write"),
    (PermissionFlags::NOTIFY, "notify"),
    (PermissionFlags::INDICATE, "indicate"),
    (PermissionFlags::AUTHENTICATED_SIGNED_WRITES, "authenticated-signed-writes"),
    (PermissionFlags::EXTENDED_PROPERTIES, "extended-properties"),
];

impl PermissionFlags {
    /// The `Flags` property value. Order follows the flag table, never the
    /// order the bits were combined in.
    pub fn names(self) -> Vec<String> {
        FLAG_NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| name.to_string())
            .collect()
    }

    /// Parses a remote `Flags` list. Names without a property bit
    /// (`encrypt-read`, `reliable-write`, ...) are skipped.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        names
            .iter()
            .filter_map(|name| {
                FLAG_NAMES
                    .iter()
                    .find(|(_, known)| *known == name.as_ref())
                    .map(|(flag, _)| *flag)
            })
            .fold(PermissionFlags::empty(), |acc, flag| acc | flag)
    }

    pub fn can_read(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn can_write(self) -> bool {
        self.contains(Self::WRITE)
    }

    pub fn can_write_without_response(self) -> bool {
        self.contains(Self::WRITE_WITHOUT_RESPONSE)
    }

    pub fn can_notify_or_indicate(self) -> bool {
        self.intersects(Self::NOTIFY | Self::INDICATE)
    }
}

/// How a value is written to a remote characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteType {
    /// Acknowledged write
    #[default]
    WithResponse,
    /// Unacknowledged write command
    WithoutResponse,
}

impl WriteType {
    /// Value of the `type` write option.
    pub fn as_str(self) -> &'static str {
        match self {
            WriteType::WithResponse => "request",
            WriteType::WithoutResponse => "command",
        }
    }

    /// The flag a characteristic needs for this kind of write.
    pub fn required_flag(self) -> PermissionFlags {
        match self {
            WriteType::WithResponse => PermissionFlags::WRITE,
            WriteType::WithoutResponse => PermissionFlags::WRITE_WITHOUT_RESPONSE,
        }
    }
}

impl fmt::Display for WriteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "request" => Ok(WriteType::WithResponse),
            "command" => Ok(WriteType::WithoutResponse),
            other => Err(Error::Protocol(format!("unsupported write type {}", other))),
        }
    }
}

/// Options map of a `WriteValue` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    pub offset: u16,
    pub write_type: WriteType,
}

impl WriteOptions {
    pub fn new(write_type: WriteType) -> Self {
        Self {
            offset: 0,
            write_type,
        }
    }

    pub fn to_dict(self) -> PropMap {
        let mut options = PropMap::new();
        options.insert(OPT_OFFSET.to_string(), Variant::U16(self.offset));
        options.insert(
            OPT_TYPE.to_string(),
            Variant::from(self.write_type.as_str()),
        );
        options
    }

    /// Reads the options of an incoming write; absent keys take defaults.
    pub fn from_dict(options: &PropMap) -> Result<Self> {
        let offset = offset_option(options)?;
        let write_type = match options.get(OPT_TYPE) {
            Some(v) => v.as_str()?.parse()?,
            None => WriteType::default(),
        };
        Ok(Self { offset, write_type })
    }
}

/// The `offset` option of a read or write, 0 when absent.
pub fn offset_option(options: &PropMap) -> Result<u16> {
    match options.get(OPT_OFFSET) {
        Some(v) => v.as_u16(),
        None => Ok(0),
    }
}

/// Options map of a `ReadValue` call.
pub fn read_options() -> PropMap {
    let mut options = PropMap::new();
    options.insert(OPT_OFFSET.to_string(), Variant::U16(0));
    options
}
