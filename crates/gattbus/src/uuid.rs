use crate::error::Error;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;

/// A 128-bit UUID identifying a GATT service or characteristic.
///
/// Stored in big-endian (textual) byte order. The only accepted textual form
/// is the hyphenated 8-4-4-4-12 form; it is always displayed in lowercase, so
/// two spellings differing only in case compare equal.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Uuid {
    bytes: [u8; 16],
}

/// "00000000-0000-1000-8000-00805f9b34fb"
const BASE_UUID_BYTES: [u8; 16] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0x80, 0x5f, 0x9b, 0x34, 0xfb,
];

/// Positions of the hyphens in the textual form.
const HYPHENS: [usize; 4] = [8, 13, 18, 23];

const TEXT_LEN: usize = 36;

impl Uuid {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Uuid { bytes }
    }

    /// Creates a UUID from a 16-bit SIG-assigned value.
    pub const fn from_u16(uuid16: u16) -> Self {
        Self::from_u32(uuid16 as u32)
    }

    /// Creates a UUID from a 32-bit SIG-assigned value.
    pub const fn from_u32(uuid32: u32) -> Self {
        let mut bytes = BASE_UUID_BYTES;
        bytes[0] = (uuid32 >> 24) as u8;
        bytes[1] = (uuid32 >> 16) as u8;
        bytes[2] = (uuid32 >> 8) as u8;
        bytes[3] = uuid32 as u8;
        Uuid { bytes }
    }

    /// Generates a random (version 4) UUID, for vendor-specific services.
    pub fn new_random_v4() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes[6] = (bytes[6] & 0x0F) | 0x40;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        Uuid { bytes }
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.bytes
    }

    fn is_sig_assigned(&self) -> bool {
        self.bytes[4..] == BASE_UUID_BYTES[4..]
    }

    /// Returns the 16-bit alias if this is a SIG-assigned 16-bit UUID.
    pub fn as_u16(&self) -> Option<u16> {
        if self.is_sig_assigned() && self.bytes[0] == 0 && self.bytes[1] == 0 {
            Some(u16::from_be_bytes([self.bytes[2], self.bytes[3]]))
        } else {
            None
        }
    }

    /// Checks the hyphenated 8-4-4-4-12 form without building a value.
    pub fn is_valid(s: &str) -> bool {
        s.len() == TEXT_LEN
            && s.char_indices().all(|(i, c)| {
                if HYPHENS.contains(&i) {
                    c == '-'
                } else {
                    c.is_ascii_hexdigit()
                }
            })
    }
}

impl From<u16> for Uuid {
    fn from(uuid16: u16) -> Self {
        Uuid::from_u16(uuid16)
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{}-{}-{}-{}-{}",
            hex::encode(&b[0..4]),
            hex::encode(&b[4..6]),
            hex::encode(&b[6..8]),
            hex::encode(&b[8..10]),
            hex::encode(&b[10..16])
        )
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_u16() {
            Some(short) => write!(f, "Uuid(0x{:04X})", short),
            None => write!(f, "Uuid({})", self),
        }
    }
}

impl FromStr for Uuid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Uuid::is_valid(s) {
            return Err(Error::InvalidUuid(s.to_string()));
        }

        let digits: String = s.chars().filter(|c| *c != '-').collect();
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(&digits, &mut bytes).map_err(|_| Error::InvalidUuid(s.to_string()))?;
        Ok(Uuid { bytes })
    }
}
