//! Variant values
//!
//! `Variant` is what crosses the bus boundary: method arguments, replies,
//! property values and signal bodies. Readers state the shape they expect
//! through the typed accessors, which fail with [`Error::Protocol`] when the
//! value has another shape.

use crate::error::{Error, Result};
use crate::path::ObjectPath;
use std::collections::{BTreeMap, HashMap};
use zvariant::{OwnedObjectPath, OwnedValue, Type};

/// Property name -> value (`a{sv}`)
pub type PropMap = BTreeMap<String, Variant>;

/// Interface name -> properties (`a{sa{sv}}`)
pub type InterfaceMap = BTreeMap<String, PropMap>;

/// Object path -> interfaces (`a{oa{sa{sv}}}`), the reply of a list-all query
pub type ObjectMap = BTreeMap<ObjectPath, InterfaceMap>;

#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    String(String),
    Bool(bool),
    U16(u16),
    ObjectPath(ObjectPath),
    Bytes(Vec<u8>),
    StringArray(Vec<String>),
    ObjectPathArray(Vec<ObjectPath>),
    Dict(PropMap),
    ObjectMap(ObjectMap),
    Tuple(Vec<Variant>),
}

impl Variant {
    /// Wire type signature of this value, e.g. `ay` or `(sa{sv}as)`.
    pub fn signature(&self) -> String {
        match self {
            Variant::String(_) => signature_of::<String>(),
            Variant::Bool(_) => signature_of::<bool>(),
            Variant::U16(_) => signature_of::<u16>(),
            Variant::ObjectPath(_) => signature_of::<OwnedObjectPath>(),
            Variant::Bytes(_) => signature_of::<Vec<u8>>(),
            Variant::StringArray(_) => signature_of::<Vec<String>>(),
            Variant::ObjectPathArray(_) => signature_of::<Vec<OwnedObjectPath>>(),
            Variant::Dict(_) => signature_of::<HashMap<String, OwnedValue>>(),
            Variant::ObjectMap(_) => signature_of::<
                HashMap<OwnedObjectPath, HashMap<String, HashMap<String, OwnedValue>>>,
            >(),
            Variant::Tuple(items) => {
                let inner: String = items.iter().map(Variant::signature).collect();
                format!("({})", inner)
            }
        }
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::Protocol(format!("expected {}, got {}", expected, self.signature()))
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Variant::String(s) => Ok(s),
            other => Err(other.mismatch("s")),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Variant::Bool(b) => Ok(*b),
            other => Err(other.mismatch("b")),
        }
    }

    pub fn as_u16(&self) -> Result<u16> {
        match self {
            Variant::U16(v) => Ok(*v),
            other => Err(other.mismatch("q")),
        }
    }

    pub fn as_object_path(&self) -> Result<&ObjectPath> {
        match self {
            Variant::ObjectPath(p) => Ok(p),
            other => Err(other.mismatch("o")),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Variant::Bytes(b) => Ok(b),
            other => Err(other.mismatch("ay")),
        }
    }

    pub fn as_string_array(&self) -> Result<&[String]> {
        match self {
            Variant::StringArray(v) => Ok(v),
            other => Err(other.mismatch("as")),
        }
    }

    pub fn as_object_path_array(&self) -> Result<&[ObjectPath]> {
        match self {
            Variant::ObjectPathArray(v) => Ok(v),
            other => Err(other.mismatch("ao")),
        }
    }

    pub fn as_dict(&self) -> Result<&PropMap> {
        match self {
            Variant::Dict(map) => Ok(map),
            other => Err(other.mismatch("a{sv}")),
        }
    }

    pub fn as_object_map(&self) -> Result<&ObjectMap> {
        match self {
            Variant::ObjectMap(map) => Ok(map),
            other => Err(other.mismatch("a{oa{sa{sv}}}")),
        }
    }

    /// Elements of a tuple whose signature must be exactly `signature`.
    pub fn as_tuple(&self, signature: &str) -> Result<&[Variant]> {
        match self {
            Variant::Tuple(items) if self.signature() == signature => Ok(items),
            other => Err(other.mismatch(signature)),
        }
    }

    /// Decodes a `(ay)` reply into its byte payload.
    pub fn into_single_bytes(self) -> Result<Vec<u8>> {
        match self {
            Variant::Tuple(mut items) if items.len() == 1 => match items.pop() {
                Some(Variant::Bytes(bytes)) => Ok(bytes),
                Some(other) => Err(Variant::Tuple(vec![other]).mismatch("(ay)")),
                None => Err(Error::Protocol("empty reply".into())),
            },
            other => Err(other.mismatch("(ay)")),
        }
    }
}

/// Signature of the wire type `T` is marshalled as.
fn signature_of<T: Type>() -> String {
    T::signature().to_string()
}

/// Looks up a required entry of a property map.
pub fn lookup<'a>(map: &'a PropMap, key: &str) -> Result<&'a Variant> {
    map.get(key)
        .ok_or_else(|| Error::Protocol(format!("missing key {}", key)))
}

impl From<&str> for Variant {
    fn from(s: &str) -> Self {
        Variant::String(s.to_string())
    }
}

impl From<String> for Variant {
    fn from(s: String) -> Self {
        Variant::String(s)
    }
}

impl From<bool> for Variant {
    fn from(b: bool) -> Self {
        Variant::Bool(b)
    }
}

impl From<u16> for Variant {
    fn from(v: u16) -> Self {
        Variant::U16(v)
    }
}

impl From<ObjectPath> for Variant {
    fn from(p: ObjectPath) -> Self {
        Variant::ObjectPath(p)
    }
}

impl From<Vec<u8>> for Variant {
    fn from(b: Vec<u8>) -> Self {
        Variant::Bytes(b)
    }
}

impl From<PropMap> for Variant {
    fn from(map: PropMap) -> Self {
        Variant::Dict(map)
    }
}
