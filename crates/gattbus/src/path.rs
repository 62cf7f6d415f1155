//! Object paths
//!
//! Every published or proxied object is addressed by a hierarchical path such
//! as `/org/bluez/bincapplication/service0/char1`.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use zvariant::OwnedObjectPath;

/// A validated bus object path.
///
/// Starts with `/`, segments are non-empty and made of `[A-Za-z0-9_]`, and
/// there is no trailing `/` except for the root path itself.
#[derive(Clone)]
pub struct ObjectPath(OwnedObjectPath);

impl ObjectPath {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        match OwnedObjectPath::try_from(path.as_str()) {
            Ok(owned) => Ok(ObjectPath(owned)),
            Err(_) => Err(Error::InvalidAddress(path)),
        }
    }

    pub fn root() -> Self {
        ObjectPath(zvariant::ObjectPath::from_static_str_unchecked("/").into())
    }

    pub fn is_valid(path: &str) -> bool {
        zvariant::ObjectPath::try_from(path).is_ok()
    }

    /// The wire representation handed to a zbus-based runtime.
    pub fn as_owned_object_path(&self) -> &OwnedObjectPath {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Path of the `index`th child of `kind` below this one, e.g. `service0`.
    pub fn child(&self, kind: &str, index: usize) -> Result<ObjectPath> {
        let segment = format!("{}{}", kind, index);
        if self.as_str() == "/" {
            ObjectPath::new(format!("/{}", segment))
        } else {
            ObjectPath::new(format!("{}/{}", self.as_str(), segment))
        }
    }

    /// The parent path, `None` for the root.
    pub fn parent(&self) -> Option<ObjectPath> {
        let path = self.as_str();
        if path == "/" {
            return None;
        }
        match path.rfind('/') {
            Some(0) => Some(ObjectPath::root()),
            Some(idx) => ObjectPath::new(&path[..idx]).ok(),
            None => None,
        }
    }

    /// Last segment of the path.
    pub fn name(&self) -> &str {
        self.as_str().rsplit('/').next().unwrap_or("")
    }
}

impl PartialEq for ObjectPath {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ObjectPath {}

impl PartialOrd for ObjectPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjectPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Hash for ObjectPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectPath({})", self.as_str())
    }
}

impl FromStr for ObjectPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ObjectPath::new(s)
    }
}

impl TryFrom<&str> for ObjectPath {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        ObjectPath::new(s)
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<ObjectPath> for OwnedObjectPath {
    fn from(path: ObjectPath) -> Self {
        path.0
    }
}

impl From<OwnedObjectPath> for ObjectPath {
    fn from(path: OwnedObjectPath) -> Self {
        ObjectPath(path)
    }
}
