//! Routing of signals and call completions to remote proxies
//!
//! Proxies are owned by a flat table keyed by object path. Anything that
//! arrives for a path no longer in the table is dropped, so a completion or
//! signal can never reach a proxy that was already torn down.

use super::client::RemoteCharacteristic;
use crate::bus::{Bus, CallCompletion, Signal, PROPERTIES_CHANGED, PROPERTIES_INTERFACE};
use crate::path::ObjectPath;
use log::{debug, trace};
use std::collections::HashMap;

/// Owner of every live [`RemoteCharacteristic`]
#[derive(Debug, Default)]
pub struct Demultiplexer {
    proxies: HashMap<ObjectPath, RemoteCharacteristic>,
}

impl Demultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `proxy`. A proxy already registered for the same
    /// path is closed first.
    pub fn insert(&mut self, bus: &mut dyn Bus, proxy: RemoteCharacteristic) {
        let path = proxy.path().clone();
        if let Some(old) = self.proxies.insert(path.clone(), proxy) {
            debug!("replacing proxy for {}", path);
            old.close(bus);
        }
    }

    pub fn get(&self, path: &ObjectPath) -> Option<&RemoteCharacteristic> {
        self.proxies.get(path)
    }

    pub fn get_mut(&mut self, path: &ObjectPath) -> Option<&mut RemoteCharacteristic> {
        self.proxies.get_mut(path)
    }

    pub fn contains(&self, path: &ObjectPath) -> bool {
        self.proxies.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteCharacteristic> {
        self.proxies.values()
    }

    /// Close and forget the proxy at `path`. Returns false if there was none.
    pub fn remove(&mut self, bus: &mut dyn Bus, path: &ObjectPath) -> bool {
        match self.proxies.remove(path) {
            Some(proxy) => {
                proxy.close(bus);
                true
            }
            None => false,
        }
    }

    /// Close every proxy, e.g. after the remote device disconnected.
    pub fn clear(&mut self, bus: &mut dyn Bus) {
        for (_, proxy) in self.proxies.drain() {
            proxy.close(bus);
        }
    }

    /// Hand a `PropertiesChanged` signal to the proxy at its path. Returns
    /// whether a proxy was found.
    pub fn dispatch_signal(&mut self, bus: &mut dyn Bus, signal: &Signal) -> bool {
        if signal.interface != PROPERTIES_INTERFACE || signal.member != PROPERTIES_CHANGED {
            trace!("ignoring {}.{} on {}", signal.interface, signal.member, signal.path);
            return false;
        }
        match self.proxies.get_mut(&signal.path) {
            Some(proxy) => {
                proxy.handle_signal(bus, signal);
                true
            }
            None => {
                trace!("no proxy for signal on {}", signal.path);
                false
            }
        }
    }

    /// Hand a call completion to the proxy that issued the call. Returns
    /// whether a proxy was found.
    pub fn dispatch_completion(&mut self, completion: CallCompletion) -> bool {
        match self.proxies.get_mut(&completion.path) {
            Some(proxy) => {
                proxy.complete(completion);
                true
            }
            None => {
                trace!(
                    "dropping completion {:?} for {}",
                    completion.token,
                    completion.path
                );
                false
            }
        }
    }
}
