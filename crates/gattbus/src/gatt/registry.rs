//! Object registry
//!
//! Maps every published path to the handler that answers calls for it and
//! keeps the runtime registration alive. Child paths are derived from what is
//! already registered under the parent, so an index is never handed out twice.

use crate::bus::{Bus, RegistrationId};
use crate::error::{Error, Result};
use crate::path::ObjectPath;
use log::{debug, warn};
use std::collections::BTreeMap;

/// What answers requests for a published path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// The application root (list-all queries)
    Application,
    /// A service, by index into the application's service arena
    Service(usize),
    /// A characteristic, by service index and index within that service
    Characteristic { service: usize, index: usize },
}

#[derive(Debug)]
struct Registration {
    id: RegistrationId,
    handler: Handler,
}

/// Registry of published objects
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    entries: BTreeMap<ObjectPath, Registration>,
    /// Paths in publication order
    order: Vec<ObjectPath>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `handler` at `path`.
    ///
    /// Nothing is recorded when the path is taken or the runtime refuses the
    /// registration.
    pub fn publish(
        &mut self,
        bus: &mut dyn Bus,
        path: &ObjectPath,
        interfaces: &[&str],
        handler: Handler,
    ) -> Result<RegistrationId> {
        if self.entries.contains_key(path) {
            return Err(Error::Conflict(path.clone()));
        }

        let id = bus.register_object(path, interfaces).map_err(|err| {
            warn!("failed to publish {}: {}", path, err);
            Error::from(err)
        })?;

        debug!("published {} ({:?}) as {:?}", path, handler, id);
        self.entries.insert(path.clone(), Registration { id, handler });
        self.order.push(path.clone());
        Ok(id)
    }

    /// Number of `kind` children currently published directly under `parent`.
    pub fn child_count(&self, parent: &ObjectPath, kind: &str) -> usize {
        self.entries
            .keys()
            .filter(|path| path.parent().as_ref() == Some(parent))
            .filter(|path| {
                path.name()
                    .strip_prefix(kind)
                    .map_or(false, |n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            })
            .count()
    }

    /// The path the next `kind` child of `parent` will be published at.
    pub fn next_child_path(&self, parent: &ObjectPath, kind: &str) -> Result<ObjectPath> {
        parent.child(kind, self.child_count(parent, kind))
    }

    pub fn lookup(&self, path: &ObjectPath) -> Option<Handler> {
        self.entries.get(path).map(|r| r.handler)
    }

    pub fn registration_id(&self, path: &ObjectPath) -> Option<RegistrationId> {
        self.entries.get(path).map(|r| r.id)
    }

    /// Published paths in publication order.
    pub fn paths(&self) -> impl Iterator<Item = &ObjectPath> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unpublish everything, most recently published first.
    pub fn clear(&mut self, bus: &mut dyn Bus) {
        for path in self.order.drain(..).rev() {
            if let Some(registration) = self.entries.remove(&path) {
                debug!("unpublished {}", path);
                bus.unregister_object(registration.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::MockBus;

    fn path(s: &str) -> ObjectPath {
        ObjectPath::new(s).unwrap()
    }

    #[test]
    fn test_child_paths_are_sequential() {
        let mut bus = MockBus::new();
        let mut registry = ObjectRegistry::new();
        let root = path("/app");
        registry
            .publish(&mut bus, &root, &[], Handler::Application)
            .unwrap();

        for i in 0..3 {
            let next = registry.next_child_path(&root, "service").unwrap();
            assert_eq!(next.as_str(), format!("/app/service{}", i));
            registry
                .publish(&mut bus, &next, &[], Handler::Service(i))
                .unwrap();
        }

        // Other kinds and deeper descendants do not count.
        let service0 = path("/app/service0");
        registry
            .publish(
                &mut bus,
                &path("/app/service0/char0"),
                &[],
                Handler::Characteristic { service: 0, index: 0 },
            )
            .unwrap();
        assert_eq!(registry.child_count(&root, "service"), 3);
        assert_eq!(registry.child_count(&root, "char"), 0);
        assert_eq!(registry.child_count(&service0, "char"), 1);
        assert_eq!(registry.child_count(&service0, "characteristic"), 0);
    }

    #[test]
    fn test_conflict_leaves_registry_untouched() {
        let mut bus = MockBus::new();
        let mut registry = ObjectRegistry::new();
        let root = path("/app");
        let id = registry
            .publish(&mut bus, &root, &[], Handler::Application)
            .unwrap();

        assert_eq!(
            registry.publish(&mut bus, &root, &[], Handler::Service(0)),
            Err(Error::Conflict(root.clone()))
        );
        assert_eq!(registry.lookup(&root), Some(Handler::Application));
        assert_eq!(registry.registration_id(&root), Some(id));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_runtime_refusal_is_not_recorded() {
        let mut bus = MockBus::new();
        let refused = path("/app/service0");
        bus.refuse.push(refused.clone());
        let mut registry = ObjectRegistry::new();

        let err = registry
            .publish(&mut bus, &refused, &[], Handler::Service(0))
            .unwrap_err();
        assert!(matches!(err, Error::CallFailed { .. }));
        assert!(registry.is_empty());
        assert_eq!(registry.lookup(&refused), None);
    }

    #[test]
    fn test_clear_unregisters_in_reverse_order() {
        let mut bus = MockBus::new();
        let mut registry = ObjectRegistry::new();
        registry
            .publish(&mut bus, &path("/app"), &[], Handler::Application)
            .unwrap();
        registry
            .publish(&mut bus, &path("/app/service0"), &[], Handler::Service(0))
            .unwrap();
        assert_eq!(bus.registered.len(), 2);

        registry.clear(&mut bus);
        assert!(registry.is_empty());
        assert!(bus.registered.is_empty());
        assert_eq!(registry.paths().count(), 0);
    }
}
