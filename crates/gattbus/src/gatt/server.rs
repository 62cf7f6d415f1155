//! GATT application (server side)
//!
//! An [`Application`] publishes a tree of local services and characteristics
//! on the bus. The runtime forwards method calls and property queries for
//! those paths to [`Application::handle_method_call`] and
//! [`Application::get_property`]; the list-all query is answered from live
//! state on every call.

use super::registry::{Handler, ObjectRegistry};
use super::types::{offset_option, PermissionFlags, WriteOptions};
use crate::bus::*;
use crate::error::{Error, Result};
use crate::path::ObjectPath;
use crate::uuid::Uuid;
use crate::variant::{InterfaceMap, ObjectMap, PropMap, Variant};
use log::{debug, info, warn};
use std::collections::HashMap;

/// Application configuration
#[derive(Debug, Clone)]
pub struct ApplicationConfig {
    /// Path the application root is published at
    pub root_path: ObjectPath,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            root_path: ObjectPath::new("/org/bluez/bincapplication")
                .unwrap_or_else(|_| ObjectPath::root()),
        }
    }
}

/// Called after a remote peer wrote a characteristic value
pub type WriteObserver = Box<dyn FnMut(&LocalCharacteristic, &[u8])>;

/// A characteristic published by this process
#[derive(Debug, Clone)]
pub struct LocalCharacteristic {
    path: ObjectPath,
    uuid: Uuid,
    service_path: ObjectPath,
    service_uuid: Uuid,
    flags: PermissionFlags,
    value: Option<Vec<u8>>,
    notifying: bool,
}

impl LocalCharacteristic {
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn service_path(&self) -> &ObjectPath {
        &self.service_path
    }

    pub fn service_uuid(&self) -> Uuid {
        self.service_uuid
    }

    pub fn flags(&self) -> PermissionFlags {
        self.flags
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    /// Server-side notifying state, as set by StartNotify/StopNotify calls.
    pub fn is_notifying(&self) -> bool {
        self.notifying
    }

    /// Properties as listed by the list-all query; `Value` only once set.
    fn properties(&self) -> PropMap {
        let mut props = PropMap::new();
        props.insert(PROP_UUID.into(), Variant::String(self.uuid.to_string()));
        props.insert(PROP_SERVICE.into(), Variant::ObjectPath(self.service_path.clone()));
        props.insert(PROP_FLAGS.into(), Variant::StringArray(self.flags.names()));
        props.insert(PROP_NOTIFYING.into(), Variant::Bool(self.notifying));
        if let Some(value) = &self.value {
            props.insert(PROP_VALUE.into(), Variant::Bytes(value.clone()));
        }
        props
    }

    fn property(&self, name: &str) -> Result<Variant> {
        match name {
            PROP_UUID => Ok(Variant::String(self.uuid.to_string())),
            PROP_SERVICE => Ok(Variant::ObjectPath(self.service_path.clone())),
            PROP_FLAGS => Ok(Variant::StringArray(self.flags.names())),
            PROP_NOTIFYING => Ok(Variant::Bool(self.notifying)),
            PROP_DESCRIPTORS => Ok(Variant::ObjectPathArray(Vec::new())),
            PROP_VALUE => self
                .value
                .clone()
                .map(Variant::Bytes)
                .ok_or_else(|| Error::ValueNotSet(self.path.clone())),
            other => Err(Error::UnknownProperty(format!("{} on {}", other, self.path))),
        }
    }

    fn all_properties(&self) -> PropMap {
        let mut props = self.properties();
        props.insert(PROP_DESCRIPTORS.into(), Variant::ObjectPathArray(Vec::new()));
        props
    }
}

/// A service published by this process
#[derive(Debug, Clone)]
pub struct LocalService {
    path: ObjectPath,
    uuid: Uuid,
    characteristics: Vec<LocalCharacteristic>,
    by_uuid: HashMap<Uuid, usize>,
}

impl LocalService {
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Characteristics in the order they were added
    pub fn characteristics(&self) -> &[LocalCharacteristic] {
        &self.characteristics
    }

    pub fn characteristic(&self, uuid: &Uuid) -> Option<&LocalCharacteristic> {
        self.by_uuid.get(uuid).map(|&i| &self.characteristics[i])
    }

    fn characteristic_paths(&self) -> Vec<ObjectPath> {
        self.characteristics.iter().map(|c| c.path.clone()).collect()
    }

    fn properties(&self) -> PropMap {
        let mut props = PropMap::new();
        props.insert(PROP_UUID.into(), Variant::String(self.uuid.to_string()));
        props.insert(PROP_PRIMARY.into(), Variant::Bool(true));
        props.insert(
            PROP_CHARACTERISTICS.into(),
            Variant::ObjectPathArray(self.characteristic_paths()),
        );
        props
    }

    fn property(&self, name: &str) -> Result<Variant> {
        match name {
            PROP_UUID => Ok(Variant::String(self.uuid.to_string())),
            PROP_PRIMARY => Ok(Variant::Bool(true)),
            // Locally hosted services belong to no remote device.
            PROP_DEVICE => Ok(Variant::ObjectPath(ObjectPath::root())),
            PROP_CHARACTERISTICS => Ok(Variant::ObjectPathArray(self.characteristic_paths())),
            PROP_INCLUDES => Ok(Variant::ObjectPathArray(Vec::new())),
            other => Err(Error::UnknownProperty(format!("{} on {}", other, self.path))),
        }
    }

    fn all_properties(&self) -> PropMap {
        let mut props = self.properties();
        props.insert(PROP_DEVICE.into(), Variant::ObjectPath(ObjectPath::root()));
        props.insert(PROP_INCLUDES.into(), Variant::ObjectPathArray(Vec::new()));
        props
    }
}

/// The root of the published GATT tree. One per process.
pub struct Application {
    config: ApplicationConfig,
    registry: ObjectRegistry,
    services: Vec<LocalService>,
    by_uuid: HashMap<Uuid, usize>,
    on_write: Option<WriteObserver>,
}

impl Application {
    /// Publish an empty application at the configured root path.
    pub fn publish(bus: &mut dyn Bus, config: ApplicationConfig) -> Result<Self> {
        let mut registry = ObjectRegistry::new();
        registry.publish(
            bus,
            &config.root_path,
            &[OBJECT_MANAGER_INTERFACE],
            Handler::Application,
        )?;
        info!("published application at {}", config.root_path);

        Ok(Self {
            config,
            registry,
            services: Vec::new(),
            by_uuid: HashMap::new(),
            on_write: None,
        })
    }

    /// Unpublish every object of the application.
    pub fn unpublish(mut self, bus: &mut dyn Bus) {
        self.registry.clear(bus);
        info!("unpublished application at {}", self.config.root_path);
    }

    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    pub fn path(&self) -> &ObjectPath {
        &self.config.root_path
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Services in the order they were added
    pub fn services(&self) -> &[LocalService] {
        &self.services
    }

    pub fn service(&self, uuid: &str) -> Result<&LocalService> {
        let uuid: Uuid = uuid.parse()?;
        self.by_uuid
            .get(&uuid)
            .map(|&i| &self.services[i])
            .ok_or_else(|| Error::NotFound(format!("service {}", uuid)))
    }

    pub fn characteristic(&self, service_uuid: &str, char_uuid: &str) -> Result<&LocalCharacteristic> {
        let (service, index) = self.locate(service_uuid, char_uuid)?;
        Ok(&self.services[service].characteristics[index])
    }

    pub fn set_on_write(&mut self, observer: WriteObserver) {
        self.on_write = Some(observer);
    }

    /// Add a primary service; returns the path it was published at.
    pub fn add_service(&mut self, bus: &mut dyn Bus, uuid: &str) -> Result<ObjectPath> {
        let uuid: Uuid = uuid.parse()?;
        if self.by_uuid.contains_key(&uuid) {
            return Err(Error::AlreadyExists(uuid));
        }

        let root = self.config.root_path.clone();
        let path = self.registry.next_child_path(&root, "service")?;
        let index = self.services.len();
        self.registry.publish(
            bus,
            &path,
            &[GATT_SERVICE_INTERFACE, PROPERTIES_INTERFACE],
            Handler::Service(index),
        )?;

        debug!("added service {} at {}", uuid, path);
        self.services.push(LocalService {
            path: path.clone(),
            uuid,
            characteristics: Vec::new(),
            by_uuid: HashMap::new(),
        });
        self.by_uuid.insert(uuid, index);
        Ok(path)
    }

    /// Add a characteristic to an existing service; returns its path.
    pub fn add_characteristic(
        &mut self,
        bus: &mut dyn Bus,
        service_uuid: &str,
        char_uuid: &str,
        flags: PermissionFlags,
    ) -> Result<ObjectPath> {
        let service_uuid: Uuid = service_uuid.parse()?;
        let char_uuid: Uuid = char_uuid.parse()?;
        let service_index = *self
            .by_uuid
            .get(&service_uuid)
            .ok_or_else(|| Error::NotFound(format!("service {}", service_uuid)))?;

        let service = &self.services[service_index];
        if service.by_uuid.contains_key(&char_uuid) {
            return Err(Error::AlreadyExists(char_uuid));
        }

        let service_path = service.path.clone();
        let path = self.registry.next_child_path(&service_path, "char")?;
        let index = service.characteristics.len();
        self.registry.publish(
            bus,
            &path,
            &[GATT_CHARACTERISTIC_INTERFACE, PROPERTIES_INTERFACE],
            Handler::Characteristic {
                service: service_index,
                index,
            },
        )?;

        debug!(
            "added characteristic {} {:?} at {}",
            char_uuid,
            flags.names(),
            path
        );
        let service = &mut self.services[service_index];
        service.characteristics.push(LocalCharacteristic {
            path: path.clone(),
            uuid: char_uuid,
            service_path,
            service_uuid,
            flags,
            value: None,
            notifying: false,
        });
        service.by_uuid.insert(char_uuid, index);
        Ok(path)
    }

    /// Store a new value locally. Subscribers are notified when the
    /// characteristic is notifying; if that signal cannot be emitted the
    /// stored value is left unchanged.
    pub fn set_characteristic_value(
        &mut self,
        bus: &mut dyn Bus,
        service_uuid: &str,
        char_uuid: &str,
        value: Vec<u8>,
    ) -> Result<()> {
        let (service, index) = self.locate(service_uuid, char_uuid)?;
        let characteristic = &mut self.services[service].characteristics[index];
        if characteristic.notifying {
            debug!(
                "notifying <{}> on {}",
                hex::encode(&value),
                characteristic.path
            );
            let mut changed = PropMap::new();
            changed.insert(PROP_VALUE.into(), Variant::Bytes(value.clone()));
            bus.emit_signal(Signal::properties_changed(
                // the runtime fills in our unique name
                "",
                characteristic.path.clone(),
                GATT_CHARACTERISTIC_INTERFACE,
                changed,
            ))?;
        }
        characteristic.value = Some(value);
        Ok(())
    }

    /// Every published service and characteristic with its current properties.
    pub fn list_all(&self) -> ObjectMap {
        let mut objects = ObjectMap::new();
        for service in &self.services {
            let mut interfaces = InterfaceMap::new();
            interfaces.insert(GATT_SERVICE_INTERFACE.into(), service.properties());
            objects.insert(service.path.clone(), interfaces);

            for characteristic in &service.characteristics {
                let mut interfaces = InterfaceMap::new();
                interfaces.insert(GATT_CHARACTERISTIC_INTERFACE.into(), characteristic.properties());
                objects.insert(characteristic.path.clone(), interfaces);
            }
        }
        objects
    }

    /// Answer a method call addressed to one of our objects. The returned
    /// value is the reply body.
    pub fn handle_method_call(&mut self, call: &IncomingCall) -> Result<Variant> {
        let handler = self
            .registry
            .lookup(&call.path)
            .ok_or_else(|| Error::NotFound(format!("object {}", call.path)))?;

        match handler {
            Handler::Application
                if call.interface == OBJECT_MANAGER_INTERFACE
                    && call.member == GET_MANAGED_OBJECTS =>
            {
                debug!("{} from {}", GET_MANAGED_OBJECTS, call.sender);
                Ok(Variant::Tuple(vec![Variant::ObjectMap(self.list_all())]))
            }
            Handler::Characteristic { service, index }
                if call.interface == GATT_CHARACTERISTIC_INTERFACE =>
            {
                self.characteristic_method_call(service, index, call)
            }
            _ => Err(Error::UnknownMethod(format!(
                "{}.{} on {}",
                call.interface, call.member, call.path
            ))),
        }
    }

    fn characteristic_method_call(
        &mut self,
        service: usize,
        index: usize,
        call: &IncomingCall,
    ) -> Result<Variant> {
        debug!("local characteristic method called: {} on {}", call.member, call.path);

        match call.member.as_str() {
            READ_VALUE => {
                let offset = offset_option(&options_arg(&call.body, "(a{sv})")?)?;
                if offset != 0 {
                    return Err(Error::InvalidOffset(offset));
                }
                let characteristic = &self.services[service].characteristics[index];
                let value = characteristic
                    .value
                    .clone()
                    .ok_or_else(|| Error::ValueNotSet(characteristic.path.clone()))?;
                Ok(Variant::Tuple(vec![Variant::Bytes(value)]))
            }
            WRITE_VALUE => {
                let args = call.body.as_tuple("(aya{sv})")?;
                let value = args[0].as_bytes()?.to_vec();
                let options = WriteOptions::from_dict(args[1].as_dict()?)?;
                if options.offset != 0 {
                    return Err(Error::InvalidOffset(options.offset));
                }

                let characteristic = &mut self.services[service].characteristics[index];
                debug!(
                    "write <{}> ({}) to {}",
                    hex::encode(&value),
                    options.write_type,
                    characteristic.path
                );
                characteristic.value = Some(value.clone());

                if let Some(observer) = self.on_write.as_mut() {
                    observer(&self.services[service].characteristics[index], &value);
                }
                Ok(Variant::Tuple(Vec::new()))
            }
            START_NOTIFY => {
                self.services[service].characteristics[index].notifying = true;
                Ok(Variant::Tuple(Vec::new()))
            }
            STOP_NOTIFY => {
                self.services[service].characteristics[index].notifying = false;
                Ok(Variant::Tuple(Vec::new()))
            }
            CONFIRM => Ok(Variant::Tuple(Vec::new())),
            other => {
                warn!("unknown characteristic method {}", other);
                Err(Error::UnknownMethod(format!("{} on {}", other, call.path)))
            }
        }
    }

    /// Answer a property read; `property: None` returns all properties of
    /// the interface as a dictionary.
    pub fn get_property(&self, query: &PropertyQuery) -> Result<Variant> {
        let handler = self
            .registry
            .lookup(&query.path)
            .ok_or_else(|| Error::NotFound(format!("object {}", query.path)))?;

        match handler {
            Handler::Service(i) if query.interface == GATT_SERVICE_INTERFACE => {
                let service = &self.services[i];
                match &query.property {
                    Some(name) => service.property(name),
                    None => Ok(Variant::Dict(service.all_properties())),
                }
            }
            Handler::Characteristic { service, index }
                if query.interface == GATT_CHARACTERISTIC_INTERFACE =>
            {
                let characteristic = &self.services[service].characteristics[index];
                match &query.property {
                    Some(name) => characteristic.property(name),
                    None => Ok(Variant::Dict(characteristic.all_properties())),
                }
            }
            _ => Err(Error::UnknownInterface(format!(
                "{} on {}",
                query.interface, query.path
            ))),
        }
    }

    fn locate(&self, service_uuid: &str, char_uuid: &str) -> Result<(usize, usize)> {
        let service_uuid: Uuid = service_uuid.parse()?;
        let char_uuid: Uuid = char_uuid.parse()?;
        let service = *self
            .by_uuid
            .get(&service_uuid)
            .ok_or_else(|| Error::NotFound(format!("service {}", service_uuid)))?;
        let index = *self.services[service]
            .by_uuid
            .get(&char_uuid)
            .ok_or_else(|| Error::NotFound(format!("characteristic {}", char_uuid)))?;
        Ok((service, index))
    }
}

/// The options dictionary of a call whose only argument is `a{sv}`. An
/// argument-less call is treated as empty options.
fn options_arg(body: &Variant, signature: &str) -> Result<PropMap> {
    if body.signature() == "()" {
        return Ok(PropMap::new());
    }
    let args = body.as_tuple(signature)?;
    Ok(args[0].as_dict()?.clone())
}
