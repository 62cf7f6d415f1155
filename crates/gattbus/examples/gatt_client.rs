//! Example demonstrating a GATT client
//!
//! This example builds a proxy for a Temperature characteristic of a remote
//! device, then reads, writes and enables notifications on it. The bus below
//! answers every call itself, the way the remote GATT stack would.

use gattbus::bus::*;
use gattbus::gatt::{ClientConfig, RemoteCharacteristic, WriteType};
use gattbus::variant::PropMap;
use gattbus::{Dispatcher, ObjectPath, Uuid, Variant};
use std::collections::VecDeque;
use std::error::Error;

const DEVICE_SERVICE: &str = "/org/bluez/hci0/dev_00_11_22_33_44_55/service000c";
const DEVICE_CHAR: &str = "/org/bluez/hci0/dev_00_11_22_33_44_55/service000c/char000d";

/// Bus runtime stand-in backed by one simulated remote characteristic
struct SimulatedBus {
    value: Vec<u8>,
    next_token: u64,
    next_subscription: u32,
    rules: Vec<(SubscriptionId, SignalRule)>,
    events: VecDeque<BusEvent>,
}

impl SimulatedBus {
    fn new(value: Vec<u8>) -> Self {
        Self {
            value,
            next_token: 0,
            next_subscription: 0,
            rules: Vec::new(),
            events: VecDeque::new(),
        }
    }

    /// Queue a `PropertiesChanged` signal if somebody subscribed to it
    fn property_changed(&mut self, path: &ObjectPath, key: &str, value: Variant) {
        let mut changed = PropMap::new();
        changed.insert(key.into(), value);
        let signal = Signal::properties_changed(
            BLUEZ_SERVICE,
            path.clone(),
            GATT_CHARACTERISTIC_INTERFACE,
            changed,
        );
        if self.rules.iter().any(|(_, rule)| rule.matches(&signal)) {
            self.events.push_back(BusEvent::Signal(signal));
        }
    }
}

impl Bus for SimulatedBus {
    fn register_object(
        &mut self,
        _path: &ObjectPath,
        _interfaces: &[&str],
    ) -> Result<RegistrationId, BusError> {
        Err(BusError::new(
            "org.freedesktop.DBus.Error.NotSupported",
            "client only",
        ))
    }

    fn unregister_object(&mut self, _id: RegistrationId) {}

    fn call(&mut self, call: MethodCall) -> CallToken {
        self.next_token += 1;
        let token = CallToken(self.next_token);
        println!("  -> {} {}", call.member, call.path);

        let result = match call.member.as_str() {
            READ_VALUE => Ok(Variant::Tuple(vec![Variant::Bytes(self.value.clone())])),
            WRITE_VALUE => {
                if let Ok(args) = call.body.as_tuple("(aya{sv})") {
                    if let Ok(bytes) = args[0].as_bytes() {
                        self.value = bytes.to_vec();
                    }
                }
                Ok(Variant::Tuple(Vec::new()))
            }
            START_NOTIFY | STOP_NOTIFY => Ok(Variant::Tuple(Vec::new())),
            other => Err(BusError::new(
                "org.freedesktop.DBus.Error.UnknownMethod",
                format!("unknown method {}", other),
            )),
        };

        // The remote reports the state change before the reply arrives
        match call.member.as_str() {
            START_NOTIFY => {
                self.property_changed(&call.path, PROP_NOTIFYING, Variant::Bool(true));
                let value = Variant::Bytes(self.value.clone());
                self.property_changed(&call.path, PROP_VALUE, value);
            }
            STOP_NOTIFY => {
                self.property_changed(&call.path, PROP_NOTIFYING, Variant::Bool(false));
            }
            _ => {}
        }

        self.events.push_back(BusEvent::Completion(CallCompletion {
            token,
            path: call.path,
            result,
        }));
        token
    }

    fn subscribe(&mut self, rule: SignalRule) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        println!("  subscribe {:?} on {}", id, rule.path);
        self.rules.push((id, rule));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        println!("  unsubscribe {:?}", id);
        self.rules.retain(|(existing, _)| *existing != id);
    }

    fn emit_signal(&mut self, _signal: Signal) -> Result<(), BusError> {
        Ok(())
    }
}

/// Deliver everything the bus has queued
fn run(dispatcher: &mut Dispatcher, bus: &mut SimulatedBus) {
    while let Some(event) = bus.events.pop_front() {
        dispatcher.dispatch(bus, event);
    }
}

fn proxy<'a>(
    dispatcher: &'a mut Dispatcher,
    path: &ObjectPath,
) -> Result<&'a mut RemoteCharacteristic, Box<dyn Error>> {
    dispatcher
        .remote_mut()
        .get_mut(path)
        .ok_or_else(|| format!("no proxy for {}", path).into())
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut bus = SimulatedBus::new(2150i16.to_le_bytes().to_vec());
    let path = ObjectPath::new(DEVICE_CHAR)?;

    // Properties as reported by the remote object manager
    let mut props = PropMap::new();
    props.insert(PROP_UUID.into(), Variant::from("00002a6e-0000-1000-8000-00805f9b34fb"));
    props.insert(PROP_SERVICE.into(), Variant::ObjectPath(ObjectPath::new(DEVICE_SERVICE)?));
    props.insert(
        PROP_FLAGS.into(),
        Variant::StringArray(vec!["read".into(), "write".into(), "notify".into()]),
    );
    props.insert(PROP_NOTIFYING.into(), Variant::Bool(false));

    let mut chr = RemoteCharacteristic::from_properties(
        &ClientConfig::default(),
        path.clone(),
        Uuid::from_u16(0x181A),
        &props,
    )?;
    println!("Discovered {}", chr);

    chr.set_notify_callback(Box::new(|chr, value| {
        println!("Notification from {}: {:02x?}", chr.uuid(), value);
    }));
    chr.set_notifying_state_callback(Box::new(|chr, err| match err {
        Some(err) => println!("Notify request failed: {}", err),
        None => println!("Notifying: {}", chr.is_notifying()),
    }));

    let mut dispatcher = Dispatcher::new();
    dispatcher.remote_mut().insert(&mut bus, chr);

    // Read the current value
    proxy(&mut dispatcher, &path)?.read(
        &mut bus,
        Box::new(|_, result| match result {
            Ok(value) => println!("Read {:02x?}", value),
            Err(err) => println!("Read failed: {}", err),
        }),
    )?;
    run(&mut dispatcher, &mut bus);

    // Write a new one
    proxy(&mut dispatcher, &path)?.write(
        &mut bus,
        &2210i16.to_le_bytes(),
        WriteType::WithResponse,
        Box::new(|_, result| println!("Write done: {:?}", result)),
    )?;
    run(&mut dispatcher, &mut bus);

    // Enable, then disable notifications
    proxy(&mut dispatcher, &path)?.start_notify(
        &mut bus,
        Box::new(|_, result| println!("StartNotify done: {:?}", result)),
    )?;
    run(&mut dispatcher, &mut bus);

    proxy(&mut dispatcher, &path)?.stop_notify(
        &mut bus,
        Box::new(|_, result| println!("StopNotify done: {:?}", result)),
    )?;
    run(&mut dispatcher, &mut bus);

    dispatcher.shutdown(&mut bus);
    println!("Disconnected");

    Ok(())
}
