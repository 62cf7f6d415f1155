//! Example demonstrating a simple GATT application
//!
//! This example publishes an Environmental Sensing service with a Temperature
//! characteristic, then plays the remote side by feeding method calls and
//! property queries through the dispatcher.

use gattbus::bus::*;
use gattbus::gatt::{Application, ApplicationConfig, PermissionFlags};
use gattbus::variant::PropMap;
use gattbus::{Dispatcher, ObjectPath, Variant};

const ENV_SENSING: &str = "0000181a-0000-1000-8000-00805f9b34fb";
const TEMPERATURE: &str = "00002a6e-0000-1000-8000-00805f9b34fb";

/// Bus runtime stand-in that prints what it is asked to do
#[derive(Default)]
struct PrintingBus {
    next_registration: u32,
    next_token: u64,
    emitted: Vec<Signal>,
}

impl Bus for PrintingBus {
    fn register_object(
        &mut self,
        path: &ObjectPath,
        interfaces: &[&str],
    ) -> Result<RegistrationId, BusError> {
        self.next_registration += 1;
        println!("  register {} {:?}", path, interfaces);
        Ok(RegistrationId(self.next_registration))
    }

    fn unregister_object(&mut self, id: RegistrationId) {
        println!("  unregister {:?}", id);
    }

    fn call(&mut self, _call: MethodCall) -> CallToken {
        self.next_token += 1;
        CallToken(self.next_token)
    }

    fn subscribe(&mut self, _rule: SignalRule) -> SubscriptionId {
        SubscriptionId(0)
    }

    fn unsubscribe(&mut self, _id: SubscriptionId) {}

    fn emit_signal(&mut self, signal: Signal) -> Result<(), BusError> {
        println!("  emit {}.{} on {}", signal.interface, signal.member, signal.path);
        self.emitted.push(signal);
        Ok(())
    }
}

fn call(path: &ObjectPath, interface: &str, member: &str, args: Vec<Variant>) -> BusEvent {
    BusEvent::MethodCall(IncomingCall {
        sender: ":1.7".into(),
        path: path.clone(),
        interface: interface.into(),
        member: member.into(),
        body: Variant::Tuple(args),
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut bus = PrintingBus::default();

    // Publish the application root
    let mut app = Application::publish(&mut bus, ApplicationConfig::default())?;
    let root = app.path().clone();
    println!("Published application at {}", root);

    // Environmental Sensing service with a Temperature characteristic
    let service = app.add_service(&mut bus, ENV_SENSING)?;
    println!("Added service {}", service);
    let temperature = app.add_characteristic(
        &mut bus,
        ENV_SENSING,
        TEMPERATURE,
        PermissionFlags::READ | PermissionFlags::WRITE | PermissionFlags::NOTIFY,
    )?;
    println!("Added characteristic {}", temperature);

    app.set_on_write(Box::new(|chr, value| {
        println!("Remote wrote {:02x?} to {}", value, chr.uuid());
    }));

    // 21.50 degrees, in units of 0.01
    app.set_characteristic_value(&mut bus, ENV_SENSING, TEMPERATURE, 2150i16.to_le_bytes().to_vec())?;

    let mut dispatcher = Dispatcher::with_application(app);

    let mut write_options = PropMap::new();
    write_options.insert("offset".into(), Variant::U16(0));
    write_options.insert("type".into(), Variant::from("request"));

    let requests = vec![
        call(&root, OBJECT_MANAGER_INTERFACE, GET_MANAGED_OBJECTS, Vec::new()),
        BusEvent::PropertyQuery(PropertyQuery {
            path: service.clone(),
            interface: GATT_SERVICE_INTERFACE.into(),
            property: Some(PROP_CHARACTERISTICS.into()),
        }),
        call(
            &temperature,
            GATT_CHARACTERISTIC_INTERFACE,
            READ_VALUE,
            vec![Variant::Dict(PropMap::new())],
        ),
        call(
            &temperature,
            GATT_CHARACTERISTIC_INTERFACE,
            WRITE_VALUE,
            vec![Variant::Bytes(vec![0x70, 0x08]), Variant::Dict(write_options)],
        ),
        call(&temperature, GATT_CHARACTERISTIC_INTERFACE, START_NOTIFY, Vec::new()),
        call(&temperature, GATT_CHARACTERISTIC_INTERFACE, "Frobnicate", Vec::new()),
    ];

    for request in requests {
        match dispatcher.dispatch(&mut bus, request) {
            Some(Ok(reply)) => println!("Reply ({}): {:?}", reply.signature(), reply),
            Some(Err(err)) => println!("Error reply: {}", err),
            None => {}
        }
    }

    // Notifying now, so a new value goes out as PropertiesChanged
    if let Some(app) = dispatcher.application_mut() {
        app.set_characteristic_value(&mut bus, ENV_SENSING, TEMPERATURE, 2210i16.to_le_bytes().to_vec())?;
    }
    println!("Emitted {} signal(s)", bus.emitted.len());

    dispatcher.shutdown(&mut bus);
    println!("Application unpublished");

    Ok(())
}
