//! Boundary to the bus runtime
//!
//! The runtime owns the transport: it routes incoming method calls and
//! property queries for published paths, performs outgoing calls without
//! blocking, and delivers subscribed signals. Everything it hands back to this
//! crate arrives as a [`BusEvent`] on the single event-loop thread.

pub mod constants;
#[cfg(test)]
pub(crate) mod mock;

use crate::path::ObjectPath;
use crate::variant::{PropMap, Variant};
use std::fmt;

pub use self::constants::*;

/// Identifies an object registration made through [`Bus::register_object`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(pub u32);

/// Identifies a signal subscription made through [`Bus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u32);

/// Identifies one in-flight outgoing call until its completion arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallToken(pub u64);

/// A failure reported by the bus runtime or by the remote side of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusError {
    pub name: String,
    pub message: String,
}

impl BusError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for BusError {}

/// An outgoing method call
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub destination: String,
    pub path: ObjectPath,
    pub interface: String,
    pub member: String,
    /// Arguments as a tuple; an empty tuple for no arguments
    pub body: Variant,
}

/// The result of an outgoing call, delivered after [`Bus::call`] returned
#[derive(Debug, Clone, PartialEq)]
pub struct CallCompletion {
    pub token: CallToken,
    /// Object the call was addressed to
    pub path: ObjectPath,
    pub result: Result<Variant, BusError>,
}

/// A method call addressed to a published object
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingCall {
    pub sender: String,
    pub path: ObjectPath,
    pub interface: String,
    pub member: String,
    pub body: Variant,
}

/// A property read on a published object; `property: None` asks for all
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyQuery {
    pub path: ObjectPath,
    pub interface: String,
    pub property: Option<String>,
}

/// A signal, either received through a subscription or emitted
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub sender: String,
    pub path: ObjectPath,
    pub interface: String,
    pub member: String,
    pub body: Variant,
}

impl Signal {
    /// Builds a `PropertiesChanged` signal for `interface` on `path`.
    pub fn properties_changed(
        sender: impl Into<String>,
        path: ObjectPath,
        interface: &str,
        changed: PropMap,
    ) -> Self {
        Self {
            sender: sender.into(),
            path,
            interface: PROPERTIES_INTERFACE.to_string(),
            member: PROPERTIES_CHANGED.to_string(),
            body: Variant::Tuple(vec![
                Variant::from(interface),
                Variant::Dict(changed),
                Variant::StringArray(Vec::new()),
            ]),
        }
    }
}

/// Match rule for a signal subscription
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRule {
    pub sender: Option<String>,
    pub interface: String,
    pub member: String,
    pub path: ObjectPath,
    /// First argument of the signal, e.g. the interface of `PropertiesChanged`
    pub arg0: Option<String>,
}

impl SignalRule {
    pub fn matches(&self, signal: &Signal) -> bool {
        let arg0_matches = match &self.arg0 {
            None => true,
            Some(expected) => match &signal.body {
                Variant::Tuple(items) => {
                    matches!(items.first(), Some(Variant::String(s)) if s == expected)
                }
                _ => false,
            },
        };
        self.sender.as_ref().map_or(true, |s| *s == signal.sender)
            && self.interface == signal.interface
            && self.member == signal.member
            && self.path == signal.path
            && arg0_matches
    }
}

/// Everything the runtime delivers to the event loop
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    MethodCall(IncomingCall),
    PropertyQuery(PropertyQuery),
    Signal(Signal),
    Completion(CallCompletion),
}

/// The bus runtime as seen from the GATT object model.
///
/// None of these methods may block: [`Bus::call`] only queues the call and
/// its completion comes back later as [`BusEvent::Completion`].
pub trait Bus {
    /// Makes `path` routable for the given interfaces.
    fn register_object(
        &mut self,
        path: &ObjectPath,
        interfaces: &[&str],
    ) -> Result<RegistrationId, BusError>;

    fn unregister_object(&mut self, id: RegistrationId);

    /// Queues an outgoing call.
    fn call(&mut self, call: MethodCall) -> CallToken;

    fn subscribe(&mut self, rule: SignalRule) -> SubscriptionId;

    fn unsubscribe(&mut self, id: SubscriptionId);

    fn emit_signal(&mut self, signal: Signal) -> Result<(), BusError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> SignalRule {
        SignalRule {
            sender: Some(BLUEZ_SERVICE.into()),
            interface: PROPERTIES_INTERFACE.into(),
            member: PROPERTIES_CHANGED.into(),
            path: ObjectPath::new("/org/bluez/hci0/dev_A/service1/char2").unwrap(),
            arg0: Some(GATT_CHARACTERISTIC_INTERFACE.into()),
        }
    }

    #[test]
    fn test_rule_matches_properties_changed() {
        let rule = rule();
        let signal = Signal::properties_changed(
            BLUEZ_SERVICE,
            rule.path.clone(),
            GATT_CHARACTERISTIC_INTERFACE,
            PropMap::new(),
        );
        assert!(rule.matches(&signal));

        let other_iface = Signal::properties_changed(
            BLUEZ_SERVICE,
            rule.path.clone(),
            "org.bluez.Device1",
            PropMap::new(),
        );
        assert!(!rule.matches(&other_iface));

        let other_path = Signal::properties_changed(
            BLUEZ_SERVICE,
            ObjectPath::new("/org/bluez/hci0/dev_A/service1/char3").unwrap(),
            GATT_CHARACTERISTIC_INTERFACE,
            PropMap::new(),
        );
        assert!(!rule.matches(&other_path));
    }
}
