//! Remote characteristic proxy (client side)
//!
//! A [`RemoteCharacteristic`] stands for one characteristic object of the
//! remote GATT stack. Operations are issued as non-blocking calls; each call
//! keeps its own completion until the matching [`CallCompletion`] arrives.
//!
//! Notifying state follows `PropertiesChanged` signals only. A successful
//! StartNotify reply just means the request was accepted; the proxy becomes
//! notifying when the remote reports `Notifying = true`, which may happen
//! before or after the reply.

use super::types::{read_options, PermissionFlags, WriteOptions, WriteType};
use crate::bus::*;
use crate::error::{Error, Result};
use crate::path::ObjectPath;
use crate::uuid::Uuid;
use crate::variant::{lookup, PropMap, Variant};
use log::{debug, trace, warn};
use std::collections::HashMap;
use std::fmt;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bus name of the remote GATT stack
    pub destination: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            destination: BLUEZ_SERVICE.to_string(),
        }
    }
}

/// Receives every value notification
pub type NotifyCallback = Box<dyn FnMut(&RemoteCharacteristic, &[u8])>;

/// Receives notifying state changes, and StartNotify/StopNotify failures
pub type NotifyingStateCallback = Box<dyn FnMut(&RemoteCharacteristic, Option<&Error>)>;

/// Completion of a single read
pub type ReadCompletion = Box<dyn FnOnce(&RemoteCharacteristic, Result<Vec<u8>>)>;

/// Completion of a single write, StartNotify or StopNotify
pub type Completion = Box<dyn FnOnce(&RemoteCharacteristic, Result<()>)>;

enum Pending {
    Read(ReadCompletion),
    Write(Completion),
    StartNotify(Completion),
    StopNotify(Completion),
}

impl Pending {
    fn member(&self) -> &'static str {
        match self {
            Pending::Read(_) => READ_VALUE,
            Pending::Write(_) => WRITE_VALUE,
            Pending::StartNotify(_) => START_NOTIFY,
            Pending::StopNotify(_) => STOP_NOTIFY,
        }
    }
}

/// Proxy for a characteristic of a remote device
pub struct RemoteCharacteristic {
    destination: String,
    path: ObjectPath,
    uuid: Uuid,
    service_path: ObjectPath,
    service_uuid: Uuid,
    flags: PermissionFlags,
    notifying: bool,
    subscription: Option<SubscriptionId>,
    pending: HashMap<CallToken, Pending>,
    on_notify: Option<NotifyCallback>,
    on_notifying_changed: Option<NotifyingStateCallback>,
}

impl RemoteCharacteristic {
    pub fn new(
        config: &ClientConfig,
        path: ObjectPath,
        uuid: Uuid,
        service_path: ObjectPath,
        service_uuid: Uuid,
        flags: PermissionFlags,
    ) -> Self {
        Self {
            destination: config.destination.clone(),
            path,
            uuid,
            service_path,
            service_uuid,
            flags,
            notifying: false,
            subscription: None,
            pending: HashMap::new(),
            on_notify: None,
            on_notifying_changed: None,
        }
    }

    /// Build a proxy from the `org.bluez.GattCharacteristic1` properties
    /// reported during discovery.
    pub fn from_properties(
        config: &ClientConfig,
        path: ObjectPath,
        service_uuid: Uuid,
        props: &PropMap,
    ) -> Result<Self> {
        let uuid: Uuid = lookup(props, PROP_UUID)?.as_str()?.parse()?;
        let service_path = lookup(props, PROP_SERVICE)?.as_object_path()?.clone();
        let flags = PermissionFlags::from_names(lookup(props, PROP_FLAGS)?.as_string_array()?);

        let mut proxy = Self::new(config, path, uuid, service_path, service_uuid, flags);
        if let Some(notifying) = props.get(PROP_NOTIFYING) {
            proxy.notifying = notifying.as_bool()?;
        }
        Ok(proxy)
    }

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

    pub fn is_notifying(&self) -> bool {
        self.notifying
    }

    /// Whether a `PropertiesChanged` subscription is active
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Number of calls still waiting for their completion
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    pub fn set_notify_callback(&mut self, callback: NotifyCallback) {
        self.on_notify = Some(callback);
    }

    pub fn set_notifying_state_callback(&mut self, callback: NotifyingStateCallback) {
        self.on_notifying_changed = Some(callback);
    }

    fn method_call(&self, member: &str, args: Vec<Variant>) -> MethodCall {
        MethodCall {
            destination: self.destination.clone(),
            path: self.path.clone(),
            interface: GATT_CHARACTERISTIC_INTERFACE.to_string(),
            member: member.to_string(),
            body: Variant::Tuple(args),
        }
    }

    fn issue(&mut self, bus: &mut dyn Bus, call: MethodCall, pending: Pending) -> CallToken {
        let token = bus.call(call);
        self.pending.insert(token, pending);
        token
    }

    /// Read the value. Fails immediately if the characteristic is not
    /// readable; otherwise `completion` gets the bytes or the error.
    pub fn read(&mut self, bus: &mut dyn Bus, completion: ReadCompletion) -> Result<CallToken> {
        if !self.flags.can_read() {
            return Err(Error::PermissionDenied { operation: "read" });
        }

        debug!("reading <{}>", self.uuid);
        let call = self.method_call(READ_VALUE, vec![Variant::Dict(read_options())]);
        Ok(self.issue(bus, call, Pending::Read(completion)))
    }

    /// Write `value` as a request or a command, depending on `write_type`.
    pub fn write(
        &mut self,
        bus: &mut dyn Bus,
        value: &[u8],
        write_type: WriteType,
        completion: Completion,
    ) -> Result<CallToken> {
        if !self.flags.contains(write_type.required_flag()) {
            return Err(Error::PermissionDenied { operation: "write" });
        }

        debug!("writing <{}> to <{}>", hex::encode(value), self.uuid);
        let options = WriteOptions::new(write_type).to_dict();
        let call = self.method_call(
            WRITE_VALUE,
            vec![Variant::Bytes(value.to_vec()), Variant::Dict(options)],
        );
        Ok(self.issue(bus, call, Pending::Write(completion)))
    }

    /// Subscribe to property changes, then ask the remote to start
    /// notifying. The subscription is made first so a fast `Notifying`
    /// change is not missed.
    pub fn start_notify(&mut self, bus: &mut dyn Bus, completion: Completion) -> Result<CallToken> {
        if !self.flags.can_notify_or_indicate() {
            return Err(Error::PermissionDenied { operation: "start notify" });
        }

        self.subscribe(bus);
        let call = self.method_call(START_NOTIFY, Vec::new());
        Ok(self.issue(bus, call, Pending::StartNotify(completion)))
    }

    /// Ask the remote to stop notifying. The proxy stays subscribed (or
    /// subscribes, when it learned the notifying state from discovery) until
    /// the remote reports `Notifying = false`.
    pub fn stop_notify(&mut self, bus: &mut dyn Bus, completion: Completion) -> Result<CallToken> {
        if !self.flags.can_notify_or_indicate() {
            return Err(Error::PermissionDenied { operation: "stop notify" });
        }

        self.subscribe(bus);
        let call = self.method_call(STOP_NOTIFY, Vec::new());
        Ok(self.issue(bus, call, Pending::StopNotify(completion)))
    }

    /// Deliver the completion of a call issued by this proxy. Completions
    /// for unknown tokens are ignored.
    pub fn complete(&mut self, completion: CallCompletion) {
        let pending = match self.pending.remove(&completion.token) {
            Some(pending) => pending,
            None => {
                trace!("ignoring completion {:?} on {}", completion.token, self.path);
                return;
            }
        };

        let result = completion.result.map_err(|err| {
            warn!(
                "failed to call '{}' on {} ({})",
                pending.member(),
                self.path,
                err
            );
            Error::from(err)
        });

        match pending {
            Pending::Read(done) => {
                let bytes = result.and_then(Variant::into_single_bytes);
                if let Err(err) = &bytes {
                    warn!("read on {} failed: {}", self.path, err);
                }
                done(&*self, bytes);
            }
            Pending::Write(done) => done(&*self, result.map(|_| ())),
            Pending::StartNotify(done) | Pending::StopNotify(done) => match result {
                Ok(_) => done(&*self, Ok(())),
                Err(err) => {
                    self.notifying_changed(Some(&err));
                    done(&*self, Err(err));
                }
            },
        }
    }

    /// Handle a `PropertiesChanged` signal for this object. Ignored unless
    /// subscribed.
    pub fn handle_signal(&mut self, bus: &mut dyn Bus, signal: &Signal) {
        if self.subscription.is_none() || signal.path != self.path {
            trace!("dropping signal for {}: not subscribed", signal.path);
            return;
        }

        let args = match signal.body.as_tuple(PROPERTIES_CHANGED_SIGNATURE) {
            Ok(args) => args,
            Err(_) => {
                warn!(
                    "invalid signature for {}: {} != {}",
                    signal.member,
                    signal.body.signature(),
                    PROPERTIES_CHANGED_SIGNATURE
                );
                return;
            }
        };
        if args[0].as_str() != Ok(GATT_CHARACTERISTIC_INTERFACE) {
            return;
        }
        let changed = match args[1].as_dict() {
            Ok(changed) => changed,
            Err(_) => return,
        };

        // A value carried by this signal arrived while subscribed, so it is
        // delivered even if the same signal turns notifying off.
        if let Some(value) = changed.get(PROP_VALUE) {
            match value.as_bytes() {
                Ok(bytes) => {
                    debug!("notification <{}> on <{}>", hex::encode(bytes), self.uuid);
                    self.notify(bytes);
                }
                Err(err) => warn!("bad Value on {}: {}", self.path, err),
            }
        }

        if let Some(notifying) = changed.get(PROP_NOTIFYING) {
            match notifying.as_bool() {
                Ok(notifying) => {
                    self.notifying = notifying;
                    debug!(
                        "notifying {} <{}>",
                        if notifying { "true" } else { "false" },
                        self.uuid
                    );
                    self.notifying_changed(None);
                    if !notifying {
                        self.unsubscribe(bus);
                    }
                }
                Err(err) => warn!("bad Notifying on {}: {}", self.path, err),
            }
        }
    }

    fn notify(&mut self, bytes: &[u8]) {
        if let Some(mut callback) = self.on_notify.take() {
            callback(&*self, bytes);
            if self.on_notify.is_none() {
                self.on_notify = Some(callback);
            }
        }
    }

    fn notifying_changed(&mut self, error: Option<&Error>) {
        if let Some(mut callback) = self.on_notifying_changed.take() {
            callback(&*self, error);
            if self.on_notifying_changed.is_none() {
                self.on_notifying_changed = Some(callback);
            }
        }
    }

    fn subscribe(&mut self, bus: &mut dyn Bus) {
        if self.subscription.is_some() {
            return;
        }
        let id = bus.subscribe(SignalRule {
            sender: Some(self.destination.clone()),
            interface: PROPERTIES_INTERFACE.to_string(),
            member: PROPERTIES_CHANGED.to_string(),
            path: self.path.clone(),
            arg0: Some(GATT_CHARACTERISTIC_INTERFACE.to_string()),
        });
        trace!("subscribed {:?} for {}", id, self.path);
        self.subscription = Some(id);
    }

    fn unsubscribe(&mut self, bus: &mut dyn Bus) {
        if let Some(id) = self.subscription.take() {
            trace!("unsubscribed {:?} for {}", id, self.path);
            bus.unsubscribe(id);
        }
    }

    /// Tear the proxy down: release the subscription first, then drop every
    /// pending completion unanswered.
    pub fn close(mut self, bus: &mut dyn Bus) {
        self.unsubscribe(bus);
        if !self.pending.is_empty() {
            debug!(
                "discarding {} pending call(s) on {}",
                self.pending.len(),
                self.path
            );
        }
        self.pending.clear();
    }
}

impl fmt::Display for RemoteCharacteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Characteristic{{uuid='{}', flags='[{}]', properties={}, service_uuid='{}'}}",
            self.uuid,
            self.flags.names().join(", "),
            self.flags.bits(),
            self.service_uuid
        )
    }
}

impl fmt::Debug for RemoteCharacteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCharacteristic")
            .field("path", &self.path)
            .field("uuid", &self.uuid)
            .field("flags", &self.flags)
            .field("notifying", &self.notifying)
            .field("subscription", &self.subscription)
            .field("pending", &self.pending.len())
            .finish()
    }
}
