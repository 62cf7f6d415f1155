//! In-memory bus runtime for tests

use super::*;
use std::collections::BTreeMap;

#[derive(Default)]
pub(crate) struct MockBus {
    pub registered: BTreeMap<RegistrationId, (ObjectPath, Vec<String>)>,
    pub calls: Vec<(CallToken, MethodCall)>,
    pub subscriptions: BTreeMap<SubscriptionId, SignalRule>,
    pub emitted: Vec<Signal>,
    /// Paths whose registration the runtime refuses
    pub refuse: Vec<ObjectPath>,
    /// Makes every `emit_signal` fail
    pub fail_emit: bool,
    next_registration: u32,
    next_subscription: u32,
    next_token: u64,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registered_paths(&self) -> Vec<ObjectPath> {
        self.registered.values().map(|(p, _)| p.clone()).collect()
    }

    pub fn last_call(&self) -> &(CallToken, MethodCall) {
        self.calls.last().expect("no call was issued")
    }

    pub fn is_subscribed(&self, path: &ObjectPath) -> bool {
        self.subscriptions.values().any(|rule| &rule.path == path)
    }

    /// Completion for a previously issued call.
    pub fn complete(&self, token: CallToken, result: Result<Variant, BusError>) -> CallCompletion {
        let (_, call) = self
            .calls
            .iter()
            .find(|(t, _)| *t == token)
            .expect("unknown call token");
        CallCompletion {
            token,
            path: call.path.clone(),
            result,
        }
    }
}

impl Bus for MockBus {
    fn register_object(
        &mut self,
        path: &ObjectPath,
        interfaces: &[&str],
    ) -> Result<RegistrationId, BusError> {
        if self.refuse.contains(path) || self.registered.values().any(|(p, _)| p == path) {
            return Err(BusError::new(
                "org.freedesktop.DBus.Error.ObjectPathInUse",
                format!("{} already exported", path),
            ));
        }
        self.next_registration += 1;
        let id = RegistrationId(self.next_registration);
        self.registered.insert(
            id,
            (path.clone(), interfaces.iter().map(|s| s.to_string()).collect()),
        );
        Ok(id)
    }

    fn unregister_object(&mut self, id: RegistrationId) {
        self.registered.remove(&id);
    }

    fn call(&mut self, call: MethodCall) -> CallToken {
        self.next_token += 1;
        let token = CallToken(self.next_token);
        self.calls.push((token, call));
        token
    }

    fn subscribe(&mut self, rule: SignalRule) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscriptions.insert(id, rule);
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscriptions.remove(&id);
    }

    fn emit_signal(&mut self, signal: Signal) -> Result<(), BusError> {
        if self.fail_emit {
            return Err(BusError::new(
                "org.freedesktop.DBus.Error.Disconnected",
                "connection closed",
            ));
        }
        self.emitted.push(signal);
        Ok(())
    }
}
