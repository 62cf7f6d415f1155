//! Event loop glue
//!
//! [`Dispatcher`] takes every [`BusEvent`] the runtime delivers and routes it:
//! method calls and property queries to the local application, signals and
//! completions to the remote proxies.

use crate::bus::{Bus, BusError, BusEvent};
use crate::error::Error;
use crate::gatt::{Application, Demultiplexer};
use crate::variant::Variant;
use log::warn;

/// Reply the runtime must send back for an incoming request
pub type Reply = Result<Variant, BusError>;

#[derive(Default)]
pub struct Dispatcher {
    application: Option<Application>,
    remote: Demultiplexer,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_application(application: Application) -> Self {
        Self {
            application: Some(application),
            remote: Demultiplexer::new(),
        }
    }

    pub fn application(&self) -> Option<&Application> {
        self.application.as_ref()
    }

    pub fn application_mut(&mut self) -> Option<&mut Application> {
        self.application.as_mut()
    }

    /// Install the application, returning the previous one if any.
    pub fn set_application(&mut self, application: Application) -> Option<Application> {
        self.application.replace(application)
    }

    pub fn take_application(&mut self) -> Option<Application> {
        self.application.take()
    }

    pub fn remote(&self) -> &Demultiplexer {
        &self.remote
    }

    pub fn remote_mut(&mut self) -> &mut Demultiplexer {
        &mut self.remote
    }

    /// Route one event. Returns the reply for method calls and property
    /// queries; `None` for signals and completions.
    pub fn dispatch(&mut self, bus: &mut dyn Bus, event: BusEvent) -> Option<Reply> {
        match event {
            BusEvent::MethodCall(call) => {
                let result = match self.application.as_mut() {
                    Some(app) => app.handle_method_call(&call),
                    None => Err(Error::NotFound(format!("object {}", call.path))),
                };
                Some(reply(result))
            }
            BusEvent::PropertyQuery(query) => {
                let result = match self.application.as_ref() {
                    Some(app) => app.get_property(&query),
                    None => Err(Error::NotFound(format!("object {}", query.path))),
                };
                Some(reply(result))
            }
            BusEvent::Signal(signal) => {
                self.remote.dispatch_signal(bus, &signal);
                None
            }
            BusEvent::Completion(completion) => {
                self.remote.dispatch_completion(completion);
                None
            }
        }
    }

    /// Close every proxy and unpublish the application.
    pub fn shutdown(&mut self, bus: &mut dyn Bus) {
        self.remote.clear(bus);
        if let Some(app) = self.application.take() {
            app.unpublish(bus);
        }
    }
}

fn reply(result: crate::error::Result<Variant>) -> Reply {
    result.map_err(|err| {
        warn!("replying with error: {}", err);
        err.to_bus_error()
    })
}
