//! Transport port: delivers driver events to subscribed clients.

use std::future::Future;

use propbus_domain::error::PropBusError;
use propbus_domain::event::DriverEvent;

/// Sends [`DriverEvent`]s to every subscribed client.
///
/// Events with a [`recipient`](DriverEvent::recipient) must reach that
/// client only. A transport serving a single client writes them as-is.
pub trait Transport {
    /// Deliver one event.
    fn send(&self, event: DriverEvent) -> impl Future<Output = Result<(), PropBusError>> + Send;
}

impl<T: Transport + Send + Sync> Transport for std::sync::Arc<T> {
    fn send(&self, event: DriverEvent) -> impl Future<Output = Result<(), PropBusError>> + Send {
        (**self).send(event)
    }
}
