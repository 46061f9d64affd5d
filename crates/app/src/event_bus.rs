//! In-process event bus backed by a tokio broadcast channel.

use std::future::Future;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use propbus_domain::error::PropBusError;
use propbus_domain::event::DriverEvent;
use propbus_domain::id::ClientId;

use crate::ports::Transport;

/// In-process [`Transport`] using a tokio [`broadcast`] channel.
///
/// Sending succeeds even when there are no active subscribers
/// (the event is simply dropped).
#[derive(Clone)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<DriverEvent>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to every event sent *after* this call, including
    /// rejections addressed to any client. Meant for monitoring.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        self.sender.subscribe()
    }

    /// Subscribe as `client`: rejections addressed to other clients are
    /// never delivered.
    #[must_use]
    pub fn subscribe_as(&self, client: ClientId) -> ClientReceiver {
        ClientReceiver {
            client,
            receiver: self.sender.subscribe(),
        }
    }
}

/// Receiving end of one client on an [`InProcessEventBus`].
pub struct ClientReceiver {
    client: ClientId,
    receiver: broadcast::Receiver<DriverEvent>,
}

impl ClientReceiver {
    /// Wait for the next event visible to this client.
    ///
    /// # Errors
    ///
    /// Returns [`RecvError`] when the bus is closed or the receiver lagged.
    pub async fn recv(&mut self) -> Result<DriverEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if event.is_visible_to(self.client) {
                return Ok(event);
            }
        }
    }

    /// Next visible event, without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Empty`] when nothing visible is queued.
    pub fn try_recv(&mut self) -> Result<DriverEvent, TryRecvError> {
        loop {
            let event = self.receiver.try_recv()?;
            if event.is_visible_to(self.client) {
                return Ok(event);
            }
        }
    }
}

impl Transport for InProcessEventBus {
    fn send(&self, event: DriverEvent) -> impl Future<Output = Result<(), PropBusError>> + Send {
        // no receivers is not an error for a broadcast
        let _ = self.sender.send(event);
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_deliver_event_to_subscriber() {
        let bus = InProcessEventBus::new(16);
        let mut rx = bus.subscribe();

        bus.send(DriverEvent::message("Focuser", "hello"))
            .await
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.text(), Some("hello"));
    }

    #[tokio::test]
    async fn should_deliver_event_to_multiple_subscribers() {
        let bus = InProcessEventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.send(DriverEvent::delete("Focuser", "FWHM", None))
            .await
            .unwrap();

        assert_eq!(rx1.recv().await.unwrap().vector_name(), Some("FWHM"));
        assert_eq!(rx2.recv().await.unwrap().vector_name(), Some("FWHM"));
    }

    #[tokio::test]
    async fn should_deliver_rejection_to_requesting_client_only() {
        let bus = InProcessEventBus::new(16);
        let requester = ClientId::new();
        let mut own = bus.subscribe_as(requester);
        let mut other = bus.subscribe_as(ClientId::new());

        bus.send(DriverEvent::rejected("Focuser", requester, "FWHM", "read-only"))
            .await
            .unwrap();
        bus.send(DriverEvent::message("Focuser", "after"))
            .await
            .unwrap();

        assert!(matches!(own.recv().await.unwrap(), DriverEvent::Rejected { .. }));
        assert_eq!(own.recv().await.unwrap().text(), Some("after"));
        assert_eq!(other.recv().await.unwrap().text(), Some("after"));
        assert!(matches!(other.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn should_succeed_when_no_subscribers() {
        let bus = InProcessEventBus::new(16);
        let result = bus.send(DriverEvent::message("Focuser", "nobody")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn should_not_deliver_events_sent_before_subscription() {
        let bus = InProcessEventBus::new(16);
        bus.send(DriverEvent::message("Focuser", "early"))
            .await
            .unwrap();

        let mut rx = bus.subscribe();
        bus.send(DriverEvent::message("Focuser", "late"))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().text(), Some("late"));
    }
}
