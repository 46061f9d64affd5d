//! Outbound half: [`Transport`] writing JSON lines.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use propbus_app::ports::Transport;
use propbus_domain::error::PropBusError;
use propbus_domain::event::DriverEvent;

use crate::error::TransportError;

/// Writes every event as one line of JSON.
///
/// Writes are serialized so concurrent senders never interleave lines.
pub struct LineTransport<W> {
    writer: Mutex<W>,
}

impl LineTransport<tokio::io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> LineTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    async fn write_event(&self, event: &DriverEvent) -> Result<(), TransportError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}

impl<W> Transport for LineTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    #[tracing::instrument(skip(self, event), fields(device = event.device()))]
    async fn send(&self, event: DriverEvent) -> Result<(), PropBusError> {
        self.write_event(&event).await.map_err(PropBusError::from)
    }
}
