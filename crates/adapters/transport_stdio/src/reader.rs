//! Inbound half: client requests read line by line.

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use propbus_domain::id::ClientId;
use propbus_domain::update::{PropertyValue, UpdateOrigin, UpdateRequest};

use crate::error::TransportError;

/// A request as written by a client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for the definition of every visible vector.
    GetProperties {
        #[serde(default)]
        device: Option<String>,
    },
    /// Write member values.
    Update {
        device: String,
        vector: String,
        values: Vec<(String, PropertyValue)>,
    },
}

/// A parsed client request, attributed to the client that sent it.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    GetProperties { device: Option<String> },
    Update(UpdateRequest),
}

impl ClientMessage {
    #[must_use]
    pub fn into_inbound(self, client: ClientId) -> Inbound {
        match self {
            Self::GetProperties { device } => Inbound::GetProperties { device },
            Self::Update {
                device,
                vector,
                values,
            } => Inbound::Update(UpdateRequest {
                device,
                vector,
                values,
                origin: UpdateOrigin::Client(client),
            }),
        }
    }
}

/// Parse one line. Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns [`TransportError::Json`] when the line is not a valid request.
pub fn parse_line(line: &str, client: ClientId) -> Result<Option<Inbound>, TransportError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let message: ClientMessage = serde_json::from_str(line)?;
    Ok(Some(message.into_inbound(client)))
}

/// Read requests until end of input and forward them to `sink`.
///
/// Malformed lines are logged and skipped. Returns once the reader is
/// exhausted or the receiving side is gone.
///
/// # Errors
///
/// Returns [`TransportError::Io`] when reading fails.
pub async fn forward_lines<R>(
    reader: R,
    client: ClientId,
    sink: mpsc::Sender<Inbound>,
) -> Result<(), TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line, client) {
            Ok(Some(inbound)) => {
                if sink.send(inbound).await.is_err() {
                    tracing::debug!("request channel closed, stop reading");
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "ignoring malformed request"),
        }
    }
    Ok(())
}
