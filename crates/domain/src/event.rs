//! Driver events: every message a device sends to its clients.

use serde::{Deserialize, Serialize};

use crate::id::ClientId;
use crate::property::PropertyVector;
use crate::time::{Timestamp, now};

/// An outbound message.
///
/// Vector-carrying events hold a full snapshot, so a subscriber never sees a
/// partially updated vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverEvent {
    /// A vector became visible to clients.
    Define {
        device: String,
        vector: PropertyVector,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        timestamp: Timestamp,
    },
    /// New values or state for a visible vector.
    Update {
        device: String,
        vector: PropertyVector,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        timestamp: Timestamp,
    },
    /// A vector was hidden from clients.
    Delete {
        device: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        timestamp: Timestamp,
    },
    /// Free-form device message.
    Message {
        device: String,
        text: String,
        timestamp: Timestamp,
    },
    /// A request was refused. Addressed to the requesting client only.
    Rejected {
        device: String,
        client: ClientId,
        vector: String,
        reason: String,
        timestamp: Timestamp,
    },
}

impl DriverEvent {
    #[must_use]
    pub fn define(device: impl Into<String>, vector: PropertyVector, message: Option<String>) -> Self {
        Self::Define {
            device: device.into(),
            vector,
            message,
            timestamp: now(),
        }
    }

    #[must_use]
    pub fn update(device: impl Into<String>, vector: PropertyVector, message: Option<String>) -> Self {
        Self::Update {
            device: device.into(),
            vector,
            message,
            timestamp: now(),
        }
    }

    #[must_use]
    pub fn delete(device: impl Into<String>, name: impl Into<String>, message: Option<String>) -> Self {
        Self::Delete {
            device: device.into(),
            name: name.into(),
            message,
            timestamp: now(),
        }
    }

    #[must_use]
    pub fn message(device: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Message {
            device: device.into(),
            text: text.into(),
            timestamp: now(),
        }
    }

    #[must_use]
    pub fn rejected(
        device: impl Into<String>,
        client: ClientId,
        vector: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            device: device.into(),
            client,
            vector: vector.into(),
            reason: reason.into(),
            timestamp: now(),
        }
    }

    #[must_use]
    pub fn device(&self) -> &str {
        match self {
            Self::Define { device, .. }
            | Self::Update { device, .. }
            | Self::Delete { device, .. }
            | Self::Message { device, .. }
            | Self::Rejected { device, .. } => device,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Self::Define { timestamp, .. }
            | Self::Update { timestamp, .. }
            | Self::Delete { timestamp, .. }
            | Self::Message { timestamp, .. }
            | Self::Rejected { timestamp, .. } => *timestamp,
        }
    }

    /// Name of the vector the event is about, if any.
    #[must_use]
    pub fn vector_name(&self) -> Option<&str> {
        match self {
            Self::Define { vector, .. } | Self::Update { vector, .. } => Some(vector.name()),
            Self::Delete { name, .. } => Some(name),
            Self::Rejected { vector, .. } => Some(vector),
            Self::Message { .. } => None,
        }
    }

    /// Vector snapshot carried by `Define` and `Update`.
    #[must_use]
    pub fn snapshot(&self) -> Option<&PropertyVector> {
        match self {
            Self::Define { vector, .. } | Self::Update { vector, .. } => Some(vector),
            _ => None,
        }
    }

    /// Human-readable text attached to the event.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Define { message, .. }
            | Self::Update { message, .. }
            | Self::Delete { message, .. } => message.as_deref(),
            Self::Message { text, .. } => Some(text),
            Self::Rejected { reason, .. } => Some(reason),
        }
    }

    /// The only client allowed to receive this event, or `None` when it is
    /// broadcast.
    #[must_use]
    pub fn recipient(&self) -> Option<ClientId> {
        match self {
            Self::Rejected { client, .. } => Some(*client),
            _ => None,
        }
    }

    /// Whether `client` may receive this event.
    #[must_use]
    pub fn is_visible_to(&self, client: ClientId) -> bool {
        self.recipient().is_none_or(|recipient| recipient == client)
    }
}
