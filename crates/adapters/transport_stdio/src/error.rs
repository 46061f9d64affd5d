//! Transport-specific error type.

use propbus_domain::error::PropBusError;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport io error")]
    Io(#[from] std::io::Error),

    #[error("invalid json")]
    Json(#[from] serde_json::Error),
}

impl From<TransportError> for PropBusError {
    fn from(err: TransportError) -> Self {
        Self::Transport(Box::new(err))
    }
}
