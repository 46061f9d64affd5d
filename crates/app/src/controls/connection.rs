//! The reserved `CONNECTION` vector.

use propbus_domain::error::ValidationError;
use propbus_domain::property::{
    CONNECTION, PropertyState, Switch, SwitchRule, SwitchState, SwitchVector, VectorMeta,
};

pub const CONNECT: &str = "CONNECT";
pub const DISCONNECT: &str = "DISCONNECT";

/// Connection lifecycle derived from the `CONNECTION` vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionStatus {
    /// Read the status off the vector's state and selected member.
    #[must_use]
    pub fn of(vector: &SwitchVector) -> Self {
        match vector.meta.state {
            PropertyState::Busy => Self::Connecting,
            PropertyState::Alert => Self::Failed,
            PropertyState::Ok | PropertyState::Idle => {
                if vector.state_of(CONNECT).is_some_and(SwitchState::is_on) {
                    Self::Connected
                } else {
                    Self::Disconnected
                }
            }
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// `CONNECTION`, initially disconnected.
///
/// # Errors
///
/// Never fails in practice; construction goes through the validating
/// constructor.
pub fn connection_vector() -> Result<SwitchVector, ValidationError> {
    SwitchVector::new(
        VectorMeta::new(CONNECTION, "Connection").group("Main Control"),
        SwitchRule::OneOfMany,
        vec![
            Switch::new(CONNECT, "Connect", SwitchState::Off),
            Switch::new(DISCONNECT, "Disconnect", SwitchState::On),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_start_disconnected() {
        let vector = connection_vector().unwrap();
        assert_eq!(ConnectionStatus::of(&vector), ConnectionStatus::Disconnected);
    }

    #[test]
    fn should_report_connecting_while_busy() {
        let mut vector = connection_vector().unwrap();
        vector.meta.state = PropertyState::Busy;
        assert_eq!(ConnectionStatus::of(&vector), ConnectionStatus::Connecting);
    }

    #[test]
    fn should_report_connected_when_connect_on_and_ok() {
        let mut vector = connection_vector().unwrap();
        vector.reset();
        vector.set(CONNECT, SwitchState::On);
        vector.meta.state = PropertyState::Ok;
        assert_eq!(ConnectionStatus::of(&vector), ConnectionStatus::Connected);
    }

    #[test]
    fn should_report_failed_on_alert() {
        let mut vector = connection_vector().unwrap();
        vector.meta.state = PropertyState::Alert;
        assert_eq!(ConnectionStatus::of(&vector), ConnectionStatus::Failed);
    }
}
