//! Inbound update requests.

use serde::{Deserialize, Serialize};

use crate::encoding::base64_bytes;
use crate::id::ClientId;
use crate::property::{PropertyKind, SwitchState};

/// A new value for one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Number(f64),
    Switch(SwitchState),
    Text(String),
    Blob {
        format: String,
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
}

impl PropertyValue {
    /// Kind of vector this value can be written to.
    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Number(_) => PropertyKind::Number,
            Self::Switch(_) => PropertyKind::Switch,
            Self::Text(_) => PropertyKind::Text,
            Self::Blob { .. } => PropertyKind::Blob,
        }
    }
}

/// Who asked for an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOrigin {
    /// A remote client. Subject to permission checks and persist-on-update.
    Client(ClientId),
    /// Restoration from the config store.
    Config,
}

impl UpdateOrigin {
    #[must_use]
    pub fn client(self) -> Option<ClientId> {
        match self {
            Self::Client(id) => Some(id),
            Self::Config => None,
        }
    }
}

/// A request to merge new member values into one vector of one device.
///
/// Values are kept in arrival order; when a member is named twice the last
/// value wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub device: String,
    pub vector: String,
    pub values: Vec<(String, PropertyValue)>,
    pub origin: UpdateOrigin,
}

impl UpdateRequest {
    #[must_use]
    pub fn new(device: impl Into<String>, vector: impl Into<String>, origin: UpdateOrigin) -> Self {
        Self {
            device: device.into(),
            vector: vector.into(),
            values: Vec::new(),
            origin,
        }
    }

    #[must_use]
    pub fn number(mut self, member: impl Into<String>, value: f64) -> Self {
        self.values.push((member.into(), PropertyValue::Number(value)));
        self
    }

    #[must_use]
    pub fn switch(mut self, member: impl Into<String>, state: SwitchState) -> Self {
        self.values.push((member.into(), PropertyValue::Switch(state)));
        self
    }

    #[must_use]
    pub fn text(mut self, member: impl Into<String>, value: impl Into<String>) -> Self {
        self.values
            .push((member.into(), PropertyValue::Text(value.into())));
        self
    }

    #[must_use]
    pub fn blob(mut self, member: impl Into<String>, format: impl Into<String>, data: Vec<u8>) -> Self {
        self.values.push((
            member.into(),
            PropertyValue::Blob {
                format: format.into(),
                data,
            },
        ));
        self
    }

    /// Last value given for `member`, if any.
    #[must_use]
    pub fn value(&self, member: &str) -> Option<&PropertyValue> {
        self.values
            .iter()
            .rev()
            .find(|(name, _)| name == member)
            .map(|(_, value)| value)
    }

    /// Last number given for `member`, if any.
    #[must_use]
    pub fn number_value(&self, member: &str) -> Option<f64> {
        match self.value(member) {
            Some(PropertyValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    /// Whether the request switches `member` ON.
    #[must_use]
    pub fn switches_on(&self, member: &str) -> bool {
        matches!(
            self.value(member),
            Some(PropertyValue::Switch(SwitchState::On))
        )
    }

    #[must_use]
    pub fn is_from_config(&self) -> bool {
        matches!(self.origin, UpdateOrigin::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_keep_last_value_when_member_repeated() {
        let request = UpdateRequest::new("Focuser", "SEEING_SETTINGS", UpdateOrigin::Config)
            .number("SIM_SEEING", 1.0)
            .number("SIM_SEEING", 4.0);
        assert_eq!(request.number_value("SIM_SEEING"), Some(4.0));
    }

    #[test]
    fn should_detect_switched_on_member() {
        let request = UpdateRequest::new("Focuser", "CONNECTION", UpdateOrigin::Client(ClientId::new()))
            .switch("CONNECT", SwitchState::On)
            .switch("DISCONNECT", SwitchState::Off);
        assert!(request.switches_on("CONNECT"));
        assert!(!request.switches_on("DISCONNECT"));
        assert!(!request.is_from_config());
    }

    #[test]
    fn should_report_value_kind() {
        assert_eq!(PropertyValue::Number(1.0).kind(), PropertyKind::Number);
        assert_eq!(
            PropertyValue::Switch(SwitchState::On).kind(),
            PropertyKind::Switch
        );
        assert_eq!(PropertyValue::Text(String::new()).kind(), PropertyKind::Text);
    }

    #[test]
    fn should_parse_request_from_json() {
        let request: UpdateRequest = serde_json::from_value(serde_json::json!({
            "device": "Focuser",
            "vector": "SEEING_SETTINGS",
            "values": [["SIM_SEEING", {"number": 4.0}]],
            "origin": "config",
        }))
        .unwrap();
        assert_eq!(request.number_value("SIM_SEEING"), Some(4.0));
        assert!(request.is_from_config());
    }
}
