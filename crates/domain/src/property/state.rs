//! Lifecycle state reported with every vector.

use serde::{Deserialize, Serialize};

/// Standard lifecycle tag attached to every property vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyState {
    #[default]
    Idle,
    Ok,
    Busy,
    Alert,
}

impl std::fmt::Display for PropertyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Ok => f.write_str("ok"),
            Self::Busy => f.write_str("busy"),
            Self::Alert => f.write_str("alert"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_idle() {
        assert_eq!(PropertyState::default(), PropertyState::Idle);
    }

    #[test]
    fn should_display_lowercase_variant_name() {
        assert_eq!(PropertyState::Ok.to_string(), "ok");
        assert_eq!(PropertyState::Alert.to_string(), "alert");
    }

    #[test]
    fn should_serialize_as_lowercase_string() {
        let json = serde_json::to_string(&PropertyState::Busy).unwrap();
        assert_eq!(json, "\"busy\"");
    }
}
