//! Switch states and the rules constraining a switch vector.

use serde::{Deserialize, Serialize};

/// ON/OFF state of a single switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    On,
    #[default]
    Off,
}

impl SwitchState {
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for SwitchState {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl std::fmt::Display for SwitchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
        }
    }
}

/// Constraint on how many members of a switch vector may be ON at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchRule {
    OneOfMany,
    AtMostOne,
    AnyOfMany,
}

impl SwitchRule {
    /// Whether `on` members switched ON satisfy the rule.
    #[must_use]
    pub fn allows(self, on: usize) -> bool {
        match self {
            Self::OneOfMany => on == 1,
            Self::AtMostOne => on <= 1,
            Self::AnyOfMany => true,
        }
    }

    /// Exclusive rules release every member before applying an update.
    #[must_use]
    pub fn is_exclusive(self) -> bool {
        !matches!(self, Self::AnyOfMany)
    }
}

impl std::fmt::Display for SwitchRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneOfMany => f.write_str("one-of-many"),
            Self::AtMostOne => f.write_str("at-most-one"),
            Self::AnyOfMany => f.write_str("any-of-many"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_require_exactly_one_for_one_of_many() {
        assert!(!SwitchRule::OneOfMany.allows(0));
        assert!(SwitchRule::OneOfMany.allows(1));
        assert!(!SwitchRule::OneOfMany.allows(2));
    }

    #[test]
    fn should_allow_zero_or_one_for_at_most_one() {
        assert!(SwitchRule::AtMostOne.allows(0));
        assert!(SwitchRule::AtMostOne.allows(1));
        assert!(!SwitchRule::AtMostOne.allows(2));
    }

    #[test]
    fn should_allow_anything_for_any_of_many() {
        assert!(SwitchRule::AnyOfMany.allows(0));
        assert!(SwitchRule::AnyOfMany.allows(5));
        assert!(!SwitchRule::AnyOfMany.is_exclusive());
    }

    #[test]
    fn should_convert_bool_to_switch_state() {
        assert_eq!(SwitchState::from(true), SwitchState::On);
        assert_eq!(SwitchState::from(false), SwitchState::Off);
    }
}
