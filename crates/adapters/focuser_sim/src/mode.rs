//! The `Mode` selector and the capabilities each mode grants.

use propbus_domain::error::ValidationError;
use propbus_domain::property::{Switch, SwitchRule, SwitchState, SwitchVector, VectorMeta};

use crate::properties::{MAIN_GROUP, MODE};

/// What the focuser can currently do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub absolute: bool,
    pub relative: bool,
    pub variable_speed: bool,
}

/// Focuser operating mode, in `Mode` member order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    All,
    Absolute,
    Relative,
    Timer,
}

static MODES: [(Mode, &str, &str, Capabilities); 4] = [
    (
        Mode::All,
        "All",
        "All",
        Capabilities {
            absolute: true,
            relative: true,
            variable_speed: true,
        },
    ),
    (
        Mode::Absolute,
        "Absolute",
        "Absolute",
        Capabilities {
            absolute: true,
            relative: false,
            variable_speed: false,
        },
    ),
    (
        Mode::Relative,
        "Relative",
        "Relative",
        Capabilities {
            absolute: false,
            relative: true,
            variable_speed: false,
        },
    ),
    (
        Mode::Timer,
        "Timer",
        "Timer",
        Capabilities {
            absolute: false,
            relative: false,
            variable_speed: true,
        },
    ),
];

impl Mode {
    /// Mode selected by the member at `index`.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        MODES.get(index).map(|(mode, ..)| *mode)
    }

    fn entry(self) -> &'static (Mode, &'static str, &'static str, Capabilities) {
        // ordered like the enum
        &MODES[self as usize]
    }

    #[must_use]
    pub fn member(self) -> &'static str {
        self.entry().1
    }

    #[must_use]
    pub fn capabilities(self) -> Capabilities {
        self.entry().3
    }

    /// Read the selected mode off the vector.
    #[must_use]
    pub fn of(vector: &SwitchVector) -> Option<Self> {
        vector.on_index().and_then(Self::from_index)
    }
}

/// `Mode`, with `All` selected.
///
/// # Errors
///
/// Never fails in practice; construction goes through the validating
/// constructor.
pub fn mode_vector() -> Result<SwitchVector, ValidationError> {
    SwitchVector::new(
        VectorMeta::new(MODE, "Mode").group(MAIN_GROUP),
        SwitchRule::OneOfMany,
        MODES
            .iter()
            .map(|(mode, member, label, _)| {
                let state = if *mode == Mode::All {
                    SwitchState::On
                } else {
                    SwitchState::Off
                };
                Switch::new(*member, *label, state)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_indices_in_member_order() {
        assert_eq!(Mode::from_index(0), Some(Mode::All));
        assert_eq!(Mode::from_index(3), Some(Mode::Timer));
        assert_eq!(Mode::from_index(4), None);
    }

    #[test]
    fn should_grant_everything_in_all_mode() {
        let caps = Mode::All.capabilities();
        assert!(caps.absolute && caps.relative && caps.variable_speed);
    }

    #[test]
    fn should_grant_only_speed_in_timer_mode() {
        assert_eq!(
            Mode::Timer.capabilities(),
            Capabilities {
                absolute: false,
                relative: false,
                variable_speed: true,
            }
        );
    }

    #[test]
    fn should_start_in_all_mode() {
        let vector = mode_vector().unwrap();
        assert_eq!(Mode::of(&vector), Some(Mode::All));
        assert_eq!(vector.members().len(), 4);
    }

    #[test]
    fn should_read_selected_mode() {
        let mut vector = mode_vector().unwrap();
        vector
            .apply_states([(Mode::Relative.member(), SwitchState::On)])
            .unwrap();
        assert_eq!(Mode::of(&vector), Some(Mode::Relative));
    }
}
