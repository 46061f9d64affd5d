//! Auxiliary controls: debug and simulation toggles, config commands.

use propbus_domain::error::ValidationError;
use propbus_domain::property::{Switch, SwitchRule, SwitchState, SwitchVector, VectorMeta};

pub const DEBUG: &str = "DEBUG";
pub const SIMULATION: &str = "SIMULATION";
pub const CONFIG_PROCESS: &str = "CONFIG_PROCESS";

pub const ENABLE: &str = "ENABLE";
pub const DISABLE: &str = "DISABLE";

/// Group shared by the auxiliary controls.
pub const OPTIONS_GROUP: &str = "Options";

/// A command of the momentary `CONFIG_PROCESS` vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    Load,
    Save,
    Default,
}

impl ConfigAction {
    /// Actions in member order.
    pub const ALL: [Self; 3] = [Self::Load, Self::Save, Self::Default];

    /// Member name of the action's switch.
    #[must_use]
    pub fn member(self) -> &'static str {
        match self {
            Self::Load => "CONFIG_LOAD",
            Self::Save => "CONFIG_SAVE",
            Self::Default => "CONFIG_DEFAULT",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Load => "Load",
            Self::Save => "Save",
            Self::Default => "Default",
        }
    }

    /// Action at a member position of `CONFIG_PROCESS`.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

fn toggle(name: &str, label: &str) -> Result<SwitchVector, ValidationError> {
    SwitchVector::new(
        VectorMeta::new(name, label).group(OPTIONS_GROUP),
        SwitchRule::OneOfMany,
        vec![
            Switch::new(ENABLE, "Enable", SwitchState::Off),
            Switch::new(DISABLE, "Disable", SwitchState::On),
        ],
    )
}

/// `DEBUG`, initially disabled.
///
/// # Errors
///
/// Never fails in practice; construction goes through the validating
/// constructor.
pub fn debug_vector() -> Result<SwitchVector, ValidationError> {
    toggle(DEBUG, "Debug")
}

/// `SIMULATION`, initially disabled.
///
/// # Errors
///
/// Never fails in practice; construction goes through the validating
/// constructor.
pub fn simulation_vector() -> Result<SwitchVector, ValidationError> {
    toggle(SIMULATION, "Simulation")
}

/// `CONFIG_PROCESS`, every command released.
///
/// # Errors
///
/// Never fails in practice; construction goes through the validating
/// constructor.
pub fn config_process_vector() -> Result<SwitchVector, ValidationError> {
    SwitchVector::new(
        VectorMeta::new(CONFIG_PROCESS, "Configuration").group(OPTIONS_GROUP),
        SwitchRule::AtMostOne,
        ConfigAction::ALL
            .iter()
            .map(|action| Switch::new(action.member(), action.label(), SwitchState::Off))
            .collect(),
    )
}

/// Whether a toggle vector has `ENABLE` switched on.
#[must_use]
pub fn is_enabled(vector: &SwitchVector) -> bool {
    vector.state_of(ENABLE).is_some_and(SwitchState::is_on)
}
