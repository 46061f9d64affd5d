//! Vector names and declarations of the focuser.

use propbus_app::controls::aux::OPTIONS_GROUP;
use propbus_domain::error::ValidationError;
use propbus_domain::property::{
    Number, NumberVector, Permission, PropertyVector, Switch, SwitchRule, SwitchState, SwitchVector,
    VectorMeta,
};

pub const MAIN_GROUP: &str = "Main Control";

pub const MODE: &str = "Mode";

pub const FOCUS_MOTION: &str = "FOCUS_MOTION";
pub const FOCUS_INWARD: &str = "FOCUS_INWARD";
pub const FOCUS_OUTWARD: &str = "FOCUS_OUTWARD";

pub const FOCUS_SPEED: &str = "FOCUS_SPEED";
pub const FOCUS_SPEED_VALUE: &str = "FOCUS_SPEED_VALUE";

pub const FOCUS_TIMER: &str = "FOCUS_TIMER";
pub const FOCUS_TIMER_VALUE: &str = "FOCUS_TIMER_VALUE";

pub const REL_FOCUS_POSITION: &str = "REL_FOCUS_POSITION";
pub const FOCUS_RELATIVE_POSITION: &str = "FOCUS_RELATIVE_POSITION";

pub const ABS_FOCUS_POSITION: &str = "ABS_FOCUS_POSITION";
pub const FOCUS_ABSOLUTE_POSITION: &str = "FOCUS_ABSOLUTE_POSITION";

pub const FOCUS_ABORT_MOTION: &str = "FOCUS_ABORT_MOTION";
pub const ABORT: &str = "ABORT";

pub const SEEING_SETTINGS: &str = "SEEING_SETTINGS";
pub const SIM_SEEING: &str = "SIM_SEEING";

pub const FWHM: &str = "FWHM";
pub const SIM_FWHM: &str = "SIM_FWHM";

pub const FOCUS_TEMPERATURE: &str = "FOCUS_TEMPERATURE";
pub const TEMPERATURE: &str = "TEMPERATURE";

pub const DELAY: &str = "DELAY";
pub const DELAY_VALUE: &str = "DELAY_VALUE";

pub const POSITION_MIN: f64 = 0.0;
pub const POSITION_MAX: f64 = 100_000.0;
pub const INITIAL_SEEING: f64 = 3.5;
pub const INITIAL_FWHM: f64 = 7.5;

/// Vectors shown only while connected, in definition order.
pub const CONNECTED_VECTORS: [&str; 10] = [
    FOCUS_MOTION,
    FOCUS_SPEED,
    FOCUS_TIMER,
    REL_FOCUS_POSITION,
    ABS_FOCUS_POSITION,
    FOCUS_ABORT_MOTION,
    SEEING_SETTINGS,
    FWHM,
    FOCUS_TEMPERATURE,
    DELAY,
];

fn single_number(
    meta: VectorMeta,
    member: &str,
    label: &str,
    format: &str,
    (min, max, step): (f64, f64, f64),
    value: f64,
) -> Result<NumberVector, ValidationError> {
    NumberVector::new(
        meta,
        vec![
            Number::builder(member, label)
                .format(format)
                .range(min, max, step)
                .value(value)
                .build()?,
        ],
    )
}

/// Every hidden vector of the focuser, in registration order.
///
/// # Errors
///
/// Never fails in practice; construction goes through the validating
/// constructors.
pub fn focuser_vectors() -> Result<Vec<PropertyVector>, ValidationError> {
    Ok(vec![
        SwitchVector::new(
            VectorMeta::new(FOCUS_MOTION, "Direction").group(MAIN_GROUP),
            SwitchRule::OneOfMany,
            vec![
                Switch::new(FOCUS_INWARD, "Focus In", SwitchState::On),
                Switch::new(FOCUS_OUTWARD, "Focus Out", SwitchState::Off),
            ],
        )?
        .into(),
        single_number(
            VectorMeta::new(FOCUS_SPEED, "Speed").group(MAIN_GROUP),
            FOCUS_SPEED_VALUE,
            "Focus Speed",
            "%3.0f",
            (1.0, 5.0, 1.0),
            1.0,
        )?
        .into(),
        single_number(
            VectorMeta::new(FOCUS_TIMER, "Timer").group(MAIN_GROUP),
            FOCUS_TIMER_VALUE,
            "Focus Timer (ms)",
            "%4.0f",
            (0.0, 5000.0, 50.0),
            0.0,
        )?
        .into(),
        single_number(
            VectorMeta::new(REL_FOCUS_POSITION, "Relative Position").group(MAIN_GROUP),
            FOCUS_RELATIVE_POSITION,
            "Steps",
            "%.f",
            (0.0, 50_000.0, 10.0),
            0.0,
        )?
        .into(),
        single_number(
            VectorMeta::new(ABS_FOCUS_POSITION, "Absolute Position").group(MAIN_GROUP),
            FOCUS_ABSOLUTE_POSITION,
            "Steps",
            "%.f",
            (POSITION_MIN, POSITION_MAX, 1000.0),
            POSITION_MAX / 2.0,
        )?
        .into(),
        SwitchVector::new(
            VectorMeta::new(FOCUS_ABORT_MOTION, "Abort Motion").group(MAIN_GROUP),
            SwitchRule::AtMostOne,
            vec![Switch::new(ABORT, "Abort", SwitchState::Off)],
        )?
        .into(),
        single_number(
            VectorMeta::new(SEEING_SETTINGS, "Seeing").group(MAIN_GROUP),
            SIM_SEEING,
            "arcseconds",
            "%4.2f",
            (0.0, 60.0, 0.0),
            INITIAL_SEEING,
        )?
        .into(),
        single_number(
            VectorMeta::new(FWHM, "FWHM")
                .group(MAIN_GROUP)
                .permission(Permission::ReadOnly),
            SIM_FWHM,
            "arcseconds",
            "%4.2f",
            (0.0, 60.0, 0.0),
            INITIAL_FWHM,
        )?
        .into(),
        single_number(
            VectorMeta::new(FOCUS_TEMPERATURE, "Temperature").group(MAIN_GROUP),
            TEMPERATURE,
            "Celsius",
            "%6.2f",
            (-50.0, 70.0, 0.0),
            0.0,
        )?
        .into(),
        single_number(
            VectorMeta::new(DELAY, "Delay")
                .group(OPTIONS_GROUP)
                .persist_on_update(true),
            DELAY_VALUE,
            "Value (uS)",
            "%.f",
            (0.0, 60_000.0, 100.0),
            100.0,
        )?
        .into(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_declare_every_connected_vector() {
        let vectors = focuser_vectors().unwrap();
        let names: Vec<&str> = vectors.iter().map(|v| v.name()).collect();
        assert_eq!(names, CONNECTED_VECTORS);
    }

    #[test]
    fn should_keep_fwhm_read_only() {
        let vectors = focuser_vectors().unwrap();
        let fwhm = vectors.iter().find(|v| v.name() == FWHM).unwrap();
        assert_eq!(fwhm.permission(), Permission::ReadOnly);
    }

    #[test]
    fn should_persist_delay_on_update() {
        let vectors = focuser_vectors().unwrap();
        let delay = vectors.iter().find(|v| v.name() == DELAY).unwrap();
        assert!(delay.meta().persist_on_update);
    }
}
