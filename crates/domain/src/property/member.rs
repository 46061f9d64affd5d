//! Members: the atomic named fields inside a vector.

use serde::{Deserialize, Serialize};

use super::{Permission, PropertyKind, PropertyState, SwitchState, VectorMeta};
use crate::encoding::base64_bytes;
use crate::error::ValidationError;

/// Behaviour shared by every member kind.
pub trait Member: Clone {
    /// Kind tag of the member and of any vector holding it.
    const KIND: PropertyKind;

    fn name(&self) -> &str;

    fn label(&self) -> &str;

    /// Adjust vector metadata the member kind imposes.
    fn normalize(_meta: &mut VectorMeta) {}
}

/// A numeric member with advisory range metadata.
///
/// The range is checked at construction only; updates are not clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Number {
    pub name: String,
    pub label: String,
    /// printf-style display format, e.g. `%4.2f`.
    pub format: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub value: f64,
}

impl Number {
    /// Start building a number member.
    #[must_use]
    pub fn builder(name: impl Into<String>, label: impl Into<String>) -> NumberBuilder {
        NumberBuilder {
            name: name.into(),
            label: label.into(),
            format: "%g".to_string(),
            min: 0.0,
            max: 0.0,
            step: 0.0,
            value: 0.0,
        }
    }
}

impl Member for Number {
    const KIND: PropertyKind = PropertyKind::Number;

    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Step-by-step builder for [`Number`].
#[derive(Debug)]
pub struct NumberBuilder {
    name: String,
    label: String,
    format: String,
    min: f64,
    max: f64,
    step: f64,
    value: f64,
}

impl NumberBuilder {
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    #[must_use]
    pub fn range(mut self, min: f64, max: f64, step: f64) -> Self {
        self.min = min;
        self.max = max;
        self.step = step;
        self
    }

    #[must_use]
    pub fn value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Validate and return the [`Number`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the name is empty, a bound is NaN or
    /// the range is inverted, or the initial value is NaN or lies outside
    /// `[min, max]`.
    pub fn build(self) -> Result<Number, ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.min.is_nan() || self.max.is_nan() || self.min > self.max {
            return Err(ValidationError::InvertedRange {
                member: self.name,
                min: self.min,
                max: self.max,
            });
        }
        if !(self.min..=self.max).contains(&self.value) {
            return Err(ValidationError::OutOfRange {
                member: self.name,
                value: self.value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(Number {
            name: self.name,
            label: self.label,
            format: self.format,
            min: self.min,
            max: self.max,
            step: self.step,
            value: self.value,
        })
    }
}

/// A single ON/OFF member of a switch vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Switch {
    pub name: String,
    pub label: String,
    pub state: SwitchState,
}

impl Switch {
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>, state: SwitchState) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            state,
        }
    }
}

impl Member for Switch {
    const KIND: PropertyKind = PropertyKind::Switch;

    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// A free-form text member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub name: String,
    pub label: String,
    pub value: String,
}

impl Text {
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            value: value.into(),
        }
    }
}

impl Member for Text {
    const KIND: PropertyKind = PropertyKind::Text;

    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// A status indicator. Lights are never writable by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Light {
    pub name: String,
    pub label: String,
    pub state: PropertyState,
}

impl Light {
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>, state: PropertyState) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            state,
        }
    }
}

impl Member for Light {
    const KIND: PropertyKind = PropertyKind::Light;

    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn normalize(meta: &mut VectorMeta) {
        meta.permission = Permission::ReadOnly;
    }
}

/// An opaque binary payload tagged with a format such as `.fits`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub name: String,
    pub label: String,
    pub format: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Blob {
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            format: String::new(),
            data: Vec::new(),
        }
    }
}

impl Member for Blob {
    const KIND: PropertyKind = PropertyKind::Blob;

    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_number_when_initial_value_in_range() {
        let number = Number::builder("SIM_SEEING", "arcseconds")
            .format("%4.2f")
            .range(0.0, 60.0, 0.0)
            .value(3.5)
            .build()
            .unwrap();
        assert_eq!(number.value, 3.5);
        assert_eq!(number.format, "%4.2f");
    }

    #[test]
    fn should_reject_number_when_initial_value_out_of_range() {
        let result = Number::builder("SIM_SEEING", "arcseconds")
            .range(0.0, 60.0, 0.0)
            .value(61.0)
            .build();
        assert!(matches!(result, Err(ValidationError::OutOfRange { .. })));
    }

    #[test]
    fn should_reject_number_when_range_inverted() {
        let result = Number::builder("X", "x").range(10.0, 0.0, 1.0).build();
        assert!(matches!(result, Err(ValidationError::InvertedRange { .. })));
    }

    #[test]
    fn should_reject_number_when_initial_value_is_nan() {
        let result = Number::builder("SIM_SEEING", "arcseconds")
            .range(0.0, 60.0, 0.0)
            .value(f64::NAN)
            .build();
        assert!(matches!(result, Err(ValidationError::OutOfRange { .. })));
    }

    #[test]
    fn should_reject_number_when_bound_is_nan() {
        let low = Number::builder("X", "x").range(f64::NAN, 10.0, 1.0).value(1.0).build();
        let high = Number::builder("X", "x").range(0.0, f64::NAN, 1.0).value(1.0).build();
        assert!(matches!(low, Err(ValidationError::InvertedRange { .. })));
        assert!(matches!(high, Err(ValidationError::InvertedRange { .. })));
    }

    #[test]
    fn should_reject_number_when_name_empty() {
        let result = Number::builder("", "x").build();
        assert_eq!(result, Err(ValidationError::EmptyName));
    }

    #[test]
    fn should_serialize_blob_data_as_base64() {
        let mut blob = Blob::new("CCD1", "Image");
        blob.format = ".fits".to_string();
        blob.data = vec![0, 1, 2, 255];
        let json = serde_json::to_value(&blob).unwrap();
        assert_eq!(json["data"], "AAEC/w==");

        let parsed: Blob = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.data, vec![0, 1, 2, 255]);
    }
}
