//! Persisted configuration documents.
//!
//! A [`ConfigDocument`] holds the saved member values of one device. Only
//! values travel through the store; labels, ranges and rules come from the
//! declarations the device registers at startup.

use serde::{Deserialize, Serialize};

use crate::encoding::base64_bytes;
use crate::property::{CONNECTION, PropertyVector, SwitchRule, SwitchState};
use crate::update::{PropertyValue, UpdateOrigin, UpdateRequest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNumber {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSwitch {
    pub name: String,
    pub state: SwitchState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredText {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlob {
    pub name: String,
    pub format: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// Saved values of one vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoredVector {
    Number {
        name: String,
        members: Vec<StoredNumber>,
    },
    Switch {
        name: String,
        members: Vec<StoredSwitch>,
    },
    Text {
        name: String,
        members: Vec<StoredText>,
    },
    Blob {
        name: String,
        members: Vec<StoredBlob>,
    },
}

impl StoredVector {
    /// Capture the current values of a vector.
    ///
    /// Returns `None` for vectors that are never saved: `CONNECTION`, lights,
    /// and one-of-many switches with nothing selected.
    #[must_use]
    pub fn capture(vector: &PropertyVector) -> Option<Self> {
        if vector.name() == CONNECTION {
            return None;
        }
        let name = vector.name().to_string();
        match vector {
            PropertyVector::Number(v) => Some(Self::Number {
                name,
                members: v
                    .members()
                    .iter()
                    .map(|n| StoredNumber {
                        name: n.name.clone(),
                        value: n.value,
                    })
                    .collect(),
            }),
            PropertyVector::Switch(v) => {
                if v.rule() == SwitchRule::OneOfMany && v.on_count() == 0 {
                    return None;
                }
                Some(Self::Switch {
                    name,
                    members: v
                        .members()
                        .iter()
                        .map(|s| StoredSwitch {
                            name: s.name.clone(),
                            state: s.state,
                        })
                        .collect(),
                })
            }
            PropertyVector::Text(v) => Some(Self::Text {
                name,
                members: v
                    .members()
                    .iter()
                    .map(|t| StoredText {
                        name: t.name.clone(),
                        value: t.value.clone(),
                    })
                    .collect(),
            }),
            PropertyVector::Blob(v) => Some(Self::Blob {
                name,
                members: v
                    .members()
                    .iter()
                    .map(|b| StoredBlob {
                        name: b.name.clone(),
                        format: b.format.clone(),
                        data: b.data.clone(),
                    })
                    .collect(),
            }),
            PropertyVector::Light(_) => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Number { name, .. }
            | Self::Switch { name, .. }
            | Self::Text { name, .. }
            | Self::Blob { name, .. } => name,
        }
    }

    /// Member values in stored order.
    #[must_use]
    pub fn values(&self) -> Vec<(String, PropertyValue)> {
        match self {
            Self::Number { members, .. } => members
                .iter()
                .map(|m| (m.name.clone(), PropertyValue::Number(m.value)))
                .collect(),
            Self::Switch { members, .. } => members
                .iter()
                .map(|m| (m.name.clone(), PropertyValue::Switch(m.state)))
                .collect(),
            Self::Text { members, .. } => members
                .iter()
                .map(|m| (m.name.clone(), PropertyValue::Text(m.value.clone())))
                .collect(),
            Self::Blob { members, .. } => members
                .iter()
                .map(|m| {
                    (
                        m.name.clone(),
                        PropertyValue::Blob {
                            format: m.format.clone(),
                            data: m.data.clone(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Turn the stored values into a restoration request for `device`.
    #[must_use]
    pub fn to_request(&self, device: &str) -> UpdateRequest {
        UpdateRequest {
            device: device.to_string(),
            vector: self.name().to_string(),
            values: self.values(),
            origin: UpdateOrigin::Config,
        }
    }
}

/// Saved configuration of one device, in registration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub device: String,
    #[serde(default)]
    pub vectors: Vec<StoredVector>,
}

impl ConfigDocument {
    #[must_use]
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            vectors: Vec::new(),
        }
    }

    /// Capture every persistable vector, keeping the given order.
    #[must_use]
    pub fn capture<'a>(
        device: impl Into<String>,
        vectors: impl IntoIterator<Item = &'a PropertyVector>,
    ) -> Self {
        Self {
            device: device.into(),
            vectors: vectors.into_iter().filter_map(StoredVector::capture).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StoredVector> {
        self.vectors.iter().find(|v| v.name() == name)
    }

    /// Replace the entry with the same name in place, or append it.
    pub fn upsert(&mut self, vector: StoredVector) {
        match self.vectors.iter_mut().find(|v| v.name() == vector.name()) {
            Some(slot) => *slot = vector,
            None => self.vectors.push(vector),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{
        Light, LightVector, Number, NumberVector, PropertyState, Switch, SwitchVector, Text,
        TextVector, VectorMeta,
    };

    fn seeing(value: f64) -> PropertyVector {
        NumberVector::new(
            VectorMeta::new("SEEING_SETTINGS", "Seeing"),
            vec![
                Number::builder("SIM_SEEING", "arcseconds")
                    .range(0.0, 60.0, 0.0)
                    .value(value)
                    .build()
                    .unwrap(),
            ],
        )
        .unwrap()
        .into()
    }

    fn switches(name: &str, rule: SwitchRule, first: SwitchState) -> PropertyVector {
        SwitchVector::new(
            VectorMeta::new(name, name),
            rule,
            vec![
                Switch::new("A", "A", first),
                Switch::new("B", "B", SwitchState::Off),
            ],
        )
        .unwrap()
        .into()
    }

    #[test]
    fn should_skip_connection_vector() {
        let connection = switches(CONNECTION, SwitchRule::OneOfMany, SwitchState::On);
        assert!(StoredVector::capture(&connection).is_none());
    }

    #[test]
    fn should_skip_lights() {
        let lights: PropertyVector = LightVector::new(
            VectorMeta::new("STATUS", "Status"),
            vec![Light::new("MOVING", "Moving", PropertyState::Busy)],
        )
        .unwrap()
        .into();
        assert!(StoredVector::capture(&lights).is_none());
    }

    #[test]
    fn should_keep_at_most_one_switch_with_nothing_on() {
        let vector = switches("CHOICE", SwitchRule::AtMostOne, SwitchState::Off);
        assert!(StoredVector::capture(&vector).is_some());
    }

    #[test]
    fn should_merge_entry_in_place_when_upserting() {
        let mut doc = ConfigDocument::capture(
            "Focuser",
            &[
                seeing(3.5),
                switches("Mode", SwitchRule::OneOfMany, SwitchState::On),
            ],
        );
        doc.upsert(StoredVector::capture(&seeing(4.0)).unwrap());
        assert_eq!(doc.vectors.len(), 2);
        assert_eq!(doc.vectors[0].name(), "SEEING_SETTINGS");
        assert_eq!(
            doc.get("SEEING_SETTINGS").unwrap().values(),
            vec![("SIM_SEEING".to_string(), PropertyValue::Number(4.0))]
        );
    }

    #[test]
    fn should_build_config_origin_request() {
        let stored = StoredVector::capture(&seeing(4.0)).unwrap();
        let request = stored.to_request("Focuser");
        assert!(request.is_from_config());
        assert_eq!(request.number_value("SIM_SEEING"), Some(4.0));
    }

    #[test]
    fn should_roundtrip_document_through_toml() {
        let info: PropertyVector = TextVector::new(
            VectorMeta::new("INFO", "Info"),
            vec![Text::new("NOTE", "Note", "a \"quoted\" note")],
        )
        .unwrap()
        .into();
        let doc = ConfigDocument::capture(
            "Focuser",
            &[
                seeing(0.1 + 0.2),
                switches("Mode", SwitchRule::OneOfMany, SwitchState::On),
                info,
            ],
        );
        let text = toml::to_string(&doc).unwrap();
        let parsed: ConfigDocument = toml::from_str(&text).unwrap();
        assert_eq!(parsed, doc);
    }
}
