//! Property vectors: ordered same-kind members plus shared metadata.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{
    Blob, Light, Member, Number, Permission, PropertyKind, PropertyState, Switch, SwitchRule,
    SwitchState, Text,
};
use crate::error::{MalformedRequestError, PropBusError, RuleViolationError, ValidationError};
use crate::update::PropertyValue;

/// Metadata shared by every vector kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorMeta {
    /// Unique name within the device.
    pub name: String,
    pub label: String,
    /// UI tab the vector is displayed under.
    pub group: String,
    pub permission: Permission,
    pub state: PropertyState,
    /// Worst-case seconds a client should wait for a change to complete.
    pub timeout: u32,
    /// Save this vector to the config store after every client update.
    #[serde(default)]
    pub persist_on_update: bool,
}

impl VectorMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            group: String::new(),
            permission: Permission::default(),
            state: PropertyState::default(),
            timeout: 0,
            persist_on_update: false,
        }
    }

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    #[must_use]
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    #[must_use]
    pub fn state(mut self, state: PropertyState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn persist_on_update(mut self, persist: bool) -> Self {
        self.persist_on_update = persist;
        self
    }
}

fn validate_members<M: Member>(name: &str, members: &[M]) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if members.is_empty() {
        return Err(ValidationError::NoMembers(name.to_string()));
    }
    let mut seen = HashSet::with_capacity(members.len());
    for member in members {
        if member.name().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !seen.insert(member.name()) {
            return Err(ValidationError::DuplicateMember {
                vector: name.to_string(),
                member: member.name().to_string(),
            });
        }
    }
    Ok(())
}

/// A vector of number, text, light or blob members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector<M> {
    #[serde(flatten)]
    pub meta: VectorMeta,
    members: Vec<M>,
}

pub type NumberVector = Vector<Number>;
pub type TextVector = Vector<Text>;
pub type LightVector = Vector<Light>;
pub type BlobVector = Vector<Blob>;

impl<M: Member> Vector<M> {
    /// Create a vector after checking its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the name is empty, there are no
    /// members, or two members share a name.
    pub fn new(mut meta: VectorMeta, members: Vec<M>) -> Result<Self, ValidationError> {
        validate_members(&meta.name, &members)?;
        M::normalize(&mut meta);
        Ok(Self { meta, members })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    #[must_use]
    pub fn members(&self) -> &[M] {
        &self.members
    }

    #[must_use]
    pub fn member(&self, name: &str) -> Option<&M> {
        self.members.iter().find(|m| m.name() == name)
    }

    pub fn member_mut(&mut self, name: &str) -> Option<&mut M> {
        self.members.iter_mut().find(|m| m.name() == name)
    }
}

impl Vector<Number> {
    #[must_use]
    pub fn value(&self, member: &str) -> Option<f64> {
        self.member(member).map(|n| n.value)
    }

    /// Replace a member value. Returns `false` when the member is unknown.
    pub fn set_value(&mut self, member: &str, value: f64) -> bool {
        self.member_mut(member).map(|n| n.value = value).is_some()
    }
}

impl Vector<Text> {
    #[must_use]
    pub fn text(&self, member: &str) -> Option<&str> {
        self.member(member).map(|t| t.value.as_str())
    }

    /// Replace a member value. Returns `false` when the member is unknown.
    pub fn set_text(&mut self, member: &str, value: impl Into<String>) -> bool {
        self.member_mut(member).map(|t| t.value = value.into()).is_some()
    }
}

impl Vector<Blob> {
    /// Returns `false` when the member is unknown.
    pub fn set_blob(&mut self, member: &str, format: impl Into<String>, data: Vec<u8>) -> bool {
        self.member_mut(member)
            .map(|b| {
                b.format = format.into();
                b.data = data;
            })
            .is_some()
    }
}

/// A vector of switches constrained by a [`SwitchRule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchVector {
    #[serde(flatten)]
    pub meta: VectorMeta,
    rule: SwitchRule,
    members: Vec<Switch>,
}

impl SwitchVector {
    /// Create a switch vector after checking its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the name is empty, there are no
    /// members, two members share a name, or the initial combination
    /// breaks `rule`.
    pub fn new(
        meta: VectorMeta,
        rule: SwitchRule,
        members: Vec<Switch>,
    ) -> Result<Self, ValidationError> {
        validate_members(&meta.name, &members)?;
        let vector = Self {
            meta,
            rule,
            members,
        };
        if !rule.allows(vector.on_count()) {
            return Err(ValidationError::InitialRule {
                vector: vector.meta.name,
                rule,
            });
        }
        Ok(vector)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    #[must_use]
    pub fn rule(&self) -> SwitchRule {
        self.rule
    }

    #[must_use]
    pub fn members(&self) -> &[Switch] {
        &self.members
    }

    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Switch> {
        self.members.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn state_of(&self, member: &str) -> Option<SwitchState> {
        self.member(member).map(|s| s.state)
    }

    #[must_use]
    pub fn on_count(&self) -> usize {
        self.members.iter().filter(|s| s.state.is_on()).count()
    }

    /// Position of the first member switched ON.
    #[must_use]
    pub fn on_index(&self) -> Option<usize> {
        self.members.iter().position(|s| s.state.is_on())
    }

    /// Switch every member OFF.
    pub fn reset(&mut self) {
        for switch in &mut self.members {
            switch.state = SwitchState::Off;
        }
    }

    /// Set one member. Returns `false` when the member is unknown.
    pub fn set(&mut self, member: &str, state: SwitchState) -> bool {
        self.members
            .iter_mut()
            .find(|s| s.name == member)
            .map(|s| s.state = state)
            .is_some()
    }

    /// Apply a client assignment, then enforce the rule.
    ///
    /// Exclusive rules release every member first. A combination that breaks
    /// the rule is left in place and the vector goes to `Alert`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleViolationError`] when the resulting combination breaks
    /// the rule.
    pub fn apply_states<'a>(
        &mut self,
        states: impl IntoIterator<Item = (&'a str, SwitchState)>,
    ) -> Result<(), RuleViolationError> {
        if self.rule.is_exclusive() {
            self.reset();
        }
        for (member, state) in states {
            self.set(member, state);
        }
        let on = self.on_count();
        if self.rule.allows(on) {
            Ok(())
        } else {
            self.meta.state = PropertyState::Alert;
            Err(RuleViolationError {
                vector: self.meta.name.clone(),
                rule: self.rule,
                on,
            })
        }
    }
}

/// Closed sum over every vector kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PropertyVector {
    Number(NumberVector),
    Switch(SwitchVector),
    Text(TextVector),
    Light(LightVector),
    Blob(BlobVector),
}

impl PropertyVector {
    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Number(_) => PropertyKind::Number,
            Self::Switch(_) => PropertyKind::Switch,
            Self::Text(_) => PropertyKind::Text,
            Self::Light(_) => PropertyKind::Light,
            Self::Blob(_) => PropertyKind::Blob,
        }
    }

    #[must_use]
    pub fn meta(&self) -> &VectorMeta {
        match self {
            Self::Number(v) => &v.meta,
            Self::Switch(v) => &v.meta,
            Self::Text(v) => &v.meta,
            Self::Light(v) => &v.meta,
            Self::Blob(v) => &v.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut VectorMeta {
        match self {
            Self::Number(v) => &mut v.meta,
            Self::Switch(v) => &mut v.meta,
            Self::Text(v) => &mut v.meta,
            Self::Light(v) => &mut v.meta,
            Self::Blob(v) => &mut v.meta,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.meta().name
    }

    #[must_use]
    pub fn state(&self) -> PropertyState {
        self.meta().state
    }

    pub fn set_state(&mut self, state: PropertyState) {
        self.meta_mut().state = state;
    }

    #[must_use]
    pub fn permission(&self) -> Permission {
        self.meta().permission
    }

    #[must_use]
    pub fn has_member(&self, member: &str) -> bool {
        match self {
            Self::Number(v) => v.member(member).is_some(),
            Self::Switch(v) => v.member(member).is_some(),
            Self::Text(v) => v.member(member).is_some(),
            Self::Light(v) => v.member(member).is_some(),
            Self::Blob(v) => v.member(member).is_some(),
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<&NumberVector> {
        match self {
            Self::Number(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_number_mut(&mut self) -> Option<&mut NumberVector> {
        match self {
            Self::Number(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_switch(&self) -> Option<&SwitchVector> {
        match self {
            Self::Switch(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_switch_mut(&mut self) -> Option<&mut SwitchVector> {
        match self {
            Self::Switch(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&TextVector> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_light(&self) -> Option<&LightVector> {
        match self {
            Self::Light(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&BlobVector> {
        match self {
            Self::Blob(v) => Some(v),
            _ => None,
        }
    }

    /// Check that every value names an existing member of the right kind.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedRequestError`] describing the first offending value.
    pub fn check_values(&self, values: &[(String, PropertyValue)]) -> Result<(), MalformedRequestError> {
        if values.is_empty() {
            return Err(MalformedRequestError::Empty(self.name().to_string()));
        }
        for (member, value) in values {
            if !self.has_member(member) {
                return Err(MalformedRequestError::UnknownMember {
                    vector: self.name().to_string(),
                    member: member.clone(),
                });
            }
            if value.kind() != self.kind() {
                return Err(MalformedRequestError::KindMismatch {
                    vector: self.name().to_string(),
                    member: member.clone(),
                    expected: self.kind(),
                    got: value.kind(),
                });
            }
        }
        Ok(())
    }

    /// Merge new member values using the kind-specific rule.
    ///
    /// The request is checked in full before anything is written, so a
    /// malformed request leaves the vector untouched. Numbers are not
    /// clamped to their declared range. On success the state becomes `Ok`.
    ///
    /// # Errors
    ///
    /// - [`PropBusError::Malformed`] for unknown members or kind mismatches
    /// - [`PropBusError::RuleViolation`] when a switch rule is broken; the
    ///   new combination is kept and the state is `Alert`
    pub fn apply(&mut self, values: &[(String, PropertyValue)]) -> Result<(), PropBusError> {
        self.check_values(values)?;
        match self {
            Self::Number(v) => {
                for (member, value) in values {
                    if let PropertyValue::Number(x) = value {
                        v.set_value(member, *x);
                    }
                }
            }
            Self::Text(v) => {
                for (member, value) in values {
                    if let PropertyValue::Text(text) = value {
                        v.set_text(member, text.clone());
                    }
                }
            }
            Self::Blob(v) => {
                for (member, value) in values {
                    if let PropertyValue::Blob { format, data } = value {
                        v.set_blob(member, format.clone(), data.clone());
                    }
                }
            }
            Self::Switch(v) => {
                v.apply_states(values.iter().filter_map(|(member, value)| match value {
                    PropertyValue::Switch(state) => Some((member.as_str(), *state)),
                    _ => None,
                }))?;
            }
            // no value kind targets lights, `check_values` already refused
            Self::Light(_) => {}
        }
        self.set_state(PropertyState::Ok);
        Ok(())
    }
}

impl From<NumberVector> for PropertyVector {
    fn from(v: NumberVector) -> Self {
        Self::Number(v)
    }
}

impl From<SwitchVector> for PropertyVector {
    fn from(v: SwitchVector) -> Self {
        Self::Switch(v)
    }
}

impl From<TextVector> for PropertyVector {
    fn from(v: TextVector) -> Self {
        Self::Text(v)
    }
}

impl From<LightVector> for PropertyVector {
    fn from(v: LightVector) -> Self {
        Self::Light(v)
    }
}

impl From<BlobVector> for PropertyVector {
    fn from(v: BlobVector) -> Self {
        Self::Blob(v)
    }
}
